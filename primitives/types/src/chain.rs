/*
 * Copyright 2025 by Ideal Labs, LLC
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Client side construction of an encryption chain.
//!
//! An order of `n` chunks becomes `n` nested ciphertexts: chunk `i` is sealed for its own
//! round and carries the ciphertext of chunk `i + 1` in its plaintext. The chain is therefore
//! built innermost first, and only the head is registered together with the `n` commitments.

use crate::{
	order::{ChunkParams, OrderChunk},
	primitives::B256,
	TypesError,
};
use rand::{CryptoRng, RngCore};
use sp_sealed_crypto::{
	beacon::RoundNumber,
	poseidon::{build_hash_chain, Hash},
	tlock::{TimelockCipher, TimelockCiphertext},
};

/// One chunk to seal: what it does and when it opens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkSpec {
	pub params: ChunkParams,
	pub round: RoundNumber,
}

/// Everything a client needs to register an order.
#[derive(Clone, Debug)]
pub struct EncryptionChain {
	/// The ciphertext of chunk 0, which embeds all later chunks.
	pub head: TimelockCiphertext,
	/// `Hash(params_i, round_i)` for every chunk.
	pub commitments: Vec<B256>,
	/// `[h_0, .., h_n]`
	pub hash_chain: Vec<B256>,
}

impl EncryptionChain {
	/// The nullifiers consumed when every chunk executes, `[h_0, .., h_{n-1}]`.
	pub fn nullifiers(&self) -> &[B256] {
		&self.hash_chain[..self.hash_chain.len().saturating_sub(1)]
	}
}

pub fn build_encryption_chain<R: RngCore + CryptoRng>(
	cipher: &TimelockCipher,
	user_key: &Hash,
	previous_nonce: &Hash,
	total_shares: u128,
	specs: &[ChunkSpec],
	rng: &mut R,
) -> Result<EncryptionChain, TypesError> {
	if specs.is_empty() {
		return Err(TypesError::EmptyChain);
	}
	let shares: Vec<u128> = specs.iter().map(|s| s.params.shares_amount).collect();
	let actual = shares
		.iter()
		.try_fold(0u128, |acc, s| acc.checked_add(*s))
		.ok_or(TypesError::SharesMismatch { expected: total_shares, actual: u128::MAX })?;
	if actual != total_shares {
		return Err(TypesError::SharesMismatch { expected: total_shares, actual });
	}
	if specs.windows(2).any(|w| w[1].round < w[0].round) {
		return Err(TypesError::RoundsOutOfOrder);
	}

	let hash_chain: Vec<B256> =
		build_hash_chain(user_key, previous_nonce, &shares)?.into_iter().map(B256::new).collect();
	let commitments = specs.iter().map(|s| s.params.commitment(s.round)).collect();

	let mut next: Option<TimelockCiphertext> = None;
	for (i, spec) in specs.iter().enumerate().rev() {
		let chunk =
			OrderChunk::new(spec.params.clone(), hash_chain[i], hash_chain[i + 1], next.take());
		next = Some(cipher.encrypt(&chunk.to_plaintext()?, spec.round, rng)?);
	}
	let head = next.ok_or(TypesError::EmptyChain)?;

	Ok(EncryptionChain { head, commitments, hash_chain })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::primitives::Address;
	use rand::rngs::OsRng;
	use sp_sealed_crypto::{poseidon::verify_link, test_utils::DevBeacon};

	const KEY: Hash = [3u8; 32];
	const NONCE: Hash = [4u8; 32];

	fn spec(shares: u128, round: RoundNumber) -> ChunkSpec {
		ChunkSpec {
			params: ChunkParams {
				shares_amount: shares,
				amount_out_min: 100,
				slippage_bps: 100,
				deadline: u64::MAX,
				recipient: Address::repeat_byte(7),
				token_out: Address::repeat_byte(8),
				execution_fee_bps: 5,
				liquidity: None,
			},
			round,
		}
	}

	#[test]
	fn builds_nested_chain_that_opens_round_by_round() {
		let beacon = DevBeacon::new(99, 0, 3);
		let cipher = TimelockCipher::from_beacon(beacon.info());
		let specs = [spec(30, 10), spec(20, 20), spec(50, 30)];
		let chain = build_encryption_chain(&cipher, &KEY, &NONCE, 100, &specs, &mut OsRng).unwrap();

		assert_eq!(chain.commitments.len(), 3);
		assert_eq!(chain.hash_chain.len(), 4);
		assert_eq!(chain.nullifiers(), &chain.hash_chain[..3]);

		let mut current = Some(chain.head.clone());
		let mut index = 0;
		while let Some(ct) = current {
			assert_eq!(ct.round, specs[index].round);
			let plaintext = cipher.decrypt(&ct, &beacon.sign(ct.round).unwrap()).unwrap();
			let chunk = OrderChunk::from_plaintext(&plaintext).unwrap();
			assert_eq!(chunk.params(), specs[index].params);
			assert_eq!(chunk.prev_hash, chain.hash_chain[index]);
			assert_eq!(chunk.next_hash, chain.hash_chain[index + 1]);
			let linked = verify_link(&chunk.prev_hash.0, chunk.shares_amount, &chunk.next_hash.0);
			assert!(linked.unwrap());
			assert_eq!(chunk.params().commitment(ct.round), chain.commitments[index]);
			current = chunk.next_ciphertext;
			index += 1;
		}
		assert_eq!(index, 3);
	}

	#[test]
	fn rejects_invalid_chunk_lists() {
		let cipher = TimelockCipher::from_beacon(DevBeacon::new(99, 0, 3).info());
		let mut rng = OsRng;
		let short = [spec(30, 1), spec(20, 2)];
		let backwards = [spec(30, 5), spec(20, 2)];
		assert_eq!(
			build_encryption_chain(&cipher, &KEY, &NONCE, 0, &[], &mut rng).unwrap_err(),
			TypesError::EmptyChain
		);
		assert_eq!(
			build_encryption_chain(&cipher, &KEY, &NONCE, 100, &short, &mut rng).unwrap_err(),
			TypesError::SharesMismatch { expected: 100, actual: 50 }
		);
		assert_eq!(
			build_encryption_chain(&cipher, &KEY, &NONCE, 50, &backwards, &mut rng).unwrap_err(),
			TypesError::RoundsOutOfOrder
		);
	}
}
