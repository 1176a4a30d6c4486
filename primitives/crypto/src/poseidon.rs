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

//! Poseidon hashing over the BN254 scalar field and the order hash chain built from it.
//!
//! A chain for shares `[s_0, .., s_{n-1}]` summing to `total` is
//!
//! ```text
//! h_0     = H(H(user_key, previous_nonce), total)
//! h_{i+1} = H(h_i, s_i)
//! ```
//!
//! Chunk `i` is linked by the pair `(h_i, h_{i+1})` and `h_i` is its nullifier.

use crate::bn254::CryptoError;
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher};

/// A 32 byte big-endian field encoding.
pub type Hash = [u8; 32];

fn bytes_to_fr(value: &Hash) -> Fr {
	Fr::from_be_bytes_mod_order(value)
}

pub(crate) fn fr_to_bytes(value: Fr) -> Hash {
	let bytes = value.into_bigint().to_bytes_be();
	let mut out = [0u8; 32];
	out[32 - bytes.len()..].copy_from_slice(&bytes);
	out
}

pub(crate) fn poseidon_fr(inputs: &[Fr]) -> Result<Fr, CryptoError> {
	let mut hasher =
		Poseidon::<Fr>::new_circom(inputs.len()).map_err(|_| CryptoError::PoseidonFailure)?;
	hasher.hash(inputs).map_err(|_| CryptoError::PoseidonFailure)
}

/// Poseidon hash with 2 inputs.
pub fn poseidon2(a: &Hash, b: &Hash) -> Result<Hash, CryptoError> {
	poseidon_fr(&[bytes_to_fr(a), bytes_to_fr(b)]).map(fr_to_bytes)
}

/// `H(prev, shares)`: the successor of `prev` after a chunk of `shares`.
pub fn next_link(prev: &Hash, shares: u128) -> Result<Hash, CryptoError> {
	poseidon_fr(&[bytes_to_fr(prev), Fr::from(shares)]).map(fr_to_bytes)
}

/// `H(H(user_key, previous_nonce), total_shares)`: the chain head.
pub fn chain_head(
	user_key: &Hash,
	previous_nonce: &Hash,
	total_shares: u128,
) -> Result<Hash, CryptoError> {
	let nonce_commitment = poseidon2(user_key, previous_nonce)?;
	next_link(&nonce_commitment, total_shares)
}

/// Whether `(prev, next)` is a valid link for a chunk of `shares`.
pub fn verify_link(prev: &Hash, shares: u128, next: &Hash) -> Result<bool, CryptoError> {
	Ok(next_link(prev, shares)? == *next)
}

/// Builds `[h_0, .., h_n]` for the given chunk shares. The returned vector has one more
/// element than `shares`.
pub fn build_hash_chain(
	user_key: &Hash,
	previous_nonce: &Hash,
	shares: &[u128],
) -> Result<Vec<Hash>, CryptoError> {
	let total = shares
		.iter()
		.try_fold(0u128, |acc, s| acc.checked_add(*s))
		.ok_or(CryptoError::SharesOverflow)?;
	let mut chain = Vec::with_capacity(shares.len() + 1);
	let mut current = chain_head(user_key, previous_nonce, total)?;
	chain.push(current);
	for s in shares {
		current = next_link(&current, *s)?;
		chain.push(current);
	}
	Ok(chain)
}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY: Hash = [7u8; 32];
	const NONCE: Hash = [9u8; 32];

	#[test]
	fn test_poseidon2_deterministic_and_ordered() {
		let a = [1u8; 32];
		let b = [2u8; 32];
		assert_eq!(poseidon2(&a, &b).unwrap(), poseidon2(&a, &b).unwrap());
		assert_ne!(poseidon2(&a, &b).unwrap(), poseidon2(&b, &a).unwrap());
	}

	#[test]
	fn test_chain_head_matches_definition() {
		let head = chain_head(&KEY, &NONCE, 100).unwrap();
		let inner = poseidon2(&KEY, &NONCE).unwrap();
		assert_eq!(head, next_link(&inner, 100).unwrap());
		assert_ne!(head, chain_head(&KEY, &NONCE, 101).unwrap());
	}

	#[test]
	fn test_build_hash_chain_links() {
		let shares = [30u128, 20, 50];
		let chain = build_hash_chain(&KEY, &NONCE, &shares).unwrap();
		assert_eq!(chain.len(), 4);
		assert_eq!(chain[0], chain_head(&KEY, &NONCE, 100).unwrap());
		for (i, s) in shares.iter().enumerate() {
			assert!(verify_link(&chain[i], *s, &chain[i + 1]).unwrap());
		}
		// a link with the wrong amount or out of order does not verify
		assert!(!verify_link(&chain[0], 31, &chain[1]).unwrap());
		assert!(!verify_link(&chain[1], 20, &chain[3]).unwrap());
	}

	#[test]
	fn test_build_hash_chain_rejects_overflow() {
		let res = build_hash_chain(&KEY, &NONCE, &[u128::MAX, 1]);
		assert_eq!(res, Err(CryptoError::SharesOverflow));
	}
}
