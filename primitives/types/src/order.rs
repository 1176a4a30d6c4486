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

//! Order chunks and their commitments.

use crate::{
	primitives::{Address, B256},
	TypesError,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sp_sealed_crypto::{beacon::RoundNumber, tlock::TimelockCiphertext};

/// Domain separator of chunk commitments.
pub const CHUNK_COMMITMENT_DOMAIN: &[u8] = b"sealed-orders/chunk/v1";

/// One basis point is 1/10_000.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// What a chunk does with the withdrawn funds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
	Swap,
	Liquidity,
}

/// Identifies a concentrated liquidity pool.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PoolKey {
	pub currency0: Address,
	pub currency1: Address,
	pub fee: u32,
	pub tick_spacing: i32,
}

impl PoolKey {
	pub fn contains(&self, token: &Address) -> bool {
		self.currency0 == *token || self.currency1 == *token
	}
}

/// Position bounds for a liquidity chunk.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LiquidityParams {
	pub pool_key: PoolKey,
	pub tick_lower: i32,
	pub tick_upper: i32,
}

/// The committed parameters of one chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkParams {
	pub shares_amount: u128,
	pub amount_out_min: u128,
	pub slippage_bps: u16,
	/// Unix time after which the chunk may no longer execute.
	pub deadline: u64,
	pub recipient: Address,
	pub token_out: Address,
	pub execution_fee_bps: u16,
	/// Required for [`OperationType::Liquidity`] orders.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub liquidity: Option<LiquidityParams>,
}

impl ChunkParams {
	/// `Hash(params, round)`: binds the parameters to the beacon round that reveals them.
	pub fn commitment(&self, round: RoundNumber) -> B256 {
		let mut hasher = Sha256::default();
		hasher.update(CHUNK_COMMITMENT_DOMAIN);
		hasher.update(self.shares_amount.to_be_bytes());
		hasher.update(self.amount_out_min.to_be_bytes());
		hasher.update(self.slippage_bps.to_be_bytes());
		hasher.update(self.deadline.to_be_bytes());
		hasher.update(self.recipient.as_slice());
		hasher.update(self.token_out.as_slice());
		hasher.update(self.execution_fee_bps.to_be_bytes());
		match &self.liquidity {
			None => hasher.update([0u8]),
			Some(l) => {
				hasher.update([1u8]);
				hasher.update(l.pool_key.currency0.as_slice());
				hasher.update(l.pool_key.currency1.as_slice());
				hasher.update(l.pool_key.fee.to_be_bytes());
				hasher.update(l.pool_key.tick_spacing.to_be_bytes());
				hasher.update(l.tick_lower.to_be_bytes());
				hasher.update(l.tick_upper.to_be_bytes());
			},
		}
		hasher.update(round.to_be_bytes());
		B256::new(hasher.finalize().into())
	}

	/// The smallest acceptable output: `amount_out_min * (1 - slippage_bps / 10_000)`.
	pub fn min_acceptable_out(&self) -> Option<u128> {
		let keep = BPS_DENOMINATOR.checked_sub(u128::from(self.slippage_bps))?;
		Some(self.amount_out_min.checked_mul(keep)? / BPS_DENOMINATOR)
	}
}

/// The decrypted content of one timelock ciphertext.
///
/// The committed parameters are laid out flat next to the hash-chain link, as the plaintext
/// is produced by clients that know nothing of [`ChunkParams`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderChunk {
	pub shares_amount: u128,
	pub amount_out_min: u128,
	pub slippage_bps: u16,
	pub deadline: u64,
	pub recipient: Address,
	pub token_out: Address,
	pub execution_fee_bps: u16,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub liquidity: Option<LiquidityParams>,
	pub prev_hash: B256,
	pub next_hash: B256,
	/// The next chunk of the order, sealed for a later round.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub next_ciphertext: Option<TimelockCiphertext>,
}

impl OrderChunk {
	pub fn new(
		params: ChunkParams,
		prev_hash: B256,
		next_hash: B256,
		next_ciphertext: Option<TimelockCiphertext>,
	) -> Self {
		Self {
			shares_amount: params.shares_amount,
			amount_out_min: params.amount_out_min,
			slippage_bps: params.slippage_bps,
			deadline: params.deadline,
			recipient: params.recipient,
			token_out: params.token_out,
			execution_fee_bps: params.execution_fee_bps,
			liquidity: params.liquidity,
			prev_hash,
			next_hash,
			next_ciphertext,
		}
	}

	/// The committed part of the chunk.
	pub fn params(&self) -> ChunkParams {
		ChunkParams {
			shares_amount: self.shares_amount,
			amount_out_min: self.amount_out_min,
			slippage_bps: self.slippage_bps,
			deadline: self.deadline,
			recipient: self.recipient,
			token_out: self.token_out,
			execution_fee_bps: self.execution_fee_bps,
			liquidity: self.liquidity.clone(),
		}
	}

	pub fn to_plaintext(&self) -> Result<Vec<u8>, TypesError> {
		serde_json::to_vec(self).map_err(|e| TypesError::Encoding(e.to_string()))
	}

	pub fn from_plaintext(bytes: &[u8]) -> Result<Self, TypesError> {
		serde_json::from_slice(bytes).map_err(|e| TypesError::Encoding(e.to_string()))
	}
}
