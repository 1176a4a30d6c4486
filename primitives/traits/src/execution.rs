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

//! Services that move funds on behalf of an executing chunk.
//!
//! All three act on the executor's custody account: the vault pays withdrawn tokens into it, the
//! DEX swaps out of it, and settlement pays out of it.

use sp_sealed_types::{Address, OrderId, PoolKey};

/// Failures reported by external services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExternalError {
	/// The account or position does not hold enough funds.
	#[error("insufficient funds")]
	InsufficientFunds,
	/// The output would fall below the requested minimum.
	#[error("output below minimum")]
	BelowMinimum,
	/// No such position, pool or route.
	#[error("not found")]
	NotFound,
	/// Any other failure, with a description.
	#[error("{0}")]
	Other(String),
}

/// Holds the shares backing registered orders.
pub trait Vault {
	/// Redeem `shares` of the position backing `order_id` into `token`, paid into custody.
	///
	/// Returns the token amount received.
	fn withdraw_for_amount(
		&self,
		order_id: &OrderId,
		token: &Address,
		shares: u128,
	) -> Result<u128, ExternalError>;

	/// Return every share still backing `order_id` to `beneficiary`.
	///
	/// Returns the number of shares released.
	fn release(&self, order_id: &OrderId, beneficiary: &Address) -> Result<u128, ExternalError>;
}

/// The outcome of a liquidity deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityReceipt {
	pub position_id: u128,
	pub liquidity: u128,
	pub amount0: u128,
	pub amount1: u128,
}

/// A DEX able to swap and to mint concentrated liquidity positions.
pub trait Dex {
	/// Swap exactly `amount_in` of `token_in` for at least `min_out` of `token_out`.
	fn swap_exact_in(
		&self,
		token_in: &Address,
		token_out: &Address,
		amount_in: u128,
		min_out: u128,
	) -> Result<u128, ExternalError>;

	/// Mint a position in `pool` between the given ticks for `owner`, spending at most the given
	/// amounts of `currency0` and `currency1`.
	fn add_liquidity(
		&self,
		pool: &PoolKey,
		tick_lower: i32,
		tick_upper: i32,
		amount0_max: u128,
		amount1_max: u128,
		owner: &Address,
	) -> Result<LiquidityReceipt, ExternalError>;
}

/// Pays tokens out of custody.
pub trait Settlement {
	fn transfer(&self, token: &Address, to: &Address, amount: u128) -> Result<(), ExternalError>;
}
