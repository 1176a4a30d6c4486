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

//! # Order executor
//!
//! Performs the economic effect of one verified chunk:
//!
//! 1. reject chunks past their deadline
//! 2. withdraw the chunk's shares from the vault into custody
//! 3. swap into `token_out`, or deposit into the chunk's liquidity pool
//! 4. enforce the slippage bound
//! 5. pay the execution fee to the caller and the protocol fee to the treasury
//! 6. pay the remainder to the recipient
//!
//! The executor does not open a transaction itself; callers run it inside one so that any
//! failure undoes every step.

use crate::{Error, LedgerParams};
use sp_sealed_traits::{Dex, ExternalError, Settlement, Vault};
use sp_sealed_types::{Address, ChunkParams, OperationType, OrderId, BPS_DENOMINATOR};

/// What an executed chunk moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionOutcome {
	/// Tokens withdrawn from the vault.
	pub amount_in: u128,
	/// Swap output, or minted liquidity.
	pub amount_out: u128,
	pub execution_fee: u128,
	pub protocol_fee: u128,
	/// Paid to the recipient, or deposited into the pool.
	pub payout: u128,
	pub position_id: Option<u128>,
}

pub struct OrderExecutor<'a, E> {
	env: &'a E,
	params: &'a LedgerParams,
}

fn fee(amount: u128, bps: u16) -> Result<u128, Error> {
	amount
		.checked_mul(u128::from(bps))
		.map(|v| v / BPS_DENOMINATOR)
		.ok_or(Error::InvalidAmounts)
}

impl<'a, E> OrderExecutor<'a, E>
where
	E: Vault + Dex + Settlement,
{
	pub fn new(env: &'a E, params: &'a LedgerParams) -> Self {
		Self { env, params }
	}

	pub fn execute(
		&self,
		order_id: &OrderId,
		token_in: &Address,
		operation_type: OperationType,
		chunk: &ChunkParams,
		caller: &Address,
		now: u64,
	) -> Result<ExecutionOutcome, Error> {
		if chunk.deadline <= now {
			return Err(Error::IntentExpired)
		}
		let total_fee_bps =
			u128::from(chunk.execution_fee_bps) + u128::from(self.params.protocol_fee_bps);
		if chunk.shares_amount == 0 || total_fee_bps > BPS_DENOMINATOR {
			return Err(Error::InvalidAmounts)
		}
		let min_out = chunk.min_acceptable_out().ok_or(Error::InvalidAmounts)?;

		let amount_in = self
			.env
			.withdraw_for_amount(order_id, token_in, chunk.shares_amount)
			.map_err(|e| match e {
				ExternalError::InsufficientFunds => Error::InsufficientFunds,
				_ => Error::InvalidAmounts,
			})?;
		if amount_in == 0 {
			return Err(Error::InvalidAmounts)
		}

		match operation_type {
			OperationType::Swap => self.swap(token_in, chunk, caller, amount_in, min_out),
			OperationType::Liquidity =>
				self.provide_liquidity(token_in, chunk, caller, amount_in, min_out),
		}
	}

	fn swap(
		&self,
		token_in: &Address,
		chunk: &ChunkParams,
		caller: &Address,
		amount_in: u128,
		min_out: u128,
	) -> Result<ExecutionOutcome, Error> {
		if chunk.token_out == *token_in {
			return Err(Error::InvalidAmounts)
		}
		let amount_out = self
			.env
			.swap_exact_in(token_in, &chunk.token_out, amount_in, min_out)
			.map_err(|e| match e {
				ExternalError::BelowMinimum => Error::InvalidSlippage,
				e => {
					log::debug!(target: crate::LOG_TARGET, "swap failed: {e}");
					Error::SwapFailed
				},
			})?;
		if amount_out < min_out {
			return Err(Error::InvalidSlippage)
		}

		let (execution_fee, protocol_fee) =
			self.pay_fees(&chunk.token_out, amount_out, chunk, caller)?;
		let payout = amount_out - execution_fee - protocol_fee;
		self.pay(&chunk.token_out, &chunk.recipient, payout)?;

		Ok(ExecutionOutcome {
			amount_in,
			amount_out,
			execution_fee,
			protocol_fee,
			payout,
			position_id: None,
		})
	}

	/// Fees come out of the withdrawn tokens; the rest is deposited on the pool side matching
	/// `token_in`.
	fn provide_liquidity(
		&self,
		token_in: &Address,
		chunk: &ChunkParams,
		caller: &Address,
		amount_in: u128,
		min_liquidity: u128,
	) -> Result<ExecutionOutcome, Error> {
		let liquidity = chunk.liquidity.as_ref().ok_or(Error::InvalidAmounts)?;
		let pool = &liquidity.pool_key;
		if !pool.contains(token_in) || liquidity.tick_lower >= liquidity.tick_upper {
			return Err(Error::InvalidAmounts)
		}

		let (execution_fee, protocol_fee) = self.pay_fees(token_in, amount_in, chunk, caller)?;
		let deposit = amount_in - execution_fee - protocol_fee;
		let (amount0, amount1) =
			if pool.currency0 == *token_in { (deposit, 0) } else { (0, deposit) };

		let receipt = self
			.env
			.add_liquidity(
				pool,
				liquidity.tick_lower,
				liquidity.tick_upper,
				amount0,
				amount1,
				&chunk.recipient,
			)
			.map_err(|e| {
				log::debug!(target: crate::LOG_TARGET, "liquidity provision failed: {e}");
				Error::LiquidityProvisionFailed
			})?;
		if receipt.liquidity < min_liquidity {
			return Err(Error::InvalidSlippage)
		}

		Ok(ExecutionOutcome {
			amount_in,
			amount_out: receipt.liquidity,
			execution_fee,
			protocol_fee,
			payout: deposit,
			position_id: Some(receipt.position_id),
		})
	}

	fn pay_fees(
		&self,
		token: &Address,
		amount: u128,
		chunk: &ChunkParams,
		caller: &Address,
	) -> Result<(u128, u128), Error> {
		let execution_fee = fee(amount, chunk.execution_fee_bps)?;
		let protocol_fee = fee(amount, self.params.protocol_fee_bps)?;
		self.pay(token, caller, execution_fee)?;
		self.pay(token, &self.params.treasury, protocol_fee)?;
		Ok((execution_fee, protocol_fee))
	}

	fn pay(&self, token: &Address, to: &Address, amount: u128) -> Result<(), Error> {
		if amount == 0 {
			return Ok(())
		}
		self.env.transfer(token, to, amount).map_err(|_| Error::PayoutFailed)
	}
}
