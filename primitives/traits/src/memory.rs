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

//! In-memory implementations of the execution services.
//!
//! [`InMemoryEnvironment`] implements every service trait over one state value, so a nested
//! [`Transactional`] snapshot covers vault, DEX and settlement at once. Swaps use fixed rates;
//! liquidity positions record what was spent and nothing more.

use crate::{
	execution::{Dex, ExternalError, LiquidityReceipt, Settlement, Vault},
	time::UnixTime,
	transaction::Transactional,
};
use parking_lot::Mutex;
use sp_sealed_types::{Address, OrderId, PoolKey};
use std::{
	collections::HashMap,
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};

const LOG_TARGET: &str = "sealed-memory-env";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Position {
	token: Address,
	shares: u128,
}

#[derive(Debug, Clone, Default)]
struct State {
	positions: HashMap<OrderId, Position>,
	share_prices: HashMap<Address, u128>,
	custody: HashMap<Address, u128>,
	balances: HashMap<(Address, Address), u128>,
	rates: HashMap<(Address, Address), (u128, u128)>,
	liquidity: Vec<(Address, PoolKey, LiquidityReceipt)>,
	next_position: u128,
}

impl State {
	fn share_price(&self, token: &Address) -> u128 {
		self.share_prices.get(token).copied().unwrap_or(1)
	}

	fn take_custody(&mut self, token: &Address, amount: u128) -> Result<(), ExternalError> {
		let held = self.custody.entry(*token).or_default();
		*held = held.checked_sub(amount).ok_or(ExternalError::InsufficientFunds)?;
		Ok(())
	}

	fn add_custody(&mut self, token: &Address, amount: u128) -> Result<(), ExternalError> {
		let held = self.custody.entry(*token).or_default();
		*held = held.checked_add(amount).ok_or(ExternalError::Other("overflow".into()))?;
		Ok(())
	}

	fn credit(&mut self, token: &Address, to: &Address, amount: u128) -> Result<(), ExternalError> {
		let balance = self.balances.entry((*token, *to)).or_default();
		*balance = balance.checked_add(amount).ok_or(ExternalError::Other("overflow".into()))?;
		Ok(())
	}
}

/// Vault, DEX and settlement over shared in-memory state.
#[derive(Debug, Default)]
pub struct InMemoryEnvironment {
	state: Mutex<State>,
	snapshots: Mutex<Vec<State>>,
}

impl InMemoryEnvironment {
	pub fn new() -> Self {
		Self::default()
	}

	/// Locks `shares` of `token` behind `order_id`.
	pub fn deposit(&self, order_id: OrderId, token: Address, shares: u128) {
		let mut state = self.state.lock();
		let position = state.positions.entry(order_id).or_insert(Position { token, shares: 0 });
		position.shares = position.shares.saturating_add(shares);
	}

	/// Sets how many tokens one share redeems for. Defaults to 1.
	pub fn set_share_price(&self, token: Address, price: u128) {
		self.state.lock().share_prices.insert(token, price);
	}

	/// Sets the swap rate `token_in -> token_out` to `numerator / denominator`.
	pub fn set_rate(
		&self,
		token_in: Address,
		token_out: Address,
		numerator: u128,
		denominator: u128,
	) {
		self.state.lock().rates.insert((token_in, token_out), (numerator, denominator.max(1)));
	}

	pub fn balance_of(&self, token: &Address, account: &Address) -> u128 {
		self.state.lock().balances.get(&(*token, *account)).copied().unwrap_or_default()
	}

	pub fn custody_of(&self, token: &Address) -> u128 {
		self.state.lock().custody.get(token).copied().unwrap_or_default()
	}

	/// Shares still locked behind `order_id`.
	pub fn position_shares(&self, order_id: &OrderId) -> u128 {
		self.state.lock().positions.get(order_id).map(|p| p.shares).unwrap_or_default()
	}

	pub fn liquidity_positions(&self, owner: &Address) -> Vec<(PoolKey, LiquidityReceipt)> {
		self.state
			.lock()
			.liquidity
			.iter()
			.filter(|(o, _, _)| o == owner)
			.map(|(_, pool, receipt)| (pool.clone(), *receipt))
			.collect()
	}
}

impl Vault for InMemoryEnvironment {
	fn withdraw_for_amount(
		&self,
		order_id: &OrderId,
		token: &Address,
		shares: u128,
	) -> Result<u128, ExternalError> {
		let mut state = self.state.lock();
		let price = state.share_price(token);
		let position = state.positions.get_mut(order_id).ok_or(ExternalError::NotFound)?;
		if position.token != *token {
			return Err(ExternalError::NotFound);
		}
		position.shares =
			position.shares.checked_sub(shares).ok_or(ExternalError::InsufficientFunds)?;
		let amount = shares.checked_mul(price).ok_or(ExternalError::Other("overflow".into()))?;
		state.add_custody(token, amount)?;
		Ok(amount)
	}

	fn release(&self, order_id: &OrderId, beneficiary: &Address) -> Result<u128, ExternalError> {
		let mut state = self.state.lock();
		let position = state.positions.remove(order_id).ok_or(ExternalError::NotFound)?;
		let price = state.share_price(&position.token);
		let amount =
			position.shares.checked_mul(price).ok_or(ExternalError::Other("overflow".into()))?;
		state.credit(&position.token, beneficiary, amount)?;
		log::debug!(target: LOG_TARGET, "released {} shares of {order_id}", position.shares);
		Ok(position.shares)
	}
}

impl Dex for InMemoryEnvironment {
	fn swap_exact_in(
		&self,
		token_in: &Address,
		token_out: &Address,
		amount_in: u128,
		min_out: u128,
	) -> Result<u128, ExternalError> {
		let mut state = self.state.lock();
		let (numerator, denominator) =
			*state.rates.get(&(*token_in, *token_out)).ok_or(ExternalError::NotFound)?;
		let amount_out = amount_in
			.checked_mul(numerator)
			.ok_or(ExternalError::Other("overflow".into()))? /
			denominator;
		if amount_out < min_out {
			return Err(ExternalError::BelowMinimum);
		}
		state.take_custody(token_in, amount_in)?;
		state.add_custody(token_out, amount_out)?;
		Ok(amount_out)
	}

	fn add_liquidity(
		&self,
		pool: &PoolKey,
		tick_lower: i32,
		tick_upper: i32,
		amount0_max: u128,
		amount1_max: u128,
		owner: &Address,
	) -> Result<LiquidityReceipt, ExternalError> {
		if tick_lower >= tick_upper {
			return Err(ExternalError::Other("invalid tick range".into()));
		}
		if amount0_max == 0 && amount1_max == 0 {
			return Err(ExternalError::Other("empty deposit".into()));
		}
		let mut state = self.state.lock();
		state.take_custody(&pool.currency0, amount0_max)?;
		state.take_custody(&pool.currency1, amount1_max)?;
		state.next_position += 1;
		let receipt = LiquidityReceipt {
			position_id: state.next_position,
			liquidity: amount0_max.saturating_add(amount1_max),
			amount0: amount0_max,
			amount1: amount1_max,
		};
		state.liquidity.push((*owner, pool.clone(), receipt));
		Ok(receipt)
	}
}

impl Settlement for InMemoryEnvironment {
	fn transfer(&self, token: &Address, to: &Address, amount: u128) -> Result<(), ExternalError> {
		let mut state = self.state.lock();
		state.take_custody(token, amount)?;
		state.credit(token, to, amount)
	}
}

impl Transactional for InMemoryEnvironment {
	fn begin(&self) {
		let snapshot = self.state.lock().clone();
		self.snapshots.lock().push(snapshot);
	}

	fn commit(&self) {
		self.snapshots.lock().pop();
	}

	fn rollback(&self) {
		if let Some(snapshot) = self.snapshots.lock().pop() {
			*self.state.lock() = snapshot;
		}
	}
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
	secs: AtomicU64,
}

impl ManualClock {
	pub fn new(secs: u64) -> Self {
		Self { secs: AtomicU64::new(secs) }
	}

	pub fn set(&self, secs: u64) {
		self.secs.store(secs, Ordering::SeqCst);
	}

	pub fn advance(&self, secs: u64) {
		self.secs.fetch_add(secs, Ordering::SeqCst);
	}
}

impl UnixTime for ManualClock {
	fn now(&self) -> Duration {
		Duration::from_secs(self.secs.load(Ordering::SeqCst))
	}
}
