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

//! Recovery of funds locked behind chunks that never executed.
//!
//! A chunk may never execute: its deadline passes, the relayer never presents it, or the owner
//! lost the data needed to build it. After the recovery delay the owner can retire every
//! remaining chunk and have the vault release what is left of the position. Both happen under
//! the ledger lock, so no chunk can execute against funds that were already released.

use crate::{Config, Error, Event, SealedOrders, LOG_TARGET};
use sp_sealed_traits::{ExternalError, Transactional, UnixTime, Vault};
use sp_sealed_types::{Address, OrderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryOutcome {
	pub retired_chunks: u32,
	pub released_shares: u128,
}

impl<T: Config> SealedOrders<T> {
	/// Retire the unexecuted chunks of `order_id` and release its remaining position to the
	/// owner.
	///
	/// * `caller`: must be the account that registered the order
	/// * `order_id`: the order to recover
	pub fn recover(&self, caller: Address, order_id: OrderId) -> Result<RecoveryOutcome, Error> {
		let now = self.time.now_secs();
		let mut state = self.state.lock();

		let record = state.registry.get(&order_id).ok_or(Error::OrderNotFound)?;
		if record.owner != caller {
			return Err(Error::NotOrderOwner)
		}
		if now < record.registered_at.saturating_add(self.params.recovery_delay) {
			return Err(Error::RecoveryTooEarly)
		}
		let owner = record.owner;

		let table = state.ledger.table(&order_id).ok_or(Error::OrderNotFound)?;
		if table.retired {
			return Err(Error::OrderRecovered)
		}
		if table.remaining() == 0 {
			return Err(Error::NothingToRecover)
		}

		let released_shares = self
			.env
			.with_transaction(|env| match env.release(&order_id, &owner) {
				Ok(shares) => Ok(shares),
				// the vault holds nothing more for this order
				Err(ExternalError::NotFound) => Ok(0),
				Err(e) => Err(e),
			})
			.map_err(|e| {
				log::warn!(target: LOG_TARGET, "release of order {order_id} failed: {e}");
				Error::ReleaseFailed
			})?;
		let retired = state.ledger.retire(&order_id)?;
		let retired_chunks = u32::try_from(retired).unwrap_or(u32::MAX);

		let block_number = state.next_block();
		state.events.deposit(
			block_number,
			Event::OrderRecovered { order_id, owner, retired_chunks, released_shares },
		);
		log::info!(
			target: LOG_TARGET,
			"recovered order {order_id}: {retired_chunks} chunks retired, \
			 {released_shares} shares released",
		);
		Ok(RecoveryOutcome { retired_chunks, released_shares })
	}
}
