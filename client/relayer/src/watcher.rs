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

//! Turns ledger registrations into pending orders.
//!
//! The watcher first replays history from its cursor in bounded batches, then follows the
//! live subscription. The subscription is opened before the replay so nothing registered in
//! between is missed; entries the replay already covered are dropped by block number.

use crate::{
	chain::{OrderChain, OrderRegistered},
	error::Error,
	store::{PendingOrder, PendingOrderStore},
};
use futures::StreamExt;
use pallet_sealed_orders::BlockNumber;
use sp_sealed_crypto::tlock::TimelockCiphertext;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;

const LOG_TARGET: &str = "relayer-watcher";

/// Default first retry delay of the watcher.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);
/// Upper bound of the sync backoff.
const MAX_RETRY_INTERVAL: Duration = Duration::from_secs(60);

pub struct EventWatcher {
	chain: Arc<dyn OrderChain>,
	store: Arc<PendingOrderStore>,
	start_block: BlockNumber,
	batch_size: u64,
	retry_interval: Duration,
}

impl EventWatcher {
	pub fn new(
		chain: Arc<dyn OrderChain>,
		store: Arc<PendingOrderStore>,
		start_block: BlockNumber,
		batch_size: u64,
	) -> Self {
		Self {
			chain,
			store,
			start_block,
			batch_size: batch_size.max(1),
			retry_interval: DEFAULT_RETRY_INTERVAL,
		}
	}

	/// The first delay before a failed sync or a dropped subscription is retried.
	pub fn with_retry_interval(mut self, interval: Duration) -> Self {
		self.retry_interval = interval;
		self
	}

	/// The first block not yet processed.
	fn next_block(&self) -> Result<BlockNumber, Error> {
		Ok(match self.store.last_block()? {
			Some(last) => (last + 1).max(self.start_block),
			None => self.start_block,
		})
	}

	/// Replays every registration up to the latest block, returning how many new orders were
	/// stored.
	pub async fn sync(&self) -> Result<usize, Error> {
		let latest = self.chain.latest_block().await?;
		let from = self.next_block()?;
		self.replay(from, latest).await
	}

	async fn replay(&self, from: BlockNumber, to: BlockNumber) -> Result<usize, Error> {
		let mut stored = 0;
		let mut start = from;
		while start <= to {
			let end = start.saturating_add(self.batch_size - 1).min(to);
			for registered in self.chain.registrations(start, end).await? {
				if self.handle(&registered)? {
					stored += 1;
				}
			}
			self.store.set_last_block(end)?;
			log::debug!(target: LOG_TARGET, "replayed blocks {start}..={end}");
			start = end + 1;
		}
		Ok(stored)
	}

	async fn on_live(&self, registered: OrderRegistered) -> Result<(), Error> {
		let next = self.next_block()?;
		if registered.block_number < next {
			return Ok(())
		}
		// the subscription may have dropped entries
		if registered.block_number > next {
			self.replay(next, registered.block_number - 1).await?;
		}
		self.handle(&registered)?;
		self.store.set_last_block(registered.block_number)?;
		Ok(())
	}

	/// Stores a pending order for `registered` unless one exists already.
	fn handle(&self, registered: &OrderRegistered) -> Result<bool, Error> {
		let (target_round, error) = match TimelockCiphertext::peek_round(&registered.ciphertext) {
			Ok(round) => (round, None),
			Err(e) => {
				log::warn!(
					target: LOG_TARGET,
					"order {} has an unreadable ciphertext: {e}",
					registered.order_id,
				);
				(registered.round, Some(e.to_string()))
			},
		};
		let order = PendingOrder {
			order_id: registered.order_id,
			ciphertext: registered.ciphertext.clone(),
			target_round,
			chunk_index: 0,
			registered_at: registered.registered_at,
			block_number: registered.block_number,
			processed: error.is_some(),
			tx_hash: None,
			error,
		};
		let inserted = self.store.insert_if_absent(&order)?;
		if inserted {
			log::info!(
				target: LOG_TARGET,
				"queued order {} for round {target_round}",
				registered.order_id,
			);
		}
		Ok(inserted)
	}

	/// Syncs, then follows live registrations until `shutdown` fires.
	///
	/// A failed sync is retried with exponential backoff. When the subscription ends the
	/// watcher resubscribes and syncs again, so a dropped connection only delays new orders.
	pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
		loop {
			let mut live = self.chain.subscribe();
			if !self.catch_up(&mut shutdown).await {
				return
			}

			loop {
				tokio::select! {
					_ = shutdown.changed() => return,
					next = live.next() => match next {
						Some(registered) => {
							if let Err(e) = self.on_live(registered).await {
								// the cursor did not move, the next event backfills
								log::error!(
									target: LOG_TARGET,
									"failed to record registration: {e}",
								);
							}
						},
						None => break,
					},
				}
			}

			log::warn!(
				target: LOG_TARGET,
				"registration stream ended, resubscribing in {:?}",
				self.retry_interval,
			);
			if !pause(&mut shutdown, self.retry_interval).await {
				return
			}
		}
	}

	/// Syncs until it succeeds. Returns `false` if `shutdown` fired first.
	async fn catch_up(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
		let mut delay = self.retry_interval;
		loop {
			match self.sync().await {
				Ok(stored) => {
					log::info!(target: LOG_TARGET, "caught up with history, {stored} new orders");
					return true
				},
				Err(e) => {
					log::warn!(target: LOG_TARGET, "sync failed, retrying in {delay:?}: {e}");
					if !pause(shutdown, delay).await {
						return false
					}
					delay = (delay * 2).min(MAX_RETRY_INTERVAL);
				},
			}
		}
	}
}

/// Sleeps for `delay`. Returns `false` if `shutdown` fired first.
async fn pause(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
	tokio::select! {
		_ = shutdown.changed() => false,
		_ = tokio::time::sleep(delay) => true,
	}
}
