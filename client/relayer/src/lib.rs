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

//! # Sealed Orders Relayer
//!
//! Executes sealed orders as the beacon reveals them.
//!
//! ## Overview
//!
//! The relayer runs two loops against an [`OrderChain`]:
//!
//! * the [`EventWatcher`] records every registered order in the [`PendingOrderStore`]
//! * the [`RoundScheduler`] periodically hands orders whose round has been reached to the
//!   [`OrderProcessor`], which fetches the round signature, opens the chunk, submits it and
//!   follows the chain to the next chunk
//!
//! Progress is persisted after every chunk. A restarted relayer resumes from its store, and
//! chunks executed in the meantime by someone else are recognised by their spent nullifiers
//! and skipped.
//!
//! Failures the relayer can outwait (an unreachable beacon, a round not yet published, a
//! failed swap) leave the order pending for the next tick. Failures inherent to the order
//! (a chunk that does not match its commitment, an expired deadline) close it with the error
//! recorded.

pub mod beacon;
pub mod chain;
pub mod config;
pub mod error;
pub mod local;
pub mod processor;
pub mod scheduler;
pub mod store;
pub mod watcher;

#[cfg(test)]
mod mock;

pub use beacon::{BeaconClient, HttpBeacon};
pub use chain::{LocalChain, OrderChain, OrderRegistered};
pub use config::{Cli, Command, RelayerConfig, StatusArgs};
pub use error::Error;
pub use processor::{OrderProcessor, ProcessOutcome};
pub use scheduler::{RoundScheduler, TickOutcome, TickReport, DEFAULT_POLL_INTERVAL};
pub use store::{OrderState, PendingOrder, PendingOrderStore};
pub use watcher::EventWatcher;

use error::StoreError;
use pallet_sealed_orders::BlockNumber;
use sp_sealed_crypto::{beacon::BeaconInfo, tlock::TimelockCipher};
use sp_sealed_traits::UnixTime;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;

const LOG_TARGET: &str = "relayer";

/// Tunables of a [`RelayerService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceParams {
	pub start_block: BlockNumber,
	pub batch_size: u64,
	pub poll_interval: Duration,
	pub beacon_wait_interval: Duration,
	pub beacon_wait_attempts: u32,
}

impl Default for ServiceParams {
	fn default() -> Self {
		Self {
			start_block: 0,
			batch_size: 1000,
			poll_interval: DEFAULT_POLL_INTERVAL,
			beacon_wait_interval: Duration::from_secs(1),
			beacon_wait_attempts: 10,
		}
	}
}

impl From<&RelayerConfig> for ServiceParams {
	fn from(config: &RelayerConfig) -> Self {
		Self {
			start_block: config.start_block,
			batch_size: config.batch_size,
			poll_interval: config.poll_interval(),
			beacon_wait_interval: config.beacon_wait_interval(),
			beacon_wait_attempts: config.beacon_wait_attempts,
		}
	}
}

/// The watcher and the scheduler, wired to shared services.
pub struct RelayerService {
	watcher: EventWatcher,
	scheduler: Arc<RoundScheduler>,
}

impl RelayerService {
	pub fn new(
		chain: Arc<dyn OrderChain>,
		beacon: Arc<dyn BeaconClient>,
		clock: Arc<dyn UnixTime + Send + Sync>,
		store: Arc<PendingOrderStore>,
		info: BeaconInfo,
		params: ServiceParams,
	) -> Self {
		let watcher =
			EventWatcher::new(chain.clone(), store.clone(), params.start_block, params.batch_size);
		let processor = OrderProcessor::new(
			beacon,
			chain,
			store.clone(),
			TimelockCipher::from_beacon(&info),
			params.beacon_wait_interval,
			params.beacon_wait_attempts,
		);
		let scheduler =
			Arc::new(RoundScheduler::new(processor, store, clock, info, params.poll_interval));
		Self { watcher, scheduler }
	}

	pub fn scheduler(&self) -> &Arc<RoundScheduler> {
		&self.scheduler
	}

	/// Runs both loops until `shutdown` fires.
	pub async fn run(self, shutdown: watch::Receiver<bool>) {
		let scheduler = self.scheduler.clone();
		let scheduler_shutdown = shutdown.clone();
		let scheduling = tokio::spawn(async move { scheduler.run(scheduler_shutdown).await });

		self.watcher.run(shutdown).await;
		if let Err(e) = scheduling.await {
			log::error!(target: LOG_TARGET, "scheduler task failed: {e}");
		}
	}
}

/// One line per stored order, for operators.
pub fn status_lines(store: &PendingOrderStore) -> Result<Vec<String>, StoreError> {
	Ok(store
		.all()?
		.iter()
		.map(|order| {
			let mut line = format!(
				"{} {} chunk={} round={} block={}",
				order.order_id,
				order.state(),
				order.chunk_index,
				order.target_round,
				order.block_number,
			);
			if let Some(tx_hash) = &order.tx_hash {
				line.push_str(&format!(" tx={tx_hash}"));
			}
			if let Some(error) = &order.error {
				line.push_str(&format!(" error=\"{error}\""));
			}
			line
		})
		.collect())
}
