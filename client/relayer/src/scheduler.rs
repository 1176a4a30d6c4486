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

//! Drives the processor on a fixed interval.

use crate::{
	error::StoreError,
	processor::{OrderProcessor, ProcessOutcome},
	store::PendingOrderStore,
};
use sp_sealed_crypto::beacon::{BeaconInfo, RoundNumber};
use sp_sealed_traits::UnixTime;
use std::{
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};
use tokio::{sync::watch, time::MissedTickBehavior};

const LOG_TARGET: &str = "relayer-scheduler";

/// Default time between ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Tally of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
	pub round: RoundNumber,
	/// Orders picked up.
	pub orders: usize,
	/// Chunks submitted.
	pub executed: u32,
	pub completed: usize,
	pub deferred: usize,
	pub retrying: usize,
	pub failed: usize,
}

impl TickReport {
	fn record(&mut self, outcome: &ProcessOutcome) {
		match outcome {
			ProcessOutcome::Completed { executed } => {
				self.executed += executed;
				self.completed += 1;
			},
			ProcessOutcome::Deferred { executed, .. } => {
				self.executed += executed;
				self.deferred += 1;
			},
			ProcessOutcome::Retrying(_) => self.retrying += 1,
			ProcessOutcome::Failed(_) => self.failed += 1,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
	/// A previous tick was still running.
	Skipped,
	Processed(TickReport),
}

/// Clears the busy flag when a tick ends, however it ends.
struct TickGuard<'a>(&'a AtomicBool);

impl<'a> TickGuard<'a> {
	fn acquire(flag: &'a AtomicBool) -> Option<Self> {
		flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.ok()
			.map(|_| TickGuard(flag))
	}
}

impl Drop for TickGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

pub struct RoundScheduler {
	processor: OrderProcessor,
	store: Arc<PendingOrderStore>,
	clock: Arc<dyn UnixTime + Send + Sync>,
	beacon: BeaconInfo,
	interval: Duration,
	busy: AtomicBool,
}

impl RoundScheduler {
	pub fn new(
		processor: OrderProcessor,
		store: Arc<PendingOrderStore>,
		clock: Arc<dyn UnixTime + Send + Sync>,
		beacon: BeaconInfo,
		interval: Duration,
	) -> Self {
		Self { processor, store, clock, beacon, interval, busy: AtomicBool::new(false) }
	}

	pub fn current_round(&self) -> RoundNumber {
		self.beacon.current_round(self.clock.now_secs())
	}

	/// Processes every ready order, one after another.
	///
	/// Returns [`TickOutcome::Skipped`] without doing anything while another tick runs.
	pub async fn tick(&self) -> Result<TickOutcome, StoreError> {
		let Some(_guard) = TickGuard::acquire(&self.busy) else {
			log::debug!(target: LOG_TARGET, "previous tick still running");
			return Ok(TickOutcome::Skipped)
		};

		let round = self.current_round();
		let ready = self.store.ready(round)?;
		let mut report = TickReport { round, orders: ready.len(), ..Default::default() };

		for order in ready {
			let order_id = order.order_id;
			match self.processor.process(order, round).await {
				Ok(outcome) => report.record(&outcome),
				Err(e) => {
					log::error!(
						target: LOG_TARGET,
						"could not record progress of order {order_id}: {e}",
					);
					report.retrying += 1;
				},
			}
		}

		if report.orders > 0 {
			log::info!(
				target: LOG_TARGET,
				"round {round}: {} orders, {} chunks executed, {} deferred, {} retrying, {} failed",
				report.orders,
				report.executed,
				report.deferred,
				report.retrying,
				report.failed,
			);
		}
		Ok(TickOutcome::Processed(report))
	}

	/// Ticks every interval until `shutdown` fires.
	pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
		let mut interval = tokio::time::interval(self.interval);
		interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
		log::info!(target: LOG_TARGET, "polling every {:?}", self.interval);

		loop {
			tokio::select! {
				_ = shutdown.changed() => break,
				_ = interval.tick() => {
					if let Err(e) = self.tick().await {
						log::error!(target: LOG_TARGET, "tick failed: {e}");
					}
				},
			}
		}
	}
}
