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

//! Opens and executes pending orders.
//!
//! An order is a chain of ciphertexts, each revealing the next. The processor walks the chain
//! iteratively, persisting progress after every chunk, and stops at the first chunk whose round
//! lies in the future. That chunk stays queued for a later tick.

use crate::{
	beacon::{wait_for_round, BeaconClient},
	chain::OrderChain,
	error::{ChainError, Error, StoreError},
	store::{PendingOrder, PendingOrderStore},
};
use pallet_sealed_orders::{ChunkClaim, Error as LedgerError};
use sp_sealed_crypto::{beacon::RoundNumber, tlock::{TimelockCipher, TimelockCiphertext}};
use sp_sealed_types::{OrderChunk, B256};
use std::{sync::Arc, time::Duration};

const LOG_TARGET: &str = "relayer-processor";

/// What became of an order after one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
	/// The last chunk is done. `executed` counts chunks this pass submitted.
	Completed { executed: u32 },
	/// Stopped at a chunk sealed for `next_round`.
	Deferred { executed: u32, next_round: RoundNumber },
	/// A transient failure; the order is retried on the next tick.
	Retrying(String),
	/// A structural failure; the order is closed.
	Failed(String),
}

/// The result of opening and submitting one chunk.
struct Step {
	/// `None` if the chunk had already executed.
	tx_hash: Option<B256>,
	/// The following ciphertext and its round.
	next: Option<(RoundNumber, Vec<u8>)>,
}

pub struct OrderProcessor {
	beacon: Arc<dyn BeaconClient>,
	chain: Arc<dyn OrderChain>,
	store: Arc<PendingOrderStore>,
	cipher: TimelockCipher,
	wait_interval: Duration,
	wait_attempts: u32,
}

impl OrderProcessor {
	pub fn new(
		beacon: Arc<dyn BeaconClient>,
		chain: Arc<dyn OrderChain>,
		store: Arc<PendingOrderStore>,
		cipher: TimelockCipher,
		wait_interval: Duration,
		wait_attempts: u32,
	) -> Self {
		Self { beacon, chain, store, cipher, wait_interval, wait_attempts }
	}

	/// Processes `order` as far as `current_round` allows.
	///
	/// Only a failing store is returned as an error; every other failure is recorded on the
	/// order and reported in the outcome.
	pub async fn process(
		&self,
		mut order: PendingOrder,
		current_round: RoundNumber,
	) -> Result<ProcessOutcome, StoreError> {
		let mut executed = 0;
		loop {
			if order.target_round > current_round {
				self.store.put(&order)?;
				log::debug!(
					target: LOG_TARGET,
					"order {} waits for round {}",
					order.order_id,
					order.target_round,
				);
				return Ok(ProcessOutcome::Deferred { executed, next_round: order.target_round })
			}

			let step = match self.step(&order).await {
				Ok(step) => step,
				Err(e) => return self.record_failure(order, e),
			};

			if let Some(tx_hash) = step.tx_hash {
				order.tx_hash = Some(tx_hash);
				executed += 1;
			}
			order.error = None;
			match step.next {
				Some((round, ciphertext)) => {
					order.chunk_index += 1;
					order.target_round = round;
					order.ciphertext = ciphertext;
					self.store.put(&order)?;
				},
				None => {
					order.processed = true;
					self.store.put(&order)?;
					log::info!(target: LOG_TARGET, "order {} completed", order.order_id);
					return Ok(ProcessOutcome::Completed { executed })
				},
			}
		}
	}

	fn record_failure(
		&self,
		mut order: PendingOrder,
		error: Error,
	) -> Result<ProcessOutcome, StoreError> {
		let message = error.to_string();
		let transient = error.is_transient();
		order.processed = !transient;
		order.error = Some(message.clone());
		self.store.put(&order)?;

		if transient {
			log::warn!(
				target: LOG_TARGET,
				"chunk {} of order {} will be retried: {message}",
				order.chunk_index,
				order.order_id,
			);
			Ok(ProcessOutcome::Retrying(message))
		} else {
			log::error!(
				target: LOG_TARGET,
				"chunk {} of order {} failed: {message}",
				order.chunk_index,
				order.order_id,
			);
			Ok(ProcessOutcome::Failed(message))
		}
	}

	async fn step(&self, order: &PendingOrder) -> Result<Step, Error> {
		let ciphertext = TimelockCiphertext::from_bytes(&order.ciphertext)?;
		let signature = wait_for_round(
			self.beacon.as_ref(),
			ciphertext.round,
			self.wait_interval,
			self.wait_attempts,
		)
		.await?;
		// checks the signature before touching the payload
		let plaintext = self.cipher.decrypt(&ciphertext, &signature)?;
		let chunk = OrderChunk::from_plaintext(&plaintext)?;

		let next = match &chunk.next_ciphertext {
			Some(next) => Some((next.round, next.to_bytes()?)),
			None => None,
		};

		if self.chain.is_nullifier_used(&chunk.prev_hash).await? {
			log::info!(
				target: LOG_TARGET,
				"chunk {} of order {} already executed",
				order.chunk_index,
				order.order_id,
			);
			return Ok(Step { tx_hash: None, next })
		}

		let claim = ChunkClaim {
			order_id: order.order_id,
			chunk_index: order.chunk_index,
			round: ciphertext.round,
			params: chunk.params(),
			prev_hash: chunk.prev_hash,
			next_hash: chunk.next_hash,
		};
		match self.chain.execute_chunk(claim).await {
			Ok(tx_hash) => {
				log::info!(
					target: LOG_TARGET,
					"executed chunk {} of order {}: {tx_hash}",
					order.chunk_index,
					order.order_id,
				);
				Ok(Step { tx_hash: Some(tx_hash), next })
			},
			// lost a race with another executor
			Err(ChainError::Rejected(LedgerError::HashChainNodeAlreadyUsed)) =>
				Ok(Step { tx_hash: None, next }),
			Err(e) => Err(e.into()),
		}
	}
}
