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

//! The relayer's view of the ledger.
//!
//! [`OrderChain`] is everything the relayer needs from wherever orders are registered and
//! executed. [`LocalChain`] implements it over an in-process [`SealedOrders`] ledger.

use crate::error::ChainError;
use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use pallet_sealed_orders::{
	BlockNumber, ChunkClaim, Config, Event, EventRecord, SealedOrders,
};
use sp_sealed_crypto::beacon::RoundNumber;
use sp_sealed_types::{Address, OrderId, B256};
use std::sync::Arc;
use tokio::sync::broadcast;

const LOG_TARGET: &str = "relayer-chain";

/// Capacity of the live registration channel.
const LIVE_CHANNEL_CAPACITY: usize = 1024;

/// A registration as seen by the relayer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRegistered {
	pub order_id: OrderId,
	/// The head ciphertext in wire encoding.
	pub ciphertext: Vec<u8>,
	pub round: RoundNumber,
	pub registered_at: u64,
	pub block_number: BlockNumber,
}

impl OrderRegistered {
	fn from_record(record: &EventRecord) -> Option<Self> {
		match &record.event {
			Event::OrderRegistered { order_id, ciphertext, round, registered_at, .. } =>
				Some(Self {
					order_id: *order_id,
					ciphertext: ciphertext.clone(),
					round: *round,
					registered_at: *registered_at,
					block_number: record.block_number,
				}),
			_ => None,
		}
	}
}

#[async_trait]
pub trait OrderChain: Send + Sync {
	async fn latest_block(&self) -> Result<BlockNumber, ChainError>;

	/// Registrations in blocks `from..=to`, in block order.
	async fn registrations(
		&self,
		from: BlockNumber,
		to: BlockNumber,
	) -> Result<Vec<OrderRegistered>, ChainError>;

	/// Registrations from now on. The stream may skip entries if the consumer falls behind.
	fn subscribe(&self) -> BoxStream<'static, OrderRegistered>;

	async fn is_nullifier_used(&self, nullifier: &B256) -> Result<bool, ChainError>;

	/// Submits a decrypted chunk, returning the transaction hash.
	async fn execute_chunk(&self, claim: ChunkClaim) -> Result<B256, ChainError>;
}

/// An [`OrderChain`] over a ledger in the same process.
pub struct LocalChain<T: Config> {
	orders: Arc<SealedOrders<T>>,
	caller: Address,
	live: broadcast::Sender<OrderRegistered>,
}

impl<T: Config> LocalChain<T> {
	/// Wraps `orders`, submitting executions as `caller`.
	pub fn new(orders: Arc<SealedOrders<T>>, caller: Address) -> Self {
		let (live, _) = broadcast::channel(LIVE_CHANNEL_CAPACITY);
		let sender = live.clone();
		orders.observe(Box::new(move |record| {
			if let Some(registered) = OrderRegistered::from_record(record) {
				// no receivers is fine: the watcher replays history on start
				let _ = sender.send(registered);
			}
		}));
		Self { orders, caller, live }
	}

	pub fn orders(&self) -> &Arc<SealedOrders<T>> {
		&self.orders
	}
}

#[async_trait]
impl<T: Config> OrderChain for LocalChain<T> {
	async fn latest_block(&self) -> Result<BlockNumber, ChainError> {
		Ok(self.orders.block_number())
	}

	async fn registrations(
		&self,
		from: BlockNumber,
		to: BlockNumber,
	) -> Result<Vec<OrderRegistered>, ChainError> {
		Ok(self.orders.events(from, to).iter().filter_map(OrderRegistered::from_record).collect())
	}

	fn subscribe(&self) -> BoxStream<'static, OrderRegistered> {
		let receiver = self.live.subscribe();
		futures::stream::unfold(receiver, |mut receiver| async move {
			loop {
				match receiver.recv().await {
					Ok(registered) => return Some((registered, receiver)),
					Err(broadcast::error::RecvError::Lagged(skipped)) => {
						log::warn!(
							target: LOG_TARGET,
							"live subscription skipped {skipped} registrations",
						);
					},
					Err(broadcast::error::RecvError::Closed) => return None,
				}
			}
		})
		.boxed()
	}

	async fn is_nullifier_used(&self, nullifier: &B256) -> Result<bool, ChainError> {
		Ok(self.orders.is_nullifier_used(nullifier))
	}

	async fn execute_chunk(&self, claim: ChunkClaim) -> Result<B256, ChainError> {
		self.orders
			.execute_chunk(self.caller, claim)
			.map(|receipt| receipt.tx_hash)
			.map_err(ChainError::Rejected)
	}
}
