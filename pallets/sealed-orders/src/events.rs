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

//! Events emitted by the ledger, numbered by the block that produced them.

use sp_sealed_crypto::beacon::RoundNumber;
use sp_sealed_types::{Address, OperationType, OrderId, B256};

/// A block number of the ledger. Every successful state change opens a new block.
pub type BlockNumber = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	/// An order was registered.
	OrderRegistered {
		order_id: OrderId,
		owner: Address,
		token_in: Address,
		operation_type: OperationType,
		/// The round of the head ciphertext.
		round: RoundNumber,
		chunk_count: u32,
		/// Unix time of registration.
		registered_at: u64,
		/// The head ciphertext in wire encoding.
		ciphertext: Vec<u8>,
	},
	/// A chunk executed and spent `nullifier`.
	ChunkExecuted {
		order_id: OrderId,
		chunk_index: u32,
		nullifier: B256,
		next_hash: B256,
		executor: Address,
		amount_in: u128,
		amount_out: u128,
		tx_hash: B256,
	},
	/// The owner reclaimed the funds behind the unexecuted chunks of an order.
	OrderRecovered {
		order_id: OrderId,
		owner: Address,
		retired_chunks: u32,
		released_shares: u128,
	},
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
	pub block_number: BlockNumber,
	pub event: Event,
}

pub type Observer = Box<dyn Fn(&EventRecord) + Send + Sync>;

/// Append-only event history plus synchronous observers of new records.
#[derive(Default)]
pub struct EventLog {
	records: Vec<EventRecord>,
	observers: Vec<Observer>,
}

impl EventLog {
	pub fn deposit(&mut self, block_number: BlockNumber, event: Event) {
		let record = EventRecord { block_number, event };
		for observer in &self.observers {
			observer(&record);
		}
		self.records.push(record);
	}

	/// Records with `from <= block_number <= to`.
	pub fn range(&self, from: BlockNumber, to: BlockNumber) -> Vec<EventRecord> {
		let start = self.records.partition_point(|r| r.block_number < from);
		self.records[start..].iter().take_while(|r| r.block_number <= to).cloned().collect()
	}

	pub fn observe(&mut self, observer: Observer) {
		self.observers.push(observer);
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn last(&self) -> Option<&EventRecord> {
		self.records.last()
	}
}
