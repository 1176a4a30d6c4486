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

//! Durable relayer state.
//!
//! Two column families:
//!
//! * `orders`: `order_id -> PendingOrder` as JSON
//! * `meta`: the event watcher cursor
//!
//! A pending order always holds the ciphertext of its next unexecuted chunk, so a relayer
//! restarted mid-chain continues where it stopped rather than from the head.

use crate::error::StoreError;
use parking_lot::Mutex;
use pallet_sealed_orders::BlockNumber;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, DB};
use serde::{Deserialize, Serialize};
use sp_sealed_crypto::beacon::RoundNumber;
use sp_sealed_types::{OrderId, B256};
use std::{fmt, path::Path};

const CF_ORDERS: &str = "orders";
const CF_META: &str = "meta";
const KEY_LAST_BLOCK: &[u8] = b"last_block";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrder {
	pub order_id: OrderId,
	/// The ciphertext of the next chunk to execute, in wire encoding.
	#[serde(with = "hex")]
	pub ciphertext: Vec<u8>,
	/// The round of `ciphertext`.
	pub target_round: RoundNumber,
	/// Index of the chunk `ciphertext` holds.
	pub chunk_index: u32,
	pub registered_at: u64,
	pub block_number: BlockNumber,
	/// Set once the chain completed or failed for good.
	pub processed: bool,
	/// The latest successful execution.
	pub tx_hash: Option<B256>,
	/// The latest failure, if it has not been resolved since.
	pub error: Option<String>,
}

/// Where an order stands, derived from the stored fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
	/// Waiting for its round.
	Pending,
	/// The last attempt failed transiently; it will be retried.
	Retrying,
	/// Every chunk executed.
	Executed,
	/// Failed for good.
	Failed,
}

impl fmt::Display for OrderState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			OrderState::Pending => "pending",
			OrderState::Retrying => "retrying",
			OrderState::Executed => "executed",
			OrderState::Failed => "failed",
		};
		f.write_str(s)
	}
}

impl PendingOrder {
	pub fn state(&self) -> OrderState {
		match (self.processed, self.error.is_some()) {
			(false, false) => OrderState::Pending,
			(false, true) => OrderState::Retrying,
			(true, false) => OrderState::Executed,
			(true, true) => OrderState::Failed,
		}
	}
}

/// A RocksDB backed store of pending orders.
pub struct PendingOrderStore {
	db: DB,
	// serializes read-modify-write sequences
	write_lock: Mutex<()>,
}

impl PendingOrderStore {
	/// Opens the store at `path`, creating it if missing.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
		let mut opts = Options::default();
		opts.create_if_missing(true);
		opts.create_missing_column_families(true);

		let families = vec![
			ColumnFamilyDescriptor::new(CF_ORDERS, Options::default()),
			ColumnFamilyDescriptor::new(CF_META, Options::default()),
		];
		let db = DB::open_cf_descriptors(&opts, path, families)?;
		Ok(Self { db, write_lock: Mutex::new(()) })
	}

	/// Opens an existing store for inspection, alongside a running relayer if need be.
	pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
		let db = DB::open_cf_for_read_only(&Options::default(), path, [CF_ORDERS, CF_META], false)?;
		Ok(Self { db, write_lock: Mutex::new(()) })
	}

	fn cf(&self, name: &'static str) -> Result<&rocksdb::ColumnFamily, StoreError> {
		self.db.cf_handle(name).ok_or(StoreError::MissingColumnFamily(name))
	}

	pub fn get(&self, order_id: &OrderId) -> Result<Option<PendingOrder>, StoreError> {
		match self.db.get_cf(self.cf(CF_ORDERS)?, order_id.as_slice())? {
			Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
			None => Ok(None),
		}
	}

	/// Writes `order`, replacing any previous version.
	pub fn put(&self, order: &PendingOrder) -> Result<(), StoreError> {
		let _guard = self.write_lock.lock();
		self.write(order)
	}

	fn write(&self, order: &PendingOrder) -> Result<(), StoreError> {
		let bytes = serde_json::to_vec(order)?;
		self.db.put_cf(self.cf(CF_ORDERS)?, order.order_id.as_slice(), bytes)?;
		Ok(())
	}

	/// Writes `order` unless one with the same id exists. Returns whether it was written.
	pub fn insert_if_absent(&self, order: &PendingOrder) -> Result<bool, StoreError> {
		let _guard = self.write_lock.lock();
		if self.db.get_cf(self.cf(CF_ORDERS)?, order.order_id.as_slice())?.is_some() {
			return Ok(false);
		}
		self.write(order)?;
		Ok(true)
	}

	pub fn all(&self) -> Result<Vec<PendingOrder>, StoreError> {
		let mut orders = Vec::new();
		for item in self.db.iterator_cf(self.cf(CF_ORDERS)?, IteratorMode::Start) {
			let (_, value) = item?;
			orders.push(serde_json::from_slice::<PendingOrder>(&value)?);
		}
		Ok(orders)
	}

	/// Unprocessed orders whose next chunk opens at or before `current_round`, oldest round
	/// first.
	pub fn ready(&self, current_round: RoundNumber) -> Result<Vec<PendingOrder>, StoreError> {
		let mut ready: Vec<PendingOrder> = self
			.all()?
			.into_iter()
			.filter(|o| !o.processed && o.target_round <= current_round)
			.collect();
		ready.sort_by_key(|o| (o.target_round, o.block_number, o.order_id));
		Ok(ready)
	}

	/// The last block the event watcher fully processed.
	pub fn last_block(&self) -> Result<Option<BlockNumber>, StoreError> {
		let value = self.db.get_cf(self.cf(CF_META)?, KEY_LAST_BLOCK)?;
		Ok(value
			.and_then(|bytes| <[u8; 8]>::try_from(bytes.as_slice()).ok())
			.map(BlockNumber::from_be_bytes))
	}

	pub fn set_last_block(&self, block: BlockNumber) -> Result<(), StoreError> {
		self.db.put_cf(self.cf(CF_META)?, KEY_LAST_BLOCK, block.to_be_bytes())?;
		Ok(())
	}
}
