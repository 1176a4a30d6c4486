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

//! The order registry: which ciphertext belongs to which order, and who owns it.

use crate::{events::BlockNumber, Error};
use sp_sealed_crypto::{beacon::RoundNumber, tlock::TimelockCiphertext};
use sp_sealed_types::{Address, OperationType, OrderId, B256};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
	pub order_id: OrderId,
	pub owner: Address,
	pub chunk_commitments: Vec<B256>,
	pub token_in: Address,
	pub operation_type: OperationType,
	/// The head ciphertext in wire encoding.
	pub ciphertext: Vec<u8>,
	/// The round of the head ciphertext.
	pub round: RoundNumber,
	/// Unix time of registration.
	pub registered_at: u64,
	pub block_number: BlockNumber,
}

impl OrderRecord {
	fn same_registration(&self, other: &OrderRecord) -> bool {
		self.owner == other.owner &&
			self.chunk_commitments == other.chunk_commitments &&
			self.token_in == other.token_in &&
			self.operation_type == other.operation_type &&
			self.ciphertext == other.ciphertext
	}
}

/// Whether a registration created a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
	Created,
	Unchanged,
}

#[derive(Debug, Default)]
pub struct OrderRegistry {
	records: HashMap<OrderId, OrderRecord>,
}

impl OrderRegistry {
	/// Parses and checks a head ciphertext, returning its round.
	///
	/// The ciphertext must follow the wire schema and be internally consistent; whether it
	/// decrypts can only be known once its round is reached.
	pub fn check_ciphertext(ciphertext: &[u8]) -> Result<RoundNumber, Error> {
		let parsed = TimelockCiphertext::from_bytes(ciphertext).map_err(|e| {
			log::debug!(target: crate::LOG_TARGET, "rejected ciphertext: {e}");
			Error::InvalidCiphertext
		})?;
		if !parsed.verify_pre_round() {
			return Err(Error::InvalidCiphertext)
		}
		Ok(parsed.round)
	}

	pub fn register(&mut self, record: OrderRecord) -> Result<Registration, Error> {
		if record.chunk_commitments.is_empty() {
			return Err(Error::InvalidOrder)
		}
		match self.records.get(&record.order_id) {
			Some(existing) if existing.same_registration(&record) => Ok(Registration::Unchanged),
			Some(_) => Err(Error::OrderAlreadyExists),
			None => {
				self.records.insert(record.order_id, record);
				Ok(Registration::Created)
			},
		}
	}

	pub fn get(&self, order_id: &OrderId) -> Option<&OrderRecord> {
		self.records.get(order_id)
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}
