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

//! # Hash-chain ledger
//!
//! The authoritative record of which chunks an order may execute and which already did.
//!
//! Every registered order owns a table of chunk commitments, one per chunk, fixed at
//! registration. A chunk is accepted when its plaintext reproduces the commitment at its index,
//! its `prev_hash` has never been spent, and `(prev_hash, next_hash)` is a valid Poseidon link
//! for its share amount. Accepting it spends `prev_hash`. Spent nullifiers are never unspent.

use crate::Error;
use sp_sealed_crypto::{beacon::RoundNumber, poseidon::verify_link};
use sp_sealed_types::{Address, ChunkParams, OperationType, OrderId, B256};
use std::collections::{HashMap, HashSet};

/// The commitments of one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkTable {
	pub commitments: Vec<B256>,
	pub token_in: Address,
	pub operation_type: OperationType,
	/// Per chunk: whether it has executed.
	pub consumed: Vec<bool>,
	/// Set once the order is recovered; no chunk may execute afterwards.
	pub retired: bool,
}

impl ChunkTable {
	/// Chunks that have neither executed nor been retired.
	pub fn remaining(&self) -> usize {
		if self.retired {
			return 0
		}
		self.consumed.iter().filter(|c| !**c).count()
	}
}

/// A chunk presented for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkClaim {
	pub order_id: OrderId,
	pub chunk_index: u32,
	/// The round the chunk was sealed for.
	pub round: RoundNumber,
	pub params: ChunkParams,
	pub prev_hash: B256,
	pub next_hash: B256,
}

#[derive(Debug, Default)]
pub struct HashChainLedger {
	tables: HashMap<OrderId, ChunkTable>,
	nullifiers: HashSet<B256>,
}

impl HashChainLedger {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records the commitments of `order_id`.
	///
	/// Registering the same data twice is a no-op; anything else under a known id is
	/// rejected.
	pub fn register_order(
		&mut self,
		order_id: OrderId,
		commitments: Vec<B256>,
		token_in: Address,
		operation_type: OperationType,
	) -> Result<(), Error> {
		if commitments.is_empty() {
			return Err(Error::InvalidOrder)
		}
		if let Some(existing) = self.tables.get(&order_id) {
			let same = existing.commitments == commitments &&
				existing.token_in == token_in &&
				existing.operation_type == operation_type;
			return if same { Ok(()) } else { Err(Error::OrderAlreadyExists) }
		}
		let consumed = vec![false; commitments.len()];
		self.tables.insert(
			order_id,
			ChunkTable { commitments, token_in, operation_type, consumed, retired: false },
		);
		Ok(())
	}

	pub fn table(&self, order_id: &OrderId) -> Option<&ChunkTable> {
		self.tables.get(order_id)
	}

	pub fn is_used(&self, nullifier: &B256) -> bool {
		self.nullifiers.contains(nullifier)
	}

	/// Checks a claim without changing any state.
	pub fn verify(&self, claim: &ChunkClaim) -> Result<&ChunkTable, Error> {
		let table = self.tables.get(&claim.order_id).ok_or(Error::OrderNotFound)?;
		if table.retired {
			return Err(Error::OrderRecovered)
		}
		let commitment = table
			.commitments
			.get(claim.chunk_index as usize)
			.ok_or(Error::OrderChunkNotFound)?;
		if claim.params.commitment(claim.round) != *commitment {
			return Err(Error::InvalidOrderHash)
		}
		if self.nullifiers.contains(&claim.prev_hash) ||
			table.consumed[claim.chunk_index as usize]
		{
			return Err(Error::HashChainNodeAlreadyUsed)
		}
		let linked = verify_link(&claim.prev_hash.0, claim.params.shares_amount, &claim.next_hash.0)
			.map_err(|_| Error::InvalidHashChain)?;
		if !linked {
			return Err(Error::InvalidHashChain)
		}
		Ok(table)
	}

	/// Spends the claim's nullifier. Only call after [`Self::verify`] accepted it.
	pub fn consume(&mut self, claim: &ChunkClaim) {
		self.nullifiers.insert(claim.prev_hash);
		if let Some(flag) = self
			.tables
			.get_mut(&claim.order_id)
			.and_then(|t| t.consumed.get_mut(claim.chunk_index as usize))
		{
			*flag = true;
		}
	}

	pub fn verify_and_consume(&mut self, claim: &ChunkClaim) -> Result<(), Error> {
		self.verify(claim)?;
		self.consume(claim);
		Ok(())
	}

	/// Retires every chunk of `order_id` that has not executed. Returns how many were retired.
	pub fn retire(&mut self, order_id: &OrderId) -> Result<usize, Error> {
		let table = self.tables.get_mut(order_id).ok_or(Error::OrderNotFound)?;
		if table.retired {
			return Err(Error::OrderRecovered)
		}
		let remaining = table.remaining();
		table.retired = true;
		Ok(remaining)
	}
}
