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

//! # Sealed Orders Pallet
//!
//! The ledger side of sealed orders: a registry of timelock encrypted orders, the hash-chain
//! ledger that sequences and nullifies their chunks, and the executor that turns a verified
//! chunk into a swap or a liquidity deposit.
//!
//! ## Overview
//!
//! A client seals an order as a chain of chunks, each encrypted for its own beacon round, and
//! registers the head ciphertext together with one commitment per chunk. Nothing about the
//! order is visible until the beacon publishes the signature for the first round. From then on
//! anybody holding the signature can open the chunk and present it with
//! [`SealedOrders::execute_chunk`]. The ledger then:
//!
//! * checks the round has been reached
//! * checks the chunk reproduces its commitment
//! * checks the chunk's hash-chain link and that its nullifier is unspent
//! * executes the chunk through the configured [`Config::Environment`], all or nothing
//! * spends the nullifier and emits [`Event::ChunkExecuted`]
//!
//! All state lives behind one lock, so two callers racing on the same chunk cannot both
//! succeed.
//!
//! Owners may reclaim funds behind chunks that never executed with [`SealedOrders::recover`]
//! once [`LedgerParams::recovery_delay`] has passed.

pub mod events;
pub mod executor;
pub mod hash_chain;
pub mod recovery;
pub mod registry;

#[cfg(test)]
mod mock;
#[cfg(test)]
mod tests;

pub use events::{BlockNumber, Event, EventRecord};
pub use executor::ExecutionOutcome;
pub use hash_chain::ChunkClaim;
pub use registry::OrderRecord;

use events::{EventLog, Observer};
use executor::OrderExecutor;
use hash_chain::HashChainLedger;
use parking_lot::Mutex;
use registry::{OrderRegistry, Registration};
use sha2::{Digest, Sha256};
use sp_sealed_crypto::beacon::{BeaconInfo, RoundNumber};
use sp_sealed_traits::{Dex, Settlement, Transactional, UnixTime, Vault};
use sp_sealed_types::{Address, OperationType, OrderId, B256};
use std::sync::Arc;

const LOG_TARGET: &str = "sealed-orders";

/// One week.
pub const DEFAULT_RECOVERY_DELAY: u64 = 7 * 24 * 60 * 60;

/// The services the ledger runs against.
pub trait Config: 'static {
	/// Vault, DEX and settlement, undone together when a chunk fails.
	type Environment: Vault + Dex + Settlement + Transactional + Send + Sync;
	/// The clock deadlines, rounds and recovery delays are measured against.
	type Time: UnixTime + Send + Sync;
}

/// Ledger parameters fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerParams {
	/// Receives the protocol fee.
	pub treasury: Address,
	/// Protocol fee in basis points of each chunk's output.
	pub protocol_fee_bps: u16,
	/// Seconds after registration before an owner may recover an order.
	pub recovery_delay: u64,
}

impl Default for LedgerParams {
	fn default() -> Self {
		Self {
			treasury: Address::default(),
			protocol_fee_bps: 0,
			recovery_delay: DEFAULT_RECOVERY_DELAY,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// The order has no chunk commitments.
	#[error("invalid order")]
	InvalidOrder,
	/// The head ciphertext is malformed or inconsistent.
	#[error("invalid ciphertext")]
	InvalidCiphertext,
	/// Another order is registered under this id.
	#[error("order already exists")]
	OrderAlreadyExists,
	#[error("order not found")]
	OrderNotFound,
	/// The chunk index is out of range.
	#[error("order chunk not found")]
	OrderChunkNotFound,
	/// The chunk does not reproduce its commitment.
	#[error("invalid order hash")]
	InvalidOrderHash,
	/// The chunk's nullifier was already spent.
	#[error("hash chain node already used")]
	HashChainNodeAlreadyUsed,
	/// `(prev_hash, next_hash)` is not a link for the chunk's shares.
	#[error("invalid hash chain")]
	InvalidHashChain,
	/// The chunk's round has not been reached.
	#[error("round not reached")]
	InvalidRound,
	#[error("intent expired")]
	IntentExpired,
	#[error("output below slippage bound")]
	InvalidSlippage,
	#[error("invalid amounts")]
	InvalidAmounts,
	#[error("insufficient funds")]
	InsufficientFunds,
	#[error("swap failed")]
	SwapFailed,
	#[error("liquidity provision failed")]
	LiquidityProvisionFailed,
	#[error("payout failed")]
	PayoutFailed,
	/// Only the registrant may recover an order.
	#[error("not the order owner")]
	NotOrderOwner,
	#[error("recovery delay has not passed")]
	RecoveryTooEarly,
	/// The order was recovered; none of its chunks can execute.
	#[error("order recovered")]
	OrderRecovered,
	/// Every chunk of the order already executed.
	#[error("nothing to recover")]
	NothingToRecover,
	#[error("vault release failed")]
	ReleaseFailed,
}

/// The result of an executed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionReceipt {
	pub tx_hash: B256,
	pub block_number: BlockNumber,
	pub outcome: ExecutionOutcome,
}

#[derive(Default)]
pub(crate) struct LedgerState {
	pub(crate) block_number: BlockNumber,
	pub(crate) registry: OrderRegistry,
	pub(crate) ledger: HashChainLedger,
	pub(crate) events: EventLog,
}

impl LedgerState {
	pub(crate) fn next_block(&mut self) -> BlockNumber {
		self.block_number += 1;
		self.block_number
	}
}

/// A transaction identifier derived from where it landed.
pub fn tx_hash(block_number: BlockNumber, order_id: &OrderId, chunk_index: u32) -> B256 {
	let mut hasher = Sha256::default();
	hasher.update(b"sealed-orders/tx");
	hasher.update(block_number.to_be_bytes());
	hasher.update(order_id.0);
	hasher.update(chunk_index.to_be_bytes());
	B256::new(hasher.finalize().into())
}

pub struct SealedOrders<T: Config> {
	pub(crate) env: Arc<T::Environment>,
	pub(crate) time: Arc<T::Time>,
	beacon: BeaconInfo,
	pub(crate) params: LedgerParams,
	pub(crate) state: Mutex<LedgerState>,
}

impl<T: Config> SealedOrders<T> {
	pub fn new(
		env: Arc<T::Environment>,
		time: Arc<T::Time>,
		beacon: BeaconInfo,
		params: LedgerParams,
	) -> Self {
		Self { env, time, beacon, params, state: Mutex::new(LedgerState::default()) }
	}

	pub fn beacon(&self) -> &BeaconInfo {
		&self.beacon
	}

	pub fn params(&self) -> &LedgerParams {
		&self.params
	}

	/// The latest beacon round according to the ledger clock.
	pub fn current_round(&self) -> RoundNumber {
		self.beacon.current_round(self.time.now_secs())
	}

	pub fn block_number(&self) -> BlockNumber {
		self.state.lock().block_number
	}

	/// Register an order.
	///
	/// * `caller`: becomes the order owner
	/// * `order_id`: the id to register under
	/// * `ciphertext`: the head ciphertext in wire encoding
	/// * `chunk_hashes`: one commitment per chunk, in execution order
	/// * `token_in`: the vault asset the order withdraws
	/// * `operation_type`: what the chunks do with the withdrawn funds
	///
	/// Registering identical data twice succeeds without emitting a second event.
	pub fn register(
		&self,
		caller: Address,
		order_id: OrderId,
		ciphertext: Vec<u8>,
		chunk_hashes: Vec<B256>,
		token_in: Address,
		operation_type: OperationType,
	) -> Result<OrderId, Error> {
		if chunk_hashes.is_empty() {
			return Err(Error::InvalidOrder)
		}
		let round = OrderRegistry::check_ciphertext(&ciphertext)?;
		let chunk_count = u32::try_from(chunk_hashes.len()).map_err(|_| Error::InvalidOrder)?;
		let now = self.time.now_secs();

		let mut state = self.state.lock();
		let record = OrderRecord {
			order_id,
			owner: caller,
			chunk_commitments: chunk_hashes.clone(),
			token_in,
			operation_type,
			ciphertext: ciphertext.clone(),
			round,
			registered_at: now,
			block_number: state.block_number + 1,
		};
		if state.registry.register(record)? == Registration::Unchanged {
			return Ok(order_id)
		}
		// the registry accepted a new id, so the ledger has no table for it either
		state.ledger.register_order(order_id, chunk_hashes, token_in, operation_type)?;

		let block_number = state.next_block();
		state.events.deposit(
			block_number,
			Event::OrderRegistered {
				order_id,
				owner: caller,
				token_in,
				operation_type,
				round,
				chunk_count,
				registered_at: now,
				ciphertext,
			},
		);
		log::info!(
			target: LOG_TARGET,
			"registered order {order_id} with {chunk_count} chunks, first round {round}",
		);
		Ok(order_id)
	}

	/// The head ciphertext of an order.
	pub fn get(&self, order_id: &OrderId) -> Result<Vec<u8>, Error> {
		self.state
			.lock()
			.registry
			.get(order_id)
			.map(|r| r.ciphertext.clone())
			.ok_or(Error::OrderNotFound)
	}

	pub fn order(&self, order_id: &OrderId) -> Option<OrderRecord> {
		self.state.lock().registry.get(order_id).cloned()
	}

	/// Chunks of an order that can still execute.
	pub fn remaining_chunks(&self, order_id: &OrderId) -> Option<usize> {
		self.state.lock().ledger.table(order_id).map(|t| t.remaining())
	}

	pub fn is_nullifier_used(&self, nullifier: &B256) -> bool {
		self.state.lock().ledger.is_used(nullifier)
	}

	/// Verify a decrypted chunk, execute it and spend its nullifier, as one unit.
	///
	/// On any error nothing changes: the nullifier stays unspent and every external effect is
	/// rolled back.
	pub fn execute_chunk(
		&self,
		caller: Address,
		claim: ChunkClaim,
	) -> Result<ExecutionReceipt, Error> {
		let now = self.time.now_secs();
		if claim.round > self.beacon.current_round(now) {
			return Err(Error::InvalidRound)
		}

		let mut state = self.state.lock();
		let (token_in, operation_type) = {
			let table = state.ledger.verify(&claim)?;
			(table.token_in, table.operation_type)
		};

		let outcome = self.env.with_transaction(|env| {
			OrderExecutor::new(env, &self.params).execute(
				&claim.order_id,
				&token_in,
				operation_type,
				&claim.params,
				&caller,
				now,
			)
		});
		let outcome = match outcome {
			Ok(outcome) => outcome,
			Err(e) => {
				log::warn!(
					target: LOG_TARGET,
					"chunk {} of order {} failed: {e}",
					claim.chunk_index,
					claim.order_id,
				);
				return Err(e)
			},
		};

		state.ledger.consume(&claim);
		let block_number = state.next_block();
		let tx_hash = tx_hash(block_number, &claim.order_id, claim.chunk_index);
		state.events.deposit(
			block_number,
			Event::ChunkExecuted {
				order_id: claim.order_id,
				chunk_index: claim.chunk_index,
				nullifier: claim.prev_hash,
				next_hash: claim.next_hash,
				executor: caller,
				amount_in: outcome.amount_in,
				amount_out: outcome.amount_out,
				tx_hash,
			},
		);
		log::info!(
			target: LOG_TARGET,
			"executed chunk {} of order {} in block {block_number}",
			claim.chunk_index,
			claim.order_id,
		);
		Ok(ExecutionReceipt { tx_hash, block_number, outcome })
	}

	/// Events in blocks `from..=to`.
	pub fn events(&self, from: BlockNumber, to: BlockNumber) -> Vec<EventRecord> {
		self.state.lock().events.range(from, to)
	}

	/// Calls `observer` with every event deposited from now on, while the ledger lock is held.
	pub fn observe(&self, observer: Observer) {
		self.state.lock().events.observe(observer);
	}
}
