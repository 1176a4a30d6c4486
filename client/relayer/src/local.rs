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

//! An in-process ledger for running the relayer without an external chain.

use crate::error::Error;
use pallet_sealed_orders::{Config, LedgerParams, SealedOrders};
use rand::{rngs::OsRng, RngCore};
use sp_sealed_crypto::{beacon::BeaconInfo, tlock::TimelockCipher};
use sp_sealed_traits::{memory::InMemoryEnvironment, SystemClock};
use sp_sealed_types::{
	build_encryption_chain, Address, ChunkParams, ChunkSpec, OperationType, OrderId, B256,
};
use std::sync::Arc;

const LOG_TARGET: &str = "relayer-local";

/// Owner of the demo order.
pub const DEMO_OWNER: Address = Address::repeat_byte(0xa1);
/// Receives the demo order's output.
pub const DEMO_RECIPIENT: Address = Address::repeat_byte(0xb0);
pub const DEMO_TOKEN_IN: Address = Address::repeat_byte(0x10);
pub const DEMO_TOKEN_OUT: Address = Address::repeat_byte(0x20);

/// Shares per demo chunk.
const DEMO_SHARES: [u128; 3] = [30, 20, 50];
/// Rounds between demo chunks.
const DEMO_ROUND_GAP: u64 = 2;

/// An in-memory environment on the system clock.
pub struct Local;

impl Config for Local {
	type Environment = InMemoryEnvironment;
	type Time = SystemClock;
}

pub type LocalLedger = SealedOrders<Local>;

/// A ledger over a fresh in-memory environment.
pub fn local_ledger(
	beacon: BeaconInfo,
	params: LedgerParams,
) -> (Arc<LocalLedger>, Arc<InMemoryEnvironment>) {
	let env = Arc::new(InMemoryEnvironment::new());
	let ledger = Arc::new(SealedOrders::new(env.clone(), Arc::new(SystemClock), beacon, params));
	(ledger, env)
}

/// Seals and registers a three chunk swap that opens over the next few rounds.
pub fn register_demo_order(
	ledger: &LocalLedger,
	env: &InMemoryEnvironment,
) -> Result<OrderId, Error> {
	let mut user_key = [0u8; 32];
	let mut nonce = [0u8; 32];
	let mut order_id = B256::default();
	OsRng.fill_bytes(&mut user_key);
	OsRng.fill_bytes(&mut nonce);
	OsRng.fill_bytes(&mut order_id.0);

	let first_round = ledger.current_round() + DEMO_ROUND_GAP;
	let specs: Vec<ChunkSpec> = DEMO_SHARES
		.iter()
		.zip(0u64..)
		.map(|(shares, i)| ChunkSpec {
			params: ChunkParams {
				shares_amount: *shares,
				amount_out_min: shares * 2,
				slippage_bps: 100,
				deadline: u64::MAX,
				recipient: DEMO_RECIPIENT,
				token_out: DEMO_TOKEN_OUT,
				execution_fee_bps: 10,
				liquidity: None,
			},
			round: first_round + i * DEMO_ROUND_GAP,
		})
		.collect();
	let total: u128 = DEMO_SHARES.iter().sum();

	let cipher = TimelockCipher::from_beacon(ledger.beacon());
	let chain = build_encryption_chain(&cipher, &user_key, &nonce, total, &specs, &mut OsRng)?;

	env.set_rate(DEMO_TOKEN_IN, DEMO_TOKEN_OUT, 2, 1);
	env.deposit(order_id, DEMO_TOKEN_IN, total);
	ledger
		.register(
			DEMO_OWNER,
			order_id,
			chain.head.to_bytes()?,
			chain.commitments,
			DEMO_TOKEN_IN,
			OperationType::Swap,
		)
		.map_err(|e| Error::Config(format!("demo order rejected: {e}")))?;

	log::info!(
		target: LOG_TARGET,
		"registered demo order {order_id}, first chunk opens at round {first_round}",
	);
	Ok(order_id)
}

#[cfg(test)]
mod tests {
	use super::*;
	use sp_sealed_crypto::test_utils::DevBeacon;
	use sp_sealed_traits::UnixTime;

	#[test]
	fn demo_order_is_registered_for_upcoming_rounds() {
		let beacon = DevBeacon::new(9, 0, 3);
		let (ledger, env) = local_ledger(beacon.info().clone(), LedgerParams::default());
		let order_id = register_demo_order(&ledger, &env).unwrap();

		let record = ledger.order(&order_id).unwrap();
		assert_eq!(record.chunk_commitments.len(), 3);
		assert_eq!(record.owner, DEMO_OWNER);
		assert!(record.round > beacon.info().current_round(SystemClock.now_secs()));
		assert_eq!(env.position_shares(&order_id), 100);
		assert_eq!(ledger.remaining_chunks(&order_id), Some(3));
	}
}
