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

use crate::{hash_chain::ChunkClaim, Config, LedgerParams, SealedOrders};
use rand::rngs::OsRng;
use sp_sealed_crypto::{
	beacon::RoundNumber,
	test_utils::DevBeacon,
	tlock::{TimelockCipher, TimelockCiphertext},
};
use sp_sealed_traits::memory::{InMemoryEnvironment, ManualClock};
use sp_sealed_types::{
	build_encryption_chain, Address, ChunkParams, ChunkSpec, EncryptionChain, OrderChunk, OrderId,
	B256,
};
use std::sync::Arc;

pub struct Test;

impl Config for Test {
	type Environment = InMemoryEnvironment;
	type Time = ManualClock;
}

pub const ALICE: Address = Address::repeat_byte(0xa1);
pub const BOB: Address = Address::repeat_byte(0xb0);
pub const RELAYER: Address = Address::repeat_byte(0x7e);
pub const TREASURY: Address = Address::repeat_byte(0x77);
pub const USDC: Address = Address::repeat_byte(0x10);
pub const WETH: Address = Address::repeat_byte(0x20);

pub const GENESIS: u64 = 1_000_000;
pub const PERIOD: u64 = 3;
pub const PROTOCOL_FEE_BPS: u16 = 10;
pub const RECOVERY_DELAY: u64 = 3_600;
pub const USER_KEY: [u8; 32] = [0x42; 32];
pub const NONCE: [u8; 32] = [0x24; 32];

/// Asserts a call failed with `$err` and left no trace in the event log.
macro_rules! assert_noop {
	($ext:expr, $call:expr, $err:expr $(,)?) => {{
		let before = $ext.orders.block_number();
		assert_eq!($call.map(|_| ()), Err($err));
		assert_eq!($ext.orders.block_number(), before);
	}};
}
pub(crate) use assert_noop;

pub struct TestExt {
	pub orders: SealedOrders<Test>,
	pub env: Arc<InMemoryEnvironment>,
	pub clock: Arc<ManualClock>,
	pub beacon: DevBeacon,
}

pub fn new_test_ext() -> TestExt {
	let beacon = DevBeacon::new(0xbeac0, GENESIS, PERIOD);
	let env = Arc::new(InMemoryEnvironment::new());
	env.set_rate(USDC, WETH, 2, 1);
	let clock = Arc::new(ManualClock::new(GENESIS));
	let params = LedgerParams {
		treasury: TREASURY,
		protocol_fee_bps: PROTOCOL_FEE_BPS,
		recovery_delay: RECOVERY_DELAY,
	};
	let orders = SealedOrders::new(env.clone(), clock.clone(), beacon.info().clone(), params);
	TestExt { orders, env, clock, beacon }
}

/// A sealed order ready to register.
pub struct Sealed {
	pub order_id: OrderId,
	pub chain: EncryptionChain,
	pub specs: Vec<ChunkSpec>,
}

pub fn swap_params(shares: u128) -> ChunkParams {
	ChunkParams {
		shares_amount: shares,
		amount_out_min: shares * 2,
		slippage_bps: 50,
		deadline: u64::MAX,
		recipient: BOB,
		token_out: WETH,
		execution_fee_bps: 20,
		liquidity: None,
	}
}

impl TestExt {
	pub fn execute_with<R>(self, f: impl FnOnce(&TestExt) -> R) -> R {
		f(&self)
	}

	pub fn cipher(&self) -> TimelockCipher {
		TimelockCipher::from_beacon(self.beacon.info())
	}

	pub fn advance_to_round(&self, round: RoundNumber) {
		self.clock.set(self.beacon.info().round_time(round));
	}

	/// Deposits the order's shares and seals one chunk per `(params, round)`.
	pub fn seal(&self, order_id: OrderId, chunks: Vec<(ChunkParams, RoundNumber)>) -> Sealed {
		let specs: Vec<ChunkSpec> =
			chunks.into_iter().map(|(params, round)| ChunkSpec { params, round }).collect();
		let total: u128 = specs.iter().map(|s| s.params.shares_amount).sum();
		self.env.deposit(order_id, USDC, total);
		let chain =
			build_encryption_chain(&self.cipher(), &USER_KEY, &NONCE, total, &specs, &mut OsRng)
				.unwrap();
		Sealed { order_id, chain, specs }
	}

	pub fn register(&self, sealed: &Sealed) -> Result<OrderId, crate::Error> {
		self.orders.register(
			ALICE,
			sealed.order_id,
			sealed.chain.head.to_bytes().unwrap(),
			sealed.chain.commitments.clone(),
			USDC,
			sp_sealed_types::OperationType::Swap,
		)
	}

	/// Opens a ciphertext with the beacon signature for its round.
	pub fn open(&self, ct: &TimelockCiphertext) -> OrderChunk {
		let sig = self.beacon.sign(ct.round).unwrap();
		OrderChunk::from_plaintext(&self.cipher().decrypt(ct, &sig).unwrap()).unwrap()
	}

	/// Opens every chunk of an order in sequence.
	pub fn open_all(&self, sealed: &Sealed) -> Vec<(RoundNumber, OrderChunk)> {
		let mut out = Vec::new();
		let mut current = Some(sealed.chain.head.clone());
		while let Some(ct) = current {
			let chunk = self.open(&ct);
			current = chunk.next_ciphertext.clone();
			out.push((ct.round, chunk));
		}
		out
	}
}

pub fn claim(
	order_id: OrderId,
	chunk_index: u32,
	round: RoundNumber,
	chunk: &OrderChunk,
) -> ChunkClaim {
	ChunkClaim {
		order_id,
		chunk_index,
		round,
		params: chunk.params(),
		prev_hash: chunk.prev_hash,
		next_hash: chunk.next_hash,
	}
}

pub fn order_id(n: u8) -> OrderId {
	B256::repeat_byte(n)
}
