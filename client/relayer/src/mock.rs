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

use crate::{
	beacon::BeaconClient,
	chain::{LocalChain, OrderChain, OrderRegistered},
	error::{BeaconError, ChainError},
	processor::OrderProcessor,
	scheduler::RoundScheduler,
	store::PendingOrderStore,
};
use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use pallet_sealed_orders::{BlockNumber, ChunkClaim, Config, LedgerParams, SealedOrders};
use rand::rngs::OsRng;
use sp_sealed_crypto::{
	beacon::RoundNumber,
	test_utils::DevBeacon,
	tlock::{TimelockCipher, TimelockCiphertext},
	G1Affine,
};
use sp_sealed_traits::memory::{InMemoryEnvironment, ManualClock};
use sp_sealed_types::{
	build_encryption_chain, Address, ChunkParams, ChunkSpec, EncryptionChain, OperationType,
	OrderChunk, OrderId, B256,
};
use std::{
	sync::{
		atomic::{AtomicU32, AtomicU64, Ordering},
		Arc,
	},
	time::Duration,
};

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
pub const USER_KEY: [u8; 32] = [0x42; 32];
pub const NONCE: [u8; 32] = [0x24; 32];

/// A beacon that publishes rounds on demand.
#[derive(Clone)]
pub struct DevBeaconClient {
	beacon: Arc<DevBeacon>,
	published: Arc<AtomicU64>,
	failures: Arc<AtomicU32>,
}

impl DevBeaconClient {
	pub fn new(beacon: DevBeacon, published: RoundNumber) -> Self {
		Self {
			beacon: Arc::new(beacon),
			published: Arc::new(AtomicU64::new(published)),
			failures: Arc::new(AtomicU32::new(0)),
		}
	}

	pub fn beacon(&self) -> &DevBeacon {
		&self.beacon
	}

	pub fn publish_up_to(&self, round: RoundNumber) {
		self.published.fetch_max(round, Ordering::SeqCst);
	}

	/// The next `count` requests fail as if the beacon were unreachable.
	pub fn fail_next(&self, count: u32) {
		self.failures.store(count, Ordering::SeqCst);
	}
}

#[async_trait]
impl BeaconClient for DevBeaconClient {
	async fn signature(&self, round: RoundNumber) -> Result<G1Affine, BeaconError> {
		if take_one(&self.failures) {
			return Err(BeaconError::Transport("connection refused".into()))
		}
		if round > self.published.load(Ordering::SeqCst) {
			return Err(BeaconError::NotAvailable(round))
		}
		self.beacon.sign(round).map_err(|e| BeaconError::Malformed(e.to_string()))
	}
}

/// Decrements `counter` unless it is zero. Returns whether it did.
fn take_one(counter: &AtomicU32) -> bool {
	counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
}

/// Wraps a chain with an unreliable connection.
pub struct FlakyChain {
	inner: Arc<dyn OrderChain>,
	latest_block_failures: AtomicU32,
	dropped_subscriptions: AtomicU32,
}

impl FlakyChain {
	pub fn new(inner: Arc<dyn OrderChain>) -> Self {
		Self {
			inner,
			latest_block_failures: AtomicU32::new(0),
			dropped_subscriptions: AtomicU32::new(0),
		}
	}

	/// The next `count` head queries fail.
	pub fn fail_latest_block(&self, count: u32) {
		self.latest_block_failures.store(count, Ordering::SeqCst);
	}

	/// The next `count` subscriptions end immediately.
	pub fn drop_subscriptions(&self, count: u32) {
		self.dropped_subscriptions.store(count, Ordering::SeqCst);
	}
}

#[async_trait]
impl OrderChain for FlakyChain {
	async fn latest_block(&self) -> Result<BlockNumber, ChainError> {
		if take_one(&self.latest_block_failures) {
			return Err(ChainError::Transport("connection reset".into()))
		}
		self.inner.latest_block().await
	}

	async fn registrations(
		&self,
		from: BlockNumber,
		to: BlockNumber,
	) -> Result<Vec<OrderRegistered>, ChainError> {
		self.inner.registrations(from, to).await
	}

	fn subscribe(&self) -> BoxStream<'static, OrderRegistered> {
		if take_one(&self.dropped_subscriptions) {
			return futures::stream::empty().boxed()
		}
		self.inner.subscribe()
	}

	async fn is_nullifier_used(&self, nullifier: &B256) -> Result<bool, ChainError> {
		self.inner.is_nullifier_used(nullifier).await
	}

	async fn execute_chunk(&self, claim: ChunkClaim) -> Result<B256, ChainError> {
		self.inner.execute_chunk(claim).await
	}
}

/// A sealed order ready to register.
pub struct Sealed {
	pub order_id: OrderId,
	pub chain: EncryptionChain,
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

pub fn order_id(n: u8) -> OrderId {
	B256::repeat_byte(n)
}

pub struct TestEnv {
	pub orders: Arc<SealedOrders<Test>>,
	pub chain: Arc<LocalChain<Test>>,
	pub env: Arc<InMemoryEnvironment>,
	pub clock: Arc<ManualClock>,
	pub beacon: DevBeaconClient,
}

pub fn new_test_env() -> TestEnv {
	let beacon = DevBeaconClient::new(DevBeacon::new(0xbeac0, GENESIS, PERIOD), 0);
	let env = Arc::new(InMemoryEnvironment::new());
	env.set_rate(USDC, WETH, 2, 1);
	let clock = Arc::new(ManualClock::new(GENESIS));
	let params = LedgerParams { treasury: TREASURY, protocol_fee_bps: 10, recovery_delay: 3_600 };
	let orders = Arc::new(SealedOrders::new(
		env.clone(),
		clock.clone(),
		beacon.beacon().info().clone(),
		params,
	));
	let chain = Arc::new(LocalChain::new(orders.clone(), RELAYER));
	TestEnv { orders, chain, env, clock, beacon }
}

impl TestEnv {
	pub fn cipher(&self) -> TimelockCipher {
		TimelockCipher::from_beacon(self.beacon.beacon().info())
	}

	/// Moves the clock to `round` without the beacon publishing it.
	pub fn set_clock_to_round(&self, round: RoundNumber) {
		self.clock.set(self.beacon.beacon().info().round_time(round));
	}

	/// Moves the clock to `round` and publishes every round up to it.
	pub fn advance_to_round(&self, round: RoundNumber) {
		self.set_clock_to_round(round);
		self.beacon.publish_up_to(round);
	}

	/// Deposits the order's shares and seals one chunk per `(params, round)`.
	pub fn seal(&self, n: u8, chunks: Vec<(ChunkParams, RoundNumber)>) -> Sealed {
		let order_id = order_id(n);
		let specs: Vec<ChunkSpec> =
			chunks.into_iter().map(|(params, round)| ChunkSpec { params, round }).collect();
		let total: u128 = specs.iter().map(|s| s.params.shares_amount).sum();
		self.env.deposit(order_id, USDC, total);
		let chain =
			build_encryption_chain(&self.cipher(), &USER_KEY, &NONCE, total, &specs, &mut OsRng)
				.unwrap();
		Sealed { order_id, chain }
	}

	/// Seals a swap with one chunk per `(shares, round)`.
	pub fn seal_swap(&self, n: u8, chunks: &[(u128, RoundNumber)]) -> Sealed {
		self.seal(n, chunks.iter().map(|(shares, round)| (swap_params(*shares), *round)).collect())
	}

	pub fn register(&self, sealed: &Sealed) {
		self.orders
			.register(
				ALICE,
				sealed.order_id,
				sealed.chain.head.to_bytes().unwrap(),
				sealed.chain.commitments.clone(),
				USDC,
				OperationType::Swap,
			)
			.unwrap();
	}

	/// Opens a ciphertext with the beacon signature for its round.
	pub fn open(&self, ct: &TimelockCiphertext) -> OrderChunk {
		let sig = self.beacon.beacon().sign(ct.round).unwrap();
		OrderChunk::from_plaintext(&self.cipher().decrypt(ct, &sig).unwrap()).unwrap()
	}

	pub fn claim(
		&self,
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

	/// A processor that polls the beacon `attempts` times, `interval` apart.
	pub fn processor(
		&self,
		store: Arc<PendingOrderStore>,
		interval: Duration,
		attempts: u32,
	) -> OrderProcessor {
		self.processor_with_beacon(store, Arc::new(self.beacon.clone()), interval, attempts)
	}

	/// A processor that fetches signatures from `beacon` instead of the test beacon.
	pub fn processor_with_beacon(
		&self,
		store: Arc<PendingOrderStore>,
		beacon: Arc<dyn BeaconClient>,
		interval: Duration,
		attempts: u32,
	) -> OrderProcessor {
		OrderProcessor::new(
			beacon,
			self.chain.clone(),
			store,
			self.cipher(),
			interval,
			attempts,
		)
	}

	pub fn scheduler(&self, store: Arc<PendingOrderStore>) -> RoundScheduler {
		self.scheduler_with(store, Duration::from_millis(1), 3)
	}

	pub fn scheduler_with(
		&self,
		store: Arc<PendingOrderStore>,
		interval: Duration,
		attempts: u32,
	) -> RoundScheduler {
		RoundScheduler::new(
			self.processor(store.clone(), interval, attempts),
			store,
			self.clock.clone(),
			self.beacon.beacon().info().clone(),
			Duration::from_millis(10),
		)
	}
}
