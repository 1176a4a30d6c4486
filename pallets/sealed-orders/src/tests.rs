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

use crate::{mock::*, Error, Event};
use sp_sealed_types::{Address, OperationType, B256};
use std::sync::{Arc, Mutex};

#[test]
fn register_stores_order_and_emits_event() {
	new_test_ext().execute_with(|ext| {
		let sealed = ext.seal(order_id(1), vec![(swap_params(30), 10), (swap_params(70), 20)]);
		assert_eq!(ext.register(&sealed), Ok(order_id(1)));

		assert_eq!(ext.orders.get(&order_id(1)).unwrap(), sealed.chain.head.to_bytes().unwrap());
		let record = ext.orders.order(&order_id(1)).unwrap();
		assert_eq!(record.owner, ALICE);
		assert_eq!(record.round, 10);
		assert_eq!(record.chunk_commitments, sealed.chain.commitments);
		assert_eq!(ext.orders.remaining_chunks(&order_id(1)), Some(2));

		let events = ext.orders.events(0, u64::MAX);
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].block_number, 1);
		assert!(matches!(
			&events[0].event,
			Event::OrderRegistered { order_id: id, chunk_count: 2, round: 10, .. }
				if *id == order_id(1)
		));
	});
}

#[test]
fn register_is_idempotent_and_rejects_conflicts() {
	new_test_ext().execute_with(|ext| {
		let sealed = ext.seal(order_id(1), vec![(swap_params(30), 10)]);
		assert_eq!(ext.register(&sealed), Ok(order_id(1)));
		assert_eq!(ext.register(&sealed), Ok(order_id(1)));
		assert_eq!(ext.orders.block_number(), 1);

		let other = ext.seal(order_id(1), vec![(swap_params(31), 10)]);
		assert_noop!(ext, ext.register(&other), Error::OrderAlreadyExists);
	});
}

#[test]
fn register_rejects_empty_and_malformed_orders() {
	new_test_ext().execute_with(|ext| {
		let sealed = ext.seal(order_id(1), vec![(swap_params(30), 10)]);
		let ciphertext = sealed.chain.head.to_bytes().unwrap();
		assert_noop!(
			ext,
			ext.orders.register(ALICE, order_id(1), ciphertext, vec![], USDC, OperationType::Swap),
			Error::InvalidOrder
		);
		assert_noop!(
			ext,
			ext.orders.register(
				ALICE,
				order_id(1),
				b"{\"aes\":{}}".to_vec(),
				sealed.chain.commitments.clone(),
				USDC,
				OperationType::Swap
			),
			Error::InvalidCiphertext
		);
		let mut inconsistent = sealed.chain.head.clone();
		inconsistent.c1 = ext.cipher().encrypt(b"x", 10, &mut rand::rngs::OsRng).unwrap().c1;
		assert_noop!(
			ext,
			ext.orders.register(
				ALICE,
				order_id(1),
				inconsistent.to_bytes().unwrap(),
				sealed.chain.commitments.clone(),
				USDC,
				OperationType::Swap
			),
			Error::InvalidCiphertext
		);
	});
}

#[test]
fn three_chunk_order_executes_round_by_round() {
	new_test_ext().execute_with(|ext| {
		let r = 10;
		let sealed = ext.seal(
			order_id(1),
			vec![(swap_params(30), r), (swap_params(20), r + 1000), (swap_params(50), r + 2000)],
		);
		ext.register(&sealed).unwrap();
		let chunks = ext.open_all(&sealed);
		assert_eq!(chunks.len(), 3);

		// nothing executes before its round
		let first = claim(order_id(1), 0, chunks[0].0, &chunks[0].1);
		assert_noop!(ext, ext.orders.execute_chunk(RELAYER, first.clone()), Error::InvalidRound);

		let mut shares_executed = 0;
		for (index, (round, chunk)) in chunks.iter().enumerate() {
			ext.advance_to_round(*round);
			if index == 1 {
				// chunk 1 presenting chunk 2's link
				let mut wrong = claim(order_id(1), 1, *round, chunk);
				wrong.prev_hash = chunks[2].1.prev_hash;
				wrong.next_hash = chunks[2].1.next_hash;
				assert_noop!(
					ext,
					ext.orders.execute_chunk(RELAYER, wrong),
					Error::InvalidHashChain
				);
			}
			let receipt = ext
				.orders
				.execute_chunk(RELAYER, claim(order_id(1), index as u32, *round, chunk))
				.unwrap();
			shares_executed += chunk.shares_amount;
			assert_eq!(receipt.outcome.amount_in, chunk.shares_amount);
			assert_eq!(receipt.outcome.amount_out, 2 * chunk.shares_amount);
		}

		assert_eq!(shares_executed, 100);
		for nullifier in sealed.chain.nullifiers() {
			assert!(ext.orders.is_nullifier_used(nullifier));
		}
		assert!(!ext.orders.is_nullifier_used(&sealed.chain.hash_chain[3]));
		assert_eq!(ext.env.position_shares(&order_id(1)), 0);
		assert_eq!(ext.env.balance_of(&WETH, &BOB), 200);
		assert_eq!(ext.orders.remaining_chunks(&order_id(1)), Some(0));

		// replay
		assert_noop!(
			ext,
			ext.orders.execute_chunk(RELAYER, first),
			Error::HashChainNodeAlreadyUsed
		);
	});
}

#[test]
fn tampered_chunks_are_rejected_without_side_effects() {
	new_test_ext().execute_with(|ext| {
		let sealed = ext.seal(order_id(1), vec![(swap_params(30), 10)]);
		ext.register(&sealed).unwrap();
		ext.advance_to_round(10);
		let (round, chunk) = ext.open_all(&sealed).remove(0);

		let mut tampered = claim(order_id(1), 0, round, &chunk);
		tampered.params.recipient = Address::repeat_byte(0x66);
		assert_noop!(ext, ext.orders.execute_chunk(RELAYER, tampered), Error::InvalidOrderHash);

		let mut out_of_range = claim(order_id(1), 1, round, &chunk);
		out_of_range.chunk_index = 5;
		assert_noop!(
			ext,
			ext.orders.execute_chunk(RELAYER, out_of_range),
			Error::OrderChunkNotFound
		);

		assert!(!ext.orders.is_nullifier_used(&chunk.prev_hash));
		assert_eq!(ext.env.position_shares(&order_id(1)), 30);
	});
}

#[test]
fn failed_execution_rolls_back_and_leaves_chunk_executable() {
	new_test_ext().execute_with(|ext| {
		let sealed = ext.seal(order_id(1), vec![(swap_params(30), 10)]);
		ext.register(&sealed).unwrap();
		ext.advance_to_round(10);
		let (round, chunk) = ext.open_all(&sealed).remove(0);

		// the pool now pays half of what the chunk requires
		ext.env.set_rate(USDC, WETH, 1, 1);
		assert_noop!(
			ext,
			ext.orders.execute_chunk(RELAYER, claim(order_id(1), 0, round, &chunk)),
			Error::InvalidSlippage
		);
		assert_eq!(ext.env.position_shares(&order_id(1)), 30);
		assert_eq!(ext.env.custody_of(&USDC), 0);
		assert!(!ext.orders.is_nullifier_used(&chunk.prev_hash));

		ext.env.set_rate(USDC, WETH, 2, 1);
		assert!(ext.orders.execute_chunk(RELAYER, claim(order_id(1), 0, round, &chunk)).is_ok());
	});
}

#[test]
fn expired_chunks_cannot_execute() {
	new_test_ext().execute_with(|ext| {
		let mut params = swap_params(30);
		params.deadline = GENESIS + 10;
		let sealed = ext.seal(order_id(1), vec![(params, 10)]);
		ext.register(&sealed).unwrap();
		ext.advance_to_round(10);
		let (round, chunk) = ext.open_all(&sealed).remove(0);
		assert_noop!(
			ext,
			ext.orders.execute_chunk(RELAYER, claim(order_id(1), 0, round, &chunk)),
			Error::IntentExpired
		);
	});
}

#[test]
fn fees_go_to_caller_and_treasury() {
	new_test_ext().execute_with(|ext| {
		let mut params = swap_params(10_000);
		params.amount_out_min = 20_000;
		let sealed = ext.seal(order_id(1), vec![(params, 10)]);
		ext.register(&sealed).unwrap();
		ext.advance_to_round(10);
		let (round, chunk) = ext.open_all(&sealed).remove(0);
		let receipt =
			ext.orders.execute_chunk(RELAYER, claim(order_id(1), 0, round, &chunk)).unwrap();
		// 20_000 out: 0.2% to the relayer, 0.1% to the treasury
		assert_eq!(receipt.outcome.execution_fee, 40);
		assert_eq!(receipt.outcome.protocol_fee, 20);
		assert_eq!(ext.env.balance_of(&WETH, &RELAYER), 40);
		assert_eq!(ext.env.balance_of(&WETH, &TREASURY), 20);
		assert_eq!(ext.env.balance_of(&WETH, &BOB), 19_940);
	});
}

#[test]
fn concurrent_execution_of_one_chunk_succeeds_once() {
	new_test_ext().execute_with(|ext| {
		let sealed = ext.seal(order_id(1), vec![(swap_params(30), 10)]);
		ext.register(&sealed).unwrap();
		ext.advance_to_round(10);
		let (round, chunk) = ext.open_all(&sealed).remove(0);
		let c = claim(order_id(1), 0, round, &chunk);

		let results = Mutex::new(Vec::new());
		std::thread::scope(|s| {
			for _ in 0..8 {
				s.spawn(|| {
					let res = ext.orders.execute_chunk(RELAYER, c.clone());
					results.lock().unwrap().push(res.map(|_| ()));
				});
			}
		});
		let results = results.into_inner().unwrap();
		assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
		assert!(results
			.iter()
			.filter(|r| r.is_err())
			.all(|r| *r == Err(Error::HashChainNodeAlreadyUsed)));
	});
}

#[test]
fn owner_recovers_unexecuted_chunks_after_delay() {
	new_test_ext().execute_with(|ext| {
		let sealed =
			ext.seal(order_id(1), vec![(swap_params(30), 10), (swap_params(70), 20)]);
		ext.register(&sealed).unwrap();
		ext.advance_to_round(10);
		let chunks = ext.open_all(&sealed);
		ext.orders
			.execute_chunk(RELAYER, claim(order_id(1), 0, chunks[0].0, &chunks[0].1))
			.unwrap();

		assert_noop!(ext, ext.orders.recover(BOB, order_id(1)), Error::NotOrderOwner);
		assert_noop!(ext, ext.orders.recover(ALICE, order_id(1)), Error::RecoveryTooEarly);
		assert_noop!(ext, ext.orders.recover(ALICE, order_id(9)), Error::OrderNotFound);

		ext.clock.set(GENESIS + RECOVERY_DELAY);
		let outcome = ext.orders.recover(ALICE, order_id(1)).unwrap();
		assert_eq!(outcome.retired_chunks, 1);
		assert_eq!(outcome.released_shares, 70);
		assert_eq!(ext.env.balance_of(&USDC, &ALICE), 70);
		assert_eq!(ext.orders.remaining_chunks(&order_id(1)), Some(0));

		let last = ext.orders.events(0, u64::MAX).pop().unwrap();
		assert_eq!(
			last.event,
			Event::OrderRecovered {
				order_id: order_id(1),
				owner: ALICE,
				retired_chunks: 1,
				released_shares: 70
			}
		);

		assert_noop!(
			ext,
			ext.orders.execute_chunk(RELAYER, claim(order_id(1), 1, chunks[1].0, &chunks[1].1)),
			Error::OrderRecovered
		);
		assert_noop!(ext, ext.orders.recover(ALICE, order_id(1)), Error::OrderRecovered);
	});
}

#[test]
fn fully_executed_orders_have_nothing_to_recover() {
	new_test_ext().execute_with(|ext| {
		let sealed = ext.seal(order_id(1), vec![(swap_params(30), 10)]);
		ext.register(&sealed).unwrap();
		ext.advance_to_round(10);
		let (round, chunk) = ext.open_all(&sealed).remove(0);
		ext.orders.execute_chunk(RELAYER, claim(order_id(1), 0, round, &chunk)).unwrap();
		ext.clock.advance(RECOVERY_DELAY);
		assert_noop!(ext, ext.orders.recover(ALICE, order_id(1)), Error::NothingToRecover);
	});
}

#[test]
fn observers_receive_events_in_block_order() {
	new_test_ext().execute_with(|ext| {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();
		ext.orders.observe(Box::new(move |record| sink.lock().unwrap().push(record.block_number)));

		let a = ext.seal(order_id(1), vec![(swap_params(30), 10)]);
		let b = ext.seal(order_id(2), vec![(swap_params(40), 11)]);
		ext.register(&a).unwrap();
		ext.register(&b).unwrap();
		ext.advance_to_round(10);
		let (round, chunk) = ext.open_all(&a).remove(0);
		let receipt =
			ext.orders.execute_chunk(RELAYER, claim(order_id(1), 0, round, &chunk)).unwrap();

		assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
		assert_eq!(receipt.block_number, 3);
		assert_eq!(receipt.tx_hash, crate::tx_hash(3, &order_id(1), 0));
		assert_eq!(ext.orders.events(2, 2).len(), 1);
		assert_ne!(receipt.tx_hash, B256::default());
	});
}
