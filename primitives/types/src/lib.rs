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

//! # Sealed Orders Types
//!
//! The data model shared by clients, the ledger and the relayer: addresses and hashes, the
//! committed parameters of an order chunk, the decrypted chunk plaintext, and the client side
//! builder of nested encryption chains.

pub mod chain;
pub mod order;
pub mod primitives;

pub use chain::{build_encryption_chain, ChunkSpec, EncryptionChain};
pub use order::{
	ChunkParams, LiquidityParams, OperationType, OrderChunk, PoolKey, BPS_DENOMINATOR,
};
pub use primitives::{Address, OrderId, B256};

use sp_sealed_crypto::bn254::CryptoError;

/// Errors raised while building or decoding orders.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
	#[error("an order needs at least one chunk")]
	EmptyChain,
	#[error("chunk shares sum to {actual}, expected {expected}")]
	SharesMismatch { expected: u128, actual: u128 },
	#[error("chunk rounds must not decrease")]
	RoundsOutOfOrder,
	#[error("crypto: {0}")]
	Crypto(#[from] CryptoError),
	#[error("encoding: {0}")]
	Encoding(String),
}
