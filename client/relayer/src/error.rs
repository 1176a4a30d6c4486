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

use pallet_sealed_orders::Error as LedgerError;
use sp_sealed_crypto::{beacon::RoundNumber, bn254::CryptoError};
use sp_sealed_types::TypesError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BeaconError {
	#[error("The beacon has not published round {0} yet.")]
	NotAvailable(RoundNumber),
	#[error("Round {0} was not published in time.")]
	Timeout(RoundNumber),
	#[error("The beacon could not be reached: {0}")]
	Transport(String),
	#[error("The beacon returned a malformed response: {0}")]
	Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
	/// The ledger refused the call.
	#[error("The ledger rejected the call: {0}")]
	Rejected(LedgerError),
	#[error("The ledger could not be reached: {0}")]
	Transport(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("Database failure: {0}")]
	Database(#[from] rocksdb::Error),
	#[error("The column family {0} is missing.")]
	MissingColumnFamily(&'static str),
	#[error("A stored record could not be decoded: {0}")]
	Codec(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Beacon(#[from] BeaconError),
	#[error(transparent)]
	Chain(#[from] ChainError),
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error("Cryptographic failure: {0}")]
	Crypto(#[from] CryptoError),
	#[error("The chunk could not be decoded: {0}")]
	Decode(#[from] TypesError),
	#[error("Invalid configuration: {0}")]
	Config(String),
}

impl Error {
	/// Whether retrying later may succeed.
	///
	/// Transient failures leave an order pending for the next tick. Everything else is a
	/// property of the order itself and is recorded as terminal.
	pub fn is_transient(&self) -> bool {
		match self {
			Error::Beacon(_) | Error::Store(_) => true,
			// decryption failures, a bad beacon signature included, repeat for the same inputs
			Error::Crypto(_) | Error::Decode(_) | Error::Config(_) => false,
			Error::Chain(ChainError::Transport(_)) => true,
			Error::Chain(ChainError::Rejected(e)) => matches!(
				e,
				LedgerError::InvalidRound |
					LedgerError::InvalidSlippage |
					LedgerError::SwapFailed |
					LedgerError::LiquidityProvisionFailed |
					LedgerError::PayoutFailed
			),
		}
	}
}
