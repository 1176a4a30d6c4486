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

//! Command line and environment configuration.

use crate::error::Error;
use clap::{Args, Parser, Subcommand};
use pallet_sealed_orders::{LedgerParams, DEFAULT_RECOVERY_DELAY};
use sp_sealed_crypto::beacon::BeaconInfo;
use sp_sealed_types::Address;
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Parser)]
#[command(name = "sealed-relayer", version)]
#[command(
	about = "Opens sealed orders once their beacon round is reached and executes them",
	long_about = None
)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Watch for orders and execute them as their rounds are reached.
	Run(RelayerConfig),
	/// List persisted orders with their state.
	Status(StatusArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RelayerConfig {
	/// Base URL of the beacon API
	#[arg(long, env = "SEALED_BEACON_URL", default_value = "http://127.0.0.1:8080")]
	pub beacon_url: String,

	/// Beacon chain identifier
	#[arg(long, env = "SEALED_CHAIN_ID", default_value = "dev")]
	pub chain_id: String,

	/// Unix time of round 0
	#[arg(long, env = "SEALED_GENESIS_TIME")]
	pub genesis_time: u64,

	/// Seconds between rounds
	#[arg(long, env = "SEALED_PERIOD", default_value = "3")]
	pub period: u64,

	/// Beacon public key, hex encoded G2 point (x0 || x1 || y0 || y1)
	#[arg(long, env = "SEALED_BEACON_PUBLIC_KEY")]
	pub beacon_public_key: String,

	/// Address chunk executions are submitted from; receives execution fees
	#[arg(long, env = "SEALED_RELAYER_ADDRESS")]
	pub relayer_address: Address,

	/// Directory of the relayer database
	#[arg(long, env = "SEALED_STORE_PATH", default_value = "./sealed-relayer-db")]
	pub store_path: PathBuf,

	/// Seconds between scheduler ticks
	#[arg(long, env = "SEALED_POLL_INTERVAL", default_value = "30")]
	pub poll_interval_secs: u64,

	/// First block to replay registrations from
	#[arg(long, env = "SEALED_START_BLOCK", default_value = "0")]
	pub start_block: u64,

	/// Blocks per historical query
	#[arg(long, env = "SEALED_BATCH_SIZE", default_value = "1000")]
	pub batch_size: u64,

	/// Seconds between beacon polls while waiting for a round
	#[arg(long, env = "SEALED_BEACON_WAIT_INTERVAL", default_value = "1")]
	pub beacon_wait_interval_secs: u64,

	/// Beacon polls before giving up on a round until the next tick
	#[arg(long, env = "SEALED_BEACON_WAIT_ATTEMPTS", default_value = "10")]
	pub beacon_wait_attempts: u32,

	/// Seconds before a beacon request times out
	#[arg(long, env = "SEALED_BEACON_TIMEOUT", default_value = "10")]
	pub beacon_timeout_secs: u64,

	/// Receives the protocol fee
	#[arg(
		long,
		env = "SEALED_TREASURY",
		default_value = "0x0000000000000000000000000000000000000000"
	)]
	pub treasury: Address,

	/// Protocol fee in basis points
	#[arg(long, env = "SEALED_PROTOCOL_FEE_BPS", default_value = "0")]
	pub protocol_fee_bps: u16,

	/// Seconds after registration before an owner may recover an order
	#[arg(long, env = "SEALED_RECOVERY_DELAY", default_value_t = DEFAULT_RECOVERY_DELAY)]
	pub recovery_delay: u64,

	/// Register a sample three chunk order on startup
	#[arg(long, default_value = "false")]
	pub demo_order: bool,
}

impl RelayerConfig {
	/// The beacon parameters. A malformed public key is a configuration error.
	pub fn beacon_info(&self) -> Result<BeaconInfo, Error> {
		BeaconInfo::from_hex(
			self.genesis_time,
			self.period,
			&self.beacon_public_key,
			self.chain_id.clone(),
		)
		.map_err(|e| Error::Config(format!("beacon public key: {e}")))
	}

	pub fn ledger_params(&self) -> Result<LedgerParams, Error> {
		if u128::from(self.protocol_fee_bps) > sp_sealed_types::BPS_DENOMINATOR {
			return Err(Error::Config("protocol fee exceeds 10000 bps".into()))
		}
		Ok(LedgerParams {
			treasury: self.treasury,
			protocol_fee_bps: self.protocol_fee_bps,
			recovery_delay: self.recovery_delay,
		})
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs.max(1))
	}

	pub fn beacon_wait_interval(&self) -> Duration {
		Duration::from_secs(self.beacon_wait_interval_secs)
	}

	pub fn beacon_timeout(&self) -> Duration {
		Duration::from_secs(self.beacon_timeout_secs.max(1))
	}
}

#[derive(Debug, Clone, Args)]
pub struct StatusArgs {
	/// Directory of the relayer database
	#[arg(long, env = "SEALED_STORE_PATH", default_value = "./sealed-relayer-db")]
	pub store_path: PathBuf,
}
