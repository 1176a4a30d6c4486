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

use anyhow::Context;
use clap::Parser;
use sc_sealed_relayer::{
	local::{local_ledger, register_demo_order},
	status_lines, Cli, Command, HttpBeacon, LocalChain, PendingOrderStore, RelayerConfig,
	RelayerService, ServiceParams,
};
use sp_sealed_traits::SystemClock;
use std::sync::Arc;
use tokio::sync::watch;

const LOG_TARGET: &str = "relayer";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	match Cli::parse().command {
		Command::Run(config) => run(config).await,
		Command::Status(args) => {
			let store = PendingOrderStore::open_read_only(&args.store_path)
				.with_context(|| format!("opening {}", args.store_path.display()))?;
			for line in status_lines(&store)? {
				println!("{line}");
			}
			Ok(())
		},
	}
}

async fn run(config: RelayerConfig) -> anyhow::Result<()> {
	let info = config.beacon_info()?;
	let params = config.ledger_params()?;

	let store = Arc::new(
		PendingOrderStore::open(&config.store_path)
			.with_context(|| format!("opening {}", config.store_path.display()))?,
	);
	let beacon = HttpBeacon::new(&config.beacon_url, &config.chain_id, config.beacon_timeout())?;

	let (ledger, env) = local_ledger(info.clone(), params);
	let chain = Arc::new(LocalChain::new(ledger.clone(), config.relayer_address));
	if config.demo_order {
		register_demo_order(&ledger, &env)?;
	}

	let service = RelayerService::new(
		chain,
		Arc::new(beacon),
		Arc::new(SystemClock),
		store,
		info,
		ServiceParams::from(&config),
	);

	let (stop, shutdown) = watch::channel(false);
	tokio::spawn(async move {
		match tokio::signal::ctrl_c().await {
			Ok(()) => log::info!(target: LOG_TARGET, "shutting down"),
			Err(e) => log::error!(target: LOG_TARGET, "cannot listen for ctrl-c: {e}"),
		}
		let _ = stop.send(true);
	});

	log::info!(
		target: LOG_TARGET,
		"relayer {} started, beacon {}",
		config.relayer_address,
		config.beacon_url,
	);
	service.run(shutdown).await;
	Ok(())
}
