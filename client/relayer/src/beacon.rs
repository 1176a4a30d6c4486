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

//! Access to the randomness beacon's round signatures.
//!
//! The beacon serves `GET {base}/beacons/{chain_id}/rounds/{round}` as JSON with at least a hex
//! encoded `signature` field. Rounds that are not published yet answer with `404` or `425`.

use crate::error::BeaconError;
use async_trait::async_trait;
use serde::Deserialize;
use sp_sealed_crypto::{
	beacon::RoundNumber,
	bn254::{decode_g1, decode_hex},
	G1Affine,
};
use std::time::Duration;

const LOG_TARGET: &str = "relayer-beacon";

/// A source of beacon round signatures.
#[async_trait]
pub trait BeaconClient: Send + Sync {
	/// The signature for `round`, or [`BeaconError::NotAvailable`] if it is not published yet.
	///
	/// No verification is done here.
	async fn signature(&self, round: RoundNumber) -> Result<G1Affine, BeaconError>;
}

#[derive(Debug, Deserialize)]
struct RoundResponse {
	signature: String,
}

/// Decodes a hex encoded uncompressed G1 signature.
pub fn parse_signature(value: &str) -> Result<G1Affine, BeaconError> {
	let bytes = decode_hex(value).map_err(|e| BeaconError::Malformed(e.to_string()))?;
	decode_g1(&bytes).map_err(|e| BeaconError::Malformed(e.to_string()))
}

/// A beacon reached over HTTP.
#[derive(Clone, Debug)]
pub struct HttpBeacon {
	client: reqwest::Client,
	base_url: String,
	chain_id: String,
}

impl HttpBeacon {
	pub fn new(
		base_url: impl Into<String>,
		chain_id: impl Into<String>,
		timeout: Duration,
	) -> Result<Self, BeaconError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| BeaconError::Transport(e.to_string()))?;
		let base_url = base_url.into().trim_end_matches('/').to_string();
		Ok(Self { client, base_url, chain_id: chain_id.into() })
	}

	pub fn round_url(&self, round: RoundNumber) -> String {
		format!("{}/beacons/{}/rounds/{}", self.base_url, self.chain_id, round)
	}
}

#[async_trait]
impl BeaconClient for HttpBeacon {
	async fn signature(&self, round: RoundNumber) -> Result<G1Affine, BeaconError> {
		let response = self
			.client
			.get(self.round_url(round))
			.send()
			.await
			.map_err(|e| BeaconError::Transport(e.to_string()))?;

		let status = response.status();
		// 425 Too Early
		if status == reqwest::StatusCode::NOT_FOUND || status.as_u16() == 425 {
			return Err(BeaconError::NotAvailable(round));
		}
		if !status.is_success() {
			return Err(BeaconError::Transport(format!("unexpected status {status}")));
		}

		let body: RoundResponse =
			response.json().await.map_err(|e| BeaconError::Malformed(e.to_string()))?;
		parse_signature(&body.signature)
	}
}

/// Polls `client` every `interval` until the signature for `round` is published, giving up
/// after `max_attempts` unavailable answers.
///
/// Any failure other than [`BeaconError::NotAvailable`] is returned immediately.
pub async fn wait_for_round<B: BeaconClient + ?Sized>(
	client: &B,
	round: RoundNumber,
	interval: Duration,
	max_attempts: u32,
) -> Result<G1Affine, BeaconError> {
	for attempt in 1..=max_attempts.max(1) {
		match client.signature(round).await {
			Err(BeaconError::NotAvailable(_)) => {
				log::debug!(
					target: LOG_TARGET,
					"round {round} not published yet (attempt {attempt})",
				);
				if attempt < max_attempts {
					tokio::time::sleep(interval).await;
				}
			},
			other => return other,
		}
	}
	Err(BeaconError::Timeout(round))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mock::DevBeaconClient;
	use axum::{
		extract::{Path, State},
		http::StatusCode,
		routing::get,
		Json, Router,
	};
	use serde_json::{json, Value};
	use sp_sealed_crypto::test_utils::DevBeacon;
	use std::sync::Arc;

	const PUBLISHED: RoundNumber = 100;

	async fn beacon_handler(
		State(beacon): State<Arc<DevBeacon>>,
		Path((chain_id, round)): Path<(String, u64)>,
	) -> Result<Json<Value>, StatusCode> {
		if chain_id != "dev" || round > PUBLISHED {
			return Err(StatusCode::NOT_FOUND);
		}
		let signature = beacon.sign_hex(round).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
		Ok(Json(json!({ "round": round, "signature": signature })))
	}

	async fn serve(beacon: DevBeacon) -> String {
		let app = Router::new()
			.route("/beacons/:chain_id/rounds/:round", get(beacon_handler))
			.with_state(Arc::new(beacon));
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{addr}/")
	}

	#[tokio::test]
	async fn fetches_published_signatures_over_http() {
		let beacon = DevBeacon::new(77, 0, 3);
		let url = serve(beacon.clone()).await;
		let client = HttpBeacon::new(url, "dev", Duration::from_secs(5)).unwrap();

		assert_eq!(client.signature(42).await.unwrap(), beacon.sign(42).unwrap());
		assert_eq!(
			client.signature(PUBLISHED + 1).await,
			Err(BeaconError::NotAvailable(PUBLISHED + 1))
		);
	}

	#[tokio::test]
	async fn unknown_chains_are_not_available() {
		let url = serve(DevBeacon::new(77, 0, 3)).await;
		let client = HttpBeacon::new(url, "quicknet", Duration::from_secs(5)).unwrap();
		assert!(client.round_url(1).ends_with("/beacons/quicknet/rounds/1"));
		assert_eq!(client.signature(1).await, Err(BeaconError::NotAvailable(1)));
	}

	#[test]
	fn rejects_malformed_signatures() {
		assert!(matches!(parse_signature("zz"), Err(BeaconError::Malformed(_))));
		assert!(matches!(parse_signature("0x0102"), Err(BeaconError::Malformed(_))));
		let beacon = DevBeacon::new(1, 0, 3);
		let hex = beacon.sign_hex(9).unwrap();
		assert_eq!(parse_signature(&hex).unwrap(), beacon.sign(9).unwrap());
		assert_eq!(parse_signature(&format!("0x{hex}")).unwrap(), beacon.sign(9).unwrap());
	}

	#[tokio::test]
	async fn wait_for_round_polls_until_published() {
		let client = DevBeaconClient::new(DevBeacon::new(5, 0, 3), 10);
		let waiting = {
			let client = client.clone();
			tokio::spawn(async move {
				wait_for_round(&client, 12, Duration::from_millis(10), 100).await
			})
		};
		tokio::time::sleep(Duration::from_millis(30)).await;
		client.publish_up_to(12);
		let sig = waiting.await.unwrap().unwrap();
		assert_eq!(sig, client.beacon().sign(12).unwrap());

		assert_eq!(
			wait_for_round(&client, 50, Duration::from_millis(1), 3).await,
			Err(BeaconError::Timeout(50))
		);
	}
}
