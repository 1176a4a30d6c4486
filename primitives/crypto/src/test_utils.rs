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

//! A local beacon that knows its signing scalar. Used by tests and local demos only.

use crate::{
	beacon::{compute_round_on_g1, BeaconInfo, RoundNumber},
	bn254::{encode_g1, CryptoError},
};
use ark_bn254::{Fr, G1Affine, G2Affine};
use ark_ec::{AffineRepr, CurveGroup};

pub const DEV_CHAIN_ID: &str = "dev";

#[derive(Clone, Debug)]
pub struct DevBeacon {
	secret: Fr,
	info: BeaconInfo,
}

impl DevBeacon {
	/// A beacon with signing scalar `secret`.
	pub fn new(secret: u64, genesis_time: u64, period: u64) -> Self {
		let secret = Fr::from(secret);
		let public_key = (G2Affine::generator() * secret).into_affine();
		let info = BeaconInfo {
			genesis_time,
			period: period.max(1),
			public_key,
			chain_id: DEV_CHAIN_ID.into(),
		};
		Self { secret, info }
	}

	pub fn info(&self) -> &BeaconInfo {
		&self.info
	}

	pub fn public_key(&self) -> G2Affine {
		self.info.public_key
	}

	/// `s * H(round)`
	pub fn sign(&self, round: RoundNumber) -> Result<G1Affine, CryptoError> {
		let message = compute_round_on_g1(round)?;
		Ok((message * self.secret).into_affine())
	}

	/// The round signature in the hex form served by the beacon API.
	pub fn sign_hex(&self, round: RoundNumber) -> Result<String, CryptoError> {
		Ok(hex::encode(encode_g1(&self.sign(round)?)))
	}
}
