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

//! Beacon parameters, round arithmetic and the round identity map on G1.

use crate::bn254::{decode_g2, decode_hex, CryptoError};
use ark_bn254::{g1::Config as G1Config, Fq, G1Affine, G2Affine};
use ark_ec::short_weierstrass::SWCurveConfig;
use ark_ff::{Field, One, PrimeField};
use sha2::{Digest, Sha256};

/// The maximum number of `x + 1` steps taken by the try-and-increment map.
pub const MAX_HASH_TO_CURVE_ATTEMPTS: usize = 256;

/// A beacon round number.
pub type RoundNumber = u64;

/// Public parameters of the randomness beacon, loaded once per process.
#[derive(Clone, Debug, PartialEq)]
pub struct BeaconInfo {
	/// Unix time (seconds) of round 0.
	pub genesis_time: u64,
	/// Seconds between rounds.
	pub period: u64,
	/// `s * G2` where `s` is the beacon's signing scalar.
	pub public_key: G2Affine,
	/// The beacon chain identifier used in query paths.
	pub chain_id: String,
}

impl BeaconInfo {
	pub fn new(
		genesis_time: u64,
		period: u64,
		public_key: G2Affine,
		chain_id: impl Into<String>,
	) -> Result<Self, CryptoError> {
		if period == 0 {
			return Err(CryptoError::InvalidBeaconInfo("period must be non-zero".into()));
		}
		Ok(Self { genesis_time, period, public_key, chain_id: chain_id.into() })
	}

	/// Builds the beacon info from a hex encoded (`x0 || x1 || y0 || y1`) public key.
	pub fn from_hex(
		genesis_time: u64,
		period: u64,
		public_key_hex: &str,
		chain_id: impl Into<String>,
	) -> Result<Self, CryptoError> {
		let bytes = decode_hex(public_key_hex)?;
		let public_key = decode_g2(&bytes)
			.map_err(|_| CryptoError::InvalidBeaconInfo("malformed public key".into()))?;
		Self::new(genesis_time, period, public_key, chain_id)
	}

	/// The latest round whose signature may exist at `now`: `floor((now - genesis) / period)`.
	pub fn current_round(&self, now: u64) -> RoundNumber {
		now.saturating_sub(self.genesis_time) / self.period
	}

	/// The first round published at or after `unlock_timestamp`:
	/// `ceil((unlock_timestamp - genesis) / period)`.
	pub fn round_at(&self, unlock_timestamp: u64) -> RoundNumber {
		unlock_timestamp.saturating_sub(self.genesis_time).div_ceil(self.period)
	}

	/// The unix time at which `round` is published.
	pub fn round_time(&self, round: RoundNumber) -> u64 {
		self.genesis_time.saturating_add(round.saturating_mul(self.period))
	}

	/// Whether `round` has been reached at `now`.
	pub fn has_reached(&self, round: RoundNumber, now: u64) -> bool {
		self.current_round(now) >= round
	}
}

/// Constructs the message identifying a round.
fn message(round: RoundNumber) -> [u8; 32] {
	let mut hasher = Sha256::default();
	hasher.update(round.to_be_bytes());
	hasher.finalize().into()
}

/// Euler's criterion: `a` is a non-zero square iff `a^((q-1)/2) == 1`.
fn is_quadratic_residue(value: &Fq) -> bool {
	value.pow(Fq::MODULUS_MINUS_ONE_DIV_TWO) == Fq::one()
}

/// This computes the point on G1 given a round number.
///
/// The round message is hashed to a candidate `x`; while `x^3 + b` is not a square we step to
/// `x + 1`. BN254's G1 has cofactor one, so every curve point found this way is in the group.
pub fn compute_round_on_g1(round: RoundNumber) -> Result<G1Affine, CryptoError> {
	let mut x = Fq::from_be_bytes_mod_order(&message(round));
	for _ in 0..MAX_HASH_TO_CURVE_ATTEMPTS {
		let rhs = x.square() * x + G1Config::COEFF_B;
		if is_quadratic_residue(&rhs) {
			if let Some(y) = rhs.sqrt() {
				return Ok(G1Affine::new_unchecked(x, y));
			}
		}
		x += Fq::one();
	}
	Err(CryptoError::HashToCurveExhausted)
}
