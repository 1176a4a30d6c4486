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

//! Verifiers for beacon round signatures
use crate::{
	beacon::{compute_round_on_g1, RoundNumber},
	bn254::*,
};
use ark_bn254::{G1Affine, G2Affine};
use ark_ec::AffineRepr;

/// Something that can verify beacon round signatures
pub trait SignatureVerifier {
	/// Verify that `signature` is the beacon's signature over `round`.
	///
	/// * `public_key`: The public key of the randomness beacon
	/// * `signature`: The round signature, a point on G1
	/// * `round`: The round the signature claims to be for
	fn verify(
		public_key: &G2Affine,
		signature: &G1Affine,
		round: RoundNumber,
	) -> Result<(), CryptoError>;
}

/// A BN254 round signature verifier.
///
/// Given a signature $sig = s*H(r)$ where $s$ is the beacon secret and $H$ is the
/// try-and-increment map of the round $r$ to G1, the signature is valid iff
///
///   $e(sig, g_2) == e(H(r), pk)$
///
/// where $pk = s*g_2$ is the beacon public key.
pub struct BeaconVerifier;

impl SignatureVerifier for BeaconVerifier {
	fn verify(
		public_key: &G2Affine,
		signature: &G1Affine,
		round: RoundNumber,
	) -> Result<(), CryptoError> {
		if signature.is_zero() {
			return Err(CryptoError::InvalidBeaconSignature);
		}
		let message = compute_round_on_g1(round)?;
		if !fast_pairing_opt(*signature, G2Affine::generator(), message, *public_key) {
			return Err(CryptoError::InvalidBeaconSignature);
		}
		Ok(())
	}
}
