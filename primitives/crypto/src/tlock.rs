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

//! # Round-bound timelock encryption
//!
//! A payload is sealed for a beacon round `R` so that it can only be opened with the beacon's
//! signature for `R`. With `H = H(R)` on G1, a fresh scalar `r` and the beacon key
//! `pk = s * g_2`:
//!
//! ```text
//! V  = r * H
//! C1 = r * g_2
//! S  = e(V, pk) = e(H, g_2)^(r*s)
//! ```
//!
//! Once the beacon publishes `sig = s * H`, anybody computes `e(sig, C1) = S`. The shared secret
//! is hashed into a 16 byte key ([`derive_key`]) for AES-128-CBC.

use crate::{
	beacon::{compute_round_on_g1, BeaconInfo, RoundNumber},
	bn254::*,
	poseidon::{fr_to_bytes, poseidon_fr},
	verifier::{BeaconVerifier, SignatureVerifier},
};
use aes::Aes128;
use ark_bn254::{Bn254, Fr, G1Affine, G2Affine};
use ark_ec::{
	pairing::{Pairing, PairingOutput},
	AffineRepr, CurveGroup,
};
use ark_ff::{PrimeField, Zero};
use ark_serialize::CanonicalSerialize;
use ark_std::UniformRand;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Length of the AES-CBC initialisation vector.
pub const IV_LEN: usize = 16;
/// Length of the derived symmetric key.
pub const KEY_LEN: usize = 16;

/// A payload sealed until `round`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimelockCiphertext {
	/// The beacon round that unlocks the payload.
	pub round: RoundNumber,
	/// The AES-CBC initialisation vector.
	pub iv: [u8; IV_LEN],
	/// The AES-CBC (PKCS#7 padded) ciphertext.
	pub cipher_bytes: Vec<u8>,
	/// `H(round)` on G1.
	pub h: G1Affine,
	/// `r * H`
	pub v: G1Affine,
	/// `r * g_2`
	pub c1: G2Affine,
}

impl TimelockCiphertext {
	/// Checks `e(V, g_2) == e(H, C1)`, i.e. that `V` and `C1` carry the same scalar.
	///
	/// This needs no beacon signature. It proves internal consistency only, not that the
	/// payload decrypts.
	pub fn verify_pre_round(&self) -> bool {
		if self.h.is_zero() || self.v.is_zero() || self.c1.is_zero() {
			return false;
		}
		fast_pairing_opt(self.v, G2Affine::generator(), self.h, self.c1)
	}
}

/// Hashes the pairing output into a symmetric key.
///
/// The canonical serialization of `S` is hashed with SHA-256 into the scalar field, hashed
/// again with Poseidon, and the low 16 bytes of the result form the key.
pub fn derive_key(shared: &PairingOutput<Bn254>) -> Result<[u8; KEY_LEN], CryptoError> {
	let mut bytes = Vec::new();
	shared.serialize_compressed(&mut bytes).map_err(|_| CryptoError::SerializeFailure)?;
	let digest = Sha256::digest(&bytes);
	let scalar = Fr::from_be_bytes_mod_order(&digest);
	let hashed = fr_to_bytes(poseidon_fr(&[scalar])?);

	let mut key = [0u8; KEY_LEN];
	key.copy_from_slice(&hashed[32 - KEY_LEN..]);
	Ok(key)
}

/// Seal `plaintext` for `round` under the beacon key `public_key`.
pub fn tle<R: RngCore + CryptoRng>(
	public_key: &G2Affine,
	plaintext: &[u8],
	round: RoundNumber,
	rng: &mut R,
) -> Result<TimelockCiphertext, CryptoError> {
	let h = compute_round_on_g1(round)?;

	let mut r = Fr::rand(rng);
	while r.is_zero() {
		r = Fr::rand(rng);
	}
	let v = (h * r).into_affine();
	let c1 = (G2Affine::generator() * r).into_affine();

	let shared = Bn254::pairing(v, *public_key);
	let key = derive_key(&shared)?;

	let mut iv = [0u8; IV_LEN];
	rng.fill_bytes(&mut iv);
	let cipher_bytes =
		Aes128CbcEnc::new(&key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

	Ok(TimelockCiphertext { round, iv, cipher_bytes, h, v, c1 })
}

/// Open a ciphertext with a round signature. No signature verification is performed: a wrong
/// signature yields a wrong key and (almost always) a padding failure.
pub fn tld(ciphertext: &TimelockCiphertext, signature: &G1Affine) -> Result<Vec<u8>, CryptoError> {
	let shared = Bn254::pairing(*signature, ciphertext.c1);
	let key = derive_key(&shared)?;
	Aes128CbcDec::new(&key.into(), &ciphertext.iv.into())
		.decrypt_padded_vec_mut::<Pkcs7>(&ciphertext.cipher_bytes)
		.map_err(|_| CryptoError::SymmetricDecryptFailed)
}

/// The timelock scheme bound to one beacon.
#[derive(Clone, Debug)]
pub struct TimelockCipher {
	public_key: G2Affine,
}

impl TimelockCipher {
	pub fn new(public_key: G2Affine) -> Self {
		Self { public_key }
	}

	pub fn from_beacon(info: &BeaconInfo) -> Self {
		Self::new(info.public_key)
	}

	pub fn encrypt<R: RngCore + CryptoRng>(
		&self,
		plaintext: &[u8],
		round: RoundNumber,
		rng: &mut R,
	) -> Result<TimelockCiphertext, CryptoError> {
		tle(&self.public_key, plaintext, round, rng)
	}

	pub fn public_key(&self) -> &G2Affine {
		&self.public_key
	}

	/// Checks `e(sig, g_2) == e(H(round), pk)`.
	pub fn verify_signature(
		&self,
		signature: &G1Affine,
		round: RoundNumber,
	) -> Result<(), CryptoError> {
		BeaconVerifier::verify(&self.public_key, signature, round)
	}

	/// Verify the round signature, check the ciphertext is bound to that round, then open it.
	pub fn decrypt(
		&self,
		ciphertext: &TimelockCiphertext,
		signature: &G1Affine,
	) -> Result<Vec<u8>, CryptoError> {
		let expected_h = compute_round_on_g1(ciphertext.round)?;
		if ciphertext.h != expected_h {
			return Err(CryptoError::InvalidCiphertext("H is not bound to the round".into()));
		}
		self.verify_signature(signature, ciphertext.round)?;
		tld(ciphertext, signature)
	}

	pub fn verify_pre_round(&self, ciphertext: &TimelockCiphertext) -> bool {
		ciphertext.verify_pre_round()
	}
}
