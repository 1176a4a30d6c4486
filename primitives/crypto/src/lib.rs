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

//! # Sealed Orders Crypto
//!
//! Cryptographic primitives for orders that stay sealed until a beacon round:
//!
//! * [`beacon`] - beacon parameters, round arithmetic and the round map onto G1
//! * [`tlock`] - pairing based timelock encryption bound to beacon rounds
//! * [`verifier`] - verification of beacon round signatures
//! * [`poseidon`] - the Poseidon hash chain sequencing order chunks
//! * [`wire`] - the JSON wire format of ciphertexts

pub mod beacon;
pub mod bn254;
pub mod poseidon;
pub mod prelude;
pub mod test_utils;
pub mod tlock;
pub mod verifier;
pub mod wire;

pub use ark_bn254::{G1Affine, G2Affine};
