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

//! # Sealed Orders Traits
//!
//! Interfaces of the services an executed order chunk calls into.
//!
//! ## Modules
//!
//! * [`execution`] - the vault, DEX and settlement services that move funds
//! * [`transaction`] - all-or-nothing execution across those services
//! * [`time`] - wall clock access
//! * [`memory`] - in-memory implementations for local runs and tests
//!
//! ## Overview
//!
//! The ledger never holds funds itself. Withdrawing shares, swapping, adding liquidity and paying
//! out are delegated to these traits, so the same ledger runs against an in-memory environment
//! in tests and against real services elsewhere.

pub mod execution;
pub mod memory;
pub mod time;
pub mod transaction;

pub use execution::{Dex, ExternalError, LiquidityReceipt, Settlement, Vault};
pub use time::{SystemClock, UnixTime};
pub use transaction::{TransactionOutcome, Transactional};
