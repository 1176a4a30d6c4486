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

//! All-or-nothing execution.

/// Describes whether the changes made inside a transaction are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome<R> {
	Commit(R),
	Rollback(R),
}

impl<R> TransactionOutcome<R> {
	pub fn into_inner(self) -> R {
		match self {
			Self::Commit(r) | Self::Rollback(r) => r,
		}
	}
}

/// Something whose side effects can be grouped and undone.
///
/// Transactions may nest; `commit` and `rollback` always close the innermost one.
pub trait Transactional {
	fn begin(&self);
	fn commit(&self);
	fn rollback(&self);

	/// Runs `call` in a new transaction, keeping or discarding its effects as it decides.
	fn execute_in_transaction<F, R>(&self, call: F) -> R
	where
		F: FnOnce(&Self) -> TransactionOutcome<R>,
		Self: Sized,
	{
		self.begin();
		match call(self) {
			TransactionOutcome::Commit(r) => {
				self.commit();
				r
			},
			TransactionOutcome::Rollback(r) => {
				self.rollback();
				r
			},
		}
	}

	/// Runs `call` in a new transaction that commits on `Ok` and rolls back on `Err`.
	fn with_transaction<F, R, E>(&self, call: F) -> Result<R, E>
	where
		F: FnOnce(&Self) -> Result<R, E>,
		Self: Sized,
	{
		self.execute_in_transaction(|this| match call(this) {
			Ok(r) => TransactionOutcome::Commit(Ok(r)),
			Err(e) => TransactionOutcome::Rollback(Err(e)),
		})
	}
}
