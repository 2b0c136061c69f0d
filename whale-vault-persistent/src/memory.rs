// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use super::Persist;

pub type Error = std::convert::Infallible;

/// A [`Persist`] implementation that only keeps the value in memory, for sessions that
/// should not leave anything behind.
#[derive(Debug, Default, derive_more::Deref)]
pub struct Memory<T> {
    #[deref]
    value: T,
    saves: usize,
}

impl<T> Memory<T> {
    pub fn new(value: T) -> Self {
        Self { value, saves: 0 }
    }

    /// How many times the value was saved.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl<T> Persist for Memory<T> {
    type Error = Error;

    fn as_mut(this: &mut Self) -> &mut T {
        &mut this.value
    }

    fn persist(this: &mut Self) -> Result<(), Error> {
        this.saves += 1;
        Ok(())
    }

    fn into_value(this: Self) -> T {
        this.value
    }
}
