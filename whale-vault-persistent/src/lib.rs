// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! Client-side state that survives between runs, such as the wallet address and role
//! remembered after scanning a code.
//!
//! Writers are not coordinated beyond the file lock: the last one to persist wins.

pub mod file;
pub mod memory;

use std::ops::{Deref, DerefMut};

pub use file::File;
pub use memory::Memory;

/// The `Persist` trait provides a wrapper around a value that can be saved in a
/// persistent way. A minimal implementation provides an `Error` type, a `persist`
/// function to persist the value, and an `as_mut` function to get a mutable reference to
/// the value in memory.
pub trait Persist: Deref {
    type Error: std::fmt::Debug;

    /// Gets a mutable reference to the value.
    fn as_mut(this: &mut Self) -> &mut Self::Target;

    /// Saves the value to persistent storage.
    fn persist(this: &mut Self) -> Result<(), Self::Error>;

    /// Takes the value out.
    fn into_value(this: Self) -> Self::Target
    where
        Self: Sized,
        Self::Target: Sized;

    /// Gets a mutable reference to the value which, on drop, will automatically persist
    /// the new value.
    fn mutate(this: &mut Self) -> RefMut<'_, Self> {
        RefMut(this)
    }
}

/// A mutable borrow of a persisted value, saved when dropped.
pub struct RefMut<'a, P: Persist + ?Sized>(&'a mut P);

impl<P: Persist + ?Sized> Deref for RefMut<'_, P> {
    type Target = P::Target;

    fn deref(&self) -> &P::Target {
        self.0.deref()
    }
}

impl<P: Persist + ?Sized> DerefMut for RefMut<'_, P> {
    fn deref_mut(&mut self) -> &mut P::Target {
        Persist::as_mut(self.0)
    }
}

impl<P: Persist + ?Sized> Drop for RefMut<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = Persist::persist(self.0) {
            tracing::warn!("failed to persist value: {e:#?}");
        }
    }
}
