// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Release fences.
//!
//! A release fence tells a producer that the compositor no longer reads the
//! buffers of a present. The scheduler treats fences as opaque: all it can do
//! is signal them, and it does so exactly once.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

/// An opaque, signal-once handle owned by the compositor until release.
///
/// Signaling consumes the fence. Any `FnOnce()` closure is a fence, which is
/// convenient for tests and in-process producers.
pub trait ReleaseFence {
    /// Signals the fence.
    fn signal(self: Box<Self>);
}

impl<F: FnOnce()> ReleaseFence for F {
    fn signal(self: Box<Self>) {
        (*self)();
    }
}

/// The release fences attached to one present.
///
/// Owned exclusively by the present registry until it is taken or signaled.
/// [`FenceSet::signal`] takes `self`, so a set cannot be signaled twice.
#[derive(Default)]
pub struct FenceSet(Vec<Box<dyn ReleaseFence>>);

impl FenceSet {
    /// Wraps a list of fences.
    #[must_use]
    pub fn new(fences: Vec<Box<dyn ReleaseFence>>) -> Self {
        Self(fences)
    }

    /// Number of fences in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set holds no fences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Signals every fence in insertion order.
    pub fn signal(self) {
        for fence in self.0 {
            fence.signal();
        }
    }
}

impl fmt::Debug for FenceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FenceSet").field("len", &self.0.len()).finish()
    }
}

impl From<Vec<Box<dyn ReleaseFence>>> for FenceSet {
    fn from(fences: Vec<Box<dyn ReleaseFence>>) -> Self {
        Self(fences)
    }
}
