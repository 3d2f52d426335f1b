// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend error types.

use cadence_core::error::SchedulerError;

/// Errors surfaced by [`EventLoop`](crate::EventLoop).
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoopError {
    /// The scheduler refused a completion.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    /// A render is in flight (or nothing will ever wake the loop) and every
    /// [`CompletionSender`](crate::CompletionSender) is gone.
    #[error("all completion senders were dropped")]
    Disconnected,
}

/// The event loop is gone; the completion could not be delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("event loop has shut down")]
pub struct LoopClosed;
