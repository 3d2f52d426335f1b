// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render completions crossing from renderer threads to the event loop.

use cadence_core::renderer::{RenderOutcome, Timestamps};
use cadence_core::session::FrameNumber;
use crossbeam_channel::{Receiver, Sender, bounded};

use crate::error::LoopClosed;

/// How one render ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderCompletion {
    /// The frame the renderer was asked to produce.
    pub frame_number: FrameNumber,
    /// What happened to it.
    pub outcome: RenderOutcome,
}

/// The renderer side of the completion channel.
///
/// Cheap to clone; hand one to every thread that finishes renders.
#[derive(Clone, Debug)]
pub struct CompletionSender {
    tx: Sender<RenderCompletion>,
}

impl CompletionSender {
    /// Reports a completion. Blocks while the channel is full.
    ///
    /// # Errors
    ///
    /// Returns [`LoopClosed`] once the event loop has been dropped.
    pub fn send(&self, completion: RenderCompletion) -> Result<(), LoopClosed> {
        self.tx.send(completion).map_err(|_| LoopClosed)
    }

    /// Reports `frame_number` as shown on the display.
    ///
    /// # Errors
    ///
    /// Returns [`LoopClosed`] once the event loop has been dropped.
    pub fn presented(&self, frame_number: FrameNumber, timestamps: Timestamps) -> Result<(), LoopClosed> {
        self.send(RenderCompletion {
            frame_number,
            outcome: RenderOutcome::Presented(timestamps),
        })
    }

    /// Reports `frame_number` as never shown.
    ///
    /// # Errors
    ///
    /// Returns [`LoopClosed`] once the event loop has been dropped.
    pub fn dropped(&self, frame_number: FrameNumber) -> Result<(), LoopClosed> {
        self.send(RenderCompletion {
            frame_number,
            outcome: RenderOutcome::Dropped,
        })
    }
}

/// The event loop side of the completion channel.
#[derive(Debug)]
pub struct CompletionReceiver {
    pub(crate) rx: Receiver<RenderCompletion>,
}

/// Creates a completion channel holding at most `capacity` unread
/// completions (at least one).
#[must_use]
pub fn completion_channel(capacity: usize) -> (CompletionSender, CompletionReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    (CompletionSender { tx }, CompletionReceiver { rx })
}
