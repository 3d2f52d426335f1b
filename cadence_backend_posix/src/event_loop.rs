// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A blocking event loop that drives a [`FrameScheduler`] in real time.
//!
//! # Wiring
//!
//! ```text
//!   renderer thread(s)                     loop thread
//!   ------------------                     -----------
//!   CompletionSender ──(crossbeam)──► CompletionReceiver
//!                                            │
//!                          recv_timeout(next_deadline - now)
//!                           │                         │
//!                      completion                 timed out
//!                           ▼                         ▼
//!                  on_render_outcome             on_deadline
//! ```
//!
//! The scheduler itself stays on the loop thread. Renderers hand the
//! [`RenderRequest`](cadence_core::renderer::RenderRequest) off to a worker
//! from [`FrameRenderer::render_frame`] and report back through their
//! sender.

use std::time::Duration as StdDuration;

use cadence_core::renderer::{FrameRenderer, RenderOutcome};
use cadence_core::scheduler::FrameScheduler;
use cadence_core::session::FrameNumber;
use cadence_core::time::HostTime;
use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::completion::{CompletionReceiver, RenderCompletion};
use crate::error::LoopError;

/// Configuration for the [`EventLoop`] and its completion channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventLoopConfig {
    /// Unread completions the channel holds before senders block.
    pub completion_capacity: usize,
    /// Re-anchor the vsync grid on every reported presentation time.
    ///
    /// Turn this off when something else feeds
    /// [`VsyncTiming`](cadence_core::vsync::VsyncTiming) or when renderers
    /// report presentation times that are not vsyncs.
    pub anchor_vsync_to_presentations: bool,
}

impl EventLoopConfig {
    /// Default [`completion_capacity`](Self::completion_capacity).
    pub const DEFAULT_COMPLETION_CAPACITY: usize = 64;

    /// The default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            completion_capacity: Self::DEFAULT_COMPLETION_CAPACITY,
            anchor_vsync_to_presentations: true,
        }
    }
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// What one [`EventLoop::turn`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Turn {
    /// The armed deadline passed and the scheduler latched.
    Deadline,
    /// A render completion was delivered.
    Completion(FrameNumber),
    /// Nothing was due before the wait ran out.
    TimedOut,
}

/// Owns a scheduler and feeds it deadlines and render completions.
#[derive(Debug)]
pub struct EventLoop<R> {
    config: EventLoopConfig,
    scheduler: FrameScheduler<R>,
    completions: Receiver<RenderCompletion>,
}

impl<R: FrameRenderer> EventLoop<R> {
    /// Creates a loop around `scheduler`, receiving completions on
    /// `completions`.
    #[must_use]
    pub fn new(
        config: EventLoopConfig,
        scheduler: FrameScheduler<R>,
        completions: CompletionReceiver,
    ) -> Self {
        Self {
            config,
            scheduler,
            completions: completions.rx,
        }
    }

    /// The scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &FrameScheduler<R> {
        &self.scheduler
    }

    /// The scheduler, mutably. Producers schedule presents through this.
    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler<R> {
        &mut self.scheduler
    }

    /// Tears the loop down, keeping the scheduler.
    pub fn into_scheduler(self) -> FrameScheduler<R> {
        self.scheduler
    }

    /// Blocks until the next deadline passes or a completion arrives,
    /// handles it, and returns.
    ///
    /// `max_wait` bounds the wait. Without it and without an armed deadline
    /// the loop waits for a completion indefinitely.
    ///
    /// # Errors
    ///
    /// [`LoopError::Scheduler`] if the scheduler rejects a completion, and
    /// [`LoopError::Disconnected`] if the loop would wait on a channel that
    /// no sender can write to anymore.
    pub fn turn(&mut self, max_wait: Option<StdDuration>) -> Result<Turn, LoopError> {
        let now = self.now();
        let until_deadline = self
            .scheduler
            .next_deadline()
            .map(|deadline| StdDuration::from(deadline.saturating_duration_since(now)));
        let wait = match (until_deadline, max_wait) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        let received = match wait {
            Some(wait) => self.completions.recv_timeout(wait),
            None => self
                .completions
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(completion) => {
                self.complete(completion)?;
                Ok(Turn::Completion(completion.frame_number))
            }
            Err(RecvTimeoutError::Timeout) => Ok(self.fire_if_due()),
            Err(RecvTimeoutError::Disconnected) => {
                if let Some(frame) = self.scheduler.frame_in_flight() {
                    log::warn!("frame {frame} can never complete, completion senders are gone");
                    return Err(LoopError::Disconnected);
                }
                // Nobody can wake us early; sleep out the wait instead.
                let Some(wait) = wait else {
                    return Err(LoopError::Disconnected);
                };
                std::thread::sleep(wait);
                Ok(self.fire_if_due())
            }
        }
    }

    /// Runs turns until the clock reaches `end`.
    ///
    /// # Errors
    ///
    /// Stops at the first error from [`turn`](Self::turn).
    pub fn run_until(&mut self, end: HostTime) -> Result<(), LoopError> {
        loop {
            let now = self.now();
            if now >= end {
                return Ok(());
            }
            let remaining = StdDuration::from(end.saturating_duration_since(now));
            self.turn(Some(remaining))?;
        }
    }

    /// Runs turns while `keep_going` returns `true`. The predicate is
    /// checked before every turn and may schedule more work.
    ///
    /// # Errors
    ///
    /// Stops at the first error from [`turn`](Self::turn).
    pub fn run_while(
        &mut self,
        mut keep_going: impl FnMut(&mut FrameScheduler<R>) -> bool,
    ) -> Result<(), LoopError> {
        while keep_going(&mut self.scheduler) {
            self.turn(None)?;
        }
        Ok(())
    }

    fn now(&self) -> HostTime {
        self.scheduler.vsync().now()
    }

    fn fire_if_due(&mut self) -> Turn {
        match self.scheduler.next_deadline() {
            Some(deadline) if deadline <= self.now() => {
                self.scheduler.on_deadline();
                Turn::Deadline
            }
            _ => Turn::TimedOut,
        }
    }

    fn complete(&mut self, completion: RenderCompletion) -> Result<(), LoopError> {
        let RenderCompletion {
            frame_number,
            outcome,
        } = completion;
        if let RenderOutcome::Presented(ts) = outcome {
            if self.config.anchor_vsync_to_presentations {
                self.scheduler
                    .vsync()
                    .set_last_vsync_time(ts.actual_presentation_time);
            }
        }
        self.scheduler.on_render_outcome(frame_number, outcome)?;
        log::trace!("completion for frame {frame_number} handled");
        Ok(())
    }
}
