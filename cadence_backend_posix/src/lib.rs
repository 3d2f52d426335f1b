// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! POSIX backend for cadence.
//!
//! - [`PosixClock`]: a `clock_gettime` [`Clock`](cadence_core::clock::Clock)
//! - [`EventLoop`]: sleeps until the next scheduler deadline or render
//!   completion, whichever comes first
//! - [`CompletionSender`]: the cloneable handle renderer threads report
//!   finished frames through

mod completion;
mod error;
mod event_loop;
mod time;

pub use completion::{CompletionReceiver, CompletionSender, RenderCompletion, completion_channel};
pub use error::{LoopClosed, LoopError};
pub use event_loop::{EventLoop, EventLoopConfig, Turn};
pub use time::{PosixClock, now};
