// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vsync-aligned presentation frame scheduling for compositors.
//!
//! `cadence_core` decides *when* pending scene updates ("presents") from one
//! or more producer sessions are applied and *when* the resulting frame is
//! rendered, aligned to the display's refresh cadence. It is `no_std`
//! compatible (with `alloc`), single-threaded, and agnostic to what is being
//! rendered.
//!
//! # Architecture
//!
//! ```text
//!   producer ──► register_present ──► PresentRegistry (ids, fences)
//!       │
//!       ▼
//!   schedule_update_for_session ──► VsyncTiming ──► armed deadline
//!                                                        │
//!                 ┌──────────────────────────────────────┘
//!                 ▼
//!   on_deadline ──► SessionUpdater::update_sessions ──► FrameRenderer::render_frame
//!                                                              │
//!                 ┌────────────────────────────────────────────┘
//!                 ▼
//!   on_render_outcome ──► SessionUpdater::on_frame_presented
//!                     └─► FramePredictor
//! ```
//!
//! **[`scheduler`]**: the [`FrameScheduler`](scheduler::FrameScheduler)
//! orchestrator, its configuration, and its counters.
//!
//! **[`vsync`]**: last observed vsync and refresh interval, extrapolated into
//! a grid of future vsyncs.
//!
//! **[`registry`]**: per-session present ids and outstanding release fences.
//!
//! **[`updater`]** and **[`renderer`]**: the collaborator contracts.
//!
//! **[`predictor`]**: EMA-smoothed render duration prediction.
//!
//! **[`presentation`]**: lazily computed upcoming presentation opportunities.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types, with
//! a zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod clock;
pub mod error;
pub mod fence;
pub mod latch;
pub mod predictor;
pub mod presentation;
pub mod registry;
pub mod renderer;
pub mod scheduler;
pub mod session;
pub mod time;
pub mod trace;
pub mod updater;
pub mod vsync;
