// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Upcoming presentation opportunities.
//!
//! Producers use these to pick which vsync to aim for and how late they may
//! submit for it. [`FuturePresentationInfos`] is produced by
//! [`FrameScheduler::future_presentation_infos`](crate::scheduler::FrameScheduler::future_presentation_infos)
//! and computes each entry on demand.

use core::iter::FusedIterator;

use crate::time::{Duration, HostTime};

/// Hard upper bound on the number of predicted presentations.
pub const MAX_PRESENTATION_INFOS: usize = 100;

/// One future vsync and the latest time a present can be latched for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentationInfo {
    /// Latest latch time that still makes `presentation_time`.
    pub latch_point: HostTime,
    /// The predicted vsync.
    pub presentation_time: HostTime,
}

/// A finite, lazily computed run of [`PresentationInfo`]s.
///
/// Entries are strictly increasing in presentation time, and each satisfies
/// `now <= latch_point < presentation_time` for the `now` it was created at.
/// The iterator is not `Clone`; ask the scheduler again for a fresh one.
#[derive(Debug)]
pub struct FuturePresentationInfos {
    now: HostTime,
    next: HostTime,
    end: HostTime,
    interval: Duration,
    lead: Duration,
    remaining: usize,
    yielded: usize,
}

impl FuturePresentationInfos {
    /// Starts at `first`, which must be strictly after `now`.
    ///
    /// Yields while the presentation time is at or before `now + span`, but
    /// always at least one entry and never more than `limit` (itself capped
    /// at [`MAX_PRESENTATION_INFOS`]).
    pub(crate) fn new(
        now: HostTime,
        first: HostTime,
        interval: Duration,
        span: Duration,
        lead: Duration,
        limit: usize,
    ) -> Self {
        let limit = limit.clamp(1, MAX_PRESENTATION_INFOS);
        Self {
            now,
            next: first,
            end: now.saturating_add(span),
            interval,
            lead: lead.max(Duration(1)),
            // Without a grid there is only one distinct vsync to offer.
            remaining: if interval.is_zero() { 1 } else { limit },
            yielded: 0,
        }
    }
}

impl Iterator for FuturePresentationInfos {
    type Item = PresentationInfo;

    fn next(&mut self) -> Option<PresentationInfo> {
        if self.remaining == 0 || (self.yielded > 0 && self.next > self.end) {
            return None;
        }
        let presentation_time = self.next;
        let latch_point = presentation_time.saturating_sub(self.lead).max(self.now);
        self.remaining -= 1;
        self.yielded += 1;
        match presentation_time.checked_add(self.interval) {
            Some(next) => self.next = next,
            None => self.remaining = 0,
        }
        Some(PresentationInfo {
            latch_point,
            presentation_time,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let lower = usize::from(self.yielded == 0 && self.remaining > 0);
        (lower, Some(self.remaining))
    }
}

impl FusedIterator for FuturePresentationInfos {}
