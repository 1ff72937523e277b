// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Tracking of how far behind the display clock decoding is.

use crate::Timestamp;

/// Verdict of [`LatenessTracker::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lateness {
    OnTime,
    Late,
}

/// Counts consecutive late pictures, and remembers since when they have been late.
#[derive(Debug, Default, Clone)]
pub struct LatenessTracker {
    late_frames: u32,
    /// Time at which the current streak started. Only meaningful while `late_frames > 0`.
    late_frames_start: Timestamp,
}

impl LatenessTracker {
    pub fn new() -> Self {
        Default::default()
    }

    /// Number of consecutive pictures found late.
    pub fn late_frames(&self) -> u32 {
        self.late_frames
    }

    /// Start of the current streak of late pictures, if there is one.
    pub fn late_frames_start(&self) -> Option<Timestamp> {
        (self.late_frames > 0).then_some(self.late_frames_start)
    }

    /// Time spent in the current streak as of `now`, or `None` if pictures are on time.
    pub fn late_for(&self, now: Timestamp) -> Option<Timestamp> {
        self.late_frames_start().map(|start| now.saturating_sub(start))
    }

    #[cfg(test)]
    pub(crate) fn with_streak(late_frames: u32, late_frames_start: Timestamp) -> Self {
        Self {
            late_frames,
            late_frames_start,
        }
    }

    /// Ends the current streak.
    pub fn reset(&mut self) {
        self.late_frames = 0;
    }

    /// Shortens the current streak by one picture.
    pub(super) fn decrement(&mut self) {
        self.late_frames = self.late_frames.saturating_sub(1);
    }

    /// Classifies a picture due for display at `display_due` and updates the streak.
    ///
    /// Preroll pictures are never displayed, so they are always on time. So are pictures whose
    /// display date is unknown.
    pub fn classify(
        &mut self,
        now: Timestamp,
        display_due: Option<Timestamp>,
        prerolling: bool,
    ) -> Lateness {
        let display_due = if prerolling {
            None
        } else {
            display_due.filter(|&due| due > 0)
        };

        match display_due {
            Some(due) if due <= now => {
                self.late_frames = self.late_frames.saturating_add(1);
                if self.late_frames == 1 {
                    self.late_frames_start = now;
                }
                Lateness::Late
            }
            _ => {
                self.late_frames = 0;
                Lateness::OnTime
            }
        }
    }
}
