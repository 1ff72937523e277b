// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Shedding of input when decoding cannot keep up with the display clock.
//!
//! There are three levels of response to a growing streak of late pictures. Past a soft
//! threshold, pictures are still decoded so the engine keeps its references up to date, but
//! are not displayed. Past a hard threshold, input is not even handed to the engine anymore,
//! which corrupts the output until the next key frame but frees the CPU. Independently of the
//! streak length, once pictures have been late for long enough all input is refused.
//!
//! The two refusing levels shorten the streak by one for every fragment they discard. Since a
//! refused fragment produces no picture that could end the streak, this is what eventually lets
//! input through again.

use crate::decoder::lateness::LatenessTracker;
use crate::decoder::DecoderConfig;
use crate::Timestamp;

/// What to do with an incoming fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Decode the fragment and display the resulting picture.
    FeedAndDraw,
    /// Decode the fragment, but discard the resulting picture.
    FeedAndDrop,
    /// Pictures have been late for too long: discard the fragment.
    Refuse,
    /// Too many consecutive pictures are late: discard the fragment.
    DropHard,
}

impl Admission {
    /// Whether the fragment should be handed to the engine.
    pub fn feeds(&self) -> bool {
        matches!(self, Admission::FeedAndDraw | Admission::FeedAndDrop)
    }

    /// Whether the picture decoded from the fragment should be displayed.
    pub fn draws(&self) -> bool {
        matches!(self, Admission::FeedAndDraw)
    }
}

/// Decides what to do with the next fragment given the lateness state in `tracker`, and
/// shortens the streak if the fragment gets discarded.
///
/// Hosts that pace their input themselves never get fragments dropped.
pub fn admit(
    tracker: &mut LatenessTracker,
    now: Timestamp,
    pace_controlled: bool,
    config: &DecoderConfig,
) -> Admission {
    if pace_controlled {
        return Admission::FeedAndDraw;
    }

    let max_age = Timestamp::try_from(config.late_frames_drop_always_age.as_micros())
        .unwrap_or(Timestamp::MAX);
    if tracker.late_for(now).is_some_and(|age| age > max_age) {
        tracker.decrement();
        log::warn!(
            "more than {:?} of late video, dropping frame (computer too slow?)",
            config.late_frames_drop_always_age
        );
        return Admission::Refuse;
    }

    let late_frames = tracker.late_frames();
    if late_frames > config.late_frames_drop_decoder {
        if late_frames < config.late_frames_drop_hard {
            return Admission::FeedAndDrop;
        }

        tracker.decrement();
        log::warn!(
            "more than {} late frames, dropping frame",
            config.late_frames_drop_decoder
        );
        return Admission::DropHard;
    }

    Admission::FeedAndDraw
}
