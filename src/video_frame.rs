// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Destination pictures, i.e. the host-owned buffers decoded pictures are copied into.

use crate::decoder::OutputFormat;
use crate::utils::align_up;
use crate::DecodedFormat;
use crate::Resolution;
use crate::Timestamp;

pub const Y_PLANE: usize = 0;
pub const U_PLANE: usize = 1;
pub const V_PLANE: usize = 2;

/// Writable view of one plane of an [`OutputPicture`].
#[derive(Debug)]
pub struct PlaneMut<'a> {
    pub data: &'a mut [u8],
    /// Distance in bytes between the start of two consecutive rows.
    pub pitch: usize,
    /// Number of rows to fill.
    pub visible_lines: usize,
}

/// A picture allocated by the host to receive decoded data.
pub trait OutputPicture {
    fn num_planes(&self) -> usize;

    fn plane_mut(&mut self, index: usize) -> Option<PlaneMut<'_>>;

    /// Marks the picture as progressive (`true`) or interlaced.
    fn set_progressive(&mut self, progressive: bool);

    fn set_timestamp(&mut self, timestamp: Option<Timestamp>);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Plane {
    data: Vec<u8>,
    pitch: usize,
    visible_lines: usize,
}

/// A system memory picture with padded rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    format: DecodedFormat,
    resolution: Resolution,
    planes: Vec<Plane>,
    progressive: bool,
    timestamp: Option<Timestamp>,
}

impl Frame {
    /// Allocates a frame for `format`, with the pitch of every plane rounded up to
    /// `pitch_alignment` bytes. An alignment of 0 means no alignment.
    pub fn new(format: &OutputFormat, pitch_alignment: usize) -> Self {
        let pitch_alignment = pitch_alignment.max(1);
        let resolution = format.visible;
        let planes = (0..format.format.num_planes())
            .map(|plane| {
                let (sub_h, sub_v) = format.format.subsampling(plane);
                let width = resolution.width.div_ceil(sub_h) as usize;
                let lines = resolution.height.div_ceil(sub_v) as usize;
                let pitch = align_up(width.max(1), pitch_alignment);

                Plane {
                    data: vec![0; pitch * lines],
                    pitch,
                    visible_lines: lines,
                }
            })
            .collect();

        Self {
            format: format.format,
            resolution,
            planes,
            progressive: false,
            timestamp: None,
        }
    }

    pub fn format(&self) -> DecodedFormat {
        self.format
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_progressive(&self) -> bool {
        self.progressive
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    /// Returns the data of `plane` along with its pitch.
    pub fn plane(&self, plane: usize) -> Option<(&[u8], usize)> {
        self.planes.get(plane).map(|p| (p.data.as_slice(), p.pitch))
    }
}

impl OutputPicture for Frame {
    fn num_planes(&self) -> usize {
        self.planes.len()
    }

    fn plane_mut(&mut self, index: usize) -> Option<PlaneMut<'_>> {
        self.planes.get_mut(index).map(|p| PlaneMut {
            data: &mut p.data,
            pitch: p.pitch,
            visible_lines: p.visible_lines,
        })
    }

    fn set_progressive(&mut self, progressive: bool) {
        self.progressive = progressive;
    }

    fn set_timestamp(&mut self, timestamp: Option<Timestamp>) {
        self.timestamp = timestamp;
    }
}
