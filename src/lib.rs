// Copyright 2022 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! A decode pump for compressed video elementary streams.
//!
//! The actual picture decoding is done by an external engine implementing
//! [`decoder::DecodingEngine`]. This crate takes care of everything around it: splitting input
//! fragments into coded units ([`framer`]), deciding whether a late stream should still be fed
//! to the engine ([`decoder::admission`]), draining the engine after each push
//! ([`decoder::pump`]) and copying the selected picture into a host-provided buffer
//! ([`image_processing`]).

pub mod backend;
pub mod codec;
pub mod decoder;
pub mod framer;
pub mod image_processing;
pub mod utils;
pub mod video_frame;

use std::fmt;
use std::str::FromStr;

/// Timestamps and clock values, in microseconds.
pub type Timestamp = u64;

/// Number of [`Timestamp`] ticks per second.
pub const CLOCK_FREQ: Timestamp = 1_000_000;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Resolution {
    fn from(value: (u32, u32)) -> Self {
        Self {
            width: value.0,
            height: value.1,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Formats that pictures can be output in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DecodedFormat {
    /// Y, U and V planes, 4:2:0 sampling, 8 bits per sample.
    I420,
}

impl DecodedFormat {
    /// Number of planes of a picture in this format.
    pub fn num_planes(&self) -> usize {
        match self {
            DecodedFormat::I420 => 3,
        }
    }

    /// Horizontal and vertical subsampling factors of `plane`.
    pub fn subsampling(&self, plane: usize) -> (u32, u32) {
        match self {
            DecodedFormat::I420 => {
                if plane == 0 {
                    (1, 1)
                } else {
                    (2, 2)
                }
            }
        }
    }
}

impl FromStr for DecodedFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "i420" | "I420" => Ok(DecodedFormat::I420),
            _ => Err("unrecognized output format. Valid values: i420"),
        }
    }
}

impl fmt::Display for DecodedFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodedFormat::I420 => write!(f, "I420"),
        }
    }
}

/// Compressed formats a stream can carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EncodedFormat {
    H264,
    H265,
    VP8,
    VP9,
    AV1,
}

impl FromStr for EncodedFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "h264" | "H264" => Ok(EncodedFormat::H264),
            "h265" | "H265" | "hevc" | "HEVC" => Ok(EncodedFormat::H265),
            "vp8" | "VP8" => Ok(EncodedFormat::VP8),
            "vp9" | "VP9" => Ok(EncodedFormat::VP9),
            "av1" | "AV1" => Ok(EncodedFormat::AV1),
            _ => Err("unrecognized input format. Valid values: h264, h265, vp8, vp9, av1"),
        }
    }
}

impl fmt::Display for EncodedFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            EncodedFormat::H264 => "H264",
            EncodedFormat::H265 => "H265",
            EncodedFormat::VP8 => "VP8",
            EncodedFormat::VP9 => "VP9",
            EncodedFormat::AV1 => "AV1",
        };

        f.write_str(name)
    }
}
