// Copyright 2022 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Interfaces between the decode pump, the decoding engine and the host pipeline.
//!
//! The engine is the component doing the actual picture decoding. It is opaque to us: we push
//! compressed bytes into it, step it, and collect whatever pictures it has finished. The host is
//! the pipeline the decoded pictures are displayed by; it owns the clock and allocates the
//! pictures we copy the decoded data into.

pub mod admission;
pub mod lateness;
pub mod pump;

use std::time::Duration;

use enumn::N;
use thiserror::Error;

use crate::framer::FramingError;
use crate::framer::DEFAULT_LENGTH_SIZE;
use crate::video_frame::OutputPicture;
use crate::DecodedFormat;
use crate::EncodedFormat;
use crate::Resolution;
use crate::Timestamp;

/// Chroma subsampling of a decoded picture, numbered like `chroma_format_idc`.
#[derive(N, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaFormat {
    Monochrome = 0,
    Yuv420 = 1,
    Yuv422 = 2,
    Yuv444 = 3,
}

/// Error returned by decoding engine methods.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("not enough resources to proceed with the operation now")]
    OutOfResources,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type returned by decoding engine methods.
pub type EngineResult<T> = Result<T, EngineError>;

/// Non-error outcomes of a decode step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The step completed normally.
    Ok,
    /// The engine has no room for more decoded pictures until some are retrieved.
    ImageBufferFull,
    /// The engine needs more input before it can make progress.
    WaitingForInput,
}

/// Outcome of [`DecodingEngine::decode_step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub status: StepStatus,
    /// Whether calling `decode_step` again can make further progress.
    pub more: bool,
}

/// A plane of a decoded picture.
#[derive(Debug, Clone, Copy)]
pub struct PlaneRef<'a> {
    pub data: &'a [u8],
    /// Distance in bytes between the start of two consecutive rows.
    pub stride: usize,
}

/// A picture produced by a [`DecodingEngine`].
///
/// The picture belongs to the engine again once this object is dropped.
pub trait DecodedPicture {
    /// Presentation timestamp of the picture, as pushed along with its data.
    fn timestamp(&self) -> Option<Timestamp>;

    fn chroma_format(&self) -> ChromaFormat;

    /// Dimensions of the luma plane.
    fn resolution(&self) -> Resolution;

    fn num_planes(&self) -> usize;

    fn plane(&self, index: usize) -> Option<PlaneRef<'_>>;
}

/// An external engine decoding compressed pictures.
///
/// The engine buffers input internally and may decode on its own worker threads, so pushing
/// data and getting pictures out are decoupled: a push can result in zero, one or many pictures
/// becoming available. Destroying the engine session is done by dropping it.
pub trait DecodingEngine {
    type Picture: DecodedPicture;

    /// Whether the engine can decode streams of `format`.
    fn supports(&self, format: EncodedFormat) -> bool;

    /// Starts `count` decoding threads.
    fn start_worker_threads(&mut self, count: usize) -> EngineResult<()>;

    /// Feeds out-of-band setup data, e.g. a decoder configuration record.
    fn push_setup(&mut self, data: &[u8]) -> EngineResult<()>;

    /// Feeds a chunk of start code delimited data. Unit boundaries are found by the engine.
    fn push_data(&mut self, data: &[u8], timestamp: Option<Timestamp>) -> EngineResult<()>;

    /// Feeds a single, complete coded unit.
    fn push_unit(&mut self, data: &[u8], timestamp: Option<Timestamp>) -> EngineResult<()>;

    /// Signals that the data pushed so far ends on a unit boundary.
    fn end_of_unit(&mut self);

    /// Signals the end of the stream, so all buffered data gets decoded.
    fn flush(&mut self) -> EngineResult<()>;

    /// Performs one step of decoding.
    fn decode_step(&mut self) -> EngineResult<Step>;

    /// Returns the next picture in presentation order, if one is ready.
    fn next_picture(&mut self) -> Option<Self::Picture>;

    /// Discards all internal state, including buffered input and reference pictures.
    fn reset(&mut self);
}

/// Flags attached to an input fragment by the host.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FragmentFlags {
    /// Data is not contiguous with the previous fragment, e.g. after a seek.
    pub discontinuity: bool,
    /// The fragment is known to be damaged.
    pub corrupted: bool,
    /// The fragment is only decoded to prime the decoder and must not be displayed.
    pub preroll: bool,
}

/// A chunk of compressed stream as delivered by the host.
#[derive(Debug, Clone, Copy)]
pub struct Fragment<'a> {
    pub data: &'a [u8],
    pub pts: Option<Timestamp>,
    pub flags: FragmentFlags,
}

impl<'a> Fragment<'a> {
    pub fn new(data: &'a [u8], pts: Option<Timestamp>) -> Self {
        Self {
            data,
            pts,
            flags: Default::default(),
        }
    }

    pub fn with_flags(self, flags: FragmentFlags) -> Self {
        Self { flags, ..self }
    }
}

/// Description of the incoming stream.
#[derive(Debug, Clone)]
pub struct InputFormat {
    pub codec: EncodedFormat,
    /// Resolution announced by the container, used until the first picture is decoded.
    pub resolution: Resolution,
    /// Whether the container claims length-prefixed units. Only used if `extra` is empty.
    pub packetized: bool,
    /// Out-of-band configuration data.
    pub extra: Vec<u8>,
}

impl InputFormat {
    pub fn new(codec: EncodedFormat, resolution: Resolution) -> Self {
        Self {
            codec,
            resolution,
            packetized: false,
            extra: Vec::new(),
        }
    }
}

/// Description of the pictures handed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub format: DecodedFormat,
    /// Allocated size of the pictures.
    pub coded: Resolution,
    /// Displayable part of the pictures.
    pub visible: Resolution,
}

impl OutputFormat {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            format: DecodedFormat::I420,
            coded: resolution,
            visible: resolution,
        }
    }

    /// Adapts the format to pictures of `resolution`. Returns `true` if anything changed.
    pub fn negotiate(&mut self, resolution: Resolution) -> bool {
        let mut changed = false;

        if self.coded != resolution {
            self.coded = resolution;
            changed = true;
        }
        if self.visible != resolution {
            self.visible = resolution;
            changed = true;
        }

        changed
    }
}

/// The pipeline consuming decoded pictures.
pub trait DecoderHost {
    type Picture: OutputPicture;

    /// Whether the host paces input by itself, in which case late pictures are never dropped.
    fn is_pace_controlled(&self) -> bool {
        false
    }

    /// Current time of the presentation clock.
    fn now(&self) -> Timestamp;

    /// Time at which a picture stamped `pts` must be displayed, if known.
    fn display_date(&self, pts: Timestamp) -> Option<Timestamp>;

    /// Allocates a picture matching `format`, or `None` if no memory is available.
    fn new_picture(&mut self, format: &OutputFormat) -> Option<Self::Picture>;
}

/// Tunables of a decoding session.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Drop all input once pictures have been late for longer than this.
    pub late_frames_drop_always_age: Duration,
    /// Stop displaying pictures once more than this many consecutive ones were late.
    pub late_frames_drop_decoder: u32,
    /// Stop feeding the engine once this many consecutive pictures were late.
    pub late_frames_drop_hard: u32,
    /// Width of the unit length field when the configuration does not say.
    pub default_length_size: usize,
    /// Upper bound on the number of engine worker threads.
    pub max_thread_count: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            late_frames_drop_always_age: Duration::from_secs(5),
            late_frames_drop_decoder: 4,
            late_frames_drop_hard: 12,
            default_length_size: DEFAULT_LENGTH_SIZE,
            max_thread_count: 32,
        }
    }
}

/// Error returned when a decoding session cannot be created.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("unsupported input format {0}")]
    UnsupportedCodec(EncodedFormat),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Error returned by [`pump::Decoder::decode`].
///
/// All of these only affect the fragment or picture being processed; the session remains
/// usable.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to split fragment into units: {0}")]
    Framing(#[from] FramingError),
    #[error("decoding engine failure: {0}")]
    Engine(#[from] EngineError),
    #[error("unsupported output chroma format {0:?}")]
    UnsupportedFormat(ChromaFormat),
    #[error("failed to allocate an output picture")]
    OutOfResources,
}
