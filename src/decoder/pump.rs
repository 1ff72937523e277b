// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The decode pump.
//!
//! [`Decoder`] holds the state of a decoding session and turns input fragments into output
//! pictures. Each call to [`Decoder::decode`] goes through the same stages:
//!
//! 1. Discontinuous or corrupted fragments reset the lateness state and are dropped.
//! 2. The first call detects the framing mode and feeds the out-of-band configuration.
//! 3. The admission policy decides whether the fragment is fed, and whether its picture is
//!    displayed.
//! 4. The fragment is split into coded units which are pushed into the engine.
//! 5. The engine is drained until a picture meant for display comes out, or until it has
//!    nothing more to give. Every picture retrieved on the way updates the lateness state.
//! 6. The output format is adapted to the picture, and the picture is copied into a frame
//!    allocated by the host.

use crate::codec::h265::DecoderConfigurationRecord;
use crate::decoder::admission;
use crate::decoder::lateness::LatenessTracker;
use crate::decoder::ChromaFormat;
use crate::decoder::DecodeError;
use crate::decoder::DecodedPicture;
use crate::decoder::DecoderConfig;
use crate::decoder::DecoderHost;
use crate::decoder::DecodingEngine;
use crate::decoder::Fragment;
use crate::decoder::InputFormat;
use crate::decoder::OutputFormat;
use crate::decoder::SessionError;
use crate::decoder::StepStatus;
use crate::framer::FramingMode;
use crate::image_processing::copy_picture;
use crate::utils::worker_thread_count;
use crate::video_frame::OutputPicture;
use crate::EncodedFormat;

/// A decoding session, feeding a [`DecodingEngine`] and handing its pictures to a
/// [`DecoderHost`].
///
/// Sessions are independent from each other. A session must only be driven by one caller at a
/// time, which `decode` taking `&mut self` enforces.
pub struct Decoder<E: DecodingEngine> {
    engine: E,
    config: DecoderConfig,
    input: InputFormat,
    framing: FramingMode,
    lateness: LatenessTracker,
    output: OutputFormat,
}

impl<E: DecodingEngine> Decoder<E> {
    /// Creates a session decoding the stream described by `input` with `engine`.
    ///
    /// The engine is asked to start its worker threads. Failing to do so is not fatal, as the
    /// engine is still able to decode without them.
    pub fn new(
        mut engine: E,
        input: InputFormat,
        config: DecoderConfig,
    ) -> Result<Self, SessionError> {
        if !engine.supports(input.codec) {
            return Err(SessionError::UnsupportedCodec(input.codec));
        }

        let threads = worker_thread_count(config.max_thread_count);
        match engine.start_worker_threads(threads) {
            Ok(()) => log::debug!("started {} worker threads", threads),
            Err(e) => log::error!("failed to start worker threads: {}", e),
        }

        let output = OutputFormat::new(input.resolution);

        Ok(Self {
            engine,
            config,
            input,
            framing: Default::default(),
            lateness: Default::default(),
            output,
        })
    }

    /// Framing mode of the stream, or [`FramingMode::Unknown`] until the first fragment.
    pub fn framing_mode(&self) -> FramingMode {
        self.framing
    }

    /// Number of consecutive pictures that were late for display.
    pub fn late_frames(&self) -> u32 {
        self.lateness.late_frames()
    }

    /// Format of the pictures currently handed to the host.
    pub fn output_format(&self) -> &OutputFormat {
        &self.output
    }

    /// Processes `fragment`, returning a picture to display if one is ready.
    ///
    /// `Ok(None)` means no picture is due for now, either because the engine needs more input,
    /// or because the fragment or its pictures were dropped. Errors only concern the current
    /// fragment and the session can keep being used after them.
    pub fn decode<H: DecoderHost>(
        &mut self,
        host: &mut H,
        fragment: Fragment,
    ) -> Result<Option<H::Picture>, DecodeError> {
        let flags = fragment.flags;
        if flags.discontinuity || flags.corrupted {
            self.lateness.reset();
            if flags.discontinuity {
                self.engine.reset();
            }
            return Ok(None);
        }

        if self.framing == FramingMode::Unknown {
            self.configure()?;
        }

        let prerolling = flags.preroll;
        if prerolling {
            self.lateness.reset();
        }

        let admission = admission::admit(
            &mut self.lateness,
            host.now(),
            host.is_pace_controlled(),
            &self.config,
        );
        if !admission.feeds() {
            return Ok(None);
        }

        self.feed(&fragment)?;

        let draw = admission.draws() && !prerolling;
        match self.drain(host, draw, prerolling)? {
            Some(picture) => self.output(host, &picture).map(Some),
            None => Ok(None),
        }
    }

    /// Detects the framing mode and feeds the out-of-band configuration to the engine.
    fn configure(&mut self) -> Result<(), DecodeError> {
        let extra = std::mem::take(&mut self.input.extra);
        self.framing = FramingMode::detect(
            &extra,
            self.input.packetized,
            self.config.default_length_size,
        );

        if extra.is_empty() {
            log::debug!("no stream configuration, assuming {:?}", self.framing);
            return Ok(());
        }

        match self.framing {
            FramingMode::LengthPrefixed(length_size) => {
                log::debug!("assuming packetized data ({} bytes length)", length_size);
                if self.input.codec == EncodedFormat::H265 {
                    log_configuration_record(&extra);
                }
                self.engine.push_setup(&extra)?;
            }
            FramingMode::StartCodeDelimited => {
                log::debug!("assuming non-packetized data");
                self.engine.push_data(&extra, None)?;
            }
            FramingMode::Unknown => return Ok(()),
        }

        self.engine.end_of_unit();
        loop {
            let step = self.engine.decode_step()?;
            if step.status != StepStatus::Ok || !step.more {
                break;
            }
        }

        Ok(())
    }

    /// Pushes the coded units of `fragment` into the engine, or flushes it if the fragment is
    /// empty.
    fn feed(&mut self, fragment: &Fragment) -> Result<(), DecodeError> {
        if fragment.data.is_empty() {
            self.engine.flush()?;
            return Ok(());
        }

        let delimited = matches!(self.framing, FramingMode::LengthPrefixed(_));
        for unit in self.framing.units(fragment.data, fragment.pts)? {
            let unit = unit?;
            if delimited {
                self.engine.push_unit(unit.data, unit.timestamp)?;
            } else {
                self.engine.push_data(unit.data, unit.timestamp)?;
            }
        }

        Ok(())
    }

    /// Steps the engine until a picture is available or no more progress can be made.
    fn next_picture(&mut self) -> Result<Option<E::Picture>, DecodeError> {
        loop {
            let step = self.engine.decode_step()?;
            // A full picture buffer or starved input are not errors, they just mean that
            // stepping again would not help right now.
            let more = step.status == StepStatus::Ok && step.more;

            if let Some(picture) = self.engine.next_picture() {
                return Ok(Some(picture));
            }
            if !more {
                return Ok(None);
            }
        }
    }

    /// Retrieves pictures until one is meant to be displayed. If `draw` is false, every
    /// available picture is retrieved and discarded.
    fn drain<H: DecoderHost>(
        &mut self,
        host: &H,
        draw: bool,
        prerolling: bool,
    ) -> Result<Option<E::Picture>, DecodeError> {
        while let Some(picture) = self.next_picture()? {
            let chroma_format = picture.chroma_format();
            if chroma_format != ChromaFormat::Yuv420 {
                return Err(DecodeError::UnsupportedFormat(chroma_format));
            }

            let display_due = if prerolling {
                None
            } else {
                picture.timestamp().and_then(|pts| host.display_date(pts))
            };
            self.lateness.classify(host.now(), display_due, prerolling);

            if draw {
                return Ok(Some(picture));
            }
        }

        Ok(None)
    }

    /// Copies `picture` into a new host picture, adapting the output format first if needed.
    fn output<H: DecoderHost>(
        &mut self,
        host: &mut H,
        picture: &E::Picture,
    ) -> Result<H::Picture, DecodeError> {
        let resolution = picture.resolution();
        if self.output.negotiate(resolution) {
            log::debug!("output resolution changed to {}", resolution);
        }

        let mut frame = host
            .new_picture(&self.output)
            .ok_or(DecodeError::OutOfResources)?;

        copy_picture(picture, &mut frame);
        // Interlaced output is not supported.
        frame.set_progressive(true);
        frame.set_timestamp(picture.timestamp());

        Ok(frame)
    }
}

fn log_configuration_record(extra: &[u8]) {
    let record = match DecoderConfigurationRecord::parse(extra) {
        Ok(record) => record,
        Err(e) => {
            log::debug!("could not parse configuration record: {:#}", e);
            return;
        }
    };

    if record.configuration_version != 1 {
        log::warn!(
            "unexpected configuration record version {}",
            record.configuration_version
        );
    }

    log::debug!(
        "configuration record: profile {} level {} chroma {:?} depth {}/{}, lengths {}, {} arrays",
        record.general_profile_idc,
        record.general_level_idc,
        record.chroma_format,
        record.bit_depth_luma_minus8 + 8,
        record.bit_depth_chroma_minus8 + 8,
        record.length_size(),
        record.arrays.len()
    );
}
