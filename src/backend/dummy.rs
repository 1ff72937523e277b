// Copyright 2022 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! This file contains a dummy engine whose only purpose is to let the decode pump
//! run so we can test it in isolation.
//!
//! Every coded unit or data chunk pushed with a timestamp completes one picture. Completed
//! pictures become retrievable one decode step at a time, which lets tests exercise the drain
//! loop. Calls are recorded so tests can check what was fed.

use std::collections::VecDeque;

use anyhow::anyhow;

use crate::decoder::ChromaFormat;
use crate::decoder::DecodedPicture;
use crate::decoder::DecodingEngine;
use crate::decoder::EngineError;
use crate::decoder::EngineResult;
use crate::decoder::PlaneRef;
use crate::decoder::Step;
use crate::decoder::StepStatus;
use crate::utils::align_up;
use crate::EncodedFormat;
use crate::Resolution;
use crate::Timestamp;

/// Calls made to the engine, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    StartWorkerThreads(usize),
    Setup(Vec<u8>),
    Data(Vec<u8>, Option<Timestamp>),
    Unit(Vec<u8>, Option<Timestamp>),
    EndOfUnit,
    Flush,
    Reset,
}

pub(crate) struct Picture {
    timestamp: Option<Timestamp>,
    chroma_format: ChromaFormat,
    resolution: Resolution,
    planes: Vec<(Vec<u8>, usize)>,
}

impl Picture {
    /// Builds a 4:2:0 picture whose samples are all `fill`, with rows padded to 32 bytes plus
    /// 16 bytes of garbage.
    fn new(
        timestamp: Option<Timestamp>,
        chroma_format: ChromaFormat,
        resolution: Resolution,
        fill: u8,
    ) -> Self {
        let planes = (0..3)
            .map(|plane| {
                let sub = if plane == 0 { 1 } else { 2 };
                let width = resolution.width.div_ceil(sub) as usize;
                let height = resolution.height.div_ceil(sub) as usize;
                let stride = align_up(width, 32) + 16;

                let mut data = vec![0xee; stride * height];
                for row in data.chunks_mut(stride) {
                    row[..width].fill(fill);
                }

                (data, stride)
            })
            .collect();

        Self {
            timestamp,
            chroma_format,
            resolution,
            planes,
        }
    }
}

impl DecodedPicture for Picture {
    fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    fn chroma_format(&self) -> ChromaFormat {
        self.chroma_format
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn num_planes(&self) -> usize {
        self.planes.len()
    }

    fn plane(&self, index: usize) -> Option<PlaneRef<'_>> {
        self.planes.get(index).map(|(data, stride)| PlaneRef {
            data,
            stride: *stride,
        })
    }
}

pub(crate) struct Engine {
    pub calls: Vec<Call>,
    /// Number of `decode_step` calls so far.
    pub steps: usize,
    /// Results returned by the next calls to `decode_step`, before the default behavior.
    pub step_script: VecDeque<EngineResult<StepStatus>>,
    /// Results returned by the next push calls. Failed pushes complete no picture.
    pub push_script: VecDeque<EngineResult<()>>,
    /// Properties of the pictures completed from now on.
    pub resolution: Resolution,
    pub chroma_format: ChromaFormat,
    pub fail_worker_threads: bool,
    /// Pictures completed but not decoded yet.
    pending: VecDeque<Picture>,
    ready: VecDeque<Picture>,
    fill: u8,
}

impl Engine {
    pub(crate) fn new() -> Self {
        Self {
            calls: Vec::new(),
            steps: 0,
            step_script: VecDeque::new(),
            push_script: VecDeque::new(),
            resolution: Resolution::from((64, 48)),
            chroma_format: ChromaFormat::Yuv420,
            fail_worker_threads: false,
            pending: VecDeque::new(),
            ready: VecDeque::new(),
            fill: 0,
        }
    }

    /// Number of pictures the engine still holds.
    pub(crate) fn num_buffered(&self) -> usize {
        self.pending.len() + self.ready.len()
    }

    pub(crate) fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| f(c)).count()
    }

    /// Completes a picture if the push was accepted and carried a timestamp.
    fn complete_picture(&mut self, timestamp: Option<Timestamp>) -> EngineResult<()> {
        self.push_script.pop_front().unwrap_or(Ok(()))?;
        if timestamp.is_none() {
            return Ok(());
        }

        self.fill = self.fill.wrapping_add(1);
        self.pending.push_back(Picture::new(
            timestamp,
            self.chroma_format,
            self.resolution,
            self.fill,
        ));

        Ok(())
    }
}

impl DecodingEngine for Engine {
    type Picture = Picture;

    fn supports(&self, format: EncodedFormat) -> bool {
        matches!(format, EncodedFormat::H264 | EncodedFormat::H265)
    }

    fn start_worker_threads(&mut self, count: usize) -> EngineResult<()> {
        self.calls.push(Call::StartWorkerThreads(count));
        if self.fail_worker_threads {
            Err(EngineError::Other(anyhow!("threads are not available")))
        } else {
            Ok(())
        }
    }

    fn push_setup(&mut self, data: &[u8]) -> EngineResult<()> {
        self.calls.push(Call::Setup(data.to_vec()));
        self.complete_picture(None)
    }

    fn push_data(&mut self, data: &[u8], timestamp: Option<Timestamp>) -> EngineResult<()> {
        self.calls.push(Call::Data(data.to_vec(), timestamp));
        self.complete_picture(timestamp)
    }

    fn push_unit(&mut self, data: &[u8], timestamp: Option<Timestamp>) -> EngineResult<()> {
        self.calls.push(Call::Unit(data.to_vec(), timestamp));
        self.complete_picture(timestamp)
    }

    fn end_of_unit(&mut self) {
        self.calls.push(Call::EndOfUnit);
    }

    fn flush(&mut self) -> EngineResult<()> {
        self.calls.push(Call::Flush);
        Ok(())
    }

    fn decode_step(&mut self) -> EngineResult<Step> {
        self.steps += 1;

        if let Some(result) = self.step_script.pop_front() {
            let status = result?;
            return Ok(Step {
                status,
                more: status == StepStatus::Ok && !self.pending.is_empty(),
            });
        }

        match self.pending.pop_front() {
            Some(picture) => {
                self.ready.push_back(picture);
                Ok(Step {
                    status: StepStatus::Ok,
                    more: !self.pending.is_empty(),
                })
            }
            None => Ok(Step {
                status: StepStatus::WaitingForInput,
                more: false,
            }),
        }
    }

    fn next_picture(&mut self) -> Option<Self::Picture> {
        self.ready.pop_front()
    }

    fn reset(&mut self) {
        self.calls.push(Call::Reset);
        self.pending.clear();
        self.ready.clear();
    }
}
