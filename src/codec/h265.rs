// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Parser for the HEVC decoder configuration record (`hvcC`, ISO/IEC 14496-15 8.3.3).
//!
//! The pump only needs the width of the unit length field from this record, which it reads
//! from a fixed offset. The full header is parsed so it can be logged and sanity-checked.

use std::io::Cursor;

use anyhow::anyhow;
use bytes::Buf;

use crate::decoder::ChromaFormat;

/// Size of the fixed part of the record, before the parameter set arrays.
const HEADER_SIZE: usize = 23;

/// One array of parameter sets (VPS, SPS, PPS or SEI) carried by the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSetArray {
    pub array_completeness: bool,
    pub nalu_type: u8,
    /// Sizes of the NAL units in the array.
    pub nalu_sizes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfigurationRecord {
    pub configuration_version: u8,
    pub general_profile_space: u8,
    pub general_tier_flag: bool,
    pub general_profile_idc: u8,
    pub general_level_idc: u8,
    pub chroma_format: Option<ChromaFormat>,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub length_size_minus_one: u8,
    pub arrays: Vec<ParameterSetArray>,
}

impl DecoderConfigurationRecord {
    pub fn parse(data: &[u8]) -> anyhow::Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(anyhow!(
                "configuration record too short: {} < {} bytes",
                data.len(),
                HEADER_SIZE
            ));
        }

        let mut r = Cursor::new(data);

        let configuration_version = r.get_u8();
        let profile = r.get_u8();
        // general_profile_compatibility_flags and general_constraint_indicator_flags.
        r.advance(4 + 6);
        let general_level_idc = r.get_u8();
        // min_spatial_segmentation_idc and parallelismType.
        r.advance(2 + 1);
        let chroma_format_idc = r.get_u8() & 0x3;
        let bit_depth_luma_minus8 = r.get_u8() & 0x7;
        let bit_depth_chroma_minus8 = r.get_u8() & 0x7;
        // avgFrameRate.
        r.advance(2);
        let length_size_minus_one = r.get_u8() & 0x3;
        let num_of_arrays = r.get_u8();

        let mut arrays = Vec::with_capacity(usize::from(num_of_arrays));
        for i in 0..num_of_arrays {
            if r.remaining() < 3 {
                return Err(anyhow!("parameter set array {} is truncated", i));
            }

            let hdr = r.get_u8();
            let num_nalus = r.get_u16();
            let mut nalu_sizes = Vec::with_capacity(usize::from(num_nalus));

            for _ in 0..num_nalus {
                if r.remaining() < 2 {
                    return Err(anyhow!("NAL unit length in array {} is truncated", i));
                }

                let size = usize::from(r.get_u16());
                if r.remaining() < size {
                    return Err(anyhow!(
                        "NAL unit in array {} is truncated: {} > {} bytes",
                        i,
                        size,
                        r.remaining()
                    ));
                }

                r.advance(size);
                nalu_sizes.push(size);
            }

            arrays.push(ParameterSetArray {
                array_completeness: hdr & 0x80 != 0,
                nalu_type: hdr & 0x3f,
                nalu_sizes,
            });
        }

        Ok(Self {
            configuration_version,
            general_profile_space: profile >> 6,
            general_tier_flag: profile & 0x20 != 0,
            general_profile_idc: profile & 0x1f,
            general_level_idc,
            chroma_format: ChromaFormat::n(chroma_format_idc),
            bit_depth_luma_minus8,
            bit_depth_chroma_minus8,
            length_size_minus_one,
            arrays,
        })
    }

    /// Width in bytes of the length field preceding each NAL unit.
    pub fn length_size(&self) -> usize {
        usize::from(self.length_size_minus_one) + 1
    }
}
