// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Splitting of input fragments into coded units.
//!
//! Elementary streams reach us in one of two conventions. Streams coming out of MP4-like
//! containers prefix every unit with its big-endian length, the width of that length being
//! described by the out-of-band configuration record. Raw Annex B streams delimit units with
//! start codes, in which case the engine finds the boundaries itself and we hand it whole
//! fragments.

use byteorder::BigEndian;
use byteorder::ByteOrder;
use thiserror::Error;

use crate::Timestamp;

/// Width of the unit length field when the configuration record does not specify it.
pub const DEFAULT_LENGTH_SIZE: usize = 4;

/// Offset of the `lengthSizeMinusOne` field in the configuration record.
const LENGTH_SIZE_OFFSET: usize = 21;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    #[error("buffer underrun: unit declares {declared} bytes but only {remaining} remain")]
    Truncated { declared: usize, remaining: usize },
    #[error("invalid unit length size {0}, must be between 1 and 4")]
    InvalidLengthSize(usize),
    #[error("framing mode has not been detected yet")]
    UnknownMode,
}

/// How coded units are delimited in the stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// No configuration has been seen yet.
    #[default]
    Unknown,
    /// Every unit is preceded by its length, stored in that many big-endian bytes.
    LengthPrefixed(usize),
    /// Units are delimited by start codes.
    StartCodeDelimited,
}

/// Returns `true` if `data` starts with a `00 00 01` or `00 00 00 01` start code.
fn starts_with_start_code(data: &[u8]) -> bool {
    matches!(data, [0, 0, 0 | 1, ..])
}

impl FramingMode {
    /// Detects the framing mode from the out-of-band configuration payload `config`.
    ///
    /// An empty payload carries no information, in which case `packetized` (the container's
    /// own claim) decides. The length field is `default_length_size` bytes wide unless the
    /// payload says otherwise.
    pub fn detect(config: &[u8], packetized: bool, default_length_size: usize) -> Self {
        if config.is_empty() {
            return if packetized {
                FramingMode::LengthPrefixed(default_length_size)
            } else {
                FramingMode::StartCodeDelimited
            };
        }

        if config.len() > 3 && !starts_with_start_code(config) {
            let length_size = config
                .get(LENGTH_SIZE_OFFSET)
                .map(|b| usize::from(b & 0x3) + 1)
                .unwrap_or(default_length_size);

            FramingMode::LengthPrefixed(length_size)
        } else {
            FramingMode::StartCodeDelimited
        }
    }

    /// Returns an iterator over the coded units of `fragment`, all sharing `timestamp`.
    ///
    /// In length-prefixed mode the whole fragment is validated first, so that a truncated unit
    /// makes the fragment fail as a whole rather than after some of its units have been
    /// consumed.
    pub fn units<'a>(
        &self,
        fragment: &'a [u8],
        timestamp: Option<Timestamp>,
    ) -> Result<Units<'a>, FramingError> {
        match *self {
            FramingMode::Unknown => Err(FramingError::UnknownMode),
            FramingMode::LengthPrefixed(length_size) => {
                if !(1..=4).contains(&length_size) {
                    return Err(FramingError::InvalidLengthSize(length_size));
                }

                let units = Units {
                    data: fragment,
                    length_size: Some(length_size),
                    timestamp,
                };
                // Walk a copy of the iterator to catch truncated units before anything is fed.
                for unit in units.clone() {
                    unit?;
                }

                Ok(units)
            }
            FramingMode::StartCodeDelimited => Ok(Units {
                data: fragment,
                length_size: None,
                timestamp,
            }),
        }
    }
}

/// A single chunk of compressed data, as delimited by the active framing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodedUnit<'a> {
    pub data: &'a [u8],
    pub timestamp: Option<Timestamp>,
}

/// Iterator over the coded units of a fragment.
///
/// Created by [`FramingMode::units`]. Since the fragment has already been validated, the
/// iterator returned by that method never yields an error.
#[derive(Debug, Clone)]
pub struct Units<'a> {
    data: &'a [u8],
    /// `None` if the fragment is handed over as a single blob.
    length_size: Option<usize>,
    timestamp: Option<Timestamp>,
}

impl<'a> Iterator for Units<'a> {
    type Item = Result<CodedUnit<'a>, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        let length_size = match self.length_size {
            Some(length_size) => length_size,
            None => {
                if self.data.is_empty() {
                    return None;
                }

                let data = std::mem::take(&mut self.data);
                return Some(Ok(CodedUnit {
                    data,
                    timestamp: self.timestamp,
                }));
            }
        };

        if self.data.len() < length_size {
            return None;
        }

        let (length, rest) = self.data.split_at(length_size);
        let declared = BigEndian::read_uint(length, length_size) as usize;
        if declared > rest.len() {
            let remaining = rest.len();
            self.data = &[];
            return Some(Err(FramingError::Truncated {
                declared,
                remaining,
            }));
        }

        let (data, rest) = rest.split_at(declared);
        self.data = rest;

        Some(Ok(CodedUnit {
            data,
            timestamp: self.timestamp,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A configuration record with `lengthSizeMinusOne` set to `length_size - 1`.
    fn hvcc_with_length_size(length_size: u8) -> Vec<u8> {
        let mut config = vec![0u8; 23];
        config[0] = 1;
        config[LENGTH_SIZE_OFFSET] = 0xfc | (length_size - 1);
        config
    }

    fn collect<'a>(units: Units<'a>) -> Vec<CodedUnit<'a>> {
        units.map(|u| u.unwrap()).collect()
    }

    #[test]
    fn detect_start_code() {
        assert_eq!(
            FramingMode::detect(&[0, 0, 0, 1, 0x40, 0x01], true, DEFAULT_LENGTH_SIZE),
            FramingMode::StartCodeDelimited
        );
        assert_eq!(
            FramingMode::detect(&[0, 0, 1, 0x40, 0x01], true, DEFAULT_LENGTH_SIZE),
            FramingMode::StartCodeDelimited
        );
        // Too short to be a configuration record.
        assert_eq!(
            FramingMode::detect(&[1, 2, 3], true, DEFAULT_LENGTH_SIZE),
            FramingMode::StartCodeDelimited
        );
    }

    #[test]
    fn detect_length_prefixed() {
        assert_eq!(
            FramingMode::detect(&hvcc_with_length_size(2), false, DEFAULT_LENGTH_SIZE),
            FramingMode::LengthPrefixed(2)
        );
        assert_eq!(
            FramingMode::detect(&hvcc_with_length_size(4), false, DEFAULT_LENGTH_SIZE),
            FramingMode::LengthPrefixed(4)
        );
        // Record truncated before the length field.
        assert_eq!(
            FramingMode::detect(&[1, 2, 3, 4, 5], false, DEFAULT_LENGTH_SIZE),
            FramingMode::LengthPrefixed(DEFAULT_LENGTH_SIZE)
        );
    }

    #[test]
    fn detect_without_config() {
        assert_eq!(
            FramingMode::detect(&[], true, DEFAULT_LENGTH_SIZE),
            FramingMode::LengthPrefixed(DEFAULT_LENGTH_SIZE)
        );
        assert_eq!(
            FramingMode::detect(&[], false, DEFAULT_LENGTH_SIZE),
            FramingMode::StartCodeDelimited
        );
    }

    #[test]
    fn split_length_prefixed() {
        let fragment = [0, 2, 0xaa, 0xbb, 0, 1, 0xcc, 0];
        let units = FramingMode::LengthPrefixed(2)
            .units(&fragment, Some(42))
            .unwrap();
        let units = collect(units);

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].data, &[0xaa, 0xbb]);
        assert_eq!(units[1].data, &[0xcc]);
        assert!(units.iter().all(|u| u.timestamp == Some(42)));
    }

    #[test]
    fn split_one_byte_lengths() {
        let fragment = [3, 1, 2, 3, 0, 1, 9];
        let units = collect(FramingMode::LengthPrefixed(1).units(&fragment, None).unwrap());

        assert_eq!(units.len(), 3);
        assert!(units[1].data.is_empty());
        assert_eq!(units[2].data, &[9]);
    }

    #[test]
    fn truncated_unit_fails_whole_fragment() {
        // First unit is fine, second declares more than what is left.
        let fragment = [0, 0, 0, 1, 0xaa, 0, 0, 0, 9, 0xbb];
        let err = FramingMode::LengthPrefixed(4)
            .units(&fragment, Some(0))
            .unwrap_err();

        assert_eq!(
            err,
            FramingError::Truncated {
                declared: 9,
                remaining: 1
            }
        );
    }

    #[test]
    fn start_code_fragment_is_one_unit() {
        let fragment = [0, 0, 0, 1, 0x26, 0x01, 0, 0, 1, 0x02];
        let units = collect(
            FramingMode::StartCodeDelimited
                .units(&fragment, Some(7))
                .unwrap(),
        );

        assert_eq!(
            units,
            vec![CodedUnit {
                data: &fragment,
                timestamp: Some(7)
            }]
        );
        assert_eq!(
            FramingMode::StartCodeDelimited
                .units(&[], None)
                .unwrap()
                .count(),
            0
        );
    }

    #[test]
    fn invalid_modes() {
        assert_eq!(
            FramingMode::Unknown.units(&[1], None).unwrap_err(),
            FramingError::UnknownMode
        );
        assert_eq!(
            FramingMode::LengthPrefixed(5).units(&[1], None).unwrap_err(),
            FramingError::InvalidLengthSize(5)
        );
    }
}
