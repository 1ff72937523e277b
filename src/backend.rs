// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Decoding engines.
//!
//! An engine is the provider of the actual picture decoding, as described by
//! [`DecodingEngine`](crate::decoder::DecodingEngine). Engines are supplied by the host; this
//! module only contains the one the decode pump is tested against.

#[cfg(test)]
pub(crate) mod dummy;
