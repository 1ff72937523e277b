// Copyright 2022 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Utility functions used by several parts of this crate.
//!
//! This module is for anything that doesn't fit into the other top-level modules. Try not to add
//! new code here unless it really doesn't belong anywhere else.

use std::num::NonZeroUsize;
use std::thread;

/// Rounds `value` up to the next multiple of `alignment`, which must be non-zero.
pub fn align_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

/// Number of worker threads to ask a decoding engine for: twice the available parallelism,
/// capped at `max`.
///
/// Going past the number of cores pays off because engine threads regularly block waiting for
/// the reference pictures they depend on.
pub fn worker_thread_count(max: usize) -> usize {
    let cpus = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);

    std::cmp::min(cpus * 2, max)
}
