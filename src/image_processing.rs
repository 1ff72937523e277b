// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::decoder::DecodedPicture;
use crate::video_frame::OutputPicture;

/// Copies `lines` rows of a plane from `src` into `dst`.
///
/// Source and destination rows start every `src_stride` and `dst_stride` bytes respectively.
/// Only `min(src_stride, dst_stride)` bytes are copied per row: whatever lies past that is
/// padding on at least one side. The last row of either buffer may be shorter than its stride,
/// in which case only the bytes present are copied.
pub fn copy_plane(
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    lines: usize,
) {
    if src_stride == 0 || dst_stride == 0 {
        return;
    }

    let row_size = std::cmp::min(src_stride, dst_stride);
    let src_lines = src.chunks(src_stride);
    let dst_lines = dst.chunks_mut(dst_stride);

    for (src_line, dst_line) in src_lines.zip(dst_lines).take(lines) {
        let size = row_size.min(src_line.len()).min(dst_line.len());
        dst_line[..size].copy_from_slice(&src_line[..size]);
    }
}

/// Copies every plane of `src` into `dst`, filling as many rows as `dst` declares visible.
///
/// Planes present on only one side are left alone.
pub fn copy_picture<S, D>(src: &S, dst: &mut D)
where
    S: DecodedPicture + ?Sized,
    D: OutputPicture + ?Sized,
{
    for index in 0..dst.num_planes() {
        let (Some(src_plane), Some(dst_plane)) = (src.plane(index), dst.plane_mut(index)) else {
            continue;
        };

        copy_plane(
            src_plane.data,
            src_plane.stride,
            dst_plane.data,
            dst_plane.pitch,
            dst_plane.visible_lines,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_into_wider_stride() {
        const SRC_STRIDE: usize = 1920;
        const DST_STRIDE: usize = 2048;
        const LINES: usize = 1080;

        let src = (0..SRC_STRIDE * LINES)
            .map(|i| (i / SRC_STRIDE) as u8 ^ (i % 251) as u8)
            .collect::<Vec<_>>();
        let mut dst = vec![0xffu8; DST_STRIDE * LINES];

        copy_plane(&src, SRC_STRIDE, &mut dst, DST_STRIDE, LINES);

        for (line, (src_line, dst_line)) in src
            .chunks(SRC_STRIDE)
            .zip(dst.chunks(DST_STRIDE))
            .enumerate()
        {
            assert_eq!(&dst_line[..SRC_STRIDE], src_line, "line {}", line);
            // Padding of the destination is not touched.
            assert!(dst_line[SRC_STRIDE..].iter().all(|&b| b == 0xff));
        }
    }

    #[test]
    fn copy_into_narrower_stride() {
        // 4 bytes of source padding per row, marked with 0xee.
        let src = [1, 2, 3, 4, 0xee, 0xee, 0xee, 0xee, 5, 6, 7, 8, 0xee, 0xee, 0xee, 0xee];
        let mut dst = [0u8; 8];

        copy_plane(&src, 8, &mut dst, 4, 2);

        assert_eq!(dst, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn copy_only_visible_lines() {
        let src = [1u8; 4 * 4];
        let mut dst = [0u8; 4 * 4];

        copy_plane(&src, 4, &mut dst, 4, 3);

        assert!(dst[..12].iter().all(|&b| b == 1));
        assert!(dst[12..].iter().all(|&b| b == 0));
    }

    #[test]
    fn copy_short_last_row() {
        // Source buffer ends right after the visible part of its last row.
        let src = [1, 2, 0, 0, 3, 4];
        let mut dst = [0u8; 6];

        copy_plane(&src, 4, &mut dst, 3, 2);

        assert_eq!(dst, [1, 2, 0, 3, 4, 0]);
    }
}
