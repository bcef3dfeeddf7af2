// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Row-recombination kernels for interlaced-readout sensors.
//!
//! Ported from `ufo_deinterlace_interpolate`/`ufo_deinterlace_weave`, which
//! are identical between `ufodecode.c` and `libipe.c`.

use crate::error::{DecodeError, Result};

fn check_dims(len: usize, width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(DecodeError::corrupt(0, "zero-sized frame"));
    }
    if len != width * height {
        return Err(DecodeError::corrupt(0, "pixel buffer does not match width * height"));
    }
    Ok(())
}

/// Doubles the row count of a half-height frame by inserting, between each
/// pair of source rows, their pixel-wise average; the final source row is
/// duplicated as the last output row. `out` must hold `width * height * 2`
/// samples.
pub fn interpolate(input: &[u16], out: &mut [u16], width: usize, height: usize) -> Result<()> {
    check_dims(input.len(), width, height)?;
    if out.len() != width * height * 2 {
        return Err(DecodeError::corrupt(0, "output buffer does not match width * height * 2"));
    }

    for row in 0..height {
        let src = &input[row * width..(row + 1) * width];
        let dst = &mut out[2 * row * width..(2 * row + 1) * width];
        dst.copy_from_slice(src);

        let next_row = (row + 1).min(height - 1);
        let next = &input[next_row * width..(next_row + 1) * width];
        let mid = &mut out[(2 * row + 1) * width..(2 * row + 2) * width];
        for x in 0..width {
            mid[x] = ((src[x] as u32 + next[x] as u32) / 2) as u16;
        }
    }

    Ok(())
}

/// Interleaves the rows of two equal-sized frames, alternating a row from
/// `first` then a row from `second`. `out` must hold `width * height * 2`
/// samples.
pub fn weave(first: &[u16], second: &[u16], out: &mut [u16], width: usize, height: usize) -> Result<()> {
    check_dims(first.len(), width, height)?;
    check_dims(second.len(), width, height)?;
    if out.len() != width * height * 2 {
        return Err(DecodeError::corrupt(0, "output buffer does not match width * height * 2"));
    }

    for row in 0..height {
        let dst_a = &mut out[2 * row * width..(2 * row + 1) * width];
        dst_a.copy_from_slice(&first[row * width..(row + 1) * width]);
        let dst_b = &mut out[(2 * row + 1) * width..(2 * row + 2) * width];
        dst_b.copy_from_slice(&second[row * width..(row + 1) * width]);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolate_averages_adjacent_rows_and_duplicates_last() {
        let width = 4;
        let height = 3;
        let input: Vec<u16> = vec![
            0, 0, 0, 0, // row 0
            10, 10, 10, 10, // row 1
            20, 20, 20, 20, // row 2
        ];
        let mut out = vec![0u16; width * height * 2];
        interpolate(&input, &mut out, width, height).unwrap();

        assert_eq!(&out[0..4], &[0, 0, 0, 0]);
        assert_eq!(&out[4..8], &[5, 5, 5, 5]);
        assert_eq!(&out[8..12], &[10, 10, 10, 10]);
        assert_eq!(&out[12..16], &[15, 15, 15, 15]);
        assert_eq!(&out[16..20], &[20, 20, 20, 20]);
        assert_eq!(&out[20..24], &[20, 20, 20, 20]);
    }

    #[test]
    fn weave_alternates_rows_from_each_frame() {
        let width = 2;
        let height = 2;
        let first = vec![1u16, 1, 2, 2];
        let second = vec![9u16, 9, 8, 8];
        let mut out = vec![0u16; width * height * 2];
        weave(&first, &second, &mut out, width, height).unwrap();
        assert_eq!(out, vec![1, 1, 9, 9, 2, 2, 8, 8]);
    }

    #[test]
    fn rejects_mismatched_buffer_size() {
        let input = vec![0u16; 3];
        let mut out = vec![0u16; 8];
        assert!(interpolate(&input, &mut out, 2, 2).is_err());
    }
}
