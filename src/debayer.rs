// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Bilinear Bayer-to-RGB conversion for the RGGB colour filter array used by
//! the colour sensor variants.
//!
//! Ported from `ufo_convert_bayer_to_rgb`. The lower-right green sample's
//! four-neighbour average summed `BY(i+2, j+1)` twice instead of including
//! `BY(i+1, j+2)`; this port uses the corrected neighbour set (see
//! DESIGN.md, Open Question 4).

use crate::error::{DecodeError, Result};

/// Converts a raw Bayer-pattern `pixels` buffer (RGGB, origin at the
/// top-left) into an interleaved 8-bit RGB buffer of the same dimensions.
/// Samples are linearly rescaled so the frame's maximum value maps to 255.
///
/// The outermost one-pixel border is left black: the kernel needs a
/// 3x3 neighbourhood and is only evaluated on interior 2x2 Bayer blocks,
/// matching the original.
pub fn bayer_to_rgb(pixels: &[u16], width: usize, height: usize) -> Result<Vec<u8>> {
    if pixels.len() != width * height {
        return Err(DecodeError::corrupt(0, "pixel buffer does not match width * height"));
    }
    if width < 3 || height < 3 {
        return Err(DecodeError::corrupt(0, "frame too small to debayer"));
    }

    let max = pixels.iter().copied().max().unwrap_or(0).max(1) as f64;
    let scale = 255.0 / max;

    let at = |x: usize, y: usize| pixels[x + width * y] as u32;
    // Matches the original's implicit double -> uint8_t cast, which
    // truncates toward zero rather than rounding to nearest.
    let to_u8 = |v: u32| ((v as f64) * scale) as u8;

    let mut rgb = vec![0u8; width * height * 3];
    let mut set = |rgb: &mut [u8], x: usize, y: usize, r: u8, g: u8, b: u8| {
        let idx = 3 * (x + width * y);
        rgb[idx] = r;
        rgb[idx + 1] = g;
        rgb[idx + 2] = b;
    };

    let mut i = 1;
    while i < width - 1 {
        let mut j = 1;
        while j < height - 1 {
            // Top left: R site.
            let r = to_u8((at(i - 1, j - 1) + at(i + 1, j - 1) + at(i - 1, j + 1) + at(i + 1, j + 1)) / 4);
            let g = to_u8((at(i - 1, j) + at(i, j - 1) + at(i + 1, j) + at(i, j + 1)) / 4);
            let b = to_u8(at(i, j));
            set(&mut rgb, i, j, r, g, b);

            // Top right.
            let r = to_u8((at(i + 1, j - 1) + at(i + 1, j + 1)) / 2);
            let g = to_u8(at(i + 1, j));
            let b = to_u8((at(i, j) + at(i + 2, j)) / 2);
            set(&mut rgb, i + 1, j, r, g, b);

            // Lower left.
            let r = to_u8((at(i - 1, j) + at(i + 1, j + 1)) / 2);
            let g = to_u8(at(i, j + 1));
            let b = to_u8((at(i, j) + at(i, j + 2)) / 2);
            set(&mut rgb, i, j + 1, r, g, b);

            // Lower right: B site.
            let r = to_u8(at(i + 1, j + 1));
            let g = to_u8((at(i + 1, j) + at(i, j + 1) + at(i + 2, j + 1) + at(i + 1, j + 2)) / 4);
            let b = to_u8((at(i, j) + at(i + 2, j) + at(i, j + 2) + at(i + 2, j + 2)) / 4);
            set(&mut rgb, i + 1, j + 1, r, g, b);

            j += 2;
        }
        i += 2;
    }

    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        let pixels = vec![0u16; 10];
        assert!(bayer_to_rgb(&pixels, 4, 4).is_err());
    }

    #[test]
    fn flat_field_maps_to_uniform_mid_grey_channels() {
        let width = 6;
        let height = 6;
        let pixels = vec![100u16; width * height];
        let rgb = bayer_to_rgb(&pixels, width, height).unwrap();
        // A uniform input scales every sample to 255 (its own maximum).
        let idx = 3 * (2 + width * 2);
        assert_eq!(&rgb[idx..idx + 3], &[255, 255, 255]);
    }

    #[test]
    fn border_row_and_column_are_left_black() {
        let width = 5;
        let height = 5;
        let pixels = vec![500u16; width * height];
        let rgb = bayer_to_rgb(&pixels, width, height).unwrap();
        assert_eq!(&rgb[0..3], &[0, 0, 0]);
    }
}
