// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Channel decoder for data-format versions 0 and 4.
//!
//! Both versions share the same channel-chunk layout (ten-bit samples,
//! forty-four words per chunk, sixteen wire channels remapped through
//! [`super::CHANNEL_ORDER`]); v4 differs only in that chunk rows are
//! absolute sensor rows rather than being bounds-checked against the frame's
//! row count, so both are served by a single [`decode`] with a `legacy_v0`
//! flag selecting the footer-resync bug-compatibility quirk.

use crate::cursor::WordCursor;
use crate::error::{DecodeError, Result};

use super::CHANNEL_ORDER;

const CHANNELS_PER_ROW_UNIT: usize = 128;
const CHUNK_DATA_WORDS: usize = 42;
const FOOTER_TAG_LOW10: u32 = 0x55;
/// Bound on how far the legacy v0 footer-resync heuristic scans looking for
/// a correctly tagged footer word before giving up.
const FOOTER_RESYNC_SCAN_LIMIT: usize = 4;

/// Unpacks three ten-bit samples, MSB-first, from the low 30 bits of `word`.
fn unpack_scalar(word: u32) -> [u16; 3] {
    [
        ((word >> 20) & 0x3FF) as u16,
        ((word >> 10) & 0x3FF) as u16,
        (word & 0x3FF) as u16,
    ]
}

#[cfg(all(target_arch = "x86_64", feature = "simd"))]
mod simd {
    use std::arch::x86_64::*;

    /// Unpacks four words (twelve ten-bit samples) at once.
    ///
    /// # Safety
    /// Caller must ensure SSE2 is available (checked at call site via
    /// `is_x86_feature_detected!`).
    #[target_feature(enable = "sse2")]
    pub unsafe fn unpack_quad(words: &[u32; 4]) -> [u16; 12] {
        let v = _mm_loadu_si128(words.as_ptr() as *const __m128i);
        let mask = _mm_set1_epi32(0x3FF);
        let a = _mm_and_si128(_mm_srli_epi32(v, 20), mask);
        let b = _mm_and_si128(_mm_srli_epi32(v, 10), mask);
        let c = _mm_and_si128(v, mask);

        let mut av = [0i32; 4];
        let mut bv = [0i32; 4];
        let mut cv = [0i32; 4];
        _mm_storeu_si128(av.as_mut_ptr() as *mut __m128i, a);
        _mm_storeu_si128(bv.as_mut_ptr() as *mut __m128i, b);
        _mm_storeu_si128(cv.as_mut_ptr() as *mut __m128i, c);

        let mut out = [0u16; 12];
        for i in 0..4 {
            out[i * 3] = av[i] as u16;
            out[i * 3 + 1] = bv[i] as u16;
            out[i * 3 + 2] = cv[i] as u16;
        }
        out
    }
}

/// Unpacks `words` (a run of data words, not necessarily a multiple of four)
/// into `out`, three samples per word, using the fastest available path.
fn unpack_words(words: &[u32], out: &mut [u16]) {
    debug_assert_eq!(out.len(), words.len() * 3);

    #[cfg(all(target_arch = "x86_64", feature = "simd"))]
    {
        if is_x86_feature_detected!("sse2") {
            let mut chunks = words.chunks_exact(4);
            let mut out_pos = 0;
            for quad in &mut chunks {
                let arr: [u32; 4] = quad.try_into().unwrap();
                let samples = unsafe { simd::unpack_quad(&arr) };
                out[out_pos..out_pos + 12].copy_from_slice(&samples);
                out_pos += 12;
            }
            for &w in chunks.remainder() {
                out[out_pos..out_pos + 3].copy_from_slice(&unpack_scalar(w));
                out_pos += 3;
            }
            return;
        }
    }

    for (i, &w) in words.iter().enumerate() {
        let s = unpack_scalar(w);
        out[i * 3] = s[0];
        out[i * 3 + 1] = s[1];
        out[i * 3 + 2] = s[2];
    }
}

/// Decodes the channel-chunk payload of one v0 or v4 frame.
///
/// `n_rows` and `width` come from the frame header / decoder configuration.
/// `legacy_v0` selects the bug-compatible footer-resync heuristic (present
/// only on the original v0 path). Returns the number of words consumed.
pub fn decode(
    cursor: &mut WordCursor,
    width: usize,
    n_rows: u32,
    legacy_v0: bool,
    strict: bool,
    pixels: &mut [u16],
) -> Result<usize> {
    let channels_per_row = width / CHANNELS_PER_ROW_UNIT;
    let total_chunks = n_rows as usize * channels_per_row;
    let start = cursor.position();

    for _ in 0..total_chunks {
        decode_chunk(cursor, width, legacy_v0, strict, pixels)?;
    }

    Ok(cursor.position() - start)
}

fn decode_chunk(
    cursor: &mut WordCursor,
    width: usize,
    legacy_v0: bool,
    strict: bool,
    pixels: &mut [u16],
) -> Result<()> {
    let chunk_start = cursor.position();
    let header = cursor.read()?;

    let wire_channel = (header & 0xF) as usize;
    let row = (header >> 4) & 0x7FF;
    let bpp = (header >> 16) & 0xF;
    let pixel_count = (header >> 20) & 0xFF;
    let tag = (header >> 30) & 0x3;

    if tag != 0b10 {
        log::debug!("chunk header at word {chunk_start}: unexpected tag {tag:#04b}");
    }
    if bpp != 10 {
        if strict {
            return Err(DecodeError::corrupt(chunk_start, format!("chunk bpp {bpp} != 10")));
        }
        log::warn!("chunk header at word {chunk_start}: bpp {bpp} != 10");
    }

    let physical_channel = CHANNEL_ORDER[wire_channel] as usize;
    let mut base = row as usize * width + physical_channel * CHANNELS_PER_ROW_UNIT;

    if base + CHANNELS_PER_ROW_UNIT > pixels.len() {
        return Err(DecodeError::corrupt(
            chunk_start,
            format!("chunk row {row} out of range for the configured frame buffer"),
        ));
    }

    let missing_first_pixel = row < 2 && pixel_count == 127;
    if missing_first_pixel {
        pixels[base] = 0;
        base += 1;
    } else if pixel_count != 128 {
        if strict {
            return Err(DecodeError::corrupt(
                chunk_start,
                format!("chunk pixel count {pixel_count} != 128"),
            ));
        }
        log::warn!("chunk header at word {chunk_start}: pixel count {pixel_count} != 128");
    }

    let data_words = cursor.read_slice(CHUNK_DATA_WORDS)?;
    let mut samples = [0u16; CHUNK_DATA_WORDS * 3];
    unpack_words(data_words, &mut samples);
    pixels[base..base + samples.len()].copy_from_slice(&samples);
    base += samples.len();

    let footer_word = resolve_footer_word(cursor, chunk_start, legacy_v0)?;
    let footer_tag = (footer_word >> 30) & 0x3;
    if footer_tag != 0b11 {
        log::debug!("chunk footer at word {chunk_start}: unexpected tag {footer_tag:#04b}");
    }

    let ppw = (pixel_count >> 6).min(2);
    for j in 0..ppw {
        let shift = 10 * (ppw - j);
        pixels[base] = ((footer_word >> shift) & 0x3FF) as u16;
        base += 1;
    }

    Ok(())
}

/// Reads the chunk footer word, applying the legacy v0 resynchronisation
/// heuristic (preserved for bug-compatibility, see spec §7) if its low ten
/// bits don't carry the expected `0x55` tag.
fn resolve_footer_word(cursor: &mut WordCursor, chunk_start: usize, legacy_v0: bool) -> Result<u32> {
    let word = cursor.read()?;
    if (word & 0x3FF) == FOOTER_TAG_LOW10 {
        return Ok(word);
    }

    if !legacy_v0 {
        return Err(DecodeError::corrupt(
            chunk_start,
            "chunk footer magic mismatch",
        ));
    }

    log::warn!("chunk footer at word {chunk_start}: magic mismatch, scanning for resync");
    for _ in 0..FOOTER_RESYNC_SCAN_LIMIT {
        let candidate = cursor.read()?;
        if (candidate & 0x3FF) == FOOTER_TAG_LOW10 {
            return Ok(candidate);
        }
    }

    Err(DecodeError::corrupt(
        chunk_start,
        "chunk footer magic mismatch (resync exhausted)",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a complete 44-word chunk: header, 42 data words encoding
    /// `data_samples` (exactly 126 values), and a footer word encoding
    /// `footer_extra` (0, 1 or 2 trailing samples per `pixels`'s `ppw`).
    fn chunk_words(
        wire_channel: u32,
        row: u32,
        pixels: u32,
        data_samples: &[u16; CHUNK_DATA_WORDS * 3],
        footer_extra: &[u16],
    ) -> Vec<u32> {
        let header = (0b10 << 30) | (10 << 16) | (pixels << 20) | (row << 4) | wire_channel;
        let mut words = vec![header];
        for triple in data_samples.chunks(3) {
            words.push((0b11 << 30) | ((triple[0] as u32) << 20) | ((triple[1] as u32) << 10) | triple[2] as u32);
        }

        let ppw = footer_extra.len() as u32;
        let mut footer = (0b11u32 << 30) | FOOTER_TAG_LOW10;
        for (j, &extra) in footer_extra.iter().enumerate() {
            footer |= (extra as u32) << (10 * (ppw - j as u32));
        }
        words.push(footer);
        words
    }

    #[test]
    fn scalar_unpack_matches_bit_layout() {
        let word = (0x3FFu32 << 20) | (0x001 << 10) | 0x000;
        assert_eq!(unpack_scalar(word), [0x3FF, 0x001, 0x000]);
    }

    #[test]
    fn single_chunk_writes_128_samples() {
        let mut data_samples = [0u16; CHUNK_DATA_WORDS * 3];
        for (i, s) in data_samples.iter_mut().enumerate() {
            *s = i as u16;
        }
        let footer_extra = [126u16, 127u16];
        let words = chunk_words(0, 5, 128, &data_samples, &footer_extra);
        let mut cursor = WordCursor::new(&words);
        let width = 2048;
        let mut pixels = vec![0u16; width * 16];
        decode_chunk(&mut cursor, width, false, true, &mut pixels).unwrap();

        let physical = CHANNEL_ORDER[0] as usize;
        let base = 5 * width + physical * 128;
        let expected: Vec<u16> = (0..128).collect();
        assert_eq!(&pixels[base..base + 128], &expected[..]);
    }

    #[test]
    fn missing_first_pixel_is_zeroed() {
        let mut data_samples = [0u16; CHUNK_DATA_WORDS * 3];
        for (i, s) in data_samples.iter_mut().enumerate() {
            *s = i as u16 + 1;
        }
        let footer_extra = [127u16];
        let words = chunk_words(0, 0, 127, &data_samples, &footer_extra);
        let mut cursor = WordCursor::new(&words);
        let width = 2048;
        let mut pixels = vec![0xFFFFu16; width * 16];
        decode_chunk(&mut cursor, width, false, true, &mut pixels).unwrap();

        let physical = CHANNEL_ORDER[0] as usize;
        let base = physical * 128;
        assert_eq!(pixels[base], 0);
        assert_eq!(pixels[base + 1], 1);
        assert_eq!(pixels[base + 127], 127);
    }

    #[test]
    fn legacy_resync_skips_misplaced_footer() {
        let data_samples = [0u16; CHUNK_DATA_WORDS * 3];
        let mut words = chunk_words(0, 0, 128, &data_samples, &[0, 0]);
        let footer_idx = words.len() - 1;
        words.insert(footer_idx, 0b11 << 30); // spurious word before the real footer
        let mut cursor = WordCursor::new(&words);
        let width = 2048;
        let mut pixels = vec![0u16; width * 16];
        decode_chunk(&mut cursor, width, true, true, &mut pixels).unwrap();
    }

    #[cfg(all(target_arch = "x86_64", feature = "simd"))]
    #[test]
    fn simd_path_matches_scalar() {
        if !is_x86_feature_detected!("sse2") {
            return;
        }
        let words: [u32; 4] = [0x3FF00100, 0x15555515, 0x2AAAAAAA, 0x00000000];
        let mut scalar_out = [0u16; 12];
        unpack_words(&words, &mut scalar_out);

        let simd_out = unsafe { simd::unpack_quad(&words) };
        assert_eq!(scalar_out, simd_out);
    }
}
