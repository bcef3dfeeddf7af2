// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Channel decoder for data-format version 5.
//!
//! Chunks are eight words: a header word, one zero-filled word, and a
//! six-word pixel group. The header carries the write base index directly
//! (no channel de-permutation table is involved, unlike v0/v4); the pixel
//! group is interpreted differently depending on whether the frame is
//! wired for 16 or 4 output channels.

use crate::cursor::WordCursor;
use crate::error::{DecodeError, Result};
use crate::metadata::OutputMode;

const FOOTER_MARKER: u32 = 0x0AAAAAAA;
const HEADER_GROUP_WORDS: usize = 2;
const PIXEL_GROUP_WORDS: usize = 6;
const PIXELS_PER_CHANNEL: usize = 128;

/// Bank-control magics for the 4-channel mode: `0xE0` advances the running
/// bank offset, `0xC0` resets it. Both also apply in 16-channel mode, where
/// `0xC0` simply marks a chunk with no pixels.
const MAGIC_BANK_ADVANCE: u32 = 0xE0;
const MAGIC_BANK_RESET: u32 = 0xC0;

struct ChunkHeader {
    pixel_number: u32,
    row_number: u32,
    magic: u32,
}

fn parse_header(word: u32) -> ChunkHeader {
    ChunkHeader {
        pixel_number: word & 0xFF,
        row_number: (word >> 8) & 0xFFF,
        magic: (word >> 24) & 0xFF,
    }
}

/// Decodes the channel-chunk payload of one v5 frame. Returns the number of
/// words consumed, not including the terminating `0x0AAAAAAA` footer marker.
pub fn decode(
    cursor: &mut WordCursor,
    width: usize,
    output_mode: OutputMode,
    _strict: bool,
    pixels: &mut [u16],
) -> Result<usize> {
    let start = cursor.position();
    let mut bank_offset: u32 = 0;

    loop {
        let chunk_start = cursor.position();
        match cursor.peek(0) {
            Some(FOOTER_MARKER) => break,
            Some(_) => {}
            None => return Err(DecodeError::corrupt(chunk_start, "truncated v5 payload")),
        }

        let header_word = cursor.read()?;
        let header = parse_header(header_word);
        cursor.advance(HEADER_GROUP_WORDS - 1);
        let group = cursor.read_slice(PIXEL_GROUP_WORDS)?;
        let base = header.row_number as usize * width + header.pixel_number as usize;

        match output_mode {
            OutputMode::Channels16 => decode_chunk_16(header.magic, group, base, chunk_start, pixels)?,
            OutputMode::Channels4 => {
                decode_chunk_4(header.magic, group, base, chunk_start, &mut bank_offset, pixels)?
            }
        }
    }

    Ok(cursor.position() - start)
}

/// Writes `sample` to `pixels[base + channel * PIXELS_PER_CHANNEL]`, failing
/// with `CorruptStream` instead of panicking if the decoded row/channel
/// combination falls outside the caller-configured frame buffer.
fn write_sample(pixels: &mut [u16], base: usize, channel: usize, chunk_start: usize, sample: u16) -> Result<()> {
    let offset = channel
        .checked_mul(PIXELS_PER_CHANNEL)
        .and_then(|c| base.checked_add(c))
        .filter(|&idx| idx < pixels.len());
    match offset {
        Some(idx) => {
            pixels[idx] = sample;
            Ok(())
        }
        None => Err(DecodeError::corrupt(
            chunk_start,
            "chunk row/channel out of range for the configured frame buffer",
        )),
    }
}

fn decode_chunk_16(magic: u32, w: &[u32], base: usize, chunk_start: usize, pixels: &mut [u16]) -> Result<()> {
    if magic == MAGIC_BANK_RESET {
        return Ok(());
    }

    let samples: [(usize, u16); 16] = [
        (15, ((w[0] >> 20) & 0x3FF) as u16),
        (13, ((w[0] >> 8) & 0x3FF) as u16),
        (14, ((((w[0] & 0xFF) << 4) | (w[1] >> 28)) & 0x3FF) as u16),
        (12, ((w[1] >> 16) & 0x3FF) as u16),
        (10, ((w[1] >> 4) & 0x3FF) as u16),
        (8, ((((w[1] & 0x3) << 8) | (w[2] >> 24)) & 0x3FF) as u16),
        (11, ((w[2] >> 12) & 0x3FF) as u16),
        (7, (w[2] & 0x3FF) as u16),
        (9, ((w[3] >> 20) & 0x3FF) as u16),
        (6, ((w[3] >> 8) & 0x3FF) as u16),
        (5, ((((w[3] & 0xFF) << 4) | (w[4] >> 28)) & 0x3FF) as u16),
        (2, ((w[4] >> 16) & 0x3FF) as u16),
        (4, ((w[4] >> 4) & 0x3FF) as u16),
        (3, ((((w[4] & 0x3) << 8) | (w[5] >> 24)) & 0x3FF) as u16),
        (0, ((w[5] >> 12) & 0x3FF) as u16),
        (1, (w[5] & 0x3FF) as u16),
    ];

    for (channel, sample) in samples {
        write_sample(pixels, base, channel, chunk_start, sample)?;
    }
    Ok(())
}

fn decode_chunk_4(
    magic: u32,
    w: &[u32],
    base: usize,
    chunk_start: usize,
    bank_offset: &mut u32,
    pixels: &mut [u16],
) -> Result<()> {
    if magic == MAGIC_BANK_ADVANCE || magic == MAGIC_BANK_RESET {
        if magic == MAGIC_BANK_RESET {
            *bank_offset = 0;
        } else {
            *bank_offset += 1;
        }
        return Ok(());
    }

    let off = *bank_offset as usize;
    let samples: [(usize, u16); 4] = [
        (0 + off, ((w[5] >> 12) & 0xFFF) as u16),
        (4 + off, ((w[4] >> 4) & 0xFFF) as u16),
        (8 + off, ((((w[1] & 0xF) << 8) | (w[2] >> 24)) & 0xFFF) as u16),
        (12 + off, ((w[1] >> 16) & 0xFFF) as u16),
    ];

    for (channel, sample) in samples {
        write_sample(pixels, base, channel, chunk_start, sample)?;
    }
    Ok(())
}
