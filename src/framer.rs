// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Frame-start synchronisation, versioned header parsing, footer parsing
//! and trailing-fill scanning.
//!
//! The legacy v0/v4 headers and the structured v5/v6 headers share their
//! first five words bit-for-bit when the pre-header's version field is
//! zero (the literal word `0x51111111`), so the dispatch between "legacy"
//! and "structured" happens lazily: [`parse_header`] reads the shared
//! magic run first and only then decides, from the sixth word, which
//! concrete layout it is looking at.

use crate::cursor::WordCursor;
use crate::error::{DecodeError, Result};
use crate::metadata::OutputMode;

const FRAME_START_MASK: u32 = 0xFFFFFFF0;
const FRAME_START_VALUE: u32 = 0x51111110;
const LEGACY_MAGIC_0: u32 = 0x51111111;
const MAGIC_2: u32 = 0x52222222;
const MAGIC_3: u32 = 0x53333333;
const MAGIC_4: u32 = 0x54444444;
const MAGIC_5: u32 = 0x55555555;
const LEGACY_V0_MAGIC_6: u32 = 0x56666666;

const FOOTER_MAGIC: u32 = 0x0AAAAAAA;
const FOOTER_TRAILER_ZERO: u32 = 0x00000000;
const FOOTER_TRAILER_END: u32 = 0x01111111;

const FILL_TOKENS: [u32; 5] = [0x89ABCDEF, 0x01234567, 0x00000000, 0xDEADBEEF, 0x98BADCFE];

/// The result of parsing a versioned frame header: the fields every
/// channel decoder and the metadata record need, independent of which
/// concrete wire format produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeader {
    pub dataformat_version: u8,
    pub output_mode: OutputMode,
    pub adc_resolution: u8,
    pub frame_number: u32,
    pub time_stamp: u32,
    pub n_rows: Option<u32>,
    pub n_skipped_rows: u32,
    pub cmosis_start_address: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub status1: u32,
    pub status2: u32,
    pub status3: u32,
}

/// Scans forward from the cursor until a word matching the frame-start
/// pattern `(w & 0xFFFFFFF0) == 0x51111110` is found, discarding every word
/// in between. Leaves the cursor positioned *at* the matching word. Returns
/// [`DecodeError::EndOfStream`] if the stream runs out first.
pub fn sync_to_frame_start(cursor: &mut WordCursor) -> Result<()> {
    loop {
        match cursor.peek(0) {
            Some(w) if (w & FRAME_START_MASK) == FRAME_START_VALUE => return Ok(()),
            Some(_) => cursor.advance(1),
            None => return Err(DecodeError::EndOfStream),
        }
    }
}

fn expect_magic(cursor: &mut WordCursor, expected: u32, what: &str) -> Result<()> {
    let pos = cursor.position();
    let word = cursor.read()?;
    if word != expected {
        return Err(DecodeError::corrupt(
            pos,
            format!("expected {what} magic {expected:#010x}, found {word:#010x}"),
        ));
    }
    Ok(())
}

/// Parses one frame header, dispatching between the legacy v0/v4 layouts
/// and the structured v5/v6 layouts. `configured_height` is used as the
/// row count for formats (v0) that do not carry `n_rows` themselves.
pub fn parse_header(cursor: &mut WordCursor) -> Result<ParsedHeader> {
    let pre_header_pos = cursor.position();
    let pre_header_word = cursor.peek(0).ok_or(DecodeError::EndOfStream)?;

    if pre_header_word == LEGACY_MAGIC_0 {
        cursor.advance(1);
        return parse_legacy_header(cursor);
    }

    let tag = (pre_header_word >> 28) & 0xF;
    let ones = (pre_header_word >> 4) & 0xFF_FFFF;
    if tag != 0x5 || ones != 0x11_1111 {
        return Err(DecodeError::corrupt(
            pre_header_pos,
            format!("malformed pre-header word {pre_header_word:#010x}"),
        ));
    }
    cursor.advance(1);

    let header_version_minus_5 = (pre_header_word >> 1) & 0x7;
    let header_version = header_version_minus_5 as u8 + 5;

    match header_version {
        5 => parse_structured_v5(cursor),
        6 => parse_structured_v6(cursor),
        other => Err(DecodeError::UnsupportedMode(format!(
            "header version {other}"
        ))),
    }
}

/// Parses the shared packed-word trio used by both the v4 legacy path and
/// the structured v5 path (see spec's header_v5_t-derived field layout).
fn parse_v4v5_packed_words(cursor: &mut WordCursor) -> Result<ParsedHeader> {
    let pos_a = cursor.position();
    let word_a = cursor.read()?;
    if (word_a >> 28) != 0x5 {
        return Err(DecodeError::corrupt(pos_a, "missing tag in cmosis/row-count word"));
    }
    let cmosis_start_address = (word_a >> 21) & 0x1FF;
    let n_skipped_rows = (word_a >> 15) & 0x3F;
    let n_rows = word_a & 0x7FF;

    let frame_number = cursor.read()? & 0x1FF_FFFF;

    let pos_c = cursor.position();
    let word_c = cursor.read()?;
    if (word_c >> 28) != 0x5 {
        return Err(DecodeError::corrupt(pos_c, "missing tag in timestamp word"));
    }
    let time_stamp = word_c & 0xFF_FFFF;
    let output_mode_raw = (word_c >> 24) & 0x3;
    let adc_resolution = ((word_c >> 26) & 0x3) as u8;

    let output_mode = OutputMode::from_raw(output_mode_raw)
        .ok_or_else(|| DecodeError::UnsupportedMode(format!("output mode {output_mode_raw}")))?;

    Ok(ParsedHeader {
        dataformat_version: 0, // overwritten by caller
        output_mode,
        adc_resolution,
        frame_number,
        time_stamp,
        n_rows: Some(n_rows),
        n_skipped_rows,
        cmosis_start_address,
    })
}

fn parse_legacy_header(cursor: &mut WordCursor) -> Result<ParsedHeader> {
    expect_magic(cursor, MAGIC_2, "legacy header")?;
    expect_magic(cursor, MAGIC_3, "legacy header")?;
    expect_magic(cursor, MAGIC_4, "legacy header")?;
    expect_magic(cursor, MAGIC_5, "legacy header")?;

    if cursor.peek(0) == Some(LEGACY_V0_MAGIC_6) {
        cursor.advance(1);
        let pos_fn = cursor.position();
        let frame_word = cursor.read()?;
        if (frame_word >> 28) != 0x5 {
            return Err(DecodeError::corrupt(pos_fn, "missing tag in v0 frame-number word"));
        }
        let pos_ts = cursor.position();
        let time_word = cursor.read()?;
        if (time_word >> 28) != 0x5 {
            return Err(DecodeError::corrupt(pos_ts, "missing tag in v0 time-stamp word"));
        }

        return Ok(ParsedHeader {
            dataformat_version: 0,
            output_mode: OutputMode::Channels16,
            adc_resolution: 0, // undefined for v0, see Open Question 2
            frame_number: frame_word & 0x0FFF_FFFF,
            time_stamp: time_word & 0x0FFF_FFFF,
            n_rows: None,
            n_skipped_rows: 0,
            cmosis_start_address: 0,
        });
    }

    let mut header = parse_v4v5_packed_words(cursor)?;
    header.dataformat_version = 4;
    Ok(header)
}

fn parse_structured_v5(cursor: &mut WordCursor) -> Result<ParsedHeader> {
    expect_magic(cursor, MAGIC_2, "v5 header")?;
    expect_magic(cursor, MAGIC_3, "v5 header")?;
    expect_magic(cursor, MAGIC_4, "v5 header")?;
    expect_magic(cursor, MAGIC_5, "v5 header")?;

    let mut header = parse_v4v5_packed_words(cursor)?;
    header.dataformat_version = 5;
    Ok(header)
}

/// Parses the v6 structured header. Unlike the prose summary's "three
/// packed words", the camera firmware's own header layout (see
/// `header_v6_t` in the upstream C sources) packs these fields into four
/// 32-bit words, each ending in its own `0x5` tag nibble; this parser
/// follows that layout (see DESIGN.md).
fn parse_structured_v6(cursor: &mut WordCursor) -> Result<ParsedHeader> {
    expect_magic(cursor, MAGIC_2, "v6 header")?;
    expect_magic(cursor, MAGIC_3, "v6 header")?;
    expect_magic(cursor, MAGIC_4, "v6 header")?;

    let pos_a = cursor.position();
    let word_a = cursor.read()?;
    let tag_a = (word_a >> 24) & 0xF;
    if tag_a != 0x5 {
        return Err(DecodeError::corrupt(pos_a, "missing tag in v6 cmosis/mode word"));
    }
    let cmosis_start_address = word_a & 0xFFFF;
    let output_mode_raw = (word_a >> 16) & 0xF;
    let adc_resolution = ((word_a >> 20) & 0xF) as u8;

    let pos_b = cursor.position();
    let word_b = cursor.read()?;
    if (word_b >> 28) != 0x5 {
        return Err(DecodeError::corrupt(pos_b, "missing tag in v6 row-count word"));
    }
    let n_rows = word_b & 0xFFFF;
    let n_skipped_rows = (word_b >> 16) & 0xFFF;

    let pos_c = cursor.position();
    let word_c = cursor.read()?;
    if (word_c >> 28) != 0x5 {
        return Err(DecodeError::corrupt(pos_c, "missing tag in v6 frame-number word"));
    }
    let frame_number = word_c & 0xFF_FFFF;
    let dataformat_version = ((word_c >> 24) & 0xF) as u8;

    let pos_d = cursor.position();
    let word_d = cursor.read()?;
    if (word_d >> 28) != 0x5 {
        return Err(DecodeError::corrupt(pos_d, "missing tag in v6 timestamp word"));
    }
    let time_stamp = word_d & 0x0FFF_FFFF;

    let output_mode = OutputMode::from_raw(output_mode_raw & 0x3)
        .ok_or_else(|| DecodeError::UnsupportedMode(format!("output mode {output_mode_raw}")))?;

    Ok(ParsedHeader {
        dataformat_version,
        output_mode,
        adc_resolution,
        frame_number,
        time_stamp,
        n_rows: Some(n_rows),
        n_skipped_rows,
        cmosis_start_address,
    })
}

/// Parses the eight-word frame footer. Sentinel mismatches are reported via
/// `log::warn!` and, in `strict` mode, promoted to `CorruptStream`; in
/// lenient mode an already-extracted pixel array is still returned intact
/// by the caller.
pub fn parse_footer(cursor: &mut WordCursor, strict: bool) -> Result<Footer> {
    let check = |cursor: &mut WordCursor, expected: u32, what: &str, strict: bool| -> Result<()> {
        let pos = cursor.position();
        let word = cursor.read()?;
        if word != expected {
            let msg = format!("footer {what} mismatch: expected {expected:#010x}, found {word:#010x}");
            if strict {
                return Err(DecodeError::corrupt(pos, msg));
            }
            log::warn!("{msg}");
        }
        Ok(())
    };

    check(cursor, FOOTER_MAGIC, "magic", strict)?;
    let status1 = cursor.read()?;
    let status2 = cursor.read()?;
    let status3 = cursor.read()?;
    cursor.advance(2); // reserved, ignored
    check(cursor, FOOTER_TRAILER_ZERO, "trailer zero", strict)?;
    check(cursor, FOOTER_TRAILER_END, "trailer end", strict)?;

    Ok(Footer { status1, status2, status3 })
}

/// Consumes trailing fill after a footer, if present: an optional
/// `0x00000000, 0x01111111` (or `0x00000000, 0x00000000`) pair followed by
/// any run of the known fill tokens.
pub fn scan_fill(cursor: &mut WordCursor) {
    let (Some(first), Some(second)) = (cursor.peek(0), cursor.peek(1)) else {
        return;
    };
    if first != 0x0 || (second != FOOTER_TRAILER_END && second != 0x0) {
        return;
    }
    cursor.advance(2);

    while let Some(w) = cursor.peek(0) {
        if FILL_TOKENS.contains(&w) {
            cursor.advance(1);
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_skips_garbage() {
        let words = [0x1u32, 0x2, 0x51111115, 0xDEAD];
        let mut cursor = WordCursor::new(&words);
        sync_to_frame_start(&mut cursor).unwrap();
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn sync_reports_end_of_stream() {
        let words = [0x1u32, 0x2, 0x3];
        let mut cursor = WordCursor::new(&words);
        assert_eq!(sync_to_frame_start(&mut cursor), Err(DecodeError::EndOfStream));
    }

    #[test]
    fn legacy_v0_header_parses() {
        let words = [
            LEGACY_MAGIC_0,
            MAGIC_2,
            MAGIC_3,
            MAGIC_4,
            MAGIC_5,
            LEGACY_V0_MAGIC_6,
            (0x5u32 << 28) | 42,
            (0x5u32 << 28) | 7,
        ];
        let mut cursor = WordCursor::new(&words);
        let header = parse_header(&mut cursor).unwrap();
        assert_eq!(header.dataformat_version, 0);
        assert_eq!(header.frame_number, 42);
        assert_eq!(header.time_stamp, 7);
        assert_eq!(header.n_rows, None);
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn legacy_v4_header_parses() {
        // The cmosis_start_address window (bits 21..=29) overlaps the tag
        // nibble's low two bits (bits 28..=29 == 0b01 for tag 0x5), so a
        // 7-bit payload of 100 in bits 21..=27 reads back as 100 + 128.
        let word_a = (0x5u32 << 28) | (100 << 21) | (3 << 15) | 2047;
        let word_c = (0x5u32 << 28) | (0 << 26) | (0 << 24) | 12345;
        let words = [
            LEGACY_MAGIC_0,
            MAGIC_2,
            MAGIC_3,
            MAGIC_4,
            MAGIC_5,
            word_a,
            99,
            word_c,
        ];
        let mut cursor = WordCursor::new(&words);
        let header = parse_header(&mut cursor).unwrap();
        assert_eq!(header.dataformat_version, 4);
        assert_eq!(header.n_rows, Some(2047));
        assert_eq!(header.n_skipped_rows, 3);
        assert_eq!(header.cmosis_start_address, 228);
        assert_eq!(header.frame_number, 99);
        assert_eq!(header.time_stamp, 12345);
        assert_eq!(header.output_mode, OutputMode::Channels16);
    }

    #[test]
    fn structured_v6_header_parses() {
        let pre_header = 0x5111_1111 & !0xE | (1 << 1); // version_minus_5 = 1 -> header_version 6
        let word_a = (0x5u32 << 24) | (1 << 20) | (0 << 16) | 640;
        let word_b = (0x5u32 << 28) | (12 << 16) | 1088;
        let word_c = (0x5u32 << 28) | (6 << 24) | 10;
        let word_d = (0x5u32 << 28) | 999;
        let words = [pre_header, MAGIC_2, MAGIC_3, MAGIC_4, word_a, word_b, word_c, word_d];
        let mut cursor = WordCursor::new(&words);
        let header = parse_header(&mut cursor).unwrap();
        assert_eq!(header.dataformat_version, 6);
        assert_eq!(header.cmosis_start_address, 640);
        assert_eq!(header.n_rows, Some(1088));
        assert_eq!(header.n_skipped_rows, 12);
        assert_eq!(header.frame_number, 10);
        assert_eq!(header.time_stamp, 999);
    }

    #[test]
    fn footer_parses_status_words() {
        let words = [FOOTER_MAGIC, 0x1111, 0x2222, 0x3333, 0, 0, FOOTER_TRAILER_ZERO, FOOTER_TRAILER_END];
        let mut cursor = WordCursor::new(&words);
        let footer = parse_footer(&mut cursor, true).unwrap();
        assert_eq!(footer.status1, 0x1111);
        assert_eq!(footer.status2, 0x2222);
        assert_eq!(footer.status3, 0x3333);
    }

    #[test]
    fn footer_mismatch_is_soft_by_default() {
        let words = [0xBADu32, 0x1111, 0x2222, 0x3333, 0, 0, FOOTER_TRAILER_ZERO, FOOTER_TRAILER_END];
        let mut cursor = WordCursor::new(&words);
        assert!(parse_footer(&mut cursor, false).is_ok());

        let mut cursor = WordCursor::new(&words);
        assert!(parse_footer(&mut cursor, true).is_err());
    }

    #[test]
    fn fill_scan_consumes_known_tokens() {
        let words = [0x0u32, FOOTER_TRAILER_END, 0x89ABCDEF, 0xDEADBEEF, 0x5111_1115];
        let mut cursor = WordCursor::new(&words);
        scan_fill(&mut cursor);
        assert_eq!(cursor.position(), 4);
    }
}
