// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The top-level frame-by-frame decoder.

use crate::codec::{v0v4, v5, v6};
use crate::cursor::WordCursor;
use crate::error::{DecodeError, Result};
use crate::framer;
use crate::metadata::FrameMetadata;

/// The smallest word count that could possibly hold a frame (an eight-word
/// header plus an eight-word footer, disregarding any payload). A stream
/// with fewer words than this left can never resynchronise to a complete
/// frame, so it is reported as `CorruptStream` rather than scanned for a
/// marker it cannot follow through on (spec boundary case: "Stream shorter
/// than 16 words"), distinct from an empty stream's clean `EndOfStream`.
const MIN_FRAME_WORDS: usize = 16;

/// Internal state used only for a `debug_assert!`-backed sanity check and
/// `log::trace!` transition logging (see spec §4.6); callers only ever
/// observe the result of a whole [`IpeDecoder::next_frame`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderFsm {
    AtStart,
    InHeader,
    InPayload,
    InFooter,
}

/// A pull-mode decoder over a borrowed word stream.
///
/// Single-threaded and synchronous: every method call runs to completion
/// without suspending. The backing `words` slice must outlive the decoder.
pub struct IpeDecoder<'a> {
    height: u32,
    width: usize,
    cursor: WordCursor<'a>,
    strict: bool,
    state: DecoderFsm,
}

static_assertions::assert_impl_all!(IpeDecoder<'static>: Send);

impl<'a> IpeDecoder<'a> {
    /// Creates a decoder bound to `words`, configured for `height` rows of
    /// `width` pixels. Fails with [`DecodeError::InvalidWidth`] unless
    /// `width % 128 == 0`.
    pub fn new(height: u32, width: usize, words: &'a [u32]) -> Result<Self> {
        if width % 128 != 0 {
            return Err(DecodeError::InvalidWidth { width });
        }
        Ok(Self {
            height,
            width,
            cursor: WordCursor::new(words),
            strict: false,
            state: DecoderFsm::AtStart,
        })
    }

    /// Toggles strict validation (footer-sentinel and soft-field
    /// mismatches become `CorruptStream` instead of being logged and
    /// tolerated). Off by default.
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Current read position, in words from the start of the stream.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Words remaining to be read.
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Resynchronises to the next frame-start marker and decodes that
    /// frame. `pixels` is resized to `height * width` on first use and then
    /// reused across calls, matching the caller-supplied/allocate-on-first-
    /// demand duality in spec §5 without a nullable out-parameter.
    pub fn next_frame(&mut self, pixels: &mut Vec<u16>) -> Result<FrameMetadata> {
        self.ensure_pixel_buffer(pixels);
        self.check_minimum_length()?;
        framer::sync_to_frame_start(&mut self.cursor)?;
        self.decode_one_frame(pixels)
    }

    /// Decodes exactly one frame starting at the cursor's current word,
    /// without resynchronising first. Returns the number of words consumed.
    pub fn decode_frame(&mut self, pixels: &mut Vec<u16>) -> Result<usize> {
        self.ensure_pixel_buffer(pixels);
        self.check_minimum_length()?;
        let start = self.cursor.position();
        self.decode_one_frame(pixels)?;
        Ok(self.cursor.position() - start)
    }

    /// Distinguishes a clean end-of-stream from a stream too short to ever
    /// contain a complete frame, per spec boundary cases "Empty stream" vs
    /// "Stream shorter than 16 words". Advances the cursor by one word in
    /// the latter case, preserving the forward-progress guarantee that
    /// every erroring call makes.
    fn check_minimum_length(&mut self) -> Result<()> {
        let remaining = self.cursor.remaining();
        if remaining == 0 {
            return Err(DecodeError::EndOfStream);
        }
        if remaining < MIN_FRAME_WORDS {
            let pos = self.cursor.position();
            self.cursor.advance(1);
            return Err(DecodeError::corrupt(
                pos,
                format!("only {remaining} word(s) left, short of the minimum {MIN_FRAME_WORDS}-word frame"),
            ));
        }
        Ok(())
    }

    fn ensure_pixel_buffer(&self, pixels: &mut Vec<u16>) {
        let needed = self.height as usize * self.width;
        if pixels.len() != needed {
            pixels.resize(needed, 0);
        }
    }

    fn decode_one_frame(&mut self, pixels: &mut [u16]) -> Result<FrameMetadata> {
        let frame_start = self.cursor.position();
        debug_assert_eq!(self.state, DecoderFsm::AtStart);
        self.state = DecoderFsm::InHeader;
        log::trace!("AtStart -> InHeader at word {frame_start}");

        let header = match framer::parse_header(&mut self.cursor) {
            Ok(header) => header,
            Err(err) => return self.abort(frame_start, err),
        };

        self.state = DecoderFsm::InPayload;
        log::trace!("InHeader -> InPayload: dataformat_version={}", header.dataformat_version);

        let n_rows = header.n_rows.unwrap_or(self.height);
        let payload = match header.dataformat_version {
            0 => v0v4::decode(&mut self.cursor, self.width, n_rows, true, self.strict, pixels),
            4 => v0v4::decode(&mut self.cursor, self.width, n_rows, false, self.strict, pixels),
            5 => v5::decode(&mut self.cursor, self.width, header.output_mode, self.strict, pixels),
            6 => v6::decode(&mut self.cursor, pixels),
            other => Err(DecodeError::UnsupportedMode(format!("data-format version {other}"))),
        };
        if let Err(err) = payload {
            return self.abort(frame_start, err);
        }

        self.state = DecoderFsm::InFooter;
        log::trace!("InPayload -> InFooter");

        let footer = match framer::parse_footer(&mut self.cursor, self.strict) {
            Ok(footer) => footer,
            Err(err) => return self.abort(frame_start, err),
        };
        framer::scan_fill(&mut self.cursor);

        self.state = DecoderFsm::AtStart;
        log::trace!("InFooter -> AtStart at word {}", self.cursor.position());

        Ok(FrameMetadata {
            frame_number: header.frame_number,
            time_stamp: header.time_stamp,
            n_rows,
            n_skipped_rows: header.n_skipped_rows,
            cmosis_start_address: header.cmosis_start_address,
            output_mode: header.output_mode,
            adc_resolution: header.adc_resolution,
            status1: footer.status1.into(),
            status2: footer.status2.into(),
            status3: footer.status3.into(),
        })
    }

    /// Returns to `AtStart`, guaranteeing forward progress by advancing at
    /// least one word past the frame that failed, then propagates `err`.
    fn abort(&mut self, frame_start: usize, err: DecodeError) -> Result<FrameMetadata> {
        self.state = DecoderFsm::AtStart;
        let min_pos = frame_start + 1;
        if self.cursor.position() < min_pos {
            self.cursor.seek_to(min_pos);
        }
        Err(err)
    }
}
