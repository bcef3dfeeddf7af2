// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Error taxonomy for the IPE/UFO raw-frame decoder.

use thiserror::Error;

/// Error returned by [`crate::decoder::IpeDecoder`] operations.
///
/// Mirrors the five-kind taxonomy of the on-the-wire protocol: a clean
/// end-of-stream, a structural violation of the framing, an unsupported
/// header/output-mode combination, and the two resource-exhaustion cases a
/// caller-driven allocation can hit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The cursor is at or past the last word of the stream; no further
    /// frame-start marker was found.
    #[error("end of stream")]
    EndOfStream,

    /// A structural violation of the framing: a missing sync marker, a
    /// mismatched sentinel, an illegal field value, or a truncated payload.
    #[error("corrupt stream at word {cursor_pos}: {reason}")]
    CorruptStream {
        /// Word position (from the start of the stream) where the
        /// violation was detected.
        cursor_pos: usize,
        /// Human-readable description of the violation.
        reason: String,
    },

    /// The header parsed cleanly but names a header version, data-format
    /// version, or output mode this decoder does not implement.
    #[error("unsupported mode: {0}")]
    UnsupportedMode(String),

    /// A pixel buffer was requested to be allocated and the allocation
    /// failed.
    #[error("out of memory")]
    OutOfMemory,

    /// The caller-supplied output handle carried no buffer and none could be
    /// allocated (allocation was not requested).
    #[error("no output buffer supplied")]
    NullOutput,

    /// [`crate::decoder::IpeDecoder::new`] was called with a `width` that
    /// is not a multiple of 128. Distinct from the five-kind decode-time
    /// taxonomy above: this is a constructor precondition, not something
    /// that can arise mid-stream.
    #[error("width {width} is not a multiple of 128")]
    InvalidWidth { width: usize },
}

impl DecodeError {
    pub(crate) fn corrupt(cursor_pos: usize, reason: impl Into<String>) -> Self {
        DecodeError::CorruptStream { cursor_pos, reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
