// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Decoder for the word-oriented raw frame stream produced by the IPE/UFO
//! family of scientific CMOS camera readout firmwares.
//!
//! The [cursor] module provides a bounds-checked, position-tracking reader
//! over a borrowed `&[u32]` word stream.
//!
//! The [framer] module resynchronises to frame boundaries and parses the
//! header/footer framing shared by all data-format versions.
//!
//! The [codec] module holds the per-data-format-version channel decoders
//! (`v0v4`, `v5`, `v6`) that turn a frame's payload words into a flat pixel
//! buffer.
//!
//! The [decoder] module ties the above together into [`decoder::IpeDecoder`],
//! the crate's primary entry point.
//!
//! The [deinterlace] and [debayer] modules provide the post-processing steps
//! commonly applied to a decoded frame (interlaced-sensor row recombination
//! and Bayer-to-RGB conversion, respectively). The [timer] module is a small
//! RAII frame-rate helper used by the CLI. The [cli] module and
//! `src/bin/ipedec.rs` implement the command-line frontend.

pub mod cli;
pub mod codec;
pub mod cursor;
pub mod debayer;
pub mod decoder;
pub mod deinterlace;
pub mod error;
pub mod framer;
pub mod metadata;
pub mod timer;
