// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Command-line argument definitions for the `ipedec` binary.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ipedec", about = "Decode IPE/UFO raw camera frame streams")]
pub struct Args {
    /// Number of rows per frame, overriding any value carried by the stream.
    #[arg(long = "num-rows", default_value_t = 1088)]
    pub num_rows: u32,

    /// Number of columns per row; must be a multiple of 128.
    #[arg(long = "num-columns", default_value_t = 2048)]
    pub num_columns: usize,

    /// Zero the pixel buffer before decoding each frame, instead of letting
    /// unwritten rows (beyond a short frame's `n_rows`) carry over stale data.
    #[arg(long = "clear-frame")]
    pub clear_frame: bool,

    /// Decode every frame but do not write any output file.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Enable debug-level logging.
    #[arg(long = "verbose")]
    pub verbose: bool,

    /// Print the measured average frame rate on exit.
    #[arg(long = "print-frame-rate")]
    pub print_frame_rate: bool,

    /// Print each frame's reported row count as it is decoded.
    #[arg(long = "print-num-rows")]
    pub print_num_rows: bool,

    /// Keep decoding subsequent frames after a corrupt or unsupported frame
    /// instead of stopping at the first error.
    #[arg(long = "continue")]
    pub keep_going: bool,

    /// Convert each decoded frame to 24-bit RGB via the bilinear debayer
    /// before writing it out.
    #[arg(long = "convert-bayer")]
    pub convert_bayer: bool,

    /// Promote soft framing mismatches (footer sentinels, tag bits) to hard
    /// `CorruptStream` errors.
    #[arg(long = "strict")]
    pub strict: bool,

    /// Input raw-frame-stream files.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}
