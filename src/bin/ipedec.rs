// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Thin CLI front-end over [`ipe_decode::decoder::IpeDecoder`].

use clap::Parser;
use ipe_decode::cli::Args;
use ipe_decode::debayer;
use ipe_decode::decoder::IpeDecoder;
use ipe_decode::timer::FrameTimer;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

fn words_from_bytes(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .collect()
}

fn write_frame(input: &Path, frame_index: u64, pixels: &[u16], args: &Args) -> std::io::Result<()> {
    if args.dry_run {
        return Ok(());
    }

    if args.convert_bayer {
        let rgb = debayer::bayer_to_rgb(pixels, args.num_columns, args.num_rows as usize)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        let path = input.with_extension(format!("{frame_index:06}.rgb"));
        fs::write(path, rgb)
    } else {
        let bytes: Vec<u8> = pixels.iter().flat_map(|s| s.to_le_bytes()).collect();
        let path = input.with_extension(format!("{frame_index:06}.raw"));
        fs::write(path, bytes)
    }
}

fn process_file(path: &Path, args: &Args) -> bool {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            log::error!("{}: {e}", path.display());
            return false;
        }
    };
    let words = words_from_bytes(&bytes);

    let mut decoder = match IpeDecoder::new(args.num_rows, args.num_columns, &words) {
        Ok(d) => d,
        Err(e) => {
            log::error!("{}: {e}", path.display());
            return false;
        }
    };
    decoder.set_strict(args.strict);

    let mut pixels = Vec::new();
    let mut timer = FrameTimer::new();
    let mut frame_index = 0u64;
    let mut ok = true;

    loop {
        if args.clear_frame {
            pixels.iter_mut().for_each(|p| *p = 0);
        }

        match decoder.next_frame(&mut pixels) {
            Ok(meta) => {
                timer.tick();
                if args.print_num_rows {
                    println!("{}: frame {frame_index} n_rows={}", path.display(), meta.n_rows);
                }
                if let Err(e) = write_frame(path, frame_index, &pixels, args) {
                    log::error!("{}: failed to write frame {frame_index}: {e}", path.display());
                    ok = false;
                    if !args.keep_going {
                        break;
                    }
                }
                frame_index += 1;
            }
            Err(ipe_decode::error::DecodeError::EndOfStream) => break,
            Err(e) => {
                log::error!("{}: frame {frame_index}: {e}", path.display());
                ok = false;
                if !args.keep_going {
                    break;
                }
                frame_index += 1;
            }
        }
    }

    if args.print_frame_rate {
        println!("{}: {:.2} fps over {frame_index} frames", path.display(), timer.frames_per_second());
    }

    ok
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    if args.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let mut all_ok = true;
    for path in &args.files {
        if !process_file(path, &args) {
            all_ok = false;
            if !args.keep_going {
                break;
            }
        }
    }

    if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
