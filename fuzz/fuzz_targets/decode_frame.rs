#![no_main]

use ipe_decode::decoder::IpeDecoder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let words: Vec<u32> = data
        .chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .collect();

    let Ok(mut decoder) = IpeDecoder::new(1088, 2048, &words) else {
        return;
    };

    let mut pixels = Vec::new();
    for _ in 0..64 {
        if decoder.next_frame(&mut pixels).is_err() && decoder.remaining() == 0 {
            break;
        }
    }
});
