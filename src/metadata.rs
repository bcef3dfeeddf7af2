// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Per-frame metadata extracted from a frame's header and footer.

/// Output wiring mode reported by the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// All 16 hardware channels are active (`output_mode == 0`).
    #[default]
    Channels16,
    /// Only 4 hardware channels are active (`output_mode == 2`).
    Channels4,
}

impl OutputMode {
    pub(crate) fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Channels16),
            2 => Some(Self::Channels4),
            _ => None,
        }
    }

    pub(crate) fn to_raw(self) -> u32 {
        match self {
            Self::Channels16 => 0,
            Self::Channels4 => 2,
        }
    }
}

/// An opaque firmware status word.
///
/// The on-the-wire layout of `status1`/`status2`/`status3` is not specified
/// beyond "FSM state, FIFO occupancy, lock flags" (see DESIGN.md); the three
/// accessors below expose that conventional layout without this crate
/// claiming to know the full firmware bit allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusWord(pub u32);

impl StatusWord {
    /// Bits 0..=7: the firmware's read-out FSM state.
    pub fn fsm_state(&self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Bits 8..=15: the output FIFO occupancy count.
    pub fn fifo_occupancy(&self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// Bit 16: set once the read-out clock has locked.
    pub fn is_locked(&self) -> bool {
        (self.0 >> 16) & 0x1 != 0
    }
}

impl From<u32> for StatusWord {
    fn from(raw: u32) -> Self {
        StatusWord(raw)
    }
}

/// Metadata produced alongside a successfully decoded frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameMetadata {
    pub frame_number: u32,
    pub time_stamp: u32,
    pub n_rows: u32,
    pub n_skipped_rows: u32,
    pub cmosis_start_address: u32,
    pub output_mode: OutputMode,
    pub adc_resolution: u8,
    pub status1: StatusWord,
    pub status2: StatusWord,
    pub status3: StatusWord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_word_accessors() {
        let s = StatusWord(0x0001_32_7F);
        assert_eq!(s.fsm_state(), 0x7F);
        assert_eq!(s.fifo_occupancy(), 0x32);
        assert!(s.is_locked());

        let s = StatusWord(0x0000_0000);
        assert!(!s.is_locked());
    }

    #[test]
    fn output_mode_round_trips() {
        assert_eq!(OutputMode::from_raw(0), Some(OutputMode::Channels16));
        assert_eq!(OutputMode::from_raw(2), Some(OutputMode::Channels4));
        assert_eq!(OutputMode::from_raw(1), None);
        assert_eq!(OutputMode::Channels16.to_raw(), 0);
        assert_eq!(OutputMode::Channels4.to_raw(), 2);
    }
}
