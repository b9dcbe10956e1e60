//! Header flag byte.
//!
//! Bits 0-2 are boolean flags. Bits 5-7 hold the object record count (0-4).

use gridlink_codec::RunFormat;

use crate::object::MAX_OBJECTS;

/// Packet flags (1 byte).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PacketFlags(pub u8);

impl PacketFlags {
    pub const NONE: PacketFlags = PacketFlags(0);

    /// Run data uses 2-byte explicit runs; clear means 1-byte packed runs.
    pub const EXPLICIT_RUNS: u8 = 0b0000_0001;
    /// The run stream did not fit and was truncated.
    pub const OVERFLOW: u8 = 0b0000_0010;
    /// The body is a Huffman container (variable profile only).
    pub const ENTROPY_CODED: u8 = 0b0000_0100;

    const OBJECT_COUNT_SHIFT: u8 = 5;
    const OBJECT_COUNT_MASK: u8 = 0b1110_0000;

    #[inline]
    pub fn new(bits: u8) -> Self {
        PacketFlags(bits)
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn run_format(self) -> RunFormat {
        if self.0 & Self::EXPLICIT_RUNS != 0 {
            RunFormat::Explicit
        } else {
            RunFormat::Packed
        }
    }

    #[inline]
    pub fn is_overflow(self) -> bool {
        self.0 & Self::OVERFLOW != 0
    }

    #[inline]
    pub fn is_entropy_coded(self) -> bool {
        self.0 & Self::ENTROPY_CODED != 0
    }

    /// Declared number of object records, capped at [`MAX_OBJECTS`].
    #[inline]
    pub fn object_count(self) -> usize {
        usize::from((self.0 & Self::OBJECT_COUNT_MASK) >> Self::OBJECT_COUNT_SHIFT).min(MAX_OBJECTS)
    }

    #[inline]
    pub fn set_run_format(&mut self, format: RunFormat) {
        self.set(Self::EXPLICIT_RUNS, format == RunFormat::Explicit);
    }

    #[inline]
    pub fn set_overflow(&mut self, value: bool) {
        self.set(Self::OVERFLOW, value);
    }

    #[inline]
    pub fn set_entropy_coded(&mut self, value: bool) {
        self.set(Self::ENTROPY_CODED, value);
    }

    #[inline]
    pub fn set_object_count(&mut self, count: usize) {
        let count = count.min(MAX_OBJECTS) as u8;
        self.0 = (self.0 & !Self::OBJECT_COUNT_MASK) | (count << Self::OBJECT_COUNT_SHIFT);
    }

    #[inline]
    fn set(&mut self, bit: u8, value: bool) {
        if value {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    /// Human-readable names of the set boolean flags.
    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.0 & Self::EXPLICIT_RUNS != 0 {
            names.push("EXPLICIT_RUNS");
        }
        if self.is_overflow() {
            names.push("OVERFLOW");
        }
        if self.is_entropy_coded() {
            names.push("ENTROPY_CODED");
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_independent() {
        let mut flags = PacketFlags::NONE;
        flags.set_overflow(true);
        flags.set_run_format(RunFormat::Explicit);
        flags.set_object_count(3);

        assert!(flags.is_overflow());
        assert!(!flags.is_entropy_coded());
        assert_eq!(flags.run_format(), RunFormat::Explicit);
        assert_eq!(flags.object_count(), 3);
        assert_eq!(flags.bits(), 0b0110_0011);

        flags.set_overflow(false);
        flags.set_object_count(0);
        assert_eq!(flags.bits(), PacketFlags::EXPLICIT_RUNS);
    }

    #[test]
    fn object_count_is_capped() {
        let mut flags = PacketFlags::NONE;
        flags.set_object_count(9);
        assert_eq!(flags.object_count(), MAX_OBJECTS);

        // a corrupt count field never reports more than the header can hold
        assert_eq!(PacketFlags::new(0b1110_0000).object_count(), MAX_OBJECTS);
    }

    #[test]
    fn names_list_set_flags() {
        let flags = PacketFlags::new(PacketFlags::OVERFLOW | PacketFlags::ENTROPY_CODED);
        assert_eq!(flags.names(), vec!["OVERFLOW", "ENTROPY_CODED"]);
        assert_eq!(flags.run_format(), RunFormat::Packed);
    }
}
