//! Departure slot positions.

use std::fmt;

/// One of the three positions a station exposes: next, second, third.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(u8);

impl Slot {
    pub const NEXT: Slot = Slot(0);
    pub const SECOND: Slot = Slot(1);
    pub const THIRD: Slot = Slot(2);

    /// All slots in display order.
    pub const ALL: [Slot; 3] = [Slot::NEXT, Slot::SECOND, Slot::THIRD];

    /// Slot for a zero-based index, if it is one of the exposed positions.
    pub fn new(index: usize) -> Option<Self> {
        match index {
            0..=2 => Some(Slot(index as u8)),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Human-readable sensor name for this slot.
    pub fn sensor_name(self) -> &'static str {
        match self.0 {
            0 => "Next Departure",
            1 => "Second Departure",
            _ => "Third Departure",
        }
    }

    /// Suffix used in unique ids.
    pub fn id_suffix(self) -> &'static str {
        match self.0 {
            0 => "next",
            1 => "second",
            _ => "third",
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}
