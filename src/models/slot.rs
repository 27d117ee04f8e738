//! Weekly slot grid.
//!
//! The grid is fixed for every run: six teaching days × six periods,
//! 36 cells in total. A [`Slot`] is one cell.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of teaching days in the weekly grid.
pub const DAYS_PER_WEEK: usize = 6;

/// Number of periods per teaching day.
pub const PERIODS_PER_DAY: usize = 6;

/// Total number of cells in the weekly grid.
pub const GRID_SIZE: usize = DAYS_PER_WEEK * PERIODS_PER_DAY;

/// A teaching day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Day {
    /// All days in week order.
    pub const ALL: [Day; DAYS_PER_WEEK] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
    ];

    /// Zero-based position in the week.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A teaching period within a day (1-based, `1..=6`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Period(u8);

impl Period {
    /// All periods in day order.
    pub const ALL: [Period; PERIODS_PER_DAY] = [
        Period(1),
        Period(2),
        Period(3),
        Period(4),
        Period(5),
        Period(6),
    ];

    /// Creates a period from its 1-based number.
    ///
    /// Returns `None` outside `1..=6`.
    pub fn new(number: u8) -> Option<Self> {
        if (1..=PERIODS_PER_DAY as u8).contains(&number) {
            Some(Self(number))
        } else {
            None
        }
    }

    /// 1-based period number.
    #[inline]
    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-based position in the day.
    #[inline]
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl TryFrom<u8> for Period {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Period::new(value).ok_or_else(|| format!("period {value} outside 1..={PERIODS_PER_DAY}"))
    }
}

impl From<Period> for u8 {
    fn from(period: Period) -> Self {
        period.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Period {}", self.0)
    }
}

/// One (day, period) cell of the weekly grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    pub day: Day,
    pub period: Period,
}

impl Slot {
    /// Creates a slot.
    pub fn new(day: Day, period: Period) -> Self {
        Self { day, period }
    }

    /// Zero-based row-major index into the grid (`0..GRID_SIZE`).
    #[inline]
    pub fn index(self) -> usize {
        self.day.index() * PERIODS_PER_DAY + self.period.index()
    }

    /// Inverse of [`Slot::index`].
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= GRID_SIZE {
            return None;
        }
        let day = Day::ALL[index / PERIODS_PER_DAY];
        let period = Period::ALL[index % PERIODS_PER_DAY];
        Some(Self { day, period })
    }

    /// Iterates all 36 slots, day-major.
    pub fn all() -> impl Iterator<Item = Slot> {
        Day::ALL
            .into_iter()
            .flat_map(|day| Period::ALL.into_iter().map(move |period| Slot { day, period }))
    }

    /// Slots of a single day in period order.
    pub fn of_day(day: Day) -> impl Iterator<Item = Slot> {
        Period::ALL.into_iter().map(move |period| Slot { day, period })
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.day, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_has_36_slots() {
        let slots: Vec<Slot> = Slot::all().collect();
        assert_eq!(slots.len(), GRID_SIZE);
        assert_eq!(slots[0], Slot::new(Day::Monday, Period::ALL[0]));
        assert_eq!(slots[35], Slot::new(Day::Saturday, Period::ALL[5]));
    }

    #[test]
    fn test_slot_index_roundtrip() {
        for (i, slot) in Slot::all().enumerate() {
            assert_eq!(slot.index(), i);
            assert_eq!(Slot::from_index(i), Some(slot));
        }
        assert_eq!(Slot::from_index(GRID_SIZE), None);
    }

    #[test]
    fn test_period_bounds() {
        assert!(Period::new(0).is_none());
        assert!(Period::new(7).is_none());
        assert_eq!(Period::new(3).map(Period::number), Some(3));
    }

    #[test]
    fn test_period_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<Period>("4").is_ok());
        assert!(serde_json::from_str::<Period>("9").is_err());
    }

    #[test]
    fn test_display() {
        let slot = Slot::new(Day::Wednesday, Period::ALL[1]);
        assert_eq!(slot.to_string(), "Wednesday Period 2");
    }
}
