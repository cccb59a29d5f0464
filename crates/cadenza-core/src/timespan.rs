use crate::Fraction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open interval `[begin, end)` of rational time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSpan {
    pub begin: Fraction,
    pub end: Fraction,
}

impl TimeSpan {
    pub fn new(begin: Fraction, end: Fraction) -> Self {
        TimeSpan { begin, end }
    }

    pub fn from_ints(begin: i64, end: i64) -> Self {
        TimeSpan {
            begin: Fraction::from_int(begin),
            end: Fraction::from_int(end),
        }
    }

    pub fn from_floats(begin: f64, end: f64) -> Self {
        TimeSpan {
            begin: Fraction::from_f64(begin),
            end: Fraction::from_f64(end),
        }
    }

    pub fn duration(&self) -> Fraction {
        self.end - self.begin
    }

    pub fn contains(&self, time: Fraction) -> bool {
        time >= self.begin && time < self.end
    }

    /// True iff the spans share a positive-duration overlap under half-open
    /// semantics; touching endpoints do not overlap.
    pub fn overlaps(&self, other: &TimeSpan) -> bool {
        self.begin < other.end && other.begin < self.end
    }

    /// Clip to another span. None when the spans are disjoint.
    pub fn intersection(&self, other: &TimeSpan) -> Option<TimeSpan> {
        let begin = self.begin.max(other.begin);
        let end = self.end.min(other.end);
        if begin > end {
            return None;
        }
        Some(TimeSpan::new(begin, end))
    }

    /// As `intersection`, but zero-width results are dropped too.
    pub fn overlap(&self, other: &TimeSpan) -> Option<TimeSpan> {
        if !self.overlaps(other) {
            return None;
        }
        self.intersection(other)
    }

    pub fn midpoint(&self) -> Fraction {
        (self.begin + self.end) * Fraction::new(1, 2)
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub fn shift(&self, offset: Fraction) -> TimeSpan {
        TimeSpan::new(self.begin + offset, self.end + offset)
    }

    pub fn scale(&self, factor: Fraction) -> TimeSpan {
        TimeSpan::new(self.begin * factor, self.end * factor)
    }

    /// The cycle this span starts in, i.e. `[floor(begin), floor(begin) + 1)`.
    pub fn begin_cycle(&self) -> Fraction {
        self.begin.floor()
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_and_contains() {
        let ts = TimeSpan::from_ints(0, 2);
        assert_eq!(ts.duration(), Fraction::from_int(2));
        assert!(ts.contains(Fraction::new(1, 2)));
        assert!(!ts.contains(Fraction::from_int(2)));
    }

    #[test]
    fn half_open_overlap() {
        let a = TimeSpan::from_ints(0, 1);
        let b = TimeSpan::from_ints(1, 2);
        assert!(!a.overlaps(&b));

        let c = TimeSpan::new(Fraction::new(1, 2), Fraction::new(3, 2));
        assert!(a.overlaps(&c));
    }

    #[test]
    fn intersection_clips() {
        let a = TimeSpan::from_ints(0, 2);
        let b = TimeSpan::from_ints(1, 3);
        let clipped = a.intersection(&b).unwrap();
        assert_eq!(clipped, TimeSpan::from_ints(1, 2));

        let disjoint = TimeSpan::from_ints(5, 6);
        assert_eq!(a.intersection(&disjoint), None);
    }

    #[test]
    fn intersection_keeps_touching_point() {
        let a = TimeSpan::from_ints(0, 1);
        let b = TimeSpan::from_ints(1, 2);
        // Zero-width but not disjoint; `overlap` drops it, `intersection` keeps it.
        assert_eq!(a.intersection(&b), Some(TimeSpan::from_ints(1, 1)));
        assert_eq!(a.overlap(&b), None);
    }

    #[test]
    fn shift_and_scale() {
        let ts = TimeSpan::from_ints(1, 2);
        assert_eq!(ts.shift(Fraction::new(1, 2)), TimeSpan::from_floats(1.5, 2.5));
        assert_eq!(ts.scale(Fraction::from_int(2)), TimeSpan::from_ints(2, 4));
    }
}
