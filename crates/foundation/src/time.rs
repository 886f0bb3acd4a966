use serde::{Deserialize, Serialize};

/// Calendar year as carried by the `Year` feature attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Year(pub i32);

impl Year {
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl std::fmt::Display for Year {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive year bounds of the time slider.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub first: Year,
    pub last: Year,
}

impl YearRange {
    pub const fn new(first: i32, last: i32) -> Self {
        Self {
            first: Year(first),
            last: Year(last),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first > self.last
    }

    pub fn contains(&self, year: Year) -> bool {
        year >= self.first && year <= self.last
    }

    /// Clamps `year` into the range. An inverted range yields `first`.
    pub fn clamp(&self, year: Year) -> Year {
        if self.is_empty() {
            return self.first;
        }
        year.max(self.first).min(self.last)
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.last.0 - self.first.0) as usize + 1
        }
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::new(1980, 2024)
    }
}

#[cfg(test)]
mod tests {
    use super::{Year, YearRange};

    #[test]
    fn clamp_keeps_years_in_bounds() {
        let r = YearRange::new(2000, 2020);
        assert_eq!(r.clamp(Year(1999)), Year(2000));
        assert_eq!(r.clamp(Year(2010)), Year(2010));
        assert_eq!(r.clamp(Year(2031)), Year(2020));
    }

    #[test]
    fn inverted_range_is_empty() {
        let r = YearRange::new(2020, 2000);
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
        assert_eq!(r.clamp(Year(2010)), Year(2020));
    }

    #[test]
    fn len_is_inclusive() {
        assert_eq!(YearRange::new(2020, 2020).len(), 1);
        assert_eq!(YearRange::default().len(), 45);
    }
}
