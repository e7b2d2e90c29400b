use serde::{Deserialize, Serialize};

/// Page-size bound. Replaces the `0 means no limit` convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Limit {
    Bounded(u64),
    #[default]
    Unbounded,
}

impl Limit {
    /// A non-positive count means no window.
    #[must_use]
    pub fn from_count(count: i64) -> Self {
        u64::try_from(count)
            .ok()
            .filter(|n| *n > 0)
            .map_or(Self::Unbounded, Self::Bounded)
    }

    /// The numeric form, with `0` standing for unbounded.
    #[must_use]
    pub const fn as_count(self) -> u64 {
        match self {
            Self::Bounded(n) => n,
            Self::Unbounded => 0,
        }
    }

    #[must_use]
    pub const fn is_bounded(self) -> bool {
        matches!(self, Self::Bounded(_))
    }

    /// Clamp to `maximum`. An unbounded request stays unbounded, an unbounded
    /// maximum clamps nothing.
    #[must_use]
    pub fn clamp_to(self, maximum: Self) -> Self {
        match (self, maximum) {
            (Self::Bounded(n), Self::Bounded(max)) if n > max => Self::Bounded(max),
            _ => self,
        }
    }
}

/// Offset and limit for one list request, computed once and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Requested offset as given; negative values are carried through.
    pub offset: i64,
    pub limit: Limit,
}

impl PageWindow {
    /// Offset to hand to the database, which cannot skip a negative amount.
    #[must_use]
    pub fn db_offset(&self) -> u64 {
        u64::try_from(self.offset).unwrap_or(0)
    }
}

fn parse_count(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

/// Derive the page window from the raw `offset` and `limit` parameters.
///
/// A missing or unparseable offset is `0`. A missing or unparseable limit
/// falls back to `default_limit`. The result is clamped to `maximum_limit`.
#[must_use]
pub fn calculate_window(
    raw_offset: Option<&str>,
    raw_limit: Option<&str>,
    default_limit: Limit,
    maximum_limit: Limit,
) -> PageWindow {
    let offset = raw_offset.and_then(parse_count).unwrap_or(0);
    let limit = raw_limit
        .and_then(parse_count)
        .map_or(default_limit, Limit::from_count);

    PageWindow {
        offset,
        limit: limit.clamp_to(maximum_limit),
    }
}
