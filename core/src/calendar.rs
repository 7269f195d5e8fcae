//! In-game calendar and the regrow-delay arithmetic built on top of it.
//!
//! A year has four 28-day seasons. Dates are ordered chronologically, so a
//! regrowth is due once `today >= regrow_date(...)`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Number of days in every season.
pub const DAYS_PER_SEASON: u32 = 28;

/// Number of seasons in every year.
pub const SEASONS_PER_YEAR: u32 = 4;

const DAYS_PER_YEAR: u64 = (DAYS_PER_SEASON * SEASONS_PER_YEAR) as u64;

/// Seasons of the in-game year, in calendar order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    /// First season of the year.
    Spring,
    /// Second season of the year.
    Summer,
    /// Third season of the year.
    Fall,
    /// Fourth season of the year.
    Winter,
}

impl Season {
    /// Zero-based position of the season within the year.
    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            Self::Spring => 0,
            Self::Summer => 1,
            Self::Fall => 2,
            Self::Winter => 3,
        }
    }

    /// Resolves a zero-based index, wrapping past the end of the year.
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        match index % SEASONS_PER_YEAR {
            0 => Self::Spring,
            1 => Self::Summer,
            2 => Self::Fall,
            _ => Self::Winter,
        }
    }
}

/// A day in the simulation calendar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimDate {
    day: u32,
    season: Season,
    year: u32,
}

impl SimDate {
    /// First day of the first year.
    pub const START: SimDate = SimDate::new(1, Season::Spring, 1);

    /// Creates a date from its day-of-season (1..=28), season, and year (1-based).
    #[must_use]
    pub const fn new(day: u32, season: Season, year: u32) -> Self {
        Self { day, season, year }
    }

    /// Day within the season, starting at 1.
    #[must_use]
    pub const fn day(&self) -> u32 {
        self.day
    }

    /// Season of the date.
    #[must_use]
    pub const fn season(&self) -> Season {
        self.season
    }

    /// Year of the date, starting at 1.
    #[must_use]
    pub const fn year(&self) -> u32 {
        self.year
    }

    /// Reports whether the day and year fall inside the calendar's bounds.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.day >= 1 && self.day <= DAYS_PER_SEASON && self.year >= 1
    }

    /// Number of days elapsed since day 1 of Spring, year 1.
    #[must_use]
    pub fn days_since_start(&self) -> u64 {
        let years = u64::from(self.year.saturating_sub(1));
        let seasons = u64::from(self.season.index());
        let days = u64::from(self.day.saturating_sub(1));
        years * DAYS_PER_YEAR + seasons * u64::from(DAYS_PER_SEASON) + days
    }

    /// Builds the date that lies `days` days after day 1 of Spring, year 1.
    ///
    /// Returns `None` when the year no longer fits in a `u32`.
    #[must_use]
    pub fn from_days_since_start(days: u64) -> Option<Self> {
        let year = u32::try_from(days / DAYS_PER_YEAR).ok()?.checked_add(1)?;
        let within_year = days % DAYS_PER_YEAR;
        let season = Season::from_index((within_year / u64::from(DAYS_PER_SEASON)) as u32);
        let day = (within_year % u64::from(DAYS_PER_SEASON)) as u32 + 1;
        Some(Self::new(day, season, year))
    }

    /// Returns the date `days` days later, rolling over seasons and years.
    #[must_use]
    pub fn add_days(&self, days: u64) -> Option<Self> {
        Self::from_days_since_start(self.days_since_start().checked_add(days)?)
    }

    /// Returns the following day.
    #[must_use]
    pub fn next_day(&self) -> Option<Self> {
        self.add_days(1)
    }
}

impl Default for SimDate {
    fn default() -> Self {
        Self::START
    }
}

impl Ord for SimDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.year
            .cmp(&other.year)
            .then(self.season.cmp(&other.season))
            .then(self.day.cmp(&other.day))
    }
}

impl PartialOrd for SimDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Computes the date a bush destroyed on `origin` should regrow.
///
/// The schedule is split on whitespace. It needs at least two tokens, the
/// first of which must parse as a non-negative integer `n`; the last token
/// selects the unit and is matched case-sensitively:
///
/// * `day`, `days`: `n` days after `origin`.
/// * `season`, `seasons`, `month`, `months`: `28 * n` days after `origin`,
///   moved back to day 1 of that season.
/// * `year`, `years`: day 1 of the origin's season, `n` years later.
///
/// Any other shape, a missing origin, or a missing schedule returns `None`,
/// meaning the bush is never due.
#[must_use]
pub fn regrow_date(origin: Option<SimDate>, schedule: Option<&str>) -> Option<SimDate> {
    let origin = origin?;
    let tokens: Vec<&str> = schedule?.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }

    let amount: u32 = tokens[0].parse().ok()?;
    match tokens[tokens.len() - 1] {
        "day" | "days" => origin.add_days(u64::from(amount)),
        "season" | "seasons" | "month" | "months" => {
            let shifted = origin.add_days(u64::from(amount) * u64::from(DAYS_PER_SEASON))?;
            Some(SimDate::new(1, shifted.season(), shifted.year()))
        }
        "year" | "years" => Some(SimDate::new(
            1,
            origin.season(),
            origin.year().checked_add(amount)?,
        )),
        _ => None,
    }
}
