//! Harvest boundary dates and their granularities.
//!
//! OAI-PMH `from`/`until` arguments come in two granularities: a plain
//! calendar date or a UTC date-time with second precision. A bad `from` is a
//! request error; a bad `until` only removes the upper edge of the window.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_YEAR;
use crate::error::{CatalogError, Result};

/// Year the protocol layer uses to mean "no upper limit".
const SENTINEL_YEAR: &str = "9999";

/// Date pattern: YYYY-MM-DD.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DAY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Date-time pattern: YYYY-MM-DDThh:mm:ss with `Z` or a `±hh:mm` offset.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DATETIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(Z|[+-]\d{2}:\d{2})$").expect("valid regex")
});

/// Precision of a harvest date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Granularity {
    /// Calendar date only.
    #[serde(rename = "YYYY-MM-DD")]
    Day,

    /// UTC date-time with seconds.
    #[default]
    #[serde(rename = "YYYY-MM-DDThh:mm:ssZ")]
    Second,
}

impl Granularity {
    /// The protocol's name for this granularity.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "YYYY-MM-DD",
            Self::Second => "YYYY-MM-DDThh:mm:ssZ",
        }
    }
}

/// Parsing options derived from the catalog configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateOptions {
    /// Finest granularity the repository supports.
    pub granularity: Granularity,
    /// Latest representable year.
    pub max_year: i32,
}

impl Default for DateOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::Second,
            max_year: DEFAULT_MAX_YEAR,
        }
    }
}

/// A validated harvest date, in UTC, remembering its input granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedDate {
    instant: DateTime<Utc>,
    granularity: Granularity,
}

impl NormalizedDate {
    pub fn new(instant: DateTime<Utc>, granularity: Granularity) -> Self {
        Self {
            instant,
            granularity,
        }
    }

    #[must_use]
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Date in the figshare search syntax (`dd/MM/yyyy` or `dd/MM/yyyyTHH:mm:ssZ`).
    #[must_use]
    pub fn to_search_string(&self) -> String {
        match self.granularity {
            Granularity::Day => self.instant.format("%d/%m/%Y").to_string(),
            Granularity::Second => self.instant.format("%d/%m/%YT%H:%M:%SZ").to_string(),
        }
    }

    /// Date in protocol form (`YYYY-MM-DD` or `YYYY-MM-DDThh:mm:ssZ`).
    #[must_use]
    pub fn to_protocol_string(&self) -> String {
        match self.granularity {
            Granularity::Day => self.instant.format("%Y-%m-%d").to_string(),
            Granularity::Second => self.instant.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }

    /// Clamp to the last instant of `max_year` when the date lies beyond it.
    fn clamp_year(self, max_year: i32) -> Self {
        if self.instant.year() <= max_year {
            return self;
        }
        let time = match self.granularity {
            Granularity::Day => NaiveTime::MIN,
            Granularity::Second => NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
        };
        match NaiveDate::from_ymd_opt(max_year, 12, 31) {
            Some(date) => Self::new(date.and_time(time).and_utc(), self.granularity),
            None => self,
        }
    }

    /// Widen a day-granular upper bound to the last second of that day.
    fn to_end_of_day(self) -> Self {
        match (self.granularity, NaiveTime::from_hms_opt(23, 59, 59)) {
            (Granularity::Day, Some(end)) => Self::new(
                self.instant.date_naive().and_time(end).and_utc(),
                Granularity::Second,
            ),
            _ => self,
        }
    }
}

impl fmt::Display for NormalizedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_protocol_string())
    }
}

/// Bounds of a harvest request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestWindow {
    pub from: Option<NormalizedDate>,
    pub until: Option<NormalizedDate>,
}

impl HarvestWindow {
    /// Build a window from raw protocol arguments.
    ///
    /// # Returns
    /// * `Ok(window)`; an unparseable `until` leaves the window open-ended
    /// * `Err(CatalogError::InvalidGranularity)` if `from` cannot be parsed
    pub fn from_args(
        from: Option<&str>,
        until: Option<&str>,
        options: &DateOptions,
    ) -> Result<Self> {
        let from = match from {
            Some(f) => normalize(f, false, options)?,
            None => None,
        };
        let until = match until {
            Some(u) => normalize(u, true, options)?,
            None => None,
        };
        Ok(Self { from, until })
    }

    /// A window with neither edge set.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }
}

/// Parse and normalize one harvest boundary date.
///
/// # Arguments
/// * `input` - Date as received from the protocol layer
/// * `is_upper_bound` - `true` for `until`, `false` for `from`
/// * `options` - Repository granularity and maximum year
///
/// # Returns
/// * `Ok(Some(date))` for a valid date (years past `max_year` are clamped)
/// * `Ok(None)` for empty input, or an unparseable upper bound
/// * `Err(CatalogError::InvalidGranularity)` for an unparseable lower bound
///
/// # Examples
/// ```
/// use figshare_oai_harvester::dates::{normalize, DateOptions};
///
/// let options = DateOptions::default();
/// let from = normalize("2022-07-02", false, &options).unwrap().unwrap();
/// assert_eq!(from.to_search_string(), "02/07/2022");
///
/// assert!(normalize("yesterday", false, &options).is_err());
/// assert!(normalize("yesterday", true, &options).unwrap().is_none());
/// ```
pub fn normalize(
    input: &str,
    is_upper_bound: bool,
    options: &DateOptions,
) -> Result<Option<NormalizedDate>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let Some(date) = parse_strict(trimmed, options.max_year) else {
        if is_upper_bound {
            tracing::debug!(until = input, "Unparseable upper bound, treating as open-ended");
            return Ok(None);
        }
        return Err(CatalogError::InvalidGranularity(input.to_string()));
    };

    if is_upper_bound && options.granularity == Granularity::Second {
        Ok(Some(date.to_end_of_day()))
    } else {
        Ok(Some(date))
    }
}

/// Parse one of the two supported formats, rewriting the sentinel year first.
fn parse_strict(input: &str, max_year: i32) -> Option<NormalizedDate> {
    let rewritten;
    let input = match input.strip_prefix(SENTINEL_YEAR) {
        Some(rest) => {
            rewritten = format!("{max_year:04}{rest}");
            rewritten.as_str()
        }
        None => input,
    };

    let date = if DAY_PATTERN.is_match(input) {
        let day = NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()?;
        NormalizedDate::new(day.and_time(NaiveTime::MIN).and_utc(), Granularity::Day)
    } else if DATETIME_PATTERN.is_match(input) {
        let instant = DateTime::parse_from_rfc3339(input).ok()?.with_timezone(&Utc);
        NormalizedDate::new(instant, Granularity::Second)
    } else {
        return None;
    };

    Some(date.clamp_year(max_year))
}
