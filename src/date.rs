use std::cmp::Ordering;
use std::sync::LazyLock;

use chrono::{Days, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;

use crate::error::ParseError;

/// Canonical metadata date form: `YYYY:MM:DD`, optionally followed by
/// `HH:MM[:SS[.fff]]` and a `±HH:MM` or `Z` offset. Anchored so trailing
/// garbage fails the whole string.
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<y>\d{4}):(?P<mo>\d{2}):(?P<d>\d{2})(?: (?P<h>\d{2}):(?P<mi>\d{2})(?::(?P<s>\d{2})(?:\.\d+)?)?(?P<tz>Z|[+-]\d{2}:\d{2})?)?$",
    )
    .unwrap()
});

/// A timestamp as written in a metadata tag: the wall-clock time plus the
/// timezone offset, when the tag carried one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaDateTime {
    /// Wall-clock time, after any day-begins shift.
    pub local: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl MetaDateTime {
    /// Point on the shared timeline used for ordering: UTC when an offset
    /// is known, the wall-clock time otherwise.
    pub fn instant(&self) -> NaiveDateTime {
        match self.offset {
            Some(offset) => self.local - offset,
            None => self.local,
        }
    }
}

impl Ord for MetaDateTime {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.instant(), self.local).cmp(&(other.instant(), other.local))
    }
}

impl PartialOrd for MetaDateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parse one raw tag value. `day_begins` shifts times before that hour
/// into the previous calendar day (0 disables the shift).
pub fn parse_exif_date(raw: &str, day_begins: u32) -> Result<MetaDateTime, ParseError> {
    let err = || ParseError(raw.to_string());
    let caps = DATE_RE.captures(raw.trim()).ok_or_else(err)?;

    let year: i32 = caps["y"].parse().map_err(|_| err())?;
    if year == 0 {
        return Err(err());
    }
    let month: u32 = caps["mo"].parse().map_err(|_| err())?;
    let day: u32 = caps["d"].parse().map_err(|_| err())?;
    // from_ymd_opt rejects month/day 00 and other out-of-range values
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(err)?;

    // Tags carrying a bare date default to noon
    let (hour, minute, second) = match caps.name("h") {
        Some(h) => (
            h.as_str().parse().map_err(|_| err())?,
            caps["mi"].parse().map_err(|_| err())?,
            match caps.name("s") {
                Some(s) => s.as_str().parse().map_err(|_| err())?,
                None => 0,
            },
        ),
        None => (12, 0, 0),
    };
    let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(err)?;

    let offset = match caps.name("tz").map(|m| m.as_str()) {
        None => None,
        Some("Z") => FixedOffset::east_opt(0),
        Some(tz) => {
            let sign: i32 = if tz.starts_with('-') { -1 } else { 1 };
            let hours: i32 = tz[1..3].parse().map_err(|_| err())?;
            let minutes: i32 = tz[4..6].parse().map_err(|_| err())?;
            Some(FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(err)?)
        }
    };

    let local = apply_day_begins(NaiveDateTime::new(date, time), day_begins);
    Ok(MetaDateTime { local, offset })
}

/// Attribute early-morning times to the previous calendar day. The date
/// is decremented by exactly one day (cascading over month and year
/// boundaries); the time of day is untouched.
pub fn apply_day_begins(dt: NaiveDateTime, day_begins: u32) -> NaiveDateTime {
    if dt.hour() < day_begins {
        dt.checked_sub_days(Days::new(1)).unwrap_or(dt)
    } else {
        dt
    }
}
