//! Quarter-hour tick conversion.
//!
//! The solver works on a flat integer timeline where one tick is fifteen
//! minutes and day `N` occupies ticks `[N * 96, (N + 1) * 96]`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::interval::Interval;

/// One quarter hour.
pub type Tick = i32;

pub const TICKS_PER_DAY: Tick = 96;
pub const MINUTES_PER_TICK: i32 = 15;
pub const SECONDS_PER_TICK: f64 = 900.0;

const MINUTES_PER_DAY: i32 = 24 * 60;
const END_OF_DAY_MINUTES: i32 = MINUTES_PER_DAY - 1;

/// Wall-clock time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub const fn hour(&self) -> u8 {
        self.hour
    }

    pub const fn minute(&self) -> u8 {
        self.minute
    }

    pub const fn total_minutes(&self) -> i32 {
        self.hour as i32 * 60 + self.minute as i32
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid clock time {0:?}, expected HH:MM")]
pub struct ParseClockTimeError(String);

impl FromStr for ClockTime {
    type Err = ParseClockTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseClockTimeError(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(err)?;
        let hour = hour.parse::<u8>().map_err(|_| err())?;
        let minute = minute.parse::<u8>().map_err(|_| err())?;
        Self::new(hour, minute).ok_or_else(err)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ParseClockTimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// Convert minutes since midnight to a tick in `[0, 96]`.
///
/// A missing value is open-ended: `0` for a lower bound, `96` for an upper
/// bound. Inexact values round up for lower bounds and down for upper bounds,
/// so a converted window never grows past the original clock times.
pub fn to_quarter_ticks(total_minutes: Option<i32>, is_lower_bound: bool) -> Tick {
    let Some(minutes) = total_minutes else {
        return if is_lower_bound { 0 } else { TICKS_PER_DAY };
    };
    if minutes >= END_OF_DAY_MINUTES {
        return TICKS_PER_DAY;
    }

    let remainder = minutes.rem_euclid(MINUTES_PER_TICK);
    let adjusted = if remainder == 0 {
        minutes
    } else if is_lower_bound {
        minutes + (MINUTES_PER_TICK - remainder)
    } else {
        minutes - remainder
    };

    (adjusted / MINUTES_PER_TICK).clamp(0, TICKS_PER_DAY)
}

/// Business hours as a tick window.
///
/// A close time at or before the open time means the business runs past
/// midnight; the close is pushed a day forward before conversion, which
/// clamps it to the end of the opening day.
pub fn business_hours_to_ticks(open: Option<ClockTime>, close: Option<ClockTime>) -> Interval {
    let open_minutes = open.map(|time| time.total_minutes());
    let mut close_minutes = close.map(|time| time.total_minutes());

    if let (Some(open), Some(close)) = (open_minutes, close_minutes.as_mut()) {
        if *close <= open {
            *close += MINUTES_PER_DAY;
        }
    }

    Interval::new(
        to_quarter_ticks(open_minutes, true),
        to_quarter_ticks(close_minutes, false),
    )
}

/// Travel seconds to ticks, rounding any partial quarter hour up.
pub fn seconds_to_ticks(seconds: f64) -> Tick {
    (seconds.max(0.0) / SECONDS_PER_TICK).ceil() as Tick
}

/// One-based trip day containing `tick`.
pub const fn day_of(tick: Tick) -> u32 {
    (tick.div_euclid(TICKS_PER_DAY) + 1) as u32
}

/// Clock time of `tick` within its day.
pub fn clock_of(tick: Tick) -> ClockTime {
    let minutes = tick.rem_euclid(TICKS_PER_DAY) * MINUTES_PER_TICK;
    ClockTime {
        hour: (minutes / 60) as u8,
        minute: (minutes % 60) as u8,
    }
}
