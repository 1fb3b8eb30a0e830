//! # Kai Temporal Model
//!
//! A logical clock that divides elapsed time since genesis into pulses of
//! `(3 + √5)` seconds. Eleven pulses make a step, 44 steps a beat, and 36
//! beats a day. A day is 17 491.270421 pulses, which is not a whole number,
//! so beats are derived from the day fraction in micro-pulses rather than
//! from the step count.
//!
//! All arithmetic uses Euclidean division and remainders, so negative
//! offsets never produce negative indices.
//!
//! Step indices are always recomputed from the pulse through
//! [`step_index_from_pulse`], both when a moment is stamped and when it is
//! later verified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::KaiError;

/// Genesis instant in Unix milliseconds (2024-05-10T06:45:41.888Z).
pub const GENESIS_TS: i64 = 1_715_323_541_888;

/// Exact pulse length in milliseconds, `(3 + √5) × 1000`.
pub const PULSE_MS_EXACT: f64 = 5_236.067_977_499_79;

/// Rounded pulse length for display.
pub const PULSE_MS: u64 = 5236;

pub const PULSES_PER_STEP: i64 = 11;
pub const STEPS_PER_BEAT: u32 = 44;
pub const PULSES_PER_BEAT: i64 = PULSES_PER_STEP * STEPS_PER_BEAT as i64;
pub const BEATS_PER_DAY: u32 = 36;

/// Pulses per day in micro-pulses (17 491.270421 pulses).
pub const N_DAY_MICRO: i128 = 17_491_270_421;

pub const DAYS_PER_WEEK: i64 = 6;
pub const WEEKS_PER_MONTH: i64 = 7;
pub const DAYS_PER_MONTH: i64 = DAYS_PER_WEEK * WEEKS_PER_MONTH;
pub const MONTHS_PER_YEAR: i64 = 8;
pub const DAYS_PER_YEAR: i64 = DAYS_PER_MONTH * MONTHS_PER_YEAR;

const MICRO: i128 = 1_000_000;

/// A logical-clock triple used for ordering and expiry.
///
/// Ordering is lexicographic by `(pulse, beat, step_index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KaiMoment {
    pub pulse: u64,
    pub beat: u32,
    pub step_index: u32,
}

impl KaiMoment {
    /// Derive the full moment for a pulse.
    pub fn from_pulse(pulse: u64) -> Self {
        let p = i128::from(pulse);
        Self {
            pulse,
            beat: beat_of(p),
            step_index: step_index_of(p, STEPS_PER_BEAT),
        }
    }

    /// Check that `beat` is in range and `step_index` matches the pulse.
    ///
    /// Claims and ledger events are checked with this when built, and
    /// again when verified or loaded.
    pub fn validate(&self) -> Result<(), KaiError> {
        if self.beat >= BEATS_PER_DAY {
            return Err(KaiError::InvalidMoment(format!(
                "beat {} out of range [0, {BEATS_PER_DAY})",
                self.beat
            )));
        }
        let expected = step_index_of(i128::from(self.pulse), STEPS_PER_BEAT);
        if self.step_index != expected {
            return Err(KaiError::InvalidMoment(format!(
                "stepIndex {} does not match pulse {} (expected {expected})",
                self.step_index, self.pulse
            )));
        }
        Ok(())
    }

    /// Fractional progress through the current step, in `[0, 1)`.
    pub fn percent_into_step(&self) -> f64 {
        percent_of(i128::from(self.pulse))
    }

    /// Expired once the pulse reaches `expiration_pulse`.
    pub fn is_expired_at(&self, expiration_pulse: u64) -> bool {
        self.pulse >= expiration_pulse
    }

    /// Calendar placement of this moment's pulse.
    pub fn calendar(&self) -> KaiCalendar {
        KaiCalendar::from_pulse(self.pulse)
    }
}

impl std::fmt::Display for KaiMoment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.pulse, self.beat, self.step_index)
    }
}

/// Pulse containing the given Unix-millisecond instant.
///
/// Fails closed on non-finite input; a malformed instant never becomes
/// pulse 0.
pub fn pulse_from_instant(instant_ms: f64) -> Result<i64, KaiError> {
    if !instant_ms.is_finite() {
        return Err(KaiError::NonFiniteInstant(instant_ms));
    }
    let p = ((instant_ms - GENESIS_TS as f64) / PULSE_MS_EXACT).floor();
    if p.abs() >= i64::MAX as f64 {
        return Err(KaiError::InstantOutOfRange(instant_ms));
    }
    Ok(p as i64)
}

/// Kai moment for a Unix-millisecond instant at or after genesis.
pub fn moment_from_instant(instant_ms: f64) -> Result<KaiMoment, KaiError> {
    let pulse = pulse_from_instant(instant_ms)?;
    let pulse = u64::try_from(pulse).map_err(|_| KaiError::BeforeGenesis { instant_ms })?;
    Ok(KaiMoment::from_pulse(pulse))
}

/// Kai moment for a UTC datetime.
pub fn moment_from_datetime(at: DateTime<Utc>) -> Result<KaiMoment, KaiError> {
    moment_from_instant(at.timestamp_millis() as f64)
}

/// Kai moment for the current wall-clock time.
pub fn moment_now() -> Result<KaiMoment, KaiError> {
    moment_from_datetime(Utc::now())
}

/// Start instant of a pulse in Unix milliseconds.
pub fn instant_from_pulse(pulse: i64) -> f64 {
    GENESIS_TS as f64 + pulse as f64 * PULSE_MS_EXACT
}

/// Step index within the beat for a pulse.
///
/// Deterministic and always in `[0, steps_per_beat)`. A zero
/// `steps_per_beat` is treated as one.
pub fn step_index_from_pulse(pulse: i64, steps_per_beat: u32) -> u32 {
    step_index_of(i128::from(pulse), steps_per_beat)
}

/// Beat within the day for a pulse, in `[0, BEATS_PER_DAY)`.
pub fn beat_from_pulse(pulse: i64) -> u32 {
    beat_of(i128::from(pulse))
}

/// Fractional progress through the pulse's step, in `[0, 1)`.
pub fn percent_into_step_from_pulse(pulse: i64) -> f64 {
    percent_of(i128::from(pulse))
}

/// Clamp a step percentage into `[0, 1)`.
///
/// Total over all inputs: NaN and negatives become 0, values at or above 1
/// become the largest value below 1.
pub fn normalize_percent_into_step(x: f64) -> f64 {
    if x.is_nan() || x < 0.0 {
        0.0
    } else if x >= 1.0 {
        1.0 - f64::EPSILON
    } else {
        x
    }
}

fn step_index_of(p: i128, steps_per_beat: u32) -> u32 {
    let span = i128::from(PULSES_PER_STEP) * i128::from(steps_per_beat.max(1));
    (p.rem_euclid(span) / i128::from(PULSES_PER_STEP)) as u32
}

fn beat_of(p: i128) -> u32 {
    let within_day = (p * MICRO).rem_euclid(N_DAY_MICRO);
    (within_day * i128::from(BEATS_PER_DAY) / N_DAY_MICRO) as u32
}

fn percent_of(p: i128) -> f64 {
    p.rem_euclid(i128::from(PULSES_PER_STEP)) as f64 / PULSES_PER_STEP as f64
}

fn day_index_of(p: i128) -> i64 {
    (p * MICRO).div_euclid(N_DAY_MICRO) as i64
}

/// Day of the six-day week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weekday {
    Solhara,
    Aquaris,
    Flamora,
    Verdari,
    Sonari,
    Kaelith,
}

impl Weekday {
    const ALL: [Weekday; 6] = [
        Self::Solhara,
        Self::Aquaris,
        Self::Flamora,
        Self::Verdari,
        Self::Sonari,
        Self::Kaelith,
    ];

    fn from_index(i: i64) -> Self {
        Self::ALL[i.rem_euclid(DAYS_PER_WEEK) as usize]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solhara => "Solhara",
            Self::Aquaris => "Aquaris",
            Self::Flamora => "Flamora",
            Self::Verdari => "Verdari",
            Self::Sonari => "Sonari",
            Self::Kaelith => "Kaelith",
        }
    }

    /// Chakra day paired with this weekday.
    pub fn chakra_day(&self) -> ChakraDay {
        match self {
            Self::Solhara => ChakraDay::Root,
            Self::Aquaris => ChakraDay::SolarPlexus,
            Self::Flamora => ChakraDay::Heart,
            Self::Verdari => ChakraDay::Throat,
            Self::Sonari => ChakraDay::ThirdEye,
            Self::Kaelith => ChakraDay::Crown,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChakraDay {
    Root,
    #[serde(rename = "Solar Plexus")]
    SolarPlexus,
    Heart,
    Throat,
    #[serde(rename = "Third Eye")]
    ThirdEye,
    Crown,
}

impl ChakraDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "Root",
            Self::SolarPlexus => "Solar Plexus",
            Self::Heart => "Heart",
            Self::Throat => "Throat",
            Self::ThirdEye => "Third Eye",
            Self::Crown => "Crown",
        }
    }
}

impl std::fmt::Display for ChakraDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar placement of a pulse. All indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KaiCalendar {
    pub day_index: i64,
    pub weekday: Weekday,
    pub chakra_day: ChakraDay,
    pub day_of_month: u32,
    pub month: u32,
    pub year: i64,
}

impl KaiCalendar {
    pub fn from_pulse(pulse: u64) -> Self {
        let day = day_index_of(i128::from(pulse));
        let weekday = Weekday::from_index(day);
        Self {
            day_index: day,
            weekday,
            chakra_day: weekday.chakra_day(),
            day_of_month: day.rem_euclid(DAYS_PER_MONTH) as u32,
            month: (day.rem_euclid(DAYS_PER_YEAR) / DAYS_PER_MONTH) as u32,
            year: day.div_euclid(DAYS_PER_YEAR),
        }
    }
}
