//! Timestamp reconstruction from partial time tags
//!
//! Each update carries a side tag holding "microseconds past the hour" in
//! one of two formats:
//!
//! - **DIS**: 4-byte big-endian signed integer in half DIS time units,
//!   `micros = trunc((tag / 2) * 1.676)` with integer division first.
//! - **Hex**: 8 ASCII hex digits of raw microseconds.
//!
//! The tag is cyclic, so the absolute time is rebuilt against the object's
//! previous timestamp. An offset smaller than the previous one is taken to
//! mean the counter wrapped at the top of the hour. Out-of-order or missed
//! updates spanning more than an hour defeat this rule.

use crate::error::TimeTagError;
use reckon_env::ObjectId;
use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Microseconds in one DIS time unit.
pub const DIS_TIME_UNIT_MICROS: f64 = 1.676;

pub const MICROS_PER_HOUR: i64 = 3_600_000_000;

const SECONDS_PER_HOUR: u64 = 3_600;

/// Wire format a tag was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFormat {
    Dis,
    Hex,
}

/// A decoded time tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeTag {
    pub micros_past_hour: i64,
    pub format: TagFormat,
}

/// Decodes a side tag, dispatching on its length.
pub fn decode_time_tag(tag: &[u8]) -> Result<TimeTag, TimeTagError> {
    match tag.len() {
        4 => {
            let raw = i32::from_be_bytes([tag[0], tag[1], tag[2], tag[3]]);
            let micros = ((raw / 2) as f64 * DIS_TIME_UNIT_MICROS) as i64;
            Ok(TimeTag {
                micros_past_hour: micros,
                format: TagFormat::Dis,
            })
        }
        8 => {
            if !tag.iter().all(u8::is_ascii_hexdigit) {
                return Err(TimeTagError::NotHex(String::from_utf8_lossy(tag).into_owned()));
            }
            // Eight hex digits always fit an i64; the check above rules out signs
            let text = String::from_utf8_lossy(tag);
            let micros = i64::from_str_radix(&text, 16)
                .map_err(|_| TimeTagError::NotHex(text.clone().into_owned()))?;
            Ok(TimeTag {
                micros_past_hour: micros,
                format: TagFormat::Hex,
            })
        }
        other => Err(TimeTagError::InvalidLength(other)),
    }
}

/// Encodes an offset as a 4-byte DIS tag (relative-time flag clear).
///
/// Decoding the result may differ from `micros` by up to one DIS unit.
pub fn encode_dis_tag(micros: i64) -> Result<[u8; 4], TimeTagError> {
    let units = (micros as f64 / DIS_TIME_UNIT_MICROS).round();
    if micros < 0 || units > (i32::MAX / 2) as f64 {
        return Err(TimeTagError::OutOfRange(micros));
    }
    let raw = (units as i32) * 2;
    Ok(raw.to_be_bytes())
}

/// Encodes an offset as an 8-digit uppercase hex tag.
pub fn encode_hex_tag(micros: i64) -> Result<[u8; 8], TimeTagError> {
    if !(0..=u32::MAX as i64).contains(&micros) {
        return Err(TimeTagError::OutOfRange(micros));
    }
    let mut out = [0u8; 8];
    out.copy_from_slice(format!("{:08X}", micros).as_bytes());
    Ok(out)
}

/// Wall-clock time truncated to the top of its hour (UTC).
pub fn top_of_hour(time: SystemTime) -> SystemTime {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = since_epoch.as_secs();
    UNIX_EPOCH + Duration::from_secs(secs - secs % SECONDS_PER_HOUR)
}

/// Microseconds elapsed since the top of the hour containing `time`.
pub fn micros_past_hour(time: SystemTime) -> i64 {
    let since_hour = time.duration_since(top_of_hour(time)).unwrap_or_default();
    since_hour.as_micros() as i64
}

fn offset_by_micros(base: SystemTime, micros: i64) -> SystemTime {
    let magnitude = Duration::from_micros(micros.unsigned_abs());
    if micros >= 0 {
        base + magnitude
    } else {
        base.checked_sub(magnitude).unwrap_or(UNIX_EPOCH)
    }
}

/// Absolute time for a decoded offset.
///
/// The first sample of an object anchors at the top of the current hour.
/// Later samples replace the sub-hour part of `previous`, adding an hour
/// when the offset went backwards.
pub fn reconstruct(previous: Option<SystemTime>, now: SystemTime, micros: i64) -> SystemTime {
    match previous {
        None => offset_by_micros(top_of_hour(now), micros),
        Some(prev) => {
            let prev_micros = micros_past_hour(prev);
            let mut time = offset_by_micros(prev, micros - prev_micros);
            if micros < prev_micros {
                time += Duration::from_secs(SECONDS_PER_HOUR);
            }
            time
        }
    }
}

/// Where an assigned timestamp came from.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampSource {
    Tag(TimeTag),
    /// Tag unusable; the receive time was used
    ReceiveTime(TimeTagError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimestampAssignment {
    pub timestamp: SystemTime,
    pub source: TimestampSource,
}

/// Assigns timestamps to samples and remembers objects whose tags failed.
#[derive(Debug, Default)]
pub struct TimeReconstructor {
    non_timestamped: BTreeSet<ObjectId>,
}

impl TimeReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp for one sample of `object`.
    ///
    /// `previous` is the latest stored timestamp of the object and `now` the
    /// receive time.
    pub fn assign(
        &mut self,
        object: &ObjectId,
        tag: &[u8],
        previous: Option<SystemTime>,
        now: SystemTime,
    ) -> TimestampAssignment {
        match decode_time_tag(tag) {
            Ok(decoded) => TimestampAssignment {
                timestamp: reconstruct(previous, now, decoded.micros_past_hour),
                source: TimestampSource::Tag(decoded),
            },
            Err(err) => {
                self.non_timestamped.insert(object.clone());
                TimestampAssignment {
                    timestamp: now,
                    source: TimestampSource::ReceiveTime(err),
                }
            }
        }
    }

    pub fn non_timestamped(&self) -> &BTreeSet<ObjectId> {
        &self.non_timestamped
    }

    pub fn clear(&mut self) {
        self.non_timestamped.clear();
    }
}
