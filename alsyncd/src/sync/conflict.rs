use std::sync::OnceLock;

use regex::Regex;
use time::{Date, Duration, Month, PrimitiveDateTime, Time};

/// What to do about a source file whose destination twin already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Skip,
    SkipAndRemoveSource,
    Overwrite,
}

/// Size and modification stamp of one side of a conflict.
#[derive(Debug, Clone, Copy)]
pub struct FileFacts<'a> {
    pub size: u64,
    pub modified: Option<&'a str>,
}

/// Size/mtime heuristic: equal sizes mean "same content"; differing sizes
/// defer to the normalized modification stamps, and only a strictly newer
/// destination survives. No checksums, so equal-size/different-content
/// files are never detected.
pub fn resolve(
    source: FileFacts<'_>,
    destination: FileFacts<'_>,
    move_source: bool,
    utc_assume_offset_hours: i64,
) -> Verdict {
    let keep = if move_source {
        Verdict::SkipAndRemoveSource
    } else {
        Verdict::Skip
    };

    if source.size == destination.size {
        return keep;
    }

    let source_stamp = source
        .modified
        .and_then(|value| normalize_modified(value, utc_assume_offset_hours));
    let destination_stamp = destination
        .modified
        .and_then(|value| normalize_modified(value, utc_assume_offset_hours));

    match (source_stamp, destination_stamp) {
        (Some(src), Some(dst)) if dst > src => keep,
        _ => Verdict::Overwrite,
    }
}

fn modified_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})(\.\d+)?([+-]\d{2}:\d{2}|Z)?")
            .expect("hard-coded timestamp pattern")
    })
}

/// Parses an ISO-8601-like stamp and shifts it into the reference frame the
/// service's own listings use: a literal `Z` designator gets the assumed
/// deployment offset added (compatibility constant, 8 hours by default), an
/// explicit `+HH:MM`/`-HH:MM` offset is subtracted, and a bare wall-clock
/// value is taken as-is. Unparseable input yields `None`.
pub fn normalize_modified(value: &str, utc_assume_offset_hours: i64) -> Option<PrimitiveDateTime> {
    let caps = modified_pattern().captures(value)?;

    let year: i32 = caps[1].parse().ok()?;
    let month = Month::try_from(caps[2].parse::<u8>().ok()?).ok()?;
    let day: u8 = caps[3].parse().ok()?;
    let hour: u8 = caps[4].parse().ok()?;
    let minute: u8 = caps[5].parse().ok()?;
    let second: u8 = caps[6].parse().ok()?;
    let nanos = caps
        .get(7)
        .map(|frac| frac_nanos(&frac.as_str()[1..]))
        .unwrap_or(0);

    let date = Date::from_calendar_date(year, month, day).ok()?;
    let time = Time::from_hms_nano(hour, minute, second, nanos).ok()?;
    let stamp = PrimitiveDateTime::new(date, time);

    match caps.get(8).map(|zone| zone.as_str()) {
        Some("Z") => stamp.checked_add(Duration::hours(utc_assume_offset_hours)),
        Some(offset) => {
            let sign: i64 = if offset.starts_with('-') { -1 } else { 1 };
            let hours: i64 = offset[1..3].parse().ok()?;
            let minutes: i64 = offset[4..6].parse().ok()?;
            stamp.checked_sub(Duration::minutes(sign * (hours * 60 + minutes)))
        }
        None => Some(stamp),
    }
}

fn frac_nanos(digits: &str) -> u32 {
    let digits: String = digits.chars().filter(|c| c.is_ascii_digit()).take(9).collect();
    let padded = format!("{digits:0<9}");
    padded.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn facts(size: u64, modified: Option<&str>) -> FileFacts<'_> {
        FileFacts { size, modified }
    }

    #[test]
    fn equal_sizes_skip() {
        let verdict = resolve(facts(100, None), facts(100, None), false, 8);
        assert_eq!(verdict, Verdict::Skip);
    }

    #[test]
    fn equal_sizes_drain_source_in_move_mode() {
        let verdict = resolve(facts(100, None), facts(100, None), true, 8);
        assert_eq!(verdict, Verdict::SkipAndRemoveSource);
    }

    #[test]
    fn newer_destination_is_protected() {
        let verdict = resolve(
            facts(100, Some("2024-01-01T00:00:00Z")),
            facts(80, Some("2024-01-02T00:00:00Z")),
            false,
            8,
        );
        assert_eq!(verdict, Verdict::Skip);
    }

    #[test]
    fn newer_destination_still_drains_source_in_move_mode() {
        let verdict = resolve(
            facts(100, Some("2024-01-01T00:00:00Z")),
            facts(80, Some("2024-01-02T00:00:00Z")),
            true,
            8,
        );
        assert_eq!(verdict, Verdict::SkipAndRemoveSource);
    }

    #[test]
    fn older_destination_is_overwritten() {
        let verdict = resolve(
            facts(100, Some("2024-06-01T12:00:00Z")),
            facts(80, Some("2024-01-01T00:00:00Z")),
            false,
            8,
        );
        assert_eq!(verdict, Verdict::Overwrite);
    }

    #[test]
    fn unparseable_stamps_fall_through_to_overwrite() {
        let verdict = resolve(
            facts(100, Some("not-a-date")),
            facts(80, Some("2024-01-01T00:00:00Z")),
            false,
            8,
        );
        assert_eq!(verdict, Verdict::Overwrite);

        let verdict = resolve(facts(100, None), facts(80, None), true, 8);
        assert_eq!(verdict, Verdict::Overwrite);
    }

    #[test]
    fn utc_designator_adds_the_assumed_offset() {
        assert_eq!(
            normalize_modified("2024-01-01T00:00:00Z", 8),
            Some(datetime!(2024-01-01 08:00:00))
        );
    }

    #[test]
    fn explicit_offset_is_subtracted() {
        assert_eq!(
            normalize_modified("2024-01-01T00:00:00+02:00", 8),
            Some(datetime!(2023-12-31 22:00:00))
        );
        assert_eq!(
            normalize_modified("2024-01-01T00:00:00-05:30", 8),
            Some(datetime!(2024-01-01 05:30:00))
        );
    }

    #[test]
    fn bare_wall_clock_is_taken_as_is() {
        assert_eq!(
            normalize_modified("2024-01-01T10:20:30", 8),
            Some(datetime!(2024-01-01 10:20:30))
        );
    }

    #[test]
    fn fractional_seconds_are_kept() {
        assert_eq!(
            normalize_modified("2024-01-01T00:00:00.5Z", 8),
            Some(datetime!(2024-01-01 08:00:00.5))
        );
        assert_eq!(
            normalize_modified("2024-01-01T00:00:00.123456789Z", 0),
            Some(datetime!(2024-01-01 00:00:00.123456789))
        );
    }

    #[test]
    fn configurable_offset_replaces_the_default() {
        assert_eq!(
            normalize_modified("2024-01-01T00:00:00Z", 0),
            Some(datetime!(2024-01-01 00:00:00))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(normalize_modified("yesterday", 8), None);
        assert_eq!(normalize_modified("2024-13-01T00:00:00Z", 8), None);
    }
}
