//! Cron expression parsing for the digest schedule.
//!
//! Supports the standard 5-field format
//! (`minute hour day-of-month month day-of-week`) with `*`, single
//! values, ranges, lists, and steps. Month and day-of-week fields also
//! accept three-letter names (`JAN`, `MON`), and `7` is accepted as an
//! alias for Sunday.

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use thiserror::Error;

/// Cron expression parse error.
#[derive(Debug, Error)]
#[error("invalid cron expression: {0}")]
pub struct CronParseError(String);

/// Month names, 1-12
const MONTH_NAMES: &[(&str, u32)] = &[
    ("JAN", 1),
    ("FEB", 2),
    ("MAR", 3),
    ("APR", 4),
    ("MAY", 5),
    ("JUN", 6),
    ("JUL", 7),
    ("AUG", 8),
    ("SEP", 9),
    ("OCT", 10),
    ("NOV", 11),
    ("DEC", 12),
];

/// Day names, 0-6 with Sunday first. Plain 7 is the POSIX alias for
/// Sunday.
const DAY_NAMES: &[(&str, u32)] = &[
    ("SUN", 0),
    ("MON", 1),
    ("TUE", 2),
    ("WED", 3),
    ("THU", 4),
    ("FRI", 5),
    ("SAT", 6),
    ("7", 0),
];

/// A field in a cron expression.
#[derive(Debug, Clone)]
enum CronField {
    /// Any value (*)
    Any,
    /// Specific value
    Value(u32),
    /// Range of values (start-end)
    Range(u32, u32),
    /// List of values
    List(Vec<u32>),
    /// Step values (*/step or start-end/step)
    Step(Box<CronField>, u32),
}

impl CronField {
    fn matches(&self, value: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Value(v) => *v == value,
            Self::Range(start, end) => value >= *start && value <= *end,
            Self::List(values) => values.contains(&value),
            Self::Step(base, step) => match base.as_ref() {
                Self::Any => value % step == 0,
                Self::Range(start, end) => {
                    value >= *start && value <= *end && (value - start) % step == 0
                }
                _ => base.matches(value),
            },
        }
    }
}

/// Parsed cron expression.
#[derive(Debug, Clone)]
pub struct CronExpression {
    minute: CronField,
    hour: CronField,
    day_of_month: CronField,
    month: CronField,
    day_of_week: CronField,
}

impl CronExpression {
    /// Parse a 5-field cron expression.
    pub fn parse(expr: &str) -> Result<Self, CronParseError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronParseError(format!(
                "expected 5 fields, got {} in {expr:?}",
                fields.len()
            )));
        }

        Ok(Self {
            minute: parse_field(fields[0], 0, 59, &[])?,
            hour: parse_field(fields[1], 0, 23, &[])?,
            day_of_month: parse_field(fields[2], 1, 31, &[])?,
            month: parse_field(fields[3], 1, 12, MONTH_NAMES)?,
            day_of_week: parse_field(fields[4], 0, 6, DAY_NAMES)?,
        })
    }

    /// Whether the given wall-clock time matches this expression.
    ///
    /// The caller picks the timezone; the expression itself is
    /// timezone-agnostic.
    pub fn matches<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> bool {
        self.minute.matches(time.minute())
            && self.hour.matches(time.hour())
            && self.day_of_month.matches(time.day())
            && self.month.matches(time.month())
            && self.day_of_week.matches(time.weekday().num_days_from_sunday())
    }
}

/// Parse a single cron field.
fn parse_field(
    field: &str,
    min: u32,
    max: u32,
    names: &[(&str, u32)],
) -> Result<CronField, CronParseError> {
    // Step notation
    if let Some((base, step)) = field.split_once('/') {
        let base = parse_field(base, min, max, names)?;
        let step: u32 = step
            .parse()
            .map_err(|_| CronParseError(format!("invalid step: {step:?}")))?;
        if step == 0 {
            return Err(CronParseError("step must be positive".to_string()));
        }
        return Ok(CronField::Step(Box::new(base), step));
    }

    if field == "*" {
        return Ok(CronField::Any);
    }

    // List (MON,WED,FRI)
    if field.contains(',') {
        let values = field
            .split(',')
            .map(|atom| parse_atom(atom, min, max, names))
            .collect::<Result<Vec<u32>, _>>()?;
        return Ok(CronField::List(values));
    }

    // Range (1-5, MON-FRI)
    if let Some((start, end)) = field.split_once('-') {
        let start = parse_atom(start, min, max, names)?;
        let end = parse_atom(end, min, max, names)?;
        if start > end {
            return Err(CronParseError(format!("invalid range: {start}-{end}")));
        }
        return Ok(CronField::Range(start, end));
    }

    parse_atom(field, min, max, names).map(CronField::Value)
}

/// Parse one number or name within a field.
fn parse_atom(
    atom: &str,
    min: u32,
    max: u32,
    names: &[(&str, u32)],
) -> Result<u32, CronParseError> {
    let upper = atom.to_ascii_uppercase();
    if let Some((_, number)) = names.iter().find(|(name, _)| *name == upper) {
        return Ok(*number);
    }

    let value: u32 = atom
        .parse()
        .map_err(|_| CronParseError(format!("invalid value: {atom:?}")))?;
    if value < min || value > max {
        return Err(CronParseError(format!(
            "value {value} out of range {min}-{max}"
        )));
    }
    Ok(value)
}
