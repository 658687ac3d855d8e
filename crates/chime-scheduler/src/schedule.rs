//! Cron spec parsing.
//!
//! Accepted syntax:
//! ```text
//! ┌───────────── minute (0 - 59)
//! │ ┌───────────── hour (0 - 23)
//! │ │ ┌───────────── day of month (1 - 31)
//! │ │ │ ┌───────────── month (1 - 12 or JAN-DEC)
//! │ │ │ │ ┌───────────── day of week (0 - 7 or SUN-SAT, Sunday = 0 or 7)
//! │ │ │ │ │
//! * * * * *
//! ```
//! plus the descriptors `@yearly` `@annually` `@monthly` `@weekly` `@daily`
//! `@midnight` `@hourly` and `@every <duration>` (e.g. `@every 1h30m`).
//!
//! Validation and the timer share [`CronSchedule::parse`], so an accepted
//! spec is always schedulable.

use chime_core::error::{ChimeError, Result, ValidationKind};
use chrono::{DateTime, Duration, Utc};
use ::cron::Schedule;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub enum CronSchedule {
    Calendar(Box<Schedule>),
    Every(Duration),
}

fn invalid(spec: &str, reason: impl std::fmt::Display) -> ChimeError {
    ChimeError::validation(
        ValidationKind::CronSpec,
        format!("invalid cron spec '{spec}': {reason}"),
    )
}

impl CronSchedule {
    pub fn parse(spec: &str) -> Result<Self> {
        let trimmed = spec.trim();
        if let Some(rest) = trimmed.strip_prefix("@every") {
            let every = parse_duration(rest.trim()).ok_or_else(|| invalid(spec, "bad @every duration"))?;
            return Ok(Self::Every(every));
        }

        let expression = match trimmed {
            "@yearly" | "@annually" => "0 0 0 1 1 *".to_string(),
            "@monthly" => "0 0 0 1 * *".to_string(),
            "@weekly" => "0 0 0 * * SUN".to_string(),
            "@daily" | "@midnight" => "0 0 0 * * *".to_string(),
            "@hourly" => "0 0 * * * *".to_string(),
            other if other.starts_with('@') => return Err(invalid(spec, "unknown descriptor")),
            other => {
                let fields: Vec<&str> = other.split_whitespace().collect();
                if fields.len() != 5 {
                    return Err(invalid(spec, format!("need 5 fields, got {}", fields.len())));
                }
                format!(
                    "0 {} {} {} {} {}",
                    fields[0],
                    fields[1],
                    fields[2],
                    fields[3],
                    day_of_week_names(fields[4]).map_err(|reason| invalid(spec, reason))?
                )
            }
        };
        let schedule = Schedule::from_str(&expression).map_err(|e| invalid(spec, e))?;
        Ok(Self::Calendar(Box::new(schedule)))
    }

    /// First firing strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Calendar(schedule) => schedule.after(&after).next(),
            Self::Every(every) => after.checked_add_signed(*every),
        }
    }
}

pub fn validate_cron(spec: &str) -> Result<()> {
    CronSchedule::parse(spec).map(|_| ())
}

/// Numeric days of week count from Sunday = 0 in classic cron. Rewrite them
/// as names so they mean the same thing to the calendar parser. A range
/// ending in 7 becomes `..-SAT,SUN`, since the calendar parser does not wrap.
fn day_of_week_names(field: &str) -> std::result::Result<String, String> {
    const NAMES: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];
    let name = |part: &str| match part.parse::<usize>() {
        Ok(n) if n < NAMES.len() => NAMES[n].to_string(),
        _ => part.to_string(),
    };
    let mut items = Vec::new();
    for item in field.split(',') {
        let (base, step) = match item.split_once('/') {
            Some((base, step)) => (base, Some(step)),
            None => (item, None),
        };
        let base = match base.split_once('-') {
            _ if base == "*" || base == "?" => base.to_string(),
            Some((start, "7")) => {
                if step.is_some() {
                    return Err(format!(
                        "day-of-week range '{base}' ends in 7 and cannot take a step, use 0 for Sunday"
                    ));
                }
                match start {
                    "0" | "SUN" => "SUN-SAT".to_string(),
                    "7" => "SUN".to_string(),
                    start => format!("{}-SAT,SUN", name(start)),
                }
            }
            Some((start, end)) => format!("{}-{}", name(start), name(end)),
            None => name(base),
        };
        items.push(match step {
            Some(step) => format!("{base}/{step}"),
            None => base,
        });
    }
    Ok(items.join(","))
}

/// `90s`, `5m`, `1h30m`, `2h`. Must be positive.
fn parse_duration(text: &str) -> Option<Duration> {
    if text.is_empty() {
        return None;
    }
    let mut total = Duration::zero();
    let mut digits = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let n: i64 = digits.parse().ok()?;
        digits.clear();
        let part = match c {
            'h' => Duration::try_hours(n)?,
            'm' => Duration::try_minutes(n)?,
            's' => Duration::try_seconds(n)?,
            _ => return None,
        };
        total = total.checked_add(&part)?;
    }
    if !digits.is_empty() || total <= Duration::zero() {
        return None;
    }
    Some(total)
}
