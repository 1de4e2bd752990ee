use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

use crate::error::ScheduleError;

pub const TASK_DATE_FORMAT: &str =
  "%Y-%m-%d";
pub const TASK_TIME_FORMAT: &str =
  "%H:%M";

/// Calendar date of `dt` in its own
/// zone. The instant is never shifted to
/// UTC first, so 00:30 in Seoul stays on
/// the Seoul day.
#[must_use]
pub fn to_local_date_string<
  Z: TimeZone
>(
  dt: &DateTime<Z>
) -> String {
  format_task_date(dt.date_naive())
}

#[must_use]
pub fn to_local_time_string<
  Z: TimeZone
>(
  dt: &DateTime<Z>
) -> String {
  format_task_time(dt.time())
}

/// Compares local year, month and day.
/// A `DateTime` is read on its own zone's
/// calendar.
#[must_use]
pub fn same_calendar_day<
  A: Datelike,
  B: Datelike
>(
  a: &A,
  b: &B
) -> bool {
  a.year() == b.year()
    && a.month() == b.month()
    && a.day() == b.day()
}

#[must_use]
pub fn format_task_date(
  date: NaiveDate
) -> String {
  date
    .format(TASK_DATE_FORMAT)
    .to_string()
}

#[must_use]
pub fn format_task_time(
  time: NaiveTime
) -> String {
  time
    .format(TASK_TIME_FORMAT)
    .to_string()
}

/// Parses a stored `YYYY-MM-DD` value.
/// Blank and malformed input both yield
/// `None`; callers that need to tell
/// them apart check for blank first.
pub fn parse_task_date(
  raw: &str
) -> Option<NaiveDate> {
  let token = raw.trim();
  if token.is_empty() {
    return None;
  }
  let date_re = date_regex()?;
  if !date_re.is_match(token) {
    return None;
  }
  NaiveDate::parse_from_str(
    token,
    TASK_DATE_FORMAT
  )
  .ok()
}

/// Parses a stored 24-hour `HH:MM`
/// value (single-digit hours accepted).
pub fn parse_task_time(
  raw: &str
) -> Option<NaiveTime> {
  let (hour, minute) =
    parse_clock_time(raw)?;
  NaiveTime::from_hms_opt(
    hour, minute, 0
  )
}

pub fn require_task_date(
  field: &'static str,
  raw: &str
) -> Result<NaiveDate, ScheduleError> {
  parse_task_date(raw).ok_or_else(|| {
    ScheduleError::UnparseableDate {
      field,
      value: raw.to_string()
    }
  })
}

pub fn require_task_time(
  field: &'static str,
  raw: &str
) -> Result<NaiveTime, ScheduleError> {
  parse_task_time(raw).ok_or_else(|| {
    ScheduleError::UnparseableDate {
      field,
      value: raw.to_string()
    }
  })
}

fn date_regex() -> Option<&'static Regex>
{
  static DATE_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  DATE_RE
    .get_or_init(|| {
      Regex::new(
        r"^\d{4}-\d{2}-\d{2}$"
      )
      .ok()
    })
    .as_ref()
}

fn clock_regex()
-> Option<&'static Regex> {
  static CLOCK_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  CLOCK_RE
    .get_or_init(|| {
      Regex::new(
        r"^(?P<hour>\d{1,2}):(?P<minute>\d{2})$"
      )
      .ok()
    })
    .as_ref()
}

fn parse_clock_time(
  token: &str
) -> Option<(u32, u32)> {
  let captures = clock_regex()?
    .captures(token.trim())?;

  let hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  if hour > 23 || minute > 59 {
    return None;
  }

  Some((hour, minute))
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  Duration::try_days(days)
    .and_then(|delta| {
      date.checked_add_signed(delta)
    })
    .unwrap_or(date)
}

/// Whole days from `start` to `end`
/// (negative when `end` is earlier).
#[must_use]
pub fn days_between(
  start: NaiveDate,
  end: NaiveDate
) -> i64 {
  end
    .signed_duration_since(start)
    .num_days()
}

#[must_use]
pub fn shift_years(
  date: NaiveDate,
  years: i32
) -> NaiveDate {
  let year =
    date.year().saturating_add(years);
  let month = date.month();
  let day = date
    .day()
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or(date)
}

#[must_use]
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let mut year = date.year();
  let mut month =
    date.month() as i32 + months;

  while month < 1 {
    month += 12;
    year = year.saturating_sub(1);
  }
  while month > 12 {
    month -= 12;
    year = year.saturating_add(1);
  }

  let month = month as u32;
  let day = date
    .day()
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or(date)
}

fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
  .day()
}

fn resolve_local(
  tz: Tz,
  local_naive: NaiveDateTime,
  context: &str
) -> anyhow::Result<DateTime<Tz>> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt)
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        context,
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      Ok(if first <= second {
        first
      } else {
        second
      })
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime does not \
         exist in {tz}: {context}"
      ))
    }
  }
}

fn local_midnight(
  tz: Tz,
  date: NaiveDate,
  context: &str
) -> anyhow::Result<DateTime<Tz>> {
  let midnight = date
    .and_hms_opt(0, 0, 0)
    .ok_or_else(|| {
      anyhow!(
        "failed to construct \
         midnight for {date}"
      )
    })?;
  resolve_local(tz, midnight, context)
}

/// Resolves a user-typed date
/// expression to an instant in the zone
/// of `now`.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  now: DateTime<Tz>
) -> anyhow::Result<DateTime<Tz>> {
  let tz = now.timezone();
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "now" => return Ok(now),
    | "today" => {
      return local_midnight(
        tz,
        now.date_naive(),
        "today"
      );
    }
    | "tomorrow" => {
      return local_midnight(
        tz,
        add_days(now.date_naive(), 1),
        "tomorrow"
      );
    }
    | "yesterday" => {
      return local_midnight(
        tz,
        add_days(now.date_naive(), -1),
        "yesterday"
      );
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    let target_date = next_weekday_date(
      now.date_naive(),
      target_weekday
    );
    return local_midnight(
      tz,
      target_date,
      "weekday-name"
    );
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dhm])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(token)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let duration = match unit {
      | "d" => Duration::try_days(num),
      | "h" => Duration::try_hours(num),
      | "m" => Duration::try_minutes(num),
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };

    let shifted =
      duration.and_then(|duration| {
        if sign == "-" {
          now.checked_sub_signed(duration)
        } else {
          now.checked_add_signed(duration)
        }
      });
    return shifted.ok_or_else(|| {
      anyhow!(
        "relative offset out of range: \
         {input}"
      )
    });
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.with_timezone(&tz));
  }

  if let Some(date) =
    parse_task_date(token)
  {
    return local_midnight(
      tz, date, "date"
    );
  }

  for fmt in
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
  {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return resolve_local(
        tz, ndt, fmt
      );
    }
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     now/today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/+Nh/+Nm, RFC3339, YYYY-MM-DD, \
     YYYY-MM-DDTHH:MM, YYYY-MM-DD HH:MM"
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(from, delta)
}
