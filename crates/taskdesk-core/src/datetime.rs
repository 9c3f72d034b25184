use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Duration,
  NaiveDate,
  Utc
};
use regex::Regex;

const STORAGE_FORMAT: &str =
  "%Y%m%dT%H%M%SZ";

fn relative_offset_re() -> &'static Regex
{
  static RE: OnceLock<Regex> =
    OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r"^\+(\d{1,4})\s*(d|day|days|w|week|weeks)$"
    )
    .unwrap_or_else(|_| {
      unreachable!(
        "relative offset pattern is \
         a literal"
      )
    })
  })
}

#[must_use]
pub fn format_date(
  dt: DateTime<Utc>
) -> String {
  dt.format("%Y-%m-%d").to_string()
}

#[must_use]
pub fn midnight(
  date: NaiveDate
) -> DateTime<Utc> {
  date
    .and_hms_opt(0, 0, 0)
    .map(|naive| naive.and_utc())
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Parses a due-date expression relative
/// to `now`. Dates resolve to midnight
/// UTC.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  now: DateTime<Utc>
) -> anyhow::Result<DateTime<Utc>> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let today = midnight(now.date_naive());

  match lower.as_str() {
    | "" => {
      return Err(anyhow!(
        "date expression cannot be \
         empty"
      ));
    }
    | "now" => return Ok(now),
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(
        today + Duration::days(1)
      );
    }
    | "yesterday" => {
      return Ok(
        today - Duration::days(1)
      );
    }
    | _ => {}
  }

  if let Some(caps) =
    relative_offset_re().captures(&lower)
  {
    let amount: i64 = caps[1]
      .parse()
      .context("invalid offset amount")?;
    let days = match &caps[2] {
      | "w" | "week" | "weeks" => {
        amount * 7
      }
      | _ => amount
    };
    return Ok(
      today + Duration::days(days)
    );
  }

  let date = NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .with_context(|| {
    format!(
      "unrecognized date expression: \
       {token}"
    )
  })?;
  Ok(midnight(date))
}

pub mod compact_date_serde {
  use chrono::{
    DateTime,
    NaiveDateTime,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  use super::STORAGE_FORMAT;

  pub fn serialize<S>(
    dt: &DateTime<Utc>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &dt
        .format(STORAGE_FORMAT)
        .to_string()
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    NaiveDateTime::parse_from_str(
      &raw,
      STORAGE_FORMAT
    )
    .map(|ndt| ndt.and_utc())
    .map_err(serde::de::Error::custom)
  }

  pub mod option {
    use chrono::{
      DateTime,
      NaiveDateTime,
      Utc
    };
    use serde::{
      Deserialize,
      Deserializer,
      Serializer
    };

    use super::super::STORAGE_FORMAT;

    pub fn serialize<S>(
      dt: &Option<DateTime<Utc>>,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match dt {
        | Some(value) => {
          super::serialize(
            value, serializer
          )
        }
        | None => {
          serializer.serialize_none()
        }
      }
    }

    pub fn deserialize<'de, D>(
      deserializer: D
    ) -> Result<
      Option<DateTime<Utc>>,
      D::Error
    >
    where
      D: Deserializer<'de>
    {
      let opt =
        Option::<String>::deserialize(
          deserializer
        )?;
      opt
        .map(|raw| {
          NaiveDateTime::parse_from_str(
            &raw,
            STORAGE_FORMAT
          )
          .map(|ndt| ndt.and_utc())
          .map_err(
            serde::de::Error::custom
          )
        })
        .transpose()
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    TimeZone,
    Utc
  };

  use super::{
    format_date,
    parse_date_expr
  };

  #[test]
  fn keywords_resolve_against_now() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 10, 19, 15, 30, 0
      )
      .unwrap();
    let today = Utc
      .with_ymd_and_hms(
        2026, 10, 19, 0, 0, 0
      )
      .unwrap();

    assert_eq!(
      parse_date_expr("now", now)
        .unwrap(),
      now
    );
    assert_eq!(
      parse_date_expr("Today", now)
        .unwrap(),
      today
    );
    assert_eq!(
      parse_date_expr("tomorrow", now)
        .unwrap(),
      today + Duration::days(1)
    );
    assert_eq!(
      parse_date_expr("yesterday", now)
        .unwrap(),
      today - Duration::days(1)
    );
  }

  #[test]
  fn relative_offsets_and_iso_dates() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 10, 19, 15, 30, 0
      )
      .unwrap();

    let three_days =
      parse_date_expr("+3d", now)
        .unwrap();
    assert_eq!(
      format_date(three_days),
      "2026-10-22"
    );

    let two_weeks =
      parse_date_expr("+2 weeks", now)
        .unwrap();
    assert_eq!(
      format_date(two_weeks),
      "2026-11-02"
    );

    let fixed =
      parse_date_expr("2026-12-31", now)
        .unwrap();
    assert_eq!(
      format_date(fixed),
      "2026-12-31"
    );
  }

  #[test]
  fn garbage_is_rejected() {
    let now = Utc::now();
    assert!(
      parse_date_expr("someday", now)
        .is_err()
    );
    assert!(
      parse_date_expr("  ", now)
        .is_err()
    );
  }
}
