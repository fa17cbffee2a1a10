use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

// Formats the CMS has been seen to emit besides RFC 3339.
const CMS_DATETIME_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%d %H:%M:%S %z",
  "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parses a publication timestamp. `None` is the "invalid date" value:
/// callers render it as such instead of failing.
///
/// Timestamps without an offset are taken as UTC.
pub fn parse_published_at(
  date_str: impl AsRef<str>,
) -> Option<DateTime<FixedOffset>> {
  let date_str = date_str.as_ref().trim();
  if date_str.is_empty() {
    return None;
  }

  if let Ok(parsed) = DateTime::parse_from_rfc3339(date_str) {
    return Some(parsed);
  }

  if let Ok(parsed) = DateTime::parse_from_rfc2822(date_str) {
    return Some(parsed);
  }

  for fmt in CMS_DATETIME_FORMATS {
    if let Ok(parsed) = DateTime::parse_from_str(date_str, fmt) {
      return Some(parsed);
    }

    if let Ok(parsed) = NaiveDateTime::parse_from_str(date_str, fmt) {
      return Some(parsed.and_utc().fixed_offset());
    }
  }

  NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
    .ok()
    .and_then(|date| date.and_hms_opt(0, 0, 0))
    .map(|date| date.and_utc().fixed_offset())
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_parse_cms_formats() {
    let rfc = parse_published_at("2023-10-05T08:30:00+07:00").unwrap();
    assert_eq!(rfc.to_rfc3339(), "2023-10-05T08:30:00+07:00");

    let plain = parse_published_at("2023-10-05 08:30:00").unwrap();
    assert_eq!(plain.to_rfc3339(), "2023-10-05T08:30:00+00:00");

    let micros = parse_published_at("2023-10-05T08:30:00.000000").unwrap();
    assert_eq!(micros.to_rfc3339(), "2023-10-05T08:30:00+00:00");

    let date_only = parse_published_at("2023-10-05").unwrap();
    assert_eq!(date_only.to_rfc3339(), "2023-10-05T00:00:00+00:00");
  }

  #[test]
  fn test_unparseable_is_none() {
    assert_eq!(parse_published_at(""), None);
    assert_eq!(parse_published_at("   "), None);
    assert_eq!(parse_published_at("yesterday-ish"), None);
  }
}
