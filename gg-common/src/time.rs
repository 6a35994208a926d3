//! Timestamp utilities
//!
//! Rows store naive UTC timestamps. JSON responses render them in the
//! HTTP-date form (`Tue, 03 Jan 2017 00:00:00 GMT`) that existing game
//! clients parse.

use chrono::{NaiveDateTime, Utc};

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Current UTC time as stored in the database
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Format a stored timestamp as an HTTP date
pub fn http_date(ts: &NaiveDateTime) -> String {
    ts.format(HTTP_DATE_FORMAT).to_string()
}

/// Serde helpers for `#[serde(with = "...")]` on timestamp fields
pub mod http_date_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::http_date(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, super::HTTP_DATE_FORMAT)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_http_date_matches_rfc1123() {
        let ts = NaiveDate::from_ymd_opt(2017, 1, 3)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(http_date(&ts), "Tue, 03 Jan 2017 00:00:00 GMT");
    }

    #[test]
    fn test_now_is_recent() {
        // After 2000-01-01, before 2100-01-01
        let ts = now().and_utc().timestamp();
        assert!(ts > 946_684_800);
        assert!(ts < 4_102_444_800);
    }

    #[test]
    fn test_serde_roundtrip_keeps_seconds() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Row {
            #[serde(with = "http_date_format")]
            created: NaiveDateTime,
        }
        let ts = NaiveDate::from_ymd_opt(2020, 2, 29)
            .unwrap()
            .and_hms_opt(13, 14, 15)
            .unwrap();
        let json = serde_json::to_string(&Row { created: ts }).unwrap();
        assert_eq!(json, r#"{"created":"Sat, 29 Feb 2020 13:14:15 GMT"}"#);
        let back: Row = serde_json::from_str(&json).unwrap();
        assert_eq!(back.created, ts);
    }
}
