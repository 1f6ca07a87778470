//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are written in one canonical text format but read back from
//! any of the formats earlier writers of the same file have used. Batches of
//! ids, attributes and edges are bound as a single JSON array parameter and
//! expanded in SQL with `json_each`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use libreta_core::{
  content::ContentHash,
  edge::Edge,
  node::{Node, NodeAttribute, NodeId},
};
use serde::Serialize;

use crate::{Error, Result};

// ─── Timestamps ──────────────────────────────────────────────────────────────

/// Canonical on-disk format, e.g. `2024-03-09 14:05:09.123456789+00:00`.
/// The fraction is omitted when zero.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

/// Formats carrying an explicit UTC offset.
const ZONED_FORMATS: &[&str] = &[TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S%.f%:z"];

/// Formats without an offset; interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M",
  "%Y-%m-%dT%H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_ts(dt: DateTime<Utc>) -> String {
  dt.format(TIMESTAMP_FORMAT).to_string()
}

pub fn decode_ts(s: &str) -> Result<DateTime<Utc>> {
  let s = s.trim();
  let s = s.strip_suffix('Z').unwrap_or(s);

  for format in ZONED_FORMATS {
    if let Ok(dt) = DateTime::parse_from_str(s, format) {
      return Ok(dt.with_timezone(&Utc));
    }
  }
  for format in NAIVE_FORMATS {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
      return Ok(dt.and_utc());
    }
  }
  if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
    return Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc());
  }

  Err(Error::DateParse(format!("unrecognised timestamp: {s:?}")))
}

pub fn decode_opt_ts(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_ts).transpose()
}

// ─── JSON batches ────────────────────────────────────────────────────────────

/// Encode a batch for a single `json_each(?)` parameter.
pub fn encode_batch<T: Serialize + ?Sized>(items: &T) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `node` row joined with its content length.
pub struct RawNode {
  pub id:               String,
  pub name:             String,
  pub content_hash:     String,
  pub content_mimetype: String,
  pub content_length:   i64,
  pub created_at:       String,
  pub updated_at:       String,
  pub deleted_at:       Option<String>,
}

impl RawNode {
  pub fn into_node(self, attributes: Vec<NodeAttribute>) -> Result<Node> {
    Ok(Node {
      id: NodeId::new(self.id),
      name: self.name,
      content_hash: ContentHash::new(self.content_hash),
      content_mimetype: self.content_mimetype,
      content_length: u64::try_from(self.content_length).unwrap_or_default(),
      created_at: decode_ts(&self.created_at)?,
      updated_at: decode_ts(&self.updated_at)?,
      deleted_at: decode_opt_ts(self.deleted_at.as_deref())?,
      attributes,
    })
  }
}

/// Raw values read from a `node_attribute` row.
pub struct RawAttribute {
  pub node_id:    String,
  pub key:        String,
  pub value:      String,
  pub created_at: String,
}

impl RawAttribute {
  pub fn into_attribute(self) -> Result<(NodeId, NodeAttribute)> {
    let attribute = NodeAttribute {
      key:        self.key,
      value:      self.value,
      created_at: decode_ts(&self.created_at)?,
    };
    Ok((NodeId::new(self.node_id), attribute))
  }
}

/// Raw values read from an `edge` row.
pub struct RawEdge {
  pub src_id:     String,
  pub dst_id:     String,
  pub relation:   String,
  pub created_at: String,
}

impl RawEdge {
  pub fn into_edge(self) -> Result<Edge> {
    Ok(Edge {
      src_id:     NodeId::new(self.src_id),
      dst_id:     NodeId::new(self.dst_id),
      relation:   self.relation,
      created_at: decode_ts(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Timelike};

  use super::*;

  #[test]
  fn canonical_format_round_trips_nanoseconds() {
    let dt = Utc
      .with_ymd_and_hms(2024, 3, 9, 14, 5, 9)
      .unwrap()
      .with_nanosecond(123_456_789)
      .unwrap();
    let encoded = encode_ts(dt);
    assert_eq!(encoded, "2024-03-09 14:05:09.123456789+00:00");
    assert_eq!(decode_ts(&encoded).unwrap(), dt);
  }

  #[test]
  fn whole_seconds_omit_the_fraction() {
    let dt = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 9).unwrap();
    assert_eq!(encode_ts(dt), "2024-03-09 14:05:09+00:00");
  }

  #[test]
  fn historical_formats_are_accepted() {
    let expected = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 9).unwrap();
    for s in [
      "2024-03-09 14:05:09+00:00",
      "2024-03-09T14:05:09+00:00",
      "2024-03-09 16:05:09+02:00",
      "2024-03-09 14:05:09",
      "2024-03-09T14:05:09",
      "2024-03-09T14:05:09Z",
      "2024-03-09 14:05:09Z",
    ] {
      assert_eq!(decode_ts(s).unwrap(), expected, "{s}");
    }
  }

  #[test]
  fn coarse_formats_are_accepted() {
    assert_eq!(
      decode_ts("2024-03-09 14:05").unwrap(),
      Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()
    );
    assert_eq!(
      decode_ts("2024-03-09T14:05Z").unwrap(),
      Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()
    );
    assert_eq!(
      decode_ts("2024-03-09").unwrap(),
      Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap()
    );
  }

  #[test]
  fn garbage_is_rejected() {
    assert!(matches!(decode_ts("yesterday"), Err(Error::DateParse(_))));
    assert!(matches!(decode_ts(""), Err(Error::DateParse(_))));
  }

  #[test]
  fn missing_optional_timestamp_is_none() {
    assert_eq!(decode_opt_ts(None).unwrap(), None);
  }
}
