//! Conversions between document values and the text stored in SQLite.
//!
//! Timestamps are RFC 3339 strings; document bodies are compact JSON objects.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn encode_data(data: &Value) -> Result<String> { Ok(serde_json::to_string(data)?) }

pub fn decode_data(raw: &str) -> Result<Value> { Ok(serde_json::from_str(raw)?) }

/// Merge `fields` over the top level of the stored object `raw`.
pub fn merge_fields(path: &str, raw: &str, fields: Map<String, Value>) -> Result<String> {
  let mut data = decode_data(raw)?;
  let Value::Object(existing) = &mut data else {
    return Err(Error::NotAnObject(path.to_owned()));
  };
  existing.extend(fields);
  encode_data(&data)
}

/// Carry a crate error out of a `tokio_rusqlite` closure.
pub fn in_call(e: Error) -> tokio_rusqlite::Error {
  match e {
    Error::Database(e) => e,
    other => tokio_rusqlite::Error::Other(Box::new(other)),
  }
}
