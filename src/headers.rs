//! Header map shared by cookie handlers and cache entries.
//!
//! [`Headers`] maps a header name to an ordered list of values and keeps one extra
//! slot for the status line (the header without a name). Header names keep the
//! casing they were inserted with; all lookups compare names ASCII
//! case-insensitively.
//!
//! A cache entry that is later turned back into an HTTP response needs the status
//! line, so responses handed to a cache should always carry it.

use http::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorKind, NetError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    status_line: Option<String>,
    fields: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map carrying the given status line.
    pub fn with_status_line(status_line: impl Into<String>) -> Self {
        Self {
            status_line: Some(status_line.into()),
            fields: Vec::new(),
        }
    }

    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }

    pub fn set_status_line(&mut self, status_line: Option<String>) {
        self.status_line = status_line;
    }

    /// Status code parsed from the status line (`HTTP/1.1 200 OK` yields 200).
    pub fn status_code(&self) -> Option<u16> {
        self.status_line
            .as_deref()?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    }

    /// Returns all values for `name`, or an empty slice.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.position(name)
            .map(|idx| self.fields[idx].1.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the first value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Appends a value to `name`, creating the entry when missing.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(idx) => self.fields[idx].1.push(value.into()),
            None => self.fields.push((name, vec![value.into()])),
        }
    }

    /// Replaces all values of `name`.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(idx) => self.fields[idx].1 = values,
            None => self.fields.push((name, values)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        let idx = self.position(name)?;
        Some(self.fields.remove(idx).1)
    }

    /// Appends every field of `other` to this map. The status line is left alone.
    pub fn merge(&mut self, other: &Headers) {
        for (name, values) in other.iter() {
            for value in values {
                self.append(name, value.clone());
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of named fields (the status line is not counted).
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.status_line.is_none() && self.fields.is_empty()
    }

    /// Builds a map from an `http::HeaderMap`. Values that are not valid UTF-8 are
    /// converted lossily.
    pub fn from_http(status_line: Option<String>, map: &http::HeaderMap) -> Self {
        let mut headers = Headers {
            status_line,
            fields: Vec::new(),
        };
        for name in map.keys() {
            let values = map
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect();
            headers.fields.push((name.as_str().to_string(), values));
        }
        headers
    }

    /// Converts the named fields into an `http::HeaderMap`. The status line has no
    /// place there and is dropped.
    pub fn to_http(&self) -> Result<http::HeaderMap> {
        let mut map = http::HeaderMap::new();
        for (name, values) in self.iter() {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                NetError::with_message(ErrorKind::Protocol, format!("invalid header name {name:?}"))
                    .with_source(e)
            })?;
            for value in values {
                let header_value = HeaderValue::from_str(value).map_err(|e| {
                    NetError::with_message(ErrorKind::Protocol, format!("invalid value for {name}"))
                        .with_source(e)
                })?;
                map.append(header_name.clone(), header_value);
            }
        }
        Ok(map)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

impl From<&http::HeaderMap> for Headers {
    fn from(map: &http::HeaderMap) -> Self {
        Headers::from_http(None, map)
    }
}
