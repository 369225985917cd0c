//! Query-string builder for collection filters.

use std::fmt::Display;

/// Ordered list of query parameters. Empty values are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key=value`, skipping empty values.
    pub fn param(mut self, key: &str, value: impl Display) -> Self {
        let value = value.to_string();
        if !value.is_empty() {
            self.pairs.push((key.to_string(), value));
        }
        self
    }

    /// Add `key=value` only when `value` is present.
    pub fn opt<V: Display>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    /// Add `key=true` only when `flag` is set.
    pub fn flag(self, key: &str, flag: bool) -> Self {
        if flag {
            self.param(key, "true")
        } else {
            self
        }
    }

    /// Add one `key=value` pair per item (`idrol=1&idrol=2`).
    pub fn repeated<I, V>(self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        values.into_iter().fold(self, |q, v| q.param(key, v))
    }

    /// Merge raw `key=value` strings (as typed on the command line).
    pub fn extend_raw<'a>(self, raw: impl IntoIterator<Item = &'a str>) -> Self {
        raw.into_iter().fold(self, |q, pair| match pair.split_once('=') {
            Some((k, v)) => q.param(k.trim(), v.trim()),
            None => q,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encoded query without the leading `?`.
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// `path` with the encoded query appended, or `path` unchanged when empty.
    pub fn apply(&self, path: &str) -> String {
        if self.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, self.encode())
        }
    }
}
