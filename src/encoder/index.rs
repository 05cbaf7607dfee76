//! Index names with embedded `%date{...}` placeholders.

use std::fmt::Write;

use chrono::{
    DateTime, Utc,
    format::{Item, StrftimeItems},
};

use super::EncodingError;

const DATE_OPEN: &str = "%date{";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Date(String),
}

/// Parsed index name.
///
/// `logs-%date{%Y.%m.%d}` expands to `logs-2024.05.17` for an event stamped
/// on that UTC day. Names without placeholders render verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexPattern {
    segments: Vec<Segment>,
}

impl IndexPattern {
    pub fn parse(pattern: &str) -> Result<Self, EncodingError> {
        let mut segments = Vec::new();
        let mut rest = pattern;
        while let Some(start) = rest.find(DATE_OPEN) {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_owned()));
            }
            let after = &rest[start + DATE_OPEN.len()..];
            let end = after
                .find('}')
                .ok_or_else(|| EncodingError::IndexPattern(format!("unclosed %date in {pattern}")))?;
            let format = &after[..end];
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(EncodingError::IndexPattern(format!(
                    "bad date format {format:?} in {pattern}"
                )));
            }
            segments.push(Segment::Date(format.to_owned()));
            rest = &after[end + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_owned()));
        }
        Ok(Self { segments })
    }

    pub fn render(&self, timestamp: &DateTime<Utc>) -> Result<String, EncodingError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Date(format) => write!(out, "{}", timestamp.format(format))
                    .map_err(|_| EncodingError::IndexPattern(format.clone()))?,
            }
        }
        Ok(out)
    }
}
