//! Zero-copy serialisable views of bulk action and source lines.

use std::collections::BTreeMap;
use std::thread::ThreadId;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::config::Property;
use crate::level::Level;
use crate::log_event::LogEvent;

/// Field names written by [`SourceDocument`]; key/values and properties may
/// not shadow them.
pub(super) const RESERVED_FIELDS: [&str; 7] = [
    "@timestamp",
    "level",
    "logger",
    "message",
    "thread",
    "module",
    "line",
];

/// `{"index":{"_index":...,"_type":...}}`
#[derive(Serialize)]
pub(super) struct BulkAction<'a> {
    pub(super) index: ActionTarget<'a>,
}

#[derive(Serialize)]
pub(super) struct ActionTarget<'a> {
    #[serde(rename = "_index")]
    pub(super) index: &'a str,
    #[serde(rename = "_type", skip_serializing_if = "Option::is_none")]
    pub(super) doc_type: Option<&'a str>,
}

/// Source line borrowing from the event it describes.
pub(super) struct SourceDocument<'a> {
    pub(super) timestamp: &'a str,
    pub(super) level: Level,
    pub(super) logger: &'a str,
    pub(super) message: &'a str,
    pub(super) thread_id: ThreadId,
    pub(super) thread_name: Option<&'a str>,
    pub(super) module: &'a str,
    pub(super) line: u32,
    pub(super) properties: &'a [Property],
    pub(super) key_values: &'a BTreeMap<String, String>,
}

impl<'a> SourceDocument<'a> {
    pub(super) fn new(
        event: &'a LogEvent,
        timestamp: &'a str,
        message: &'a str,
        properties: &'a [Property],
    ) -> Self {
        let metadata = &event.metadata;
        Self {
            timestamp,
            level: event.level,
            logger: &event.logger,
            message,
            thread_id: metadata.thread_id,
            thread_name: metadata.thread_name.as_deref(),
            module: &metadata.module_path,
            line: metadata.line_number,
            properties,
            key_values: &metadata.key_values,
        }
    }

    fn visible_properties(&self) -> impl Iterator<Item = &'a Property> {
        self.properties
            .iter()
            .filter(|p| p.allow_empty || !p.value.is_empty())
            .filter(|p| !RESERVED_FIELDS.contains(&p.name.as_str()))
    }

    fn visible_key_values(&self) -> impl Iterator<Item = (&'a String, &'a String)> {
        let properties = self.properties;
        self.key_values.iter().filter(move |(k, _)| {
            !RESERVED_FIELDS.contains(&k.as_str()) && !properties.iter().any(|p| &p.name == *k)
        })
    }
}

impl Serialize for SourceDocument<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("@timestamp", self.timestamp)?;
        map.serialize_entry("level", &self.level)?;
        map.serialize_entry("logger", self.logger)?;
        map.serialize_entry("message", self.message)?;
        match self.thread_name {
            Some(name) => map.serialize_entry("thread", name)?,
            None => map.serialize_entry("thread", &format_args!("{:?}", self.thread_id))?,
        }
        if !self.module.is_empty() {
            map.serialize_entry("module", self.module)?;
        }
        if self.line > 0 {
            map.serialize_entry("line", &self.line)?;
        }
        for property in self.visible_properties() {
            map.serialize_entry(&property.name, &property.value)?;
        }
        for (k, v) in self.visible_key_values() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
