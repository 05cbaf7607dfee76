//! Default `_bulk` encoder for [`LogEvent`] values.

use chrono::{DateTime, SecondsFormat, Utc};

use super::document::{ActionTarget, BulkAction, SourceDocument};
use super::index::IndexPattern;
use super::{DocumentEncoder, EncodingError};
use crate::config::{Property, Settings};
use crate::log_event::LogEvent;

const TRUNCATION_MARKER: &str = "..";

/// Encodes each event as an `index` action line followed by its source line.
#[derive(Clone, Debug)]
pub struct BulkJsonEncoder {
    index: IndexPattern,
    doc_type: Option<String>,
    properties: Vec<Property>,
    max_message_size: Option<usize>,
}

impl BulkJsonEncoder {
    pub fn new(index: &str) -> Result<Self, EncodingError> {
        Ok(Self {
            index: IndexPattern::parse(index)?,
            doc_type: None,
            properties: Vec::new(),
            max_message_size: None,
        })
    }

    /// Build an encoder from the index, type, property and truncation options.
    pub fn from_settings(settings: &Settings) -> Result<Self, EncodingError> {
        Ok(Self {
            index: IndexPattern::parse(&settings.index)?,
            doc_type: settings.doc_type.clone(),
            properties: settings.properties.clone(),
            max_message_size: settings.max_message_size,
        })
    }

    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = Some(max);
        self
    }

    fn truncate<'a>(&self, message: &'a str) -> std::borrow::Cow<'a, str> {
        let cut = self
            .max_message_size
            .and_then(|max| message.char_indices().nth(max))
            .map(|(byte_idx, _)| byte_idx);
        match cut {
            Some(idx) => format!("{}{TRUNCATION_MARKER}", &message[..idx]).into(),
            None => message.into(),
        }
    }
}

impl DocumentEncoder<LogEvent> for BulkJsonEncoder {
    fn encode(&self, event: &LogEvent) -> Result<String, EncodingError> {
        let created: DateTime<Utc> = event.metadata.timestamp.into();
        let index = self.index.render(&created)?;
        let action = BulkAction {
            index: ActionTarget {
                index: &index,
                doc_type: self.doc_type.as_deref(),
            },
        };

        let timestamp = created.to_rfc3339_opts(SecondsFormat::Millis, true);
        let message = self.truncate(&event.message);
        let source = SourceDocument::new(event, &timestamp, &message, &self.properties);

        let mut out = serde_json::to_string(&action)?;
        out.push('\n');
        out.push_str(&serde_json::to_string(&source)?);
        out.push('\n');
        Ok(out)
    }
}
