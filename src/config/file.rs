//! INI loading for [`Settings`].
//!
//! The `[elasticsearch]` section holds scalar options, while `[headers]` and
//! `[properties]` hold ordered name/value pairs:
//!
//! ```ini
//! [elasticsearch]
//! url = http://localhost:9200/_bulk
//! index = logs-%date{%Y.%m.%d}
//! sleep_time_ms = 500
//!
//! [headers]
//! Content-Type = application/json
//!
//! [properties]
//! host = web-01
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;

use ini::{Ini, Properties};
use thiserror::Error;

use super::{BuildError, Property, Settings, SettingsBuilder};

const MAIN_SECTION: &str = "elasticsearch";
const HEADERS_SECTION: &str = "headers";
const PROPERTIES_SECTION: &str = "properties";

/// Errors raised while loading settings from an INI document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{path} doesn't exist")]
    NotFound { path: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] ini::ParseError),
    #[error("missing [{0}] section")]
    MissingSection(&'static str),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Load settings from the INI file at `path`.
pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => ConfigError::NotFound {
            path: path.display().to_string(),
        },
        _ => ConfigError::Io {
            path: path.display().to_string(),
            source: err,
        },
    })?;
    parse_settings(&text)
}

/// Parse settings from INI text.
pub fn parse_settings(text: &str) -> Result<Settings, ConfigError> {
    let ini = Ini::load_from_str(text)?;
    builder_from_ini(&ini)?.build().map_err(ConfigError::from)
}

fn builder_from_ini(ini: &Ini) -> Result<SettingsBuilder, ConfigError> {
    let main = ini
        .section(Some(MAIN_SECTION))
        .ok_or(ConfigError::MissingSection(MAIN_SECTION))?;

    let mut builder = SettingsBuilder::new();
    if let Some(url) = main.get("url") {
        builder = builder.with_url(url);
    }
    if let Some(index) = main.get("index") {
        builder = builder.with_index(index);
    }
    if let Some(doc_type) = main.get("type") {
        builder = builder.with_doc_type(doc_type);
    }
    if let Some(v) = parsed(main, "max_queue_size")? {
        builder = builder.with_max_queue_size(v);
    }
    if let Some(v) = parsed(main, "connect_timeout_ms")? {
        builder = builder.with_connect_timeout_ms(v);
    }
    if let Some(v) = parsed(main, "read_timeout_ms")? {
        builder = builder.with_read_timeout_ms(v);
    }
    if let Some(v) = parsed(main, "sleep_time_ms")? {
        builder = builder.with_sleep_time_ms(v);
    }
    if let Some(v) = parsed(main, "max_retries")? {
        builder = builder.with_max_retries(v);
    }
    if let Some(v) = parsed(main, "max_message_size")? {
        builder = builder.with_max_message_size(v);
    }
    if let Some(v) = parsed(main, "shutdown_timeout_ms")? {
        builder = builder.with_shutdown_timeout_ms(v);
    }
    builder = apply_credentials(builder, main)?;

    if let Some(headers) = ini.section(Some(HEADERS_SECTION)) {
        for (name, value) in headers.iter() {
            builder = builder.with_header(name, value);
        }
    }
    if let Some(properties) = ini.section(Some(PROPERTIES_SECTION)) {
        for (name, value) in properties.iter() {
            builder = builder.with_property(Property::new(name, value));
        }
    }
    Ok(builder)
}

fn apply_credentials(
    builder: SettingsBuilder,
    section: &Properties,
) -> Result<SettingsBuilder, ConfigError> {
    match (
        section.get("username"),
        section.get("password"),
        section.get("bearer_token"),
    ) {
        (Some(_), _, Some(_)) => Err(ConfigError::InvalidValue {
            key: "bearer_token".into(),
            value: "<redacted>".into(),
        }),
        (Some(user), password, None) => {
            Ok(builder.with_basic_auth(user, password.unwrap_or_default()))
        }
        (None, Some(_), _) => Err(ConfigError::InvalidValue {
            key: "password".into(),
            value: "<redacted>".into(),
        }),
        (None, None, Some(token)) => Ok(builder.with_bearer_token(token)),
        (None, None, None) => Ok(builder),
    }
}

fn parsed<T: FromStr>(section: &Properties, key: &str) -> Result<Option<T>, ConfigError> {
    section
        .get(key)
        .map(|raw| {
            raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_owned(),
                value: raw.to_owned(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const SAMPLE: &str = "\
[elasticsearch]
url = http://localhost:9200/_bulk
index = logs-%date{%Y.%m.%d}
type = entry
max_queue_size = 2048
sleep_time_ms = 500
max_retries = 5
username = elastic
password = changeme

[headers]
X-Tenant = alpha
X-Trace = on

[properties]
host = web-01
";

    #[test]
    fn parses_all_sections() {
        let settings = parse_settings(SAMPLE).expect("valid configuration");
        assert_eq!(settings.url, "http://localhost:9200/_bulk");
        assert_eq!(settings.index, "logs-%date{%Y.%m.%d}");
        assert_eq!(settings.doc_type.as_deref(), Some("entry"));
        assert_eq!(settings.max_queue_size, 2048);
        assert_eq!(settings.sleep_time, Duration::from_millis(500));
        assert_eq!(settings.max_retries, 5);
        assert!(settings.authentication.is_some());
        let headers: Vec<_> = settings
            .headers
            .iter()
            .map(|h| (h.name.as_str(), h.value.as_str()))
            .collect();
        assert_eq!(headers, [("X-Tenant", "alpha"), ("X-Trace", "on")]);
        assert_eq!(settings.properties, [Property::new("host", "web-01")]);
    }

    #[test]
    fn rejects_non_numeric_values() {
        let err = parse_settings("[elasticsearch]\nurl = http://h/_bulk\nmax_retries = lots\n")
            .expect_err("bad number");
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "max_retries"));
    }

    #[test]
    fn requires_main_section() {
        let err = parse_settings("[headers]\nX = 1\n").expect_err("missing section");
        assert!(matches!(err, ConfigError::MissingSection("elasticsearch")));
    }

    #[test]
    fn surfaces_builder_errors() {
        let err = parse_settings("[elasticsearch]\nindex = logs\n").expect_err("no url");
        assert!(matches!(err, ConfigError::Build(_)));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SAMPLE.as_bytes()).expect("write config");
        let settings = load_settings(file.path()).expect("load");
        assert_eq!(settings.max_queue_size, 2048);
    }

    #[test]
    fn reports_missing_file() {
        let err = load_settings("/nonexistent/elastic.ini").expect_err("missing file");
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
