//! Network step of a flush: one POST of the send buffer.

use std::sync::Arc;

use log::warn;
use thiserror::Error;
use ureq::{Agent, AgentBuilder};

use crate::auth::{Authenticator, BasicAuthentication, strip_userinfo};
use crate::config::{HttpRequestHeader, Settings};

const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";
const NO_DATA: &str = "<no data>";

/// Why a bulk request did not count as delivered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The endpoint answered with anything other than `200 OK`.
    #[error("got response code [{code}] from server with data {body}")]
    Status { code: u16, body: String },
    /// The request never produced a response.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Performs the HTTP exchange for one flush.
pub trait Transport: Send {
    /// POST `body` and succeed only on HTTP 200.
    fn post(&self, body: &str) -> Result<(), DeliveryError>;
}

/// [`Transport`] backed by a pooled `ureq` agent.
#[derive(Debug)]
pub struct UreqTransport {
    agent: Agent,
    url: String,
    headers: Vec<HttpRequestHeader>,
    authentication: Option<Arc<dyn Authenticator>>,
}

impl UreqTransport {
    pub fn new(settings: &Settings) -> Self {
        let mut builder = AgentBuilder::new()
            .timeout_connect(settings.connect_timeout)
            .timeout_read(settings.read_timeout);
        match native_tls::TlsConnector::new() {
            Ok(connector) => builder = builder.tls_connector(Arc::new(connector)),
            Err(err) => warn!("ElasticWriter could not initialise TLS, using defaults: {err}"),
        }

        let authentication = settings.authentication.clone().or_else(|| {
            BasicAuthentication::from_url(&settings.url)
                .map(|auth| Arc::new(auth) as Arc<dyn Authenticator>)
        });

        Self {
            agent: builder.build(),
            url: strip_userinfo(&settings.url),
            headers: settings.headers.clone(),
            authentication,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_request(&self, body: &str) -> ureq::Request {
        let mut req = self
            .agent
            .post(&self.url)
            .set("Content-Type", NDJSON_CONTENT_TYPE);
        for header in &self.headers {
            req = req.set(&header.name, &header.value);
        }
        match &self.authentication {
            Some(auth) => auth.add_auth(req, body),
            None => req,
        }
    }
}

impl Transport for UreqTransport {
    fn post(&self, body: &str) -> Result<(), DeliveryError> {
        match self.build_request(body).send_string(body) {
            Ok(response) if response.status() == 200 => Ok(()),
            Ok(response) => Err(status_error(response.status(), response)),
            Err(ureq::Error::Status(code, response)) => Err(status_error(code, response)),
            Err(ureq::Error::Transport(err)) => Err(DeliveryError::Transport(err.to_string())),
        }
    }
}

fn status_error(code: u16, response: ureq::Response) -> DeliveryError {
    let body = match response.into_string() {
        Ok(text) if text.is_empty() => NO_DATA.to_owned(),
        Ok(text) => text,
        Err(err) => format!("<error retrieving data: {err}>"),
    };
    DeliveryError::Status { code, body }
}
