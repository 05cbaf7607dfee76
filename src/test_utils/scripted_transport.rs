//! A transport answering from a script of status codes.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::writer::{DeliveryError, Transport};

#[derive(Debug)]
struct Script {
    queued: VecDeque<u16>,
    fallback: u16,
    bodies: Vec<String>,
    delivered: String,
}

/// [`Transport`] that records every body and answers with queued statuses.
///
/// Once the queue is exhausted every request receives the fallback status.
/// Clones share the script, so tests keep a handle after moving one clone into
/// a writer.
#[derive(Clone, Debug)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new(fallback: u16) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                queued: VecDeque::new(),
                fallback,
                bodies: Vec::new(),
                delivered: String::new(),
            })),
        }
    }

    /// Always answer `200 OK`.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Answer the next requests with `statuses`, in order.
    pub fn then(self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.script.lock().queued.extend(statuses);
        self
    }

    pub fn set_fallback(&self, status: u16) {
        self.script.lock().fallback = status;
    }

    /// Bodies of every request received so far.
    pub fn bodies(&self) -> Vec<String> {
        self.script.lock().bodies.clone()
    }

    /// Concatenation of the bodies of requests answered with 200.
    pub fn delivered(&self) -> String {
        self.script.lock().delivered.clone()
    }

    pub fn request_count(&self) -> usize {
        self.script.lock().bodies.len()
    }
}

impl Transport for ScriptedTransport {
    fn post(&self, body: &str) -> Result<(), DeliveryError> {
        let mut script = self.script.lock();
        let status = script.queued.pop_front().unwrap_or(script.fallback);
        script.bodies.push(body.to_owned());
        if status == 200 {
            script.delivered.push_str(body);
            Ok(())
        } else {
            Err(DeliveryError::Status {
                code: status,
                body: "<no data>".to_owned(),
            })
        }
    }
}
