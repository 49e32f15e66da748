use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::transport::{Transport, TransportFailure, TransportResponse, TransportResult};

/// What the scripted endpoint does on its next call.
#[derive(Debug, Clone)]
pub enum Step {
    Reply(u16, String),
    Fail(TransportFailure),
    /// Never answer within any reasonable attempt timeout.
    Hang,
}

pub fn reply(status: u16, body: &str) -> Step {
    Step::Reply(status, body.to_string())
}

/// Transport that plays back a fixed script and records what it was sent.
#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    bodies: Mutex<Vec<serde_json::Value>>,
    bearers: Mutex<Vec<Option<String>>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().unwrap().clone()
    }

    pub fn bearers(&self) -> Vec<Option<String>> {
        self.bearers.lock().unwrap().clone()
    }

    async fn next(&self, bearer: Option<&str>) -> TransportResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bearers
            .lock()
            .unwrap()
            .push(bearer.map(str::to_string));
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("script ran out of steps");
        match step {
            Step::Reply(status, body) => Ok(TransportResponse::new(status, body)),
            Step::Fail(failure) => Err(failure),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(TransportFailure::Network("hang step resumed".into()))
            }
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(
        &self,
        _url: &str,
        bearer: Option<&str>,
        body: serde_json::Value,
    ) -> TransportResult {
        self.bodies.lock().unwrap().push(body);
        self.next(bearer).await
    }

    async fn get(&self, _url: &str, bearer: Option<&str>) -> TransportResult {
        self.next(bearer).await
    }
}
