use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use estate_relay::error::{Error, Result};
use estate_relay::gateway::GraphQlTransport;

/// Transport that answers queries by substring match against a script and
/// records everything it is sent.
pub struct ScriptedTransport {
    responses: Vec<(&'static str, Value)>,
    pub calls: Mutex<Vec<(String, Value)>>,
    pub fail_all: AtomicBool,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<(&'static str, Value)>) -> Self {
        Self {
            responses,
            calls: Mutex::new(Vec::new()),
            fail_all: AtomicBool::new(false),
        }
    }

    /// Variables of every recorded call whose query contains `needle`.
    pub fn variables_for(&self, needle: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(query, _)| query.contains(needle))
            .map(|(_, variables)| variables.clone())
            .collect()
    }
}

#[async_trait]
impl GraphQlTransport for ScriptedTransport {
    async fn send(&self, query: &str, variables: Value) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), variables));

        if self.fail_all.load(Ordering::SeqCst) {
            return Err(Error::Transport {
                status: 503,
                body: "scripted outage".to_string(),
            });
        }

        for (needle, response) in &self.responses {
            if query.contains(needle) {
                return Ok(response.clone());
            }
        }
        Err(Error::Transport {
            status: 500,
            body: "no scripted response for query".to_string(),
        })
    }
}
