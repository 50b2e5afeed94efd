//! Requests against the `/assignment/` API namespace.

use serde_json::{json, Value};

use crate::api::Transport;
use crate::errors::CapError;

pub struct Assignments<'a> {
    transport: &'a dyn Transport,
}

impl<'a> Assignments<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Assignments { transport }
    }

    /// All assignments belonging to a user.
    pub async fn list(&self, username: &str) -> Result<Value, CapError> {
        self.transport.get(&format!("assignment/{username}")).await
    }

    /// Begin working on a challenge.
    pub async fn start(&self, uuid: &str) -> Result<Value, CapError> {
        self.transport
            .post(&format!("assignment/start/{uuid}"), json!({}))
            .await
    }

    /// Submit an assignment for scoring.
    pub async fn submit(&self, uuid: &str) -> Result<Value, CapError> {
        self.transport
            .post(&format!("assignment/submit/{uuid}"), json!({}))
            .await
    }
}
