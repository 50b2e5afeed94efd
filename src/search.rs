//! Requests against the `/search/` API namespace.

use serde_json::{json, Value};

use crate::api::Transport;
use crate::errors::CapError;

pub struct SearchIndex<'a> {
    transport: &'a dyn Transport,
}

impl<'a> SearchIndex<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        SearchIndex { transport }
    }

    /// Rebuild the server-side search index.
    pub async fn build(&self) -> Result<Value, CapError> {
        self.transport.post("search/build", json!({})).await
    }

    /// Summary statistics for the search index.
    pub async fn summary(&self) -> Result<Value, CapError> {
        self.transport.get("search/summary/").await
    }
}
