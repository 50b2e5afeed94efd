//! cap-client: command-line client for the captest.io content and
//! assignment API.
//!
//! The library surface mirrors the API namespaces: `docs` carries the
//! document publishing pipeline, `datafiles`/`assignments`/`search`
//! are thin request wrappers, and `api` holds the transport
//! abstraction they all share. The binary (`main.rs`) wires parsed
//! arguments and credentials into [`cli::run`].

pub mod api;
pub mod assignments;
pub mod cli;
pub mod credentials;
pub mod datafiles;
pub mod datasets;
pub mod docs;
pub mod document;
pub mod errors;
pub mod resolve;
pub mod search;
pub mod validations;

pub use cli::{run, Cli, Commands};
pub use errors::CapError;
