//! Client for the remote query execution service.

mod dune_client;
mod types;

pub use dune_client::{DuneClient, QueryEngine};
pub use types::{DuneRecord, ExecuteResponse, ExecutionPayload, ExecutionResult, StatusResponse};
