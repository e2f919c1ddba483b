//! Results feed access.
//!
//! [`FeedClient`] is the seam between the orchestrator and the network;
//! [`HttpFeedClient`] talks to the live feed and [`parse_table`] turns its
//! comma-delimited payload into rows.

mod client;
mod parse;
mod types;

pub use client::{FeedClient, HttpFeedClient};
pub use parse::parse_table;
pub use types::{is_safe_stage_id, resource_key, DataKind, FeedError, RallyClass, TabularResponse, UnknownIdentifier};
