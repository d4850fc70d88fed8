//! # vpc-core
//!
//! Core types and utilities for working with the VPC API.
//!
//! This crate provides the shared error type, transport and client
//! configuration, typed resource identifiers, and the generic [`Pager`]
//! that walks paginated list operations.
//!
//! ## Modules
//!
//! - [`error`] - Error types and HTTP status code mapping
//! - [`id`] - Strongly-typed identifiers for VPC resources
//! - [`operation`] - The list-operation table (paths, item fields, cursor strategies)
//! - [`config`] - Configuration structures for VPC clients
//! - [`client`] - HTTP client tuning and retry policy
//! - [`query`] - Request parameter bags
//! - [`pager`] - The paginated list cursor and the RPC invoker capability

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod id;
pub mod operation;
pub mod pager;
pub mod query;

// Re-export commonly used types
pub use error::{Error, Result};
pub use operation::{CursorStrategy, ListOperation, MarkerPolicy, PageSpec};
pub use pager::{decode_page, Page, PageRequest, Pager, PagerPhase, RpcInvoker, RpcResponse};
pub use query::RequestParams;
