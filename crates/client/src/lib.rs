//! Transport layer for shellcache.
//!
//! This crate provides the HTTP fetch transport and deployment origin
//! handling shared by the worker and its tests.

pub mod fetch;

pub use fetch::origin::{Origin, OriginError};
pub use fetch::{FetchClient, FetchConfig, FetchMode, FetchResponse, Method, StatusCode, Transport, Url};
