//! # Transports
//!
//! A [`Transport`] moves raw bodies between the [`Store`](crate::store::Store)
//! and a remote resource. It owns path construction and status mapping; the
//! store only ever sees a [`StatusCategory`] and a body string.
//!
//! - [`rest::RestTransport`]: HTTP over `reqwest`.
//! - [`mock::MockTransport`]: in-memory expectations for tests.
//!
//! Resources are identified by their schema; implementations use
//! [`EntitySchema::plural_key`] as the path segment unchanged.

pub mod mock;
pub mod rest;

pub use mock::MockTransport;
pub use rest::{RestOptions, RestTransport};

use crate::error::Result;
use crate::schema::EntitySchema;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Opaque query parameters forwarded to the remote collection endpoint.
pub type QueryParams = BTreeMap<String, String>;

/// Outcome class of a transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    /// 2xx.
    Success,
    /// 404.
    NotFound,
    /// Anything else, with the raw status code.
    Failure(u16),
}

impl StatusCategory {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => Self::Success,
            404 => Self::NotFound,
            other => Self::Failure(other),
        }
    }

    /// Status code to report in errors.
    pub fn code(self) -> u16 {
        match self {
            Self::Success => 200,
            Self::NotFound => 404,
            Self::Failure(code) => code,
        }
    }
}

/// A status category plus the raw response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: StatusCategory,
    pub body: String,
}

impl TransportResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCategory::Success,
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCategory::NotFound,
            body: String::new(),
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: StatusCategory::from_status(status),
            body: body.into(),
        }
    }

    /// True when the body carries nothing to extract.
    pub fn is_blank(&self) -> bool {
        self.body.trim().is_empty()
    }
}

/// Remote access contract consumed by the store.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch one record by identifier.
    async fn find(&self, schema: &EntitySchema, id: &Value) -> Result<TransportResponse>;

    /// Fetch the collection endpoint with query parameters.
    async fn find_many(&self, schema: &EntitySchema, params: &QueryParams)
        -> Result<TransportResponse>;

    /// Create a record at the collection endpoint.
    async fn create(&self, schema: &EntitySchema, body: &Value) -> Result<TransportResponse>;

    /// Update the record at its identifier path.
    async fn update(&self, schema: &EntitySchema, id: &Value, body: &Value)
        -> Result<TransportResponse>;

    /// Delete the record at its identifier path.
    async fn delete(&self, schema: &EntitySchema, id: &Value) -> Result<TransportResponse>;

    /// Fetch an arbitrary, possibly relative, URL.
    async fn get(&self, url: &str) -> Result<TransportResponse>;
}
