//! # Mock Transport & Testing Guide
//!
//! [`MockTransport`] implements [`Transport`] entirely in memory. Tests queue
//! expectations in the order calls will happen, each with a canned response,
//! then hand the transport to a [`Store`](crate::store::Store).
//!
//! | Feature | MockTransport | RestTransport |
//! |---------|---------------|---------------|
//! | **Speed** | Instant | Network bound |
//! | **Determinism** | Fully deterministic | Depends on the remote |
//! | **Error Injection** | `return_status` / `return_err` | Hard |
//! | **Use Case** | Serializer and store behavior | Talking to a real API |
//!
//! ```rust
//! use resource_mapper::schema::EntitySchema;
//! use resource_mapper::transport::{MockTransport, StatusCategory, Transport};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockTransport::new();
//!     mock.expect_find("people", 1)
//!         .return_ok(r#"{"person": {"id": 1}}"#);
//!     mock.expect_find("people", 2).return_not_found();
//!
//!     let person = EntitySchema::new("Person");
//!     let found = mock.find(&person, &json!(1)).await.unwrap();
//!     assert_eq!(found.status, StatusCategory::Success);
//!     let missing = mock.find(&person, &json!(2)).await.unwrap();
//!     assert_eq!(missing.status, StatusCategory::NotFound);
//!
//!     mock.verify();
//! }
//! ```
//!
//! A call that does not match the next queued expectation panics, which
//! fails the test at the offending call.

use super::{QueryParams, Transport, TransportResponse};
use crate::entity::identity_key;
use crate::error::{MapperError, Result};
use crate::schema::EntitySchema;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A call received by a [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransportRequest {
    Find { resource: String, id: String },
    FindMany { resource: String, params: QueryParams },
    Create { resource: String, body: Value },
    Update { resource: String, id: String, body: Value },
    Delete { resource: String, id: String },
    Get { url: String },
}

#[derive(Debug)]
enum Expected {
    Find { resource: String, id: String },
    FindMany { resource: String, params: Option<QueryParams> },
    Create { resource: String },
    Update { resource: String, id: String },
    Delete { resource: String, id: String },
    Get { url: String },
}

impl Expected {
    fn matches(&self, request: &TransportRequest) -> bool {
        match (self, request) {
            (Self::Find { resource, id }, TransportRequest::Find { resource: r, id: i }) => {
                resource == r && id == i
            }
            (
                Self::FindMany { resource, params },
                TransportRequest::FindMany { resource: r, params: p },
            ) => resource == r && params.as_ref().map_or(true, |params| params == p),
            (Self::Create { resource }, TransportRequest::Create { resource: r, .. }) => {
                resource == r
            }
            (
                Self::Update { resource, id },
                TransportRequest::Update { resource: r, id: i, .. },
            ) => resource == r && id == i,
            (Self::Delete { resource, id }, TransportRequest::Delete { resource: r, id: i }) => {
                resource == r && id == i
            }
            (Self::Get { url }, TransportRequest::Get { url: u }) => url == u,
            _ => false,
        }
    }
}

struct Expectation {
    request: Expected,
    response: Result<TransportResponse>,
}

type Queue = Arc<Mutex<VecDeque<Expectation>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn id_text(id: impl Into<Value>) -> String {
    identity_key(&id.into()).unwrap_or_default()
}

/// A transport with expectation tracking for fluent testing.
///
/// Clones share the same queue and request log, so a test can keep one
/// handle for [`verify`](Self::verify) while the store owns another.
#[derive(Clone, Default)]
pub struct MockTransport {
    expectations: Queue,
    requests: Arc<Mutex<Vec<TransportRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared handle suitable for [`Store::new`](crate::store::Store::new).
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(self.clone())
    }

    fn expect(&self, request: Expected) -> ResponseBuilder {
        ResponseBuilder {
            request,
            expectations: Arc::clone(&self.expectations),
        }
    }

    /// Expects `find` on `resource` (the plural path segment) with `id`.
    pub fn expect_find(&self, resource: &str, id: impl Into<Value>) -> ResponseBuilder {
        self.expect(Expected::Find {
            resource: resource.to_string(),
            id: id_text(id),
        })
    }

    /// Expects `find_many` on `resource` with any parameters.
    pub fn expect_find_many(&self, resource: &str) -> ResponseBuilder {
        self.expect(Expected::FindMany {
            resource: resource.to_string(),
            params: None,
        })
    }

    /// Expects `find_many` on `resource` with exactly `params`.
    pub fn expect_query(&self, resource: &str, params: QueryParams) -> ResponseBuilder {
        self.expect(Expected::FindMany {
            resource: resource.to_string(),
            params: Some(params),
        })
    }

    pub fn expect_create(&self, resource: &str) -> ResponseBuilder {
        self.expect(Expected::Create {
            resource: resource.to_string(),
        })
    }

    pub fn expect_update(&self, resource: &str, id: impl Into<Value>) -> ResponseBuilder {
        self.expect(Expected::Update {
            resource: resource.to_string(),
            id: id_text(id),
        })
    }

    pub fn expect_delete(&self, resource: &str, id: impl Into<Value>) -> ResponseBuilder {
        self.expect(Expected::Delete {
            resource: resource.to_string(),
            id: id_text(id),
        })
    }

    /// Expects `get` on exactly `url`.
    pub fn expect_get(&self, url: &str) -> ResponseBuilder {
        self.expect(Expected::Get {
            url: url.to_string(),
        })
    }

    /// Every call received so far, in order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Panics if any expectation is still queued.
    pub fn verify(&self) {
        let remaining = lock(&self.expectations);
        if !remaining.is_empty() {
            let pending: Vec<&Expected> = remaining.iter().map(|e| &e.request).collect();
            panic!(
                "Not all expectations were met. {} remaining: {pending:?}",
                remaining.len()
            );
        }
    }

    fn respond(&self, request: TransportRequest) -> Result<TransportResponse> {
        lock(&self.requests).push(request.clone());
        let expectation = lock(&self.expectations).pop_front();
        match expectation {
            Some(expectation) if expectation.request.matches(&request) => expectation.response,
            Some(expectation) => panic!(
                "Unexpected request {request:?}, expected {:?}",
                expectation.request
            ),
            None => panic!("Unexpected request {request:?}, no expectations left"),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn find(&self, schema: &EntitySchema, id: &Value) -> Result<TransportResponse> {
        self.respond(TransportRequest::Find {
            resource: schema.plural_key(),
            id: id_text(id.clone()),
        })
    }

    async fn find_many(
        &self,
        schema: &EntitySchema,
        params: &QueryParams,
    ) -> Result<TransportResponse> {
        self.respond(TransportRequest::FindMany {
            resource: schema.plural_key(),
            params: params.clone(),
        })
    }

    async fn create(&self, schema: &EntitySchema, body: &Value) -> Result<TransportResponse> {
        self.respond(TransportRequest::Create {
            resource: schema.plural_key(),
            body: body.clone(),
        })
    }

    async fn update(
        &self,
        schema: &EntitySchema,
        id: &Value,
        body: &Value,
    ) -> Result<TransportResponse> {
        self.respond(TransportRequest::Update {
            resource: schema.plural_key(),
            id: id_text(id.clone()),
            body: body.clone(),
        })
    }

    async fn delete(&self, schema: &EntitySchema, id: &Value) -> Result<TransportResponse> {
        self.respond(TransportRequest::Delete {
            resource: schema.plural_key(),
            id: id_text(id.clone()),
        })
    }

    async fn get(&self, url: &str) -> Result<TransportResponse> {
        self.respond(TransportRequest::Get {
            url: url.to_string(),
        })
    }
}

/// Chooses the response for one queued expectation.
pub struct ResponseBuilder {
    request: Expected,
    expectations: Queue,
}

impl ResponseBuilder {
    fn push(self, response: Result<TransportResponse>) {
        lock(&self.expectations).push_back(Expectation {
            request: self.request,
            response,
        });
    }

    /// Responds with a 2xx and `body`.
    pub fn return_ok(self, body: impl Into<String>) {
        self.push(Ok(TransportResponse::ok(body)));
    }

    /// Responds with a 2xx and `body` serialized.
    pub fn return_json(self, body: Value) {
        self.push(Ok(TransportResponse::ok(body.to_string())));
    }

    pub fn return_not_found(self) {
        self.push(Ok(TransportResponse::not_found()));
    }

    pub fn return_status(self, status: u16, body: impl Into<String>) {
        self.push(Ok(TransportResponse::status(status, body)));
    }

    /// Fails the call itself, as a connection error would.
    pub fn return_err(self, error: MapperError) {
        self.push(Err(error));
    }
}
