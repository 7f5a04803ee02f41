//! # Resource Mapper
//!
//! > **Typed entities over HTTP/JSON resources, with lazy relationships.**
//!
//! This crate turns remote JSON resources into in-memory entities and
//! resolves their has-one / has-many relationships either from data already
//! embedded in the response ("sideloading") or by following links. Every
//! entity remembers the raw response it came from, so resolving a
//! relationship usually costs no extra request.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Schemas, not reflection
//! Each entity type is described once by an [`EntitySchema`](schema::EntitySchema):
//! a closed set of fields, an identifier and relationship declarations.
//! Entities expose validated `get` / `set`; writing an undeclared field is an
//! error, which catches schema drift early.
//!
//! ### One decision procedure, two wire formats
//! A [`Serializer`](serializer::Serializer) decides for every relationship
//! whether the data is linked, sideloaded or absent. Links always win.
//! Two conventions ship with the crate:
//! - **`ams`**: `{ "person": {..}, "items": [..] }` with `links` and `*_ids`.
//! - **`json_api`**: `{ "people": [..], "links": {..}, "linked": {..} }`.
//!
//! ### Canonical instances
//! Entities are shared as `Arc<Entity>`. `reload` and `save` merge fresh
//! state into the instance callers already hold instead of handing out a
//! new one.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Error Handling
//! Every fallible call returns [`Result`] with a single [`MapperError`].
//! Serializer contract violations (missing keys, wrong shapes, identity
//! mismatches) are fatal to the call. A remote not-found on `find` is
//! `Ok(None)`, not an error.
//!
//! ### 2. Concurrency Model
//! The transport call is the only suspension point. Relationship slots
//! resolve at most once even under concurrent readers, and parsed bodies are
//! memoized per serializer.
//!
//! ### 3. Observability
//! All store operations emit `tracing` spans and events. See
//! [`observability::setup_tracing`].
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Data Model ([`schema`], [`entity`], [`collection`])
//! - **Role**: Describe types and hold instances, their metadata and origin.
//! - **Key items**: [`EntitySchema`](schema::EntitySchema), [`Entity`](entity::Entity),
//!   [`Collection`](collection::Collection).
//!
//! ### 2. The Wire Formats ([`serializer`])
//! - **Role**: Extract entities from envelopes and plan relationship resolution.
//! - **Key items**: [`AmsSerializer`](serializer::AmsSerializer),
//!   [`JsonApiSerializer`](serializer::JsonApiSerializer).
//!
//! ### 3. The Boundary ([`transport`])
//! - **Role**: Move raw bodies to and from the remote; map statuses.
//! - **Key items**: [`RestTransport`](transport::RestTransport),
//!   [`MockTransport`](transport::MockTransport).
//!
//! ### 4. The Orchestrator ([`store`], [`registry`])
//! - **Role**: Compose transport and serializer; cache relationships; keep
//!   the process-wide format registry.
//! - **Key items**: [`Store`](store::Store), [`Registry`](registry::Registry).
//!
//! ### 5. The Typed Facade ([`model`])
//! - **Role**: Wrap entities in domain types.
//! - **Key items**: [`Model`](model::Model), [`ModelClient`](model::ModelClient).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with debug logs
//! RUST_LOG=debug cargo run -p mapper-sample
//!
//! # Run the tests
//! cargo test --workspace
//! ```

pub mod collection;
pub mod entity;
pub mod error;
pub mod model;
pub mod naming;
pub mod observability;
pub mod registry;
pub mod schema;
pub mod serializer;
pub mod store;
pub mod transport;

pub use error::{MapperError, Result};

/// Common imports for hosts and tests.
pub mod prelude {
    pub use crate::collection::Collection;
    pub use crate::entity::{Entity, EntityRef, Related, SlotState};
    pub use crate::error::{MapperError, Result};
    pub use crate::model::{Model, ModelClient};
    pub use crate::registry::Registry;
    pub use crate::schema::{Cardinality, EntitySchema, SchemaCatalog};
    pub use crate::serializer::{AmsSerializer, IdCheck, JsonApiSerializer, Serializer};
    pub use crate::store::Store;
    pub use crate::transport::{MockTransport, QueryParams, RestOptions, RestTransport, Transport};
}
