//! # Connector Framework
//!
//! Core abstractions for provisioning identity objects to SCIM-style
//! directory APIs.
//!
//! The framework has two halves. The first is a declarative attribute
//! mapping engine: each logical attribute of a resource is bound to a typed
//! create setter, an incremental replace setter, and a read getter through an
//! [`AttributeMapper`], and an ordered set of mappers forms a
//! [`SchemaDefinition`] that can populate wire objects from external
//! attributes, build patch payloads, and materialize connector objects with
//! partial-fetch semantics. The second half is the shared vocabulary those
//! schemas speak: the closed [`AttributeValue`] variant set with its
//! per-type coercions, attribute containers, and the domain error taxonomy
//! with its HTTP status classification.
//!
//! ## Crate Organization
//!
//! - [`error`] - Error taxonomy with retry classification
//! - [`secret`] - Guarded secret values that never leak into logs
//! - [`value`] - Typed value variants and write/read coercion
//! - [`operation`] - Attribute containers, UIDs, connector objects
//! - [`mapping`] - One declarative attribute binding
//! - [`schema`] - Ordered mapper collections with bulk operations

pub mod error;
pub mod mapping;
pub mod operation;
pub mod schema;
pub mod secret;
pub mod value;

/// Prelude module for convenient imports.
///
/// ```
/// use emusync_connector::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ConnectorError, ConnectorResult};
    pub use crate::mapping::{AttributeFlags, AttributeMapper};
    pub use crate::operation::{Attribute, AttributeSet, ConnectorObject, ObjectAttribute, Uid};
    pub use crate::schema::{SchemaBuilder, SchemaDefinition};
    pub use crate::secret::SecretString;
    pub use crate::value::{AttributeType, AttributeValue, DateFormats};
}
