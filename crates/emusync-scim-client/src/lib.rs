//! SCIM 2.0 client for enterprise directory provisioning.
//!
//! Implements the access protocol side of the connector: a thin transport
//! abstraction over `reqwest`, an authenticated session wrapper with a
//! re-authenticate-then-retry contract, page cursors for the two pagination
//! styles the provider speaks (offset/count SCIM lists and `Link`-header
//! discovery), the SCIM wire models and patch envelope, and the enterprise
//! client tying it all together. Resource schemas for users, groups, and
//! copilot seats live in [`resource`] and drive the mapping engine from
//! `emusync-connector`.

pub mod client;
pub mod config;
pub mod models;
pub mod page;
pub mod patch;
pub mod resource;
pub mod session;
pub mod transport;

pub use client::EnterpriseClient;
pub use config::ClientConfig;
pub use emusync_connector::error::{ConnectorError, ConnectorResult};
pub use page::{drain, LinkHeaderPaging, NextPage, OffsetPage, OffsetPaging, Page, PageCursor};
pub use patch::PatchOperations;
pub use session::AuthenticatedSession;
pub use transport::{HttpTransport, Method, RestRequest, RestResponse, Transport};
