//! Enterprise directory client.
//!
//! High-level CRUD and search operations against the provider's SCIM user
//! and group resources and its seat listing. Every request carries the SCIM
//! `Accept` header and the provider API version header; writes add the SCIM
//! content type. Remote calls run under the [`AuthenticatedSession`] and all
//! failures surface as classified domain errors.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use url::Url;

use emusync_connector::error::{ConnectorError, ConnectorResult};
use emusync_connector::operation::Uid;

use crate::config::ClientConfig;
use crate::models::{
    CopilotSeat, ScimGroup, ScimListResponse, ScimUser, SeatPage, API_VERSION_HEADER,
    GROUP_SCHEMA, SCIM_CONTENT_TYPE, USER_SCHEMA,
};
use crate::page::{drain, PageCursor};
use crate::patch::PatchOperations;
use crate::session::AuthenticatedSession;
use crate::transport::{HttpTransport, Method, RestRequest, Transport};

/// Client for one enterprise's directory resources.
///
/// One client instance owns one [`AuthenticatedSession`]; instances are not
/// meant to be shared across logical connector instances.
pub struct EnterpriseClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    session: AuthenticatedSession,
}

impl EnterpriseClient {
    /// Build a client with the production HTTP transport.
    pub fn new(config: ClientConfig) -> ConnectorResult<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(
            config.connection_timeout(),
            config.read_timeout(),
            config.tls_verify,
        )?);
        Self::with_transport(config, transport)
    }

    /// Build a client over an explicit transport (tests, instrumentation).
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> ConnectorResult<Self> {
        config.validate()?;
        // The session validates itself against the user listing; one result
        // is enough to prove the credential works.
        let ping = RestRequest::get(parse_url(&format!("{}/Users", config.scim_base()))?)
            .with_header("Accept", SCIM_CONTENT_TYPE)
            .with_header(API_VERSION_HEADER, config.api_version.clone())
            .with_query("count", "1");
        let session = AuthenticatedSession::new(transport.clone(), ping, config.token.clone());
        Ok(Self {
            config,
            transport,
            session,
        })
    }

    /// The session backing this client.
    pub fn session(&self) -> &AuthenticatedSession {
        &self.session
    }

    /// Lightweight liveness check against the provider.
    pub async fn test(&self) -> ConnectorResult<()> {
        self.session.test().await
    }

    // ── Users ─────────────────────────────────────────────────────────

    /// Create a user (POST `/Users`). Returns the new UID with the
    /// user name as its hint.
    pub async fn create_user(&self, user: &ScimUser) -> ConnectorResult<Uid> {
        let mut user = user.clone();
        user.schemas = vec![USER_SCHEMA.to_string()];
        let request = self.json_request(Method::Post, &self.users_url(), &user)?;
        let created: ScimUser = self.send_parsed(&request).await?;
        let id = created
            .id
            .ok_or_else(|| ConnectorError::io("provider returned a user without an id"))?;
        Ok(Uid::with_hint(id, created.user_name))
    }

    /// Get a user by id (GET `/Users/{id}`), optionally projecting only the
    /// given fetch fields through the `attributes` parameter.
    pub async fn get_user(&self, uid: &Uid, fetch_fields: &[String]) -> ConnectorResult<ScimUser> {
        let mut request = self.get_request(&self.user_url(uid.value()))?;
        if !fetch_fields.is_empty() {
            request = request.with_query("attributes", fetch_fields.join(","));
        }
        self.send_parsed(&request).await
    }

    /// Find the user with exactly the given user name, via a SCIM filter.
    pub async fn find_user_by_username(
        &self,
        user_name: &str,
    ) -> ConnectorResult<Option<ScimUser>> {
        let filter = format!("userName eq \"{}\"", escape_filter_value(user_name));
        let request = self
            .get_request(&self.users_url())?
            .with_query("filter", filter);
        let page: ScimListResponse<ScimUser> = self.send_parsed(&request).await?;
        // Anything other than exactly one match means "not found by name".
        let mut resources = page.resources;
        if resources.len() == 1 {
            Ok(Some(resources.remove(0)))
        } else {
            Ok(None)
        }
    }

    /// Patch a user (PATCH `/Users/{id}`). An empty envelope skips the
    /// remote call entirely.
    pub async fn patch_user(&self, uid: &Uid, ops: &PatchOperations) -> ConnectorResult<()> {
        if ops.is_empty() {
            debug!(uid = %uid, "no patch operations recorded, skipping PATCH");
            return Ok(());
        }
        let request = self.json_request(Method::Patch, &self.user_url(uid.value()), ops)?;
        self.send_ok(&request).await
    }

    /// Delete a user (DELETE `/Users/{id}`).
    pub async fn delete_user(&self, uid: &Uid) -> ConnectorResult<()> {
        let request = self.delete_request(&self.user_url(uid.value()))?;
        self.send_ok(&request).await
    }

    /// Open an offset/count cursor over the user listing.
    pub async fn users_cursor(
        &self,
        page_size: u32,
        page_offset: u32,
    ) -> ConnectorResult<PageCursor<ScimListResponse<ScimUser>>> {
        self.session.ensure_authenticated().await?;
        PageCursor::offset(
            self.transport.clone(),
            self.get_request(&self.users_url())?,
            page_size,
            page_offset,
        )
    }

    /// Iterate users, handing each to `on_user` until it returns false.
    ///
    /// Returns the total reported by the first page. When a page offset was
    /// requested the iteration stops after one page worth of items.
    pub async fn for_each_user<F>(
        &self,
        page_size: u32,
        page_offset: u32,
        on_user: F,
    ) -> ConnectorResult<u32>
    where
        F: FnMut(ScimUser) -> bool,
    {
        let page_size = self.effective_page_size(page_size);
        let mut cursor = self.users_cursor(page_size, page_offset).await?;
        drain(&mut cursor, item_budget(page_size, page_offset), on_user).await
    }

    // ── Groups ────────────────────────────────────────────────────────

    /// Create a group (POST `/Groups`). Returns the new UID with the
    /// display name as its hint.
    pub async fn create_group(&self, group: &ScimGroup) -> ConnectorResult<Uid> {
        let mut group = group.clone();
        group.schemas = vec![GROUP_SCHEMA.to_string()];
        let request = self.json_request(Method::Post, &self.groups_url(), &group)?;
        let created: ScimGroup = self.send_parsed(&request).await?;
        let id = created
            .id
            .ok_or_else(|| ConnectorError::io("provider returned a group without an id"))?;
        Ok(Uid::with_hint(id, created.display_name))
    }

    /// Get a group by id (GET `/Groups/{id}`).
    pub async fn get_group(
        &self,
        uid: &Uid,
        fetch_fields: &[String],
    ) -> ConnectorResult<ScimGroup> {
        let mut request = self.get_request(&self.group_url(uid.value()))?;
        if !fetch_fields.is_empty() {
            request = request.with_query("attributes", fetch_fields.join(","));
        }
        self.send_parsed(&request).await
    }

    /// Find the group with exactly the given display name.
    pub async fn find_group_by_display_name(
        &self,
        display_name: &str,
    ) -> ConnectorResult<Option<ScimGroup>> {
        let filter = format!("displayName eq \"{}\"", escape_filter_value(display_name));
        let request = self
            .get_request(&self.groups_url())?
            .with_query("filter", filter);
        let page: ScimListResponse<ScimGroup> = self.send_parsed(&request).await?;
        let mut resources = page.resources;
        if resources.len() == 1 {
            Ok(Some(resources.remove(0)))
        } else {
            Ok(None)
        }
    }

    /// Patch a group (PATCH `/Groups/{id}`). An empty envelope skips the
    /// remote call.
    pub async fn patch_group(&self, uid: &Uid, ops: &PatchOperations) -> ConnectorResult<()> {
        if ops.is_empty() {
            debug!(uid = %uid, "no patch operations recorded, skipping PATCH");
            return Ok(());
        }
        let request = self.json_request(Method::Patch, &self.group_url(uid.value()), ops)?;
        self.send_ok(&request).await
    }

    /// Delete a group (DELETE `/Groups/{id}`).
    pub async fn delete_group(&self, uid: &Uid) -> ConnectorResult<()> {
        let request = self.delete_request(&self.group_url(uid.value()))?;
        self.send_ok(&request).await
    }

    /// Open an offset/count cursor over the group listing.
    pub async fn groups_cursor(
        &self,
        page_size: u32,
        page_offset: u32,
    ) -> ConnectorResult<PageCursor<ScimListResponse<ScimGroup>>> {
        self.session.ensure_authenticated().await?;
        PageCursor::offset(
            self.transport.clone(),
            self.get_request(&self.groups_url())?,
            page_size,
            page_offset,
        )
    }

    /// Iterate groups, handing each to `on_group` until it returns false.
    pub async fn for_each_group<F>(
        &self,
        page_size: u32,
        page_offset: u32,
        on_group: F,
    ) -> ConnectorResult<u32>
    where
        F: FnMut(ScimGroup) -> bool,
    {
        let page_size = self.effective_page_size(page_size);
        let mut cursor = self.groups_cursor(page_size, page_offset).await?;
        drain(&mut cursor, item_budget(page_size, page_offset), on_group).await
    }

    // ── Seats ─────────────────────────────────────────────────────────

    /// Open a `Link`-header cursor over the seat listing.
    pub async fn seats_cursor(
        &self,
        page_size: u32,
        page_offset: u32,
    ) -> ConnectorResult<PageCursor<SeatPage<CopilotSeat>>> {
        self.session.ensure_authenticated().await?;
        PageCursor::linked(
            self.transport.clone(),
            self.get_request(&self.config.seats_url())?,
            page_size,
            page_offset,
        )
    }

    /// Iterate seats, handing each to `on_seat` until it returns false.
    pub async fn for_each_seat<F>(
        &self,
        page_size: u32,
        page_offset: u32,
        on_seat: F,
    ) -> ConnectorResult<u32>
    where
        F: FnMut(CopilotSeat) -> bool,
    {
        let page_size = self.effective_page_size(page_size);
        let mut cursor = self.seats_cursor(page_size, page_offset).await?;
        drain(&mut cursor, item_budget(page_size, page_offset), on_seat).await
    }

    /// Find the seat assigned to the account with the given id.
    ///
    /// The seat listing has no id lookup, so this scans the listing.
    pub async fn find_seat_by_assignee_id(
        &self,
        assignee_id: &str,
    ) -> ConnectorResult<Option<CopilotSeat>> {
        let mut found = None;
        self.for_each_seat(0, 0, |seat| {
            if seat.assignee.id.as_deref() == Some(assignee_id) {
                found = Some(seat);
                false
            } else {
                true
            }
        })
        .await?;
        Ok(found)
    }

    /// Find the seat assigned to the account with the given login.
    pub async fn find_seat_by_login(&self, login: &str) -> ConnectorResult<Option<CopilotSeat>> {
        let mut found = None;
        self.for_each_seat(0, 0, |seat| {
            if seat.assignee.login == login {
                found = Some(seat);
                false
            } else {
                true
            }
        })
        .await?;
        Ok(found)
    }

    // ── Request building ──────────────────────────────────────────────

    fn users_url(&self) -> String {
        format!("{}/Users", self.config.scim_base())
    }

    fn user_url(&self, id: &str) -> String {
        format!("{}/Users/{id}", self.config.scim_base())
    }

    fn groups_url(&self) -> String {
        format!("{}/Groups", self.config.scim_base())
    }

    fn group_url(&self, id: &str) -> String {
        format!("{}/Groups/{id}", self.config.scim_base())
    }

    fn base_headers(&self, request: RestRequest) -> RestRequest {
        request
            .with_header("Accept", SCIM_CONTENT_TYPE)
            .with_header(API_VERSION_HEADER, self.config.api_version.clone())
            .with_header("Authorization", self.session.authorization())
    }

    fn get_request(&self, url: &str) -> ConnectorResult<RestRequest> {
        Ok(self.base_headers(RestRequest::get(parse_url(url)?)))
    }

    fn delete_request(&self, url: &str) -> ConnectorResult<RestRequest> {
        Ok(self.base_headers(RestRequest::new(Method::Delete, parse_url(url)?)))
    }

    fn json_request<B: Serialize>(
        &self,
        method: Method,
        url: &str,
        body: &B,
    ) -> ConnectorResult<RestRequest> {
        let body = serde_json::to_value(body)
            .map_err(|e| ConnectorError::io_with_source("failed to serialize request body", e))?;
        Ok(self
            .base_headers(RestRequest::new(method, parse_url(url)?))
            .with_header("Content-Type", SCIM_CONTENT_TYPE)
            .with_body(body))
    }

    async fn send_parsed<T: serde::de::DeserializeOwned>(
        &self,
        request: &RestRequest,
    ) -> ConnectorResult<T> {
        self.session
            .with_auth(|| async move {
                self.transport
                    .send(request)
                    .await?
                    .error_for_status()?
                    .parse()
            })
            .await
    }

    async fn send_ok(&self, request: &RestRequest) -> ConnectorResult<()> {
        self.session
            .with_auth(|| async move {
                self.transport.send(request).await?.error_for_status()?;
                Ok(())
            })
            .await
    }

    fn effective_page_size(&self, page_size: u32) -> u32 {
        if page_size > 0 {
            page_size
        } else {
            self.config.default_page_size
        }
    }
}

/// Budget of items to deliver: one page worth when an offset was requested,
/// unbounded otherwise.
fn item_budget(page_size: u32, page_offset: u32) -> u32 {
    if page_offset > 0 {
        page_size
    } else {
        0
    }
}

fn parse_url(url: &str) -> ConnectorResult<Url> {
    Url::parse(url)
        .map_err(|e| ConnectorError::invalid_configuration(format!("invalid URL '{url}': {e}")))
}

/// Escape a value for use inside a SCIM filter string literal.
///
/// String values in filter expressions are enclosed in double quotes;
/// escaping backslashes and quotes prevents filter injection.
fn escape_filter_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("plain"), "plain");
        assert_eq!(escape_filter_value("a\"b"), "a\\\"b");
        assert_eq!(escape_filter_value("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_item_budget_applies_only_with_an_offset() {
        assert_eq!(item_budget(10, 0), 0);
        assert_eq!(item_budget(10, 5), 10);
    }
}
