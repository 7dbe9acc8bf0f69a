//! SCIM wire models for the enterprise directory provider.
//!
//! Nested writable structures (`ScimName`, `SeatAssignee`, `AssigningTeam`)
//! are owned and default-constructed rather than optional, so a dotted
//! write like `assignee.type` never traverses a nullable intermediate;
//! empty nested structures are skipped on serialization instead.

use serde::{Deserialize, Serialize};

use crate::page::{OffsetPage, Page};

/// SCIM structured-resource content type, sent on POST/PATCH bodies.
pub const SCIM_CONTENT_TYPE: &str = "application/scim+json";

/// Provider API version header name.
pub const API_VERSION_HEADER: &str = "X-Api-Version";

/// SCIM core user schema URN.
pub const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";

/// SCIM core group schema URN.
pub const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";

/// SCIM patch-operations envelope URN.
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// A user's structured name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScimName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

impl ScimName {
    /// Whether no component is set (skipped on serialization).
    pub fn is_empty(&self) -> bool {
        self.formatted.is_none() && self.given_name.is_none() && self.family_name.is_none()
    }
}

/// An email address entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScimEmail {
    pub value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub email_type: Option<String>,
    pub primary: bool,
}

impl ScimEmail {
    /// A primary work email, the shape the provider provisions by default.
    pub fn work(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            email_type: Some("work".to_string()),
            primary: true,
        }
    }
}

/// A role entry on a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScimRole {
    pub value: String,
    pub primary: bool,
}

/// A group membership reference on a user (read-only on the user resource).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScimGroupRef {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Resource metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScimMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// A SCIM user resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScimUser {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub user_name: String,
    #[serde(skip_serializing_if = "ScimName::is_empty")]
    pub name: ScimName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<ScimEmail>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<ScimRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<ScimGroupRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ScimMeta>,
}

/// A member entry on a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScimGroupMember {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// A SCIM group resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScimGroup {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub display_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<ScimGroupMember>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ScimMeta>,
}

/// The account a license seat is assigned to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeatAssignee {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub login: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub assignee_type: Option<String>,
}

impl SeatAssignee {
    /// Whether nothing is set (skipped on serialization).
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.login.is_empty() && self.assignee_type.is_none()
    }
}

/// The team through which a seat was assigned, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssigningTeam {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl AssigningTeam {
    /// Whether nothing is set (skipped on serialization).
    pub fn is_empty(&self) -> bool {
        self.slug.is_none()
    }
}

/// A license seat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopilotSeat {
    #[serde(skip_serializing_if = "SeatAssignee::is_empty")]
    pub assignee: SeatAssignee,
    #[serde(skip_serializing_if = "AssigningTeam::is_empty")]
    pub assigning_team: AssigningTeam,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_editor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_authenticated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<String>,
    /// Calendar date, set when the seat is scheduled for cancellation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_cancellation_date: Option<String>,
}

/// A SCIM list response page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScimListResponse<T> {
    pub schemas: Vec<String>,
    pub total_results: u32,
    pub items_per_page: u32,
    pub start_index: u32,
    #[serde(rename = "Resources")]
    pub resources: Vec<T>,
}

impl<T> Default for ScimListResponse<T> {
    fn default() -> Self {
        Self {
            schemas: Vec::new(),
            total_results: 0,
            items_per_page: 0,
            start_index: 0,
            resources: Vec::new(),
        }
    }
}

impl<T: serde::de::DeserializeOwned + Send> Page for ScimListResponse<T> {
    type Item = T;

    fn total(&self) -> u32 {
        self.total_results
    }

    fn into_items(self) -> Vec<T> {
        self.resources
    }
}

impl<T: serde::de::DeserializeOwned + Send> OffsetPage for ScimListResponse<T> {
    fn start_index(&self) -> u32 {
        self.start_index
    }

    fn items_per_page(&self) -> u32 {
        self.items_per_page
    }
}

/// A seat listing page. The next page, when one exists, is announced in the
/// `Link` response header rather than in the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeatPage<T> {
    pub total_seats: u32,
    pub seats: Vec<T>,
}

impl<T> Default for SeatPage<T> {
    fn default() -> Self {
        Self {
            total_seats: 0,
            seats: Vec::new(),
        }
    }
}

impl<T: serde::de::DeserializeOwned + Send> Page for SeatPage<T> {
    type Item = T;

    fn total(&self) -> u32 {
        self.total_seats
    }

    fn into_items(self) -> Vec<T> {
        self.seats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serialization_skips_empty_nested_name() {
        let user = ScimUser {
            user_name: "jdoe".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json, serde_json::json!({"userName": "jdoe"}));
    }

    #[test]
    fn test_user_round_trip() {
        let raw = serde_json::json!({
            "schemas": [USER_SCHEMA],
            "id": "u-1",
            "externalId": "ext-1",
            "userName": "jdoe",
            "name": {"givenName": "Jane", "familyName": "Doe", "formatted": "Jane Doe"},
            "emails": [{"value": "jane@example.com", "type": "work", "primary": true}],
            "active": true,
            "groups": [{"value": "g-1", "display": "devs"}],
            "meta": {"resourceType": "User", "created": "2026-01-01T00:00:00Z"}
        });
        let user: ScimUser = serde_json::from_value(raw).unwrap();
        assert_eq!(user.name.given_name.as_deref(), Some("Jane"));
        assert_eq!(user.emails[0].email_type.as_deref(), Some("work"));
        assert_eq!(user.groups[0].value, "g-1");
        assert_eq!(user.active, Some(true));
    }

    #[test]
    fn test_seat_nested_writes_need_no_null_checks() {
        let mut seat = CopilotSeat::default();
        seat.assignee.login = "jdoe".to_string();
        seat.assignee.assignee_type = Some("User".to_string());
        seat.assigning_team.slug = Some("platform".to_string());

        let json = serde_json::to_value(&seat).unwrap();
        assert_eq!(json["assignee"]["type"], "User");
        assert_eq!(json["assigning_team"]["slug"], "platform");
    }

    #[test]
    fn test_empty_seat_serializes_to_nothing() {
        let seat = CopilotSeat::default();
        let json = serde_json::to_value(&seat).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_list_response_deserializes_resources_key() {
        let raw = serde_json::json!({
            "totalResults": 2,
            "itemsPerPage": 2,
            "startIndex": 0,
            "Resources": [
                {"userName": "a"},
                {"userName": "b"}
            ]
        });
        let page: ScimListResponse<ScimUser> = serde_json::from_value(raw).unwrap();
        assert_eq!(page.total(), 2);
        assert_eq!(page.into_items().len(), 2);
    }

    #[test]
    fn test_seat_page_total() {
        let raw = serde_json::json!({
            "total_seats": 7,
            "seats": [{"assignee": {"login": "jdoe"}}]
        });
        let page: SeatPage<CopilotSeat> = serde_json::from_value(raw).unwrap();
        assert_eq!(page.total(), 7);
        let seats = page.into_items();
        assert_eq!(seats[0].assignee.login, "jdoe");
    }
}
