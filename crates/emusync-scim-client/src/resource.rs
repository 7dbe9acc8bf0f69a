//! Resource schema definitions.
//!
//! One [`SchemaDefinition`] per resource type, binding the logical attribute
//! model to the wire structs: how each attribute is set on create, how it
//! turns into a patch operation on update, and how it reads back out of a
//! fetched resource. Nested writable paths (`name.givenName`,
//! `assignee.type`) write straight into owned nested structs.

use emusync_connector::error::ConnectorResult;
use emusync_connector::mapping::AttributeMapper;
use emusync_connector::schema::{SchemaBuilder, SchemaDefinition};
use emusync_connector::value::{AttributeType, AttributeValue};

use crate::models::{CopilotSeat, ScimEmail, ScimGroup, ScimUser};
use crate::patch::PatchOperations;

/// Schema for the SCIM user resource.
pub type UserSchema = SchemaDefinition<ScimUser, PatchOperations, ScimUser>;

/// Schema for the SCIM group resource.
pub type GroupSchema = SchemaDefinition<ScimGroup, PatchOperations, ScimGroup>;

/// Schema for the license seat resource.
pub type SeatSchema = SchemaDefinition<CopilotSeat, PatchOperations, CopilotSeat>;

fn string_of(v: &AttributeValue) -> Option<String> {
    v.as_string().map(String::from)
}

/// Build the user schema.
pub fn user_schema() -> ConnectorResult<UserSchema> {
    SchemaBuilder::new("User")
        // The id for the user. Unique and unchangeable.
        .identity(
            AttributeMapper::new("id", AttributeType::Uuid)
                .on_read(|s: &ScimUser| s.id.clone().map(AttributeValue::from))
                .fetch_field("id")
                .not_creatable()
                .not_updatable(),
        )
        // The login name. Unique and changeable.
        .display_name(
            AttributeMapper::new("userName", AttributeType::StringCaseIgnore)
                .on_create(|v, d: &mut ScimUser| {
                    d.user_name = v.as_string().unwrap_or_default().to_string()
                })
                .on_replace(|v, ops: &mut PatchOperations| ops.replace_with("userName", v))
                .on_read(|s: &ScimUser| Some(AttributeValue::from(s.user_name.clone())))
                .required(),
        )
        .add(
            AttributeMapper::new("externalId", AttributeType::String)
                .on_create(|v, d: &mut ScimUser| d.external_id = string_of(v))
                .on_replace(|v, ops: &mut PatchOperations| ops.replace_with("externalId", v))
                .on_read(|s: &ScimUser| s.external_id.clone().map(AttributeValue::from)),
        )
        .add(
            AttributeMapper::new("name.formatted", AttributeType::String)
                .on_create(|v, d: &mut ScimUser| d.name.formatted = string_of(v))
                .on_replace(|v, ops: &mut PatchOperations| ops.replace_with("name.formatted", v))
                .on_read(|s: &ScimUser| s.name.formatted.clone().map(AttributeValue::from)),
        )
        .add(
            AttributeMapper::new("name.givenName", AttributeType::String)
                .on_create(|v, d: &mut ScimUser| d.name.given_name = string_of(v))
                .on_replace(|v, ops: &mut PatchOperations| ops.replace_with("name.givenName", v))
                .on_read(|s: &ScimUser| s.name.given_name.clone().map(AttributeValue::from)),
        )
        .add(
            AttributeMapper::new("name.familyName", AttributeType::String)
                .on_create(|v, d: &mut ScimUser| d.name.family_name = string_of(v))
                .on_replace(|v, ops: &mut PatchOperations| ops.replace_with("name.familyName", v))
                .on_read(|s: &ScimUser| s.name.family_name.clone().map(AttributeValue::from)),
        )
        .add(
            AttributeMapper::new("displayName", AttributeType::String)
                .on_create(|v, d: &mut ScimUser| d.display_name = string_of(v))
                .on_replace(|v, ops: &mut PatchOperations| ops.replace_with("displayName", v))
                .on_read(|s: &ScimUser| s.display_name.clone().map(AttributeValue::from)),
        )
        // The provider provisions one primary work email per user.
        .add(
            AttributeMapper::new("emails.value", AttributeType::String)
                .on_create(|v, d: &mut ScimUser| {
                    let value = v.as_string().unwrap_or_default().to_string();
                    match d.emails.first_mut() {
                        Some(email) => email.value = value,
                        None => d.emails.push(ScimEmail::work(value)),
                    }
                })
                .on_replace(|v, ops: &mut PatchOperations| {
                    ops.replace_with("emails[type eq \"work\"].value", v)
                })
                .on_read(|s: &ScimUser| {
                    s.emails.first().map(|e| AttributeValue::from(e.value.clone()))
                }),
        )
        .add(
            AttributeMapper::new("active", AttributeType::Boolean)
                .on_create(|v, d: &mut ScimUser| d.active = v.as_boolean())
                .on_replace(|v, ops: &mut PatchOperations| ops.replace_with("active", v))
                .on_read(|s: &ScimUser| s.active.map(AttributeValue::from)),
        )
        .add(
            AttributeMapper::new("roles", AttributeType::String)
                .on_read(|s: &ScimUser| {
                    if s.roles.is_empty() {
                        None
                    } else {
                        Some(AttributeValue::Array(
                            s.roles
                                .iter()
                                .map(|r| AttributeValue::from(r.value.clone()))
                                .collect(),
                        ))
                    }
                })
                .not_creatable()
                .not_updatable(),
        )
        // Membership is resolved through the group resource; fetching it
        // here costs an extra projection, so it is off by default.
        .add(
            AttributeMapper::new("groups", AttributeType::String)
                .on_read(|s: &ScimUser| {
                    if s.groups.is_empty() {
                        None
                    } else {
                        Some(AttributeValue::Array(
                            s.groups
                                .iter()
                                .map(|g| AttributeValue::from(g.value.clone()))
                                .collect(),
                        ))
                    }
                })
                .fetch_field("groups")
                .not_creatable()
                .not_updatable()
                .not_returned_by_default(),
        )
        .add(
            AttributeMapper::new("meta.created", AttributeType::DateTimeString)
                .on_read(|s: &ScimUser| {
                    s.meta
                        .as_ref()
                        .and_then(|m| m.created.clone())
                        .map(AttributeValue::from)
                })
                .fetch_field("meta")
                .not_creatable()
                .not_updatable(),
        )
        .add(
            AttributeMapper::new("meta.lastModified", AttributeType::DateTimeString)
                .on_read(|s: &ScimUser| {
                    s.meta
                        .as_ref()
                        .and_then(|m| m.last_modified.clone())
                        .map(AttributeValue::from)
                })
                .fetch_field("meta")
                .not_creatable()
                .not_updatable(),
        )
        .build()
}

/// Build the group schema.
pub fn group_schema() -> ConnectorResult<GroupSchema> {
    SchemaBuilder::new("Group")
        // The id for the group. Unique and unchangeable.
        .identity(
            AttributeMapper::new("id", AttributeType::Uuid)
                .on_read(|s: &ScimGroup| s.id.clone().map(AttributeValue::from))
                .fetch_field("id")
                .not_creatable()
                .not_updatable(),
        )
        // The display name. Unique and changeable.
        .display_name(
            AttributeMapper::new("displayName", AttributeType::StringCaseIgnore)
                .on_create(|v, d: &mut ScimGroup| {
                    d.display_name = v.as_string().unwrap_or_default().to_string()
                })
                .on_replace(|v, ops: &mut PatchOperations| ops.replace_with("displayName", v))
                .on_read(|s: &ScimGroup| Some(AttributeValue::from(s.display_name.clone())))
                .required(),
        )
        .add(
            AttributeMapper::new("externalId", AttributeType::String)
                .on_create(|v, d: &mut ScimGroup| d.external_id = string_of(v))
                .on_replace(|v, ops: &mut PatchOperations| ops.replace_with("externalId", v))
                .on_read(|s: &ScimGroup| s.external_id.clone().map(AttributeValue::from)),
        )
        // Members are edited with dedicated add/remove patch operations,
        // not replace semantics, so the engine only reads them.
        .add(
            AttributeMapper::new("members", AttributeType::String)
                .on_read(|s: &ScimGroup| {
                    if s.members.is_empty() {
                        None
                    } else {
                        Some(AttributeValue::Array(
                            s.members
                                .iter()
                                .map(|m| AttributeValue::from(m.value.clone()))
                                .collect(),
                        ))
                    }
                })
                .fetch_field("members")
                .not_creatable()
                .not_updatable()
                .not_returned_by_default(),
        )
        .add(
            AttributeMapper::new("meta.created", AttributeType::DateTimeString)
                .on_read(|s: &ScimGroup| {
                    s.meta
                        .as_ref()
                        .and_then(|m| m.created.clone())
                        .map(AttributeValue::from)
                })
                .fetch_field("meta")
                .not_creatable()
                .not_updatable(),
        )
        .add(
            AttributeMapper::new("meta.lastModified", AttributeType::DateTimeString)
                .on_read(|s: &ScimGroup| {
                    s.meta
                        .as_ref()
                        .and_then(|m| m.last_modified.clone())
                        .map(AttributeValue::from)
                })
                .fetch_field("meta")
                .not_creatable()
                .not_updatable(),
        )
        .build()
}

/// Build the seat schema.
pub fn seat_schema() -> ConnectorResult<SeatSchema> {
    SchemaBuilder::new("CopilotSeat")
        // The id for the seat. Unique and unchangeable.
        .identity(
            AttributeMapper::new("id", AttributeType::Uuid)
                .on_read(|s: &CopilotSeat| s.assignee.id.clone().map(AttributeValue::from))
                .fetch_field("id")
                .not_creatable()
                .not_updatable(),
        )
        // The assignee login. Unique and changeable.
        .display_name(
            AttributeMapper::new("displayName", AttributeType::StringCaseIgnore)
                .on_create(|v, d: &mut CopilotSeat| {
                    d.assignee.login = v.as_string().unwrap_or_default().to_string()
                })
                .on_replace(|v, ops: &mut PatchOperations| ops.replace_with("displayName", v))
                .on_read(|s: &CopilotSeat| Some(AttributeValue::from(s.assignee.login.clone())))
                .required(),
        )
        // Metadata (readonly)
        .add(
            AttributeMapper::new("created_at", AttributeType::DateTimeString)
                .on_read(|s: &CopilotSeat| s.created_at.clone().map(AttributeValue::from))
                .not_creatable()
                .not_updatable(),
        )
        .add(
            AttributeMapper::new("last_authenticated_at", AttributeType::DateTimeString)
                .on_read(|s: &CopilotSeat| {
                    s.last_authenticated_at.clone().map(AttributeValue::from)
                })
                .not_creatable()
                .not_updatable(),
        )
        .add(
            AttributeMapper::new("updated_at", AttributeType::DateTimeString)
                .on_read(|s: &CopilotSeat| s.updated_at.clone().map(AttributeValue::from))
                .not_creatable()
                .not_updatable(),
        )
        .add(
            AttributeMapper::new("last_activity_at", AttributeType::DateTimeString)
                .on_read(|s: &CopilotSeat| s.last_activity_at.clone().map(AttributeValue::from))
                .not_creatable()
                .not_updatable(),
        )
        .add(
            AttributeMapper::new("pending_cancellation_date", AttributeType::DateString)
                .on_read(|s: &CopilotSeat| {
                    s.pending_cancellation_date.clone().map(AttributeValue::from)
                })
                .not_creatable()
                .not_updatable(),
        )
        .add(
            AttributeMapper::new("last_activity_editor", AttributeType::String)
                .on_create(|v, d: &mut CopilotSeat| d.last_activity_editor = string_of(v))
                .on_replace(|v, ops: &mut PatchOperations| {
                    ops.replace_with("last_activity_editor", v)
                })
                .on_read(|s: &CopilotSeat| {
                    s.last_activity_editor.clone().map(AttributeValue::from)
                }),
        )
        .add(
            AttributeMapper::new("plan_type", AttributeType::String)
                .on_create(|v, d: &mut CopilotSeat| d.plan_type = string_of(v))
                .on_replace(|v, ops: &mut PatchOperations| ops.replace_with("plan_type", v))
                .on_read(|s: &CopilotSeat| s.plan_type.clone().map(AttributeValue::from)),
        )
        .add(
            AttributeMapper::new("assignee.type", AttributeType::String)
                .on_create(|v, d: &mut CopilotSeat| d.assignee.assignee_type = string_of(v))
                .on_replace(|v, ops: &mut PatchOperations| ops.replace_with("assignee.type", v))
                .on_read(|s: &CopilotSeat| {
                    s.assignee.assignee_type.clone().map(AttributeValue::from)
                }),
        )
        .add(
            AttributeMapper::new("assigning_team.slug", AttributeType::String)
                .on_create(|v, d: &mut CopilotSeat| d.assigning_team.slug = string_of(v))
                .on_replace(|v, ops: &mut PatchOperations| {
                    ops.replace_with("assigning_team.slug", v)
                })
                .on_read(|s: &CopilotSeat| s.assigning_team.slug.clone().map(AttributeValue::from)),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use emusync_connector::error::ConnectorError;
    use emusync_connector::operation::AttributeSet;

    #[test]
    fn test_user_schema_create_populates_wire_object() {
        let schema = user_schema().unwrap();
        let attrs = AttributeSet::new()
            .with("userName", "jdoe")
            .with("name.givenName", "Jane")
            .with("name.familyName", "Doe")
            .with("emails.value", "jane@example.com")
            .with("active", true);

        let mut user = ScimUser::default();
        schema.apply(&attrs, &mut user).unwrap();

        assert_eq!(user.user_name, "jdoe");
        assert_eq!(user.name.given_name.as_deref(), Some("Jane"));
        assert_eq!(user.name.family_name.as_deref(), Some("Doe"));
        assert_eq!(user.emails[0].value, "jane@example.com");
        assert_eq!(user.emails[0].email_type.as_deref(), Some("work"));
        assert_eq!(user.active, Some(true));
    }

    #[test]
    fn test_user_schema_rejects_unknown_attributes() {
        let schema = user_schema().unwrap();
        let attrs = AttributeSet::new()
            .with("userName", "jdoe")
            .with("favoriteColor", "green");
        let err = schema.apply(&attrs, &mut ScimUser::default()).unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::UnknownAttribute { attribute, .. } if attribute == "favoriteColor"
        ));
    }

    #[test]
    fn test_user_schema_delta_builds_patch_envelope() {
        let schema = user_schema().unwrap();
        let deltas = AttributeSet::new()
            .with("displayName", "Jane D.")
            .with("active", false);

        let mut ops = PatchOperations::new();
        let changed = schema.apply_delta(&deltas, &mut ops).unwrap();

        assert!(changed);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops.operations[0].path.as_deref(), Some("displayName"));
        assert_eq!(
            ops.operations[1].value,
            Some(serde_json::Value::Bool(false))
        );
    }

    #[test]
    fn test_user_schema_readonly_delta_changes_nothing() {
        let schema = user_schema().unwrap();
        let deltas = AttributeSet::new().with("roles", "admin");
        let mut ops = PatchOperations::new();
        let changed = schema.apply_delta(&deltas, &mut ops).unwrap();
        assert!(!changed);
        assert!(ops.is_empty());
    }

    #[test]
    fn test_user_schema_materializes_groups_as_incomplete_by_default() {
        let schema = user_schema().unwrap();
        let user: ScimUser = serde_json::from_value(serde_json::json!({
            "id": "u-1",
            "userName": "jdoe",
            "groups": [{"value": "g-1"}]
        }))
        .unwrap();

        let object = schema.materialize(&user, None, true).unwrap();
        let groups = object.attribute("groups").unwrap();
        assert!(!groups.complete);
        assert!(groups.values.is_empty());

        // With partial values disallowed the real membership comes back.
        let object = schema.materialize(&user, None, false).unwrap();
        let groups = object.attribute("groups").unwrap();
        assert!(groups.complete);
        assert_eq!(groups.values, vec![AttributeValue::from("g-1")]);
    }

    #[test]
    fn test_group_schema_round_trip() {
        let schema = group_schema().unwrap();
        let attrs = AttributeSet::new()
            .with("displayName", "platform")
            .with("externalId", "ext-9");
        let mut group = ScimGroup::default();
        schema.apply(&attrs, &mut group).unwrap();
        assert_eq!(group.display_name, "platform");
        assert_eq!(group.external_id.as_deref(), Some("ext-9"));

        let fetched: ScimGroup = serde_json::from_value(serde_json::json!({
            "id": "g-1",
            "displayName": "platform",
            "members": [{"value": "u-1"}, {"value": "u-2"}]
        }))
        .unwrap();
        let object = schema.materialize(&fetched, None, false).unwrap();
        assert_eq!(object.uid.value(), "g-1");
        assert_eq!(object.name, "platform");
        assert_eq!(object.attribute("members").unwrap().values.len(), 2);
    }

    #[test]
    fn test_seat_schema_matches_wire_shape() {
        let schema = seat_schema().unwrap();
        let seat: CopilotSeat = serde_json::from_value(serde_json::json!({
            "assignee": {"id": "s-1", "login": "jdoe", "type": "User"},
            "assigning_team": {"slug": "platform"},
            "plan_type": "business",
            "created_at": "2026-02-10T00:00:00+00:00",
            "pending_cancellation_date": "2026-03-01"
        }))
        .unwrap();

        let object = schema.materialize(&seat, None, false).unwrap();
        assert_eq!(object.uid.value(), "s-1");
        assert_eq!(object.name, "jdoe");
        assert_eq!(
            object.value("assignee.type"),
            Some(&AttributeValue::from("User"))
        );
        assert_eq!(
            object.value("assigning_team.slug"),
            Some(&AttributeValue::from("platform"))
        );
        // Date fields come back parsed, not as raw strings.
        assert!(object
            .value("created_at")
            .and_then(|v| v.as_datetime())
            .is_some());
        assert!(object
            .value("pending_cancellation_date")
            .and_then(|v| v.as_datetime())
            .is_some());
    }

    #[test]
    fn test_seat_schema_create_writes_nested_paths() {
        let schema = seat_schema().unwrap();
        let attrs = AttributeSet::new()
            .with("displayName", "jdoe")
            .with("assignee.type", "User")
            .with("assigning_team.slug", "platform")
            .with("plan_type", "business");

        let mut seat = CopilotSeat::default();
        schema.apply(&attrs, &mut seat).unwrap();

        assert_eq!(seat.assignee.login, "jdoe");
        assert_eq!(seat.assignee.assignee_type.as_deref(), Some("User"));
        assert_eq!(seat.assigning_team.slug.as_deref(), Some("platform"));
        assert_eq!(seat.plan_type.as_deref(), Some("business"));
    }

    #[test]
    fn test_seat_schema_delta_targets_dotted_paths() {
        let schema = seat_schema().unwrap();
        let deltas = AttributeSet::new().with("assignee.type", "ServiceAccount");
        let mut ops = PatchOperations::new();
        assert!(schema.apply_delta(&deltas, &mut ops).unwrap());
        assert_eq!(ops.operations[0].path.as_deref(), Some("assignee.type"));
    }

    #[test]
    fn test_schemas_expose_fetch_views() {
        let schema = user_schema().unwrap();
        let default_names: Vec<&str> = schema
            .returned_by_default()
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert!(default_names.contains(&"id"));
        assert!(default_names.contains(&"userName"));
        assert!(!default_names.contains(&"groups"));
        assert_eq!(schema.fetch_field_of("meta.created"), Some("meta"));
    }
}
