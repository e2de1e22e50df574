use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reminder name under which every logical delete schedules the
/// physical one.
pub const PHYSICAL_DELETION_REMINDER: &str = "physical-deletion";

/// Reminder name for content-addressed cache expiry
/// (DirectoryVersion).
pub const CACHE_EXPIRATION_REMINDER: &str = "cache-expiration";

/// Canonical payload of a scheduled physical deletion. Versioned and
/// explicitly tagged so fields can be added without breaking
/// in-flight reminders across upgrades; the scheduling site and the
/// decode site share this one schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionPayload {
    pub schema_version: u32,
    pub owner_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub repository_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub delete_reason: String,
    pub correlation_id: String,
}

impl DeletionPayload {
    pub const SCHEMA_VERSION: u32 = 1;

    pub fn new(delete_reason: &str, correlation_id: &str) -> Self {
        Self {
            schema_version: Self::SCHEMA_VERSION,
            owner_id: None,
            organization_id: None,
            repository_id: None,
            branch_id: None,
            delete_reason: delete_reason.to_string(),
            correlation_id: correlation_id.to_string(),
        }
    }

    pub fn with_repository(mut self, repository_id: Uuid) -> Self {
        self.repository_id = Some(repository_id);
        self
    }

    pub fn with_branch(mut self, branch_id: Uuid) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    pub fn with_owner(mut self, owner_id: Uuid) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn with_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trips_with_schema_version() {
        let payload = DeletionPayload::new("retire", "c-9")
            .with_repository(Uuid::new_v4())
            .with_branch(Uuid::new_v4());
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["schema_version"], 1);
        let decoded: DeletionPayload = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.delete_reason, "retire");
        assert_eq!(decoded.correlation_id, "c-9");
        assert_eq!(decoded.branch_id, payload.branch_id);
    }

    #[test]
    fn test_unknown_fields_do_not_break_decoding() {
        // An upgraded scheduler may add fields; older decoders must
        // keep working.
        let mut value = serde_json::to_value(DeletionPayload::new("gc", "c-1")).unwrap();
        value["added_in_v2"] = serde_json::json!("whatever");
        assert!(serde_json::from_value::<DeletionPayload>(value).is_ok());
    }
}
