use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{DomainError, ValidationError};

/// Entity kinds hosted by the actor runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Owner,
    Organization,
    Repository,
    Branch,
    Reference,
    DirectoryVersion,
    RepositoryName,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Owner => "owner",
            EntityKind::Organization => "organization",
            EntityKind::Repository => "repository",
            EntityKind::Branch => "branch",
            EntityKind::Reference => "reference",
            EntityKind::DirectoryVersion => "directory_version",
            EntityKind::RepositoryName => "repository_name",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata accompanying every command and every published event.
/// The correlation id is client-supplied, required, and may not be
/// reused against the same entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
    pub properties: HashMap<String, String>,
}

impl EventMetadata {
    pub fn new(correlation_id: &str) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            timestamp: Utc::now(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }
}

/// Reference variants. Fixed at creation (invariant of the data model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReferenceType {
    #[default]
    Promotion,
    Commit,
    Checkpoint,
    Save,
    Tag,
    External,
    Rebase,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Promotion => "promotion",
            ReferenceType::Commit => "commit",
            ReferenceType::Checkpoint => "checkpoint",
            ReferenceType::Save => "save",
            ReferenceType::Tag => "tag",
            ReferenceType::External => "external",
            ReferenceType::Rebase => "rebase",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "promotion" => Ok(ReferenceType::Promotion),
            "commit" => Ok(ReferenceType::Commit),
            "checkpoint" => Ok(ReferenceType::Checkpoint),
            "save" => Ok(ReferenceType::Save),
            "tag" => Ok(ReferenceType::Tag),
            "external" => Ok(ReferenceType::External),
            "rebase" => Ok(ReferenceType::Rebase),
            _ => Err(DomainError::Validation(ValidationError::invalid_value(
                "reference_type",
                &format!("unknown reference type: {}", s),
            ))),
        }
    }
}

/// Owner account variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OwnerType {
    #[default]
    User,
    Organization,
}

impl OwnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerType::User => "user",
            OwnerType::Organization => "organization",
        }
    }
}

impl FromStr for OwnerType {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(OwnerType::User),
            "organization" => Ok(OwnerType::Organization),
            _ => Err(DomainError::Validation(ValidationError::invalid_value(
                "owner_type",
                &format!("unknown owner type: {}", s),
            ))),
        }
    }
}

/// Organization visibility variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OrganizationType {
    Public,
    #[default]
    Private,
}

impl OrganizationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationType::Public => "public",
            OrganizationType::Private => "private",
        }
    }
}

/// Whether an owner or organization appears in search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SearchVisibility {
    #[default]
    Visible,
    NotVisible,
}

impl SearchVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchVisibility::Visible => "visible",
            SearchVisibility::NotVisible => "not_visible",
        }
    }
}

/// Repository visibility variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RepositoryVisibility {
    #[default]
    Private,
    Public,
}

impl RepositoryVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryVisibility::Private => "private",
            RepositoryVisibility::Public => "public",
        }
    }
}

impl FromStr for RepositoryVisibility {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(RepositoryVisibility::Private),
            "public" => Ok(RepositoryVisibility::Public),
            _ => Err(DomainError::Validation(ValidationError::invalid_value(
                "visibility",
                &format!("unknown repository visibility: {}", s),
            ))),
        }
    }
}

/// Repository lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RepositoryStatus {
    #[default]
    Active,
    Suspended,
    Closed,
}

impl RepositoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryStatus::Active => "active",
            RepositoryStatus::Suspended => "suspended",
            RepositoryStatus::Closed => "closed",
        }
    }
}

impl FromStr for RepositoryStatus {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RepositoryStatus::Active),
            "suspended" => Ok(RepositoryStatus::Suspended),
            "closed" => Ok(RepositoryStatus::Closed),
            _ => Err(DomainError::Validation(ValidationError::invalid_value(
                "status",
                &format!("unknown repository status: {}", s),
            ))),
        }
    }
}

/// Per-repository retention policy, in whole days. Zero means
/// immediate expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub save_days: u32,
    pub checkpoint_days: u32,
    pub diff_cache_days: u32,
    pub directory_version_cache_days: u32,
    pub logical_delete_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            save_days: 7,
            checkpoint_days: 30,
            diff_cache_days: 30,
            directory_version_cache_days: 30,
            logical_delete_days: 30,
        }
    }
}

/// Enriched Ok value returned by every actor `handle`: the applied
/// event's type name, the entity id, and any ids minted or resolved
/// along the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub event_name: String,
    pub entity_id: Uuid,
    pub properties: HashMap<String, String>,
}

impl CommandOutcome {
    pub fn new(event_name: &str, entity_id: Uuid) -> Self {
        Self {
            event_name: event_name.to_string(),
            entity_id,
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }
}

/// Derives a stable actor id from an arbitrary lookup key. Used by
/// the content-addressed DirectoryVersion cache and the
/// RepositoryName index, whose actors are addressed by what they
/// cache rather than by a client-minted UUID.
pub fn derived_actor_id(key: &str) -> Uuid {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_type_round_trip() {
        for rt in [
            ReferenceType::Promotion,
            ReferenceType::Commit,
            ReferenceType::Checkpoint,
            ReferenceType::Save,
            ReferenceType::Tag,
            ReferenceType::External,
            ReferenceType::Rebase,
        ] {
            assert_eq!(ReferenceType::from_str(rt.as_str()).unwrap(), rt);
        }
        assert!(ReferenceType::from_str("snapshot").is_err());
    }

    #[test]
    fn test_derived_actor_id_is_stable() {
        let a = derived_actor_id("demo|o1|g1");
        let b = derived_actor_id("demo|o1|g1");
        let c = derived_actor_id("demo|o1|g2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_retention_defaults() {
        let retention = RetentionPolicy::default();
        assert_eq!(retention.save_days, 7);
        assert_eq!(retention.logical_delete_days, 30);
    }
}
