use crate::domains::core::actor_state::{EventSourcedDto, RecordedEvent};
use crate::domains::core::events::GraceEvent;
use crate::types::{derived_actor_id, EntityKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One file captured by a directory version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub relative_path: String,
    pub sha256_hash: String,
    pub size: u64,
}

/// DirectoryVersion entity read-model. Content-addressed:
/// (repository-id, sha256) is unique and determines the actor id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryVersionDto {
    pub directory_version_id: Uuid,
    pub repository_id: Uuid,
    pub sha256_hash: String,
    pub relative_path: String,
    pub files: Vec<FileEntry>,
    pub size: u64,
    pub directories: Vec<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Commands accepted by the directory-version actor
#[derive(Debug, Clone)]
pub enum DirectoryVersionCommand {
    Create {
        directory_version_id: Uuid,
        repository_id: Uuid,
        sha256_hash: String,
        relative_path: String,
        files: Vec<FileEntry>,
        size: u64,
        directories: Vec<Uuid>,
    },
    DeletePhysical,
}

/// Events recorded against a directory version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DirectoryVersionEvent {
    Created {
        directory_version_id: Uuid,
        repository_id: Uuid,
        sha256_hash: String,
        relative_path: String,
        files: Vec<FileEntry>,
        size: u64,
        directories: Vec<Uuid>,
    },
    PhysicalDeleted,
}

/// Content-addressed actor id for a directory version: derived from
/// the repository scope plus the directory sha256, so a lookup by
/// (repository-id, sha256) lands on the caching actor directly.
pub fn directory_version_actor_id(repository_id: Uuid, sha256_hash: &str) -> Uuid {
    derived_actor_id(&format!("{}|{}", repository_id, sha256_hash))
}

impl EventSourcedDto for DirectoryVersionDto {
    type Event = DirectoryVersionEvent;

    const KIND: EntityKind = EntityKind::DirectoryVersion;

    fn update_dto(mut dto: Self, recorded: &RecordedEvent<DirectoryVersionEvent>) -> Self {
        let at = recorded.metadata.timestamp;
        match &recorded.event {
            DirectoryVersionEvent::Created {
                directory_version_id,
                repository_id,
                sha256_hash,
                relative_path,
                files,
                size,
                directories,
            } => {
                dto.directory_version_id = *directory_version_id;
                dto.repository_id = *repository_id;
                dto.sha256_hash = sha256_hash.clone();
                dto.relative_path = relative_path.clone();
                dto.files = files.clone();
                dto.size = *size;
                dto.directories = directories.clone();
                dto.created_at = Some(at);
            }
            DirectoryVersionEvent::PhysicalDeleted => return DirectoryVersionDto::default(),
        }
        dto.updated_at = Some(at);
        dto
    }

    fn event_name(event: &DirectoryVersionEvent) -> &'static str {
        match event {
            DirectoryVersionEvent::Created { .. } => "Created",
            DirectoryVersionEvent::PhysicalDeleted => "PhysicalDeleted",
        }
    }

    fn wrap(event: DirectoryVersionEvent) -> GraceEvent {
        GraceEvent::DirectoryVersionEvent(event)
    }
}
