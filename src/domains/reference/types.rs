use crate::domains::core::actor_state::{EventSourcedDto, RecordedEvent};
use crate::domains::core::events::GraceEvent;
use crate::types::{EntityKind, ReferenceType, RetentionPolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference entity read-model. Immutable once created apart from
/// (un)deletion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceDto {
    pub reference_id: Uuid,
    pub repository_id: Uuid,
    pub branch_id: Uuid,
    pub directory_version_id: Uuid,
    pub sha256_hash: String,
    pub reference_type: ReferenceType,
    pub reference_text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub delete_reason: String,
}

/// Commands accepted by the reference actor. Cascading deletes pass
/// the repository retention down with the command so a parent holding
/// its own turn is never re-entered for a lookup.
#[derive(Debug, Clone)]
pub enum ReferenceCommand {
    Create {
        repository_id: Uuid,
        branch_id: Uuid,
        directory_version_id: Uuid,
        sha256_hash: String,
        reference_type: ReferenceType,
        reference_text: String,
    },
    DeleteLogical {
        delete_reason: String,
        retention: Option<RetentionPolicy>,
    },
    DeletePhysical,
    Undelete,
}

/// Events recorded against a reference
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReferenceEvent {
    Created {
        reference_id: Uuid,
        repository_id: Uuid,
        branch_id: Uuid,
        directory_version_id: Uuid,
        sha256_hash: String,
        reference_type: ReferenceType,
        reference_text: String,
    },
    LogicalDeleted {
        delete_reason: String,
    },
    Undeleted,
    PhysicalDeleted,
}

impl EventSourcedDto for ReferenceDto {
    type Event = ReferenceEvent;

    const KIND: EntityKind = EntityKind::Reference;

    fn update_dto(mut dto: Self, recorded: &RecordedEvent<ReferenceEvent>) -> Self {
        let at = recorded.metadata.timestamp;
        match &recorded.event {
            ReferenceEvent::Created {
                reference_id,
                repository_id,
                branch_id,
                directory_version_id,
                sha256_hash,
                reference_type,
                reference_text,
            } => {
                dto.reference_id = *reference_id;
                dto.repository_id = *repository_id;
                dto.branch_id = *branch_id;
                dto.directory_version_id = *directory_version_id;
                dto.sha256_hash = sha256_hash.clone();
                dto.reference_type = *reference_type;
                dto.reference_text = reference_text.clone();
                dto.created_at = Some(at);
            }
            ReferenceEvent::LogicalDeleted { delete_reason } => {
                dto.deleted_at = Some(at);
                dto.delete_reason = delete_reason.clone();
            }
            ReferenceEvent::Undeleted => {
                dto.deleted_at = None;
                dto.delete_reason.clear();
            }
            ReferenceEvent::PhysicalDeleted => return ReferenceDto::default(),
        }
        dto.updated_at = Some(at);
        dto
    }

    fn event_name(event: &ReferenceEvent) -> &'static str {
        match event {
            ReferenceEvent::Created { .. } => "Created",
            ReferenceEvent::LogicalDeleted { .. } => "LogicalDeleted",
            ReferenceEvent::Undeleted => "Undeleted",
            ReferenceEvent::PhysicalDeleted => "PhysicalDeleted",
        }
    }

    fn wrap(event: ReferenceEvent) -> GraceEvent {
        GraceEvent::ReferenceEvent(event)
    }
}
