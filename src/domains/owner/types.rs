use crate::domains::core::actor_state::{EventSourcedDto, RecordedEvent};
use crate::domains::core::events::GraceEvent;
use crate::types::{EntityKind, OwnerType, SearchVisibility};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owner entity read-model - the top of the entity hierarchy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerDto {
    pub owner_id: Uuid,
    pub owner_name: String,
    pub owner_type: OwnerType,
    pub description: String,
    pub search_visibility: SearchVisibility,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub delete_reason: String,
}

/// Commands accepted by the owner actor
#[derive(Debug, Clone)]
pub enum OwnerCommand {
    Create {
        owner_name: String,
        owner_type: OwnerType,
        search_visibility: SearchVisibility,
    },
    SetName {
        owner_name: String,
    },
    SetType {
        owner_type: OwnerType,
    },
    SetDescription {
        description: String,
    },
    SetSearchVisibility {
        search_visibility: SearchVisibility,
    },
    DeleteLogical {
        delete_reason: String,
        force: bool,
    },
    DeletePhysical,
    Undelete,
}

/// Events recorded against an owner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OwnerEvent {
    Created {
        owner_id: Uuid,
        owner_name: String,
        owner_type: OwnerType,
        search_visibility: SearchVisibility,
    },
    NameSet {
        owner_name: String,
    },
    TypeSet {
        owner_type: OwnerType,
    },
    DescriptionSet {
        description: String,
    },
    SearchVisibilitySet {
        search_visibility: SearchVisibility,
    },
    LogicalDeleted {
        delete_reason: String,
    },
    Undeleted,
    PhysicalDeleted,
}

impl EventSourcedDto for OwnerDto {
    type Event = OwnerEvent;

    const KIND: EntityKind = EntityKind::Owner;

    fn update_dto(mut dto: Self, recorded: &RecordedEvent<OwnerEvent>) -> Self {
        let at = recorded.metadata.timestamp;
        match &recorded.event {
            OwnerEvent::Created {
                owner_id,
                owner_name,
                owner_type,
                search_visibility,
            } => {
                dto.owner_id = *owner_id;
                dto.owner_name = owner_name.clone();
                dto.owner_type = *owner_type;
                dto.search_visibility = *search_visibility;
                dto.created_at = Some(at);
            }
            OwnerEvent::NameSet { owner_name } => dto.owner_name = owner_name.clone(),
            OwnerEvent::TypeSet { owner_type } => dto.owner_type = *owner_type,
            OwnerEvent::DescriptionSet { description } => dto.description = description.clone(),
            OwnerEvent::SearchVisibilitySet { search_visibility } => {
                dto.search_visibility = *search_visibility
            }
            OwnerEvent::LogicalDeleted { delete_reason } => {
                dto.deleted_at = Some(at);
                dto.delete_reason = delete_reason.clone();
            }
            OwnerEvent::Undeleted => {
                dto.deleted_at = None;
                dto.delete_reason.clear();
            }
            OwnerEvent::PhysicalDeleted => return OwnerDto::default(),
        }
        dto.updated_at = Some(at);
        dto
    }

    fn event_name(event: &OwnerEvent) -> &'static str {
        match event {
            OwnerEvent::Created { .. } => "Created",
            OwnerEvent::NameSet { .. } => "NameSet",
            OwnerEvent::TypeSet { .. } => "TypeSet",
            OwnerEvent::DescriptionSet { .. } => "DescriptionSet",
            OwnerEvent::SearchVisibilitySet { .. } => "SearchVisibilitySet",
            OwnerEvent::LogicalDeleted { .. } => "LogicalDeleted",
            OwnerEvent::Undeleted => "Undeleted",
            OwnerEvent::PhysicalDeleted => "PhysicalDeleted",
        }
    }

    fn wrap(event: OwnerEvent) -> GraceEvent {
        GraceEvent::OwnerEvent(event)
    }
}
