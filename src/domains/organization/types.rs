use crate::domains::core::actor_state::{EventSourcedDto, RecordedEvent};
use crate::domains::core::events::GraceEvent;
use crate::types::{EntityKind, OrganizationType, SearchVisibility};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Organization entity read-model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationDto {
    pub organization_id: Uuid,
    pub owner_id: Uuid,
    pub organization_name: String,
    pub organization_type: OrganizationType,
    pub search_visibility: SearchVisibility,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub delete_reason: String,
}

/// Commands accepted by the organization actor
#[derive(Debug, Clone)]
pub enum OrganizationCommand {
    Create {
        owner_id: Uuid,
        organization_name: String,
        organization_type: OrganizationType,
        search_visibility: SearchVisibility,
    },
    SetName {
        organization_name: String,
    },
    SetType {
        organization_type: OrganizationType,
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

/// Events recorded against an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrganizationEvent {
    Created {
        organization_id: Uuid,
        owner_id: Uuid,
        organization_name: String,
        organization_type: OrganizationType,
        search_visibility: SearchVisibility,
    },
    NameSet {
        organization_name: String,
    },
    TypeSet {
        organization_type: OrganizationType,
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

impl EventSourcedDto for OrganizationDto {
    type Event = OrganizationEvent;

    const KIND: EntityKind = EntityKind::Organization;

    fn update_dto(mut dto: Self, recorded: &RecordedEvent<OrganizationEvent>) -> Self {
        let at = recorded.metadata.timestamp;
        match &recorded.event {
            OrganizationEvent::Created {
                organization_id,
                owner_id,
                organization_name,
                organization_type,
                search_visibility,
            } => {
                dto.organization_id = *organization_id;
                dto.owner_id = *owner_id;
                dto.organization_name = organization_name.clone();
                dto.organization_type = *organization_type;
                dto.search_visibility = *search_visibility;
                dto.created_at = Some(at);
            }
            OrganizationEvent::NameSet { organization_name } => {
                dto.organization_name = organization_name.clone()
            }
            OrganizationEvent::TypeSet { organization_type } => {
                dto.organization_type = *organization_type
            }
            OrganizationEvent::SearchVisibilitySet { search_visibility } => {
                dto.search_visibility = *search_visibility
            }
            OrganizationEvent::LogicalDeleted { delete_reason } => {
                dto.deleted_at = Some(at);
                dto.delete_reason = delete_reason.clone();
            }
            OrganizationEvent::Undeleted => {
                dto.deleted_at = None;
                dto.delete_reason.clear();
            }
            OrganizationEvent::PhysicalDeleted => return OrganizationDto::default(),
        }
        dto.updated_at = Some(at);
        dto
    }

    fn event_name(event: &OrganizationEvent) -> &'static str {
        match event {
            OrganizationEvent::Created { .. } => "Created",
            OrganizationEvent::NameSet { .. } => "NameSet",
            OrganizationEvent::TypeSet { .. } => "TypeSet",
            OrganizationEvent::SearchVisibilitySet { .. } => "SearchVisibilitySet",
            OrganizationEvent::LogicalDeleted { .. } => "LogicalDeleted",
            OrganizationEvent::Undeleted => "Undeleted",
            OrganizationEvent::PhysicalDeleted => "PhysicalDeleted",
        }
    }

    fn wrap(event: OrganizationEvent) -> GraceEvent {
        GraceEvent::OrganizationEvent(event)
    }
}
