use crate::domains::core::actor_state::{EventSourcedDto, RecordedEvent};
use crate::domains::core::events::GraceEvent;
use crate::types::{
    EntityKind, RepositoryStatus, RepositoryVisibility, RetentionPolicy,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Repository entity read-model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryDto {
    pub repository_id: Uuid,
    pub owner_id: Uuid,
    pub organization_id: Uuid,
    pub repository_name: String,
    pub visibility: RepositoryVisibility,
    pub status: RepositoryStatus,
    pub default_server_api_version: Option<String>,
    pub record_saves: bool,
    pub retention: RetentionPolicy,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub delete_reason: String,
}

/// Commands accepted by the repository actor
#[derive(Debug, Clone)]
pub enum RepositoryCommand {
    Create {
        owner_id: Uuid,
        organization_id: Uuid,
        repository_name: String,
        visibility: RepositoryVisibility,
        retention: RetentionPolicy,
    },
    SetName {
        repository_name: String,
    },
    SetVisibility {
        visibility: RepositoryVisibility,
    },
    SetStatus {
        status: RepositoryStatus,
    },
    SetRecordSaves {
        record_saves: bool,
    },
    SetDefaultServerApiVersion {
        default_server_api_version: String,
    },
    SetSaveDays {
        save_days: u32,
    },
    SetCheckpointDays {
        checkpoint_days: u32,
    },
    SetDiffCacheDays {
        diff_cache_days: u32,
    },
    SetDirectoryVersionCacheDays {
        directory_version_cache_days: u32,
    },
    SetLogicalDeleteDays {
        logical_delete_days: u32,
    },
    DeleteLogical {
        delete_reason: String,
        force: bool,
    },
    DeletePhysical,
    Undelete,
}

/// Events recorded against a repository
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RepositoryEvent {
    Created {
        repository_id: Uuid,
        owner_id: Uuid,
        organization_id: Uuid,
        repository_name: String,
        visibility: RepositoryVisibility,
        retention: RetentionPolicy,
    },
    NameSet {
        repository_name: String,
    },
    VisibilitySet {
        visibility: RepositoryVisibility,
    },
    StatusSet {
        status: RepositoryStatus,
    },
    RecordSavesSet {
        record_saves: bool,
    },
    DefaultServerApiVersionSet {
        default_server_api_version: String,
    },
    SaveDaysSet {
        save_days: u32,
    },
    CheckpointDaysSet {
        checkpoint_days: u32,
    },
    DiffCacheDaysSet {
        diff_cache_days: u32,
    },
    DirectoryVersionCacheDaysSet {
        directory_version_cache_days: u32,
    },
    LogicalDeleteDaysSet {
        logical_delete_days: u32,
    },
    LogicalDeleted {
        delete_reason: String,
    },
    Undeleted,
    PhysicalDeleted,
}

impl EventSourcedDto for RepositoryDto {
    type Event = RepositoryEvent;

    const KIND: EntityKind = EntityKind::Repository;

    fn update_dto(mut dto: Self, recorded: &RecordedEvent<RepositoryEvent>) -> Self {
        let at = recorded.metadata.timestamp;
        match &recorded.event {
            RepositoryEvent::Created {
                repository_id,
                owner_id,
                organization_id,
                repository_name,
                visibility,
                retention,
            } => {
                dto.repository_id = *repository_id;
                dto.owner_id = *owner_id;
                dto.organization_id = *organization_id;
                dto.repository_name = repository_name.clone();
                dto.visibility = *visibility;
                dto.status = RepositoryStatus::Active;
                dto.record_saves = true;
                dto.retention = *retention;
                dto.created_at = Some(at);
            }
            RepositoryEvent::NameSet { repository_name } => {
                dto.repository_name = repository_name.clone()
            }
            RepositoryEvent::VisibilitySet { visibility } => dto.visibility = *visibility,
            RepositoryEvent::StatusSet { status } => dto.status = *status,
            RepositoryEvent::RecordSavesSet { record_saves } => dto.record_saves = *record_saves,
            RepositoryEvent::DefaultServerApiVersionSet {
                default_server_api_version,
            } => dto.default_server_api_version = Some(default_server_api_version.clone()),
            RepositoryEvent::SaveDaysSet { save_days } => dto.retention.save_days = *save_days,
            RepositoryEvent::CheckpointDaysSet { checkpoint_days } => {
                dto.retention.checkpoint_days = *checkpoint_days
            }
            RepositoryEvent::DiffCacheDaysSet { diff_cache_days } => {
                dto.retention.diff_cache_days = *diff_cache_days
            }
            RepositoryEvent::DirectoryVersionCacheDaysSet {
                directory_version_cache_days,
            } => dto.retention.directory_version_cache_days = *directory_version_cache_days,
            RepositoryEvent::LogicalDeleteDaysSet {
                logical_delete_days,
            } => dto.retention.logical_delete_days = *logical_delete_days,
            RepositoryEvent::LogicalDeleted { delete_reason } => {
                dto.deleted_at = Some(at);
                dto.delete_reason = delete_reason.clone();
            }
            RepositoryEvent::Undeleted => {
                dto.deleted_at = None;
                dto.delete_reason.clear();
            }
            RepositoryEvent::PhysicalDeleted => return RepositoryDto::default(),
        }
        dto.updated_at = Some(at);
        dto
    }

    fn event_name(event: &RepositoryEvent) -> &'static str {
        match event {
            RepositoryEvent::Created { .. } => "Created",
            RepositoryEvent::NameSet { .. } => "NameSet",
            RepositoryEvent::VisibilitySet { .. } => "VisibilitySet",
            RepositoryEvent::StatusSet { .. } => "StatusSet",
            RepositoryEvent::RecordSavesSet { .. } => "RecordSavesSet",
            RepositoryEvent::DefaultServerApiVersionSet { .. } => "DefaultServerApiVersionSet",
            RepositoryEvent::SaveDaysSet { .. } => "SaveDaysSet",
            RepositoryEvent::CheckpointDaysSet { .. } => "CheckpointDaysSet",
            RepositoryEvent::DiffCacheDaysSet { .. } => "DiffCacheDaysSet",
            RepositoryEvent::DirectoryVersionCacheDaysSet { .. } => {
                "DirectoryVersionCacheDaysSet"
            }
            RepositoryEvent::LogicalDeleteDaysSet { .. } => "LogicalDeleteDaysSet",
            RepositoryEvent::LogicalDeleted { .. } => "LogicalDeleted",
            RepositoryEvent::Undeleted => "Undeleted",
            RepositoryEvent::PhysicalDeleted => "PhysicalDeleted",
        }
    }

    fn wrap(event: RepositoryEvent) -> GraceEvent {
        GraceEvent::RepositoryEvent(event)
    }
}
