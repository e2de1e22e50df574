use crate::domains::core::actor_state::{EventSourcedDto, RecordedEvent};
use crate::domains::core::events::GraceEvent;
use crate::types::{EntityKind, RetentionPolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Branch entity read-model. The `latest_*` pointers are maintained by
/// in-memory pointer events and re-derived from the read-model index
/// on activation; `based_on` persists through Created/Rebased and is
/// moved in memory by promotions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchDto {
    pub branch_id: Uuid,
    pub repository_id: Uuid,
    pub parent_branch_id: Option<Uuid>,
    pub branch_name: String,
    pub based_on: Option<Uuid>,
    pub based_on_changed_at: Option<DateTime<Utc>>,
    pub latest_promotion: Option<Uuid>,
    pub latest_commit: Option<Uuid>,
    pub latest_checkpoint: Option<Uuid>,
    pub latest_save: Option<Uuid>,
    pub assign_enabled: bool,
    pub promotion_enabled: bool,
    pub commit_enabled: bool,
    pub checkpoint_enabled: bool,
    pub save_enabled: bool,
    pub tag_enabled: bool,
    pub external_enabled: bool,
    pub auto_rebase_enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub delete_reason: String,
}

/// Commands accepted by the branch actor
#[derive(Debug, Clone)]
pub enum BranchCommand {
    Create {
        repository_id: Uuid,
        branch_name: String,
        parent_branch_id: Option<Uuid>,
        based_on: Option<Uuid>,
    },
    Rebase {
        reference_id: Uuid,
    },
    SetName {
        branch_name: String,
    },
    EnableAssign {
        enabled: bool,
    },
    EnablePromotion {
        enabled: bool,
    },
    EnableCommit {
        enabled: bool,
    },
    EnableCheckpoint {
        enabled: bool,
    },
    EnableSave {
        enabled: bool,
    },
    EnableTag {
        enabled: bool,
    },
    EnableExternal {
        enabled: bool,
    },
    EnableAutoRebase {
        enabled: bool,
    },
    Assign {
        directory_version_id: Uuid,
        sha256_hash: String,
        reference_text: String,
    },
    Promote {
        directory_version_id: Uuid,
        sha256_hash: String,
        reference_text: String,
    },
    Commit {
        directory_version_id: Uuid,
        sha256_hash: String,
        reference_text: String,
    },
    Checkpoint {
        directory_version_id: Uuid,
        sha256_hash: String,
        reference_text: String,
    },
    Save {
        directory_version_id: Uuid,
        sha256_hash: String,
        reference_text: String,
    },
    Tag {
        directory_version_id: Uuid,
        sha256_hash: String,
        reference_text: String,
    },
    CreateExternal {
        directory_version_id: Uuid,
        sha256_hash: String,
        reference_text: String,
    },
    RemoveReference {
        reference_id: Uuid,
    },
    DeleteLogical {
        delete_reason: String,
        force: bool,
    },
    /// Cascade entry point: a deleting repository passes its own
    /// retention down so the branch never re-enters the parent's turn
    /// for a lookup.
    DeleteLogicalCascade {
        delete_reason: String,
        retention: RetentionPolicy,
    },
    DeletePhysical,
    Undelete,
}

/// Events recorded against a branch. The pointer-update variants
/// (Assigned through ExternalCreated) are applied in memory only; the
/// authoritative creation event lives on the reference entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BranchEvent {
    Created {
        branch_id: Uuid,
        repository_id: Uuid,
        branch_name: String,
        parent_branch_id: Option<Uuid>,
        based_on: Option<Uuid>,
    },
    Rebased {
        based_on: Uuid,
        rebase_reference_id: Uuid,
    },
    NameSet {
        branch_name: String,
    },
    AssignEnabledSet {
        enabled: bool,
    },
    PromotionEnabledSet {
        enabled: bool,
    },
    CommitEnabledSet {
        enabled: bool,
    },
    CheckpointEnabledSet {
        enabled: bool,
    },
    SaveEnabledSet {
        enabled: bool,
    },
    TagEnabledSet {
        enabled: bool,
    },
    ExternalEnabledSet {
        enabled: bool,
    },
    AutoRebaseEnabledSet {
        enabled: bool,
    },
    Assigned {
        reference_id: Uuid,
    },
    Promoted {
        reference_id: Uuid,
    },
    Committed {
        reference_id: Uuid,
    },
    Checkpointed {
        reference_id: Uuid,
    },
    Saved {
        reference_id: Uuid,
    },
    Tagged {
        reference_id: Uuid,
    },
    ExternalCreated {
        reference_id: Uuid,
    },
    ReferenceRemoved {
        reference_id: Uuid,
    },
    LogicalDeleted {
        delete_reason: String,
    },
    Undeleted,
    PhysicalDeleted,
}

impl EventSourcedDto for BranchDto {
    type Event = BranchEvent;

    const KIND: EntityKind = EntityKind::Branch;

    fn update_dto(mut dto: Self, recorded: &RecordedEvent<BranchEvent>) -> Self {
        let at = recorded.metadata.timestamp;
        match &recorded.event {
            BranchEvent::Created {
                branch_id,
                repository_id,
                branch_name,
                parent_branch_id,
                based_on,
            } => {
                dto.branch_id = *branch_id;
                dto.repository_id = *repository_id;
                dto.branch_name = branch_name.clone();
                dto.parent_branch_id = *parent_branch_id;
                dto.based_on = *based_on;
                dto.based_on_changed_at = Some(at);
                dto.assign_enabled = true;
                dto.promotion_enabled = true;
                dto.commit_enabled = true;
                dto.checkpoint_enabled = true;
                dto.save_enabled = true;
                dto.tag_enabled = true;
                dto.external_enabled = true;
                dto.auto_rebase_enabled = true;
                dto.created_at = Some(at);
            }
            BranchEvent::Rebased { based_on, .. } => {
                dto.based_on = Some(*based_on);
                dto.based_on_changed_at = Some(at);
            }
            BranchEvent::NameSet { branch_name } => dto.branch_name = branch_name.clone(),
            BranchEvent::AssignEnabledSet { enabled } => dto.assign_enabled = *enabled,
            BranchEvent::PromotionEnabledSet { enabled } => dto.promotion_enabled = *enabled,
            BranchEvent::CommitEnabledSet { enabled } => dto.commit_enabled = *enabled,
            BranchEvent::CheckpointEnabledSet { enabled } => dto.checkpoint_enabled = *enabled,
            BranchEvent::SaveEnabledSet { enabled } => dto.save_enabled = *enabled,
            BranchEvent::TagEnabledSet { enabled } => dto.tag_enabled = *enabled,
            BranchEvent::ExternalEnabledSet { enabled } => dto.external_enabled = *enabled,
            BranchEvent::AutoRebaseEnabledSet { enabled } => dto.auto_rebase_enabled = *enabled,
            BranchEvent::Assigned { reference_id } | BranchEvent::Promoted { reference_id } => {
                dto.latest_promotion = Some(*reference_id);
                dto.based_on = Some(*reference_id);
                dto.based_on_changed_at = Some(at);
            }
            BranchEvent::Committed { reference_id } => dto.latest_commit = Some(*reference_id),
            BranchEvent::Checkpointed { reference_id } => {
                dto.latest_checkpoint = Some(*reference_id)
            }
            BranchEvent::Saved { reference_id } => dto.latest_save = Some(*reference_id),
            // Tags and external references have no latest pointer.
            BranchEvent::Tagged { .. } | BranchEvent::ExternalCreated { .. } => {}
            // Removal has no read-model effect; the authoritative
            // deletion is recorded on the reference entity itself.
            BranchEvent::ReferenceRemoved { .. } => {}
            BranchEvent::LogicalDeleted { delete_reason } => {
                dto.deleted_at = Some(at);
                dto.delete_reason = delete_reason.clone();
            }
            BranchEvent::Undeleted => {
                dto.deleted_at = None;
                dto.delete_reason.clear();
            }
            BranchEvent::PhysicalDeleted => return BranchDto::default(),
        }
        dto.updated_at = Some(at);
        dto
    }

    fn event_name(event: &BranchEvent) -> &'static str {
        match event {
            BranchEvent::Created { .. } => "Created",
            BranchEvent::Rebased { .. } => "Rebased",
            BranchEvent::NameSet { .. } => "NameSet",
            BranchEvent::AssignEnabledSet { .. } => "AssignEnabledSet",
            BranchEvent::PromotionEnabledSet { .. } => "PromotionEnabledSet",
            BranchEvent::CommitEnabledSet { .. } => "CommitEnabledSet",
            BranchEvent::CheckpointEnabledSet { .. } => "CheckpointEnabledSet",
            BranchEvent::SaveEnabledSet { .. } => "SaveEnabledSet",
            BranchEvent::TagEnabledSet { .. } => "TagEnabledSet",
            BranchEvent::ExternalEnabledSet { .. } => "ExternalEnabledSet",
            BranchEvent::AutoRebaseEnabledSet { .. } => "AutoRebaseEnabledSet",
            BranchEvent::Assigned { .. } => "Assigned",
            BranchEvent::Promoted { .. } => "Promoted",
            BranchEvent::Committed { .. } => "Committed",
            BranchEvent::Checkpointed { .. } => "Checkpointed",
            BranchEvent::Saved { .. } => "Saved",
            BranchEvent::Tagged { .. } => "Tagged",
            BranchEvent::ExternalCreated { .. } => "ExternalCreated",
            BranchEvent::ReferenceRemoved { .. } => "ReferenceRemoved",
            BranchEvent::LogicalDeleted { .. } => "LogicalDeleted",
            BranchEvent::Undeleted => "Undeleted",
            BranchEvent::PhysicalDeleted => "PhysicalDeleted",
        }
    }

    fn wrap(event: BranchEvent) -> GraceEvent {
        GraceEvent::BranchEvent(event)
    }
}
