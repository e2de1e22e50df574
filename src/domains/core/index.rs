use crate::domains::branch::types::BranchEvent;
use crate::domains::core::events::{EventEnvelope, GraceEvent};
use crate::domains::organization::types::OrganizationEvent;
use crate::domains::owner::types::OwnerEvent;
use crate::domains::reference::types::ReferenceEvent;
use crate::domains::repository::types::RepositoryEvent;
use crate::platform::event_bus::EventObserver;
use crate::types::ReferenceType;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Read-model summary of one reference, enough for pointer repair and
/// cascade enumeration.
#[derive(Debug, Clone)]
pub struct ReferenceSummary {
    pub reference_id: Uuid,
    pub branch_id: Uuid,
    pub reference_type: ReferenceType,
    pub created_at: DateTime<Utc>,
    pub deleted: bool,
    seq: u64,
}

#[derive(Debug, Clone)]
struct NamedEntity {
    name: String,
    parent: Option<Uuid>,
    deleted: bool,
}

#[derive(Default)]
struct IndexInner {
    seq: u64,
    owners: HashMap<Uuid, NamedEntity>,
    owner_names: HashMap<String, Uuid>,
    organizations: HashMap<Uuid, NamedEntity>,
    organization_names: HashMap<(Uuid, String), Uuid>,
    organizations_by_owner: HashMap<Uuid, Vec<Uuid>>,
    branches: HashMap<Uuid, NamedEntity>,
    branch_names: HashMap<(Uuid, String), Uuid>,
    branches_by_repository: HashMap<Uuid, Vec<Uuid>>,
    repositories_by_organization: HashMap<Uuid, Vec<Uuid>>,
    repositories: HashMap<Uuid, NamedEntity>,
    references: HashMap<Uuid, ReferenceSummary>,
    references_by_branch: HashMap<Uuid, Vec<Uuid>>,
}

fn push_child(children: &mut HashMap<Uuid, Vec<Uuid>>, parent: Uuid, child: Uuid) {
    let entry = children.entry(parent).or_default();
    if !entry.contains(&child) {
        entry.push(child);
    }
}

fn remove_child(children: &mut HashMap<Uuid, Vec<Uuid>>, parent: Uuid, child: Uuid) {
    if let Some(entry) = children.get_mut(&parent) {
        entry.retain(|c| *c != child);
    }
}

/// Internal read-model projection, updated synchronously on every bus
/// publish. Serves name-uniqueness validation, name→id resolution for
/// owners/organizations/branches, cascade enumeration of children,
/// and the branch activate-time repair of latest-reference pointers.
/// Never consulted as an authority on entity state; that is what the
/// actors are for.
pub struct ReadModelIndex {
    inner: RwLock<IndexInner>,
}

impl ReadModelIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(IndexInner::default()),
        }
    }

    // --- Queries ---

    pub fn owner_id_by_name(&self, name: &str) -> Option<Uuid> {
        self.inner.read().ok()?.owner_names.get(name).copied()
    }

    pub fn organization_id_by_name(&self, owner_id: Uuid, name: &str) -> Option<Uuid> {
        self.inner
            .read()
            .ok()?
            .organization_names
            .get(&(owner_id, name.to_string()))
            .copied()
    }

    pub fn branch_id_by_name(&self, repository_id: Uuid, name: &str) -> Option<Uuid> {
        self.inner
            .read()
            .ok()?
            .branch_names
            .get(&(repository_id, name.to_string()))
            .copied()
    }

    pub fn organizations_of(&self, owner_id: Uuid) -> Vec<Uuid> {
        self.inner
            .read()
            .map(|inner| {
                inner
                    .organizations_by_owner
                    .get(&owner_id)
                    .cloned()
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    pub fn repositories_of(&self, organization_id: Uuid) -> Vec<Uuid> {
        self.inner
            .read()
            .map(|inner| {
                inner
                    .repositories_by_organization
                    .get(&organization_id)
                    .cloned()
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    pub fn branches_of(&self, repository_id: Uuid) -> Vec<Uuid> {
        self.inner
            .read()
            .map(|inner| {
                inner
                    .branches_by_repository
                    .get(&repository_id)
                    .cloned()
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    pub fn references_of(&self, branch_id: Uuid) -> Vec<ReferenceSummary> {
        self.inner
            .read()
            .map(|inner| {
                inner
                    .references_by_branch
                    .get(&branch_id)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(|id| inner.references.get(id).cloned())
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Latest non-deleted reference of the given type on a branch, by
    /// application order.
    pub fn latest_reference(
        &self,
        branch_id: Uuid,
        reference_type: ReferenceType,
    ) -> Option<ReferenceSummary> {
        self.references_of(branch_id)
            .into_iter()
            .filter(|r| r.reference_type == reference_type && !r.deleted)
            .max_by_key(|r| r.seq)
    }

    // --- Projection maintenance ---

    fn apply_owner(&self, owner_id: Uuid, event: &OwnerEvent) {
        let Ok(mut inner) = self.inner.write() else { return };
        match event {
            OwnerEvent::Created { owner_name, .. } => {
                inner.owners.insert(
                    owner_id,
                    NamedEntity {
                        name: owner_name.clone(),
                        parent: None,
                        deleted: false,
                    },
                );
                inner.owner_names.insert(owner_name.clone(), owner_id);
            }
            OwnerEvent::NameSet { owner_name } => {
                if let Some(entity) = inner.owners.get(&owner_id).cloned() {
                    inner.owner_names.remove(&entity.name);
                    inner.owner_names.insert(owner_name.clone(), owner_id);
                }
                if let Some(entity) = inner.owners.get_mut(&owner_id) {
                    entity.name = owner_name.clone();
                }
            }
            OwnerEvent::LogicalDeleted { .. } => {
                if let Some(entity) = inner.owners.get_mut(&owner_id) {
                    entity.deleted = true;
                }
                if let Some(entity) = inner.owners.get(&owner_id).cloned() {
                    inner.owner_names.remove(&entity.name);
                }
            }
            OwnerEvent::Undeleted => {
                if let Some(entity) = inner.owners.get_mut(&owner_id) {
                    entity.deleted = false;
                }
                if let Some(entity) = inner.owners.get(&owner_id).cloned() {
                    inner.owner_names.entry(entity.name).or_insert(owner_id);
                }
            }
            OwnerEvent::PhysicalDeleted => {
                if let Some(entity) = inner.owners.remove(&owner_id) {
                    if inner.owner_names.get(&entity.name) == Some(&owner_id) {
                        inner.owner_names.remove(&entity.name);
                    }
                }
            }
            _ => {}
        }
    }

    fn apply_organization(&self, organization_id: Uuid, event: &OrganizationEvent) {
        let Ok(mut inner) = self.inner.write() else { return };
        match event {
            OrganizationEvent::Created {
                owner_id,
                organization_name,
                ..
            } => {
                inner.organizations.insert(
                    organization_id,
                    NamedEntity {
                        name: organization_name.clone(),
                        parent: Some(*owner_id),
                        deleted: false,
                    },
                );
                inner
                    .organization_names
                    .insert((*owner_id, organization_name.clone()), organization_id);
                push_child(&mut inner.organizations_by_owner, *owner_id, organization_id);
            }
            OrganizationEvent::NameSet { organization_name } => {
                if let Some(entity) = inner.organizations.get(&organization_id).cloned() {
                    if let Some(owner_id) = entity.parent {
                        inner.organization_names.remove(&(owner_id, entity.name));
                        inner
                            .organization_names
                            .insert((owner_id, organization_name.clone()), organization_id);
                    }
                }
                if let Some(entity) = inner.organizations.get_mut(&organization_id) {
                    entity.name = organization_name.clone();
                }
            }
            OrganizationEvent::LogicalDeleted { .. } => {
                if let Some(entity) = inner.organizations.get_mut(&organization_id) {
                    entity.deleted = true;
                }
                if let Some(entity) = inner.organizations.get(&organization_id).cloned() {
                    if let Some(owner_id) = entity.parent {
                        inner.organization_names.remove(&(owner_id, entity.name));
                    }
                }
            }
            OrganizationEvent::Undeleted => {
                if let Some(entity) = inner.organizations.get_mut(&organization_id) {
                    entity.deleted = false;
                }
                if let Some(entity) = inner.organizations.get(&organization_id).cloned() {
                    if let Some(owner_id) = entity.parent {
                        inner
                            .organization_names
                            .entry((owner_id, entity.name))
                            .or_insert(organization_id);
                    }
                }
            }
            OrganizationEvent::PhysicalDeleted => {
                if let Some(entity) = inner.organizations.remove(&organization_id) {
                    if let Some(owner_id) = entity.parent {
                        inner
                            .organization_names
                            .remove(&(owner_id, entity.name.clone()));
                        remove_child(
                            &mut inner.organizations_by_owner,
                            owner_id,
                            organization_id,
                        );
                    }
                }
            }
            _ => {}
        }
    }

    fn apply_repository(&self, repository_id: Uuid, event: &RepositoryEvent) {
        let Ok(mut inner) = self.inner.write() else { return };
        match event {
            RepositoryEvent::Created {
                organization_id,
                repository_name,
                ..
            } => {
                inner.repositories.insert(
                    repository_id,
                    NamedEntity {
                        name: repository_name.clone(),
                        parent: Some(*organization_id),
                        deleted: false,
                    },
                );
                push_child(
                    &mut inner.repositories_by_organization,
                    *organization_id,
                    repository_id,
                );
            }
            RepositoryEvent::NameSet { repository_name } => {
                if let Some(entity) = inner.repositories.get_mut(&repository_id) {
                    entity.name = repository_name.clone();
                }
            }
            RepositoryEvent::LogicalDeleted { .. } => {
                if let Some(entity) = inner.repositories.get_mut(&repository_id) {
                    entity.deleted = true;
                }
            }
            RepositoryEvent::Undeleted => {
                if let Some(entity) = inner.repositories.get_mut(&repository_id) {
                    entity.deleted = false;
                }
            }
            RepositoryEvent::PhysicalDeleted => {
                if let Some(entity) = inner.repositories.remove(&repository_id) {
                    if let Some(organization_id) = entity.parent {
                        remove_child(
                            &mut inner.repositories_by_organization,
                            organization_id,
                            repository_id,
                        );
                    }
                }
            }
            _ => {}
        }
    }

    fn apply_branch(&self, branch_id: Uuid, event: &BranchEvent) {
        let Ok(mut inner) = self.inner.write() else { return };
        match event {
            BranchEvent::Created {
                repository_id,
                branch_name,
                ..
            } => {
                inner.branches.insert(
                    branch_id,
                    NamedEntity {
                        name: branch_name.clone(),
                        parent: Some(*repository_id),
                        deleted: false,
                    },
                );
                inner
                    .branch_names
                    .insert((*repository_id, branch_name.clone()), branch_id);
                push_child(&mut inner.branches_by_repository, *repository_id, branch_id);
            }
            BranchEvent::NameSet { branch_name } => {
                if let Some(entity) = inner.branches.get(&branch_id).cloned() {
                    if let Some(repository_id) = entity.parent {
                        inner.branch_names.remove(&(repository_id, entity.name));
                        inner
                            .branch_names
                            .insert((repository_id, branch_name.clone()), branch_id);
                    }
                }
                if let Some(entity) = inner.branches.get_mut(&branch_id) {
                    entity.name = branch_name.clone();
                }
            }
            BranchEvent::LogicalDeleted { .. } => {
                if let Some(entity) = inner.branches.get_mut(&branch_id) {
                    entity.deleted = true;
                }
                if let Some(entity) = inner.branches.get(&branch_id).cloned() {
                    if let Some(repository_id) = entity.parent {
                        inner.branch_names.remove(&(repository_id, entity.name));
                    }
                }
            }
            BranchEvent::Undeleted => {
                if let Some(entity) = inner.branches.get_mut(&branch_id) {
                    entity.deleted = false;
                }
                if let Some(entity) = inner.branches.get(&branch_id).cloned() {
                    if let Some(repository_id) = entity.parent {
                        inner
                            .branch_names
                            .entry((repository_id, entity.name))
                            .or_insert(branch_id);
                    }
                }
            }
            BranchEvent::PhysicalDeleted => {
                if let Some(entity) = inner.branches.remove(&branch_id) {
                    if let Some(repository_id) = entity.parent {
                        if inner.branch_names.get(&(repository_id, entity.name.clone()))
                            == Some(&branch_id)
                        {
                            inner.branch_names.remove(&(repository_id, entity.name));
                        }
                        remove_child(&mut inner.branches_by_repository, repository_id, branch_id);
                    }
                }
            }
            _ => {}
        }
    }

    fn apply_reference(
        &self,
        reference_id: Uuid,
        event: &ReferenceEvent,
        timestamp: DateTime<Utc>,
    ) {
        let Ok(mut inner) = self.inner.write() else { return };
        match event {
            ReferenceEvent::Created {
                branch_id,
                reference_type,
                ..
            } => {
                inner.seq += 1;
                let seq = inner.seq;
                inner.references.insert(
                    reference_id,
                    ReferenceSummary {
                        reference_id,
                        branch_id: *branch_id,
                        reference_type: *reference_type,
                        created_at: timestamp,
                        deleted: false,
                        seq,
                    },
                );
                push_child(&mut inner.references_by_branch, *branch_id, reference_id);
            }
            ReferenceEvent::LogicalDeleted { .. } => {
                if let Some(summary) = inner.references.get_mut(&reference_id) {
                    summary.deleted = true;
                }
            }
            ReferenceEvent::Undeleted => {
                if let Some(summary) = inner.references.get_mut(&reference_id) {
                    summary.deleted = false;
                }
            }
            ReferenceEvent::PhysicalDeleted => {
                if let Some(summary) = inner.references.remove(&reference_id) {
                    remove_child(
                        &mut inner.references_by_branch,
                        summary.branch_id,
                        reference_id,
                    );
                }
            }
        }
    }
}

impl EventObserver for ReadModelIndex {
    fn observe(&self, _topic: &str, envelope: &EventEnvelope) {
        match &envelope.event {
            GraceEvent::OwnerEvent(event) => self.apply_owner(envelope.entity_id, event),
            GraceEvent::OrganizationEvent(event) => {
                self.apply_organization(envelope.entity_id, event)
            }
            GraceEvent::RepositoryEvent(event) => self.apply_repository(envelope.entity_id, event),
            GraceEvent::BranchEvent(event) => self.apply_branch(envelope.entity_id, event),
            GraceEvent::ReferenceEvent(event) => {
                self.apply_reference(envelope.entity_id, event, envelope.metadata.timestamp)
            }
            GraceEvent::DirectoryVersionEvent(_) => {}
        }
    }
}

impl Default for ReadModelIndex {
    fn default() -> Self {
        Self::new()
    }
}
