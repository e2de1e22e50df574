use crate::domains::repo_name::actor::repository_name_actor_id;
use crate::errors::DomainResult;
use crate::pipeline::PathParameters;
use crate::platform::actor_host::ActorContext;
use crate::platform::cache::{CachedValue, MemoryCache};
use crate::validation::parse_uuid;
use serde::Serialize;
use uuid::Uuid;

/// Canonical ids for however much of the
/// owner/organization/repository/branch path the caller supplied.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ResolvedPath {
    pub owner_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub repository_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
}

fn cached_lookup<F>(cache: &MemoryCache, key: &str, lookup: F) -> Option<Uuid>
where
    F: FnOnce() -> Option<Uuid>,
{
    match cache.get(key) {
        Some(CachedValue::Id(id)) => Some(id),
        Some(CachedValue::DoesNotExist) => None,
        _ => match lookup() {
            Some(id) => {
                cache.set(key, CachedValue::Id(id));
                Some(id)
            }
            None => {
                cache.set(key, CachedValue::DoesNotExist);
                None
            }
        },
    }
}

/// Resolves names to canonical ids at each level of the path,
/// preferring a provided id over a name. Owner, organization and
/// branch names resolve through the read-model index; repository
/// names route through the RepositoryName index actor. Results are
/// cached with tristate sentinels.
pub async fn resolve_path(
    cache: &MemoryCache,
    actors: &ActorContext,
    path: &PathParameters,
) -> DomainResult<ResolvedPath> {
    let mut resolved = ResolvedPath::default();

    if let Some(id) = &path.owner_id {
        resolved.owner_id = Some(parse_uuid("owner_id", id)?);
    } else if let Some(name) = &path.owner_name {
        let key = format!("owner-name/{}", name);
        resolved.owner_id = cached_lookup(cache, &key, || actors.index.owner_id_by_name(name));
    }

    if let Some(id) = &path.organization_id {
        resolved.organization_id = Some(parse_uuid("organization_id", id)?);
    } else if let Some(name) = &path.organization_name {
        if let Some(owner_id) = resolved.owner_id {
            let key = format!("organization-name/{}/{}", owner_id, name);
            resolved.organization_id = cached_lookup(cache, &key, || {
                actors.index.organization_id_by_name(owner_id, name)
            });
        }
    }

    if let Some(id) = &path.repository_id {
        resolved.repository_id = Some(parse_uuid("repository_id", id)?);
    } else if let Some(name) = &path.repository_name {
        if let (Some(owner_id), Some(organization_id)) =
            (resolved.owner_id, resolved.organization_id)
        {
            let key = repository_name_cache_key(name, owner_id, organization_id);
            resolved.repository_id = match cache.get(&key) {
                Some(CachedValue::Id(id)) => Some(id),
                Some(CachedValue::DoesNotExist) => None,
                _ => {
                    let actor_id = repository_name_actor_id(name, owner_id, organization_id);
                    let repository_id = actors
                        .host
                        .repository_name(actor_id)
                        .await?
                        .read(|a| a.repository_id())
                        .await?;
                    match repository_id {
                        Some(id) => {
                            cache.set(&key, CachedValue::Id(id));
                            Some(id)
                        }
                        None => {
                            cache.set(&key, CachedValue::DoesNotExist);
                            None
                        }
                    }
                }
            };
        }
    }

    if let Some(id) = &path.branch_id {
        resolved.branch_id = Some(parse_uuid("branch_id", id)?);
    } else if let Some(name) = &path.branch_name {
        if let Some(repository_id) = resolved.repository_id {
            let key = format!("branch-name/{}/{}", repository_id, name);
            resolved.branch_id = cached_lookup(cache, &key, || {
                actors.index.branch_id_by_name(repository_id, name)
            });
        }
    }

    Ok(resolved)
}

/// Cache key under which a repository-name binding is memoized; used
/// by the repository service to invalidate on rename and delete.
pub fn repository_name_cache_key(name: &str, owner_id: Uuid, organization_id: Uuid) -> String {
    format!("repository-name/{}|{}|{}", name, owner_id, organization_id)
}
