use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use lattica_core::{AppError, AppResult, TenantId, UserIdentity};
use lattica_domain::{
    AncestorChain, ItemId, ItemRef, ItemType, PermissionMask, RequiredMask, UserId,
};
use tokio::sync::Mutex;

use super::{GrantEngine, GrantOutcome, GrantPermissionInput, RevokePermissionInput, UpdatePermissionInput};
use crate::{
    AuditEvent, AuditRepository, GrantUpsert, HierarchyProvider, PermissionGrant,
    PermissionResolver, PermissionStore, UserDirectory,
};

#[derive(Default)]
struct FakeStore {
    rows: Mutex<Vec<PermissionGrant>>,
}

#[async_trait]
impl PermissionStore for FakeStore {
    async fn find_grant(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
    ) -> AppResult<Option<PermissionGrant>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| {
                row.tenant_id == tenant_id
                    && row.user_id == user_id
                    && row.item_id == item.id
                    && row.item_type == item.item_type
            })
            .cloned())
    }

    async fn find_grants_for_items(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item_ids: &[ItemId],
    ) -> AppResult<Vec<PermissionGrant>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| {
                row.tenant_id == tenant_id
                    && row.user_id == user_id
                    && item_ids.contains(&row.item_id)
            })
            .cloned()
            .collect())
    }

    async fn merge_grant(
        &self,
        grant: GrantUpsert,
        prune_candidates: &[ItemId],
    ) -> AppResult<PermissionGrant> {
        let mut rows = self.rows.lock().await;

        rows.retain(|row| {
            !(row.tenant_id == grant.tenant_id
                && row.user_id == grant.user_id
                && prune_candidates.contains(&row.item_id)
                && grant.mask.contains(row.mask))
        });

        if let Some(existing) = rows.iter_mut().find(|row| {
            row.tenant_id == grant.tenant_id
                && row.user_id == grant.user_id
                && row.item_id == grant.item.id
                && row.item_type == grant.item.item_type
        }) {
            existing.mask = existing.mask.union(grant.mask);
            return Ok(existing.clone());
        }

        let row = PermissionGrant {
            user_id: grant.user_id,
            tenant_id: grant.tenant_id,
            item_id: grant.item.id,
            item_type: grant.item.item_type,
            mask: grant.mask,
            created_at: "2026-01-01T00:00:00Z".to_owned(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn replace_grant_mask(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
        mask: PermissionMask,
    ) -> AppResult<PermissionGrant> {
        let mut rows = self.rows.lock().await;
        let Some(existing) = rows.iter_mut().find(|row| {
            row.tenant_id == tenant_id
                && row.user_id == user_id
                && row.item_id == item.id
                && row.item_type == item.item_type
        }) else {
            return Err(AppError::NotFound(format!(
                "grant for user '{user_id}' on {} '{}' was not found",
                item.item_type, item.id
            )));
        };

        existing.mask = mask;
        Ok(existing.clone())
    }

    async fn delete_grant(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
    ) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|row| {
            !(row.tenant_id == tenant_id
                && row.user_id == user_id
                && row.item_id == item.id
                && row.item_type == item.item_type)
        });

        if rows.len() == before {
            return Err(AppError::NotFound(format!(
                "grant for user '{user_id}' on {} '{}' was not found",
                item.item_type, item.id
            )));
        }

        Ok(())
    }

    async fn accessible_item_ids(
        &self,
        _tenant_id: TenantId,
        _user_id: UserId,
        _item_type: ItemType,
    ) -> AppResult<Vec<ItemId>> {
        Ok(Vec::new())
    }
}

struct FakeHierarchy {
    chains: HashMap<(TenantId, ItemId), AncestorChain>,
    descendants: HashMap<ItemId, Vec<ItemRef>>,
}

#[async_trait]
impl HierarchyProvider for FakeHierarchy {
    async fn all_parents(
        &self,
        tenant_id: TenantId,
        item: ItemRef,
    ) -> AppResult<Option<AncestorChain>> {
        Ok(self.chains.get(&(tenant_id, item.id)).cloned())
    }

    async fn all_descendants(
        &self,
        _tenant_id: TenantId,
        item: ItemRef,
    ) -> AppResult<Vec<ItemRef>> {
        Ok(self.descendants.get(&item.id).cloned().unwrap_or_default())
    }

    async fn descendants_of_type(
        &self,
        tenant_id: TenantId,
        item: ItemRef,
        target_type: ItemType,
    ) -> AppResult<Vec<ItemId>> {
        Ok(self
            .all_descendants(tenant_id, item)
            .await?
            .into_iter()
            .filter(|descendant| descendant.item_type == target_type)
            .map(|descendant| descendant.id)
            .collect())
    }
}

struct FakeUsers {
    known: HashSet<(TenantId, UserId)>,
}

#[async_trait]
impl UserDirectory for FakeUsers {
    async fn user_exists(&self, tenant_id: TenantId, user_id: UserId) -> AppResult<bool> {
        Ok(self.known.contains(&(tenant_id, user_id)))
    }
}

#[derive(Default)]
struct FakeAudit {
    events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for FakeAudit {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

struct Fixture {
    tenant_id: TenantId,
    admin: UserIdentity,
    admin_id: UserId,
    target_id: UserId,
    folder: ItemRef,
    file: ItemRef,
    project: ItemRef,
    store: Arc<FakeStore>,
    audit: Arc<FakeAudit>,
    engine: GrantEngine,
    resolver: PermissionResolver,
}

fn fixture() -> Fixture {
    let tenant_id = TenantId::new();
    let admin_id = UserId::new();
    let target_id = UserId::new();

    let folder = ItemRef::new(ItemId::new(), ItemType::Folder);
    let file = ItemRef::new(ItemId::new(), ItemType::File);
    let project = ItemRef::new(ItemId::new(), ItemType::Project);

    let store = Arc::new(FakeStore::default());
    let hierarchy = Arc::new(FakeHierarchy {
        chains: HashMap::from([
            ((tenant_id, folder.id), AncestorChain::empty()),
            ((tenant_id, file.id), AncestorChain::new(vec![folder.id])),
            ((tenant_id, project.id), AncestorChain::new(vec![folder.id])),
        ]),
        descendants: HashMap::from([(folder.id, vec![file, project])]),
    });
    let users = Arc::new(FakeUsers {
        known: HashSet::from([(tenant_id, admin_id), (tenant_id, target_id)]),
    });
    let audit = Arc::new(FakeAudit::default());

    let engine = GrantEngine::new(
        store.clone(),
        hierarchy.clone(),
        users,
        audit.clone(),
    );
    let resolver = PermissionResolver::new(store.clone(), hierarchy);

    Fixture {
        tenant_id,
        admin: UserIdentity::new(admin_id.as_uuid(), "Grant Admin", tenant_id),
        admin_id,
        target_id,
        folder,
        file,
        project,
        store,
        audit,
        engine,
        resolver,
    }
}

async fn seed_grant(fixture: &Fixture, user_id: UserId, item: ItemRef, mask: PermissionMask) {
    fixture.store.rows.lock().await.push(PermissionGrant {
        user_id,
        tenant_id: fixture.tenant_id,
        item_id: item.id,
        item_type: item.item_type,
        mask,
        created_at: "2026-01-01T00:00:00Z".to_owned(),
    });
}

#[tokio::test]
async fn grant_without_manage_mask_is_forbidden() {
    let fixture = fixture();

    let result = fixture
        .engine
        .grant(
            &fixture.admin,
            GrantPermissionInput {
                target_user_id: fixture.target_id,
                item: fixture.file,
                mask: PermissionMask::READ,
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn grant_on_unknown_item_is_not_found() {
    let fixture = fixture();
    seed_grant(&fixture, fixture.admin_id, fixture.folder, PermissionMask::ALL).await;

    let result = fixture
        .engine
        .grant(
            &fixture.admin,
            GrantPermissionInput {
                target_user_id: fixture.target_id,
                item: ItemRef::new(ItemId::new(), ItemType::Block),
                mask: PermissionMask::READ,
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn grant_to_unknown_user_is_not_found() {
    let fixture = fixture();
    seed_grant(&fixture, fixture.admin_id, fixture.folder, PermissionMask::ALL).await;

    let result = fixture
        .engine
        .grant(
            &fixture.admin,
            GrantPermissionInput {
                target_user_id: UserId::new(),
                item: fixture.file,
                mask: PermissionMask::READ,
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn repeated_grants_on_same_item_merge_masks() {
    let fixture = fixture();
    seed_grant(&fixture, fixture.admin_id, fixture.folder, PermissionMask::ALL).await;

    for mask in [PermissionMask::READ, PermissionMask::WRITE] {
        let outcome = fixture
            .engine
            .grant(
                &fixture.admin,
                GrantPermissionInput {
                    target_user_id: fixture.target_id,
                    item: fixture.file,
                    mask,
                },
            )
            .await;
        assert!(outcome.is_ok());
    }

    let stored = fixture
        .store
        .find_grant(fixture.tenant_id, fixture.target_id, fixture.file)
        .await;
    let mask = stored.ok().flatten().map(|grant| grant.mask);
    assert_eq!(mask, Some(PermissionMask::READ.union(PermissionMask::WRITE)));
}

#[tokio::test]
async fn broad_folder_grant_prunes_shadowed_descendant_grant() {
    let fixture = fixture();
    seed_grant(&fixture, fixture.admin_id, fixture.folder, PermissionMask::ALL).await;
    seed_grant(&fixture, fixture.target_id, fixture.file, PermissionMask::READ).await;

    let outcome = fixture
        .engine
        .grant(
            &fixture.admin,
            GrantPermissionInput {
                target_user_id: fixture.target_id,
                item: fixture.folder,
                mask: PermissionMask::ALL,
            },
        )
        .await;
    assert!(matches!(outcome, Ok(GrantOutcome::Stored(_))));

    let direct = fixture
        .store
        .find_grant(fixture.tenant_id, fixture.target_id, fixture.file)
        .await;
    assert_eq!(direct.ok().flatten(), None);

    let effective = fixture
        .resolver
        .effective_mask(fixture.tenant_id, fixture.target_id, fixture.file)
        .await;
    assert_eq!(effective.ok(), Some(PermissionMask::ALL));
}

#[tokio::test]
async fn narrow_folder_grant_keeps_wider_descendant_grant() {
    let fixture = fixture();
    seed_grant(&fixture, fixture.admin_id, fixture.folder, PermissionMask::ALL).await;
    seed_grant(
        &fixture,
        fixture.target_id,
        fixture.file,
        PermissionMask::READ.union(PermissionMask::EXECUTE),
    )
    .await;

    let outcome = fixture
        .engine
        .grant(
            &fixture.admin,
            GrantPermissionInput {
                target_user_id: fixture.target_id,
                item: fixture.folder,
                mask: PermissionMask::READ.union(PermissionMask::WRITE),
            },
        )
        .await;
    assert!(outcome.is_ok());

    let direct = fixture
        .store
        .find_grant(fixture.tenant_id, fixture.target_id, fixture.file)
        .await;
    let mask = direct.ok().flatten().map(|grant| grant.mask);
    assert_eq!(mask, Some(PermissionMask::READ.union(PermissionMask::EXECUTE)));
}

#[tokio::test]
async fn grant_covered_by_ancestor_is_a_noop() {
    let fixture = fixture();
    seed_grant(&fixture, fixture.admin_id, fixture.folder, PermissionMask::ALL).await;
    seed_grant(&fixture, fixture.target_id, fixture.folder, PermissionMask::ALL).await;

    let outcome = fixture
        .engine
        .grant(
            &fixture.admin,
            GrantPermissionInput {
                target_user_id: fixture.target_id,
                item: fixture.file,
                mask: PermissionMask::READ.union(PermissionMask::WRITE),
            },
        )
        .await;

    assert_eq!(
        outcome.ok(),
        Some(GrantOutcome::AlreadyCovered {
            effective_mask: PermissionMask::ALL
        })
    );

    let direct = fixture
        .store
        .find_grant(fixture.tenant_id, fixture.target_id, fixture.file)
        .await;
    assert_eq!(direct.ok().flatten(), None);
}

#[tokio::test]
async fn update_replaces_mask_without_merging() {
    let fixture = fixture();
    seed_grant(&fixture, fixture.admin_id, fixture.folder, PermissionMask::ALL).await;
    seed_grant(&fixture, fixture.target_id, fixture.file, PermissionMask::ALL).await;

    let updated = fixture
        .engine
        .update(
            &fixture.admin,
            UpdatePermissionInput {
                target_user_id: fixture.target_id,
                item: fixture.file,
                new_mask: PermissionMask::READ,
            },
        )
        .await;

    assert_eq!(updated.ok().map(|grant| grant.mask), Some(PermissionMask::READ));
}

#[tokio::test]
async fn update_without_direct_grant_is_not_found() {
    let fixture = fixture();
    seed_grant(&fixture, fixture.admin_id, fixture.folder, PermissionMask::ALL).await;

    let result = fixture
        .engine
        .update(
            &fixture.admin,
            UpdatePermissionInput {
                target_user_id: fixture.target_id,
                item: fixture.file,
                new_mask: PermissionMask::READ,
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn revoke_of_nonexistent_grant_is_not_found_and_leaves_store_unchanged() {
    let fixture = fixture();
    seed_grant(&fixture, fixture.admin_id, fixture.folder, PermissionMask::ALL).await;
    seed_grant(&fixture, fixture.target_id, fixture.project, PermissionMask::READ).await;

    let result = fixture
        .engine
        .revoke(
            &fixture.admin,
            RevokePermissionInput {
                target_user_id: fixture.target_id,
                item: fixture.file,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let untouched = fixture
        .store
        .find_grant(fixture.tenant_id, fixture.target_id, fixture.project)
        .await;
    assert!(untouched.ok().flatten().is_some());
}

#[tokio::test]
async fn grant_then_revoke_round_trip() {
    let fixture = fixture();
    seed_grant(&fixture, fixture.admin_id, fixture.project, PermissionMask::ALL).await;

    let outcome = fixture
        .engine
        .grant(
            &fixture.admin,
            GrantPermissionInput {
                target_user_id: fixture.target_id,
                item: fixture.project,
                mask: PermissionMask::READ.union(PermissionMask::WRITE),
            },
        )
        .await;
    assert!(matches!(outcome, Ok(GrantOutcome::Stored(_))));

    let can_write = fixture
        .resolver
        .has_mask(
            fixture.tenant_id,
            fixture.target_id,
            fixture.project,
            RequiredMask::MANAGE,
        )
        .await;
    assert_eq!(can_write.ok(), Some(true));

    let effective = fixture
        .resolver
        .effective_mask(fixture.tenant_id, fixture.target_id, fixture.project)
        .await;
    assert_eq!(
        effective.ok(),
        Some(PermissionMask::READ.union(PermissionMask::WRITE))
    );

    let revoked = fixture
        .engine
        .revoke(
            &fixture.admin,
            RevokePermissionInput {
                target_user_id: fixture.target_id,
                item: fixture.project,
            },
        )
        .await;
    assert!(revoked.is_ok());

    let can_read = fixture
        .resolver
        .has_mask(
            fixture.tenant_id,
            fixture.target_id,
            fixture.project,
            RequiredMask::READ_ONLY,
        )
        .await;
    assert_eq!(can_read.ok(), Some(false));
}

#[tokio::test]
async fn mutations_append_audit_events() {
    let fixture = fixture();
    seed_grant(&fixture, fixture.admin_id, fixture.folder, PermissionMask::ALL).await;

    let granted = fixture
        .engine
        .grant(
            &fixture.admin,
            GrantPermissionInput {
                target_user_id: fixture.target_id,
                item: fixture.file,
                mask: PermissionMask::READ,
            },
        )
        .await;
    assert!(granted.is_ok());

    let revoked = fixture
        .engine
        .revoke(
            &fixture.admin,
            RevokePermissionInput {
                target_user_id: fixture.target_id,
                item: fixture.file,
            },
        )
        .await;
    assert!(revoked.is_ok());

    let events = fixture.audit.events.lock().await;
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|event| event.tenant_id == fixture.tenant_id));
}
