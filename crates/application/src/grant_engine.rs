use std::sync::Arc;

use lattica_core::{AppError, AppResult, TenantId, UserIdentity};
use lattica_domain::{AncestorChain, AuditAction, ItemId, ItemRef, PermissionMask, RequiredMask, UserId};

use crate::permission_resolver::{chain_is_consistent, winning_grant};
use crate::{
    AuditEvent, AuditRepository, GrantUpsert, HierarchyProvider, PermissionGrant, PermissionStore,
    UserDirectory,
};

/// Input for a merge-upward grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantPermissionInput {
    /// User receiving the grant.
    pub target_user_id: UserId,
    /// Item the grant applies to.
    pub item: ItemRef,
    /// Requested permission mask.
    pub mask: PermissionMask,
}

/// Input for an outright mask replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePermissionInput {
    /// User whose grant is updated.
    pub target_user_id: UserId,
    /// Item the grant applies to.
    pub item: ItemRef,
    /// Replacement permission mask.
    pub new_mask: PermissionMask,
}

/// Input for a grant revocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokePermissionInput {
    /// User whose grant is revoked.
    pub target_user_id: UserId,
    /// Item the grant applies to.
    pub item: ItemRef,
}

/// Outcome of a merge-upward grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    /// An ancestor grant already covers the requested mask; the store was
    /// left untouched.
    AlreadyCovered {
        /// Effective mask the target already holds through the ancestor.
        effective_mask: PermissionMask,
    },
    /// The grant row was inserted or OR-merged.
    Stored(PermissionGrant),
}

/// The only writer of the permission store.
///
/// Grants follow merge-upward semantics: a request already covered by an
/// ancestor grant is a no-op, descendant grants entirely shadowed by the new
/// row are pruned, and repeated grants on the same item OR-merge their masks.
/// Every mutation requires the acting user to hold read and write on the
/// item, and runs its multi-step write as one store transaction.
#[derive(Clone)]
pub struct GrantEngine {
    store: Arc<dyn PermissionStore>,
    hierarchy: Arc<dyn HierarchyProvider>,
    users: Arc<dyn UserDirectory>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl GrantEngine {
    /// Creates a grant engine from its ports.
    #[must_use]
    pub fn new(
        store: Arc<dyn PermissionStore>,
        hierarchy: Arc<dyn HierarchyProvider>,
        users: Arc<dyn UserDirectory>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            store,
            hierarchy,
            users,
            audit_repository,
        }
    }

    /// Grants a permission mask to a user on an item, merge-upward.
    pub async fn grant(
        &self,
        actor: &UserIdentity,
        input: GrantPermissionInput,
    ) -> AppResult<GrantOutcome> {
        let tenant_id = actor.tenant_id();
        let actor_id = UserId::from_uuid(actor.user_id());

        let chain = self.require_item_chain(tenant_id, input.item).await?;
        self.require_manage_mask(tenant_id, actor_id, input.item, &chain)
            .await?;

        if !self
            .users
            .user_exists(tenant_id, input.target_user_id)
            .await?
        {
            return Err(AppError::NotFound(format!(
                "user '{}' was not found in tenant '{tenant_id}'",
                input.target_user_id
            )));
        }

        let target_grants = self
            .candidate_grants(tenant_id, input.target_user_id, input.item, &chain)
            .await?;

        if let Some(winning) = winning_grant(input.item, &chain, &target_grants) {
            if winning.item_id != input.item.id && winning.mask.contains(input.mask) {
                return Ok(GrantOutcome::AlreadyCovered {
                    effective_mask: winning.mask,
                });
            }
        }

        let prune_candidates = self.descendant_ids(tenant_id, input.item).await?;

        let stored = self
            .store
            .merge_grant(
                GrantUpsert {
                    tenant_id,
                    user_id: input.target_user_id,
                    item: input.item,
                    mask: input.mask,
                },
                &prune_candidates,
            )
            .await?;

        self.append_grant_event(
            actor,
            AuditAction::AccessGrantStored,
            input.target_user_id,
            input.item,
            format!(
                "granted mask {} on {} '{}' to user '{}'",
                input.mask, input.item.item_type, input.item.id, input.target_user_id
            ),
        )
        .await?;

        Ok(GrantOutcome::Stored(stored))
    }

    /// Replaces the mask of an existing direct grant outright.
    pub async fn update(
        &self,
        actor: &UserIdentity,
        input: UpdatePermissionInput,
    ) -> AppResult<PermissionGrant> {
        let tenant_id = actor.tenant_id();
        let actor_id = UserId::from_uuid(actor.user_id());

        let chain = self.require_item_chain(tenant_id, input.item).await?;
        self.require_manage_mask(tenant_id, actor_id, input.item, &chain)
            .await?;

        let updated = self
            .store
            .replace_grant_mask(tenant_id, input.target_user_id, input.item, input.new_mask)
            .await?;

        self.append_grant_event(
            actor,
            AuditAction::AccessGrantUpdated,
            input.target_user_id,
            input.item,
            format!(
                "replaced mask with {} on {} '{}' for user '{}'",
                input.new_mask, input.item.item_type, input.item.id, input.target_user_id
            ),
        )
        .await?;

        Ok(updated)
    }

    /// Revokes an existing direct grant.
    ///
    /// Revocation never touches ancestor or descendant grants; inherited
    /// access simply resumes from the nearest remaining grant.
    pub async fn revoke(
        &self,
        actor: &UserIdentity,
        input: RevokePermissionInput,
    ) -> AppResult<()> {
        let tenant_id = actor.tenant_id();
        let actor_id = UserId::from_uuid(actor.user_id());

        let chain = self.require_item_chain(tenant_id, input.item).await?;
        self.require_manage_mask(tenant_id, actor_id, input.item, &chain)
            .await?;

        self.store
            .delete_grant(tenant_id, input.target_user_id, input.item)
            .await?;

        self.append_grant_event(
            actor,
            AuditAction::AccessGrantRevoked,
            input.target_user_id,
            input.item,
            format!(
                "revoked grant on {} '{}' from user '{}'",
                input.item.item_type, input.item.id, input.target_user_id
            ),
        )
        .await
    }

    async fn require_item_chain(
        &self,
        tenant_id: TenantId,
        item: ItemRef,
    ) -> AppResult<AncestorChain> {
        self.hierarchy
            .all_parents(tenant_id, item)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "{} '{}' was not found in tenant '{tenant_id}'",
                    item.item_type, item.id
                ))
            })
    }

    async fn require_manage_mask(
        &self,
        tenant_id: TenantId,
        actor_id: UserId,
        item: ItemRef,
        chain: &AncestorChain,
    ) -> AppResult<()> {
        if chain_is_consistent(item, chain) {
            let grants = self
                .candidate_grants(tenant_id, actor_id, item, chain)
                .await?;

            if let Some(winning) = winning_grant(item, chain, &grants) {
                if winning.mask.contains(RequiredMask::MANAGE.mask()) {
                    return Ok(());
                }
            }
        } else {
            tracing::warn!(
                item_id = %item.id,
                item_type = %item.item_type,
                "item has an empty ancestor chain, refusing grant mutation"
            );
        }

        Err(AppError::Forbidden(format!(
            "user '{actor_id}' cannot manage grants on {} '{}'",
            item.item_type, item.id
        )))
    }

    async fn candidate_grants(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
        chain: &AncestorChain,
    ) -> AppResult<Vec<PermissionGrant>> {
        let mut candidate_ids: Vec<ItemId> = chain.ids().to_vec();
        candidate_ids.push(item.id);

        self.store
            .find_grants_for_items(tenant_id, user_id, &candidate_ids)
            .await
    }

    async fn descendant_ids(&self, tenant_id: TenantId, item: ItemRef) -> AppResult<Vec<ItemId>> {
        if !item.item_type.is_container() {
            return Ok(Vec::new());
        }

        Ok(self
            .hierarchy
            .all_descendants(tenant_id, item)
            .await?
            .into_iter()
            .map(|descendant| descendant.id)
            .collect())
    }

    async fn append_grant_event(
        &self,
        actor: &UserIdentity,
        action: AuditAction,
        target_user_id: UserId,
        item: ItemRef,
        detail: String,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                tenant_id: actor.tenant_id(),
                subject: actor.user_id().to_string(),
                action,
                resource_type: "permission_grant".to_owned(),
                resource_id: format!("{target_user_id}:{}:{}", item.item_type, item.id),
                detail: Some(detail),
            })
            .await
    }
}

#[cfg(test)]
mod tests;
