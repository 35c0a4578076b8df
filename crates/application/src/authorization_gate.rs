use std::collections::BTreeMap;
use std::sync::Arc;

use lattica_core::{AppResult, TenantId};
use lattica_domain::{ItemId, ItemRef, ItemType, PermissionMask, RequiredMask, UserId};

use crate::{PermissionResolver, PermissionStore};

/// One item a user can reach, with its effective mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessibleItem {
    /// Item identifier.
    pub item_id: ItemId,
    /// Effective mask governing the (user, item) pair.
    pub mask: PermissionMask,
}

/// Stateless façade every other service uses for permission questions.
///
/// Holds no state and caches nothing: a descendant's effective answer can
/// change purely because an ancestor's grant changed, so any cache layered on
/// top would have to invalidate the target item and all of its descendants on
/// every mutation.
#[derive(Clone)]
pub struct AuthorizationGate {
    resolver: PermissionResolver,
    store: Arc<dyn PermissionStore>,
}

impl AuthorizationGate {
    /// Creates a gate from the resolver and the grant store.
    #[must_use]
    pub fn new(resolver: PermissionResolver, store: Arc<dyn PermissionStore>) -> Self {
        Self { resolver, store }
    }

    /// Returns whether the user satisfies the required mask on an item.
    pub async fn has_permission(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
        required: RequiredMask,
    ) -> AppResult<bool> {
        self.resolver
            .has_mask(tenant_id, user_id, item, required)
            .await
    }

    /// Returns the effective mask for a (user, item) pair.
    pub async fn effective_mask(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
    ) -> AppResult<PermissionMask> {
        self.resolver.effective_mask(tenant_id, user_id, item).await
    }

    /// Returns the effective mask for every requested item id.
    ///
    /// The result always has one entry per distinct input id; ids the user
    /// cannot access (or that do not exist) map to an empty mask, never
    /// omitted.
    pub async fn effective_masks(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item_type: ItemType,
        item_ids: &[ItemId],
    ) -> AppResult<BTreeMap<ItemId, PermissionMask>> {
        let mut masks = BTreeMap::new();

        for &item_id in item_ids {
            let mask = self
                .resolver
                .effective_mask(tenant_id, user_id, ItemRef::new(item_id, item_type))
                .await?;
            masks.insert(item_id, mask);
        }

        Ok(masks)
    }

    /// Returns every item of a type the user can reach, directly or through
    /// an ancestor grant.
    ///
    /// The store supplies a candidate superset; nearest-wins resolution
    /// decides the final mask and drops candidates whose nearest grant is
    /// empty.
    pub async fn accessible_items(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item_type: ItemType,
    ) -> AppResult<Vec<AccessibleItem>> {
        let candidate_ids = self
            .store
            .accessible_item_ids(tenant_id, user_id, item_type)
            .await?;

        let mut items = Vec::new();
        for item_id in candidate_ids {
            let mask = self
                .resolver
                .effective_mask(tenant_id, user_id, ItemRef::new(item_id, item_type))
                .await?;

            if !mask.is_empty() {
                items.push(AccessibleItem { item_id, mask });
            }
        }

        Ok(items)
    }
}
