use std::sync::Arc;

use lattica_core::{AppResult, TenantId};
use lattica_domain::{AncestorChain, ItemId, ItemRef, PermissionMask, RequiredMask, UserId};

use crate::{HierarchyProvider, PermissionGrant, PermissionStore};

/// Read-path service computing effective permissions for (user, item) pairs.
///
/// Resolution is nearest-wins: a direct grant on the item outranks every
/// ancestor grant, and among ancestor grants the one closest to the item
/// wins. The winning mask is returned verbatim, never unioned across levels:
/// a narrow grant placed close to an item intentionally reduces effective
/// access below what a broader, more distant grant would provide.
#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn PermissionStore>,
    hierarchy: Arc<dyn HierarchyProvider>,
}

impl PermissionResolver {
    /// Creates a resolver from store and hierarchy ports.
    #[must_use]
    pub fn new(store: Arc<dyn PermissionStore>, hierarchy: Arc<dyn HierarchyProvider>) -> Self {
        Self { store, hierarchy }
    }

    /// Returns the effective mask for a (user, item) pair, `NONE` when no
    /// grant applies or the item does not exist.
    ///
    /// Store or hierarchy failures propagate as errors; they are never
    /// reported as an empty mask.
    pub async fn effective_mask(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
    ) -> AppResult<PermissionMask> {
        let Some(chain) = self.hierarchy.all_parents(tenant_id, item).await? else {
            return Ok(PermissionMask::NONE);
        };

        if !chain_is_consistent(item, &chain) {
            tracing::warn!(
                item_id = %item.id,
                item_type = %item.item_type,
                "item has an empty ancestor chain, treating as no access"
            );
            return Ok(PermissionMask::NONE);
        }

        let mut candidate_ids: Vec<ItemId> = chain.ids().to_vec();
        candidate_ids.push(item.id);

        let grants = self
            .store
            .find_grants_for_items(tenant_id, user_id, &candidate_ids)
            .await?;

        Ok(winning_grant(item, &chain, &grants)
            .map(|grant| grant.mask)
            .unwrap_or(PermissionMask::NONE))
    }

    /// Returns whether the user's effective mask satisfies the required mask.
    pub async fn has_mask(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        item: ItemRef,
        required: RequiredMask,
    ) -> AppResult<bool> {
        let effective = self.effective_mask(tenant_id, user_id, item).await?;
        Ok(effective.contains(required.mask()))
    }
}

/// Returns whether an ancestor chain is plausible for the item.
///
/// Items that attach to a folder must have at least their container in the
/// chain; only a root folder legitimately has an empty one. An inconsistent
/// chain resolves to no access rather than a guessed answer.
pub(crate) fn chain_is_consistent(item: ItemRef, chain: &AncestorChain) -> bool {
    item.item_type.is_container() || !chain.is_empty()
}

/// Selects the nearest enclosing grant for an item.
///
/// A grant directly on the item wins unconditionally; otherwise ancestors are
/// scanned from the item's immediate container up to the root and the first
/// grant found wins.
pub(crate) fn winning_grant<'a>(
    item: ItemRef,
    chain: &AncestorChain,
    grants: &'a [PermissionGrant],
) -> Option<&'a PermissionGrant> {
    if let Some(direct) = grants
        .iter()
        .find(|grant| grant.item_id == item.id && grant.item_type == item.item_type)
    {
        return Some(direct);
    }

    chain
        .nearest_first()
        .find_map(|ancestor_id| grants.iter().find(|grant| grant.item_id == ancestor_id))
}
