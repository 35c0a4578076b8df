use async_trait::async_trait;
use lattica_core::{AppResult, TenantId};
use lattica_domain::{AncestorChain, ItemId, ItemRef, ItemType};

/// Port for the item tree.
///
/// The provider owns the containment tree and the denormalized ancestor chain
/// of every item: whenever the tree is mutated it recomputes the chains of
/// all affected rows transactionally. The access-control core relies on this
/// invariant but never maintains it.
#[async_trait]
pub trait HierarchyProvider: Send + Sync {
    /// Returns the ordered ancestor folder chain of an item, root-first, or
    /// `None` when the item does not exist in the tenant.
    async fn all_parents(
        &self,
        tenant_id: TenantId,
        item: ItemRef,
    ) -> AppResult<Option<AncestorChain>>;

    /// Returns every item contained, directly or transitively, in a container.
    ///
    /// Non-container items have no descendants.
    async fn all_descendants(&self, tenant_id: TenantId, item: ItemRef)
    -> AppResult<Vec<ItemRef>>;

    /// Returns the descendants of a container restricted to one item type.
    async fn descendants_of_type(
        &self,
        tenant_id: TenantId,
        item: ItemRef,
        target_type: ItemType,
    ) -> AppResult<Vec<ItemId>>;
}
