use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use lattica_application::HierarchyProvider;
use lattica_core::{AppError, AppResult, TenantId};
use lattica_domain::{AncestorChain, ItemId, ItemRef, ItemType};

/// In-memory item tree implementation.
///
/// Backs tests and local runs. Unlike the PostgreSQL adapter it also owns the
/// tree-mutation path, so it demonstrates the provider contract end to end:
/// every insert and move recomputes the denormalized ancestor chains of all
/// affected rows before the mutation becomes visible.
#[derive(Debug, Default)]
pub struct InMemoryHierarchyProvider {
    items: RwLock<HashMap<(TenantId, ItemId), ItemNode>>,
}

#[derive(Debug, Clone)]
struct ItemNode {
    item_type: ItemType,
    container: Option<ItemId>,
    ancestors: Vec<ItemId>,
}

impl InMemoryHierarchyProvider {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts a folder, optionally under a parent folder.
    pub async fn insert_folder(
        &self,
        tenant_id: TenantId,
        folder_id: ItemId,
        parent_folder_id: Option<ItemId>,
    ) -> AppResult<()> {
        let mut items = self.items.write().await;

        if items.contains_key(&(tenant_id, folder_id)) {
            return Err(AppError::Conflict(format!(
                "item '{folder_id}' already exists in tenant '{tenant_id}'"
            )));
        }

        let ancestors = match parent_folder_id {
            Some(parent_id) => container_chain(&items, tenant_id, parent_id)?,
            None => Vec::new(),
        };

        items.insert(
            (tenant_id, folder_id),
            ItemNode {
                item_type: ItemType::Folder,
                container: parent_folder_id,
                ancestors,
            },
        );

        Ok(())
    }

    /// Inserts a non-container item into a folder.
    pub async fn insert_item(
        &self,
        tenant_id: TenantId,
        item: ItemRef,
        folder_id: ItemId,
    ) -> AppResult<()> {
        if item.item_type.is_container() {
            return Err(AppError::Validation(
                "folders must be inserted with insert_folder".to_owned(),
            ));
        }

        let mut items = self.items.write().await;

        if items.contains_key(&(tenant_id, item.id)) {
            return Err(AppError::Conflict(format!(
                "item '{}' already exists in tenant '{tenant_id}'",
                item.id
            )));
        }

        let ancestors = container_chain(&items, tenant_id, folder_id)?;

        items.insert(
            (tenant_id, item.id),
            ItemNode {
                item_type: item.item_type,
                container: Some(folder_id),
                ancestors,
            },
        );

        Ok(())
    }

    /// Re-parents a folder and recomputes the ancestor chains of the folder
    /// and every item contained in it.
    pub async fn move_folder(
        &self,
        tenant_id: TenantId,
        folder_id: ItemId,
        new_parent_id: Option<ItemId>,
    ) -> AppResult<()> {
        let mut items = self.items.write().await;

        let folder = items.get(&(tenant_id, folder_id)).ok_or_else(|| {
            AppError::NotFound(format!(
                "folder '{folder_id}' was not found in tenant '{tenant_id}'"
            ))
        })?;
        if !folder.item_type.is_container() {
            return Err(AppError::Validation(format!(
                "item '{folder_id}' is not a folder and cannot be re-parented"
            )));
        }

        if let Some(parent_id) = new_parent_id {
            if parent_id == folder_id {
                return Err(AppError::Validation(
                    "cannot move a folder under itself".to_owned(),
                ));
            }

            let parent = items.get(&(tenant_id, parent_id)).ok_or_else(|| {
                AppError::NotFound(format!(
                    "folder '{parent_id}' was not found in tenant '{tenant_id}'"
                ))
            })?;
            if !parent.item_type.is_container() {
                return Err(AppError::Validation(format!(
                    "item '{parent_id}' is not a folder and cannot contain other items"
                )));
            }
            if parent.ancestors.contains(&folder_id) {
                return Err(AppError::Validation(
                    "cannot move a folder into its own subtree".to_owned(),
                ));
            }
        }

        let affected: Vec<ItemId> = items
            .iter()
            .filter(|((item_tenant, _), node)| {
                *item_tenant == tenant_id && node.ancestors.contains(&folder_id)
            })
            .map(|((_, item_id), _)| *item_id)
            .collect();

        if let Some(node) = items.get_mut(&(tenant_id, folder_id)) {
            node.container = new_parent_id;
        }

        for item_id in std::iter::once(folder_id).chain(affected) {
            let container = items
                .get(&(tenant_id, item_id))
                .and_then(|node| node.container);
            let chain = compute_chain(&items, tenant_id, container)?;
            if let Some(node) = items.get_mut(&(tenant_id, item_id)) {
                node.ancestors = chain;
            }
        }

        Ok(())
    }

    /// Returns every item of a type in a tenant with its ancestor chain.
    pub(crate) async fn items_with_chains(
        &self,
        tenant_id: TenantId,
        item_type: ItemType,
    ) -> Vec<(ItemId, AncestorChain)> {
        let items = self.items.read().await;

        let mut entries: Vec<(ItemId, AncestorChain)> = items
            .iter()
            .filter(|((item_tenant, _), node)| {
                *item_tenant == tenant_id && node.item_type == item_type
            })
            .map(|((_, item_id), node)| (*item_id, AncestorChain::new(node.ancestors.clone())))
            .collect();
        entries.sort_by_key(|(item_id, _)| *item_id);

        entries
    }
}

fn container_chain(
    items: &HashMap<(TenantId, ItemId), ItemNode>,
    tenant_id: TenantId,
    folder_id: ItemId,
) -> AppResult<Vec<ItemId>> {
    let folder = items.get(&(tenant_id, folder_id)).ok_or_else(|| {
        AppError::NotFound(format!(
            "folder '{folder_id}' was not found in tenant '{tenant_id}'"
        ))
    })?;
    if !folder.item_type.is_container() {
        return Err(AppError::Validation(format!(
            "item '{folder_id}' is not a folder and cannot contain other items"
        )));
    }

    let mut chain = folder.ancestors.clone();
    chain.push(folder_id);
    Ok(chain)
}

fn compute_chain(
    items: &HashMap<(TenantId, ItemId), ItemNode>,
    tenant_id: TenantId,
    mut container: Option<ItemId>,
) -> AppResult<Vec<ItemId>> {
    let mut chain = Vec::new();

    while let Some(container_id) = container {
        if chain.contains(&container_id) {
            return Err(AppError::Internal(format!(
                "containment cycle detected at folder '{container_id}' in tenant '{tenant_id}'"
            )));
        }
        chain.push(container_id);
        container = items
            .get(&(tenant_id, container_id))
            .and_then(|node| node.container);
    }

    chain.reverse();
    Ok(chain)
}

#[async_trait]
impl HierarchyProvider for InMemoryHierarchyProvider {
    async fn all_parents(
        &self,
        tenant_id: TenantId,
        item: ItemRef,
    ) -> AppResult<Option<AncestorChain>> {
        let items = self.items.read().await;

        Ok(items
            .get(&(tenant_id, item.id))
            .filter(|node| node.item_type == item.item_type)
            .map(|node| AncestorChain::new(node.ancestors.clone())))
    }

    async fn all_descendants(
        &self,
        tenant_id: TenantId,
        item: ItemRef,
    ) -> AppResult<Vec<ItemRef>> {
        if !item.item_type.is_container() {
            return Ok(Vec::new());
        }

        let items = self.items.read().await;

        let mut descendants: Vec<ItemRef> = items
            .iter()
            .filter(|((item_tenant, _), node)| {
                *item_tenant == tenant_id && node.ancestors.contains(&item.id)
            })
            .map(|((_, item_id), node)| ItemRef::new(*item_id, node.item_type))
            .collect();
        descendants.sort_by_key(|descendant| descendant.id);

        Ok(descendants)
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
