use lattica_domain::ItemType;

/// Returns the table holding rows of an item type.
///
/// All four item tables share the columns the access engine reads (`id`,
/// `tenant_id`, `ancestor_ids`), so every query is one generic statement
/// parameterized by this mapping. Supporting a fifth item type means adding
/// its table and one arm here.
pub(crate) fn item_table(item_type: ItemType) -> &'static str {
    match item_type {
        ItemType::Project => "projects",
        ItemType::Folder => "folders",
        ItemType::File => "files",
        ItemType::Block => "blocks",
    }
}
