use std::sync::Arc;

use anyhow::Context;
use catalog_taxonomy::{
    catalog::ProductCatalog,
    category::Depth,
    error::TaxonomyError,
    product::ProductDraft,
    store::DocumentStore,
    taxonomy::TaxonomyStore,
};
use sled::open;
use tempfile::tempdir;

// Sled uses file-based locking to prevent concurrent access, so only one test
// can hold a lock at a time. As is good practice in testing, create a separate
// database for each test, on temp for simplified cleanup.
fn open_services(
    dir: &tempfile::TempDir,
    name: &str,
) -> anyhow::Result<(TaxonomyStore, ProductCatalog)> {
    let db = open(dir.path().join(name))?;
    let db = Arc::new(db);
    db.clear()?;

    let store = DocumentStore::new(db);
    Ok((
        TaxonomyStore::new(store.clone()),
        ProductCatalog::new(store),
    ))
}

#[test]
fn create_and_find_round_trip() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (taxonomy, _) = open_services(&temp_dir, "round_trip.db")?;

    let existing = taxonomy.create("Kitchen", None)?;
    let id = taxonomy.create("Flooring", None)?;

    let path = taxonomy
        .find(&id)?
        .context("freshly created category should be findable")?;
    assert_eq!(path.name, "Flooring");
    assert_eq!(path.depth, Depth::Category);
    assert_ne!(id, existing);

    Ok(())
}

#[test]
fn duplicate_names_create_distinct_nodes() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (taxonomy, _) = open_services(&temp_dir, "duplicate_names.db")?;

    // names are not unique keys; a repeated create is not idempotent
    let first = taxonomy.create("Rugs", None)?;
    let second = taxonomy.create("Rugs", None)?;

    assert_ne!(first, second);
    let named: Vec<_> = taxonomy
        .list_categories()?
        .into_iter()
        .filter(|c| c.name == "Rugs")
        .collect();
    assert_eq!(named.len(), 2);

    // name lookup resolves to the oldest match
    let oldest = taxonomy
        .find_category_by_name("Rugs")?
        .context("name lookup finds a match")?;
    assert_eq!(oldest.id, first);

    Ok(())
}

#[test]
fn blank_names_are_rejected_before_any_write() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (taxonomy, _) = open_services(&temp_dir, "blank_names.db")?;

    assert!(matches!(
        taxonomy.create("   ", None),
        Err(TaxonomyError::Validation(_))
    ));
    assert!(taxonomy.list_categories()?.is_empty());

    Ok(())
}

#[test]
fn depth_cap_is_enforced() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (taxonomy, _) = open_services(&temp_dir, "depth_cap.db")?;

    let root = taxonomy.create("Flooring", None)?;
    let sub = taxonomy.create("Carpets", Some(&root))?;
    let leaf = taxonomy.create("Wool", Some(&sub))?;

    // a third-level node cannot take children
    assert!(matches!(
        taxonomy.create("Merino", Some(&leaf)),
        Err(TaxonomyError::DepthExceeded)
    ));

    Ok(())
}

#[test]
fn missing_parent_fails_with_not_found() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (taxonomy, _) = open_services(&temp_dir, "missing_parent.db")?;

    assert!(matches!(
        taxonomy.create("Carpets", Some("cat_nonexistent")),
        Err(TaxonomyError::NotFound(_))
    ));

    Ok(())
}

#[test]
fn category_delete_cascades_to_products() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (taxonomy, catalog) = open_services(&temp_dir, "cascade_delete.db")?;

    let rugs = taxonomy.create("Rugs", None)?;
    let runner = catalog.create(
        ProductDraft::new()
            .set_name("Runner Rug")
            .set_price(4_999)
            .set_stock(12)
            .set_category_path("Rugs", None, None),
    )?;
    let kettle = catalog.create(
        ProductDraft::new()
            .set_name("Kettle")
            .set_category_path("Kitchen", None, None),
    )?;

    taxonomy.delete_category(&rugs)?;

    let runner = catalog.get_by_id(&runner.id)?.context("product survives")?;
    assert!(runner.category.is_none());
    assert!(runner.subcategory.is_none());
    assert!(runner.subsubcategory.is_none());

    // unrelated products keep their path
    let kettle = catalog.get_by_id(&kettle.id)?.context("product survives")?;
    assert_eq!(kettle.category.as_deref(), Some("Kitchen"));

    assert!(taxonomy.find(&rugs)?.is_none());

    Ok(())
}

#[test]
fn subcategory_delete_nulls_descendant_fields_only() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (taxonomy, catalog) = open_services(&temp_dir, "sub_cascade.db")?;

    let flooring = taxonomy.create("Flooring", None)?;
    let carpets = taxonomy.create("Carpets", Some(&flooring))?;
    taxonomy.create("Wool", Some(&carpets))?;

    let rug = catalog.create(
        ProductDraft::new()
            .set_name("Wool Rug")
            .set_category_path("Flooring", Some("Carpets"), Some("Wool")),
    )?;
    // same subcategory name under a different category must be untouched
    let mat = catalog.create(
        ProductDraft::new()
            .set_name("Car Mat")
            .set_category_path("Automotive", Some("Carpets"), None),
    )?;

    taxonomy.delete_subcategory(&flooring, &carpets)?;

    let rug = catalog.get_by_id(&rug.id)?.context("product survives")?;
    assert_eq!(rug.category.as_deref(), Some("Flooring"));
    assert!(rug.subcategory.is_none());
    assert!(rug.subsubcategory.is_none());

    let mat = catalog.get_by_id(&mat.id)?.context("product survives")?;
    assert_eq!(mat.subcategory.as_deref(), Some("Carpets"));

    Ok(())
}

#[test]
fn flooring_carpets_wool_scenario() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (taxonomy, _) = open_services(&temp_dir, "flooring_scenario.db")?;

    let flooring = taxonomy.create("Flooring", None)?;
    let carpets = taxonomy.create("Carpets", Some(&flooring))?;
    let wool = taxonomy.create("Wool", Some(&carpets))?;

    taxonomy.delete_subcategory(&flooring, &carpets)?;

    // the root survives, the subtree is gone and the leaf is unreachable
    let flooring_doc = taxonomy.get_category(&flooring)?;
    assert_eq!(flooring_doc.name, "Flooring");
    assert!(flooring_doc.sub_categories.is_empty());
    assert!(taxonomy.find(&carpets)?.is_none());
    assert!(taxonomy.find(&wool)?.is_none());

    Ok(())
}

#[test]
fn orphaned_products_are_tolerated() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (taxonomy, catalog) = open_services(&temp_dir, "orphans.db")?;

    taxonomy.create("Flooring", None)?;
    let ghost = catalog.create(
        ProductDraft::new()
            .set_name("Ghost Lamp")
            .set_category_path("Lighting", None, None),
    )?;

    // the dangling name matches no category filter but never errors
    assert!(catalog.filter_by_category_path("Flooring", None, None)?.is_empty());
    assert!(
        catalog
            .filter_by_category_path("Lighting", None, None)?
            .iter()
            .any(|p| p.id == ghost.id)
    );
    assert!(catalog.get_all()?.iter().any(|p| p.id == ghost.id));

    Ok(())
}

#[test]
fn rename_does_not_propagate_to_products() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (taxonomy, catalog) = open_services(&temp_dir, "rename.db")?;

    let rugs = taxonomy.create("Rugs", None)?;
    let runner = catalog.create(
        ProductDraft::new()
            .set_name("Runner Rug")
            .set_category_path("Rugs", None, None),
    )?;

    taxonomy.rename(&rugs, "Floor Rugs")?;

    // the product keeps the stale name and falls out of the renamed filter
    let runner = catalog.get_by_id(&runner.id)?.context("product survives")?;
    assert_eq!(runner.category.as_deref(), Some("Rugs"));
    assert!(catalog.filter_by_category_path("Floor Rugs", None, None)?.is_empty());

    Ok(())
}

#[test]
fn stale_wholesale_update_is_rejected() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (taxonomy, _) = open_services(&temp_dir, "stale_update.db")?;

    let flooring = taxonomy.create("Flooring", None)?;
    let stale = taxonomy.get_category(&flooring)?;

    // another writer appends a subcategory, bumping the version
    taxonomy.create("Carpets", Some(&flooring))?;

    let mut edited = stale;
    edited.name = "Floors".into();
    assert!(matches!(
        taxonomy.update_category(edited),
        Err(TaxonomyError::Conflict(_))
    ));

    // the concurrent write is intact
    let current = taxonomy.get_category(&flooring)?;
    assert_eq!(current.name, "Flooring");
    assert_eq!(current.sub_categories.len(), 1);

    Ok(())
}

#[test]
fn wholesale_update_rejects_blank_names() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (taxonomy, _) = open_services(&temp_dir, "blank_update.db")?;

    let flooring = taxonomy.create("Flooring", None)?;
    let carpets = taxonomy.create("Carpets", Some(&flooring))?;
    taxonomy.create("Wool", Some(&carpets))?;

    // the wholesale path must fail fast like create and rename do
    let mut blanked = taxonomy.get_category(&flooring)?;
    blanked.name = "   ".into();
    assert!(matches!(
        taxonomy.update_category(blanked),
        Err(TaxonomyError::Validation(_))
    ));

    let mut blanked_leaf = taxonomy.get_category(&flooring)?;
    blanked_leaf.sub_categories[0].sub_categories[0].name = "".into();
    assert!(matches!(
        taxonomy.update_category(blanked_leaf),
        Err(TaxonomyError::Validation(_))
    ));

    // nothing was written
    let current = taxonomy.get_category(&flooring)?;
    assert_eq!(current.name, "Flooring");
    assert_eq!(current.sub_categories[0].sub_categories[0].name, "Wool");

    Ok(())
}

#[test]
fn assign_path_requires_top_down_fill() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (_, catalog) = open_services(&temp_dir, "assign_path.db")?;

    let rug = catalog.create(ProductDraft::new().set_name("Runner Rug"))?;

    // same rule as the draft builder: no gaps in the path
    assert!(matches!(
        catalog.assign_path(&rug.id, None, Some("Carpets"), None),
        Err(TaxonomyError::Validation(_))
    ));
    assert!(matches!(
        catalog.assign_path(&rug.id, Some("Flooring"), None, Some("Wool")),
        Err(TaxonomyError::Validation(_))
    ));

    let rug = catalog.assign_path(&rug.id, Some("Flooring"), Some("Carpets"), None)?;
    assert_eq!(rug.subcategory.as_deref(), Some("Carpets"));

    // the rejected writes left the stored record untouched
    let stored = catalog.get_by_id(&rug.id)?.context("product survives")?;
    assert_eq!(stored.category.as_deref(), Some("Flooring"));
    assert!(stored.subsubcategory.is_none());

    Ok(())
}

#[test]
fn filter_by_full_path() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (taxonomy, catalog) = open_services(&temp_dir, "filter_path.db")?;

    let flooring = taxonomy.create("Flooring", None)?;
    let carpets = taxonomy.create("Carpets", Some(&flooring))?;
    taxonomy.create("Wool", Some(&carpets))?;

    let wool_rug = catalog.create(
        ProductDraft::new()
            .set_name("Wool Rug")
            .set_category_path("Flooring", Some("Carpets"), Some("Wool")),
    )?;
    catalog.create(
        ProductDraft::new()
            .set_name("Nylon Rug")
            .set_category_path("Flooring", Some("Carpets"), Some("Nylon")),
    )?;

    let all_carpets = catalog.filter_by_category_path("Flooring", Some("Carpets"), None)?;
    assert_eq!(all_carpets.len(), 2);

    let only_wool = catalog.filter_by_category_path("Flooring", Some("Carpets"), Some("Wool"))?;
    assert_eq!(only_wool.len(), 1);
    assert_eq!(only_wool[0].id, wool_rug.id);

    Ok(())
}

#[test]
fn flatten_tracks_the_whole_forest() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let (taxonomy, _) = open_services(&temp_dir, "flatten.db")?;

    let flooring = taxonomy.create("Flooring", None)?;
    let carpets = taxonomy.create("Carpets", Some(&flooring))?;
    taxonomy.create("Wool", Some(&carpets))?;
    taxonomy.create("Kitchen", None)?;

    let rows = taxonomy.flatten()?;
    assert_eq!(rows.len(), 4);

    let wool_row = rows
        .iter()
        .find(|r| r.subsubcategory.as_deref() == Some("Wool"))
        .context("leaf row present")?;
    assert_eq!(wool_row.category, "Flooring");
    assert_eq!(wool_row.subcategory.as_deref(), Some("Carpets"));

    Ok(())
}
