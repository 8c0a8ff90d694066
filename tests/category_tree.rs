use axum_storefront_api::entity::categories::Model as Category;
use axum_storefront_api::services::catalog_service::{
    descendant_category_ids, would_create_cycle,
};
use uuid::Uuid;

fn category(id: Uuid, parent_id: Option<Uuid>) -> Category {
    Category {
        id,
        name: "cat".into(),
        slug: id.to_string(),
        parent_id,
    }
}

#[test]
fn descendants_include_self_and_nested_children() {
    let root = Uuid::new_v4();
    let child = Uuid::new_v4();
    let grandchild = Uuid::new_v4();
    let unrelated = Uuid::new_v4();

    let tree = vec![
        category(root, None),
        category(child, Some(root)),
        category(grandchild, Some(child)),
        category(unrelated, None),
    ];

    let mut ids = descendant_category_ids(&tree, root);
    ids.sort();
    let mut expected = vec![root, child, grandchild];
    expected.sort();
    assert_eq!(ids, expected);
}

#[test]
fn walk_terminates_on_corrupted_parent_chain() {
    // Two categories pointing at each other should not loop forever.
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let tree = vec![category(a, Some(b)), category(b, Some(a))];

    let ids = descendant_category_ids(&tree, a);
    assert_eq!(ids.len(), 2);
}

#[test]
fn cycle_detection_rejects_self_and_descendants() {
    let root = Uuid::new_v4();
    let child = Uuid::new_v4();
    let other = Uuid::new_v4();

    let tree = vec![
        category(root, None),
        category(child, Some(root)),
        category(other, None),
    ];

    assert!(would_create_cycle(&tree, root, root));
    assert!(would_create_cycle(&tree, root, child));
    assert!(!would_create_cycle(&tree, root, other));
    assert!(!would_create_cycle(&tree, child, root));
}
