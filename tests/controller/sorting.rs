use tracknest::{ControllerConfig, PageResetPolicy, Role, SortDirection, SortSpec};

use crate::support::{admin, group, loaded, numbered, seeded, visible};

#[tokio::test(start_paused = true)]
async fn same_column_toggles_direction() {
    let gateway = seeded(&["Charlie", "alpha", "Bravo"]);
    let groups = admin(&gateway).await;

    assert_eq!(groups.set_sort("name").unwrap(), SortSpec::ascending("name"));
    assert_eq!(visible(&groups), vec![2, 3, 1]);

    let spec = groups.set_sort("name").unwrap();
    assert_eq!(spec.direction, SortDirection::Descending);
    assert_eq!(visible(&groups), vec![1, 3, 2]);

    // A new column starts ascending.
    assert_eq!(groups.set_sort("id").unwrap(), SortSpec::ascending("id"));
    assert_eq!(visible(&groups), vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn sorting_is_stable() {
    let gateway = tracknest::InMemoryGateway::sequential();
    gateway.seed([
        group(1, "b"),
        group(2, "a"),
        group(3, "b"),
        group(4, "a"),
        group(5, "b"),
    ]);
    let groups = admin(&gateway).await;

    groups.set_sort("name").unwrap();
    assert_eq!(visible(&groups), vec![2, 4, 1, 3, 5]);

    groups.set_sort("name").unwrap();
    assert_eq!(visible(&groups), vec![1, 3, 5, 2, 4]);
}

#[tokio::test(start_paused = true)]
async fn sort_keeps_the_page_by_default() {
    let gateway = numbered(25);
    let groups = admin(&gateway).await;

    groups.set_page(3).unwrap();
    groups.set_sort("name").unwrap();
    assert_eq!(groups.view().unwrap().current_page, 3);
}

#[tokio::test(start_paused = true)]
async fn sort_can_reset_to_the_first_page() {
    let gateway = numbered(25);
    let config = ControllerConfig::default().with_page_reset(PageResetPolicy::FirstPage);
    let groups = loaded(&gateway, Role::Admin, config).await;

    groups.set_page(3).unwrap();
    groups.select(&21).unwrap();
    groups.set_sort("name").unwrap();

    assert_eq!(groups.view().unwrap().current_page, 1);
    assert_eq!(groups.selected_count().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn rows_sorted_off_the_page_leave_the_selection() {
    let gateway = numbered(15);
    let groups = admin(&gateway).await;

    groups.select(&1).unwrap();
    groups.select(&10).unwrap();
    groups.set_sort("name").unwrap();
    groups.set_sort("name").unwrap();

    // Descending: page 1 shows 15..=6.
    assert!(!groups.is_selected(&1).unwrap());
    assert!(groups.is_selected(&10).unwrap());
}

#[tokio::test(start_paused = true)]
async fn range_label_describes_the_page() {
    let gateway = numbered(15);
    let groups = admin(&gateway).await;

    let view = groups.view().unwrap();
    assert_eq!(view.range_label, "Showing rows 1 - 10 of 15");
    assert_eq!(view.total_pages, 2);

    groups.set_page(2).unwrap();
    assert_eq!(groups.view().unwrap().range_label, "Showing rows 11 - 15 of 15");

    let empty = admin(&numbered(0)).await;
    let view = empty.view().unwrap();
    assert_eq!(view.range_label, "Showing rows 0 - 0 of 0");
    assert_eq!(view.total_pages, 1);
    assert!(view.page_items.is_empty());
}
