#[macro_use]
mod common;

use anyhow::Result;
use notes_api::config::PageLimits;
use notes_api::database::models::{Note, User};
use notes_api::database::{DatabaseError, ListOptions, QueryOptions, Repository};
use std::collections::HashSet;

use uuid::Uuid;

// Requires DATABASE_URL; skips otherwise.

async fn seed_notes(db: &common::TestDb, count: usize) -> Result<(Repository<Note>, Uuid)> {
    let users = Repository::<User>::new(db.pool.clone());
    let owner = users
        .create(&map! { "email": "pager@example.com", "name": "Page", "surname": "Turner" })
        .await?;
    let notes = Repository::<Note>::new(db.pool.clone()).with_limits(PageLimits::default());
    for i in 0..count {
        let title = if i % 5 == 0 { format!("shopping {:02}", i) } else { format!("note {:02}", i) };
        notes
            .create(&map! { "title": title, "content": "", "user_uu_id": owner.meta.uu_id })
            .await?;
    }
    Ok((notes, owner.meta.uu_id))
}

fn ordered_by_title(page: u32, size: u32, order: &str) -> ListOptions {
    ListOptions {
        page: Some(page),
        size: Some(size),
        order_field: Some(vec!["title".to_string()]),
        order_type: Some(vec![order.to_string()]),
        query: None,
    }
}

#[tokio::test]
async fn pages_slice_and_count() -> Result<()> {
    let Some(db) = common::TestDb::connect().await? else { return Ok(()) };
    let (notes, _) = seed_notes(&db, 23).await?;

    let page = notes.paginate(QueryOptions::new::<Note>(ordered_by_title(3, 10, "asc"))).await?;
    assert_eq!(page.data.len(), 3);
    assert_eq!(page.pagination.page, 3);
    assert_eq!(page.pagination.page_count, 3);
    assert_eq!(page.pagination.total_pages, 3);
    assert_eq!(page.pagination.total_count, 23);
    assert_eq!(page.pagination.all_count, 23);

    let first = notes.paginate(QueryOptions::new::<Note>(ordered_by_title(1, 10, "desc"))).await?;
    let titles: Vec<&str> = first.data.iter().map(|n| n.title.as_str()).collect();
    let mut sorted = titles.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(titles, sorted);
    assert_eq!(first.pagination.page_count, 10);

    db.teardown().await
}

#[tokio::test]
async fn filters_narrow_total_but_not_all_count() -> Result<()> {
    let Some(db) = common::TestDb::connect().await? else { return Ok(()) };
    let (notes, _) = seed_notes(&db, 20).await?;

    let mut options = ordered_by_title(1, 10, "asc");
    options.query = Some(map! { "title__startswith": "shopping", "colour": "red" });
    let page = notes.paginate(QueryOptions::new::<Note>(options)).await?;

    assert_eq!(page.pagination.total_count, 4);
    assert_eq!(page.pagination.all_count, 20);
    assert_eq!(page.pagination.total_pages, 1);
    assert!(page.data.iter().all(|n| n.title.starts_with("shopping")));

    db.teardown().await
}

#[tokio::test]
async fn out_of_range_page_and_size_fall_back() -> Result<()> {
    let Some(db) = common::TestDb::connect().await? else { return Ok(()) };
    let (notes, _) = seed_notes(&db, 12).await?;

    // Size 500 is above the maximum, so the default of 10 applies; page 9 clamps to the last page
    let page = notes.paginate(QueryOptions::new::<Note>(ordered_by_title(9, 500, "asc"))).await?;
    assert_eq!(page.pagination.size, 10);
    assert_eq!(page.pagination.page, 2);
    assert_eq!(page.data.len(), 2);

    let empty = notes
        .paginate(QueryOptions::new::<Note>(ListOptions {
            query: Some(map! { "title": "nothing like this" }),
            ..Default::default()
        }))
        .await?;
    assert!(empty.data.is_empty());
    assert_eq!(empty.pagination.page, 1);
    assert_eq!(empty.pagination.total_pages, 0);
    assert_eq!(empty.pagination.order_field, vec!["uu_id"]);

    db.teardown().await
}

#[tokio::test]
async fn mismatched_order_lists_are_rejected() -> Result<()> {
    let Some(db) = common::TestDb::connect().await? else { return Ok(()) };
    let (notes, _) = seed_notes(&db, 1).await?;

    let options = ListOptions {
        order_field: Some(vec!["title".to_string(), "created_at".to_string()]),
        order_type: Some(vec!["asc".to_string()]),
        ..Default::default()
    };
    let result = notes.paginate(QueryOptions::new::<Note>(options)).await;
    assert!(matches!(result, Err(DatabaseError::InvalidInput(_))));

    db.teardown().await
}

#[tokio::test]
async fn soft_deleted_rows_leave_every_count() -> Result<()> {
    let Some(db) = common::TestDb::connect().await? else { return Ok(()) };
    let (notes, _) = seed_notes(&db, 6).await?;

    let all = notes.filter_all(&map! {})?.all().await?;
    notes.soft_delete(all[0].meta.uu_id).await?;

    let page = notes.paginate(QueryOptions::new::<Note>(ListOptions::default())).await?;
    assert_eq!(page.pagination.all_count, 5);
    assert_eq!(page.pagination.total_count, 5);
    assert!(page.data.iter().all(|n| n.meta.uu_id != all[0].meta.uu_id));

    db.teardown().await
}

#[tokio::test]
async fn walking_pages_over_tied_keys_visits_every_row_once() -> Result<()> {
    let Some(db) = common::TestDb::connect().await? else { return Ok(()) };
    let users = Repository::<User>::new(db.pool.clone());
    let owner = users
        .create(&map! { "email": "ties@example.com", "name": "Tie", "surname": "Breaker" })
        .await?;
    let notes = Repository::<Note>::new(db.pool.clone()).with_limits(PageLimits::default());
    for i in 0..45 {
        let title = if i % 2 == 0 { "even" } else { "odd" };
        notes
            .create(&map! { "title": title, "content": "", "user_uu_id": owner.meta.uu_id })
            .await?;
    }

    let mut seen = HashSet::new();
    let mut returned = 0;
    for page in 1..=5 {
        let result = notes.paginate(QueryOptions::new::<Note>(ordered_by_title(page, 10, "asc"))).await?;
        assert_eq!(result.pagination.order_field, vec!["title", "id"]);
        assert_eq!(result.pagination.order_type, vec!["asc", "asc"]);
        returned += result.data.len();
        seen.extend(result.data.iter().map(|n| n.meta.uu_id));
    }
    assert_eq!(returned, 45);
    assert_eq!(seen.len(), 45);

    // Only unknown order fields: the tiebreaker alone orders the page
    let options = ListOptions {
        order_field: Some(vec!["colour".to_string()]),
        order_type: Some(vec!["desc".to_string()]),
        ..Default::default()
    };
    let page = notes.paginate(QueryOptions::new::<Note>(options)).await?;
    assert_eq!(page.pagination.order_field, vec!["id"]);
    assert!(page.data.windows(2).all(|w| w[0].meta.id < w[1].meta.id));

    db.teardown().await
}
