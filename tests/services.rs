#[macro_use]
mod common;

use anyhow::Result;
use chrono::Duration;
use notes_api::database::models::User;
use notes_api::database::{DatabaseError, ListOptions, Repository};
use notes_api::error::AppError;
use notes_api::services::{refresh_lifetime, NewNote, NoteService, NoteUpdate, ProfileUpdate, RegisterUser, TokenService, UserService};

// Requires DATABASE_URL; skips otherwise.

fn registration(email: &str) -> RegisterUser {
    RegisterUser {
        email: email.to_string(),
        name: "Ada".to_string(),
        surname: "Lovelace".to_string(),
        password_hash: Some("$argon2id$v=19$stub".to_string()),
    }
}

#[tokio::test]
async fn registration_is_idempotent_per_email() -> Result<()> {
    let Some(db) = common::TestDb::connect().await? else { return Ok(()) };
    let users = UserService::new(db.pool.clone());

    let first = users.register(registration(" Ada@Example.com ")).await?;
    assert!(first.created);
    assert_eq!(first.record.email, "ada@example.com");

    let again = users.register(registration("ada@example.com")).await?;
    assert!(!again.created);
    assert_eq!(again.record.meta.uu_id, first.record.meta.uu_id);

    // The hash is stored but never serialized
    let body = serde_json::to_value(&again.record)?;
    assert!(body.get("password_hash").is_none());
    assert_eq!(body["email"], "ada@example.com");

    let found = users.find_by_email("ADA@example.com").await?;
    assert_eq!(found.map(|u| u.meta.uu_id), Some(first.record.meta.uu_id));

    let renamed = users
        .update_profile(first.record.meta.uu_id, ProfileUpdate { name: Some(" Augusta ".into()), surname: None })
        .await?;
    assert_eq!(renamed.full_name(), "Augusta Lovelace");

    let bad = users.register(registration("not-an-email")).await;
    assert!(matches!(bad, Err(AppError::InvalidInput(_))));

    users.deactivate(first.record.meta.uu_id).await?;
    assert!(users.find_by_email("ada@example.com").await?.is_none());
    assert!(matches!(users.get(first.record.meta.uu_id).await, Err(AppError::NotFound(_))));

    db.teardown().await
}

#[tokio::test]
async fn notes_are_scoped_to_their_owner() -> Result<()> {
    let Some(db) = common::TestDb::connect().await? else { return Ok(()) };
    let users = UserService::new(db.pool.clone());
    let notes = NoteService::new(db.pool.clone());

    let ada = users.register(registration("ada@example.com")).await?.record;
    let grace = users.register(registration("grace@example.com")).await?.record;

    for title in ["one", "two", "three"] {
        notes
            .create(ada.meta.uu_id, NewNote { title: title.to_string(), content: String::new() })
            .await?;
    }
    let theirs = notes
        .create(grace.meta.uu_id, NewNote { title: "other".to_string(), content: String::new() })
        .await?;

    // An owner filter smuggled into the query is replaced
    let options = ListOptions {
        query: Some(map! { "user_uu_id": grace.meta.uu_id }),
        ..Default::default()
    };
    let page = notes.list_for_user(ada.meta.uu_id, options).await?;
    assert_eq!(page.pagination.total_count, 3);
    assert!(page.data.iter().all(|n| n.user_uu_id == ada.meta.uu_id));

    let untitled = notes
        .create(ada.meta.uu_id, NewNote { title: "   ".to_string(), content: String::new() })
        .await;
    assert!(matches!(untitled, Err(AppError::InvalidInput(_))));

    let nobody = notes
        .create(uuid::Uuid::new_v4(), NewNote { title: "orphan".to_string(), content: String::new() })
        .await;
    assert!(matches!(nobody, Err(AppError::NotFound(_))));

    let edited = notes
        .update(theirs.meta.uu_id, NoteUpdate { title: None, content: Some("body".to_string()) })
        .await?;
    assert_eq!(edited.content, "body");
    assert!(matches!(
        notes.update(theirs.meta.uu_id, NoteUpdate::default()).await,
        Err(AppError::InvalidInput(_))
    ));

    notes.delete(theirs.meta.uu_id).await?;
    assert!(matches!(notes.get(theirs.meta.uu_id).await, Err(AppError::NotFound(_))));

    db.teardown().await
}

#[tokio::test]
async fn tags_are_unique_per_note_and_comments_accumulate() -> Result<()> {
    let Some(db) = common::TestDb::connect().await? else { return Ok(()) };
    let users = UserService::new(db.pool.clone());
    let notes = NoteService::new(db.pool.clone());

    let ada = users.register(registration("ada@example.com")).await?.record;
    let note = notes
        .create(ada.meta.uu_id, NewNote { title: "engine".to_string(), content: String::new() })
        .await?;

    let first = notes.add_tag(note.meta.uu_id, ada.meta.uu_id, "Math").await?;
    assert!(first.created);
    assert_eq!(first.record.name, "math");

    let second = notes.add_tag(note.meta.uu_id, ada.meta.uu_id, " MATH ").await?;
    assert!(!second.created);
    assert_eq!(second.record.meta.uu_id, first.record.meta.uu_id);

    notes.add_tag(note.meta.uu_id, ada.meta.uu_id, "history").await?;
    assert_eq!(notes.tags(note.meta.uu_id).await?.len(), 2);

    notes.add_comment(note.meta.uu_id, ada.meta.uu_id, "first").await?;
    notes.add_comment(note.meta.uu_id, ada.meta.uu_id, "first").await?;
    assert_eq!(notes.comments(note.meta.uu_id).await?.len(), 2);

    notes.delete(note.meta.uu_id).await?;
    let late = notes.add_comment(note.meta.uu_id, ada.meta.uu_id, "too late").await;
    assert!(matches!(late, Err(AppError::NotFound(_))));

    db.teardown().await
}

#[tokio::test]
async fn tokens_live_for_their_window() -> Result<()> {
    let Some(db) = common::TestDb::connect().await? else { return Ok(()) };
    let users = UserService::new(db.pool.clone());
    let tokens = TokenService::new(db.pool.clone()).with_lifetime(Duration::minutes(5));

    let ada = users.register(registration("ada@example.com")).await?.record;
    let stored = tokens.store(ada.meta.uu_id, "tok-live").await?;
    assert_eq!(stored.meta.expiry_ends - stored.meta.expiry_starts, Duration::minutes(5));
    assert_eq!(tokens.resolve_user("tok-live").await?.meta.uu_id, ada.meta.uu_id);

    tokens.revoke("tok-live").await?;
    assert!(tokens.find_live("tok-live").await?.is_none());
    assert!(matches!(tokens.resolve_user("tok-live").await, Err(AppError::Unauthorized(_))));
    assert!(matches!(tokens.revoke("tok-live").await, Err(AppError::NotFound(_))));

    // A window that already closed is never live
    let stale = TokenService::new(db.pool.clone()).with_lifetime(Duration::seconds(-1));
    stale.store(ada.meta.uu_id, "tok-stale").await?;
    assert!(matches!(tokens.resolve_user("tok-stale").await, Err(AppError::Unauthorized(_))));

    // Tokens of a deactivated owner stop resolving
    tokens.store(ada.meta.uu_id, "tok-orphan").await?;
    users.deactivate(ada.meta.uu_id).await?;
    assert!(matches!(tokens.resolve_user("tok-orphan").await, Err(AppError::Unauthorized(_))));

    assert!(matches!(tokens.store(ada.meta.uu_id, "  ").await, Err(AppError::InvalidInput(_))));

    db.teardown().await
}

#[tokio::test]
async fn password_hashes_cannot_be_searched() -> Result<()> {
    let Some(db) = common::TestDb::connect().await? else { return Ok(()) };
    let users = UserService::new(db.pool.clone());
    users.register(registration("ada@example.com")).await?;
    users.register(registration("grace@example.com")).await?;

    // List queries drop the key, so a guessed prefix changes nothing
    for prefix in ["$argon2id", "$nothing"] {
        let options = ListOptions {
            query: Some(map! { "password_hash__startswith": prefix }),
            order_field: Some(vec!["password_hash".to_string()]),
            order_type: Some(vec!["asc".to_string()]),
            ..Default::default()
        };
        let page = users.list(options).await?;
        assert_eq!(page.pagination.total_count, 2);
        assert_eq!(page.pagination.order_field, vec!["id"]);
    }

    let direct = Repository::<User>::new(db.pool.clone()).filter_all(&map! { "password_hash": "$argon2id$v=19$stub" });
    assert!(matches!(direct, Err(DatabaseError::InvalidInput(_))));

    db.teardown().await
}

#[tokio::test]
async fn refresh_tokens_use_the_refresh_lifetime() -> Result<()> {
    let Some(db) = common::TestDb::connect().await? else { return Ok(()) };
    let users = UserService::new(db.pool.clone());
    let ada = users.register(registration("ada@example.com")).await?.record;

    let refresh = TokenService::new(db.pool.clone()).for_refresh();
    assert_eq!(refresh.lifetime(), refresh_lifetime());
    let stored = refresh.store(ada.meta.uu_id, "tok-refresh").await?;
    assert_eq!(stored.meta.expiry_ends - stored.meta.expiry_starts, refresh_lifetime());
    assert_eq!(refresh.resolve_user("tok-refresh").await?.meta.uu_id, ada.meta.uu_id);

    db.teardown().await
}
