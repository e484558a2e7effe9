//! Database tests

use super::*;
use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

fn test_account(id: &str) -> Account {
    Account {
        id: id.to_string(),
        username: format!("user_{}", id),
        instagram_user_id: format!("ig_{}", id),
        access_token: "token".to_string(),
        created_at: Utc::now(),
    }
}

fn test_comment(id: &str, media_id: &str) -> Comment {
    Comment {
        id: id.to_string(),
        media_id: media_id.to_string(),
        parent_id: None,
        username: "commenter".to_string(),
        text: "great post".to_string(),
        like_count: 3,
        replies_count: 0,
        is_hidden: false,
        commented_at: Utc::now(),
        synced_at: Utc::now(),
    }
}

fn test_conversation(id: &str, account_id: &str) -> Conversation {
    Conversation {
        id: id.to_string(),
        account_id: account_id.to_string(),
        participant_id: "participant-1".to_string(),
        participant_username: "friend".to_string(),
        participant_name: None,
        participant_avatar_url: None,
        last_message_text: Some("hello".to_string()),
        last_message_at: Some(Utc::now()),
        last_message_is_from_me: false,
        unread_count: 1,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn test_publication(id: &str, account_id: &str) -> Publication {
    let now = Utc::now();
    Publication {
        id: id.to_string(),
        account_id: account_id.to_string(),
        instagram_media_id: None,
        publication_type: PublicationType::Post,
        status: PublicationStatus::Draft,
        caption: "caption".to_string(),
        media: vec![MediaItem {
            id: EntityId::new().0,
            url: "https://cdn.example.com/a.jpg".to_string(),
            media_kind: MediaKind::Image,
            position: 0,
            created_at: now,
        }],
        reel_options: None,
        scheduled_at: None,
        published_at: None,
        error_message: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
    // Connection successful if we get here without panicking
}

#[tokio::test]
async fn test_account_upsert_and_get() {
    let (db, _temp_dir) = create_test_db().await;

    let account = test_account("acct-1");
    db.upsert_account(&account).await.unwrap();

    let retrieved = db.get_account("acct-1").await.unwrap().unwrap();
    assert_eq!(retrieved.username, "user_acct-1");
    assert_eq!(retrieved.instagram_user_id, "ig_acct-1");

    let all = db.list_accounts().await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_comment_upsert_is_idempotent() {
    let (db, _temp_dir) = create_test_db().await;

    let mut comment = test_comment("c-1", "media-1");
    db.upsert_comments(std::slice::from_ref(&comment))
        .await
        .unwrap();

    // Same remote ID again with refreshed counts: no duplicate row
    comment.like_count = 10;
    db.upsert_comments(std::slice::from_ref(&comment))
        .await
        .unwrap();

    assert_eq!(db.count_comments("media-1").await.unwrap(), 1);
    let stored = db.get_comment("c-1").await.unwrap().unwrap();
    assert_eq!(stored.like_count, 10);
}

#[tokio::test]
async fn test_comment_hidden_flag_survives_resync() {
    let (db, _temp_dir) = create_test_db().await;

    let comment = test_comment("c-1", "media-1");
    db.upsert_comment(&comment).await.unwrap();

    // Hide locally, then re-ingest a stale remote echo with hidden=false
    db.set_comment_hidden("c-1", true).await.unwrap();
    db.upsert_comment(&comment).await.unwrap();

    let stored = db.get_comment("c-1").await.unwrap().unwrap();
    assert!(stored.is_hidden, "local hide must survive a stale resync");
}

#[tokio::test]
async fn test_comment_listing_and_replies() {
    let (db, _temp_dir) = create_test_db().await;

    let top = test_comment("c-1", "media-1");
    let mut reply = test_comment("c-2", "media-1");
    reply.parent_id = Some("c-1".to_string());
    db.upsert_comments(&[top, reply]).await.unwrap();

    // Top-level listing excludes replies
    let top_level = db.get_comments_by_media("media-1", 10, 0).await.unwrap();
    assert_eq!(top_level.len(), 1);
    assert_eq!(top_level[0].id, "c-1");

    let replies = db.get_comment_replies("c-1", 10, 0).await.unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].id, "c-2");

    db.delete_comment("c-2").await.unwrap();
    assert!(db.get_comment("c-2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_conversation_upsert_and_listing() {
    let (db, _temp_dir) = create_test_db().await;

    let conversation = test_conversation("conv-1", "acct-1");
    db.upsert_conversations(std::slice::from_ref(&conversation))
        .await
        .unwrap();
    db.upsert_conversations(std::slice::from_ref(&conversation))
        .await
        .unwrap();

    assert_eq!(db.count_conversations("acct-1").await.unwrap(), 1);
    let listed = db.get_conversations_by_account("acct-1", 10, 0).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].participant_username, "friend");

    assert_eq!(
        db.get_conversation_account_id("conv-1").await.unwrap(),
        Some("acct-1".to_string())
    );
}

#[tokio::test]
async fn test_message_upsert_and_ordering() {
    let (db, _temp_dir) = create_test_db().await;

    let now = Utc::now();
    let older = Message {
        id: "m-1".to_string(),
        conversation_id: "conv-1".to_string(),
        sender_id: "participant-1".to_string(),
        message_type: MessageType::Text,
        text: Some("first".to_string()),
        media_url: None,
        is_unsent: false,
        is_from_me: false,
        sent_at: now - ChronoDuration::minutes(5),
        created_at: now,
    };
    let newer = Message {
        id: "m-2".to_string(),
        text: Some("second".to_string()),
        sent_at: now,
        ..older.clone()
    };

    db.upsert_messages(&[older, newer]).await.unwrap();

    let messages = db.get_messages_by_conversation("conv-1", 10, 0).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, "m-2", "newest message first");
    assert_eq!(db.count_messages("conv-1").await.unwrap(), 2);
}

#[tokio::test]
async fn test_sync_status_roundtrip() {
    let (db, _temp_dir) = create_test_db().await;

    assert!(db
        .get_sync_status(SyncDomain::Messages, "conv-1")
        .await
        .unwrap()
        .is_none());

    let oldest = Utc::now() - ChronoDuration::days(2);
    let status = SyncStatus::completed("conv-1".to_string(), Some(oldest));
    db.update_sync_status(SyncDomain::Messages, &status)
        .await
        .unwrap();

    let stored = db
        .get_sync_status(SyncDomain::Messages, "conv-1")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.sync_complete);
    assert!(stored.next_cursor.is_none());
    assert_eq!(stored.retry_count, 0);
    assert!(!stored.failed);
    assert!(stored.oldest_item_at.is_some());

    // Domains are independent
    assert!(db
        .get_sync_status(SyncDomain::Comments, "conv-1")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_increment_retry_marks_failed_at_max() {
    let (db, _temp_dir) = create_test_db().await;
    let max_retries = 5;

    for attempt in 1..=max_retries {
        db.increment_sync_retry(SyncDomain::Comments, "media-1", "boom", max_retries)
            .await
            .unwrap();

        let status = db
            .get_sync_status(SyncDomain::Comments, "media-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.retry_count, attempt as i64);
        assert_eq!(status.last_error.as_deref(), Some("boom"));

        if attempt < max_retries {
            assert!(!status.failed, "must not fail before max retries");
        } else {
            assert!(status.failed, "must fail at max retries");
            assert!(status.retry_count >= max_retries as i64);
        }
    }
}

#[tokio::test]
async fn test_reset_retry_clears_failure() {
    let (db, _temp_dir) = create_test_db().await;

    for _ in 0..3 {
        db.increment_sync_retry(SyncDomain::Conversations, "acct-1", "boom", 3)
            .await
            .unwrap();
    }
    let status = db
        .get_sync_status(SyncDomain::Conversations, "acct-1")
        .await
        .unwrap()
        .unwrap();
    assert!(status.failed);

    db.reset_sync_retry(SyncDomain::Conversations, "acct-1")
        .await
        .unwrap();

    let status = db
        .get_sync_status(SyncDomain::Conversations, "acct-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status.retry_count, 0);
    assert!(!status.failed);
    assert!(status.last_error.is_none());
}

#[tokio::test]
async fn test_successful_sync_resets_retry_bookkeeping() {
    let (db, _temp_dir) = create_test_db().await;

    for _ in 0..5 {
        db.increment_sync_retry(SyncDomain::Messages, "conv-1", "boom", 5)
            .await
            .unwrap();
    }

    // A completed drain writes a fresh status regardless of prior failure
    db.update_sync_status(
        SyncDomain::Messages,
        &SyncStatus::completed("conv-1".to_string(), None),
    )
    .await
    .unwrap();

    let status = db
        .get_sync_status(SyncDomain::Messages, "conv-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status.retry_count, 0);
    assert!(!status.failed);
    assert!(status.sync_complete);
}

#[tokio::test]
async fn test_failed_unit_excluded_from_sweep_selection() {
    let (db, _temp_dir) = create_test_db().await;

    db.upsert_account(&test_account("acct-1")).await.unwrap();
    db.upsert_account(&test_account("acct-2")).await.unwrap();

    for _ in 0..5 {
        db.increment_sync_retry(SyncDomain::Conversations, "acct-1", "boom", 5)
            .await
            .unwrap();
    }

    let due = db
        .accounts_needing_conversation_sync(Duration::from_secs(0), 10)
        .await
        .unwrap();
    assert_eq!(due, vec!["acct-2".to_string()]);
}

#[tokio::test]
async fn test_sweep_selection_orders_never_synced_first() {
    let (db, _temp_dir) = create_test_db().await;

    db.upsert_account(&test_account("acct-old")).await.unwrap();
    db.upsert_account(&test_account("acct-older")).await.unwrap();
    db.upsert_account(&test_account("acct-never")).await.unwrap();

    let mut old = SyncStatus::completed("acct-old".to_string(), None);
    old.last_synced_at = Utc::now() - ChronoDuration::hours(1);
    db.update_sync_status(SyncDomain::Conversations, &old)
        .await
        .unwrap();

    let mut older = SyncStatus::completed("acct-older".to_string(), None);
    older.last_synced_at = Utc::now() - ChronoDuration::hours(3);
    db.update_sync_status(SyncDomain::Conversations, &older)
        .await
        .unwrap();

    let due = db
        .accounts_needing_conversation_sync(Duration::from_secs(0), 10)
        .await
        .unwrap();
    assert_eq!(
        due,
        vec![
            "acct-never".to_string(),
            "acct-older".to_string(),
            "acct-old".to_string(),
        ]
    );

    // Batch size is respected
    let due = db
        .accounts_needing_conversation_sync(Duration::from_secs(0), 2)
        .await
        .unwrap();
    assert_eq!(due.len(), 2);
    assert_eq!(due[0], "acct-never");
}

#[tokio::test]
async fn test_sweep_selection_respects_staleness_threshold() {
    let (db, _temp_dir) = create_test_db().await;

    db.upsert_account(&test_account("acct-fresh")).await.unwrap();
    db.update_sync_status(
        SyncDomain::Conversations,
        &SyncStatus::completed("acct-fresh".to_string(), None),
    )
    .await
    .unwrap();

    let due = db
        .accounts_needing_conversation_sync(Duration::from_secs(3600), 10)
        .await
        .unwrap();
    assert!(due.is_empty(), "freshly synced unit must not be selected");
}

#[tokio::test]
async fn test_comment_sweep_selects_published_non_story_media() {
    let (db, _temp_dir) = create_test_db().await;

    let mut published = test_publication("pub-1", "acct-1");
    published.status = PublicationStatus::Published;
    published.instagram_media_id = Some("media-1".to_string());
    db.insert_publication(&published).await.unwrap();

    let mut story = test_publication("pub-2", "acct-1");
    story.publication_type = PublicationType::Story;
    story.status = PublicationStatus::Published;
    story.instagram_media_id = Some("media-2".to_string());
    db.insert_publication(&story).await.unwrap();

    let mut draft = test_publication("pub-3", "acct-1");
    draft.instagram_media_id = None;
    db.insert_publication(&draft).await.unwrap();

    let due = db
        .media_ids_needing_comment_sync(Duration::from_secs(0), 10)
        .await
        .unwrap();
    assert_eq!(due, vec!["media-1".to_string()]);

    assert_eq!(
        db.get_account_id_by_media_id("media-1").await.unwrap(),
        Some("acct-1".to_string())
    );
}

#[tokio::test]
async fn test_publication_crud_and_media_order() {
    let (db, _temp_dir) = create_test_db().await;

    let now = Utc::now();
    let mut publication = test_publication("pub-1", "acct-1");
    publication.media = vec![
        MediaItem {
            id: "item-b".to_string(),
            url: "https://cdn.example.com/b.jpg".to_string(),
            media_kind: MediaKind::Image,
            position: 1,
            created_at: now,
        },
        MediaItem {
            id: "item-a".to_string(),
            url: "https://cdn.example.com/a.jpg".to_string(),
            media_kind: MediaKind::Image,
            position: 0,
            created_at: now,
        },
    ];
    db.insert_publication(&publication).await.unwrap();

    let stored = db.get_publication("pub-1").await.unwrap().unwrap();
    assert_eq!(stored.media.len(), 2);
    assert_eq!(stored.media[0].id, "item-a", "media ordered by position");
    assert_eq!(stored.media[1].id, "item-b");

    // Update replaces the media list
    let mut updated = stored.clone();
    updated.caption = "new caption".to_string();
    updated.media = vec![MediaItem {
        id: "item-c".to_string(),
        url: "https://cdn.example.com/c.jpg".to_string(),
        media_kind: MediaKind::Video,
        position: 0,
        created_at: now,
    }];
    db.update_publication(&updated).await.unwrap();

    let stored = db.get_publication("pub-1").await.unwrap().unwrap();
    assert_eq!(stored.caption, "new caption");
    assert_eq!(stored.media.len(), 1);
    assert_eq!(stored.media[0].id, "item-c");

    db.delete_publication("pub-1").await.unwrap();
    assert!(db.get_publication("pub-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_publication_reel_options_roundtrip() {
    let (db, _temp_dir) = create_test_db().await;

    let mut publication = test_publication("pub-1", "acct-1");
    publication.publication_type = PublicationType::Reel;
    publication.media[0].media_kind = MediaKind::Video;
    publication.reel_options = Some(ReelOptions {
        share_to_feed: true,
        cover_url: Some("https://cdn.example.com/cover.jpg".to_string()),
        thumb_offset: Some(1500),
        audio_name: Some("Original audio".to_string()),
        location_id: None,
        collaborators: vec!["friend".to_string()],
    });
    db.insert_publication(&publication).await.unwrap();

    let stored = db.get_publication("pub-1").await.unwrap().unwrap();
    let options = stored.reel_options.unwrap();
    assert!(options.share_to_feed);
    assert_eq!(options.thumb_offset, Some(1500));
    assert_eq!(options.collaborators, vec!["friend".to_string()]);
}

#[tokio::test]
async fn test_list_publications_with_filter() {
    let (db, _temp_dir) = create_test_db().await;

    let mut post = test_publication("pub-1", "acct-1");
    post.status = PublicationStatus::Draft;
    db.insert_publication(&post).await.unwrap();

    let mut reel = test_publication("pub-2", "acct-1");
    reel.publication_type = PublicationType::Reel;
    reel.media[0].media_kind = MediaKind::Video;
    db.insert_publication(&reel).await.unwrap();

    let mut other_account = test_publication("pub-3", "acct-2");
    other_account.status = PublicationStatus::Draft;
    db.insert_publication(&other_account).await.unwrap();

    let filter = PublicationFilter {
        account_id: Some("acct-1".to_string()),
        ..Default::default()
    };
    assert_eq!(db.count_publications(&filter).await.unwrap(), 2);

    let filter = PublicationFilter {
        account_id: Some("acct-1".to_string()),
        publication_type: Some(PublicationType::Reel),
        ..Default::default()
    };
    let listed = db.list_publications(&filter, 10, 0).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "pub-2");
    assert_eq!(listed[0].media.len(), 1);
}

#[tokio::test]
async fn test_publications_due_selection() {
    let (db, _temp_dir) = create_test_db().await;

    let now = Utc::now();

    let mut due = test_publication("pub-due", "acct-1");
    due.status = PublicationStatus::Scheduled;
    due.scheduled_at = Some(now - ChronoDuration::minutes(5));
    db.insert_publication(&due).await.unwrap();

    let mut future = test_publication("pub-future", "acct-1");
    future.status = PublicationStatus::Scheduled;
    future.scheduled_at = Some(now + ChronoDuration::hours(1));
    db.insert_publication(&future).await.unwrap();

    let mut draft = test_publication("pub-draft", "acct-1");
    draft.scheduled_at = Some(now - ChronoDuration::minutes(5));
    db.insert_publication(&draft).await.unwrap();

    let due_list = db.get_publications_due(now).await.unwrap();
    assert_eq!(due_list.len(), 1);
    assert_eq!(due_list[0].id, "pub-due");
    assert_eq!(due_list[0].media.len(), 1);
}

#[tokio::test]
async fn test_publication_publish_and_error_transitions() {
    let (db, _temp_dir) = create_test_db().await;

    let publication = test_publication("pub-1", "acct-1");
    db.insert_publication(&publication).await.unwrap();

    let published_at = Utc::now();
    db.set_publication_published("pub-1", "remote-123", published_at)
        .await
        .unwrap();

    let stored = db.get_publication("pub-1").await.unwrap().unwrap();
    assert_eq!(stored.status, PublicationStatus::Published);
    assert_eq!(stored.instagram_media_id.as_deref(), Some("remote-123"));
    assert!(stored.published_at.is_some());
    assert!(stored.error_message.is_none());

    let publication = test_publication("pub-2", "acct-1");
    db.insert_publication(&publication).await.unwrap();
    db.set_publication_error("pub-2", "container expired")
        .await
        .unwrap();

    let stored = db.get_publication("pub-2").await.unwrap().unwrap();
    assert_eq!(stored.status, PublicationStatus::Error);
    assert_eq!(stored.error_message.as_deref(), Some("container expired"));
}
