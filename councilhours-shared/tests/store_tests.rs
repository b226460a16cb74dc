/// Integration tests for the Postgres member store, allocator and models
///
/// Requires PostgreSQL, see `common/mod.rs`.

mod common;

use chrono::{Duration, NaiveDate, Utc};
use councilhours_shared::access_code::{AccessCodeAllocator, AllocationError};
use councilhours_shared::models::activity::{Activity, ActivityEntry};
use councilhours_shared::models::member::Member;
use councilhours_shared::models::notification::{NewNotification, Notification, NotificationStatus};
use councilhours_shared::store::{MemberStore, PgMemberStore, StoreError};

const LEASE: std::time::Duration = std::time::Duration::from_secs(300);

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[tokio::test]
#[ignore]
async fn test_login_matches_case_insensitively() {
    let pool = common::fresh_pool().await;
    common::seed(&pool, &[common::new_member("1001", " Smith ", Some("ABC234"))]).await;

    let found = Member::find_by_login(&pool, "SMITH", " abc234 ").await.unwrap();
    assert_eq!(found.map(|m| m.member_number), Some("1001".to_string()));

    assert!(Member::find_by_login(&pool, "Jones", "ABC234").await.unwrap().is_none());
    assert!(Member::find_by_login(&pool, "Smith", "").await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_pg_store_conflict_maps_to_store_error() {
    let pool = common::fresh_pool().await;
    let members = common::seed(
        &pool,
        &[
            common::new_member("1", "Adams", Some("ABC234")),
            common::new_member("2", "Baker", None),
        ],
    )
    .await;
    let store = PgMemberStore::new(pool);

    let mut baker = members[1].clone();
    baker.access_code = Some("abc234".to_string());

    assert_eq!(store.persist(&baker).await, Err(StoreError::Conflict));
}

#[tokio::test]
#[ignore]
async fn test_pg_store_persist_leaves_other_columns() {
    let pool = common::fresh_pool().await;
    let members = common::seed(&pool, &[common::new_member("1", "Adams", None)]).await;
    let store = PgMemberStore::new(pool.clone());

    // Copy loaded before a promotion lands
    let mut stale = members[0].clone();
    assert!(Member::set_admin(&pool, stale.id, true).await.unwrap());

    stale.access_code = Some("NEW234".to_string());
    store.persist(&stale).await.unwrap();

    let stored = Member::find_by_id(&pool, stale.id).await.unwrap().unwrap();
    assert!(stored.is_admin);
    assert_eq!(stored.access_code.as_deref(), Some("NEW234"));
}

#[tokio::test]
#[ignore]
async fn test_allocator_assigns_and_fills_codes() {
    let pool = common::fresh_pool().await;
    let members = common::seed(
        &pool,
        &[
            common::new_member("1", "Adams", Some("KEEP23")),
            common::new_member("2", "Baker", None),
            common::new_member("3", "Cole", None),
        ],
    )
    .await;
    let allocator = AccessCodeAllocator::new(PgMemberStore::new(pool.clone()));

    assert_eq!(allocator.fill_missing_codes().await.unwrap(), 2);

    let after = Member::list_ordered(&pool).await.unwrap();
    assert!(after.iter().all(|m| m.has_access_code()));
    assert_eq!(
        Member::find_by_id(&pool, members[0].id)
            .await
            .unwrap()
            .unwrap()
            .access_code
            .as_deref(),
        Some("KEEP23")
    );

    let code = allocator.assign_code(members[0].id).await.unwrap();
    let holder = Member::find_by_access_code(&pool, &code.to_lowercase())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(holder.id, members[0].id);

    assert!(matches!(
        allocator.assign_code(999_999).await,
        Err(AllocationError::NotFound(999_999))
    ));
}

#[tokio::test]
#[ignore]
async fn test_activity_upsert_rules() {
    let pool = common::fresh_pool().await;
    let member = common::seed(&pool, &[common::new_member("1", "Adams", None)]).await[0].clone();
    let mut conn = pool.acquire().await.unwrap();

    // Zero values do not create a row
    let written = Activity::upsert(
        &mut conn,
        member.id,
        &ActivityEntry::new("Family Week", 0.0, 0.0),
        today(),
        false,
    )
    .await
    .unwrap();
    assert!(written.is_none());

    // Unless explicitly requested
    let written = Activity::upsert(
        &mut conn,
        member.id,
        &ActivityEntry::new("Visits to the Sick", 0.0, 0.0),
        today(),
        true,
    )
    .await
    .unwrap();
    assert!(written.is_some());

    let first = Activity::upsert(
        &mut conn,
        member.id,
        &ActivityEntry::new("Family Week", 2.0, 10.0),
        today() - Duration::days(3),
        false,
    )
    .await
    .unwrap()
    .unwrap();

    // Existing rows are updated even to zero, and re-dated
    let second = Activity::upsert(
        &mut conn,
        member.id,
        &ActivityEntry::new("Family Week", 0.0, 0.0),
        today(),
        false,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.hours, 0.0);
    assert_eq!(second.date, today());

    let rows = Activity::list_by_member(&pool, member.id).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
#[ignore]
async fn test_save_form_and_member_deletion() {
    let pool = common::fresh_pool().await;
    let member = common::seed(&pool, &[common::new_member("1", "Adams", None)]).await[0].clone();

    let written = Activity::save_form(
        &pool,
        member.id,
        &[
            ActivityEntry::new("Coats For Kids", 3.0, 0.0),
            ActivityEntry::new("Athletics", 0.0, 0.0),
            ActivityEntry::new("Masses Held for Members", 2.0, 0.0),
        ],
        today(),
    )
    .await
    .unwrap();
    assert_eq!(written, 2);

    assert!(Member::delete_with_activities(&pool, member.id).await.unwrap());
    assert!(Activity::list_all(&pool).await.unwrap().is_empty());
    assert!(!Member::delete_with_activities(&pool, member.id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_notification_claim_cycle() {
    let pool = common::fresh_pool().await;

    for number in ["1", "2", "3"] {
        Notification::enqueue(
            &pool,
            NewNotification {
                member_number: number.to_string(),
                to_address: format!("{}@example.com", number),
                subject: "Hello".to_string(),
                body: "Body".to_string(),
            },
        )
        .await
        .unwrap();
    }

    let batch = Notification::claim_batch(&pool, 2, 3, LEASE).await.unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].member_number, "1");
    assert!(batch
        .iter()
        .all(|n| n.status() == Some(NotificationStatus::Sending) && n.attempts == 1));

    Notification::mark_sent(&pool, batch[0].id).await.unwrap();
    Notification::mark_failed(&pool, batch[1].id, "smtp down").await.unwrap();

    // The third pending row and the failed row are claimable again
    let retry = Notification::claim_batch(&pool, 10, 3, LEASE).await.unwrap();
    assert_eq!(retry.len(), 2);

    let failed = retry.iter().find(|n| n.id == batch[1].id).unwrap();
    assert_eq!(failed.attempts, 2);
    assert_eq!(failed.last_error.as_deref(), Some("smtp down"));

    let sent = Notification::find_by_id(&pool, batch[0].id).await.unwrap().unwrap();
    assert_eq!(sent.status(), Some(NotificationStatus::Sent));
    assert!(sent.sent_at.is_some());

    // Out of attempts
    Notification::mark_failed(&pool, failed.id, "still down").await.unwrap();
    let third = Notification::claim_batch(&pool, 10, 2, LEASE).await.unwrap();
    assert!(third.iter().all(|n| n.id != failed.id));
}
