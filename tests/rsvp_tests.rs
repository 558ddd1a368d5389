mod common;

use campusvibe::AppError;
use campusvibe::backend::{DocumentStore, collections};
use common::{MockData, TestContext, dec};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn toggle_requires_auth() {
    let ctx = TestContext::new();
    let id = ctx
        .seed_event(MockData::event("Summer Hack Night", dec(15, 18)))
        .await;

    let mut rsvp = ctx.client.rsvp(&id).unwrap();
    rsvp.poll().await.unwrap();

    assert!(matches!(rsvp.toggle().await, Err(AppError::NotAuthenticated)));
    assert!(!rsvp.is_attending());
}

#[tokio::test]
async fn toggle_joins_then_leaves() {
    let ctx = TestContext::new();
    let user = ctx.sign_up("jess@rmit.edu.au").await;
    let id = ctx
        .seed_event(MockData::event("Summer Hack Night", dec(15, 18)))
        .await;

    let mut rsvp = ctx.client.rsvp(&id).unwrap();
    rsvp.poll().await.unwrap();
    assert!(!rsvp.is_attending());
    assert_eq!(rsvp.attendee_count(), 0);

    assert!(rsvp.toggle().await.unwrap());
    assert!(rsvp.is_attending());

    let events = ctx.raw_docs(collections::EVENTS).await;
    assert_eq!(
        events[0].field("attendees"),
        Some(&serde_json::json!([user.uid]))
    );
    assert_eq!(ctx.raw_docs(collections::RSVPS).await.len(), 1);

    rsvp.poll().await.unwrap();
    assert_eq!(rsvp.attendee_count(), 1);

    assert!(!rsvp.toggle().await.unwrap());
    assert!(!rsvp.is_attending());

    let events = ctx.raw_docs(collections::EVENTS).await;
    assert_eq!(events[0].field("attendees"), Some(&serde_json::json!([])));
    assert!(ctx.raw_docs(collections::RSVPS).await.is_empty());
}

#[tokio::test]
async fn double_toggle_without_a_snapshot_returns_to_original_membership() {
    let ctx = TestContext::new();
    ctx.sign_up("jess@rmit.edu.au").await;
    let id = ctx
        .seed_event(MockData::event("Summer Hack Night", dec(15, 18)))
        .await;

    let mut rsvp = ctx.client.rsvp(&id).unwrap();
    rsvp.poll().await.unwrap();

    // No poll between the two toggles: the second must read the overlay the
    // first one left behind, not the stale authoritative list.
    assert!(rsvp.toggle().await.unwrap());
    assert!(!rsvp.toggle().await.unwrap());
    assert!(!rsvp.is_attending());

    let events = ctx.raw_docs(collections::EVENTS).await;
    assert_eq!(events[0].field("attendees"), Some(&serde_json::json!([])));
    assert!(ctx.raw_docs(collections::RSVPS).await.is_empty());
}

#[tokio::test]
async fn odd_number_of_toggles_leaves_exactly_one_membership() {
    let ctx = TestContext::new();
    let user = ctx.sign_up("jess@rmit.edu.au").await;
    let id = ctx
        .seed_event(MockData::event("Summer Hack Night", dec(15, 18)))
        .await;

    let mut rsvp = ctx.client.rsvp(&id).unwrap();
    rsvp.poll().await.unwrap();

    for _ in 0..3 {
        rsvp.toggle().await.unwrap();
        rsvp.poll().await.unwrap();
    }

    let events = ctx.raw_docs(collections::EVENTS).await;
    assert_eq!(
        events[0].field("attendees"),
        Some(&serde_json::json!([user.uid]))
    );
    assert_eq!(ctx.raw_docs(collections::RSVPS).await.len(), 1);
    assert!(rsvp.is_attending());
}

#[tokio::test]
async fn join_does_not_duplicate_an_existing_rsvp_record() {
    let ctx = TestContext::new();
    let user = ctx.sign_up("jess@rmit.edu.au").await;
    let id = ctx
        .seed_event(MockData::event("Summer Hack Night", dec(15, 18)))
        .await;
    // A stale record from an earlier partial toggle.
    ctx.client
        .store()
        .add(collections::RSVPS, MockData::rsvp(&id, &user.uid, dec(14, 9)))
        .await
        .unwrap();

    let mut rsvp = ctx.client.rsvp(&id).unwrap();
    rsvp.poll().await.unwrap();
    rsvp.toggle().await.unwrap();

    assert_eq!(ctx.raw_docs(collections::RSVPS).await.len(), 1);
}

#[tokio::test]
async fn partial_failure_reverts_the_optimistic_flag() {
    let ctx = TestContext::new();
    ctx.sign_up("jess@rmit.edu.au").await;
    let id = ctx
        .seed_event(MockData::event("Summer Hack Night", dec(15, 18)))
        .await;

    let mut rsvp = ctx.client.rsvp(&id).unwrap();
    rsvp.poll().await.unwrap();

    ctx.backend.fail_writes(collections::RSVPS);
    let result = rsvp.toggle().await;
    assert!(matches!(result, Err(AppError::PartialFailure { .. })));

    // The optimistic overlay is gone; local state is back to the last
    // authoritative snapshot.
    assert!(!rsvp.is_attending());

    // The attendee-list write went through before the RSVP record failed, so
    // the next snapshot reports membership even though no record exists.
    rsvp.poll().await.unwrap();
    assert!(rsvp.is_attending());
    assert_eq!(rsvp.attendee_count(), 1);
    assert!(ctx.raw_docs(collections::RSVPS).await.is_empty());

    // A retry once the backend recovers completes the leave cleanly.
    ctx.backend.restore_writes(collections::RSVPS);
    assert!(!rsvp.toggle().await.unwrap());
    rsvp.poll().await.unwrap();
    assert!(!rsvp.is_attending());
}

#[tokio::test]
async fn snapshot_supersedes_the_overlay() {
    let ctx = TestContext::new();
    let user = ctx.sign_up("jess@rmit.edu.au").await;
    let id = ctx
        .seed_event(MockData::event("Summer Hack Night", dec(15, 18)))
        .await;

    let mut rsvp = ctx.client.rsvp(&id).unwrap();
    rsvp.poll().await.unwrap();
    rsvp.toggle().await.unwrap();

    // Another session removed us; the authoritative snapshot wins over the
    // optimistic overlay from the toggle.
    ctx.client
        .store()
        .array_remove(collections::EVENTS, &id, "attendees", serde_json::json!(user.uid))
        .await
        .unwrap();

    // Two writes queued two notifications; each re-read may already observe
    // the later state, so only the final snapshot is asserted.
    rsvp.poll().await.unwrap();
    rsvp.poll().await.unwrap();
    assert_eq!(rsvp.attendee_count(), 0);
    assert!(!rsvp.is_attending());
}

#[tokio::test]
async fn deleted_event_clears_attendance() {
    let ctx = TestContext::new();
    ctx.sign_up("jess@rmit.edu.au").await;
    let id = ctx
        .seed_event(MockData::event("Summer Hack Night", dec(15, 18)))
        .await;

    let mut rsvp = ctx.client.rsvp(&id).unwrap();
    rsvp.poll().await.unwrap();
    rsvp.toggle().await.unwrap();
    rsvp.poll().await.unwrap();
    assert_eq!(rsvp.attendee_count(), 1);

    ctx.client
        .store()
        .delete(collections::EVENTS, &id)
        .await
        .unwrap();
    rsvp.poll().await.unwrap();

    assert_eq!(rsvp.attendee_count(), 0);
    assert!(!rsvp.is_attending());
}
