//! Command dispatch: gating, dedup, watch bookkeeping, admin subscription
//! management.

mod common;

use common::{RecordingNotifier, ScriptedProber, message};
use gramwatch::error::ProbeError;
use gramwatch::handlers::Dispatcher;
use gramwatch::probe::Availability;
use gramwatch::state::{BotState, SubDuration};
use std::sync::Arc;

const ADMIN: &str = "999";

fn setup(admin_id: Option<&str>) -> (Arc<BotState>, Arc<ScriptedProber>, Arc<RecordingNotifier>, Dispatcher) {
    setup_with_script(admin_id, vec![])
}

fn setup_with_script(
    admin_id: Option<&str>,
    script: Vec<Result<Availability, ProbeError>>,
) -> (Arc<BotState>, Arc<ScriptedProber>, Arc<RecordingNotifier>, Dispatcher) {
    let state = Arc::new(BotState::new(admin_id.map(String::from)));
    let prober = Arc::new(ScriptedProber::new(script));
    let notifier = Arc::new(RecordingNotifier::new());
    let dispatcher = Dispatcher::new(
        Arc::clone(&state),
        prober.clone() as Arc<dyn gramwatch::probe::Prober>,
        notifier.clone() as Arc<dyn gramwatch::notify::Notifier>,
        admin_id.map(String::from),
    );
    (state, prober, notifier, dispatcher)
}

#[tokio::test]
async fn unsubscribed_user_is_rejected_without_mutation() {
    let (state, prober, notifier, d) = setup(None);

    d.handle(&message("m1", "100", "!watch alice")).await;

    assert!(state.watches.is_empty());
    assert_eq!(prober.call_count(), 0);
    let dms = notifier.dms_for("100");
    assert_eq!(dms.len(), 1);
    assert!(dms[0].contains("don't have an active subscription"));
}

#[tokio::test]
async fn admin_bypasses_the_subscription_gate() {
    let (state, _prober, notifier, d) = setup(Some(ADMIN));

    d.handle(&message("m1", ADMIN, "!watch alice")).await;

    assert_eq!(state.watches.list_for(ADMIN).len(), 1);
    assert!(
        notifier
            .dms_for(ADMIN)
            .iter()
            .any(|t| t.contains("Now monitoring"))
    );
}

#[tokio::test]
async fn duplicate_message_delivery_is_processed_once() {
    let (state, _prober, notifier, d) = setup(Some(ADMIN));

    let msg = message("m1", ADMIN, "!watch alice");
    d.handle(&msg).await;
    d.handle(&msg).await;

    // Second delivery dropped: no AlreadyWatching DM, one watch.
    assert_eq!(state.watches.list_for(ADMIN).len(), 1);
    assert!(
        !notifier
            .dms_for(ADMIN)
            .iter()
            .any(|t| t.contains("already monitoring"))
    );
}

#[tokio::test]
async fn rewatching_the_same_username_is_rejected() {
    let (state, _prober, notifier, d) = setup(Some(ADMIN));

    d.handle(&message("m1", ADMIN, "!watch alice")).await;
    d.handle(&message("m2", ADMIN, "!watch alice")).await;

    assert_eq!(state.watches.list_for(ADMIN).len(), 1);
    assert!(
        notifier
            .dms_for(ADMIN)
            .iter()
            .any(|t| t.contains("already monitoring"))
    );
}

#[tokio::test]
async fn fourth_watch_is_rejected_by_slot_limit() {
    let (state, _prober, notifier, d) = setup(Some(ADMIN));

    d.handle(&message("m1", ADMIN, "!watch a")).await;
    d.handle(&message("m2", ADMIN, "!watch b")).await;
    d.handle(&message("m3", ADMIN, "!watch c")).await;
    d.handle(&message("m4", ADMIN, "!watch d")).await;

    assert_eq!(state.watches.watch_count(ADMIN), 3);
    assert!(state.watches.entries_for("d").is_none());
    assert!(
        notifier
            .dms_for(ADMIN)
            .iter()
            .any(|t| t.contains("up to 3"))
    );
}

#[tokio::test]
async fn empty_watch_username_gets_usage_message() {
    let (state, _prober, notifier, d) = setup(Some(ADMIN));

    d.handle(&message("m1", ADMIN, "!watch  ")).await;

    assert!(state.watches.is_empty());
    assert!(
        notifier
            .dms_for(ADMIN)
            .iter()
            .any(|t| t.contains("valid Instagram username"))
    );
}

#[tokio::test]
async fn initial_check_available_removes_only_the_callers_entry() {
    let (state, _prober, notifier, d) =
        setup_with_script(Some(ADMIN), vec![Ok(Availability::Available)]);
    state.subs.grant("100", SubDuration::OneWeek, ADMIN);
    state.watches.add_watch("alice", "100");

    d.handle(&message("m1", ADMIN, "!watch alice")).await;

    assert!(
        notifier
            .dms_for(ADMIN)
            .iter()
            .any(|t| t.contains("already available"))
    );
    // The admin's fresh entry is gone; the pre-existing watcher remains.
    assert!(state.watches.list_for(ADMIN).is_empty());
    assert_eq!(state.watches.list_for("100").len(), 1);
    // Fence was released for the surviving entry.
    assert!(state.watches.mark_checking("alice"));
}

#[tokio::test]
async fn unwatch_removes_own_entry_only() {
    let (state, _prober, notifier, d) = setup(Some(ADMIN));
    state.subs.grant("100", SubDuration::OneWeek, ADMIN);
    state.watches.add_watch("alice", "100");

    d.handle(&message("m1", ADMIN, "!watch alice")).await;
    d.handle(&message("m2", ADMIN, "!unwatch alice")).await;

    assert!(state.watches.list_for(ADMIN).is_empty());
    assert_eq!(state.watches.list_for("100").len(), 1);
    assert!(
        notifier
            .dms_for(ADMIN)
            .iter()
            .any(|t| t.contains("Stopped monitoring"))
    );
}

#[tokio::test]
async fn unwatch_unknown_username_reports_not_watching() {
    let (state, _prober, notifier, d) = setup(Some(ADMIN));

    d.handle(&message("m1", ADMIN, "!unwatch ghost")).await;

    assert!(state.watches.is_empty());
    assert!(
        notifier
            .dms_for(ADMIN)
            .iter()
            .any(|t| t.contains("weren't monitoring"))
    );
}

#[tokio::test]
async fn list_shows_watches_with_elapsed_time() {
    let (_state, _prober, notifier, d) = setup(Some(ADMIN));

    d.handle(&message("m0", ADMIN, "!list")).await;
    assert!(
        notifier
            .dms_for(ADMIN)
            .iter()
            .any(|t| t.contains("not monitoring any"))
    );

    d.handle(&message("m1", ADMIN, "!watch alice")).await;
    d.handle(&message("m2", ADMIN, "!list")).await;
    let listing = notifier
        .dms_for(ADMIN)
        .into_iter()
        .find(|t| t.contains("monitored Instagram usernames"))
        .expect("list DM");
    assert!(listing.contains("alice"));
    assert!(listing.contains("monitoring for"));
}

#[tokio::test]
async fn help_is_gated_like_other_user_commands() {
    let (state, _prober, notifier, d) = setup(None);

    // No subscription: help is gated too.
    d.handle(&message("m1", "100", "!help")).await;
    assert!(
        !notifier
            .dms_for("100")
            .iter()
            .any(|t| t.contains("Monitor Bot Commands"))
    );

    state.subs.grant("100", SubDuration::OneWeek, ADMIN);
    d.handle(&message("m2", "100", "!help")).await;
    assert!(
        notifier
            .dms_for("100")
            .iter()
            .any(|t| t.contains("Monitor Bot Commands"))
    );
}

#[tokio::test]
async fn adduser_grants_and_gates_open() {
    let (state, _prober, notifier, d) = setup(Some(ADMIN));

    d.handle(&message("m1", ADMIN, "!adduser <@100> 1week")).await;

    assert!(state.subs.is_active("100", chrono::Utc::now()));
    assert!(
        notifier
            .reply_texts()
            .iter()
            .any(|t| t.contains("Added subscription for <@100>"))
    );
    assert!(
        notifier
            .admin_logs
            .lock()
            .iter()
            .any(|t| t.contains("added subscription"))
    );

    // The freshly granted user can now watch.
    d.handle(&message("m2", "100", "!watch alice")).await;
    assert_eq!(state.watches.list_for("100").len(), 1);
}

#[tokio::test]
async fn adduser_rejects_malformed_arguments_without_mutation() {
    let (state, _prober, notifier, d) = setup(Some(ADMIN));

    d.handle(&message("m1", ADMIN, "!adduser 100 1week")).await;
    d.handle(&message("m2", ADMIN, "!adduser <@100> fortnight")).await;

    assert!(state.subs.list().is_empty());
    let replies = notifier.reply_texts();
    assert!(replies.iter().any(|t| t.contains("Usage: !adduser")));
    assert!(replies.iter().any(|t| t.contains("Invalid duration")));
}

#[tokio::test]
async fn adduser_accepts_nickname_mention_form() {
    let (state, _prober, _notifier, d) = setup(Some(ADMIN));

    d.handle(&message("m1", ADMIN, "!adduser <@!100> 1month")).await;
    assert!(state.subs.is_active("100", chrono::Utc::now()));
}

#[tokio::test]
async fn admin_commands_from_non_admin_are_ignored() {
    let (state, _prober, notifier, d) = setup(Some(ADMIN));

    d.handle(&message("m1", "100", "!adduser <@200> 1week")).await;

    assert!(state.subs.list().is_empty());
    assert!(notifier.reply_texts().is_empty());
}

#[tokio::test]
async fn removeuser_revokes_and_closes_the_gate() {
    let (state, _prober, notifier, d) = setup(Some(ADMIN));

    d.handle(&message("m1", ADMIN, "!adduser <@100> 1week")).await;
    d.handle(&message("m2", ADMIN, "!removeuser <@100>")).await;

    assert!(!state.subs.is_active("100", chrono::Utc::now()));
    assert!(
        notifier
            .reply_texts()
            .iter()
            .any(|t| t.contains("Removed subscription for <@100>"))
    );

    // And the revoked user is rejected again.
    d.handle(&message("m3", "100", "!watch alice")).await;
    assert!(state.watches.is_empty());
}

#[tokio::test]
async fn removeuser_unknown_target_reports_missing() {
    let (_state, _prober, notifier, d) = setup(Some(ADMIN));

    d.handle(&message("m1", ADMIN, "!removeuser <@100>")).await;
    assert!(
        notifier
            .reply_texts()
            .iter()
            .any(|t| t.contains("doesn't have an active subscription"))
    );
}

#[tokio::test]
async fn listsubs_lists_grants() {
    let (_state, _prober, notifier, d) = setup(Some(ADMIN));

    d.handle(&message("m1", ADMIN, "!listsubs")).await;
    assert!(
        notifier
            .reply_texts()
            .iter()
            .any(|t| t.contains("No active subscriptions"))
    );

    d.handle(&message("m2", ADMIN, "!adduser <@100> 1year")).await;
    d.handle(&message("m3", ADMIN, "!listsubs")).await;
    let listing = notifier
        .reply_texts()
        .into_iter()
        .find(|t| t.contains("Active Subscriptions"))
        .expect("listsubs reply");
    assert!(listing.contains("<@100>"));
    assert!(listing.contains("expires in"));
}

#[tokio::test]
async fn bot_authors_are_ignored() {
    let (state, _prober, notifier, d) = setup(Some(ADMIN));

    let mut msg = message("m1", ADMIN, "!watch alice");
    msg.author_is_bot = true;
    d.handle(&msg).await;

    assert!(state.watches.is_empty());
    assert_eq!(notifier.dm_count(), 0);
}
