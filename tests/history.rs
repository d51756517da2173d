use std::sync::Arc;
use std::time::{Duration, Instant};

use callwatch_lib::settings::WatcherSettings;
use callwatch_lib::{
    AppState, CallOutcome, ClassifiedCall, Database, EventChannel, HistoryRecorder,
    MemoryCallLog,
};
use tempfile::tempdir;

fn call(number: &str, outcome: CallOutcome, ts: i64) -> ClassifiedCall {
    ClassifiedCall {
        outcome,
        phone_number: number.into(),
        duration_seconds: 7,
        occurred_at_epoch_millis: ts,
    }
}

#[tokio::test]
async fn test_insert_is_idempotent_per_identity() {
    let dir = tempdir().unwrap();
    let db = Database::new(dir.path().join("history.sqlite3")).unwrap();

    let missed = call("600111222", CallOutcome::Missed, 1000);
    assert!(db.insert_call(&missed).await.unwrap());
    assert!(!db.insert_call(&missed).await.unwrap());

    // Same identity, different classification: still the same call.
    let reread = ClassifiedCall {
        outcome: CallOutcome::Incoming,
        ..missed.clone()
    };
    assert!(!db.insert_call(&reread).await.unwrap());
    assert_eq!(db.count_calls().await.unwrap(), 1);
}

#[tokio::test]
async fn test_recent_calls_are_newest_first() {
    let db = Database::open_in_memory().unwrap();
    db.insert_call(&call("1", CallOutcome::Incoming, 1000)).await.unwrap();
    db.insert_call(&call("3", CallOutcome::Rejected, 3000)).await.unwrap();
    db.insert_call(&call("2", CallOutcome::Outgoing, 2000)).await.unwrap();

    let records = db.list_recent_calls(2).await.unwrap();
    let numbers: Vec<_> = records.iter().map(|r| r.phone_number.as_str()).collect();
    assert_eq!(numbers, vec!["3", "2"]);
    assert_eq!(records[0].outcome, CallOutcome::Rejected);
    assert_eq!(records[0].call(), call("3", CallOutcome::Rejected, 3000));
    assert!(records[0].follow_up.is_none());
}

#[tokio::test]
async fn test_follow_up_answers_are_stored_and_replaced() {
    let db = Database::open_in_memory().unwrap();
    let missed = call("600111222", CallOutcome::Missed, 1000);
    db.insert_call(&missed).await.unwrap();

    db.record_follow_up(&missed.identity(), true, false).await.unwrap();
    db.record_follow_up(&missed.identity(), true, true).await.unwrap();

    let records = db.list_recent_calls(10).await.unwrap();
    assert_eq!(records.len(), 1);
    let follow_up = records[0].follow_up.as_ref().unwrap();
    assert!(follow_up.is_client);
    assert!(follow_up.message_sent);
}

#[tokio::test]
async fn test_follow_up_for_unrecorded_call_fails() {
    let db = Database::open_in_memory().unwrap();
    let stranger = call("999", CallOutcome::Missed, 42);
    assert!(db
        .record_follow_up(&stranger.identity(), false, false)
        .await
        .is_err());
}

#[tokio::test]
async fn test_history_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.sqlite3");

    {
        let db = Database::new(path.clone()).unwrap();
        db.insert_call(&call("600", CallOutcome::Incoming, 10)).await.unwrap();
    }

    let db = Database::new(path).unwrap();
    assert_eq!(db.count_calls().await.unwrap(), 1);
}

#[tokio::test]
async fn test_recorder_persists_delivered_calls_once() {
    let db = Database::open_in_memory().unwrap();
    let channel = EventChannel::new();
    let _subscription = HistoryRecorder::attach(&channel, db.clone());

    assert!(channel.publish(call("600", CallOutcome::Missed, 1000)));
    assert!(!channel.publish(call("600", CallOutcome::Missed, 1000)));
    assert!(channel.publish(call("601", CallOutcome::Incoming, 2000)));

    let deadline = Instant::now() + Duration::from_secs(3);
    while db.count_calls().await.unwrap() < 2 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(db.count_calls().await.unwrap(), 2);
}

#[tokio::test]
async fn test_app_state_creates_data_dir() {
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("nested").join("callwatch");

    let app = AppState::open(&data_dir).unwrap();
    assert!(data_dir.join(callwatch_lib::DATABASE_FILE).exists());
    assert_eq!(app.db.count_calls().await.unwrap(), 0);
    assert_eq!(app.channel.subscriber_count(), 0);
}

#[tokio::test]
async fn test_app_watcher_uses_saved_timing_unless_overridden() {
    let dir = tempdir().unwrap();
    let app = AppState::open(dir.path()).unwrap();
    app.settings
        .update_watcher(WatcherSettings {
            poll_interval_ms: 750,
            read_timeout_ms: 3000,
        })
        .unwrap();

    let saved = app.watcher(Arc::new(MemoryCallLog::new()), None);
    assert_eq!(saved.config().poll_interval, Duration::from_millis(750));
    assert_eq!(saved.config().read_timeout, Duration::from_millis(3000));

    let overridden = app.watcher(
        Arc::new(MemoryCallLog::new()),
        Some(Duration::from_millis(100)),
    );
    assert_eq!(overridden.config().poll_interval, Duration::from_millis(100));
    assert_eq!(overridden.config().read_timeout, Duration::from_millis(3000));
}
