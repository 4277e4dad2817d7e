mod common;

use common::{CallLog, MockCapturer, MockCollector, action};
use jsid_engine::change::{ActionType, ChangeRecord};
use jsid_engine::session::{AttributionMode, RecordingSession, SessionError, SessionState, attribute};
use std::sync::Arc;

fn mocks() -> (CallLog, Arc<MockCapturer>, Arc<MockCollector>) {
    let log = CallLog::default();
    let capturer = Arc::new(MockCapturer::with_log(log.clone()));
    let collector = Arc::new(MockCollector::with_log(log.clone()));
    (log, capturer, collector)
}

#[test]
fn test_batch_attribution_gives_everything_to_first_action() {
    let actions = vec![
        action(ActionType::Fill, "#email", Some("x")),
        action(ActionType::Click, "#submit", None),
    ];
    let changes = vec![
        ChangeRecord::added(".error"),
        ChangeRecord::css("#panel", "display", "none"),
        ChangeRecord::network("POST", "/api/login"),
    ];

    let recorded = attribute(actions, changes.clone(), AttributionMode::Batch);
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].selector, "#email");
    assert_eq!(recorded[0].changes, changes);
    assert_eq!(recorded[1].selector, "#submit");
    assert!(recorded[1].changes.is_empty());
}

#[test]
fn test_attribution_without_actions_discards_changes() {
    let recorded = attribute(vec![], vec![ChangeRecord::added("#x")], AttributionMode::Batch);
    assert!(recorded.is_empty());
}

#[tokio::test]
async fn test_finalize_without_start_is_not_initialized() {
    let mut session = RecordingSession::default();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(matches!(
        session.finalize().await,
        Err(SessionError::NotInitialized)
    ));
}

#[tokio::test]
async fn test_start_installs_collaborators_in_order() {
    let (log, capturer, collector) = mocks();
    let mut session = RecordingSession::new(AttributionMode::Batch);

    session.start(capturer, collector).await.unwrap();
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "capturer.start",
            "collector.start",
            "capturer.clear",
            "collector.before_action"
        ]
    );

    let (_, capturer, collector) = mocks();
    let err = session.start(capturer, collector).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidState {
            operation: "start",
            state: SessionState::Active
        }
    ));
}

#[tokio::test]
async fn test_failed_start_leaves_session_idle() {
    let log = CallLog::default();
    let capturer = Arc::new(MockCapturer {
        log: log.clone(),
        fail_start: true,
        ..Default::default()
    });
    let collector = Arc::new(MockCollector::with_log(log));
    let mut session = RecordingSession::default();

    assert!(matches!(
        session.start(capturer, collector).await,
        Err(SessionError::Driver(_))
    ));
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_full_session_attributes_batch() {
    let (log, capturer, collector) = mocks();
    let mut session = RecordingSession::default();
    session
        .start(capturer.clone(), collector.clone())
        .await
        .unwrap();

    capturer.push(action(ActionType::Click, "#email", None));
    capturer.push(action(ActionType::Fill, "#email", Some("a")));
    assert_eq!(session.poll().await.unwrap(), 2);
    assert_eq!(session.pending_actions().len(), 1);

    capturer.push(action(ActionType::Fill, "#email", Some("ab")));
    capturer.push(action(ActionType::Click, "#submit", None));
    collector.push(ChangeRecord::added(".error"));
    collector.push(ChangeRecord::network("POST", "/api/login"));

    let recorded = session.finalize().await.unwrap().to_vec();
    assert_eq!(session.state(), SessionState::Finished);
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].action_type, ActionType::Fill);
    assert_eq!(recorded[0].value.as_deref(), Some("ab"));
    assert_eq!(recorded[0].changes.len(), 2);
    assert!(recorded[1].changes.is_empty());

    // A second finalize returns the same actions and drains nothing.
    let calls = log.lock().unwrap().len();
    let again = session.finalize().await.unwrap().to_vec();
    assert_eq!(again, recorded);
    assert_eq!(log.lock().unwrap().len(), calls);
}

#[tokio::test]
async fn test_single_action_without_changes() {
    let (_, capturer, collector) = mocks();
    let mut session = RecordingSession::default();
    session.start(capturer.clone(), collector).await.unwrap();

    capturer.push(action(ActionType::Press, "#q", Some("Enter")));
    let recorded = session.finalize().await.unwrap();
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].changes.is_empty());
}

#[tokio::test]
async fn test_no_actions_skips_change_drain() {
    let (log, capturer, collector) = mocks();
    let mut session = RecordingSession::default();
    session.start(capturer, collector.clone()).await.unwrap();
    collector.push(ChangeRecord::added("#banner"));

    assert!(session.finalize().await.unwrap().is_empty());
    assert!(!log.lock().unwrap().contains(&"collector.after_action"));
}

#[tokio::test]
async fn test_collector_failure_keeps_actions() {
    let log = CallLog::default();
    let capturer = Arc::new(MockCapturer::with_log(log.clone()));
    let collector = Arc::new(MockCollector {
        log,
        fail_after: true,
        ..Default::default()
    });
    let mut session = RecordingSession::default();
    session.start(capturer.clone(), collector).await.unwrap();

    capturer.push(action(ActionType::Click, "#go", None));
    let recorded = session.finalize().await.unwrap();
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].changes.is_empty());
}

#[tokio::test]
async fn test_restart_after_finish_clears_previous_run() {
    let (_, capturer, collector) = mocks();
    let mut session = RecordingSession::default();
    session
        .start(capturer.clone(), collector.clone())
        .await
        .unwrap();
    capturer.push(action(ActionType::Click, "#go", None));
    assert_eq!(session.finalize().await.unwrap().len(), 1);

    session.start(capturer, collector).await.unwrap();
    assert_eq!(session.state(), SessionState::Active);
    assert!(session.recorded_actions().is_empty());
    assert!(matches!(
        RecordingSession::default().poll().await,
        Err(SessionError::InvalidState { operation: "poll", .. })
    ));
}
