//! Mock implementations for testing
//!
//! These mocks enable runtime testing without network I/O.

use crate::llm::{Completion, LlmError, LlmService, Message};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<Completion, LlmError>>>,
    model_id: String,
    /// Record of every transcript sent
    pub requests: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(Completion::text(text)));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded transcripts
    pub fn recorded_requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self) -> Result<Completion, LlmError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl LlmService for MockLlmClient {
    async fn complete(&self, transcript: &[Message]) -> Result<Completion, LlmError> {
        self.requests.lock().unwrap().push(transcript.to_vec());
        self.next_response()
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Delayed Mock LLM Client (for in-flight testing)
// ============================================================================

/// Mock LLM client that holds each request until released
pub struct DelayedMockLlmClient {
    inner: MockLlmClient,
    delay: Duration,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl DelayedMockLlmClient {
    pub fn new(model_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            inner: MockLlmClient::new(model_id),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_reply(&self, text: impl Into<String>) {
        self.inner.queue_reply(text);
    }

    pub fn recorded_requests(&self) -> Vec<Vec<Message>> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl LlmService for DelayedMockLlmClient {
    async fn complete(&self, transcript: &[Message]) -> Result<Completion, LlmError> {
        self.inner.requests.lock().unwrap().push(transcript.to_vec());
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.next_response()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

use crate::runtime::{RuntimeError, RuntimeManager, SessionSnapshot, SseEvent};
use tokio::sync::broadcast;

/// Wait for the first event matching `pred`, or `None` on timeout
pub async fn wait_for<F>(
    rx: &mut broadcast::Receiver<SseEvent>,
    timeout: Duration,
    mut pred: F,
) -> Option<SseEvent>
where
    F: FnMut(&SseEvent) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {
            Ok(Ok(event)) if pred(&event) => return Some(event),
            Ok(Err(broadcast::error::RecvError::Closed)) => return None,
            _ => continue,
        }
    }
    None
}

/// Wait until the session is no longer awaiting a reply
pub async fn wait_until_settled(
    manager: &RuntimeManager,
    session_id: &str,
    timeout: Duration,
) -> Result<SessionSnapshot, RuntimeError> {
    let mut rx = manager.handle(session_id).await?.snapshot_rx;
    let settled = tokio::time::timeout(timeout, rx.wait_for(|s| !s.awaiting_reply)).await;
    match settled {
        Ok(Ok(snapshot)) => Ok(snapshot.clone()),
        Ok(Err(_)) => Err(RuntimeError::Closed),
        Err(_) => Err(RuntimeError::Busy),
    }
}

/// Submit and wait for the turn to finish, successfully or not
pub async fn submit_and_settle(
    manager: &RuntimeManager,
    session_id: &str,
    text: &str,
    timeout: Duration,
) -> Result<SessionSnapshot, RuntimeError> {
    let (_, mut rx) = manager.subscribe(session_id).await?;
    manager.submit(session_id, text.to_string()).await?;
    wait_for(&mut rx, timeout, |e| {
        matches!(e, SseEvent::StateChange { state } if !state.is_awaiting_reply())
    })
    .await
    .ok_or(RuntimeError::Busy)?;
    manager.snapshot(session_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmErrorKind, Role};
    use crate::session::Origin;
    use crate::state_machine::TurnState;
    use crate::system_prompt::system_prompt;

    const TIMEOUT: Duration = Duration::from_secs(2);
    const PHARMACY: &str = "What time does the pharmacy at Les Halles close?";

    fn manager_with(llm: Arc<dyn LlmService>) -> RuntimeManager {
        RuntimeManager::new(llm)
    }

    #[tokio::test]
    async fn test_fresh_session_is_idle_and_empty() {
        let manager = manager_with(Arc::new(MockLlmClient::new("test-model")));
        let snapshot = manager.create_session().await;

        assert_eq!(snapshot.state, TurnState::Idle);
        assert_eq!(snapshot.turn_count, 0);
        assert!(snapshot.bubbles.is_empty());
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_single_turn_scenario() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_reply("The pharmacy closes at 20:00.");
        let manager = manager_with(llm.clone());

        let id = manager.create_session().await.id;
        let (_, mut rx) = manager.subscribe(&id).await.unwrap();

        assert!(manager.submit(&id, PHARMACY.to_string()).await.unwrap());

        let reply = wait_for(&mut rx, TIMEOUT, |e| matches!(e, SseEvent::Reply { .. }))
            .await
            .expect("reply event");
        let SseEvent::Reply { turn, bubbles } = reply else {
            unreachable!()
        };
        assert_eq!(turn, 0);
        assert_eq!(bubbles[0].origin, Origin::Assistant);
        assert_eq!(bubbles[0].text, "The pharmacy closes at 20:00.");
        assert_eq!(bubbles[1].origin, Origin::User);
        assert_eq!(bubbles[1].text, PHARMACY);

        // The model saw the system prompt and the question, nothing else
        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0],
            vec![Message::system(system_prompt()), Message::user(PHARMACY)]
        );

        let snapshot = wait_until_settled(&manager, &id, TIMEOUT).await.unwrap();
        assert_eq!(snapshot.turn_count, 1);
        assert_eq!(snapshot.bubbles[0].text, "The pharmacy closes at 20:00.");
        assert_eq!(snapshot.bubbles[1].text, PHARMACY);
    }

    #[tokio::test]
    async fn test_second_turn_carries_history() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_reply("a1");
        llm.queue_reply("a2");
        let manager = manager_with(llm.clone());
        let id = manager.create_session().await.id;

        submit_and_settle(&manager, &id, "u1", TIMEOUT).await.unwrap();
        let snapshot = submit_and_settle(&manager, &id, "u2", TIMEOUT).await.unwrap();

        let second = &llm.recorded_requests()[1];
        let roles: Vec<Role> = second.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(second[3].content, "u2");

        let texts: Vec<&str> = snapshot.bubbles.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["a2", "u2", "a1", "u1"]);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_input() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_reply("a1");
        llm.queue_error(LlmError::auth("Authentication failed: bad key"));
        let manager = manager_with(llm.clone());
        let id = manager.create_session().await.id;

        submit_and_settle(&manager, &id, "u1", TIMEOUT).await.unwrap();

        let (_, mut rx) = manager.subscribe(&id).await.unwrap();
        manager.submit(&id, "u2".to_string()).await.unwrap();

        let failed = wait_for(&mut rx, TIMEOUT, |e| matches!(e, SseEvent::TurnFailed { .. }))
            .await
            .expect("turn_failed event");
        let SseEvent::TurnFailed {
            kind,
            retryable,
            restored_input,
            ..
        } = failed
        else {
            unreachable!()
        };
        assert_eq!(kind, LlmErrorKind::Auth);
        assert!(!retryable);
        assert_eq!(restored_input.as_deref(), Some("u2"));

        let snapshot = wait_until_settled(&manager, &id, TIMEOUT).await.unwrap();
        assert!(matches!(snapshot.state, TurnState::Error { .. }));
        assert_eq!(snapshot.turn_count, 1);
        assert_eq!(snapshot.bubbles.len(), 2);
    }

    #[tokio::test]
    async fn test_recovers_after_failure() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_error(LlmError::server_error("Server error: overloaded"));
        llm.queue_reply("second try worked");
        let manager = manager_with(llm.clone());
        let id = manager.create_session().await.id;

        let snapshot = submit_and_settle(&manager, &id, "hello", TIMEOUT).await.unwrap();
        assert_eq!(snapshot.turn_count, 0);

        let snapshot = submit_and_settle(&manager, &id, "hello", TIMEOUT).await.unwrap();
        assert_eq!(snapshot.state, TurnState::Idle);
        assert_eq!(snapshot.turn_count, 1);

        // The failed attempt left nothing behind in the retried transcript
        let retried = &llm.recorded_requests()[1];
        assert_eq!(retried.len(), 2);
        assert_eq!(retried[1], Message::user("hello"));
    }

    #[tokio::test]
    async fn test_submit_while_awaiting_is_busy() {
        let llm = Arc::new(DelayedMockLlmClient::new(
            "test-model",
            Duration::from_millis(300),
        ));
        llm.queue_reply("slow answer");
        let manager = manager_with(llm.clone());
        let id = manager.create_session().await.id;

        let started = llm.request_started.clone();
        manager.submit(&id, "first".to_string()).await.unwrap();
        tokio::time::timeout(TIMEOUT, started.notified())
            .await
            .expect("request started");

        let err = manager.submit(&id, "second".to_string()).await.unwrap_err();
        assert_eq!(err, RuntimeError::Busy);

        let snapshot = wait_until_settled(&manager, &id, TIMEOUT).await.unwrap();
        assert_eq!(snapshot.turn_count, 1);
        assert_eq!(llm.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_submit_is_not_queued() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        let manager = manager_with(llm.clone());
        let id = manager.create_session().await.id;

        assert!(!manager.submit(&id, String::new()).await.unwrap());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_snapshots_are_idempotent() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_reply("only once");
        let manager = manager_with(llm.clone());
        let id = manager.create_session().await.id;

        submit_and_settle(&manager, &id, "ping", TIMEOUT).await.unwrap();

        let first = manager.snapshot(&id).await.unwrap();
        let second = manager.snapshot(&id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(llm.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_close_session_stops_runtime() {
        let manager = manager_with(Arc::new(MockLlmClient::new("test-model")));
        let id = manager.create_session().await.id;
        let (_, mut rx) = manager.subscribe(&id).await.unwrap();

        manager.close_session(&id).await.unwrap();

        assert!(wait_for(&mut rx, TIMEOUT, |e| matches!(e, SseEvent::Closed))
            .await
            .is_some());
        assert_eq!(
            manager.snapshot(&id).await.unwrap_err(),
            RuntimeError::NotFound(id.clone())
        );
        assert_eq!(
            manager.close_session(&id).await.unwrap_err(),
            RuntimeError::NotFound(id)
        );
    }

    #[tokio::test]
    async fn test_reply_after_close_is_dropped() {
        let llm = Arc::new(DelayedMockLlmClient::new(
            "test-model",
            Duration::from_millis(100),
        ));
        llm.queue_reply("too late");
        let manager = manager_with(llm.clone());
        let id = manager.create_session().await.id;

        manager.submit(&id, "question".to_string()).await.unwrap();
        manager.close_session(&id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_idle_expires_sessions() {
        let manager = manager_with(Arc::new(MockLlmClient::new("test-model")));
        manager.create_session().await;
        manager.create_session().await;

        assert_eq!(manager.sweep_idle(Duration::from_secs(3600)).await, 0);
        assert_eq!(manager.session_count().await, 2);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(manager.sweep_idle(Duration::from_millis(1)).await, 2);
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_keeps_session_awaiting_reply() {
        let llm = Arc::new(DelayedMockLlmClient::new(
            "test-model",
            Duration::from_millis(300),
        ));
        llm.queue_reply("eventually");
        let manager = manager_with(llm.clone());
        let id = manager.create_session().await.id;

        let started = llm.request_started.clone();
        manager.submit(&id, "wait for me".to_string()).await.unwrap();
        tokio::time::timeout(TIMEOUT, started.notified())
            .await
            .expect("request started");

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(manager.sweep_idle(Duration::from_millis(1)).await, 0);
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_keeps_session_with_open_stream() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_reply("The food court is on level 2.");
        let manager = manager_with(llm.clone());
        let id = manager.create_session().await.id;
        submit_and_settle(&manager, &id, "Where can I eat?", TIMEOUT)
            .await
            .unwrap();

        let (_, rx) = manager.subscribe(&id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(manager.sweep_idle(Duration::from_millis(1)).await, 0);
        assert_eq!(manager.snapshot(&id).await.unwrap().turn_count, 1);

        // Once the page disconnects the session can expire
        drop(rx);
        assert_eq!(manager.sweep_idle(Duration::from_millis(1)).await, 1);
        assert_eq!(
            manager.snapshot(&id).await.unwrap_err(),
            RuntimeError::NotFound(id.clone())
        );
    }

    #[tokio::test]
    async fn test_concurrent_submits_queue_only_one() {
        let llm = Arc::new(DelayedMockLlmClient::new(
            "test-model",
            Duration::from_millis(100),
        ));
        llm.queue_reply("only once");
        let manager = manager_with(llm.clone());
        let id = manager.create_session().await.id;

        let (first, second) = tokio::join!(
            manager.submit(&id, "first".to_string()),
            manager.submit(&id, "second".to_string()),
        );
        let results = [first, second];
        assert_eq!(results.iter().filter(|r| matches!(r, Ok(true))).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(RuntimeError::Busy)))
                .count(),
            1
        );

        let mut rx = manager.handle(&id).await.unwrap().snapshot_rx;
        let snapshot = tokio::time::timeout(TIMEOUT, rx.wait_for(|s| s.turn_count == 1))
            .await
            .unwrap()
            .unwrap()
            .clone();
        assert!(!snapshot.awaiting_reply);
        assert_eq!(llm.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_accepted_again_once_reply_lands() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_reply("one");
        llm.queue_reply("two");
        let manager = manager_with(llm.clone());
        let id = manager.create_session().await.id;

        submit_and_settle(&manager, &id, "first", TIMEOUT).await.unwrap();
        let snapshot = submit_and_settle(&manager, &id, "second", TIMEOUT)
            .await
            .unwrap();
        assert_eq!(snapshot.turn_count, 2);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_reply("for a");
        let manager = manager_with(llm.clone());
        let a = manager.create_session().await.id;
        let b = manager.create_session().await.id;

        submit_and_settle(&manager, &a, "from a", TIMEOUT).await.unwrap();

        assert_eq!(manager.snapshot(&a).await.unwrap().turn_count, 1);
        assert_eq!(manager.snapshot(&b).await.unwrap().turn_count, 0);
    }
}
