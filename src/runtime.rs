//! Runtime for executing sessions
//!
//! Every connected client gets its own session task. The manager owns the
//! handles and is the only place sessions are created or destroyed.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;

use crate::llm::{LlmErrorKind, LlmService};
use crate::session::{Bubble, Session};
use crate::state_machine::{Event, TurnState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, RwLock};

/// Errors surfaced to API callers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Assistant is still replying, wait for the current answer")]
    Busy,
    #[error("Session is shutting down")]
    Closed,
}

/// Read-only view of a session, republished after every event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub state: TurnState,
    pub awaiting_reply: bool,
    pub turn_count: usize,
    /// Newest turn first, assistant bubble above user bubble
    pub bubbles: Vec<Bubble>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn capture(session: &Session, state: &TurnState) -> Self {
        Self {
            id: session.id.clone(),
            state: state.clone(),
            awaiting_reply: state.is_awaiting_reply(),
            turn_count: session.turn_count(),
            bubbles: session.bubbles_newest_first(),
            created_at: session.created_at,
            last_active: session.last_active,
        }
    }
}

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init {
        snapshot: SessionSnapshot,
    },
    /// A turn completed; bubbles are the new assistant/user pair
    Reply {
        turn: usize,
        bubbles: Vec<Bubble>,
    },
    /// A turn failed and its input was rolled back
    TurnFailed {
        message: String,
        kind: LlmErrorKind,
        retryable: bool,
        restored_input: Option<String>,
    },
    StateChange {
        state: TurnState,
    },
    Error {
        message: String,
    },
    Closed,
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<SseEvent>,
    pub snapshot_rx: watch::Receiver<SessionSnapshot>,
    /// Set by `submit` when it queues a turn, cleared by the runtime once
    /// the session leaves `AwaitingReply`
    pub in_flight: Arc<AtomicBool>,
}

/// Manager for all session runtimes
pub struct RuntimeManager {
    llm: Arc<dyn LlmService>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl RuntimeManager {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self {
            llm,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session and start its runtime
    pub async fn create_session(&self) -> SessionSnapshot {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Session::new(&id);
        let initial = SessionSnapshot::capture(&session, &TurnState::Idle);

        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let (snapshot_tx, snapshot_rx) = watch::channel(initial.clone());
        let in_flight = Arc::new(AtomicBool::new(false));

        let runtime = SessionRuntime::new(
            session,
            self.llm.clone(),
            event_rx,
            event_tx.downgrade(),
            broadcast_tx.clone(),
            snapshot_tx,
            in_flight.clone(),
        );

        let session_id = id.clone();
        tokio::spawn(async move {
            runtime.run().await;
            tracing::info!(session_id = %session_id, "Session runtime finished");
        });

        self.sessions.write().await.insert(
            id.clone(),
            SessionHandle {
                event_tx,
                broadcast_tx,
                snapshot_rx,
                in_flight,
            },
        );

        tracing::info!(session_id = %id, "Session created");
        initial
    }

    /// Get the handle for a live session
    pub async fn handle(&self, session_id: &str) -> Result<SessionHandle, RuntimeError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(session_id.to_string()))
    }

    /// Submit user input. Returns whether a turn was queued.
    ///
    /// Rejects while a reply is outstanding. The in-flight flag is claimed
    /// before the event is queued, so of two racing submits only one wins.
    pub async fn submit(&self, session_id: &str, text: String) -> Result<bool, RuntimeError> {
        let handle = self.handle(session_id).await?;
        if text.is_empty() {
            return if handle.in_flight.load(Ordering::Acquire) {
                Err(RuntimeError::Busy)
            } else {
                Ok(false)
            };
        }
        if handle
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RuntimeError::Busy);
        }
        if handle.event_tx.send(Event::submit(text)).await.is_err() {
            handle.in_flight.store(false, Ordering::Release);
            return Err(RuntimeError::Closed);
        }
        Ok(true)
    }

    /// Current snapshot of a session
    pub async fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, RuntimeError> {
        let handle = self.handle(session_id).await?;
        let snapshot = handle.snapshot_rx.borrow().clone();
        Ok(snapshot)
    }

    /// Subscribe to session updates.
    ///
    /// The snapshot is taken after subscribing so no event falls between them.
    pub async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<(SessionSnapshot, broadcast::Receiver<SseEvent>), RuntimeError> {
        let handle = self.handle(session_id).await?;
        let rx = handle.broadcast_tx.subscribe();
        let snapshot = handle.snapshot_rx.borrow().clone();
        Ok((snapshot, rx))
    }

    /// Destroy a session. Its runtime stops once the event channel drains.
    pub async fn close_session(&self, session_id: &str) -> Result<(), RuntimeError> {
        let removed = self.sessions.write().await.remove(session_id);
        match removed {
            Some(_) => {
                tracing::info!(session_id = %session_id, "Session closed");
                Ok(())
            }
            None => Err(RuntimeError::NotFound(session_id.to_string())),
        }
    }

    /// Drop sessions idle for longer than `max_idle`. Returns how many.
    ///
    /// Sessions with a reply in flight or a connected stream are kept.
    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            return 0;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(max_idle) else {
            return 0;
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| {
            if handle.in_flight.load(Ordering::Acquire)
                || handle.broadcast_tx.receiver_count() > 0
            {
                return true;
            }
            let snapshot = handle.snapshot_rx.borrow();
            snapshot.awaiting_reply || snapshot.last_active >= cutoff
        });
        let removed = before - sessions.len();
        drop(sessions);

        if removed > 0 {
            tracing::info!(removed, "Expired idle sessions");
        }
        removed
    }

    /// Start the background task that expires idle sessions
    pub fn start_sweeper(self: &Arc<Self>, every: Duration, max_idle: Duration) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = manager.sweep_idle(max_idle).await;
                let live = manager.session_count().await;
                tracing::debug!(removed, live, "Idle sweep");
            }
        });
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Model identifier of the completion backend
    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }
}
