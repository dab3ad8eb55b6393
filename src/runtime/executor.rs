//! Session runtime executor

use super::{SessionSnapshot, SseEvent};
use crate::llm::LlmService;
use crate::session::{Bubble, Origin, Session};
use crate::state_machine::{transition, Effect, Event, TransitionError, TurnState};
use crate::transcript::build_transcript;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Event loop owning one session and its turn state
pub struct SessionRuntime {
    session: Session,
    state: TurnState,
    llm: Arc<dyn LlmService>,
    event_rx: mpsc::Receiver<Event>,
    /// Used by completion tasks to post their result; weak so that
    /// dropping the last handle ends the loop
    event_tx: mpsc::WeakSender<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    in_flight: Arc<AtomicBool>,
}

impl SessionRuntime {
    pub fn new(
        session: Session,
        llm: Arc<dyn LlmService>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::WeakSender<Event>,
        broadcast_tx: broadcast::Sender<SseEvent>,
        snapshot_tx: watch::Sender<SessionSnapshot>,
        in_flight: Arc<AtomicBool>,
    ) -> Self {
        Self {
            session,
            state: TurnState::Idle,
            llm,
            event_rx,
            event_tx,
            broadcast_tx,
            snapshot_tx,
            in_flight,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.session.id, "Starting session runtime");

        while let Some(event) = self.event_rx.recv().await {
            if let Err(e) = self.process_event(event) {
                match e {
                    TransitionError::Busy => {
                        let _ = self.broadcast_tx.send(SseEvent::Error {
                            message: e.to_string(),
                        });
                    }
                    TransitionError::InvalidTransition(_) => {
                        tracing::warn!(session_id = %self.session.id, error = %e, "Dropping event");
                    }
                }
            }
        }

        let _ = self.broadcast_tx.send(SseEvent::Closed);
        tracing::info!(session_id = %self.session.id, "Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        tracing::debug!(
            session_id = %self.session.id,
            event = event.name(),
            state = self.state.name(),
            "Processing event"
        );

        // Pure state transition
        let result = transition(&self.state, event)?;
        self.state = result.new_state;
        // Released before any notification so woken readers can submit again
        self.in_flight
            .store(self.state.is_awaiting_reply(), Ordering::Release);

        for effect in result.effects {
            self.execute_effect(effect);
        }

        self.publish_snapshot();
        Ok(())
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx
            .send_replace(SessionSnapshot::capture(&self.session, &self.state));
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::StageInput { text } => {
                self.session.stage_input(text);
            }

            Effect::BeginTurn => {
                if let Some(input) = self.session.take_pending() {
                    self.session.begin_turn(input);
                }
            }

            Effect::RequestCompletion => {
                self.dispatch_completion();
            }

            Effect::CompleteTurn { text, usage } => {
                self.session.complete_turn(text);
                debug_assert!(self.session.is_balanced());
                let turn = self.session.turn_count() - 1;
                tracing::info!(
                    session_id = %self.session.id,
                    turn,
                    total_tokens = usage.total(),
                    "Turn completed"
                );
                let _ = self.broadcast_tx.send(SseEvent::Reply {
                    turn,
                    bubbles: self.turn_bubbles(turn),
                });
            }

            Effect::RollbackTurn { message, kind } => {
                let restored_input = self.session.rollback_turn();
                debug_assert!(self.session.is_balanced());
                tracing::warn!(
                    session_id = %self.session.id,
                    kind = %kind,
                    error = %message,
                    rolled_back = restored_input.is_some(),
                    "Turn failed"
                );
                let _ = self.broadcast_tx.send(SseEvent::TurnFailed {
                    message,
                    kind,
                    retryable: kind.is_retryable(),
                    restored_input,
                });
            }

            Effect::NotifyStateChange => {
                // Readers woken by this event must see the new snapshot
                self.publish_snapshot();
                let _ = self.broadcast_tx.send(SseEvent::StateChange {
                    state: self.state.clone(),
                });
            }
        }
    }

    /// Send the transcript without blocking the event loop.
    ///
    /// The result comes back as `ReplyReceived` or `ReplyFailed`.
    fn dispatch_completion(&self) {
        let transcript = build_transcript(&self.session);
        let llm = self.llm.clone();
        let event_tx = self.event_tx.clone();
        let session_id = self.session.id.clone();

        tokio::spawn(async move {
            let event = match llm.complete(&transcript).await {
                Ok(completion) => Event::ReplyReceived {
                    text: completion.text,
                    usage: completion.usage,
                },
                Err(error) => Event::ReplyFailed { error },
            };

            let Some(tx) = event_tx.upgrade() else {
                tracing::debug!(session_id = %session_id, "Session closed before reply arrived");
                return;
            };
            if tx.send(event).await.is_err() {
                tracing::debug!(session_id = %session_id, "Session closed before reply arrived");
            }
        });
    }

    /// Bubbles for one completed turn, assistant first
    fn turn_bubbles(&self, turn: usize) -> Vec<Bubble> {
        vec![
            Bubble {
                key: turn.to_string(),
                origin: Origin::Assistant,
                text: self.session.generated_outputs[turn].clone(),
            },
            Bubble {
                key: format!("{turn}_user"),
                origin: Origin::User,
                text: self.session.past_inputs[turn].clone(),
            },
        ]
    }
}
