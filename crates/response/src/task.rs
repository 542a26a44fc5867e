//! The boundary to whatever executes deferred calls.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

pub type Headers = BTreeMap<String, String>;

/// Payload, status code and headers exactly as returned by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReply {
    pub payload: Option<Value>,
    pub code: u16,
    pub headers: Headers,
}

impl RawReply {
    pub fn new(payload: impl Into<Option<Value>>, code: u16, headers: Headers) -> Self {
        Self { payload: payload.into(), code, headers }
    }
}

/// What a finished task produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Reply(RawReply),
    /// Anything that is not a reply triple.
    Other(Value),
}

#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("task still running after {0:?}")]
    Timeout(Option<Duration>),

    #[error(transparent)]
    Failed(Arc<dyn StdError + Send + Sync>),

    #[error("task ended without producing a reply")]
    Abandoned,
}

/// Handle to a call running on an external worker pool.
pub trait TaskHandle: Send + Sync {
    fn ready(&self) -> bool;

    /// `None` while the task is still running.
    fn successful(&self) -> Option<bool>;

    /// Block until the task finishes or `timeout` elapses.
    fn wait(&self, timeout: Option<Duration>);

    /// Block for the outcome. `TaskError::Timeout` leaves the task running.
    fn get(&self, timeout: Option<Duration>) -> Result<Completion, TaskError>;
}

enum SlotState {
    Running,
    Done(Result<Completion, TaskError>),
}

struct Slot {
    state: Mutex<SlotState>,
    done: Condvar,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, SlotState> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }

    fn wait(&self, timeout: Option<Duration>) -> MutexGuard<'_, SlotState> {
        let guard = self.lock();
        let running = |s: &mut SlotState| matches!(s, SlotState::Running);
        match timeout {
            Some(t) => self.done.wait_timeout_while(guard, t, running).map(|(g, _)| g).unwrap_or_else(|e| e.into_inner().0),
            None => self.done.wait_while(guard, running).unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// Reply slot filled once by a [`ReplySender`].
#[derive(Clone)]
pub struct PendingReply {
    slot: Arc<Slot>,
}

/// Producer side of a [`PendingReply`]. Dropping it without sending fails
/// the task with [`TaskError::Abandoned`].
pub struct ReplySender {
    slot: Arc<Slot>,
    sent: bool,
}

/// A connected sender and pending reply.
pub fn pending() -> (ReplySender, PendingReply) {
    let slot = Arc::new(Slot { state: Mutex::new(SlotState::Running), done: Condvar::new() });
    (ReplySender { slot: Arc::clone(&slot), sent: false }, PendingReply { slot })
}

impl ReplySender {
    pub fn send(mut self, completion: Completion) { self.finish(Ok(completion)); }

    pub fn reply(self, reply: RawReply) { self.send(Completion::Reply(reply)); }

    pub fn fail<E>(mut self, err: E)
    where
        E: StdError + Send + Sync + 'static,
    {
        self.finish(Err(TaskError::Failed(Arc::new(err))));
    }

    fn finish(&mut self, outcome: Result<Completion, TaskError>) {
        let mut state = self.slot.lock();
        if matches!(*state, SlotState::Running) {
            *state = SlotState::Done(outcome);
        }
        self.sent = true;
        drop(state);
        self.slot.done.notify_all();
    }
}

impl Drop for ReplySender {
    fn drop(&mut self) {
        if !self.sent {
            self.finish(Err(TaskError::Abandoned));
        }
    }
}

impl TaskHandle for PendingReply {
    fn ready(&self) -> bool { matches!(*self.slot.lock(), SlotState::Done(_)) }

    fn successful(&self) -> Option<bool> {
        match &*self.slot.lock() {
            SlotState::Running => None,
            SlotState::Done(r) => Some(r.is_ok()),
        }
    }

    fn wait(&self, timeout: Option<Duration>) { drop(self.slot.wait(timeout)); }

    fn get(&self, timeout: Option<Duration>) -> Result<Completion, TaskError> {
        match &*self.slot.wait(timeout) {
            SlotState::Running => Err(TaskError::Timeout(timeout)),
            SlotState::Done(r) => r.clone(),
        }
    }
}

/// Run a blocking transport call on the tokio blocking pool.
///
/// A panic inside `call` drops the sender and surfaces as
/// [`TaskError::Abandoned`].
pub fn spawn_blocking_call<F, E>(runtime: &tokio::runtime::Handle, call: F) -> PendingReply
where
    F: FnOnce() -> Result<RawReply, E> + Send + 'static,
    E: StdError + Send + Sync + 'static,
{
    let (tx, rx) = pending();
    runtime.spawn_blocking(move || match call() {
        Ok(reply) => tx.reply(reply),
        Err(e) => tx.fail(e),
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn sender_fills_the_slot_once() {
        let (tx, rx) = pending();
        assert!(!rx.ready());
        assert_eq!(rx.successful(), None);
        assert!(matches!(rx.get(Some(Duration::from_millis(5))), Err(TaskError::Timeout(_))));

        tx.reply(RawReply::new(None, 204, Headers::new()));
        assert!(rx.ready());
        assert_eq!(rx.successful(), Some(true));
        let c = rx.get(None).unwrap();
        assert_eq!(c, Completion::Reply(RawReply::new(None, 204, Headers::new())));
        // still there on a second read
        assert!(rx.get(Some(Duration::ZERO)).is_ok());
    }

    #[test]
    fn dropped_sender_fails_the_task() {
        let (tx, rx) = pending();
        let waiter = {
            let rx = rx.clone();
            std::thread::spawn(move || rx.get(None))
        };
        std::thread::sleep(Duration::from_millis(10));
        drop(tx);
        assert!(matches!(waiter.join().unwrap(), Err(TaskError::Abandoned)));
        assert_eq!(rx.successful(), Some(false));
    }

    #[test]
    fn wait_respects_the_timeout() {
        let (_tx, rx) = pending();
        let started = Instant::now();
        rx.wait(Some(Duration::from_millis(20)));
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert!(!rx.ready());
    }
}
