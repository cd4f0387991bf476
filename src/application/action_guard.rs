// In-progress tag for long-running actions (dispatch, siren, recording)
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const IN_PROGRESS: u8 = 1;
const DONE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Idle,
    InProgress,
    Done,
}

#[derive(Debug, Default)]
pub struct ActionGuard {
    state: AtomicU8,
}

impl ActionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ActionState {
        match self.state.load(Ordering::Acquire) {
            IN_PROGRESS => ActionState::InProgress,
            DONE => ActionState::Done,
            _ => ActionState::Idle,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.state() == ActionState::InProgress
    }

    /// Move to `InProgress` unless another instance already is
    pub fn try_start(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current == IN_PROGRESS {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                IN_PROGRESS,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn finish(&self) {
        self.state.store(DONE, Ordering::Release);
    }

    pub fn reset(&self) {
        self.state.store(IDLE, Ordering::Release);
    }

    /// Scoped start: the ticket finishes the action, or resets it if dropped early
    pub fn begin(&self) -> Option<ActionTicket<'_>> {
        self.try_start().then_some(ActionTicket {
            guard: self,
            finished: false,
        })
    }
}

pub struct ActionTicket<'a> {
    guard: &'a ActionGuard,
    finished: bool,
}

impl ActionTicket<'_> {
    pub fn complete(mut self) {
        self.finished = true;
        self.guard.finish();
    }
}

impl Drop for ActionTicket<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.guard.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_start_rejected() {
        let guard = ActionGuard::new();
        assert!(guard.try_start());
        assert!(!guard.try_start());
        guard.finish();
        assert_eq!(guard.state(), ActionState::Done);
        assert!(guard.try_start());
    }

    #[test]
    fn test_ticket_lifecycle() {
        let guard = ActionGuard::new();
        {
            let ticket = guard.begin().unwrap();
            assert!(guard.begin().is_none());
            ticket.complete();
        }
        assert_eq!(guard.state(), ActionState::Done);

        {
            let _abandoned = guard.begin().unwrap();
        }
        assert_eq!(guard.state(), ActionState::Idle);
    }
}
