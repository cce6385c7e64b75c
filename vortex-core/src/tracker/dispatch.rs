//! Dispatch policy
//!
//! | liveness | auto-batching | track     | batched track |
//! |----------|---------------|-----------|---------------|
//! | unknown  | any           | enqueue   | drop          |
//! | dead     | any           | drop      | drop          |
//! | alive    | on            | enqueue   | enqueue       |
//! | alive    | off           | send now  | enqueue       |
//!
//! Before the first probe resolves, track calls are buffered so nothing is
//! lost if the collector turns out to be reachable. Manual batching requires
//! a confirmed live collector.

use super::liveness::Liveness;

/// What to do with a freshly tracked event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Fire-and-forget `POST /track`
    SendNow,
    /// Append to a queue for a later flush
    Enqueue,
    /// Discard
    Drop,
}

/// Decision for `track_event`
pub fn track_action(liveness: Liveness, auto_batching: bool) -> Action {
    match liveness {
        Liveness::Unknown => Action::Enqueue,
        Liveness::Dead => Action::Drop,
        Liveness::Alive if auto_batching => Action::Enqueue,
        Liveness::Alive => Action::SendNow,
    }
}

/// Decision for `batched_track_event`
pub fn batched_track_action(liveness: Liveness) -> Action {
    match liveness {
        Liveness::Alive => Action::Enqueue,
        Liveness::Unknown | Liveness::Dead => Action::Drop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_table() {
        assert_eq!(track_action(Liveness::Unknown, false), Action::Enqueue);
        assert_eq!(track_action(Liveness::Unknown, true), Action::Enqueue);
        assert_eq!(track_action(Liveness::Dead, false), Action::Drop);
        assert_eq!(track_action(Liveness::Dead, true), Action::Drop);
        assert_eq!(track_action(Liveness::Alive, true), Action::Enqueue);
        assert_eq!(track_action(Liveness::Alive, false), Action::SendNow);
    }

    #[test]
    fn test_batched_track_table() {
        assert_eq!(batched_track_action(Liveness::Unknown), Action::Drop);
        assert_eq!(batched_track_action(Liveness::Dead), Action::Drop);
        assert_eq!(batched_track_action(Liveness::Alive), Action::Enqueue);
    }
}
