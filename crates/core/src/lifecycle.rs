//! Explicit state × event transition tables shared by sequence and campaign
//! lifecycles.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::{NectarError, NectarResult};

/// One allowed edge of a lifecycle: applying `event` in state `from` yields `to`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition<S, E> {
    pub from: S,
    pub event: E,
    pub to: S,
}

/// Finite set of valid transitions. Anything not listed is rejected.
#[derive(Debug, Clone)]
pub struct TransitionTable<S, E> {
    transitions: Vec<StateTransition<S, E>>,
}

impl<S, E> TransitionTable<S, E>
where
    S: Copy + PartialEq + Debug,
    E: Copy + PartialEq + Debug,
{
    pub fn new(edges: &[(S, E, S)]) -> Self {
        Self {
            transitions: edges
                .iter()
                .map(|&(from, event, to)| StateTransition { from, event, to })
                .collect(),
        }
    }

    /// Target state for `event` in `from`, if the edge exists.
    pub fn next(&self, from: S, event: E) -> Option<S> {
        self.transitions
            .iter()
            .find(|t| t.from == from && t.event == event)
            .map(|t| t.to)
    }

    /// Like [`TransitionTable::next`], but reports a rejected edge as an error.
    pub fn apply(&self, from: S, event: E) -> NectarResult<S> {
        self.next(from, event)
            .ok_or_else(|| NectarError::invalid_event(from, event))
    }

    /// The event that moves `from` to `to`, if any.
    pub fn event_between(&self, from: S, to: S) -> Option<E> {
        self.transitions
            .iter()
            .find(|t| t.from == from && t.to == to)
            .map(|t| t.event)
    }

    pub fn can_transition(&self, from: S, to: S) -> bool {
        self.event_between(from, to).is_some()
    }

    /// Events accepted in state `from`, in table order.
    pub fn events_from(&self, from: S) -> Vec<E> {
        self.transitions
            .iter()
            .filter(|t| t.from == from)
            .map(|t| t.event)
            .collect()
    }

    pub fn is_terminal(&self, state: S) -> bool {
        !self.transitions.iter().any(|t| t.from == state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Light {
        Off,
        On,
        Broken,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Switch {
        Flip,
        Smash,
    }

    fn table() -> TransitionTable<Light, Switch> {
        TransitionTable::new(&[
            (Light::Off, Switch::Flip, Light::On),
            (Light::On, Switch::Flip, Light::Off),
            (Light::On, Switch::Smash, Light::Broken),
        ])
    }

    #[test]
    fn test_apply_listed_edge() {
        assert_eq!(table().apply(Light::Off, Switch::Flip).unwrap(), Light::On);
    }

    #[test]
    fn test_unlisted_edge_rejected() {
        let err = table().apply(Light::Off, Switch::Smash).unwrap_err();
        assert!(matches!(err, NectarError::InvalidEvent { .. }));
        assert_eq!(err.to_string(), "Event Smash is not allowed in status Off");
    }

    #[test]
    fn test_terminal_and_events() {
        let t = table();
        assert!(t.is_terminal(Light::Broken));
        assert!(!t.is_terminal(Light::On));
        assert_eq!(t.events_from(Light::On), vec![Switch::Flip, Switch::Smash]);
        assert_eq!(t.event_between(Light::On, Light::Broken), Some(Switch::Smash));
        assert!(!t.can_transition(Light::Broken, Light::On));
    }
}
