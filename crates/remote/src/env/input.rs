use std::collections::HashSet;

use crate::glfw;
use crate::net::{InputEvent, InputId};

/// Tracks which keys and mouse buttons Minecraft currently holds down and
/// converts per-step "held / not held" snapshots into the press/release edge
/// events the game expects. Consecutive identical snapshots produce no new
/// events, so press-and-hold is free.
#[derive(Debug, Default)]
pub struct InputStateManager {
    pressed_set: HashSet<InputId>,
}

impl InputStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The set of inputs currently believed to be held down.
    pub fn pressed_set(&self) -> &HashSet<InputId> {
        &self.pressed_set
    }

    /// Return the edge events to send to Minecraft for this step and update
    /// the held set. An input in both sets stays down.
    pub fn update(
        &mut self,
        pressed: &HashSet<InputId>,
        released: &HashSet<InputId>,
    ) -> Vec<InputEvent> {
        let mut events = Vec::new();

        let new_presses: Vec<InputId> = pressed.difference(&self.pressed_set).copied().collect();
        for id in &new_presses {
            events.push(InputEvent::from_id(*id, glfw::PRESS));
        }

        let new_releases: Vec<InputId> = self
            .pressed_set
            .intersection(released)
            .copied()
            .collect();
        for id in &new_releases {
            events.push(InputEvent::from_id(*id, glfw::RELEASE));
        }

        self.pressed_set.extend(new_presses);
        for id in &new_releases {
            self.pressed_set.remove(id);
        }

        events
    }

    /// Convenience over [`update`](Self::update): partition a whole action's
    /// `(name, held)` pairs through `input_map`, treating any name missing
    /// from the map as a non-input field.
    pub fn process_action<'a>(
        &mut self,
        action: impl IntoIterator<Item = (&'a str, bool)>,
        input_map: &[(&str, InputId)],
    ) -> Vec<InputEvent> {
        let mut pressed = HashSet::new();
        let mut released = HashSet::new();
        for (name, held) in action {
            let Some((_, id)) = input_map.iter().find(|(key, _)| *key == name) else {
                continue;
            };
            if held {
                pressed.insert(*id);
            } else {
                released.insert(*id);
            }
        }
        self.update(&pressed, &released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::InputType;

    const W: InputId = InputId::new(InputType::Key, glfw::KEY_W);
    const A: InputId = InputId::new(InputType::Key, glfw::KEY_A);

    fn snapshot(held: &[InputId], released: &[InputId]) -> (HashSet<InputId>, HashSet<InputId>) {
        (
            held.iter().copied().collect(),
            released.iter().copied().collect(),
        )
    }

    #[test]
    fn test_edge_emission_sequence() {
        let mut mgr = InputStateManager::new();

        let (p, r) = snapshot(&[W], &[A]);
        let events = mgr.update(&p, &r);
        assert_eq!(events, vec![InputEvent::from_id(W, glfw::PRESS)]);

        // Held again: no new events.
        let (p, r) = snapshot(&[W], &[A]);
        assert!(mgr.update(&p, &r).is_empty());

        let (p, r) = snapshot(&[W, A], &[]);
        let events = mgr.update(&p, &r);
        assert_eq!(events, vec![InputEvent::from_id(A, glfw::PRESS)]);

        let (p, r) = snapshot(&[A], &[W]);
        let events = mgr.update(&p, &r);
        assert_eq!(events, vec![InputEvent::from_id(W, glfw::RELEASE)]);

        let (p, r) = snapshot(&[], &[W, A]);
        let events = mgr.update(&p, &r);
        assert_eq!(events, vec![InputEvent::from_id(A, glfw::RELEASE)]);

        assert!(mgr.pressed_set().is_empty());
    }

    #[test]
    fn test_pressed_wins_over_released() {
        let mut mgr = InputStateManager::new();
        let (p, r) = snapshot(&[W], &[W]);
        let events = mgr.update(&p, &r);
        assert_eq!(events, vec![InputEvent::from_id(W, glfw::PRESS)]);
        assert!(mgr.pressed_set().contains(&W));
    }

    #[test]
    fn test_release_without_press_is_silent() {
        let mut mgr = InputStateManager::new();
        let (p, r) = snapshot(&[], &[W]);
        assert!(mgr.update(&p, &r).is_empty());
    }

    #[test]
    fn test_process_action_ignores_unmapped_names() {
        let map = [("W", W), ("A", A)];
        let mut mgr = InputStateManager::new();
        let events = mgr.process_action(
            [("W", true), ("A", false), ("camera", true)],
            &map,
        );
        assert_eq!(events, vec![InputEvent::from_id(W, glfw::PRESS)]);
    }

    #[test]
    fn test_pressed_set_matches_event_balance() {
        let mut mgr = InputStateManager::new();
        let mut balance: std::collections::HashMap<InputId, i32> = Default::default();
        let steps: [(&[InputId], &[InputId]); 4] =
            [(&[W], &[A]), (&[W, A], &[]), (&[], &[W, A]), (&[A], &[W])];
        for (held, rel) in steps {
            let (p, r) = snapshot(held, rel);
            for event in mgr.update(&p, &r) {
                *balance.entry(event.id()).or_default() +=
                    if event.action == glfw::PRESS { 1 } else { -1 };
            }
            let held_now: HashSet<InputId> = balance
                .iter()
                .filter(|(_, n)| **n > 0)
                .map(|(id, _)| *id)
                .collect();
            assert_eq!(&held_now, mgr.pressed_set());
        }
    }
}
