/// Keyboard input collector.
///
/// Every Press (and, with keyboard enhancement, Repeat) event is kept in
/// arrival order for one frame. Grid moves are discrete, so there is no
/// "held" state: holding a key relies on the terminal's auto-repeat.
/// Release events are ignored.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

pub struct InputState {
    /// Key presses from the most recent drain_events(), oldest first.
    presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for modifier checks.
    pub raw_events: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events.
    /// Call this once per frame, before simulation tick.
    pub fn drain_events(&mut self) {
        self.presses.clear();
        self.raw_events.clear();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key);
            }
        }
    }

    fn record(&mut self, key: KeyEvent) {
        self.raw_events.push(key);
        if key.kind != KeyEventKind::Release {
            self.presses.push(key.code);
        }
    }

    /// Presses this frame, oldest first.
    pub fn presses(&self) -> &[KeyCode] {
        &self.presses
    }

    /// Was this key pressed this frame?
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.presses.contains(&code)
    }

    /// Convenience: was any of these keys pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent { code, modifiers, kind, state: KeyEventState::NONE }
    }

    #[test]
    fn presses_keep_arrival_order_and_skip_releases() {
        let mut kb = InputState::new();
        kb.record(key(KeyCode::Right, KeyEventKind::Press, KeyModifiers::NONE));
        kb.record(key(KeyCode::Right, KeyEventKind::Release, KeyModifiers::NONE));
        kb.record(key(KeyCode::Up, KeyEventKind::Repeat, KeyModifiers::NONE));
        assert_eq!(kb.presses(), &[KeyCode::Right, KeyCode::Up]);
        assert!(kb.any_pressed(&[KeyCode::Left, KeyCode::Up]));
        assert!(!kb.was_pressed(KeyCode::Down));
    }

    #[test]
    fn ctrl_c_needs_the_modifier() {
        let mut kb = InputState::new();
        kb.record(key(KeyCode::Char('c'), KeyEventKind::Press, KeyModifiers::NONE));
        assert!(!kb.ctrl_c_pressed());
        kb.record(key(KeyCode::Char('c'), KeyEventKind::Press, KeyModifiers::CONTROL));
        assert!(kb.ctrl_c_pressed());
    }
}
