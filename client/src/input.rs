//! Directional key state and edge-triggered keyboard polling

use log::debug;
use macroquad::prelude::{is_key_down, KeyCode};
use shared::Direction;

/// Held flags for the four directions plus the most recently pressed one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    held: [bool; 4],
    active: Option<Direction>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, direction: Direction) {
        self.held[direction.index()] = true;
        self.active = Some(direction);
    }

    /// Releasing a key never changes the active direction.
    pub fn key_up(&mut self, direction: Direction) {
        self.held[direction.index()] = false;
    }

    /// Drops every held flag, e.g. after the window lost focus.
    pub fn clear(&mut self) {
        self.held = [false; 4];
    }

    pub fn is_held(&self, direction: Direction) -> bool {
        self.held[direction.index()]
    }

    pub fn active(&self) -> Option<Direction> {
        self.active
    }

    /// The direction to move in this frame: active and still held.
    pub fn moving_direction(&self) -> Option<Direction> {
        self.active.filter(|direction| self.is_held(*direction))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down(Direction),
    Up(Direction),
}

/// Physical keys bound to each logical direction.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: Vec<(KeyCode, Direction)>,
}

impl KeyBindings {
    pub fn new(bindings: Vec<(KeyCode, Direction)>) -> Self {
        Self { bindings }
    }

    pub fn direction_of(&self, key: KeyCode) -> Option<Direction> {
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == key)
            .map(|(_, direction)| *direction)
    }

    fn keys(&self) -> impl Iterator<Item = (KeyCode, Direction)> + '_ {
        self.bindings.iter().copied()
    }
}

impl Default for KeyBindings {
    /// ZQSD, WASD and the arrow keys.
    fn default() -> Self {
        Self::new(vec![
            (KeyCode::Z, Direction::Up),
            (KeyCode::W, Direction::Up),
            (KeyCode::Up, Direction::Up),
            (KeyCode::S, Direction::Down),
            (KeyCode::Down, Direction::Down),
            (KeyCode::Q, Direction::Left),
            (KeyCode::A, Direction::Left),
            (KeyCode::Left, Direction::Left),
            (KeyCode::D, Direction::Right),
            (KeyCode::Right, Direction::Right),
        ])
    }
}

/// Turns sampled keyboard state into key-down/key-up events per direction
pub struct InputManager {
    bindings: KeyBindings,
    // Previous frame direction states for edge detection
    prev_down: [bool; 4],
    attached: bool,
}

impl InputManager {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            prev_down: [false; 4],
            attached: true,
        }
    }

    /// Samples the keyboard and applies the resulting events to `state`
    pub fn poll(&mut self, state: &mut InputState) {
        for event in self.edges(is_key_down) {
            match event {
                KeyEvent::Down(direction) => state.key_down(direction),
                KeyEvent::Up(direction) => state.key_up(direction),
            }
        }
    }

    /// Compares the sampled key state with the previous frame. A direction
    /// is released only once none of its keys is down.
    pub fn edges(&mut self, mut key_down: impl FnMut(KeyCode) -> bool) -> Vec<KeyEvent> {
        if !self.attached {
            return Vec::new();
        }

        let mut down = [false; 4];
        for (key, direction) in self.bindings.keys() {
            if key_down(key) {
                down[direction.index()] = true;
            }
        }

        let mut events = Vec::new();
        for direction in Direction::ALL {
            let now = down[direction.index()];
            let before = self.prev_down[direction.index()];
            if now && !before {
                events.push(KeyEvent::Down(direction));
            } else if !now && before {
                events.push(KeyEvent::Up(direction));
            }
        }

        // Releases first, so a press in the same frame becomes active
        events.sort_by_key(|event| matches!(event, KeyEvent::Down(_)));
        self.prev_down = down;
        events
    }

    /// Stops polling and forgets every held key.
    pub fn detach(&mut self, state: &mut InputState) {
        if self.attached {
            debug!("Input manager detached");
        }
        self.attached = false;
        self.prev_down = [false; 4];
        state.clear();
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}
