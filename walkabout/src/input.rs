use std::time::{Duration, Instant};

/// A movement key, after mapping from whatever the front end reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    const ALL: [Key; 4] = [Key::Up, Key::Down, Key::Left, Key::Right];

    /// Map a DOM-style key name (`"w"`, `"ArrowUp"`, ...) to a movement key.
    pub fn from_name(name: &str) -> Option<Key> {
        match name {
            "w" | "ArrowUp" => Some(Key::Up),
            "s" | "ArrowDown" => Some(Key::Down),
            "a" | "ArrowLeft" => Some(Key::Left),
            "d" | "ArrowRight" => Some(Key::Right),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Which movement keys are currently held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl InputState {
    pub fn set(&mut self, key: Key, held: bool) {
        match key {
            Key::Up => self.up = held,
            Key::Down => self.down = held,
            Key::Left => self.left = held,
            Key::Right => self.right = held,
        }
    }

    /// Raw intended direction: each axis is -1, 0 or 1.
    pub fn direction(&self) -> (f64, f64) {
        let mut dx = 0.0;
        let mut dy = 0.0;
        if self.up {
            dy -= 1.0;
        }
        if self.down {
            dy += 1.0;
        }
        if self.left {
            dx -= 1.0;
        }
        if self.right {
            dx += 1.0;
        }
        (dx, dy)
    }
}

/// How the front end reports key releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMode {
    /// Release events arrive; a key is held from press to release.
    Reported,
    /// No release events. A key counts as held for this long after its last
    /// press or auto-repeat.
    HoldWindow(Duration),
}

/// Turns key press/release events into an [`InputState`] per frame.
#[derive(Debug, Clone)]
pub struct KeyTracker {
    mode: ReleaseMode,
    held: [Option<Instant>; 4],
}

impl KeyTracker {
    pub fn new(mode: ReleaseMode) -> Self {
        Self {
            mode,
            held: [None; 4],
        }
    }

    /// Record a press (or auto-repeat) of `key` at `now`.
    pub fn press(&mut self, key: Key, now: Instant) {
        self.held[key.index()] = Some(now);
    }

    pub fn release(&mut self, key: Key) {
        self.held[key.index()] = None;
    }

    pub fn release_all(&mut self) {
        self.held = [None; 4];
    }

    /// Keys held as of `now`.
    pub fn state(&self, now: Instant) -> InputState {
        let mut state = InputState::default();
        for key in Key::ALL {
            let held = match (self.mode, self.held[key.index()]) {
                (_, None) => false,
                (ReleaseMode::Reported, Some(_)) => true,
                (ReleaseMode::HoldWindow(window), Some(at)) => now.saturating_duration_since(at) < window,
            };
            state.set(key, held);
        }
        state
    }
}
