use crate::render::Color;

/// Playable area, in world units. The origin is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct World {
    pub width: f64,
    pub height: f64,
}

impl Default for World {
    fn default() -> Self {
        Self {
            width: 3000.0,
            height: 2000.0,
        }
    }
}

impl World {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Clamp a point so a circle of `radius` around it stays inside the world.
    ///
    /// A world narrower than the circle pins the point to `radius`.
    pub fn clamp(&self, x: f64, y: f64, radius: f64) -> (f64, f64) {
        // f64::clamp panics when min > max, so apply the bounds one at a time
        let x = x.min(self.width - radius).max(radius);
        let y = y.min(self.height - radius).max(radius);
        (x, y)
    }
}

/// The locally controlled player.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
    pub color: Color,
    /// Units per second.
    pub speed: f64,
}

impl Player {
    pub const RADIUS: f64 = 14.0;
    pub const SPEED: f64 = 280.0;
    pub const COLOR: Color = Color::rgb(0x44, 0xee, 0xee);

    /// Spawn at the center of `world`, at rest.
    pub fn spawn(world: &World) -> Self {
        let (x, y) = world.center();
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            radius: Self::RADIUS,
            color: Self::COLOR,
            speed: Self::SPEED,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.vx != 0.0 || self.vy != 0.0
    }
}

/// Another player as last reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    pub x: f64,
    pub y: f64,
    pub name: String,
    pub radius: f64,
    pub color: Color,
}

impl RemotePlayer {
    pub const RADIUS: f64 = 10.0;
    pub const COLOR: Color = Color::rgb(0xee, 0xee, 0x44);
    pub const DEFAULT_NAME: &'static str = "Player";

    pub fn new(x: f64, y: f64, name: Option<String>) -> Self {
        Self {
            x,
            y,
            name: name.unwrap_or_else(|| Self::DEFAULT_NAME.to_string()),
            radius: Self::RADIUS,
            color: Self::COLOR,
        }
    }
}
