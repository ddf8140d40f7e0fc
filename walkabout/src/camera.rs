use crate::types::Player;

/// Drawable surface size. `width`/`height` are physical pixels; everything
/// the game draws is in logical units, i.e. physical divided by `dpr`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub dpr: f64,
}

impl Viewport {
    /// Viewport for a surface of `width` x `height` logical units.
    pub fn from_logical(width: f64, height: f64, dpr: f64) -> Self {
        let dpr = sanitize_dpr(dpr);
        Self {
            width: (width * dpr).floor().max(0.0) as u32,
            height: (height * dpr).floor().max(0.0) as u32,
            dpr,
        }
    }

    pub fn logical_width(&self) -> f64 {
        self.width as f64 / sanitize_dpr(self.dpr)
    }

    pub fn logical_height(&self) -> f64 {
        self.height as f64 / sanitize_dpr(self.dpr)
    }
}

fn sanitize_dpr(dpr: f64) -> f64 {
    if dpr.is_finite() && dpr > 0.0 {
        dpr
    } else {
        1.0
    }
}

/// Camera that keeps the followed point in the middle of the viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub x: f64,
    pub y: f64,
    pub viewport: Viewport,
}

impl Camera {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            viewport,
        }
    }

    pub fn follow(&mut self, player: &Player) {
        self.x = player.x;
        self.y = player.y;
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        (
            self.viewport.logical_width() / 2.0 + (wx - self.x),
            self.viewport.logical_height() / 2.0 + (wy - self.y),
        )
    }
}
