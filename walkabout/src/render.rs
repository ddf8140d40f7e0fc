use std::ops::Range;

use crate::camera::{Camera, Viewport};
use crate::game::Game;
use crate::network::LinkStatus;

pub const BACKGROUND: Color = Color::rgb(0x07, 0x10, 0x1a);
pub const GRID_COLOR: Color = Color::rgb(0x0e, 0x2a, 0x33);
pub const GRID_SPACING: f64 = 128.0;
pub const INDICATOR_COLOR: Color = Color::rgb(0x00, 0x1f, 0x26);
pub const INDICATOR_LENGTH: f64 = 30.0;
pub const HUD_COLOR: Color = Color::rgb(0xdd, 0xff, 0xee);
pub const LABEL_COLOR: Color = Color::rgb(0x00, 0x00, 0x00);
/// Gap between a remote player's center and its name label.
pub const LABEL_OFFSET: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Sans,
    Monospace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub size: f64,
    pub font: Font,
    pub align: Align,
}

/// Drawing surface. All coordinates are logical screen units.
pub trait Canvas {
    fn viewport(&self) -> Viewport;
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Color);
    fn line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: Color);
    fn fill_circle(&mut self, center: (f64, f64), radius: f64, color: Color);
    /// `pos` is the text anchor on the baseline, horizontally per `style.align`.
    fn text(&mut self, pos: (f64, f64), text: &str, style: TextStyle);
}

/// Draw one frame: background, world grid, remote players, the local player
/// with its heading, then the HUD.
pub fn render<C: Canvas + ?Sized>(canvas: &mut C, game: &Game, camera: &Camera, link: LinkStatus) {
    let w = camera.viewport.logical_width();
    let h = camera.viewport.logical_height();

    canvas.fill_rect(0.0, 0.0, w, h, BACKGROUND);

    for i in grid_range(camera.x - w / 2.0, camera.x + w / 2.0, game.world.width) {
        let (sx, _) = camera.world_to_screen(i as f64 * GRID_SPACING, 0.0);
        canvas.line((sx, 0.0), (sx, h), 1.0, GRID_COLOR);
    }
    for i in grid_range(camera.y - h / 2.0, camera.y + h / 2.0, game.world.height) {
        let (_, sy) = camera.world_to_screen(0.0, i as f64 * GRID_SPACING);
        canvas.line((0.0, sy), (w, sy), 1.0, GRID_COLOR);
    }

    let label = TextStyle {
        color: LABEL_COLOR,
        size: 10.0,
        font: Font::Sans,
        align: Align::Center,
    };
    for remote in game.remote_players.values() {
        let (sx, sy) = camera.world_to_screen(remote.x, remote.y);
        canvas.fill_circle((sx, sy), remote.radius, remote.color);
        canvas.text((sx, sy - LABEL_OFFSET), &remote.name, label);
    }

    let player = &game.player;
    let (px, py) = camera.world_to_screen(player.x, player.y);
    canvas.fill_circle((px, py), player.radius, player.color);

    if player.is_moving() && player.speed != 0.0 {
        let tip = (
            px + player.vx / player.speed * INDICATOR_LENGTH,
            py + player.vy / player.speed * INDICATOR_LENGTH,
        );
        canvas.line((px, py), tip, 2.0, INDICATOR_COLOR);
    }

    let hud = TextStyle {
        color: HUD_COLOR,
        size: 13.0,
        font: Font::Monospace,
        align: Align::Left,
    };
    canvas.text((14.0, 18.0), &hud_line(game), hud);
    canvas.text(
        (w - 14.0, 18.0),
        &status_line(game, link),
        TextStyle {
            align: Align::Right,
            ..hud
        },
    );
}

/// Indices of the grid lines in `[0, extent)` that fall within `[lo, hi]`.
fn grid_range(lo: f64, hi: f64, extent: f64) -> Range<u64> {
    let count = (extent / GRID_SPACING).ceil().max(0.0) as u64;
    let first = (lo / GRID_SPACING).ceil().max(0.0) as u64;
    let end = ((hi / GRID_SPACING).floor() + 1.0).max(0.0) as u64;
    first.min(count)..end.min(count)
}

pub fn hud_line(game: &Game) -> String {
    format!(
        "x:{} y:{} speed:{}",
        game.player.x.round(),
        game.player.y.round(),
        game.player.speed
    )
}

pub fn status_line(game: &Game, link: LinkStatus) -> String {
    match (link, game.rtt_ms) {
        (LinkStatus::Open, Some(rtt)) => format!("ws:{} rtt:{}ms players:{}", link, rtt, game.remote_players.len()),
        (LinkStatus::Open, None) => format!("ws:{} players:{}", link, game.remote_players.len()),
        _ => format!("ws:{}", link),
    }
}
