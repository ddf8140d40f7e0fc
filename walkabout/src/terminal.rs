use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::style::{self, Print, SetBackgroundColor, SetForegroundColor};
use crossterm::{cursor, execute, queue, terminal};
use std::io::{self, Write};
use std::time::{Duration, Instant};

use crate::camera::Viewport;
use crate::input::{Key, KeyTracker};
use crate::render::{Align, Canvas, Color, TextStyle};

/// Logical units covered by one terminal cell.
pub const CELL_WIDTH: f64 = 8.0;
pub const CELL_HEIGHT: f64 = 16.0;
/// Cell coordinates are pinned to +/- this before any integer math.
const CELL_MARGIN: f64 = 65_536.0;

/// Raw-mode alternate screen, restored on drop.
pub struct TerminalSession {
    reports_release: bool,
}

impl TerminalSession {
    pub fn start() -> Result<Self> {
        terminal::enable_raw_mode()?;
        // From here on, dropping the guard restores the terminal.
        let mut session = Self {
            reports_release: false,
        };

        let mut stdout = io::stdout();
        execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            session.reports_release = true;
        }
        log::debug!("Terminal reports key release: {}", session.reports_release);

        Ok(session)
    }

    pub fn reports_release(&self) -> bool {
        self.reports_release
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        if self.reports_release {
            let _ = execute!(stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(stdout, style::ResetColor, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Map a crossterm key to a movement key, using the same names a browser
/// reports.
pub fn movement_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Up => Key::from_name("ArrowUp"),
        KeyCode::Down => Key::from_name("ArrowDown"),
        KeyCode::Left => Key::from_name("ArrowLeft"),
        KeyCode::Right => Key::from_name("ArrowRight"),
        KeyCode::Char(c) => Key::from_name(c.encode_utf8(&mut [0; 4])),
        _ => None,
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Apply one key event to `tracker`.
pub fn handle_key(tracker: &mut KeyTracker, key: KeyEvent, now: Instant) -> Control {
    if key.kind != KeyEventKind::Release && is_quit(&key) {
        return Control::Quit;
    }
    if let Some(movement) = movement_key(key.code) {
        match key.kind {
            KeyEventKind::Press | KeyEventKind::Repeat => tracker.press(movement, now),
            KeyEventKind::Release => tracker.release(movement),
        }
    }
    Control::Continue
}

/// Handle every pending terminal event without blocking.
pub fn poll_events(tracker: &mut KeyTracker, canvas: &mut TerminalCanvas, now: Instant) -> Result<Control> {
    while event::poll(Duration::ZERO)? {
        match event::read()? {
            Event::Key(key) => {
                if handle_key(tracker, key, now) == Control::Quit {
                    return Ok(Control::Quit);
                }
            }
            Event::Resize(cols, rows) => canvas.resize(cols, rows),
            Event::FocusLost => tracker.release_all(),
            _ => {}
        }
    }
    Ok(Control::Continue)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BLANK: Cell = Cell {
        ch: ' ',
        fg: Color::rgb(0xff, 0xff, 0xff),
        bg: Color::rgb(0, 0, 0),
    };
}

/// Character-cell canvas. Each cell stands for a
/// `CELL_WIDTH` x `CELL_HEIGHT` block of logical units.
pub struct TerminalCanvas {
    cols: u16,
    rows: u16,
    cells: Vec<Cell>,
}

impl TerminalCanvas {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::BLANK; cols as usize * rows as usize],
        }
    }

    pub fn from_terminal() -> Result<Self> {
        let (cols, rows) = terminal::size()?;
        Ok(Self::new(cols, rows))
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        *self = Self::new(cols, rows);
    }

    fn cell_mut(&mut self, col: i64, row: i64) -> Option<&mut Cell> {
        if col < 0 || row < 0 || col >= self.cols as i64 || row >= self.rows as i64 {
            return None;
        }
        self.cells.get_mut(row as usize * self.cols as usize + col as usize)
    }

    /// Cell under a logical point. Far-away points are pinned to a margin
    /// around the grid so cell arithmetic cannot overflow.
    fn to_cell(x: f64, y: f64) -> (i64, i64) {
        let col = (x / CELL_WIDTH).floor().clamp(-CELL_MARGIN, CELL_MARGIN);
        let row = (y / CELL_HEIGHT).floor().clamp(-CELL_MARGIN, CELL_MARGIN);
        (col as i64, row as i64)
    }

    fn row_visible(&self, row: i64) -> bool {
        row >= 0 && row < self.rows as i64
    }

    /// Whether the cell box spanned by the two corners touches the grid.
    fn box_visible(&self, (c0, r0): (i64, i64), (c1, r1): (i64, i64)) -> bool {
        c0.max(c1) >= 0 && c0.min(c1) < self.cols as i64 && r0.max(r1) >= 0 && r0.min(r1) < self.rows as i64
    }

    /// Glyph at a cell, for tests and debugging.
    pub fn glyph(&self, col: u16, row: u16) -> Option<char> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some(self.cells[row as usize * self.cols as usize + col as usize].ch)
    }

    /// Write the buffer to `out`, switching colors only when they change.
    pub fn present<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut current: Option<(Color, Color)> = None;
        for row in 0..self.rows {
            queue!(out, cursor::MoveTo(0, row))?;
            for col in 0..self.cols {
                let cell = self.cells[row as usize * self.cols as usize + col as usize];
                if current != Some((cell.fg, cell.bg)) {
                    queue!(
                        out,
                        SetForegroundColor(to_term(cell.fg)),
                        SetBackgroundColor(to_term(cell.bg))
                    )?;
                    current = Some((cell.fg, cell.bg));
                }
                queue!(out, Print(cell.ch))?;
            }
        }
        out.flush()
    }
}

fn to_term(color: Color) -> style::Color {
    style::Color::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

impl Canvas for TerminalCanvas {
    fn viewport(&self) -> Viewport {
        Viewport::from_logical(self.cols as f64 * CELL_WIDTH, self.rows as f64 * CELL_HEIGHT, 1.0)
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Color) {
        let (c0, r0) = Self::to_cell(x, y);
        let (c1, r1) = Self::to_cell(x + w, y + h);
        for row in r0.max(0)..r1.min(self.rows as i64) {
            for col in c0.max(0)..c1.min(self.cols as i64) {
                if let Some(cell) = self.cell_mut(col, row) {
                    *cell = Cell {
                        ch: ' ',
                        fg: color,
                        bg: color,
                    };
                }
            }
        }
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: Color) {
        let (c0, r0) = Self::to_cell(from.0, from.1);
        let (c1, r1) = Self::to_cell(to.0, to.1);
        if !self.box_visible((c0, r0), (c1, r1)) {
            return;
        }
        let glyph = if c0 == c1 {
            '│'
        } else if r0 == r1 {
            '─'
        } else if width > 1.0 {
            '•'
        } else {
            '·'
        };

        let steps = (c1 - c0).abs().max((r1 - r0).abs());
        for i in 0..=steps {
            let t = if steps == 0 { 0.0 } else { i as f64 / steps as f64 };
            let col = c0 + ((c1 - c0) as f64 * t).round() as i64;
            let row = r0 + ((r1 - r0) as f64 * t).round() as i64;
            if let Some(cell) = self.cell_mut(col, row) {
                cell.ch = match (cell.ch, glyph) {
                    ('│', '─') | ('─', '│') | ('┼', '│' | '─') => '┼',
                    _ => glyph,
                };
                cell.fg = color;
            }
        }
    }

    fn fill_circle(&mut self, center: (f64, f64), radius: f64, color: Color) {
        let (c0, r0) = Self::to_cell(center.0 - radius, center.1 - radius);
        let (c1, r1) = Self::to_cell(center.0 + radius, center.1 + radius);
        if !self.box_visible((c0, r0), (c1, r1)) {
            return;
        }
        let mut painted = false;
        for row in r0.max(0)..=r1.min(self.rows as i64 - 1) {
            for col in c0.max(0)..=c1.min(self.cols as i64 - 1) {
                let cx = (col as f64 + 0.5) * CELL_WIDTH;
                let cy = (row as f64 + 0.5) * CELL_HEIGHT;
                if (cx - center.0).hypot(cy - center.1) <= radius {
                    if let Some(cell) = self.cell_mut(col, row) {
                        *cell = Cell { ch: ' ', fg: color, bg: color };
                        painted = true;
                    }
                }
            }
        }
        // Circles smaller than a cell still show up.
        if !painted {
            let (col, row) = Self::to_cell(center.0, center.1);
            if let Some(cell) = self.cell_mut(col, row) {
                *cell = Cell { ch: '●', fg: color, bg: cell.bg };
            }
        }
    }

    fn text(&mut self, pos: (f64, f64), text: &str, style: TextStyle) {
        let len = text.chars().count() as i64;
        let (anchor, row) = Self::to_cell(pos.0, pos.1 - CELL_HEIGHT / 2.0);
        if !self.row_visible(row) {
            return;
        }
        let start = match style.align {
            Align::Left => anchor,
            Align::Center => anchor.saturating_sub(len / 2),
            Align::Right => anchor.saturating_sub(len),
        };
        for (i, ch) in text.chars().enumerate() {
            if let Some(cell) = self.cell_mut(start.saturating_add(i as i64), row) {
                cell.ch = ch;
                cell.fg = style.color;
            }
        }
    }
}
