/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Tiles paint themselves through the `Surface` trait; this module only
/// decides where they go and draws the player, HUD and screens.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{Facing, Position};
use crate::sim::world::{Level, Phase, WorldState};
use crate::ui::tiles::Surface;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells.
    ///
    /// Using the same RGB for `Clear(ClearType::All)` and every cell keeps
    /// the inter-row gap pixels on VTE terminals the same color as the cells.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    /// Normalize bg: Color::Reset → BASE_BG so that every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        let len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.ch_len = len;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn as_str(&self) -> &str {
        // Always written from a whole `char` by `from_char`.
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("?")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (cx, ch) in (x..self.width).zip(s.chars()) {
            self.set(cx, y, Cell::from_char(ch, fg, bg));
        }
    }

    /// Paint a whole row with `bg`, then write `s` from column 0.
    fn put_bar(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', fg, bg));
        }
        self.put_str(0, y, s, fg, bg);
    }
}

impl Surface for FrameBuffer {
    fn paint(&mut self, col: usize, row: usize, ch: char, fg: Color, bg: Color) {
        self.set(col, row, Cell::from_char(ch, fg, bg));
    }
}

// ── Renderer ──

/// Each game cell is 2 terminal columns wide.
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const ACCENT: Color = Color::Rgb { r: 120, g: 220, b: 255 };
const GOLD: Color = Color::Rgb { r: 255, g: 220, b: 50 };
const GREEN: Color = Color::Rgb { r: 80, g: 255, b: 80 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.size_camera(world);

        // Phase change → clear for a clean transition
        let phase_changed = self.last_phase != Some(world.phase);
        if phase_changed {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        // Snap on entering a level (the viewport size is only known here), follow after.
        if let Some(level) = &world.level {
            let (pos, map_w, map_h) = (level.player.pos, level.grid.width(), level.grid.height());
            if phase_changed {
                world.camera.center_on(pos, map_w, map_h);
            } else if world.phase == Phase::Playing {
                world.camera.follow(pos, map_w, map_h);
            }
        }

        self.front.clear();

        match world.phase {
            Phase::Title => self.compose_title(world),
            Phase::Ready | Phase::Playing => self.compose_game(world),
            Phase::LevelComplete => {
                self.compose_game(world);
                self.compose_level_complete(world);
            }
            Phase::GameComplete => self.compose_game_complete(world),
            Phase::NoLevels => self.compose_no_levels(world),
        }

        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    /// Viewport = terminal minus HUD, message and help rows.
    /// Maps smaller than this are centered by the camera.
    fn size_camera(&self, world: &mut WorldState) {
        let reserved_rows = MAP_ROW + 4;
        world.camera.view_w = (self.term_w / CELL_W).max(1);
        world.camera.view_h = self.term_h.saturating_sub(reserved_rows).max(1);
    }

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, w: &WorldState) {
        let Some(level) = &w.level else {
            return;
        };
        let cam = &w.camera;
        let buf_w = self.front.width;

        // ── HUD row ──
        let swim = if level.player.caps.swim { "  ≈ swim" } else { "" };
        let hud = format!(
            " Level {}/{}  {}   Moves:{:<5} Resets:{}{}",
            level.index + 1,
            w.total_levels(),
            level.name,
            w.moves,
            w.resets,
            swim,
        );
        self.front.put_bar(HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Map (camera viewport) ──
        for vy in 0..cam.view_h {
            let row = MAP_ROW + vy;
            if row >= self.front.height { break; }
            for vx in 0..cam.view_w {
                let col = vx * CELL_W;
                if col + 1 >= buf_w { break; }
                self.compose_cell(w, level, cam.view_to_world(vx, vy), col, row);
            }
        }

        // ── Player (hidden until the level is started) ──
        let shown = w.phase != Phase::Ready;
        if let Some((vx, vy)) = cam.world_to_view(level.player.pos).filter(|_| shown) {
            let col = vx * CELL_W;
            let row = MAP_ROW + vy;
            let (c0, c1) = match level.player.facing {
                Facing::Left => ('◀', '●'),
                Facing::Right => ('●', '▶'),
            };
            // Keep the tile's background under the player
            let bg = self.front.get(col, row).bg;
            self.front.set(col, row, Cell::from_char(c0, Color::White, bg));
            self.front.set(col + 1, row, Cell::from_char(c1, Color::White, bg));
        }

        // ── Message bar ──
        let msg_row = MAP_ROW + cam.view_h + 1;
        if msg_row < self.front.height && !w.message.is_empty() {
            let msg = format!(" ◈ {} ", w.message);
            self.front.put_bar(msg_row, &msg, Color::Black, MSG_BG);
        }

        // ── Help bar ──
        let help_row = MAP_ROW + cam.view_h + 3;
        if help_row < self.front.height {
            let help = " Arrows/WASD:Move  R:Restart  Esc:Title  │  Pad: D-pad  Y:Restart";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    /// One map cell through the effect bound to its tile; void outside the map.
    fn compose_cell(&mut self, w: &WorldState, level: &Level, pos: Position, col: usize, row: usize) {
        let Some(effect) = level.registry.effect_at(&level.grid, pos) else {
            self.compose_void(col, row);
            return;
        };
        let progress = w.scheduler.progress_at(pos).map(|(_, p)| p);
        effect.render(&mut self.front, col, row, CELL_W, progress, level.registry.state());
    }

    /// Render an out-of-bounds / void cell (game background).
    fn compose_void(&mut self, col: usize, row: usize) {
        self.front.set(col, row, Cell::BLANK);
        self.front.set(col + 1, row, Cell::BLANK);
    }

    // ── Static screens ──

    fn compose_title(&mut self, w: &WorldState) {
        let title = [
            r"  ___          _                          _ ",
            r" |_ _| __  ___| |__  ___  _  _  _ _   __| |",
            r"  | | / _|/ -_) '_ \/ _ \| || || ' \ / _` |",
            r" |___|\__|\___|_.__/\___/ \_,_||_||_|\__,_|",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 2 + i, line, ACCENT, Color::Reset);
        }

        let tagline = "━━━ a sliding tile puzzle ━━━";
        let tx = 2 + title[1].len().saturating_sub(tagline.chars().count()) / 2;
        self.front.put_str(tx, 7, tagline, Color::Rgb { r: 140, g: 180, b: 200 }, Color::Reset);

        let menu_base = 10;
        self.front.put_str(8, menu_base, "ENTER   Start", GREEN, Color::Reset);
        self.front.put_str(8, menu_base + 1, "  Q     Quit", Color::White, Color::Reset);
        let info = format!("        {} levels", w.total_levels());
        self.front.put_str(8, menu_base + 3, &info, Color::DarkGrey, Color::Reset);

        let legend = [
            "Tiles",
            "  ≈≈ water     ░░ ice (slide)   ╱╲ cracked floor",
            "  ▄▄ button    ╬╬ locked door   ▐▌ exit",
        ];
        let legend_base = menu_base + 5;
        for (i, line) in legend.iter().enumerate() {
            let color = if i == 0 { GOLD } else { Color::White };
            self.front.put_str(8, legend_base + i, line, color, Color::Reset);
        }

        let help = [
            "Controls",
            "  ←→↑↓ / WASD   Move       R   Restart level",
            "  ESC           Title      Pad D-pad / stick",
        ];
        let help_base = legend_base + legend.len() + 1;
        for (i, line) in help.iter().enumerate() {
            let color = if i == 0 { GOLD } else { Color::White };
            self.front.put_str(8, help_base + i, line, color, Color::Reset);
        }

        if !w.message.is_empty() {
            let msg_row = self.front.height.saturating_sub(1);
            if msg_row > help_base + help.len() {
                let msg = format!(" ◈ {} ", w.message);
                self.front.put_bar(msg_row, &msg, Color::Black, MSG_BG);
            }
        }
    }

    /// Banner over the finished map.
    fn compose_level_complete(&mut self, w: &WorldState) {
        let banner = [
            "╔════════════════════════════╗",
            "║      LEVEL  COMPLETE!      ║",
            "╚════════════════════════════╝",
        ];
        let view_cols = w.camera.view_w * CELL_W;
        let bx = view_cols.saturating_sub(banner[0].chars().count()) / 2;
        let by = MAP_ROW + w.camera.view_h.saturating_sub(banner.len()) / 2;
        for (i, line) in banner.iter().enumerate() {
            self.front.put_str(bx, by + i, line, GOLD, HUD_BG);
        }
    }

    fn compose_game_complete(&mut self, w: &WorldState) {
        let box_art = [
            "╔══════════════════════════════╗",
            "║   ★  ALL LEVELS CLEARED  ★   ║",
            "╚══════════════════════════════╝",
        ];
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_str(4, 4 + i, l, GOLD, Color::Reset);
        }
        let levels = format!("◈ {} levels cleared", w.total_levels());
        self.front.put_str(6, 9, &levels, GREEN, Color::Reset);
        if !w.message.is_empty() {
            let msg = format!("◈ {}", w.message);
            self.front.put_str(6, 10, &msg, Color::White, Color::Reset);
        }
        self.front.put_str(6, 12, "▸ ENTER / ESC: Back to Title", GREEN, Color::Reset);
    }

    fn compose_no_levels(&mut self, w: &WorldState) {
        self.front.put_str(6, 4, "◈ No levels found.", Color::Rgb { r: 255, g: 60, b: 60 }, Color::Reset);
        let hint = "Put *.txt maps in the levels directory and try again.";
        self.front.put_str(6, 6, hint, Color::White, Color::Reset);
        if !w.message.is_empty() {
            self.front.put_str(6, 8, &w.message, Color::DarkGrey, Color::Reset);
        }
        self.front.put_str(6, 10, "▸ ENTER / ESC: Back to Title", GREEN, Color::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::sim::level::{load_level, start_level, LevelDef};

    fn renderer(term_w: usize, term_h: usize) -> Renderer {
        let mut r = Renderer::new();
        r.term_w = term_w;
        r.term_h = term_h;
        r.front.resize(term_w, term_h);
        r
    }

    fn small_world() -> WorldState {
        let def = LevelDef { name: "tiny".into(), rows: vec!["S0E".into()] };
        let mut world = WorldState::new(&GameConfig::default(), vec![def]);
        load_level(&mut world, 0);
        world
    }

    #[test]
    fn cells_hold_multibyte_glyphs() {
        let cell = Cell::from_char('╬', Color::White, Color::Reset);
        assert_eq!(cell.as_str(), "╬");
        assert_eq!(cell.bg, Cell::BASE_BG);
    }

    #[test]
    fn frame_buffer_is_a_surface() {
        let mut fb = FrameBuffer::new(6, 2);
        crate::domain::effect::TileEffect::Ice.render(
            &mut fb, 2, 1, CELL_W, None, &Default::default(),
        );
        assert_eq!(fb.get(2, 1).as_str(), "░");
        assert_eq!(fb.get(3, 1).as_str(), "░");
        assert_eq!(fb.get(4, 1), Cell::BLANK);
    }

    #[test]
    fn put_str_clips_at_the_edge() {
        let mut fb = FrameBuffer::new(3, 1);
        fb.put_str(1, 0, "abc", Color::White, Color::Reset);
        assert_eq!(fb.get(1, 0).as_str(), "a");
        assert_eq!(fb.get(2, 0).as_str(), "b");
    }

    #[test]
    fn small_map_sits_in_the_middle_of_the_terminal() {
        let r = renderer(40, 20);
        let mut world = small_world();
        r.size_camera(&mut world);
        world.center_camera();
        assert_eq!((world.camera.view_w, world.camera.view_h), (20, 14));
        assert_eq!(world.camera.world_to_view(Position::new(0, 0)), Some((8, 6)));
    }

    #[test]
    fn player_appears_once_the_level_starts() {
        let mut r = renderer(40, 20);
        let mut world = small_world();
        r.size_camera(&mut world);
        world.center_camera();
        // Start tile is at view (8, 6): columns 16-17 on map row 8
        let row = MAP_ROW + 6;

        r.compose_game(&world);
        assert_eq!(r.front.get(16, row).as_str(), "▫");

        start_level(&mut world);
        r.front.clear();
        r.compose_game(&world);
        assert_eq!(r.front.get(17, row).as_str(), "▶");
    }
}
