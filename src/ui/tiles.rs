/// Tile appearance: how each `TileEffect` paints itself.
///
/// A tile occupies `tile_size` terminal columns on one row. The first
/// column gets the left glyph, every further column the right glyph.
///
/// Animated tiles take the progress (0.0 → 1.0) of the task running on
/// their cell:
///   CrackedFloor  crumbles in three stages while its collapse runs
///   Button        sinks while pressing, stays flat once pressed
///   LockedDoor    slides open while unlocking, then shows an open frame

use crossterm::style::Color;

use crate::domain::effect::{EffectState, TileEffect};

/// Anything a tile can be painted onto.
pub trait Surface {
    fn paint(&mut self, col: usize, row: usize, ch: char, fg: Color, bg: Color);
}

const GRASS_FG: Color = Color::Rgb { r: 90, g: 160, b: 60 };
const GRASS_BG: Color = Color::Rgb { r: 28, g: 56, b: 24 };
const FLOOR_BG: Color = Color::Rgb { r: 70, g: 60, b: 50 };

/// Glyph pair plus colors for one tile.
type Look = (char, char, Color, Color);

impl TileEffect {
    pub fn render(
        self,
        surface: &mut dyn Surface,
        x: usize,
        y: usize,
        tile_size: usize,
        progress: Option<f32>,
        state: &EffectState,
    ) {
        let (c0, c1, fg, bg) = self.look(progress, state);
        for i in 0..tile_size {
            let ch = if i == 0 { c0 } else { c1 };
            surface.paint(x + i, y, ch, fg, bg);
        }
    }

    fn look(self, progress: Option<f32>, state: &EffectState) -> Look {
        match self {
            TileEffect::Grass => (',', '\'', GRASS_FG, GRASS_BG),
            TileEffect::Start => ('▫', '▫', Color::Rgb { r: 200, g: 200, b: 120 }, GRASS_BG),
            TileEffect::End => ('▐', '▌', Color::Rgb { r: 255, g: 220, b: 50 }, Color::Rgb { r: 90, g: 70, b: 10 }),
            TileEffect::Wall => ('█', '█', Color::Rgb { r: 120, g: 120, b: 120 }, Color::Rgb { r: 70, g: 70, b: 70 }),
            TileEffect::Water => ('≈', '≈', Color::Rgb { r: 120, g: 180, b: 255 }, Color::Rgb { r: 20, g: 50, b: 120 }),
            TileEffect::Ice => ('░', '░', Color::Rgb { r: 220, g: 245, b: 255 }, Color::Rgb { r: 120, g: 170, b: 210 }),
            TileEffect::Hole => (' ', ' ', Color::Reset, Color::Rgb { r: 8, g: 6, b: 4 }),
            TileEffect::CrackedFloor => cracked_look(progress),
            TileEffect::Button => button_look(progress, state.button_pressed),
            TileEffect::LockedDoor => door_look(progress, state.doors_unlocked),
        }
    }
}

fn cracked_look(progress: Option<f32>) -> Look {
    let fg = Color::Rgb { r: 150, g: 120, b: 90 };
    match progress {
        None => ('╱', '╲', fg, FLOOR_BG),
        Some(p) if p < 0.33 => ('▓', '▓', Color::DarkYellow, Color::Rgb { r: 60, g: 45, b: 20 }),
        Some(p) if p < 0.66 => ('▓', '░', Color::DarkYellow, Color::Rgb { r: 40, g: 30, b: 10 }),
        Some(_) => ('░', '░', Color::DarkYellow, Color::Rgb { r: 20, g: 15, b: 5 }),
    }
}

fn button_look(progress: Option<f32>, pressed: bool) -> Look {
    match (pressed, progress) {
        (false, _) => ('▄', '▄', Color::Rgb { r: 230, g: 60, b: 60 }, FLOOR_BG),
        (true, Some(p)) if p < 0.5 => ('▃', '▃', Color::Rgb { r: 200, g: 50, b: 50 }, FLOOR_BG),
        (true, _) => ('▁', '▁', Color::Rgb { r: 140, g: 40, b: 40 }, FLOOR_BG),
    }
}

fn door_look(progress: Option<f32>, unlocked: bool) -> Look {
    let wood = Color::Rgb { r: 160, g: 100, b: 50 };
    match (unlocked, progress) {
        (false, _) => ('╬', '╬', wood, Color::Rgb { r: 90, g: 55, b: 25 }),
        (true, Some(p)) if p < 0.5 => ('▌', '▐', wood, FLOOR_BG),
        (true, _) => ('▏', '▕', wood, FLOOR_BG),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Canvas {
        cells: HashMap<(usize, usize), (char, Color, Color)>,
    }

    impl Surface for Canvas {
        fn paint(&mut self, col: usize, row: usize, ch: char, fg: Color, bg: Color) {
            self.cells.insert((col, row), (ch, fg, bg));
        }
    }

    impl Canvas {
        fn glyphs(&self, row: usize, cols: std::ops::Range<usize>) -> String {
            cols.map(|c| self.cells.get(&(c, row)).map_or('?', |cell| cell.0)).collect()
        }
    }

    #[test]
    fn tile_fills_its_width() {
        let mut canvas = Canvas::default();
        TileEffect::Wall.render(&mut canvas, 4, 1, 3, None, &EffectState::default());
        assert_eq!(canvas.cells.len(), 3);
        assert_eq!(canvas.glyphs(1, 4..7), "███");
    }

    #[test]
    fn cracking_advances_with_progress() {
        let state = EffectState::default();
        let mut stages = Vec::new();
        for p in [None, Some(0.1), Some(0.5), Some(0.9)] {
            let mut canvas = Canvas::default();
            TileEffect::CrackedFloor.render(&mut canvas, 0, 0, 2, p, &state);
            stages.push(canvas.glyphs(0, 0..2));
        }
        assert_eq!(stages, ["╱╲", "▓▓", "▓░", "░░"]);
    }

    #[test]
    fn door_opens_once_unlocked() {
        let mut canvas = Canvas::default();
        let locked = EffectState::default();
        TileEffect::LockedDoor.render(&mut canvas, 0, 0, 2, None, &locked);
        assert_eq!(canvas.glyphs(0, 0..2), "╬╬");

        let open = EffectState { button_pressed: true, doors_unlocked: true };
        TileEffect::LockedDoor.render(&mut canvas, 0, 0, 2, Some(0.2), &open);
        assert_eq!(canvas.glyphs(0, 0..2), "▌▐");
        TileEffect::LockedDoor.render(&mut canvas, 0, 0, 2, None, &open);
        assert_eq!(canvas.glyphs(0, 0..2), "▏▕");
    }

    #[test]
    fn pressed_button_stays_flat() {
        let mut canvas = Canvas::default();
        let pressed = EffectState { button_pressed: true, doors_unlocked: true };
        TileEffect::Button.render(&mut canvas, 0, 0, 1, None, &pressed);
        assert_eq!(canvas.glyphs(0, 0..1), "▁");
        TileEffect::Button.render(&mut canvas, 0, 0, 1, None, &EffectState::default());
        assert_eq!(canvas.glyphs(0, 0..1), "▄");
    }
}
