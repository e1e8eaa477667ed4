/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.txt` files, sorted by file name)
///   2. Built-in embedded levels
///
/// ## Level format (`.txt`):
///   Optional first line: `# Level Name`
///   Remaining lines: map rows, one character per cell.
///   Blank lines are skipped; ragged rows are padded with grass.
///
/// ## Tile legend:
///   '0' = Grass          '1' = Water (swimmers only)
///   'S' = Player start   'E' = Exit
///   'W' = Wall           'C' = Cracked floor (collapses once left)
///   'I' = Ice (slide)    'H' = Hole
///   'B' = Button         'D' = Locked door (opened by the button)
///
/// Unknown symbols load as grass with a warning.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::domain::entity::{Capabilities, Player, Position};
use crate::domain::grid::Grid;
use crate::domain::registry::EffectRegistry;
use crate::domain::tile::TileType;
use crate::sim::world::{Level, Phase, WorldState};

/// Runtime level data (owned strings, loaded from file or embedded).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("could not read level {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("level '{name}' has no map rows")]
    Empty { name: String },
    #[error("level '{name}' has no start tile 'S'")]
    MissingStart { name: String },
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load level `level_idx` into the world. Cancels every running task.
/// Unloadable levels are skipped; running past the end completes the game.
pub fn load_level(world: &mut WorldState, level_idx: usize) {
    world.scheduler.cancel_all();
    world.moves = 0;
    world.resets = 0;

    let mut idx = level_idx;
    loop {
        if idx >= world.levels.len() {
            world.level = None;
            world.phase = if world.levels.is_empty() { Phase::NoLevels } else { Phase::GameComplete };
            let msg = if world.levels.is_empty() { "No levels found." } else { "You Win!" };
            world.set_message(msg, 0);
            return;
        }
        match instantiate(idx, &world.levels[idx], world.caps) {
            Ok(level) => {
                info!(
                    level = idx,
                    name = %level.name,
                    width = level.grid.width(),
                    height = level.grid.height(),
                    "level loaded"
                );
                world.current_level = idx;
                world.level = Some(level);
                break;
            }
            Err(e) => {
                warn!(level = idx, error = %e, "skipping level");
                idx += 1;
            }
        }
    }

    world.phase = Phase::Ready;
    let prompt = format!("{}: Press ENTER to start.", world.levels[idx].name);
    world.set_message(&prompt, 0);
    world.center_camera();
}

/// Leave the start prompt of a freshly loaded level.
pub fn start_level(world: &mut WorldState) {
    if world.phase != Phase::Ready {
        return;
    }
    debug!(level = world.current_level, "level started");
    world.phase = Phase::Playing;
    world.clear_message();
}

/// Build a fresh `Level` from its definition: new grid, new registry, player on the start.
pub fn instantiate(index: usize, def: &LevelDef, caps: Capabilities) -> Result<Level, LevelError> {
    let (grid, spawn) = build_grid(def)?;
    Ok(Level {
        index,
        name: def.name.clone(),
        grid,
        registry: EffectRegistry::for_level(),
        player: Player::new(spawn, caps),
    })
}

/// Level list for the session: `levels_dir` if it holds any playable level,
/// otherwise the embedded set. Levels that fail to build are dropped here.
pub fn load_levels(config: &GameConfig) -> Vec<LevelDef> {
    let dir = &config.levels_dir;
    if dir.is_dir() {
        let levels = playable(load_from_directory(dir));
        if !levels.is_empty() {
            info!(dir = %dir.display(), count = levels.len(), "using level directory");
            return levels;
        }
        warn!(dir = %dir.display(), "no playable levels in directory, using built-in set");
    }
    playable(embedded_levels())
}

fn playable(defs: Vec<LevelDef>) -> Vec<LevelDef> {
    defs.into_iter()
        .filter(|def| match build_grid(def) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "dropping level");
                false
            }
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Parsing
// ══════════════════════════════════════════════════════════════

/// Parse a single level from text. `name_hint` names levels without a `#` line.
/// Returns `None` when there are no map rows.
pub fn parse_level_text(name_hint: &str, text: &str) -> Option<LevelDef> {
    let mut name = String::new();
    let mut rows = vec![];

    for line in text.lines() {
        let line = line.trim_end();
        if let Some(rest) = line.strip_prefix('#') {
            if name.is_empty() && rows.is_empty() {
                name = rest.trim().to_string();
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        rows.push(line.to_string());
    }

    if rows.is_empty() {
        return None;
    }

    let max_width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    for row in &mut rows {
        let len = row.chars().count();
        if len < max_width {
            row.extend(std::iter::repeat(TileType::Empty.symbol()).take(max_width - len));
        }
    }

    if name.is_empty() {
        name = if name_hint.is_empty() { "Unnamed Level".to_string() } else { name_hint.to_string() };
    }

    Some(LevelDef { name, rows })
}

/// Turn a definition into a grid and the player spawn.
/// The first `S` in row-major order is the spawn; extra ones are left as start tiles.
pub fn build_grid(def: &LevelDef) -> Result<(Grid, Position), LevelError> {
    if def.rows.is_empty() || def.rows.iter().all(|r| r.is_empty()) {
        return Err(LevelError::Empty { name: def.name.clone() });
    }

    let rows: Vec<Vec<TileType>> = def.rows.iter()
        .enumerate()
        .map(|(y, row)| {
            row.chars()
                .enumerate()
                .map(|(x, ch)| {
                    TileType::from_symbol(ch).unwrap_or_else(|| {
                        warn!(level = %def.name, x, y, symbol = %ch.escape_debug(), "unknown tile symbol");
                        EffectRegistry::FALLBACK.tile()
                    })
                })
                .collect()
        })
        .collect();
    let grid = Grid::from_rows(rows);

    let starts = grid.find_positions(TileType::Start);
    let spawn = match starts.first() {
        Some(&pos) => pos,
        None => return Err(LevelError::MissingStart { name: def.name.clone() }),
    };
    if starts.len() > 1 {
        warn!(level = %def.name, count = starts.len(), "several start tiles, using the first");
    }

    Ok((grid, spawn))
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Vec<LevelDef> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "could not list level directory");
            return vec![];
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |e| e == "txt"))
        .collect();
    paths.sort();

    let mut results = vec![];
    for path in paths {
        match read_level_file(&path) {
            Ok(def) => results.push(def),
            Err(e) => warn!(error = %e, "skipping level file"),
        }
    }
    results
}

fn read_level_file(path: &Path) -> Result<LevelDef, LevelError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| LevelError::Io { path: path.to_path_buf(), source })?;
    let hint = path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    parse_level_text(&hint, &content).ok_or(LevelError::Empty { name: hint })
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

pub fn embedded_levels() -> Vec<LevelDef> {
    vec![
        make_embedded("Level 1 - Dry Feet", &[
            "WWWWWWWWW",
            "WS000000W",
            "W0111110W",
            "W0000010W",
            "W11110E0W",
            "WWWWWWWWW",
        ]),
        make_embedded("Level 2 - Thin Ice", &[
            "WWWWWWWWWW",
            "WS00IIII0W",
            "W000W000WW",
            "WIIIIIIIEW",
            "W0000000WW",
            "WWWWWWWWWW",
        ]),
        make_embedded("Level 3 - Crumbling Path", &[
            "WWWWWWW",
            "WS1111W",
            "WC1111W",
            "WC1C0EW",
            "WCCC11W",
            "WWWWWWW",
        ]),
        make_embedded("Level 4 - The Key Stone", &[
            "WWWWWWWW",
            "WS00W0EW",
            "W0W0D00W",
            "W0WBW00W",
            "WWWWWWWW",
        ]),
        make_embedded("Level 5 - Ice Gate", &[
            "WWWWWWWWWW",
            "WSIIIIB00W",
            "WWWWWWWW0W",
            "WHHHHHHW0W",
            "WE00D000CW",
            "WWWWWWWWWW",
        ]),
    ]
}

fn make_embedded(name: &str, map: &[&str]) -> LevelDef {
    LevelDef {
        name: name.to_string(),
        rows: map.iter().map(|s| s.to_string()).collect(),
    }
}
