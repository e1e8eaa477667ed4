/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::collections::VecDeque;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::event::KeyCode;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::GameConfig;
use domain::entity::{FrameInput, MoveDir};
use sim::event::GameEvent;
use sim::level::{load_level, load_levels, start_level};
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::{Sfx, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Moves typed faster than the tick rate wait here, oldest first.
const MAX_QUEUED_MOVES: usize = 3;

fn main() {
    let (config, config_error) = GameConfig::load();

    if let Err(e) = setup_logging(&config.log_dir) {
        eprintln!("Logging disabled: {e:#}");
    }
    if let Some(e) = config_error {
        warn!(error = %e, "config.toml unusable, using default settings");
    }
    info!(levels_dir = %config.levels_dir.display(), "starting");

    let levels = load_levels(&config);
    let mut world = WorldState::new(&config, levels);

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        warn!(error = %e, "game loop failed");
        eprintln!("Game error: {e:#}");
    }

    println!();
    println!("Thanks for playing Icebound!");
}

/// File-only logging: stdout belongs to the terminal UI.
fn setup_logging(log_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(log_dir, "icebound.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    // Keep the writer thread alive for the whole run
    std::mem::forget(guard);
    Ok(())
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> anyhow::Result<()> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms);

    info!(gamepad = gp.connected, tick_ms = config.speed.tick_rate_ms, "input ready");

    let mut pending_moves: VecDeque<MoveDir> = VecDeque::with_capacity(MAX_QUEUED_MOVES);
    let mut pending_restart = false;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, &kb, &gp) {
            break;
        }

        if world.phase == Phase::Playing {
            for dir in detect_moves(&kb, &gp) {
                if pending_moves.len() < MAX_QUEUED_MOVES {
                    pending_moves.push_back(dir);
                }
            }
            if kb.any_pressed(KEYS_RESTART) || gp.restart_pressed() {
                pending_restart = true;
                pending_moves.clear();
            }
        } else {
            pending_moves.clear();
            pending_restart = false;
        }

        if last_tick.elapsed() >= tick_rate {
            if world.phase == Phase::Playing {
                let frame_input = FrameInput {
                    movement: pending_moves.pop_front(),
                    restart: std::mem::take(&mut pending_restart),
                };
                let events = step::step(world, frame_input);
                if events.iter().any(|e| matches!(e, GameEvent::LevelRestarted
                    | GameEvent::PlayerDrowned | GameEvent::PlayerFell))
                {
                    pending_moves.clear();
                }
                process_sound_events(sound, &events);
            } else if world.message_timer > 0 {
                world.message_timer -= 1;
                if world.message_timer == 0 { world.message.clear(); }
            }
            last_tick = Instant::now();
        }

        renderer.render(world).context("rendering frame")?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// One sound per kind per tick: a slide that also cracks the floor
/// plays both, but two doors opening play one chime.
fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let Some(engine) = sound else {
        return;
    };
    let mut played: Vec<Sfx> = Vec::with_capacity(events.len());
    for sfx in events.iter().filter_map(Sfx::for_event) {
        if !played.contains(&sfx) {
            engine.play(sfx);
            played.push(sfx);
        }
    }
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

fn key_to_dir(code: KeyCode) -> Option<MoveDir> {
    if KEYS_LEFT.contains(&code) {
        Some(MoveDir::Left)
    } else if KEYS_RIGHT.contains(&code) {
        Some(MoveDir::Right)
    } else if KEYS_UP.contains(&code) {
        Some(MoveDir::Up)
    } else if KEYS_DOWN.contains(&code) {
        Some(MoveDir::Down)
    } else {
        None
    }
}

/// Movement presses this frame in arrival order, keyboard first.
fn detect_moves(kb: &InputState, gp: &GamepadState) -> Vec<MoveDir> {
    kb.presses()
        .iter()
        .filter_map(|&code| key_to_dir(code))
        .chain(gp.move_pressed())
        .collect()
}

/// Leave the level: drop it and any task still running on it.
fn return_to_title(world: &mut WorldState) {
    world.scheduler.cancel_all();
    world.level = None;
    world.clear_message();
    world.phase = Phase::Title;
}

/// Phase transitions driven by confirm / cancel. Returns true to quit.
fn handle_meta(world: &mut WorldState, kb: &InputState, gp: &GamepadState) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed();
    let cancel = kb.any_pressed(&[KeyCode::Esc]) || gp.cancel_pressed();

    match world.phase {
        Phase::Title => {
            if confirm {
                world.clear_message();
                load_level(world, 0);
            } else if cancel || kb.any_pressed(KEYS_QUIT) {
                return true;
            }
        }
        Phase::Ready => {
            if confirm {
                start_level(world);
            } else if cancel {
                info!(level = world.current_level, "left level");
                return_to_title(world);
            }
        }
        Phase::Playing => {
            if cancel {
                info!(level = world.current_level, "left level");
                return_to_title(world);
            }
        }
        Phase::LevelComplete => {
            if confirm {
                step::advance_level(world);
            } else if cancel {
                return_to_title(world);
            }
        }
        Phase::GameComplete | Phase::NoLevels => {
            if confirm || cancel {
                return_to_title(world);
            }
        }
    }
    false
}
