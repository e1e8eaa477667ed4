/// Timed tile tasks: collapse, button press, door unlock.
///
/// Tasks count down on the fixed simulation tick and report a 0.0 → 1.0
/// progress for the renderer. They change nothing while running; the
/// session acts on a `Completion` only at the terminal tick.
///
/// ## Epochs
///
/// `cancel_all` (level load / restart) drops every task and bumps the
/// epoch. Each handle and completion carries the epoch it was started
/// in, so a completion produced before a reset within the same tick can
/// be recognised as stale and ignored.

use crate::domain::effect::AnimKind;
use crate::domain::entity::Position;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AnimHandle {
    pub id: u64,
    pub epoch: u64,
}

#[derive(Clone, Debug)]
pub struct Animation {
    pub handle: AnimHandle,
    pub kind: AnimKind,
    pub pos: Position,
    pub remaining: u32,
    total: u32,
}

impl Animation {
    /// 0.0 (just started) → 1.0 (finished).
    pub fn progress(&self) -> f32 {
        if self.total == 0 { return 1.0; }
        1.0 - (self.remaining as f32 / self.total as f32)
    }

    /// Advance one tick. Returns true on the terminal tick.
    fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Completion {
    pub handle: AnimHandle,
    pub kind: AnimKind,
    pub pos: Position,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    epoch: u64,
    next_id: u64,
    active: Vec<Animation>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn start(&mut self, kind: AnimKind, pos: Position, ticks: u32) -> AnimHandle {
        let handle = AnimHandle { id: self.next_id, epoch: self.epoch };
        self.next_id += 1;
        self.active.push(Animation {
            handle,
            kind,
            pos,
            remaining: ticks.max(1),
            total: ticks.max(1),
        });
        handle
    }

    /// Drop every task and start a new epoch.
    pub fn cancel_all(&mut self) {
        self.active.clear();
        self.epoch += 1;
    }

    /// Is `completion` from the current epoch?
    pub fn is_current(&self, completion: &Completion) -> bool {
        completion.handle.epoch == self.epoch
    }

    /// Advance every task one tick; finished tasks are removed and returned
    /// in start order.
    pub fn tick(&mut self) -> Vec<Completion> {
        let mut done = vec![];
        self.active.retain_mut(|a| {
            if a.tick() {
                done.push(Completion { handle: a.handle, kind: a.kind, pos: a.pos });
                false
            } else {
                true
            }
        });
        done
    }

    pub fn is_pending(&self, kind: AnimKind, pos: Position) -> bool {
        self.active.iter().any(|a| a.kind == kind && a.pos == pos)
    }

    /// Running task at `pos`, if any, with its progress.
    pub fn progress_at(&self, pos: Position) -> Option<(AnimKind, f32)> {
        self.active.iter()
            .find(|a| a.pos == pos)
            .map(|a| (a.kind, a.progress()))
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
