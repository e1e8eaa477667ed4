/// Effect registry: the per-level dispatch table from tile type to effect.
///
/// One registry is built per level load (`for_level`), and with it a fresh
/// `EffectState`. Dropping the registry is how button and door state is
/// forgotten; nothing carries over between levels or restarts.

use super::effect::{EffectState, TileEffect};
use super::entity::Position;
use super::grid::Grid;
use super::tile::TileType;

#[derive(Clone, Debug)]
pub struct EffectRegistry {
    table: [TileEffect; TileType::COUNT],
    state: EffectState,
}

impl EffectRegistry {
    /// Effect bound to map symbols outside the alphabet (the loader stores them as its tile).
    pub const FALLBACK: TileEffect = TileEffect::Grass;

    /// A fresh registry: every tile bound, nothing pressed, every door locked.
    pub fn for_level() -> Self {
        EffectRegistry {
            table: TileType::ALL.map(TileEffect::bound_to),
            state: EffectState::default(),
        }
    }

    #[inline]
    pub fn effect(&self, tile: TileType) -> TileEffect {
        self.table[tile.index()]
    }

    /// Effect of the tile at `pos`, `None` off the map.
    pub fn effect_at(&self, grid: &Grid, pos: Position) -> Option<TileEffect> {
        grid.get_tile(pos).map(|t| self.effect(t))
    }

    pub fn state(&self) -> &EffectState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut EffectState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tile_is_bound() {
        let reg = EffectRegistry::for_level();
        for tile in TileType::ALL {
            assert_eq!(reg.effect(tile).tile(), tile);
        }
    }

    #[test]
    fn fallback_is_the_grass_binding() {
        let reg = EffectRegistry::for_level();
        assert_eq!(reg.effect(EffectRegistry::FALLBACK.tile()), TileEffect::Grass);
    }

    #[test]
    fn effect_at_is_bounds_safe() {
        let grid = Grid::from_diagram(&["SI"]);
        let reg = EffectRegistry::for_level();
        assert_eq!(reg.effect_at(&grid, Position::new(1, 0)), Some(TileEffect::Ice));
        assert_eq!(reg.effect_at(&grid, Position::new(2, 0)), None);
    }

    #[test]
    fn fresh_registry_has_fresh_state() {
        let mut reg = EffectRegistry::for_level();
        reg.state_mut().button_pressed = true;
        reg.state_mut().doors_unlocked = true;

        let next = EffectRegistry::for_level();
        assert_eq!(*next.state(), EffectState::default());
        assert!(!next.state().doors_unlocked);
    }
}
