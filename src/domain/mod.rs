pub mod effect;
pub mod entity;
pub mod grid;
pub mod registry;
pub mod resolve;
pub mod tile;
