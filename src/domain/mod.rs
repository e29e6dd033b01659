pub mod actor;
pub mod ai;
pub mod grid;
pub mod inventory;
pub mod map;
pub mod rng;
pub mod tile;
