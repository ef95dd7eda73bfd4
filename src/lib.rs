//! Card-deck world generation library
//!
//! Re-exports modules for use by binaries and tools.

pub mod assets;
pub mod cards;
pub mod catalog;
pub mod color;
pub mod generator;
pub mod journal;
pub mod mutator;
pub mod rng;
pub mod world;
pub mod worldmap;
