//! Board boundary for streamed terrain: render squares with displaced vertex
//! grids, tints and prop models, kept in step with a
//! [`tessera_terrain::TerrainStreamer`].

mod applier;
mod board;

pub use applier::{ApplyReport, TerrainApplier};
pub use board::{Board, BoardSquare, Prop, PropKind};
