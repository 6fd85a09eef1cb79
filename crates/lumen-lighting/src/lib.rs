//! Per-block 2D light maps with occlusion, falloff, and tone mapping.
#![forbid(unsafe_code)]

pub mod cell;
pub mod chunk_light;
pub mod light_map;
pub mod occlusion;
pub mod settings;
pub mod sources;
pub mod tone;

pub use cell::{CellState, LightCell, LightContext, compute_cell, evaluate_cell, raw_light_map};
pub use chunk_light::{ChunkLight, JobOutcome, StagedRecalc};
pub use light_map::{LightMap, RES};
pub use occlusion::RayOcclusion;
pub use settings::{IntensityMapping, LightingSettings, ToneMapping};
pub use sources::{LightSource, SourceKind, gather_sources};

#[cfg(test)]
mod tests;
