//! World grid, chunk storage, and column top-block tracking.
#![forbid(unsafe_code)]

pub mod chunk;
pub mod column;
pub mod world;

pub use chunk::Chunk;
pub use column::{ChunkColumn, ColumnMap, TopBlockChange, TopBlockFlags};
pub use world::{Generator, GridWorld};

use lumen_blocks::{Block, BlockRegistry, BlockType};
use serde::{Deserialize, Serialize};

pub const CHUNK_SIZE: usize = 16;
pub const CHUNK_SIZE_I32: i32 = CHUNK_SIZE as i32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cy: i32) -> Self {
        Self { cx, cy }
    }

    /// Chunk containing world block `(wx, wy)`.
    #[inline]
    pub fn from_world(wx: i32, wy: i32) -> Self {
        Self {
            cx: chunk_of(wx),
            cy: chunk_of(wy),
        }
    }

    #[inline]
    pub fn with_y(self, cy: i32) -> Self {
        Self { cy, ..self }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
        }
    }

    /// World coordinates of local block `(0, 0)`.
    #[inline]
    pub fn origin(self) -> (i32, i32) {
        (self.cx * CHUNK_SIZE_I32, self.cy * CHUNK_SIZE_I32)
    }

    #[inline]
    pub fn to_world(self, lx: usize, ly: usize) -> (i32, i32) {
        let (ox, oy) = self.origin();
        (ox + lx as i32, oy + ly as i32)
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

#[inline]
pub fn chunk_of(w: i32) -> i32 {
    w.div_euclid(CHUNK_SIZE_I32)
}

#[inline]
pub fn local_of(w: i32) -> usize {
    w.rem_euclid(CHUNK_SIZE_I32) as usize
}

/// Read access to the world used by column tracking and light computation.
///
/// Implementations must be callable from worker threads. With
/// `load_chunk == false` a lookup never creates or generates chunk data and
/// answers `None` for anything not already resident.
pub trait WorldView: Send + Sync {
    fn get_raw_block(&self, wx: i32, wy: i32, load_chunk: bool) -> Option<Block>;

    fn registry(&self) -> &BlockRegistry;

    fn is_chunk_loaded(&self, coord: ChunkCoord) -> bool;

    /// Lowest world Y that can hold a block.
    fn bottom_y(&self) -> i32;

    #[inline]
    fn material_at(&self, wx: i32, wy: i32, load_chunk: bool) -> Option<&BlockType> {
        self.get_raw_block(wx, wy, load_chunk)
            .map(|b| self.registry().material(b))
    }
}
