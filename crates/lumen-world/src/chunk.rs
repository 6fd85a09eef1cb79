use std::sync::atomic::{AtomicU16, Ordering};

use lumen_blocks::Block;

use crate::{CHUNK_SIZE, CHUNK_SIZE_I32, ChunkCoord};

/// Square block buffer for one chunk, indexed `lx * CHUNK_SIZE + ly`.
///
/// Slots are atomics so edits and worker-thread reads never need the world lock.
#[derive(Debug)]
pub struct Chunk {
    pub coord: ChunkCoord,
    blocks: Box<[AtomicU16]>,
}

impl Chunk {
    pub fn new(coord: ChunkCoord) -> Self {
        let blocks = (0..CHUNK_SIZE * CHUNK_SIZE)
            .map(|_| AtomicU16::new(Block::AIR.id))
            .collect();
        Self { coord, blocks }
    }

    /// Builds a chunk by sampling `f(wx, wy)` for each slot.
    pub fn filled_with(coord: ChunkCoord, mut f: impl FnMut(i32, i32) -> Block) -> Self {
        let mut blocks = Vec::with_capacity(CHUNK_SIZE * CHUNK_SIZE);
        for lx in 0..CHUNK_SIZE {
            for ly in 0..CHUNK_SIZE {
                let (wx, wy) = coord.to_world(lx, ly);
                blocks.push(AtomicU16::new(f(wx, wy).id));
            }
        }
        Self {
            coord,
            blocks: blocks.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn idx(lx: usize, ly: usize) -> usize {
        assert!(
            lx < CHUNK_SIZE && ly < CHUNK_SIZE,
            "local coordinate ({lx}, {ly}) outside chunk"
        );
        lx * CHUNK_SIZE + ly
    }

    #[inline]
    pub fn get_local(&self, lx: usize, ly: usize) -> Block {
        Block::new(self.blocks[Self::idx(lx, ly)].load(Ordering::Acquire))
    }

    /// Stores `b` and returns the block it replaced.
    #[inline]
    pub fn set_local(&self, lx: usize, ly: usize, b: Block) -> Block {
        Block::new(self.blocks[Self::idx(lx, ly)].swap(b.id, Ordering::AcqRel))
    }

    #[inline]
    pub fn contains_world(&self, wx: i32, wy: i32) -> bool {
        let (ox, oy) = self.coord.origin();
        wx >= ox && wx < ox + CHUNK_SIZE_I32 && wy >= oy && wy < oy + CHUNK_SIZE_I32
    }

    #[inline]
    pub fn get_world(&self, wx: i32, wy: i32) -> Option<Block> {
        if !self.contains_world(wx, wy) {
            return None;
        }
        let (ox, oy) = self.coord.origin();
        Some(self.get_local((wx - ox) as usize, (wy - oy) as usize))
    }

    pub fn has_non_air(&self) -> bool {
        self.blocks
            .iter()
            .any(|b| b.load(Ordering::Relaxed) != Block::AIR.id)
    }
}
