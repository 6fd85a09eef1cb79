use std::sync::{Arc, RwLock};

use fastnoise_lite::{FastNoiseLite, NoiseType};
use hashbrown::HashMap;
use lumen_blocks::{Block, BlockRegistry};

use crate::{CHUNK_SIZE, Chunk, ChunkCoord, WorldView, chunk_of, local_of};

pub const DEFAULT_BOTTOM_Y: i32 = -4 * CHUNK_SIZE as i32;

/// Terrain source for chunks that are not resident yet.
#[derive(Clone, Debug)]
pub enum Generator {
    Empty,
    Flat {
        surface_y: i32,
        block: Block,
    },
    Noise {
        seed: i32,
        base_y: i32,
        amplitude: f32,
        frequency: f32,
        block: Block,
    },
}

impl Generator {
    fn terrain(&self) -> Option<FastNoiseLite> {
        match *self {
            Generator::Noise { seed, frequency, .. } => {
                let mut n = FastNoiseLite::with_seed(seed);
                n.set_noise_type(Some(NoiseType::OpenSimplex2));
                n.set_frequency(Some(frequency));
                Some(n)
            }
            _ => None,
        }
    }

    fn surface(&self, terrain: Option<&FastNoiseLite>, wx: i32) -> Option<(i32, Block)> {
        match *self {
            Generator::Empty => None,
            Generator::Flat { surface_y, block } => Some((surface_y, block)),
            Generator::Noise {
                base_y,
                amplitude,
                block,
                ..
            } => {
                let h = terrain.map_or(0.0, |n| n.get_noise_2d(wx as f32, 0.0));
                Some((base_y + (h * amplitude).round() as i32, block))
            }
        }
    }

    /// Height of the generated surface at `wx`, if the generator places any terrain.
    pub fn surface_height(&self, wx: i32) -> Option<i32> {
        let terrain = self.terrain();
        self.surface(terrain.as_ref(), wx).map(|(y, _)| y)
    }

    fn generate(&self, coord: ChunkCoord, bottom_y: i32) -> Chunk {
        let terrain = self.terrain();
        let (ox, _) = coord.origin();
        let surfaces: Vec<Option<(i32, Block)>> = (0..CHUNK_SIZE as i32)
            .map(|lx| self.surface(terrain.as_ref(), ox + lx))
            .collect();
        Chunk::filled_with(coord, |wx, wy| {
            if wy < bottom_y {
                return Block::AIR;
            }
            match surfaces[(wx - ox) as usize] {
                Some((top, b)) if wy <= top => b,
                _ => Block::AIR,
            }
        })
    }
}

/// Thread-safe in-memory world of square chunks.
pub struct GridWorld {
    registry: Arc<BlockRegistry>,
    generator: Generator,
    bottom_y: i32,
    chunks: RwLock<HashMap<ChunkCoord, Arc<Chunk>>>,
}

impl GridWorld {
    pub fn new(registry: Arc<BlockRegistry>, generator: Generator) -> Self {
        Self {
            registry,
            generator,
            bottom_y: DEFAULT_BOTTOM_Y,
            chunks: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_bottom_y(mut self, bottom_y: i32) -> Self {
        self.bottom_y = bottom_y;
        self
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn registry_arc(&self) -> Arc<BlockRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        self.chunks.read().unwrap().get(&coord).cloned()
    }

    /// Makes `coord` resident, generating it if needed. Returns the chunk and
    /// whether it was freshly created.
    pub fn load_chunk(&self, coord: ChunkCoord) -> (Arc<Chunk>, bool) {
        if let Some(c) = self.chunk(coord) {
            return (c, false);
        }
        let mut map = self.chunks.write().unwrap();
        let mut created = false;
        let chunk = map
            .entry(coord)
            .or_insert_with(|| {
                created = true;
                log::trace!("generating chunk ({}, {})", coord.cx, coord.cy);
                Arc::new(self.generator.generate(coord, self.bottom_y))
            })
            .clone();
        (chunk, created)
    }

    pub fn unload_chunk(&self, coord: ChunkCoord) -> bool {
        self.chunks.write().unwrap().remove(&coord).is_some()
    }

    pub fn loaded_chunks(&self) -> Vec<ChunkCoord> {
        let mut v: Vec<ChunkCoord> = self.chunks.read().unwrap().keys().copied().collect();
        v.sort();
        v
    }

    /// Writes a block, loading its chunk first. Returns the previous block.
    pub fn set_block(&self, wx: i32, wy: i32, b: Block) -> Block {
        assert!(
            wy >= self.bottom_y,
            "set_block at y={wy} below world bottom {}",
            self.bottom_y
        );
        let (chunk, _) = self.load_chunk(ChunkCoord::from_world(wx, wy));
        chunk.set_local(local_of(wx), local_of(wy), b)
    }

    /// Resident block at `(wx, wy)`, air when nothing is loaded there.
    pub fn block(&self, wx: i32, wy: i32) -> Block {
        self.get_raw_block(wx, wy, false).unwrap_or(Block::AIR)
    }

    /// Loads every chunk in the inclusive coordinate rectangle.
    pub fn load_area(&self, min: ChunkCoord, max: ChunkCoord) -> Vec<ChunkCoord> {
        let mut fresh = Vec::new();
        for cx in min.cx..=max.cx {
            for cy in min.cy..=max.cy {
                let coord = ChunkCoord::new(cx, cy);
                if self.load_chunk(coord).1 {
                    fresh.push(coord);
                }
            }
        }
        fresh
    }

    pub fn lowest_chunk_y(&self) -> i32 {
        chunk_of(self.bottom_y)
    }
}

impl WorldView for GridWorld {
    fn get_raw_block(&self, wx: i32, wy: i32, load_chunk: bool) -> Option<Block> {
        if wy < self.bottom_y {
            return None;
        }
        let coord = ChunkCoord::from_world(wx, wy);
        let chunk = match self.chunk(coord) {
            Some(c) => c,
            None if load_chunk => self.load_chunk(coord).0,
            None => return None,
        };
        Some(chunk.get_local(local_of(wx), local_of(wy)))
    }

    fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    fn is_chunk_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunks.read().unwrap().contains_key(&coord)
    }

    fn bottom_y(&self) -> i32 {
        self.bottom_y
    }
}
