use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use lumen_blocks::{Block, BlockRegistry};
use lumen_lighting::{ChunkLight, LightContext, LightingSettings};
use lumen_world::{ChunkCoord, ColumnMap, Generator, GridWorld};

fn load_registry() -> BlockRegistry {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    BlockRegistry::load_from_path(root.join("../../assets/blocks.toml")).unwrap()
}

fn setup() -> (GridWorld, ColumnMap) {
    let reg = Arc::new(load_registry());
    let stone = reg.make_block_by_name("stone").unwrap();
    let torch = reg.make_block_by_name("torch").unwrap();
    let world = GridWorld::new(
        reg,
        Generator::Noise {
            seed: 0xC0FFEE,
            base_y: 8,
            amplitude: 6.0,
            frequency: 0.05,
            block: stone,
        },
    );
    world.load_area(ChunkCoord::new(-1, -2), ChunkCoord::new(1, 1));
    // carve a lit cave through the middle chunk
    for x in 2..14 {
        for y in -12..-6 {
            world.set_block(x, y, Block::AIR);
        }
    }
    world.set_block(4, -12, torch);
    world.set_block(11, -12, torch);
    let columns = ColumnMap::new();
    for cx in -1..=1 {
        columns.get_or_create(cx).initialize(&world, 1);
    }
    (world, columns)
}

fn bench_chunk_full_recalc(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_full_recalc");
    let (world, columns) = setup();
    for (name, occlusion) in [("occlusion", true), ("no_occlusion", false)] {
        let settings = LightingSettings {
            occlusion,
            ..Default::default()
        };
        let ctx = LightContext {
            world: &world,
            columns: &columns,
            settings: &settings,
        };
        group.bench_function(name, |b| {
            b.iter(|| {
                let chunk = ChunkLight::new(ChunkCoord::new(0, -1));
                let generation = chunk.begin_full();
                black_box(chunk.recalc_full(&ctx, generation));
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_chunk_full_recalc);
criterion_main!(benches);
