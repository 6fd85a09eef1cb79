use std::sync::Arc;

use lumen_blocks::{Block, BlockRegistry};
use lumen_geom::Vec2;
use lumen_lighting::sources::sky_sources;
use lumen_lighting::{
    LightCell, LightContext, LightingSettings, RES, RayOcclusion, SourceKind, ToneMapping,
    compute_cell, gather_sources, raw_light_map,
};
use lumen_lighting::cell::CellState;
use lumen_world::{ChunkCoord, ColumnMap, Generator, GridWorld};
use proptest::prelude::*;

const STONE: Block = Block::new(1);
const TORCH: Block = Block::new(3);

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn registry() -> Arc<BlockRegistry> {
    Arc::new(
        BlockRegistry::from_toml_str(
            r#"
            [[blocks]]
            name = "stone"
            id = 1

            [[blocks]]
            name = "leaves"
            id = 2
            solid = false
            light_opacity = 0.5

            [[blocks]]
            name = "torch"
            id = 3
            solid = false
            light_color = [1.0, 1.0, 1.0]

            [[blocks]]
            name = "red_torch"
            id = 4
            solid = false
            light_color = [1.0, 0.0, 0.0]
        "#,
        )
        .expect("registry"),
    )
}

struct Fixture {
    world: GridWorld,
    columns: ColumnMap,
}

impl Fixture {
    fn new(generator: Generator, bottom_y: i32) -> Self {
        let world = GridWorld::new(registry(), generator).with_bottom_y(bottom_y);
        world.load_area(ChunkCoord::new(-1, -1), ChunkCoord::new(1, 0));
        Self {
            world,
            columns: ColumnMap::new(),
        }
    }

    /// Underground room: stone roof at y = 10 across every loaded column.
    fn covered() -> Self {
        let f = Self::new(Generator::Empty, -16);
        for x in -16..32 {
            f.world.set_block(x, 10, STONE);
        }
        f
    }

    fn track_columns(&self) {
        for cx in -1..=1 {
            self.columns.get_or_create(cx).initialize(&self.world, 0);
        }
    }

    fn ctx<'a>(&'a self, settings: &'a LightingSettings) -> LightContext<'a> {
        LightContext {
            world: &self.world,
            columns: &self.columns,
            settings,
        }
    }
}

#[test]
fn open_sky_block_is_fully_bright() {
    init_logs();
    let f = Fixture::new(Generator::Empty, 0);
    f.track_columns();
    let settings = LightingSettings::default();
    let state = compute_cell(&f.ctx(&settings), 0, 0, &CellState::dark()).expect("changed");
    assert!(state.is_skylight);
    assert!(state.is_lit);
    assert_eq!(state.average, 1.0);
    for c in state.map.cells() {
        assert_eq!(*c, [1.0; 3]);
    }
}

#[test]
fn skylight_ignores_nearby_opaque_blocks() {
    let f = Fixture::covered();
    f.world.set_block(5, 12, STONE);
    f.world.set_block(7, 11, STONE);
    f.track_columns();
    let settings = LightingSettings::default();
    let state = compute_cell(&f.ctx(&settings), 6, 11, &CellState::dark()).expect("changed");
    assert!(state.is_skylight);
    assert_eq!(state.average, 1.0);
}

#[test]
fn single_white_source_linear_falloff() {
    init_logs();
    let f = Fixture::covered();
    f.world.set_block(0, 0, TORCH);
    f.track_columns();
    let settings = LightingSettings {
        lookup_radius: 8,
        occlusion: false,
        tone_mapping: ToneMapping::None,
        ..Default::default()
    };
    let ctx = f.ctx(&settings);
    let sources = gather_sources(&f.world, &f.columns, 3, 0, 8);
    assert_eq!(sources.len(), 1);
    assert_eq!((sources[0].x, sources[0].y), (0, 0));

    let raw = raw_light_map(&ctx, 3, 0, &sources);
    assert!((raw.average() - 0.625).abs() < 0.01, "got {}", raw.average());

    let state = compute_cell(&ctx, 3, 0, &CellState::dark()).expect("lit");
    assert!(state.is_lit && !state.is_skylight);
    assert!((state.average - 0.625).abs() < 0.01);
}

#[test]
fn opaque_wall_blocks_source_entirely() {
    let f = Fixture::covered();
    f.world.set_block(0, 0, TORCH);
    f.world.set_block(2, 0, STONE);
    f.track_columns();
    let rays = RayOcclusion::new(&f.world);
    let src = Vec2::block_center(0, 0);
    assert_eq!(rays.compute_attenuation(src, Vec2::block_center(4, 0)), 0.0);
    // slightly off-axis rays keep a trace well below one 8-bit step
    for sx in 0..RES {
        for sy in 0..RES {
            let (ox, oy) = lumen_lighting::LightMap::subcell_center(sx, sy);
            let dst = Vec2::new(4.0 + ox, oy);
            assert!(rays.compute_attenuation(src, dst) < 0.01);
        }
    }
    let settings = LightingSettings::default();
    let ctx = f.ctx(&settings);
    let sources = gather_sources(&f.world, &f.columns, 4, 0, 8);
    let raw = raw_light_map(&ctx, 4, 0, &sources);
    assert!(raw.average() < 0.5 / 255.0, "got {}", raw.average());
    let cell = LightCell::new();
    assert!(!cell.recalculate(&ctx, 4, 0));
    assert!(!cell.is_lit());
    assert_eq!(cell.average_brightness(), 0.0);
}

#[test]
fn no_reachable_source_stays_dark() {
    let f = Fixture::covered();
    f.world.set_block(0, 0, TORCH);
    f.track_columns();
    let settings = LightingSettings::default();
    let ctx = f.ctx(&settings);
    let cell = LightCell::new();
    cell.publish(CellState::skylight());
    assert!(cell.recalculate(&ctx, -12, -10));
    assert!(!cell.is_lit());
    assert!(!cell.is_skylight());
    assert_eq!(cell.average_brightness(), 0.0);
}

#[test]
fn recalculation_is_idempotent() {
    let f = Fixture::covered();
    f.world.set_block(0, 0, TORCH);
    f.world.set_block(2, 2, Block::new(2));
    f.track_columns();
    let settings = LightingSettings {
        tone_mapping: ToneMapping::ReinhardJodie,
        ..Default::default()
    };
    let ctx = f.ctx(&settings);
    let cell = LightCell::new();
    assert!(cell.recalculate(&ctx, 3, 3));
    let first = cell.snapshot();
    assert!(!cell.recalculate(&ctx, 3, 3));
    let second = cell.snapshot();
    assert!(Arc::ptr_eq(&first, &second));

    let again = compute_cell(&ctx, 3, 3, &CellState::dark()).expect("lit");
    for (a, b) in again.map.cells().iter().zip(first.map.cells()) {
        for i in 0..3 {
            assert_eq!(a[i].to_bits(), b[i].to_bits());
        }
    }
}

#[test]
fn tinted_sources_are_energy_compensated() {
    let f = Fixture::covered();
    f.world.set_block(0, 0, Block::new(4));
    f.track_columns();
    let on = LightingSettings {
        occlusion: false,
        ..Default::default()
    };
    let off = LightingSettings {
        tint_compensation: false,
        ..on.clone()
    };
    let sources = gather_sources(&f.world, &f.columns, 3, 0, 8);
    let with = raw_light_map(&f.ctx(&on), 3, 0, &sources);
    let without = raw_light_map(&f.ctx(&off), 3, 0, &sources);
    let r_with = with.get(0, 0)[0];
    let r_without = without.get(0, 0)[0];
    assert!((r_with - 3.0 * r_without).abs() < 1e-4);
    assert_eq!(with.get(0, 0)[1], 0.0);
}

#[test]
fn disabled_lighting_publishes_full_bright() {
    let f = Fixture::covered();
    f.track_columns();
    let settings = LightingSettings {
        enabled: false,
        ..Default::default()
    };
    let state = compute_cell(&f.ctx(&settings), -12, -10, &CellState::dark()).expect("bright");
    assert!(state.is_lit);
    assert!(!state.is_skylight);
    assert_eq!(state.average, 1.0);
}

#[test]
fn sunken_column_exposes_a_sky_shaft() {
    let f = Fixture::new(
        Generator::Flat {
            surface_y: 0,
            block: STONE,
        },
        -16,
    );
    for y in -4..=0 {
        f.world.set_block(3, y, Block::AIR);
    }
    f.track_columns();
    let sky = sky_sources(&f.columns, 3, -6, 8);
    assert!(sky.iter().all(|s| s.kind == SourceKind::Sky));
    for y in -4..=0 {
        assert!(sky.iter().any(|s| (s.x, s.y) == (3, y)), "missing shaft block y={y}");
    }
    // level neighbors only offer the block above their top
    assert!(sky.iter().any(|s| (s.x, s.y) == (5, 1)));
    assert!(!sky.iter().any(|s| s.x == 5 && s.y != 1));

    let settings = LightingSettings::default();
    let state = compute_cell(&f.ctx(&settings), 3, -5, &CellState::dark()).expect("lit");
    assert!(state.is_lit);
    assert!(!state.is_skylight);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn blocks_above_the_top_are_skylit(
        surface in -10i32..5,
        x in -15i32..30,
        dy in 1i32..10,
        wall in any::<bool>(),
    ) {
        let f = Fixture::new(Generator::Flat { surface_y: surface, block: STONE }, -16);
        let y = surface + dy;
        if wall {
            f.world.set_block(x + 1, y, STONE);
            f.world.set_block(x - 1, y + 1, STONE);
        }
        f.track_columns();
        let settings = LightingSettings::default();
        let state = compute_cell(&f.ctx(&settings), x, y, &CellState::dark()).expect("changed");
        prop_assert!(state.is_skylight);
        prop_assert_eq!(state.average, 1.0);
        for c in state.map.cells() {
            prop_assert_eq!(*c, [1.0; 3]);
        }
    }
}
