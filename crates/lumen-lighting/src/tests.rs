use super::light_map::SUBCELLS;
use super::settings::{IntensityMapping, LightingSettings, ToneMapping};
use super::tone::{falloff, tone_map, tone_map_rgb};
use super::*;
use proptest::prelude::*;
use std::sync::Arc;

#[test]
fn sentinel_maps_are_shared() {
    assert!(Arc::ptr_eq(&LightMap::fully_bright(), &LightMap::fully_bright()));
    assert!(Arc::ptr_eq(&LightMap::fully_dark(), &LightMap::fully_dark()));
    assert_eq!(LightMap::fully_bright().average(), 1.0);
    assert_eq!(LightMap::fully_dark().average(), 0.0);
}

#[test]
fn subcell_centers_sit_inside_block() {
    for sx in 0..RES {
        for sy in 0..RES {
            let (x, y) = LightMap::subcell_center(sx, sy);
            assert!(x > 0.0 && x < 1.0 && y > 0.0 && y < 1.0);
        }
    }
    assert_eq!(LightMap::subcell_center(0, 1), (0.25, 0.75));
    assert_eq!(LightMap::idx(1, 0), RES);
}

#[test]
fn accumulate_keeps_brightest_per_channel() {
    let mut m = LightMap::default();
    m.accumulate_max(0, 0, [0.2, 0.9, 0.1]);
    m.accumulate_max(0, 0, [0.5, 0.3, 0.1]);
    assert_eq!(m.get(0, 0), [0.5, 0.9, 0.1]);
    assert_eq!(m.get(1, 1), [0.0; 3]);
}

#[test]
fn falloff_shapes() {
    let r = 8.0;
    assert!((falloff(IntensityMapping::Linear, 9.0, r) - 0.625).abs() < 1e-6);
    assert_eq!(falloff(IntensityMapping::Linear, 0.0, r), 1.0);
    assert_eq!(falloff(IntensityMapping::Linear, 100.0, r), 0.0);
    assert_eq!(falloff(IntensityMapping::Smoothstep, 64.0, r), 0.0);
    assert_eq!(falloff(IntensityMapping::SmoothstepSquared, 0.0, r), 1.0);
    // squared-distance variant stays brighter at mid range
    let lin = falloff(IntensityMapping::Smoothstep, 16.0, r);
    let sq = falloff(IntensityMapping::SmoothstepSquared, 16.0, r);
    assert!(sq > lin);
}

#[test]
fn tone_operators_at_known_points() {
    assert_eq!(tone_map_rgb(ToneMapping::None, 1.0, [2.0, 0.5, 0.0]), [2.0, 0.5, 0.0]);
    assert_eq!(tone_map_rgb(ToneMapping::Reinhard, 1.0, [1.0; 3]), [0.5; 3]);
    let ext = tone_map_rgb(ToneMapping::ReinhardExtended, 2.0, [2.0; 3]);
    assert!((ext[0] - 1.0).abs() < 1e-6);
}

#[test]
fn settings_parse_and_validate() {
    let s = LightingSettings::from_toml_str(
        r#"
        tone_mapping = "reinhard_jodie"
        intensity_mapping = "smoothstep_squared"
        lookup_radius = 6
    "#,
    )
    .expect("settings");
    assert_eq!(s.tone_mapping, ToneMapping::ReinhardJodie);
    assert_eq!(s.intensity_mapping, IntensityMapping::SmoothstepSquared);
    assert_eq!(s.radius(), 6);
    assert!(s.occlusion);

    assert!(LightingSettings::from_toml_str("lookup_radius = 0").is_err());
    assert!(LightingSettings::from_toml_str("intensity_multiplier = -1.0").is_err());
    assert!(LightingSettings::from_toml_str("tone_mapping = \"aces\"").is_err());
}

#[test]
fn cell_state_comparison_is_by_value() {
    let mut a = LightMap::default();
    a.accumulate_max(1, 0, [0.25; 3]);
    let s1 = CellState {
        is_skylight: false,
        is_lit: true,
        average: a.average(),
        map: Arc::new(a.clone()),
    };
    let s2 = CellState {
        map: Arc::new(a),
        ..s1.clone()
    };
    assert!(s1.same_as(&s2));
    assert!(!s1.same_as(&CellState::dark()));
    assert!(CellState::dark().same_as(&CellState::dark()));
}

fn channel() -> impl Strategy<Value = f32> {
    0.0f32..50.0
}

fn tone_op() -> impl Strategy<Value = ToneMapping> {
    prop_oneof![
        Just(ToneMapping::None),
        Just(ToneMapping::Reinhard),
        Just(ToneMapping::ReinhardExtended),
        Just(ToneMapping::ReinhardJodie),
    ]
}

proptest! {
    #[test]
    fn tone_mapped_maps_stay_in_unit_range(
        op in tone_op(),
        wp in 0.5f32..8.0,
        vals in proptest::collection::vec((channel(), channel(), channel()), SUBCELLS),
    ) {
        let settings = LightingSettings { tone_mapping: op, white_point: wp, ..Default::default() };
        let mut m = LightMap::default();
        for (i, (r, g, b)) in vals.into_iter().enumerate() {
            m.accumulate_max(i / RES, i % RES, [r, g, b]);
        }
        tone_map(&mut m, &settings);
        for c in m.cells() {
            for v in c {
                prop_assert!((0.0..=1.0).contains(v));
            }
        }
        let avg = m.average();
        prop_assert!((0.0..=1.0).contains(&avg));
    }

    #[test]
    fn reinhard_is_monotonic(a in channel(), b in channel()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let tl = tone_map_rgb(ToneMapping::Reinhard, 1.0, [lo; 3])[0];
        let th = tone_map_rgb(ToneMapping::Reinhard, 1.0, [hi; 3])[0];
        prop_assert!(tl <= th);
    }

    #[test]
    fn falloff_is_bounded(d2 in 0.0f32..200.0, r in 1.0f32..32.0) {
        for m in [IntensityMapping::Linear, IntensityMapping::Smoothstep, IntensityMapping::SmoothstepSquared] {
            let f = falloff(m, d2, r);
            prop_assert!((0.0..=1.0).contains(&f));
        }
    }
}
