use std::sync::{Arc, LazyLock};

/// Subcells per block edge.
pub const RES: usize = 2;
pub const SUBCELLS: usize = RES * RES;

static FULLY_BRIGHT: LazyLock<Arc<LightMap>> = LazyLock::new(|| Arc::new(LightMap::splat(1.0)));
static FULLY_DARK: LazyLock<Arc<LightMap>> = LazyLock::new(|| Arc::new(LightMap::splat(0.0)));

/// `RES x RES` grid of RGB brightness for one block, indexed `sx * RES + sy`.
#[derive(Clone, Debug, PartialEq)]
pub struct LightMap {
    cells: [[f32; 3]; SUBCELLS],
}

impl Default for LightMap {
    fn default() -> Self {
        Self::splat(0.0)
    }
}

impl LightMap {
    pub fn splat(v: f32) -> Self {
        Self {
            cells: [[v; 3]; SUBCELLS],
        }
    }

    /// Shared map for cells in full light.
    pub fn fully_bright() -> Arc<LightMap> {
        Arc::clone(&FULLY_BRIGHT)
    }

    pub fn fully_dark() -> Arc<LightMap> {
        Arc::clone(&FULLY_DARK)
    }

    #[inline]
    pub fn idx(sx: usize, sy: usize) -> usize {
        assert!(sx < RES && sy < RES, "subcell ({sx}, {sy}) outside light map");
        sx * RES + sy
    }

    /// Offset of subcell `(sx, sy)`'s center from the block's min corner.
    #[inline]
    pub fn subcell_center(sx: usize, sy: usize) -> (f32, f32) {
        (
            (sx as f32 + 0.5) / RES as f32,
            (sy as f32 + 0.5) / RES as f32,
        )
    }

    #[inline]
    pub fn get(&self, sx: usize, sy: usize) -> [f32; 3] {
        self.cells[Self::idx(sx, sy)]
    }

    #[inline]
    pub fn get_mut(&mut self, sx: usize, sy: usize) -> &mut [f32; 3] {
        &mut self.cells[Self::idx(sx, sy)]
    }

    pub fn cells(&self) -> &[[f32; 3]; SUBCELLS] {
        &self.cells
    }

    /// Per-channel max merge.
    #[inline]
    pub fn accumulate_max(&mut self, sx: usize, sy: usize, rgb: [f32; 3]) {
        let c = self.get_mut(sx, sy);
        for i in 0..3 {
            c[i] = c[i].max(rgb[i]);
        }
    }

    pub fn map_channels(&mut self, mut f: impl FnMut([f32; 3]) -> [f32; 3]) {
        for c in self.cells.iter_mut() {
            *c = f(*c);
        }
    }

    pub fn clamp_unit(&mut self) {
        self.map_channels(|c| c.map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }));
    }

    /// Mean over every channel of every subcell.
    pub fn average(&self) -> f32 {
        let sum: f32 = self.cells.iter().flat_map(|c| c.iter()).sum();
        sum / (SUBCELLS * 3) as f32
    }

    /// Mean of one subcell's channels.
    #[inline]
    pub fn brightness(&self, sx: usize, sy: usize) -> f32 {
        let c = self.get(sx, sy);
        (c[0] + c[1] + c[2]) / 3.0
    }
}
