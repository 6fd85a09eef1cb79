use serde::Deserialize;

pub type BlockId = u16;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Block {
    pub id: BlockId,
}

impl Block {
    pub const AIR: Block = Block { id: 0 };

    #[inline]
    pub const fn new(id: BlockId) -> Self {
        Self { id }
    }

    #[inline]
    pub fn is_air(self) -> bool {
        self.id == 0
    }
}

/// Linear RGB tint of an emitted light, each channel in `[0,1]`.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "[f32; 3]")]
pub struct LightColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl LightColor {
    pub const WHITE: LightColor = LightColor { r: 1.0, g: 1.0, b: 1.0 };

    #[inline]
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    #[inline]
    pub fn energy(self) -> f32 {
        self.r + self.g + self.b
    }

    /// Scale that brings a tinted light up to the total energy of white light.
    /// A black tint carries no energy to compensate, so it is treated as white.
    #[inline]
    pub fn compensation(self) -> f32 {
        let e = self.energy();
        if e <= f32::EPSILON { 1.0 } else { 3.0 / e }
    }

    #[inline]
    pub fn channels(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for LightColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 3]> for LightColor {
    fn from(v: [f32; 3]) -> Self {
        LightColor::new(v[0], v[1], v[2])
    }
}
