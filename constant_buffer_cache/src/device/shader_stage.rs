/// Shader stages, constant buffer slots and the (stage, slot) key

use std::fmt;

/// Programmable pipeline stage with its own constant buffer bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Geometry,
    Hull,
    Domain,
    Compute,
}

impl ShaderStage {
    /// Number of stages
    pub const COUNT: usize = 6;

    /// All stages, in index order
    pub const ALL: [ShaderStage; Self::COUNT] = [
        ShaderStage::Vertex,
        ShaderStage::Pixel,
        ShaderStage::Geometry,
        ShaderStage::Hull,
        ShaderStage::Domain,
        ShaderStage::Compute,
    ];

    /// Dense index in `0..COUNT`
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "Vertex",
            ShaderStage::Pixel => "Pixel",
            ShaderStage::Geometry => "Geometry",
            ShaderStage::Hull => "Hull",
            ShaderStage::Domain => "Domain",
            ShaderStage::Compute => "Compute",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical constant buffer binding slot
///
/// The discriminant is the binding register (`b0`, `b1`, ...) the slot is
/// bound to in every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderSlot {
    /// Per-draw (per-batch) parameters
    PerDraw,
    /// Legacy per-instance parameters
    PerInstance,
    /// Material parameters
    PerMaterial,
    /// Pass parameters (shadow pass, voxel pass, ...)
    PerPass,
    /// Frame-wide parameters
    PerFrame,
    /// Camera / view parameters
    PerView,
    /// Skinning dual quaternions, current frame
    SkinQuat,
    /// Skinning dual quaternions, previous frame (motion vectors)
    SkinQuatPrev,
}

impl ShaderSlot {
    /// Number of slots per stage
    pub const COUNT: usize = 8;

    /// All slots, in index order
    pub const ALL: [ShaderSlot; Self::COUNT] = [
        ShaderSlot::PerDraw,
        ShaderSlot::PerInstance,
        ShaderSlot::PerMaterial,
        ShaderSlot::PerPass,
        ShaderSlot::PerFrame,
        ShaderSlot::PerView,
        ShaderSlot::SkinQuat,
        ShaderSlot::SkinQuatPrev,
    ];

    /// Slots whose layout comes from shader reflection
    pub const REFLECTED: [ShaderSlot; 3] = [
        ShaderSlot::PerDraw,
        ShaderSlot::PerInstance,
        ShaderSlot::PerMaterial,
    ];

    /// Dense index in `0..COUNT`, also the binding register
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Whether shader reflection assigns parameters to this slot
    pub fn is_reflected(self) -> bool {
        Self::REFLECTED.contains(&self)
    }

    /// cbuffer name used in shader source
    pub fn name(self) -> &'static str {
        match self {
            ShaderSlot::PerDraw => "PER_BATCH",
            ShaderSlot::PerInstance => "PER_INSTANCE",
            ShaderSlot::PerMaterial => "PER_MATERIAL",
            ShaderSlot::PerPass => "PER_PASS",
            ShaderSlot::PerFrame => "PER_FRAME",
            ShaderSlot::PerView => "PER_VIEW",
            ShaderSlot::SkinQuat => "SKIN_DATA",
            ShaderSlot::SkinQuatPrev => "SKIN_DATA_PREV",
        }
    }
}

impl fmt::Display for ShaderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A (stage, slot) pair: one cell of the slot table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub stage: ShaderStage,
    pub slot: ShaderSlot,
}

impl SlotKey {
    pub fn new(stage: ShaderStage, slot: ShaderSlot) -> Self {
        Self { stage, slot }
    }

    /// Every key, stage-major
    pub fn all() -> impl Iterator<Item = SlotKey> {
        ShaderStage::ALL
            .into_iter()
            .flat_map(|stage| ShaderSlot::ALL.into_iter().map(move |slot| SlotKey::new(stage, slot)))
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stage, self.slot)
    }
}

impl From<(ShaderStage, ShaderSlot)> for SlotKey {
    fn from((stage, slot): (ShaderStage, ShaderSlot)) -> Self {
        Self::new(stage, slot)
    }
}

#[cfg(test)]
#[path = "shader_stage_tests.rs"]
mod tests;
