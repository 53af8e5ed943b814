/// Constant register: the addressable unit of a constant buffer

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// Size of one register in bytes (4 x f32)
pub const REGISTER_SIZE: u64 = 16;

/// Largest register count a slot may request (16-bit capacity field)
pub const MAX_REGISTER_COUNT: u32 = u16::MAX as u32;

/// One 4-component float vector
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Register(pub [f32; 4]);

impl Register {
    pub const ZERO: Register = Register([0.0; 4]);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self([x, y, z, w])
    }

    pub const fn splat(v: f32) -> Self {
        Self([v; 4])
    }

    /// Pack a matrix as four row registers (row-major constant layout)
    pub fn from_mat4_rows(m: &Mat4) -> [Register; 4] {
        [
            m.row(0).into(),
            m.row(1).into(),
            m.row(2).into(),
            m.row(3).into(),
        ]
    }

    /// Byte size of `count` registers
    pub fn bytes_for(count: u32) -> u64 {
        count as u64 * REGISTER_SIZE
    }
}

impl From<Vec4> for Register {
    fn from(v: Vec4) -> Self {
        Self(v.to_array())
    }
}

impl From<Register> for Vec4 {
    fn from(r: Register) -> Self {
        Vec4::from_array(r.0)
    }
}

impl From<[f32; 4]> for Register {
    fn from(v: [f32; 4]) -> Self {
        Self(v)
    }
}

/// Copy a run of registers into mapped constant memory
///
/// `dst` and `src` must have the same length; callers slice both beforehand.
pub fn copy_registers(dst: &mut [Register], src: &[Register]) {
    dst.copy_from_slice(src);
}

#[cfg(test)]
#[path = "register_tests.rs"]
mod tests;
