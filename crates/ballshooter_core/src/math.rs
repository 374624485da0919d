//! Vector math for ball positions and velocities.
//!
//! Balls are never stored as `Vec3`. The arenas hold flat `f32` triples and
//! `Vec3` is only a by-value view loaded from, and stored back to, an
//! `(array, index)` pair.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::COMPONENTS_PER_BALL;

/// 3D Vector - position, velocity, contact normal
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit Y vector
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Creates from array
    #[must_use]
    pub const fn from_array(arr: [f32; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }

    /// Loads ball `index` from a flat triple array.
    ///
    /// # Panics
    ///
    /// Panics if `index` is past the end of `data`.
    #[inline]
    #[must_use]
    pub fn load(data: &[f32], index: usize) -> Self {
        let base = index * COMPONENTS_PER_BALL;
        Self::from_array([data[base], data[base + 1], data[base + 2]])
    }

    /// Stores this vector as ball `index` of a flat triple array.
    ///
    /// # Panics
    ///
    /// Panics if `index` is past the end of `data`.
    #[inline]
    pub fn store(self, data: &mut [f32], index: usize) {
        let base = index * COMPONENTS_PER_BALL;
        data[base] = self.x;
        data[base + 1] = self.y;
        data[base + 2] = self.z;
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Returns true if every component is finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        let sum = a + b;
        assert_eq!(sum, Vec3::new(5.0, 7.0, 9.0));

        let dot = a.dot(b);
        assert_eq!(dot, 32.0); // 1*4 + 2*5 + 3*6

        assert_eq!(Vec3::new(3.0, 0.0, 4.0).length(), 5.0);
    }

    #[test]
    fn test_load_store_triples() {
        let mut data = vec![0.0_f32; 6];
        Vec3::new(1.0, 2.0, 3.0).store(&mut data, 1);

        assert_eq!(data, [0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
        assert_eq!(Vec3::load(&data, 1), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(Vec3::load(&data, 0), Vec3::ZERO);
        assert_eq!(Vec3::from_array(Vec3::load(&data, 1).to_array()), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_vec3_bytemuck() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        let bytes: &[u8] = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), 12); // 3 * 4 bytes
    }
}
