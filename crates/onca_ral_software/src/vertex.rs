//! The rasterizer's vertex format and primitive classification.
//!
//! Mirrors the original `GSVertexSW`: three 4-lane float vectors per vertex so that
//! every interpolated attribute (position+fog, texture, color) can be added/scaled
//! uniformly by the DDA code in `rasterizer`.

use std::ops::{Add, Mul, Sub};

use glam::Vec4;

/// One of the four primitive classes a draw can decompose into.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PrimitiveClass {
    Point,
    Line,
    Triangle,
    Sprite,
}

impl PrimitiveClass {
    /// The vertex count a draw's vertex array must be an exact multiple of.
    pub fn vertices_per_primitive(self) -> usize {
        match self {
            PrimitiveClass::Point => 1,
            PrimitiveClass::Line => 2,
            PrimitiveClass::Triangle => 3,
            PrimitiveClass::Sprite => 2,
        }
    }
}

/// A single rasterizer vertex.
///
/// - `p`: `(x, y, z, f)` — continuous screen-space x/y in pixels, raw depth, fog factor
/// - `t`: `(s, t, q, _)` — texture coordinates; `q` is `1/w` when perspective-correct,
///   otherwise the high lane carries a sprite's integer z
/// - `c`: `(r, g, b, a)` — color in 0-255, represented as a 7.0 fixed value
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct V {
    pub p: Vec4,
    pub t: Vec4,
    pub c: Vec4,
}

impl V {
    pub const ZERO: V = V { p: Vec4::ZERO, t: Vec4::ZERO, c: Vec4::ZERO };

    pub fn new(p: Vec4, t: Vec4, c: Vec4) -> Self {
        V { p, t, c }
    }
}

impl Add for V {
    type Output = V;
    fn add(self, rhs: V) -> V {
        V { p: self.p + rhs.p, t: self.t + rhs.t, c: self.c + rhs.c }
    }
}

impl Sub for V {
    type Output = V;
    fn sub(self, rhs: V) -> V {
        V { p: self.p - rhs.p, t: self.t - rhs.t, c: self.c - rhs.c }
    }
}

impl Mul<f32> for V {
    type Output = V;
    fn mul(self, rhs: f32) -> V {
        V { p: self.p * rhs, t: self.t * rhs, c: self.c * rhs }
    }
}

impl Mul<Vec4> for V {
    type Output = V;
    fn mul(self, rhs: Vec4) -> V {
        V { p: self.p * rhs, t: self.t * rhs, c: self.c * rhs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertices_per_primitive_matches_spec() {
        assert_eq!(PrimitiveClass::Point.vertices_per_primitive(), 1);
        assert_eq!(PrimitiveClass::Line.vertices_per_primitive(), 2);
        assert_eq!(PrimitiveClass::Triangle.vertices_per_primitive(), 3);
        assert_eq!(PrimitiveClass::Sprite.vertices_per_primitive(), 2);
    }

    #[test]
    fn lerp_via_add_mul_is_componentwise() {
        let a = V::new(Vec4::new(0.0, 0.0, 0.0, 0.0), Vec4::ZERO, Vec4::ZERO);
        let b = V::new(Vec4::new(10.0, 20.0, 0.0, 0.0), Vec4::ZERO, Vec4::ZERO);
        let mid = a + (b - a) * 0.5;
        assert_eq!(mid.p, Vec4::new(5.0, 10.0, 0.0, 0.0));
    }
}
