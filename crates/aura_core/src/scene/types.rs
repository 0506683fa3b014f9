//! # Scene Types
//!
//! Plain data stored in the scene collections. Cross-collection links are
//! stable `u32` indices, never references, so growing a collection can
//! never invalidate them.

use glam::{Mat4, Vec3, Vec4};
use serde::Deserialize;

macro_rules! scene_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Index into the owning collection.
            #[inline]
            #[must_use]
            pub const fn index(self) -> u32 {
                self.0
            }

            /// Index as `usize`, for slice access.
            #[inline]
            #[must_use]
            pub const fn slot(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

scene_id!(
    /// Index into the vertex collection.
    VertexId
);
scene_id!(
    /// Index into the transform collection.
    TransformId
);
scene_id!(
    /// Index into the material collection.
    MaterialId
);
scene_id!(
    /// Index into the primitive collection.
    PrimitiveId
);
scene_id!(
    /// Index into the entity collection.
    EntityId
);

/// Homogeneous vertex position (w = 1).
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Position, w = 1.
    pub position: Vec4,
}

impl Vertex {
    /// Vertex at `(x, y, z)`.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec4::new(x, y, z, 1.0),
        }
    }
}

impl From<Vec3> for Vertex {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Translation, rotation and scaling kept apart so each can be set alone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation matrix.
    pub translation: Mat4,
    /// Rotation matrix.
    pub rotation: Mat4,
    /// Scaling matrix.
    pub scaling: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Mat4::IDENTITY,
            rotation: Mat4::IDENTITY,
            scaling: Mat4::IDENTITY,
        }
    }
}

impl Transform {
    /// Combined matrix, `translation * rotation * scaling`.
    #[inline]
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        self.translation * self.rotation * self.scaling
    }

    /// Sets the translation.
    pub fn set_translation(&mut self, offset: Vec3) {
        self.translation = Mat4::from_translation(offset);
    }

    /// Sets the scaling.
    pub fn set_scaling(&mut self, factors: Vec3) {
        self.scaling = Mat4::from_scale(factors);
    }

    /// Sets the rotation from Euler angles in radians, applied X then Y then Z.
    pub fn set_rotation(&mut self, radians: Vec3) {
        self.rotation = Mat4::from_rotation_z(radians.z)
            * Mat4::from_rotation_y(radians.y)
            * Mat4::from_rotation_x(radians.x);
    }
}

/// Surface response model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[repr(u32)]
pub enum MaterialKind {
    /// Lambertian.
    #[default]
    Diffuse = 0,
    /// Mirror, roughened by `fuzz`.
    Specular = 1,
    /// Glass-like, uses `refraction`.
    Dielectric = 2,
    /// Light source.
    Emissive = 3,
}

/// Surface material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// RGBA colour.
    pub colour: Vec4,
    /// Response model.
    pub kind: MaterialKind,
    /// Refraction index for dielectrics.
    pub refraction: f32,
    /// Reflection blur for speculars.
    pub fuzz: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            colour: Vec4::ONE,
            kind: MaterialKind::Diffuse,
            refraction: 1.3,
            fuzz: 0.0,
        }
    }
}

impl Material {
    /// Material of `kind` with an opaque `rgb` colour.
    #[must_use]
    pub fn new(kind: MaterialKind, rgb: Vec3) -> Self {
        Self {
            colour: rgb.extend(1.0),
            kind,
            ..Self::default()
        }
    }
}

/// Primitive shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PrimitiveKind {
    /// Three vertices.
    #[default]
    Triangle = 0,
    /// Axis-aligned box spanned by vertices 0 (min) and 1 (max).
    Cuboid = 1,
    /// Centre at vertex 0, radius in `real`.
    Sphere = 2,
}

/// One renderable shape.
///
/// `material` and `transform` mirror the owning entity and are overwritten
/// when the primitive is attached.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Primitive {
    /// Shape.
    pub kind: PrimitiveKind,
    /// Material, copied from the owning entity.
    pub material: MaterialId,
    /// Transform, copied from the owning entity.
    pub transform: TransformId,
    /// Shape scalar (sphere radius).
    pub real: f32,
    /// Vertex indices; unused slots are 0.
    pub vertices: [u32; 4],
}

impl Primitive {
    /// Triangle over three vertices.
    #[must_use]
    pub const fn triangle(a: VertexId, b: VertexId, c: VertexId) -> Self {
        Self {
            kind: PrimitiveKind::Triangle,
            material: MaterialId(0),
            transform: TransformId(0),
            real: 0.0,
            vertices: [a.0, b.0, c.0, 0],
        }
    }

    /// Axis-aligned box between two corner vertices.
    #[must_use]
    pub const fn cuboid(min: VertexId, max: VertexId) -> Self {
        Self {
            kind: PrimitiveKind::Cuboid,
            material: MaterialId(0),
            transform: TransformId(0),
            real: 0.0,
            vertices: [min.0, max.0, 0, 0],
        }
    }

    /// Sphere around a centre vertex.
    #[must_use]
    pub const fn sphere(centre: VertexId, radius: f32) -> Self {
        Self {
            kind: PrimitiveKind::Sphere,
            material: MaterialId(0),
            transform: TransformId(0),
            real: radius,
            vertices: [centre.0, 0, 0, 0],
        }
    }
}

/// Group of primitives sharing one transform and, initially, one material.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Entity {
    /// Shared transform.
    pub transform: TransformId,
    /// Material pushed down to every primitive.
    pub material: MaterialId,
    /// Owned primitives.
    pub primitives: Vec<PrimitiveId>,
}

/// Thin-lens camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Eye position.
    pub look_from: Vec3,
    /// Target point.
    pub look_at: Vec3,
    /// Up direction.
    pub v_up: Vec3,
    /// Vertical field of view in degrees.
    pub v_fov: f32,
    /// Lens aperture.
    pub aperture: f32,
    /// Focus distance.
    pub focus: f32,
    /// Applied to eye, target and up before the basis is built.
    pub transform: Transform,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            look_from: Vec3::new(0.0, 0.0, -2.0),
            look_at: Vec3::ZERO,
            v_up: Vec3::Y,
            v_fov: 45.0,
            aperture: 1.0,
            focus: 2.0,
            transform: Transform::default(),
        }
    }
}

/// Capacity bound of every scene collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SceneLimits {
    /// Maximum vertices.
    pub vertices: u32,
    /// Maximum transforms.
    pub transforms: u32,
    /// Maximum materials.
    pub materials: u32,
    /// Maximum primitives.
    pub primitives: u32,
    /// Maximum entities.
    pub entities: u32,
}

impl Default for SceneLimits {
    fn default() -> Self {
        Self {
            vertices: 4000,
            transforms: 256,
            materials: 256,
            primitives: 4000,
            entities: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_order() {
        let mut t = Transform::default();
        t.set_translation(Vec3::new(1.0, 0.0, 0.0));
        t.set_scaling(Vec3::splat(2.0));
        // Scale first, then translate.
        let p = t.matrix().transform_point3(Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Vec3::new(3.0, 2.0, 2.0));
    }

    #[test]
    fn test_rotation_x_then_y() {
        let mut t = Transform::default();
        let quarter = std::f32::consts::FRAC_PI_2;
        t.set_rotation(Vec3::new(quarter, quarter, 0.0));
        // +Y rotated about X lands on +Z, which rotated about Y lands on +X.
        let p = t.matrix().transform_vector3(Vec3::Y);
        assert!((p - Vec3::X).length() < 1e-5, "got {p:?}");
    }

    #[test]
    fn test_vertex_is_pod() {
        let v = [Vertex::new(1.0, 2.0, 3.0)];
        let bytes: &[u8] = bytemuck::cast_slice(&v);
        assert_eq!(bytes.len(), 16);
    }
}
