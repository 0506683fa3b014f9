//! # Device Records
//!
//! `#[repr(C)]` mirrors of the scene types, laid out the way the compute
//! shaders read them (std430, vec4-aligned). Uploads are plain
//! `bytemuck::cast_slice` copies of these.

use aura_core::{Material, Primitive, Transform};
use bytemuck::{Pod, Zeroable};

/// Combined transform and its inverse.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct GpuTransform {
    /// `translation * rotation * scaling`, column-major.
    pub matrix: [[f32; 4]; 4],
    /// Inverse of `matrix`, used to bring rays into object space.
    pub inverse: [[f32; 4]; 4],
}

impl From<&Transform> for GpuTransform {
    fn from(transform: &Transform) -> Self {
        let matrix = transform.matrix();
        Self {
            matrix: matrix.to_cols_array_2d(),
            inverse: matrix.inverse().to_cols_array_2d(),
        }
    }
}

/// Material as the shade/scatter stage reads it.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct GpuMaterial {
    /// RGBA colour.
    pub colour: [f32; 4],
    /// `MaterialKind` discriminant.
    pub kind: u32,
    /// Refraction index.
    pub refraction: f32,
    /// Specular blur.
    pub fuzz: f32,
    _pad: u32,
}

impl From<&Material> for GpuMaterial {
    fn from(material: &Material) -> Self {
        Self {
            colour: material.colour.to_array(),
            kind: material.kind as u32,
            refraction: material.refraction,
            fuzz: material.fuzz,
            _pad: 0,
        }
    }
}

/// Primitive as the intersect stage reads it.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct GpuPrimitive {
    /// Vertex indices.
    pub vertices: [u32; 4],
    /// `PrimitiveKind` discriminant.
    pub kind: u32,
    /// Material index.
    pub material: u32,
    /// Transform index.
    pub transform: u32,
    /// Sphere radius.
    pub real: f32,
}

impl From<&Primitive> for GpuPrimitive {
    fn from(primitive: &Primitive) -> Self {
        Self {
            vertices: primitive.vertices,
            kind: primitive.kind as u32,
            material: primitive.material.index(),
            transform: primitive.transform.index(),
            real: primitive.real,
        }
    }
}

/// Per-frame ray parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct RenderSettings {
    /// Closest accepted hit.
    pub t_min: f32,
    /// Farthest accepted hit.
    pub t_max: f32,
    /// Samples per pixel.
    pub samples: u32,
    /// Bounces per sample.
    pub bounces: u32,
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
    _pad: [u32; 2],
}

impl RenderSettings {
    /// Settings record for one frame.
    #[must_use]
    pub const fn new(
        t_min: f32,
        t_max: f32,
        samples: u32,
        bounces: u32,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            t_min,
            t_max,
            samples,
            bounces,
            width,
            height,
            _pad: [0; 2],
        }
    }
}

/// Push constants for ray generation.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct RayGenPush {
    /// Sub-pixel offset, zero without anti-aliasing.
    pub jitter: [f32; 2],
    /// Sample index.
    pub sample: u32,
    /// 1 if `jitter` applies.
    pub jittered: u32,
}

/// Push constants for intersection.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct IntersectPush {
    /// Sample index.
    pub sample: u32,
    /// Bounce index.
    pub bounce: u32,
    /// Primitives to test.
    pub primitive_count: u32,
    _pad: u32,
}

impl IntersectPush {
    /// Push block for one intersect dispatch.
    #[must_use]
    pub const fn new(sample: u32, bounce: u32, primitive_count: u32) -> Self {
        Self {
            sample,
            bounce,
            primitive_count,
            _pad: 0,
        }
    }
}

/// Push constants for shading and scattering.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ShadeScatterPush {
    /// Point in the unit sphere, w unused.
    pub scatter: [f32; 4],
    /// Sample index.
    pub sample: u32,
    /// Bounce index.
    pub bounce: u32,
    _pad: [u32; 2],
}

impl ShadeScatterPush {
    /// Push block for one shade/scatter dispatch.
    #[must_use]
    pub const fn new(scatter: [f32; 4], sample: u32, bounce: u32) -> Self {
        Self {
            scatter,
            sample,
            bounce,
            _pad: [0; 2],
        }
    }
}

/// Push constants for the post-process resolve.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct PostProcessPush {
    /// Samples to average.
    pub samples: u32,
    /// Frame index, low 32 bits.
    pub frame: u32,
    _pad: [u32; 2],
}

impl PostProcessPush {
    /// Push block for the resolve dispatch.
    #[must_use]
    pub const fn new(samples: u32, frame: u32) -> Self {
        Self {
            samples,
            frame,
            _pad: [0; 2],
        }
    }
}

/// Converts `items` into device records and returns their bytes.
pub fn encode<T, G>(items: &[T]) -> Vec<u8>
where
    G: Pod + for<'a> From<&'a T>,
{
    let records: Vec<G> = items.iter().map(G::from).collect();
    bytemuck::cast_slice(&records).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::{MaterialKind, VertexId};
    use glam::{Mat4, Vec3};

    #[test]
    fn test_record_sizes_are_vec4_aligned() {
        assert_eq!(std::mem::size_of::<GpuTransform>(), 128);
        assert_eq!(std::mem::size_of::<GpuMaterial>(), 32);
        assert_eq!(std::mem::size_of::<GpuPrimitive>(), 32);
        assert_eq!(std::mem::size_of::<RenderSettings>(), 32);
        assert_eq!(std::mem::size_of::<ShadeScatterPush>() % 16, 0);
    }

    #[test]
    fn test_transform_inverse() {
        let mut transform = Transform::default();
        transform.set_translation(Vec3::new(1.0, 2.0, 3.0));
        transform.set_scaling(Vec3::splat(2.0));
        let record = GpuTransform::from(&transform);
        let product =
            Mat4::from_cols_array_2d(&record.matrix) * Mat4::from_cols_array_2d(&record.inverse);
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }

    #[test]
    fn test_encode_primitives() {
        let prims = [
            Primitive::triangle(VertexId(0), VertexId(1), VertexId(2)),
            Primitive::sphere(VertexId(3), 0.5),
        ];
        let bytes = encode::<_, GpuPrimitive>(&prims);
        assert_eq!(bytes.len(), 64);

        let first: GpuPrimitive = bytemuck::pod_read_unaligned(&bytes[..32]);
        let second: GpuPrimitive = bytemuck::pod_read_unaligned(&bytes[32..]);
        assert_eq!(first.vertices, [0, 1, 2, 0]);
        assert_eq!(second.kind, 2);
        assert!((second.real - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_material_kind_discriminant() {
        let m = Material::new(MaterialKind::Emissive, Vec3::ONE);
        assert_eq!(GpuMaterial::from(&m).kind, 3);
    }
}
