//! # Scene
//!
//! One [`UpdateGuard`] per collection, each with its own mutex, so adding
//! a material never waits on a vertex append.

use super::guard::UpdateGuard;
use super::types::{Camera, Entity, Material, Primitive, SceneLimits, Transform, Vertex};

/// Aggregate of every guarded scene collection.
#[derive(Debug)]
pub struct Scene {
    /// Camera.
    pub camera: UpdateGuard<Camera>,
    /// Vertex positions.
    pub vertices: UpdateGuard<Vec<Vertex>>,
    /// Transforms, shared by entities and their primitives.
    pub transforms: UpdateGuard<Vec<Transform>>,
    /// Materials.
    pub materials: UpdateGuard<Vec<Material>>,
    /// Primitives.
    pub primitives: UpdateGuard<Vec<Primitive>>,
    /// Entities.
    pub entities: UpdateGuard<Vec<Entity>>,
    limits: SceneLimits,
}

impl Scene {
    /// Empty scene with room reserved up to `limits`.
    #[must_use]
    pub fn new(limits: SceneLimits) -> Self {
        Self {
            camera: UpdateGuard::new(Camera::default()),
            vertices: UpdateGuard::new(Vec::with_capacity(limits.vertices as usize)),
            transforms: UpdateGuard::new(Vec::with_capacity(limits.transforms as usize)),
            materials: UpdateGuard::new(Vec::with_capacity(limits.materials as usize)),
            primitives: UpdateGuard::new(Vec::with_capacity(limits.primitives as usize)),
            entities: UpdateGuard::new(Vec::with_capacity(limits.entities as usize)),
            limits,
        }
    }

    /// Capacity bounds.
    #[inline]
    #[must_use]
    pub fn limits(&self) -> SceneLimits {
        self.limits
    }

    /// Returns true if any collection has unpropagated writes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.camera.is_dirty()
            || self.vertices.is_dirty()
            || self.transforms.is_dirty()
            || self.materials.is_dirty()
            || self.primitives.is_dirty()
            || self.entities.is_dirty()
    }

    /// Item counts, for logging and assertions.
    #[must_use]
    pub fn counts(&self) -> SceneCounts {
        SceneCounts {
            vertices: self.vertices.len(),
            transforms: self.transforms.len(),
            materials: self.materials.len(),
            primitives: self.primitives.len(),
            entities: self.entities.len(),
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneLimits::default())
    }
}

/// Collection sizes at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneCounts {
    /// Vertices.
    pub vertices: usize,
    /// Transforms.
    pub transforms: usize,
    /// Materials.
    pub materials: usize,
    /// Primitives.
    pub primitives: usize,
    /// Entities.
    pub entities: usize,
}
