//! # Environment
//!
//! Owns the current [`Scene`] behind a shared/exclusive existence lock.
//!
//! ## Locking
//!
//! ```text
//!   level 1   Environment.scene   RwLock   shared: every mutator and reader
//!                                          exclusive: replace_scene only
//!   level 2   Scene.<collection>  Mutex    one per collection
//! ```
//!
//! Level 1 is always taken before level 2. Composite entity operations
//! take the entities mutex before the primitives or transforms mutex;
//! nothing takes them the other way round.

use super::store::Scene;
use super::types::{
    Camera, Entity, EntityId, Material, MaterialId, Primitive, PrimitiveId, SceneLimits,
    Transform, TransformId, Vertex, VertexId,
};
use crate::error::{Collection, LoadError, LoadResult, SceneResult};
use crate::loader;
use glam::Vec3;
use parking_lot::{RwLock, RwLockReadGuard};
use std::path::Path;

/// Shared read access to the current scene.
pub type SceneReadGuard<'a> = RwLockReadGuard<'a, Box<Scene>>;

/// Holder of the one live scene.
pub struct Environment {
    scene: RwLock<Box<Scene>>,
}

impl Environment {
    /// Environment with an empty scene bounded by `limits`.
    #[must_use]
    pub fn new(limits: SceneLimits) -> Self {
        Self {
            scene: RwLock::new(Box::new(Scene::new(limits))),
        }
    }

    /// Locks the scene for reading. Blocks `replace_scene` until dropped.
    pub fn read(&self) -> SceneReadGuard<'_> {
        self.scene.read()
    }

    /// Swaps in `scene`. The old scene is dropped after the lock is released.
    pub fn replace_scene(&self, scene: Box<Scene>) {
        let old = {
            let mut current = self.scene.write();
            std::mem::replace(&mut *current, scene)
        };
        tracing::debug!(old = ?old.counts(), "scene replaced");
        drop(old);
    }

    /// Capacity bounds of the current scene.
    #[must_use]
    pub fn limits(&self) -> SceneLimits {
        self.read().limits()
    }

    // ------------------------------------------------------------------
    // Appends
    // ------------------------------------------------------------------

    /// Appends a vertex.
    ///
    /// # Errors
    ///
    /// [`crate::SceneError::CapacityExceeded`] with nothing written.
    pub fn add_vertex(&self, vertex: Vertex) -> SceneResult<VertexId> {
        let scene = self.read();
        let limit = scene.limits().vertices;
        scene
            .vertices
            .append(vertex, limit, Collection::Vertices)
            .map(VertexId)
    }

    /// Appends a transform.
    ///
    /// # Errors
    ///
    /// [`crate::SceneError::CapacityExceeded`] with nothing written.
    pub fn add_transform(&self, transform: Transform) -> SceneResult<TransformId> {
        let scene = self.read();
        let limit = scene.limits().transforms;
        scene
            .transforms
            .append(transform, limit, Collection::Transforms)
            .map(TransformId)
    }

    /// Appends a material.
    ///
    /// # Errors
    ///
    /// [`crate::SceneError::CapacityExceeded`] with nothing written.
    pub fn add_material(&self, material: Material) -> SceneResult<MaterialId> {
        let scene = self.read();
        let limit = scene.limits().materials;
        scene
            .materials
            .append(material, limit, Collection::Materials)
            .map(MaterialId)
    }

    /// Appends a free-standing primitive.
    ///
    /// # Errors
    ///
    /// [`crate::SceneError::CapacityExceeded`] with nothing written.
    pub fn add_primitive(&self, primitive: Primitive) -> SceneResult<PrimitiveId> {
        let scene = self.read();
        let limit = scene.limits().primitives;
        scene
            .primitives
            .append(primitive, limit, Collection::Primitives)
            .map(PrimitiveId)
    }

    /// Appends an entity as-is.
    ///
    /// # Errors
    ///
    /// [`crate::SceneError::CapacityExceeded`] with nothing written.
    pub fn add_entity(&self, entity: Entity) -> SceneResult<EntityId> {
        let scene = self.read();
        let limit = scene.limits().entities;
        scene
            .entities
            .append(entity, limit, Collection::Entities)
            .map(EntityId)
    }

    // ------------------------------------------------------------------
    // Entity composites
    // ------------------------------------------------------------------

    /// Allocates a default transform and an empty entity using it.
    ///
    /// If the entity append fails the transform stays allocated.
    ///
    /// # Errors
    ///
    /// Capacity of either the transforms or the entities collection.
    pub fn new_entity(&self, material: MaterialId) -> SceneResult<EntityId> {
        let transform = self.add_transform(Transform::default())?;
        self.add_entity(Entity {
            transform,
            material,
            primitives: Vec::new(),
        })
    }

    /// Attaches `primitive` to `entity`, taking over its material and
    /// transform.
    ///
    /// # Panics
    ///
    /// If `entity` does not exist.
    ///
    /// # Errors
    ///
    /// Capacity of the primitives collection; the entity is unchanged.
    pub fn entity_add_primitive(
        &self,
        entity: EntityId,
        mut primitive: Primitive,
    ) -> SceneResult<PrimitiveId> {
        let scene = self.read();
        let mut entities = scene.entities.lock();
        let owner = &entities[entity.slot()];
        primitive.material = owner.material;
        primitive.transform = owner.transform;

        let id = scene
            .primitives
            .append(primitive, scene.limits().primitives, Collection::Primitives)
            .map(PrimitiveId)?;
        entities[entity.slot()].primitives.push(id);
        Ok(id)
    }

    /// Reassigns the entity's material and pushes it to every owned primitive.
    ///
    /// # Panics
    ///
    /// If `entity` does not exist.
    pub fn entity_material(&self, entity: EntityId, material: MaterialId) {
        let scene = self.read();
        let mut entities = scene.entities.lock();
        let owner = &mut entities[entity.slot()];
        owner.material = material;

        let mut primitives = scene.primitives.lock();
        for id in &owner.primitives {
            primitives[id.slot()].material = material;
        }
    }

    /// Sets the translation of the entity's transform.
    ///
    /// # Panics
    ///
    /// If `entity` does not exist.
    pub fn entity_translate(&self, entity: EntityId, offset: Vec3) {
        self.edit_entity_transform(entity, |t| t.set_translation(offset));
    }

    /// Sets the scaling of the entity's transform.
    ///
    /// # Panics
    ///
    /// If `entity` does not exist.
    pub fn entity_scale(&self, entity: EntityId, factors: Vec3) {
        self.edit_entity_transform(entity, |t| t.set_scaling(factors));
    }

    /// Sets the rotation of the entity's transform, Euler radians, X then Y
    /// then Z.
    ///
    /// # Panics
    ///
    /// If `entity` does not exist.
    pub fn entity_rotate(&self, entity: EntityId, radians: Vec3) {
        self.edit_entity_transform(entity, |t| t.set_rotation(radians));
    }

    fn edit_entity_transform(&self, entity: EntityId, edit: impl FnOnce(&mut Transform)) {
        let scene = self.read();
        let entities = scene.entities.lock();
        let transform = entities[entity.slot()].transform;
        scene.transforms.write(|transforms| edit(&mut transforms[transform.slot()]));
    }

    /// Loads an `.obj` model into `entity`.
    ///
    /// Every position becomes a vertex. Triangles map to one primitive,
    /// quads `(a, b, c, d)` to `(a, b, c)` and `(c, d, a)`.
    ///
    /// Returns the number of primitives added. On error, whatever was
    /// appended before the failure stays in the scene.
    ///
    /// # Errors
    ///
    /// Unsupported format or face arity, IO, parse or capacity errors.
    pub fn entity_load_model(&self, entity: EntityId, path: &Path) -> LoadResult<usize> {
        let mesh = loader::load_obj(path)?;

        let ids = mesh
            .positions
            .iter()
            .map(|&p| self.add_vertex(Vertex::from(p)))
            .collect::<SceneResult<Vec<_>>>()?;

        let mut added = 0;
        for face in &mesh.faces {
            let v = |n: usize| ids[face[n] as usize];
            match face.len() {
                3 => {
                    self.entity_add_primitive(entity, Primitive::triangle(v(0), v(1), v(2)))?;
                    added += 1;
                }
                4 => {
                    self.entity_add_primitive(entity, Primitive::triangle(v(0), v(1), v(2)))?;
                    self.entity_add_primitive(entity, Primitive::triangle(v(2), v(3), v(0)))?;
                    added += 2;
                }
                arity => return Err(LoadError::UnsupportedFace { arity }),
            }
        }

        tracing::debug!(%entity, vertices = ids.len(), primitives = added, "model loaded");
        Ok(added)
    }

    // ------------------------------------------------------------------
    // Camera
    // ------------------------------------------------------------------

    /// Edits the camera and marks it dirty.
    pub fn camera<R>(&self, edit: impl FnOnce(&mut Camera) -> R) -> R {
        self.read().camera.write(edit)
    }

    /// Copy of the current camera.
    #[must_use]
    pub fn camera_snapshot(&self) -> Camera {
        self.read().camera.read(|camera| *camera)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(SceneLimits::default())
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("counts", &self.read().counts())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SceneError;

    fn small_limits() -> SceneLimits {
        SceneLimits {
            vertices: 8,
            transforms: 2,
            materials: 2,
            primitives: 3,
            entities: 2,
        }
    }

    #[test]
    fn test_indices_follow_append_order() {
        let env = Environment::default();
        assert_eq!(env.add_material(Material::default()), Ok(MaterialId(0)));
        assert_eq!(env.add_material(Material::default()), Ok(MaterialId(1)));
        assert_eq!(env.add_vertex(Vertex::new(0.0, 0.0, 0.0)), Ok(VertexId(0)));
    }

    #[test]
    fn test_new_entity_allocates_transform() {
        let env = Environment::default();
        let e = env.new_entity(MaterialId(0)).unwrap();
        let scene = env.read();
        assert_eq!(scene.transforms.len(), 1);
        scene.entities.read(|entities| {
            assert_eq!(entities[e.slot()].transform, TransformId(0));
            assert!(entities[e.slot()].primitives.is_empty());
        });
    }

    #[test]
    fn test_primitive_capacity_leaves_entity_unchanged() {
        let env = Environment::new(small_limits());
        let e = env.new_entity(MaterialId(0)).unwrap();
        for _ in 0..3 {
            env.entity_add_primitive(e, Primitive::default()).unwrap();
        }
        let err = env.entity_add_primitive(e, Primitive::default()).unwrap_err();
        assert!(matches!(
            err,
            SceneError::CapacityExceeded {
                collection: Collection::Primitives,
                limit: 3
            }
        ));
        env.read()
            .entities
            .read(|entities| assert_eq!(entities[e.slot()].primitives.len(), 3));
    }

    #[test]
    fn test_transform_edits_hit_entity_transform() {
        let env = Environment::default();
        let _first = env.new_entity(MaterialId(0)).unwrap();
        let e = env.new_entity(MaterialId(0)).unwrap();
        env.read().transforms.propagate(|_| Ok::<_, ()>(())).unwrap();

        env.entity_translate(e, Vec3::new(1.0, 2.0, 3.0));
        env.entity_scale(e, Vec3::splat(2.0));

        let scene = env.read();
        assert!(scene.transforms.is_dirty());
        scene.transforms.read(|t| {
            assert_eq!(t[0], Transform::default());
            let p = t[1].matrix().transform_point3(Vec3::ZERO);
            assert_eq!(p, Vec3::new(1.0, 2.0, 3.0));
        });
    }

    #[test]
    fn test_camera_edit_marks_dirty() {
        let env = Environment::default();
        env.read().camera.propagate(|_| Ok::<_, ()>(())).unwrap();
        env.camera(|c| c.v_fov = 60.0);
        assert!(env.read().camera.is_dirty());
        assert!((env.camera_snapshot().v_fov - 60.0).abs() < f32::EPSILON);
    }
}
