//! # Scene Store
//!
//! ```text
//!   Environment ── RwLock<Box<Scene>>
//!                     └── Scene
//!                          ├── UpdateGuard<Camera>
//!                          ├── UpdateGuard<Vec<Vertex>>
//!                          ├── UpdateGuard<Vec<Transform>>
//!                          ├── UpdateGuard<Vec<Material>>
//!                          ├── UpdateGuard<Vec<Primitive>>
//!                          └── UpdateGuard<Vec<Entity>>
//! ```
//!
//! Collections are append-only and bounded by [`SceneLimits`].

mod environment;
mod guard;
mod store;
mod types;

pub use environment::{Environment, SceneReadGuard};
pub use guard::{UpdateGuard, UpdateLock};
pub use store::{Scene, SceneCounts};
pub use types::{
    Camera, Entity, EntityId, Material, MaterialId, MaterialKind, Primitive, PrimitiveId,
    PrimitiveKind, SceneLimits, Transform, TransformId, Vertex, VertexId,
};
