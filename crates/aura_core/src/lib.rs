//! # AURA Core
//!
//! The two shared-state halves of the renderer:
//! - A fixed worker pool that both scene setup and the frame dispatcher
//!   feed with jobs
//! - A guarded, append-only scene store whose dirty flags let the render
//!   side copy only what changed
//!
//! ## Architecture Rules
//!
//! 1. **Two lock levels** - scene existence lock first, collection mutex second
//! 2. **Indices, not references** - entities name primitives by index
//! 3. **Recoverable errors are values** - capacity and load failures return `Err`
//!
//! ## Example
//!
//! ```rust,ignore
//! use aura_core::{Environment, Material, Primitive, Vertex};
//!
//! let env = Environment::default();
//! let red = env.add_material(Material::default())?;
//! let e = env.new_entity(red)?;
//! let a = env.add_vertex(Vertex::new(0.0, 0.0, 0.0))?;
//! let b = env.add_vertex(Vertex::new(1.0, 0.0, 0.0))?;
//! let c = env.add_vertex(Vertex::new(0.0, 1.0, 0.0))?;
//! env.entity_add_primitive(e, Primitive::triangle(a, b, c))?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod loader;
pub mod rng;
pub mod scene;
pub mod task;

pub use error::{
    Collection, LoadError, LoadResult, SceneError, SceneResult, TaskError, TaskResult,
};
pub use loader::{load_obj, ObjMesh};
pub use rng::SampleRng;
pub use scene::{
    Camera, Entity, EntityId, Environment, Material, MaterialId, MaterialKind, Primitive,
    PrimitiveId, PrimitiveKind, Scene, SceneCounts, SceneLimits, SceneReadGuard, Transform,
    TransformId, UpdateGuard, UpdateLock, Vertex, VertexId,
};
pub use task::{wait_all, TaskHandle, TaskPool, TaskPoolConfig, TaskPoolStats};
