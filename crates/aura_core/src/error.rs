//! # Core Error Types
//!
//! All errors that can occur in the task pool, the scene store and the
//! model loader.

use thiserror::Error;

/// Scene collection names, used in capacity errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Vertex positions.
    Vertices,
    /// Entity and camera transforms.
    Transforms,
    /// Surface materials.
    Materials,
    /// Renderable primitives.
    Primitives,
    /// Primitive groupings.
    Entities,
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Vertices => "vertices",
            Self::Transforms => "transforms",
            Self::Materials => "materials",
            Self::Primitives => "primitives",
            Self::Entities => "entities",
        };
        f.write_str(name)
    }
}

/// Errors raised by scene mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The collection is at its bound. Nothing was written.
    #[error("{collection} at capacity ({limit})")]
    CapacityExceeded {
        /// Which collection rejected the append.
        collection: Collection,
        /// Configured bound of that collection.
        limit: u32,
    },
}

/// Errors raised while loading a model into an entity.
///
/// Whatever was appended before the failure stays in the scene.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Only `.obj` files are accepted.
    #[error("unsupported model format: {0}")]
    UnsupportedFormat(String),

    /// A face that is neither a triangle nor a quad.
    #[error("unsupported face with {arity} vertices")]
    UnsupportedFace {
        /// Number of vertices on the face.
        arity: usize,
    },

    /// The file could not be parsed.
    #[error("malformed model file: {0}")]
    Parse(String),

    /// The file could not be read.
    #[error("failed to read model: {0}")]
    Io(#[from] std::io::Error),

    /// The scene ran out of room mid-load.
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Errors raised by the task pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),

    /// The job panicked. The worker survived.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The job was dropped without producing a result.
    #[error("task result channel disconnected")]
    Disconnected,

    /// The pool no longer accepts work.
    #[error("task pool is shutting down")]
    ShuttingDown,
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Result type for model loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for task pool operations.
pub type TaskResult<T> = Result<T, TaskError>;
