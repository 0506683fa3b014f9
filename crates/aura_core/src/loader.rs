//! # OBJ Loader
//!
//! Reads positions and untriangulated faces with `tobj`. Face arity is
//! preserved so the scene side can accept triangles and quads and reject
//! everything else.

use crate::error::{LoadError, LoadResult};
use glam::Vec3;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Geometry read from one OBJ file, all models flattened together.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjMesh {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Faces as indices into `positions`, in file order.
    pub faces: Vec<Vec<u32>>,
}

impl ObjMesh {
    /// Total number of faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// Returns true if `path` has an `.obj` extension (any case).
#[must_use]
pub fn is_obj(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"))
}

/// Loads an OBJ file from disk.
///
/// # Errors
///
/// - [`LoadError::UnsupportedFormat`] for anything but `.obj`
/// - [`LoadError::Io`] if the file cannot be opened
/// - [`LoadError::Parse`] on malformed content
pub fn load_obj(path: &Path) -> LoadResult<ObjMesh> {
    if !is_obj(path) {
        return Err(LoadError::UnsupportedFormat(path.display().to_string()));
    }
    let mut reader = BufReader::new(File::open(path)?);
    read_obj(&mut reader)
}

/// Parses OBJ content from any buffered reader.
///
/// Material libraries are ignored.
///
/// # Errors
///
/// [`LoadError::Parse`] on malformed content.
pub fn read_obj(reader: &mut impl BufRead) -> LoadResult<ObjMesh> {
    let options = tobj::LoadOptions {
        triangulate: false,
        single_index: false,
        ..Default::default()
    };
    let (models, _materials) =
        tobj::load_obj_buf(reader, &options, |_| Err(tobj::LoadError::OpenFileFailed))
            .map_err(|e| LoadError::Parse(e.to_string()))?;

    let mut mesh = ObjMesh::default();
    for model in &models {
        let m = &model.mesh;
        #[allow(clippy::cast_possible_truncation)]
        let base = mesh.positions.len() as u32;

        mesh.positions.extend(
            m.positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2])),
        );

        // Empty arities means every face is a triangle.
        let arities: Vec<usize> = if m.face_arities.is_empty() {
            vec![3; m.indices.len() / 3]
        } else {
            m.face_arities.iter().map(|&a| a as usize).collect()
        };

        let mut cursor = 0;
        for arity in arities {
            let Some(face) = m.indices.get(cursor..cursor + arity) else {
                return Err(LoadError::Parse(format!(
                    "face index list truncated in model '{}'",
                    model.name
                )));
            };
            mesh.faces.push(face.iter().map(|&i| base + i).collect());
            cursor += arity;
        }
    }

    tracing::debug!(
        models = models.len(),
        positions = mesh.positions.len(),
        faces = mesh.faces.len(),
        "parsed obj"
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_keeps_face_arity() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\nf 1 2 3\n";
        let mesh = read_obj(&mut Cursor::new(src)).unwrap();
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.faces, vec![vec![0, 1, 2, 3], vec![0, 1, 2]]);
    }

    #[test]
    fn test_extension_check() {
        assert!(is_obj(Path::new("cube.obj")));
        assert!(is_obj(Path::new("CUBE.OBJ")));
        assert!(!is_obj(Path::new("cube.ply")));
        assert!(!is_obj(Path::new("cube")));
        assert!(matches!(
            load_obj(Path::new("cube.ply")),
            Err(LoadError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_malformed_position() {
        let src = "v 0 zero 0\n";
        assert!(matches!(
            read_obj(&mut Cursor::new(src)),
            Err(LoadError::Parse(_))
        ));
    }
}
