//! Stock scenes.

use aura_core::{
    EntityId, Environment, LoadResult, Material, MaterialKind, MaterialId, Primitive, Vertex,
};
use glam::Vec3;
use std::path::Path;

/// Entities created by [`cornell_box`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CornellBox {
    /// Specular slab below the cube.
    pub floor: EntityId,
    /// Specular slab above the cube.
    pub roof: EntityId,
    /// Red diffuse model.
    pub cube: EntityId,
}

/// Builds a floor and roof slab around a red cube loaded from `cube_model`
/// and points the camera at it.
///
/// # Errors
///
/// Capacity errors or a model that cannot be loaded.
pub fn cornell_box(env: &Environment, cube_model: &Path) -> LoadResult<CornellBox> {
    let mirror = env.add_material(Material::new(
        MaterialKind::Specular,
        Vec3::new(0.9, 0.9, 0.9),
    ))?;
    let floor = slab(env, mirror, -2.1, -2.0)?;
    let roof = slab(env, mirror, 2.0, 2.1)?;

    let red = env.add_material(Material {
        fuzz: 0.5,
        ..Material::new(MaterialKind::Diffuse, Vec3::new(0.9, 0.1, 0.1))
    })?;
    let cube = env.new_entity(red)?;
    let faces = env.entity_load_model(cube, cube_model)?;
    env.entity_scale(cube, Vec3::splat(0.75));
    env.entity_translate(cube, Vec3::new(0.5, 0.0, 0.5));
    env.entity_rotate(cube, Vec3::new(0.5, 0.5, 5.0));

    env.camera(|camera| {
        camera.look_from = Vec3::new(0.0, 0.0, 4.0);
        camera.look_at = Vec3::ZERO;
        camera.v_up = Vec3::Y;
        camera.aperture = 0.001;
        camera.focus = 1.0;
    });

    tracing::info!(primitives = faces + 2, "cornell box built");
    Ok(CornellBox { floor, roof, cube })
}

/// Horizontal 4.2 x 4.2 cuboid between heights `low` and `high`.
fn slab(env: &Environment, material: MaterialId, low: f32, high: f32) -> LoadResult<EntityId> {
    let entity = env.new_entity(material)?;
    let min = env.add_vertex(Vertex::new(-2.1, low, -2.1))?;
    let max = env.add_vertex(Vertex::new(2.1, high, 2.1))?;
    env.entity_add_primitive(entity, Primitive::cuboid(min, max))?;
    Ok(entity)
}
