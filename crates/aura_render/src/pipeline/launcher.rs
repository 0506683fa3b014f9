//! Camera ray launcher.

use crate::settings::Extent;
use aura_core::Camera;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Thin-lens ray launcher, one per frame extent and camera.
///
/// Primary rays leave `origin` (offset on the lens) towards
/// `corner + s * horizontal + t * vertical`.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct RayLauncher {
    /// Eye position.
    pub origin: [f32; 4],
    /// Lower left corner of the focus plane.
    pub corner: [f32; 4],
    /// Full width of the focus plane.
    pub horizontal: [f32; 4],
    /// Full height of the focus plane.
    pub vertical: [f32; 4],
    /// Camera right.
    pub u: [f32; 4],
    /// Camera up.
    pub v: [f32; 4],
    /// Camera backward.
    pub w: [f32; 4],
    /// Half the aperture.
    pub lens_radius: f32,
    _pad: [f32; 3],
}

fn vec4(v: Vec3) -> [f32; 4] {
    v.extend(0.0).to_array()
}

impl RayLauncher {
    /// Builds the launcher for `camera` rendering into `extent`.
    ///
    /// The camera transform moves eye and target as points and the up
    /// vector as a direction.
    #[must_use]
    pub fn from_camera(camera: &Camera, extent: Extent) -> Self {
        let m = camera.transform.matrix();
        let from = m.transform_point3(camera.look_from);
        let at = m.transform_point3(camera.look_at);
        let up = m.transform_vector3(camera.v_up);

        let w = (from - at).normalize();
        let u = up.cross(w).normalize();
        let v = w.cross(u);

        let half_h = (camera.v_fov.to_radians() / 2.0).tan();
        let half_w = extent.aspect() * half_h;
        let horizontal = 2.0 * half_w * camera.focus * u;
        let vertical = 2.0 * half_h * camera.focus * v;
        let corner = from - horizontal / 2.0 - vertical / 2.0 - camera.focus * w;

        Self {
            origin: vec4(from),
            corner: vec4(corner),
            horizontal: vec4(horizontal),
            vertical: vec4(vertical),
            u: vec4(u),
            v: vec4(v),
            w: vec4(w),
            lens_radius: camera.aperture / 2.0,
            _pad: [0.0; 3],
        }
    }
}
