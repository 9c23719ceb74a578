use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::scene::Camera;

use super::lights::{LightsData, LightsUniform, MAX_SHADOW_CASTERS};
use super::shadow::{ShadowCaster, FRUSTUM_FACE_COUNT};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub inverse_view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub _padding: f32,
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            inverse_view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [0.0, 0.0, 0.0],
            _padding: 0.0,
        }
    }

    pub fn from_matrix(view_proj: Mat4, camera_pos: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            inverse_view_proj: view_proj.inverse().to_cols_array_2d(),
            camera_pos: camera_pos.to_array(),
            _padding: 0.0,
        }
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

pub const MAX_SHADOW_MATRICES: usize = MAX_SHADOW_CASTERS * FRUSTUM_FACE_COUNT;

/// Per-face light-space matrices for every caster, with a validity mask
/// for the faces that rejected their light.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ShadowUniform {
    pub view_proj: [[[f32; 4]; 4]; MAX_SHADOW_MATRICES],
    pub valid: [u32; MAX_SHADOW_MATRICES],
}

impl ShadowUniform {
    pub fn from_casters(casters: &[ShadowCaster]) -> Self {
        let mut uniform = Self::zeroed();
        for (caster_index, caster) in casters.iter().take(MAX_SHADOW_CASTERS).enumerate() {
            for (face_index, face) in caster.faces.iter().enumerate() {
                let slot = caster_index * FRUSTUM_FACE_COUNT + face_index;
                if let Some(matrix) = face {
                    uniform.view_proj[slot] = matrix.to_cols_array_2d();
                    uniform.valid[slot] = 1;
                }
            }
        }
        uniform
    }
}

/// Everything a pass needs once per execution: camera transforms, the
/// light set and the shadow-projection matrices. Written to the device
/// in a single call at the top of each executed step.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PassConstants {
    pub camera: CameraUniform,
    pub lights: LightsUniform,
    pub shadows: ShadowUniform,
}

impl PassConstants {
    pub fn compose(
        camera: &Camera,
        aspect: f32,
        lights: &LightsData,
        casters: &[ShadowCaster],
    ) -> Self {
        Self {
            camera: CameraUniform::from_matrix(camera.view_proj(aspect), camera.position()),
            lights: LightsUniform::from_data(lights),
            shadows: ShadowUniform::from_casters(casters),
        }
    }
}


/// Per-entry constants: the instance transform plus the resolved tint
/// and reflectivity. Written before each draw; unlike pass constants
/// these change per entry and are not diffed.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectConstants {
    pub world: [[f32; 4]; 4],
    pub tint: [f32; 4],
    pub reflectivity: [f32; 4],
}

impl ObjectConstants {
    pub fn compose(world: Mat4, tint: [f32; 4], reflectivity: f32) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            tint,
            reflectivity: [reflectivity, 0.0, 0.0, 0.0],
        }
    }
}
