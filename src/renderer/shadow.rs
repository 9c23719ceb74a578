use glam::{Mat4, Vec3, Vec4};

use crate::scene::Camera;

use super::lights::{Light, LightKind, LightsData};

/// Frustum faces used as shadow projection targets: the four sides plus
/// the far plane. The near plane never receives a projection.
pub const FRUSTUM_FACE_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceKind {
    Left,
    Right,
    Top,
    Bottom,
    Far,
}

/// One planar side of the camera's view volume. Corners are ordered
/// `[b0, b1, t1, t0]` so that `corners[3] - corners[0]` and
/// `corners[2] - corners[1]` are the face's vertical edges; the normal
/// points out of the frustum.
#[derive(Debug, Clone, Copy)]
pub struct FrustumFace {
    pub kind: FaceKind,
    pub corners: [Vec3; 4],
    pub normal: Vec3,
}

impl FrustumFace {
    pub fn center(&self) -> Vec3 {
        self.corners.iter().sum::<Vec3>() * 0.25
    }

    fn radius(&self) -> f32 {
        let center = self.center();
        self.corners
            .iter()
            .map(|c| (*c - center).length())
            .fold(0.0, f32::max)
    }
}

/// Extract the five shadow-receiving faces of the camera frustum in
/// world space.
pub fn frustum_faces(camera: &Camera, aspect: f32) -> [FrustumFace; FRUSTUM_FACE_COUNT] {
    let forward = (camera.target - camera.eye).normalize();
    let right = forward.cross(camera.up).normalize();
    let up = right.cross(forward);

    let tan_half = (camera.fov_y_radians * 0.5).tan();
    let near_h = tan_half * camera.near;
    let near_w = near_h * aspect;
    let far_h = tan_half * camera.far;
    let far_w = far_h * aspect;

    let nc = camera.eye + forward * camera.near;
    let fc = camera.eye + forward * camera.far;

    let nbl = nc - right * near_w - up * near_h;
    let nbr = nc + right * near_w - up * near_h;
    let ntr = nc + right * near_w + up * near_h;
    let ntl = nc - right * near_w + up * near_h;
    let fbl = fc - right * far_w - up * far_h;
    let fbr = fc + right * far_w - up * far_h;
    let ftr = fc + right * far_w + up * far_h;
    let ftl = fc - right * far_w + up * far_h;

    let centroid =
        (nbl + nbr + ntr + ntl + fbl + fbr + ftr + ftl) * 0.125;

    let face = |kind, corners: [Vec3; 4]| {
        let edge_a = corners[1] - corners[0];
        let edge_b = corners[3] - corners[0];
        let mut normal = edge_a.cross(edge_b).normalize();
        let center = (corners[0] + corners[1] + corners[2] + corners[3]) * 0.25;
        if normal.dot(center - centroid) < 0.0 {
            normal = -normal;
        }
        FrustumFace {
            kind,
            corners,
            normal,
        }
    };

    [
        face(FaceKind::Left, [nbl, fbl, ftl, ntl]),
        face(FaceKind::Right, [fbr, nbr, ntr, ftr]),
        face(FaceKind::Top, [ntl, ntr, ftr, ftl]),
        face(FaceKind::Bottom, [fbl, fbr, nbr, nbl]),
        face(FaceKind::Far, [fbl, fbr, ftr, ftl]),
    ]
}

const EPSILON: f32 = 1e-5;

fn up_hint(direction: Vec3) -> Vec3 {
    if direction.dot(Vec3::Y).abs() > 0.95 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

fn project_corners(m: Mat4, corners: &[Vec3; 4]) -> [Vec3; 4] {
    corners.map(|c| {
        let clip = m * c.extend(1.0);
        clip.truncate() / clip.w
    })
}

/// Light-space transform for a directional caster against one frustum
/// face.
///
/// The face receives a projection only when the light passes out through
/// it: the toward-light vector must be on the far side of the face plane
/// (`dot(-direction, normal) >= 0` rejects). The base transform is a
/// look-at centered on the face quad with a bounding orthographic
/// projection; three corrective transforms follow, each derived by
/// re-projecting the quad corners after the previous step and measuring
/// the residual: a rotation making the quad's vertical edges vertical, a
/// non-uniform scale fitting the quad to the [-1,1] square, and a shear
/// squaring off the skew an off-axis light leaves behind.
pub fn project_directional(direction: Vec3, face: &FrustumFace) -> Option<Mat4> {
    if (-direction).dot(face.normal) >= 0.0 {
        return None;
    }

    let center = face.center();
    let radius = face.radius();
    if radius < EPSILON {
        return None;
    }

    let light_pos = center - direction * (radius * 2.0);
    let view = Mat4::look_at_rh(light_pos, center, up_hint(direction));

    let view_corners = face.corners.map(|c| view.transform_point3(c));
    let mut min = view_corners[0];
    let mut max = view_corners[0];
    for c in &view_corners[1..] {
        min = min.min(*c);
        max = max.max(*c);
    }
    // View space looks down -Z; pad depth so casters between the light
    // and the face stay inside the volume.
    let near = (-max.z - radius * 2.0).max(0.01);
    let far = -min.z + radius * 2.0;
    let proj = Mat4::orthographic_rh(min.x, max.x, min.y, max.y, near, far);
    let mut m = proj * view;

    // Rotate so the quad's vertical edges run vertical in light space.
    let p = project_corners(m, &face.corners);
    let edge = ((p[3] - p[0]) + (p[2] - p[1])) * 0.5;
    if edge.truncate().length() < EPSILON {
        return None;
    }
    m = Mat4::from_rotation_z(edge.x.atan2(edge.y)) * m;

    // Scale so the quad exactly fills [-1,1] on both axes.
    let p = project_corners(m, &face.corners);
    let mut lo = p[0];
    let mut hi = p[0];
    for c in &p[1..] {
        lo = lo.min(*c);
        hi = hi.max(*c);
    }
    let extent = (hi - lo) * 0.5;
    if extent.x < EPSILON || extent.y < EPSILON {
        return None;
    }
    let mid = (hi + lo) * 0.5;
    m = Mat4::from_scale(Vec3::new(1.0 / extent.x, 1.0 / extent.y, 1.0))
        * Mat4::from_translation(Vec3::new(-mid.x, -mid.y, 0.0))
        * m;

    // Shear away the residual skew so the quad is an exact square.
    let p = project_corners(m, &face.corners);
    let bottom_mid = (p[0] + p[1]) * 0.5;
    let top_mid = (p[2] + p[3]) * 0.5;
    let dy = top_mid.y - bottom_mid.y;
    if dy.abs() > EPSILON {
        let shear = (top_mid.x - bottom_mid.x) / dy;
        m = shear_x_by_y(-shear) * m;
    }

    Some(m)
}

/// Light-space transform for a point or spot caster against one frustum
/// face: a perspective projection whose near/far bracket the light-to-
/// surface distance. Perspective light space already matches frustum
/// skew, so no rotate/shear correction is applied.
pub fn project_perspective(
    position: Vec3,
    face: &FrustumFace,
    camera_position: Vec3,
    zdist: f32,
) -> Option<Mat4> {
    let far_bias = if face.kind == FaceKind::Far { zdist } else { 0.0 };
    if (position - camera_position).dot(face.normal) + far_bias <= 0.0 {
        return None;
    }

    let center = face.center();
    let to_surface = center - position;
    let dist = to_surface.length();
    let radius = face.radius();
    if dist < EPSILON || radius < EPSILON {
        return None;
    }

    let view = Mat4::look_at_rh(position, center, up_hint(to_surface / dist));
    let fov_y = (2.0 * (radius / dist).atan()).min(std::f32::consts::PI * 0.9);
    let near = (dist - radius).max(dist * 0.01);
    let far = dist + radius;

    Some(Mat4::perspective_rh(fov_y, 1.0, near, far) * view)
}

fn shear_x_by_y(k: f32) -> Mat4 {
    Mat4::from_cols(
        Vec4::X,
        Vec4::new(k, 1.0, 0.0, 0.0),
        Vec4::Z,
        Vec4::W,
    )
}

/// Per-face light-space matrices for the camera's current frustum.
pub struct ShadowProjector {
    faces: [FrustumFace; FRUSTUM_FACE_COUNT],
    camera_position: Vec3,
    zdist: f32,
}

impl ShadowProjector {
    pub fn new(camera: &Camera, aspect: f32) -> Self {
        Self {
            faces: frustum_faces(camera, aspect),
            camera_position: camera.eye,
            zdist: camera.far,
        }
    }

    pub fn faces(&self) -> &[FrustumFace; FRUSTUM_FACE_COUNT] {
        &self.faces
    }

    /// Compute the light-space transform for one face, or `None` when the
    /// face does not face the light. Callers skip shadow contribution for
    /// rejected faces.
    pub fn project(&self, light: &Light, face_index: usize) -> Option<Mat4> {
        let face = &self.faces[face_index];
        match light.kind {
            LightKind::Directional => project_directional(light.direction, face),
            LightKind::Point | LightKind::Spot => {
                project_perspective(light.position, face, self.camera_position, self.zdist)
            }
        }
    }
}

/// One shadow-casting light with its precomputed per-face matrices,
/// stored on the shadow-map render step for the frame.
#[derive(Clone)]
pub struct ShadowCaster {
    pub light: Light,
    pub faces: [Option<Mat4>; FRUSTUM_FACE_COUNT],
}

/// Precompute per-face matrices for every shadow-casting light within
/// the caster budget.
pub fn compute_casters(projector: &ShadowProjector, lights: &LightsData) -> Vec<ShadowCaster> {
    lights
        .shadow_casters()
        .map(|light| {
            let mut faces = [None; FRUSTUM_FACE_COUNT];
            for (index, slot) in faces.iter_mut().enumerate() {
                *slot = projector.project(light, index);
            }
            ShadowCaster {
                light: *light,
                faces,
            }
        })
        .collect()
}
