use glam::Vec3;

use renderkit::renderer::shadow::{
    frustum_faces, project_directional, project_perspective, FaceKind,
};
use renderkit::{Camera, Light, ShadowProjector};

const EPSILON: f32 = 1e-4;

fn straight_camera() -> Camera {
    Camera {
        eye: Vec3::ZERO,
        target: Vec3::NEG_Z,
        up: Vec3::Y,
        fov_y_radians: 60f32.to_radians(),
        near: 0.1,
        far: 50.0,
    }
}

fn face(kind: FaceKind, camera: &Camera) -> renderkit::renderer::shadow::FrustumFace {
    *frustum_faces(camera, 1.0)
        .iter()
        .find(|f| f.kind == kind)
        .unwrap()
}

#[test]
fn downward_light_rejects_top_face_and_accepts_bottom() {
    let camera = straight_camera();
    let down = Vec3::new(0.0, -1.0, 0.0);

    let top = face(FaceKind::Top, &camera);
    assert!(top.normal.y > 0.0);
    assert!(project_directional(down, &top).is_none());

    let bottom = face(FaceKind::Bottom, &camera);
    assert!(bottom.normal.y < 0.0);
    assert!(project_directional(down, &bottom).is_some());
}

#[test]
fn directional_facing_test_is_consistent_across_all_faces() {
    let camera = straight_camera();
    let direction = Vec3::new(0.3, -0.8, -0.5).normalize();

    for face in frustum_faces(&camera, 1.0).iter() {
        let faces_light = direction.dot(face.normal) > 0.0;
        assert_eq!(
            project_directional(direction, face).is_some(),
            faces_light,
            "{:?} facing result disagrees with the dot test",
            face.kind
        );
    }
}

#[test]
fn grazing_light_is_rejected_at_ninety_degrees() {
    let camera = straight_camera();
    let bottom = face(FaceKind::Bottom, &camera);

    // A direction orthogonal to the outward normal grazes the face and
    // must be rejected.
    let grazing = bottom.normal.cross(Vec3::X).normalize();
    assert!(grazing.dot(bottom.normal).abs() < EPSILON);
    assert!(project_directional(grazing, &bottom).is_none());
}

#[test]
fn directional_projection_contains_the_face_quad() {
    let camera = straight_camera();
    let bottom = face(FaceKind::Bottom, &camera);
    let m = project_directional(Vec3::new(0.2, -1.0, 0.1).normalize(), &bottom).unwrap();

    for corner in bottom.corners {
        let clip = m * corner.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x >= -1.0 - 1e-3 && ndc.x <= 1.0 + 1e-3);
        assert!(ndc.y >= -1.0 - 1e-3 && ndc.y <= 1.0 + 1e-3);
        assert!(ndc.z >= -1e-3 && ndc.z <= 1.0 + 1e-3);
    }
}

#[test]
fn point_light_at_camera_reaches_only_the_far_face() {
    let camera = straight_camera();
    let faces = frustum_faces(&camera, 1.0);

    // Side faces have a zero dot term and are rejected; the far face is
    // carried by the z-distance bias.
    for face in faces.iter() {
        let result = project_perspective(camera.eye, face, camera.eye, camera.far);
        if face.kind == FaceKind::Far {
            assert!(result.is_some());
        } else {
            assert!(result.is_none(), "{:?} should reject", face.kind);
        }
    }
}

#[test]
fn perspective_near_far_bracket_the_surface() {
    let camera = straight_camera();
    let bottom = face(FaceKind::Bottom, &camera);
    // Light on the outward side of the face, 30 units off its center.
    let light_pos = bottom.center() + bottom.normal * 30.0;

    let m = project_perspective(light_pos, &bottom, camera.eye, camera.far)
        .expect("light on the outward side of the bottom face must project");

    // Every quad corner lands inside the light's clip volume.
    for corner in bottom.corners {
        let clip = m * corner.extend(1.0);
        assert!(clip.w > 0.0, "corner behind the light");
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() <= 1.0 + 1e-2);
        assert!(ndc.y.abs() <= 1.0 + 1e-2);
        assert!(ndc.z >= -1e-3 && ndc.z <= 1.0 + 1e-3);
    }

    // The face center sits between near and far, away from both ends.
    let clip = m * bottom.center().extend(1.0);
    let depth = clip.z / clip.w;
    assert!(depth > 0.05 && depth < 0.999, "center depth {depth}");
}

#[test]
fn projector_dispatches_by_light_kind() {
    let camera = straight_camera();
    let projector = ShadowProjector::new(&camera, 1.0);

    let sun = Light::directional(Vec3::new(0.0, -1.0, 0.0)).with_shadows();
    let faces = projector.faces();
    for (index, face) in faces.iter().enumerate() {
        assert_eq!(
            projector.project(&sun, index).is_some(),
            project_directional(sun.direction, face).is_some()
        );
    }

    let lamp = Light::point(camera.eye).with_shadows();
    let far_index = faces
        .iter()
        .position(|f| f.kind == FaceKind::Far)
        .unwrap();
    assert!(projector.project(&lamp, far_index).is_some());
}
