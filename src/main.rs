use glam::Vec3;

use renderkit::scene::{InstanceTransform, ModelRef};
use renderkit::{
    Camera, Geometry, GeometryFlags, Light, Model, ModelAssets, NuggetDesc, PassTarget,
    PerPassShaders, PipelineSettings, RecordingDevice, RenderPassKind, RenderStep, Scene,
    ShaderLib, ShaderSet, StageId, StageKind, StageProgram, TargetId, TextureRef, Transform,
};

/// Headless smoke run: builds a small scene, renders a few frames into a
/// recording device and logs what the pipeline emitted.
fn main() {
    renderkit::init_logging();
    let settings = PipelineSettings::load();
    log::info!(
        "pipeline demo starting (shadow map {}px)",
        settings.shadow_map_size
    );

    let mut shaders = ShaderLib::new();
    shaders.register(StageProgram::new(StageId(1), StageKind::Vertex, 1));
    shaders.register(StageProgram::new(StageId(2), StageKind::Pixel, 2));
    shaders.register(StageProgram::new(StageId(3), StageKind::Pixel, 3));
    let forward_set = ShaderSet::new(StageId(1), StageId(2));
    let depth_set = ShaderSet::new(StageId(1), StageId(3));

    let mut chain_shaders = PerPassShaders::forward(forward_set);
    chain_shaders.set(RenderPassKind::ShadowMap, depth_set);

    let mut models = ModelAssets::new();
    let geometry = models.add_geometry(Geometry::new("demo-hull", 512, 1024));
    let mut model = Model::new(geometry);
    for slice in 0u32..3 {
        model.add_nugget(
            NuggetDesc::new(slice * 128..(slice + 1) * 128, slice * 256..(slice + 1) * 256)
                .with_flags(GeometryFlags::NORMALS | GeometryFlags::TEXCOORDS)
                .with_shaders(chain_shaders.clone())
                .with_diffuse(TextureRef {
                    sort_id: 7,
                    has_alpha: false,
                }),
        );
    }
    let canopy = model.add_nugget(
        NuggetDesc::new(384..512, 768..1024)
            .with_flags(GeometryFlags::NORMALS)
            .with_shaders(chain_shaders.clone())
            .with_tint([0.4, 0.7, 1.0, 0.5]),
    );
    model.set_alpha(canopy, true);
    let model = models.create_model(model);

    let mut scene = Scene::with_settings(settings.clone());
    scene.camera = Camera::look_at(Vec3::new(6.0, 4.0, 8.0), Vec3::ZERO);
    scene
        .lights
        .add(Light::directional(Vec3::new(0.2, -1.0, 0.1)).with_shadows());

    let mut shadow_step = RenderStep::new(RenderPassKind::ShadowMap);
    shadow_step.target = Some(PassTarget::depth_only(TargetId(1)));
    scene.add_step(shadow_step);

    for x in -1..=1 {
        let entity = scene.spawn((
            ModelRef(model),
            InstanceTransform(Transform::from_translation(Vec3::new(x as f32 * 3.0, 0.0, 0.0))),
        ));
        scene.add_instance(&models, entity);
    }

    let mut device = RecordingDevice::new();
    for frame in 0..3 {
        device.clear();
        match scene.render_frame(&mut models, &shaders, &mut device) {
            Ok(stats) => {
                log::info!(
                    "frame {}: rebuilt={} entries={} draws={} state_changes={} stage_binds={}",
                    frame,
                    stats.rebuilt,
                    stats.total_entries,
                    stats.total_draws,
                    device.state_change_count(),
                    device.stage_bind_count(),
                );
                if settings.log_frame_stats {
                    for step in &stats.steps {
                        log::info!(
                            "  {:?}: {} entries, {} draws",
                            step.pass,
                            step.entries,
                            step.draws
                        );
                    }
                }
            }
            Err(err) => {
                log::error!("frame {} aborted: {}", frame, err);
                return;
            }
        }
    }
}
