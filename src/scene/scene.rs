use hecs::{DynamicBundle, Entity, World};
use log::debug;

use crate::renderer::{
    compute_casters, Device, ExecutedStep, ModelAssets, PassConstants, RenderError,
    RenderPassKind, RenderStep, ShaderCatalog, ShadowProjector,
};
use crate::renderer::LightsData;
use crate::settings::PipelineSettings;

use super::camera::Camera;
use super::components::ModelRef;
use super::pick::{pick, Ray, RayHit};

/// Per-frame accounting returned by `render_frame`.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub steps: Vec<ExecutedStep>,
    pub rebuilt: bool,
    pub total_entries: usize,
    pub total_draws: usize,
}

/// Orchestrates the frame: owns the instance world, the active render
/// steps in pipeline order, the camera and the light set. Drawlists are
/// rebuilt only when the instance set changed since the previous frame;
/// steady-state frames reuse the sorted lists untouched.
pub struct Scene {
    world: World,
    steps: Vec<RenderStep>,
    pub camera: Camera,
    pub lights: LightsData,
    pub aspect: f32,
    settings: PipelineSettings,
    instances_dirty: bool,
}

impl Scene {
    /// A scene with just the forward step. Off-screen steps are added by
    /// the caller once their targets exist.
    pub fn new() -> Self {
        Self::with_settings(PipelineSettings::default())
    }

    pub fn with_settings(settings: PipelineSettings) -> Self {
        Self {
            world: World::new(),
            steps: vec![RenderStep::new(RenderPassKind::Forward)],
            camera: Camera::default(),
            lights: LightsData::new(),
            aspect: 16.0 / 9.0,
            settings,
            instances_dirty: false,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Insert a step, keeping the list in pipeline order regardless of
    /// the order steps are added in.
    pub fn add_step(&mut self, step: RenderStep) {
        self.steps.push(step);
        self.steps.sort_by_key(|s| s.pass().index());
    }

    pub fn step(&self, pass: RenderPassKind) -> Option<&RenderStep> {
        self.steps.iter().find(|s| s.pass() == pass)
    }

    pub fn step_mut(&mut self, pass: RenderPassKind) -> Option<&mut RenderStep> {
        self.steps.iter_mut().find(|s| s.pass() == pass)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access. Mutating components that feed drawlist
    /// composition requires an `invalidate` call afterwards.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn spawn(&mut self, bundle: impl DynamicBundle) -> Entity {
        self.world.spawn(bundle)
    }

    /// Register an instance with every step whose pass its model's
    /// nuggets declare shaders for.
    pub fn add_instance(&mut self, models: &ModelAssets, entity: Entity) {
        let Ok(model_ref) = self.world.get::<&ModelRef>(entity) else {
            debug!("add_instance on entity without a model; ignored");
            return;
        };
        let handle = model_ref.0;
        drop(model_ref);

        for step in &mut self.steps {
            let declares = models
                .get(handle)
                .map_or(false, |m| m.declares_pass(step.pass()));
            if declares {
                step.register(entity);
            }
        }
        self.instances_dirty = true;
    }

    /// O(steps) removal; a no-op when the instance was never added.
    pub fn remove_instance(&mut self, entity: Entity) {
        for step in &mut self.steps {
            step.unregister(entity);
        }
        self.instances_dirty = true;
    }

    /// Force a drawlist rebuild on the next frame, e.g. after mutating a
    /// nugget chain or an instance's sort override in place.
    pub fn invalidate(&mut self) {
        self.instances_dirty = true;
    }

    /// Render one frame: rebuild drawlists if the instance set changed,
    /// recompute shadow casters for the current camera and lights, then
    /// execute every step in pipeline order against `device`.
    pub fn render_frame(
        &mut self,
        models: &mut ModelAssets,
        catalog: &dyn ShaderCatalog,
        device: &mut dyn Device,
    ) -> Result<FrameStats, RenderError> {
        let rebuilt = self.instances_dirty;
        if self.instances_dirty {
            for step in &mut self.steps {
                step.clear_drawlist();
                for entity in step.instances().to_vec() {
                    step.add_instance(&self.world, models, catalog, entity)?;
                }
            }
            self.instances_dirty = false;
        }

        let projector = ShadowProjector::new(&self.camera, self.aspect);
        let mut casters = compute_casters(&projector, &self.lights);
        casters.truncate(self.settings.max_shadow_casters as usize);
        for step in &mut self.steps {
            if step.pass() == RenderPassKind::ShadowMap {
                step.set_casters(casters.clone());
            }
        }

        let constants = PassConstants::compose(&self.camera, self.aspect, &self.lights, &casters);

        let mut stats = FrameStats {
            rebuilt,
            ..FrameStats::default()
        };
        for step in &mut self.steps {
            let executed = step.execute(&self.world, models, catalog, device, &constants)?;
            stats.total_entries += executed.entries;
            stats.total_draws += executed.draws;
            stats.steps.push(executed);
        }
        Ok(stats)
    }

    /// Ray query against the forward step's instance set, nearest hit
    /// first. Shares the add/remove-instance contract with rendering.
    pub fn pick(&self, models: &ModelAssets, ray: Ray) -> Vec<RayHit> {
        let Some(step) = self.step(RenderPassKind::Forward) else {
            return Vec::new();
        };
        pick(&self.world, models, step.instances(), &ray)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Geometry;
    use crate::renderer::{
        Model, NuggetDesc, PerPassShaders, RecordingDevice, ShaderLib, ShaderSet, StageId,
        StageKind, StageProgram,
    };

    fn forward_fixture() -> (ModelAssets, ShaderLib, crate::asset::Handle<Model>) {
        let mut lib = ShaderLib::new();
        lib.register(StageProgram::new(StageId(1), StageKind::Vertex, 1));
        lib.register(StageProgram::new(StageId(2), StageKind::Pixel, 2));

        let mut models = ModelAssets::new();
        let geometry = models.add_geometry(Geometry::new("scene-test", 24, 36));
        let mut model = Model::new(geometry);
        model.add_nugget(
            NuggetDesc::new(0..24, 0..36)
                .with_shaders(PerPassShaders::forward(ShaderSet::new(StageId(1), StageId(2)))),
        );
        let handle = models.create_model(model);
        (models, lib, handle)
    }

    #[test]
    fn removal_is_idempotent_and_safe_when_never_added() {
        let (models, _lib, handle) = forward_fixture();
        let mut scene = Scene::new();
        let entity = scene.spawn((ModelRef(handle),));

        // Never added: removal is a no-op.
        scene.remove_instance(entity);

        scene.add_instance(&models, entity);
        scene.remove_instance(entity);
        scene.remove_instance(entity);
        assert!(scene
            .step(RenderPassKind::Forward)
            .unwrap()
            .instances()
            .is_empty());
    }

    #[test]
    fn instances_only_join_steps_their_model_declares() {
        let (models, _lib, handle) = forward_fixture();
        let mut scene = Scene::new();
        let mut gbuffer = RenderStep::new(RenderPassKind::GBuffer);
        gbuffer.target = Some(crate::renderer::PassTarget::default());
        scene.add_step(gbuffer);

        let entity = scene.spawn((ModelRef(handle),));
        scene.add_instance(&models, entity);

        assert_eq!(
            scene.step(RenderPassKind::Forward).unwrap().instances().len(),
            1
        );
        assert!(scene
            .step(RenderPassKind::GBuffer)
            .unwrap()
            .instances()
            .is_empty());
    }

    #[test]
    fn drawlists_rebuild_only_when_the_instance_set_changes() {
        let (mut models, lib, handle) = forward_fixture();
        let mut scene = Scene::new();
        let entity = scene.spawn((ModelRef(handle),));
        scene.add_instance(&models, entity);

        let mut device = RecordingDevice::new();
        let first = scene.render_frame(&mut models, &lib, &mut device).unwrap();
        assert!(first.rebuilt);

        let second = scene.render_frame(&mut models, &lib, &mut device).unwrap();
        assert!(!second.rebuilt);
        assert_eq!(
            scene
                .step(RenderPassKind::Forward)
                .unwrap()
                .drawlist()
                .sort_count(),
            1,
            "steady-state frames must not re-sort"
        );

        let other = scene.spawn((ModelRef(handle),));
        scene.add_instance(&models, other);
        let third = scene.render_frame(&mut models, &lib, &mut device).unwrap();
        assert!(third.rebuilt);
    }

    #[test]
    fn steps_execute_in_pipeline_order() {
        let (mut models, lib, _handle) = forward_fixture();
        let mut scene = Scene::new();

        let mut shadow = RenderStep::new(RenderPassKind::ShadowMap);
        shadow.target = Some(crate::renderer::PassTarget::depth_only(
            crate::renderer::TargetId(1),
        ));
        scene.add_step(shadow);

        let mut device = RecordingDevice::new();
        let stats = scene.render_frame(&mut models, &lib, &mut device).unwrap();

        let order: Vec<_> = stats.steps.iter().map(|s| s.pass).collect();
        assert_eq!(
            order,
            vec![RenderPassKind::ShadowMap, RenderPassKind::Forward]
        );
    }
}
