use crate::asset::{Geometry, Handle};
use crate::scene::components::{
    InstanceTransform, ModelRef, Reflectivity, SortOverride, StateOverride, Tint, Visible,
};

use super::device::Device;
use super::drawlist::Drawlist;
use super::error::RenderError;
use super::model::ModelAssets;
use super::shader::ShaderCatalog;
use super::shadow::ShadowCaster;
use super::state::{CullMode, StateBlock};
use super::state_stack::StateStack;
use super::uniforms::{ObjectConstants, PassConstants};

/// The passes a frame is composed of, in pipeline order: the shadow map
/// is rendered before the passes that consume it, and G-buffer geometry
/// before the lighting pass that reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPassKind {
    ShadowMap,
    GBuffer,
    DeferredLighting,
    Forward,
}

impl RenderPassKind {
    pub const COUNT: usize = 4;

    pub const PIPELINE_ORDER: [Self; Self::COUNT] = [
        Self::ShadowMap,
        Self::GBuffer,
        Self::DeferredLighting,
        Self::Forward,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::ShadowMap => 0,
            Self::GBuffer => 1,
            Self::DeferredLighting => 2,
            Self::Forward => 3,
        }
    }

    /// Every pass except forward renders off-screen and must have a
    /// target bound before execution.
    pub fn needs_target(self) -> bool {
        !matches!(self, Self::Forward)
    }
}

/// Opaque identifier for an attachment owned by the surrounding renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub u32);

/// Attachment set for an off-screen pass. The forward pass renders to
/// the backbuffer and needs none.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PassTarget {
    pub color: Vec<TargetId>,
    pub depth: Option<TargetId>,
}

impl PassTarget {
    pub fn depth_only(depth: TargetId) -> Self {
        Self {
            color: Vec::new(),
            depth: Some(depth),
        }
    }

    pub fn with_color(mut self, color: TargetId) -> Self {
        self.color.push(color);
        self
    }
}

/// Execution stats for one step, collected into the frame stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutedStep {
    pub pass: RenderPassKind,
    pub entries: usize,
    pub draws: usize,
}

/// One rendering pass: its drawlist, its instance membership, the
/// pass-level state overrides, and (for shadow passes) the casters with
/// their precomputed per-face light-space matrices.
pub struct RenderStep {
    pass: RenderPassKind,
    drawlist: Drawlist,
    pub defaults: StateBlock,
    pub target: Option<PassTarget>,
    instances: Vec<hecs::Entity>,
    casters: Vec<ShadowCaster>,
}

impl RenderStep {
    pub fn new(pass: RenderPassKind) -> Self {
        Self {
            pass,
            drawlist: Drawlist::new(),
            defaults: Self::pass_defaults(pass),
            target: None,
            instances: Vec::new(),
            casters: Vec::new(),
        }
    }

    /// Pass-level state overrides. These sit above nugget state in the
    /// merge, so e.g. an alpha nugget still writes depth in the shadow
    /// pass.
    fn pass_defaults(pass: RenderPassKind) -> StateBlock {
        match pass {
            RenderPassKind::ShadowMap => StateBlock {
                blend: Some(wgpu::BlendState::REPLACE),
                depth_write: Some(true),
                fill_mode: Some(wgpu::PolygonMode::Fill),
                ..StateBlock::EMPTY
            },
            RenderPassKind::GBuffer => StateBlock {
                blend: Some(wgpu::BlendState::REPLACE),
                depth_write: Some(true),
                ..StateBlock::EMPTY
            },
            RenderPassKind::DeferredLighting => StateBlock {
                depth_write: Some(false),
                depth_compare: Some(wgpu::CompareFunction::Always),
                cull_mode: Some(CullMode::Back),
                ..StateBlock::EMPTY
            },
            RenderPassKind::Forward => StateBlock::EMPTY,
        }
    }

    pub fn pass(&self) -> RenderPassKind {
        self.pass
    }

    pub fn drawlist(&self) -> &Drawlist {
        &self.drawlist
    }

    pub fn instances(&self) -> &[hecs::Entity] {
        &self.instances
    }

    pub(crate) fn register(&mut self, entity: hecs::Entity) {
        if !self.instances.contains(&entity) {
            self.instances.push(entity);
        }
    }

    pub(crate) fn unregister(&mut self, entity: hecs::Entity) {
        self.instances.retain(|&e| e != entity);
    }

    pub fn set_casters(&mut self, casters: Vec<ShadowCaster>) {
        self.casters = casters;
    }

    pub fn casters(&self) -> &[ShadowCaster] {
        &self.casters
    }

    pub fn clear_drawlist(&mut self) {
        self.drawlist.clear();
    }

    /// Expand one instance's nugget chain into this step's drawlist.
    /// Despawned entities and unregistered models are tolerated no-ops;
    /// they resolve during the next rebuild.
    pub fn add_instance(
        &mut self,
        world: &hecs::World,
        models: &mut ModelAssets,
        catalog: &dyn ShaderCatalog,
        entity: hecs::Entity,
    ) -> Result<(), RenderError> {
        let Ok(mut query) =
            world.query_one::<(&ModelRef, Option<&Visible>, Option<&SortOverride>)>(entity)
        else {
            return Ok(());
        };
        let Some((model_ref, visible, sort_override)) = query.get() else {
            return Ok(());
        };
        if matches!(visible, Some(Visible(false))) {
            return Ok(());
        }
        let handle = model_ref.0;
        let sort_override = sort_override.map(|s| s.0);
        drop(query);

        let Some(model) = models.get_mut(handle) else {
            return Ok(());
        };
        model.add_to_drawlist(
            handle,
            &mut self.drawlist,
            entity,
            sort_override,
            self.pass,
            catalog,
        )
    }

    /// Run the pass: sort if anything changed, bracket the device in a
    /// fresh state stack, write the pass constants once, then walk the
    /// sorted entries issuing one stack frame and one ranged draw each.
    pub fn execute(
        &mut self,
        world: &hecs::World,
        models: &ModelAssets,
        catalog: &dyn ShaderCatalog,
        device: &mut dyn Device,
        constants: &PassConstants,
    ) -> Result<ExecutedStep, RenderError> {
        if self.pass.needs_target() && self.target.is_none() {
            return Err(RenderError::MissingTarget { pass: self.pass });
        }

        self.drawlist.sort_if_needed();

        device.begin_pass(self.pass, self.target.as_ref());
        device.write_pass_constants(bytemuck::bytes_of(constants));

        let mut draws = 0usize;
        {
            let mut stack = StateStack::new(device);
            let mut bound_geometry: Option<Handle<Geometry>> = None;

            for entry in self.drawlist.entries() {
                let Some(model) = models.get(entry.model) else {
                    continue;
                };
                let Some(nugget) = model.nugget(entry.nugget) else {
                    continue;
                };
                let Some(set) = nugget.shaders.get(self.pass) else {
                    continue;
                };
                set.require_drawable(self.pass)?;

                let mut shader_defaults = StateBlock::EMPTY;
                for (kind, id) in set.stages() {
                    shader_defaults.merge(&catalog.resolve(id, kind)?.defaults);
                }

                let instance_block = world
                    .get::<&StateOverride>(entry.instance)
                    .map(|s| s.0)
                    .unwrap_or(StateBlock::EMPTY);

                let nugget_block = nugget.state_block();
                stack.apply(
                    &[&shader_defaults, &nugget_block, &self.defaults, &instance_block],
                    set,
                    catalog,
                )?;

                if nugget.index_range.is_empty() {
                    continue;
                }

                let object = object_constants(world, entry.instance, nugget);
                let device = stack.device();
                if bound_geometry != Some(model.geometry) {
                    device.set_geometry(model.geometry);
                    bound_geometry = Some(model.geometry);
                }
                device.write_object_constants(bytemuck::bytes_of(&object));
                device.draw_indexed(nugget.index_range.clone(), nugget.vertex_range.start as i32);
                draws += 1;
            }
        }
        device.end_pass();

        Ok(ExecutedStep {
            pass: self.pass,
            entries: self.drawlist.len(),
            draws,
        })
    }
}

/// Resolve the per-entry constants: instance transform (identity when
/// absent), the instance tint modulating the nugget tint, and the
/// optional reflectivity weight.
fn object_constants(
    world: &hecs::World,
    instance: hecs::Entity,
    nugget: &crate::renderer::nugget::Nugget,
) -> ObjectConstants {
    let mut matrix = glam::Mat4::IDENTITY;
    let mut tint = nugget.tint;
    let mut reflectivity = 0.0;

    if let Ok(mut query) = world.query_one::<(
        Option<&InstanceTransform>,
        Option<&Tint>,
        Option<&Reflectivity>,
    )>(instance)
    {
        if let Some((transform, instance_tint, instance_reflectivity)) = query.get() {
            if let Some(transform) = transform {
                matrix = transform.0.matrix();
            }
            if let Some(Tint(t)) = instance_tint {
                for (dst, src) in tint.iter_mut().zip(t.iter()) {
                    *dst *= src;
                }
            }
            if let Some(Reflectivity(r)) = instance_reflectivity {
                reflectivity = *r;
            }
        }
    }

    ObjectConstants::compose(matrix, tint, reflectivity)
}
