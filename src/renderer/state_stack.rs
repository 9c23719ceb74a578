use super::device::Device;
use super::error::RenderError;
use super::shader::{ShaderCatalog, ShaderSet, StageKind};
use super::state::{ResolvedState, StateBlock};

/// Resolves the effective render state for each drawlist entry and emits
/// only the device calls needed to transition from the previous entry's
/// state.
///
/// Layers merge in ascending priority (shader defaults, nugget, step,
/// instance); the merged result is diffed field-by-field against what is
/// currently bound. Because the drawlist groups entries by shader and
/// texture, consecutive entries usually merge to identical state and the
/// common case is one state change followed by a run of draws.
///
/// Construction and destruction force-apply the full reset state with no
/// diffing so each executed step is cleanly bracketed.
pub struct StateStack<'d> {
    device: &'d mut dyn Device,
    initial: ResolvedState,
    bound: ResolvedState,
    bound_stages: ShaderSet,
}

impl<'d> StateStack<'d> {
    pub fn new(device: &'d mut dyn Device) -> Self {
        let initial = ResolvedState::default();
        force_apply(device, &initial);
        Self {
            device,
            initial,
            bound: initial,
            bound_stages: ShaderSet::default(),
        }
    }

    /// One frame of the stack: merge the layers for the entry about to be
    /// drawn, diff against bound state, and rebind shader stages only when
    /// the pending program set differs from the bound one.
    pub fn apply(
        &mut self,
        layers: &[&StateBlock],
        stages: &ShaderSet,
        catalog: &dyn ShaderCatalog,
    ) -> Result<(), RenderError> {
        let mut merged = StateBlock::EMPTY;
        for layer in layers {
            merged.merge(layer);
        }
        let pending = self.initial.apply(&merged);

        if pending.blend != self.bound.blend {
            self.device.set_blend(pending.blend);
        }
        if pending.depth_write != self.bound.depth_write {
            self.device.set_depth_write(pending.depth_write);
        }
        if pending.depth_compare != self.bound.depth_compare {
            self.device.set_depth_compare(pending.depth_compare);
        }
        if pending.cull_mode != self.bound.cull_mode {
            self.device.set_cull_mode(pending.cull_mode);
        }
        if pending.fill_mode != self.bound.fill_mode {
            self.device.set_fill_mode(pending.fill_mode);
        }
        if pending.front_face != self.bound.front_face {
            self.device.set_front_face(pending.front_face);
        }
        self.bound = pending;

        if *stages != self.bound_stages {
            for kind in [StageKind::Vertex, StageKind::Pixel, StageKind::Geometry] {
                let old = self.bound_stages.stage(kind);
                let new = stages.stage(kind);
                if old == new {
                    continue;
                }
                if let Some(id) = old {
                    catalog.resolve(id, kind)?.cleanup(self.device);
                }
                if let Some(id) = new {
                    catalog.resolve(id, kind)?.setup(self.device);
                }
            }
            self.bound_stages = *stages;
        }

        Ok(())
    }

    /// Access the underlying device for the draw itself.
    pub fn device(&mut self) -> &mut dyn Device {
        &mut *self.device
    }
}

impl Drop for StateStack<'_> {
    fn drop(&mut self) {
        for (kind, _) in self.bound_stages.stages() {
            self.device.unbind_stage(kind);
        }
        force_apply(self.device, &self.initial);
    }
}

fn force_apply(device: &mut dyn Device, state: &ResolvedState) {
    device.set_blend(state.blend);
    device.set_depth_write(state.depth_write);
    device.set_depth_compare(state.depth_compare);
    device.set_cull_mode(state.cull_mode);
    device.set_fill_mode(state.fill_mode);
    device.set_front_face(state.front_face);
}
