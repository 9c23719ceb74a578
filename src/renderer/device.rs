use std::ops::Range;

use crate::asset::{Geometry, Handle};

use super::shader::{StageId, StageKind};
use super::state::CullMode;
use super::step::{PassTarget, RenderPassKind};

/// The command sink the pipeline drives. Implementations translate these
/// into API-specific calls; the pipeline guarantees it only emits a state
/// setter when the value actually changed (outside the force-applied
/// brackets at state-stack open/close).
pub trait Device {
    fn begin_pass(&mut self, pass: RenderPassKind, target: Option<&PassTarget>);
    fn end_pass(&mut self);

    fn set_blend(&mut self, blend: wgpu::BlendState);
    fn set_depth_write(&mut self, write: bool);
    fn set_depth_compare(&mut self, compare: wgpu::CompareFunction);
    fn set_cull_mode(&mut self, cull: CullMode);
    fn set_fill_mode(&mut self, fill: wgpu::PolygonMode);
    fn set_front_face(&mut self, front: wgpu::FrontFace);

    fn bind_stage(&mut self, kind: StageKind, id: StageId);
    fn unbind_stage(&mut self, kind: StageKind);

    /// Pass-global constants, written once per executed step.
    fn write_pass_constants(&mut self, bytes: &[u8]);

    /// Per-entry constants (instance transform, tint, reflectivity),
    /// written before each draw.
    fn write_object_constants(&mut self, bytes: &[u8]);

    fn set_geometry(&mut self, geometry: Handle<Geometry>);
    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32);
}

/// Everything a device was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    BeginPass(RenderPassKind),
    EndPass,
    SetBlend(wgpu::BlendState),
    SetDepthWrite(bool),
    SetDepthCompare(wgpu::CompareFunction),
    SetCullMode(CullMode),
    SetFillMode(wgpu::PolygonMode),
    SetFrontFace(wgpu::FrontFace),
    BindStage(StageKind, StageId),
    UnbindStage(StageKind),
    WritePassConstants(usize),
    WriteObjectConstants(usize),
    SetGeometry(Handle<Geometry>),
    DrawIndexed(Range<u32>, i32),
}

impl DeviceCall {
    pub fn is_state_change(&self) -> bool {
        matches!(
            self,
            Self::SetBlend(_)
                | Self::SetDepthWrite(_)
                | Self::SetDepthCompare(_)
                | Self::SetCullMode(_)
                | Self::SetFillMode(_)
                | Self::SetFrontFace(_)
        )
    }

    pub fn is_draw(&self) -> bool {
        matches!(self, Self::DrawIndexed(..))
    }
}

/// Device that records its command stream. Used by the tests and the
/// headless demo; also handy for capturing a frame for inspection.
#[derive(Default)]
pub struct RecordingDevice {
    calls: Vec<DeviceCall>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn state_change_count(&self) -> usize {
        self.calls.iter().filter(|c| c.is_state_change()).count()
    }

    pub fn draw_count(&self) -> usize {
        self.calls.iter().filter(|c| c.is_draw()).count()
    }

    pub fn stage_bind_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DeviceCall::BindStage(..)))
            .count()
    }
}

impl Device for RecordingDevice {
    fn begin_pass(&mut self, pass: RenderPassKind, _target: Option<&PassTarget>) {
        self.calls.push(DeviceCall::BeginPass(pass));
    }

    fn end_pass(&mut self) {
        self.calls.push(DeviceCall::EndPass);
    }

    fn set_blend(&mut self, blend: wgpu::BlendState) {
        self.calls.push(DeviceCall::SetBlend(blend));
    }

    fn set_depth_write(&mut self, write: bool) {
        self.calls.push(DeviceCall::SetDepthWrite(write));
    }

    fn set_depth_compare(&mut self, compare: wgpu::CompareFunction) {
        self.calls.push(DeviceCall::SetDepthCompare(compare));
    }

    fn set_cull_mode(&mut self, cull: CullMode) {
        self.calls.push(DeviceCall::SetCullMode(cull));
    }

    fn set_fill_mode(&mut self, fill: wgpu::PolygonMode) {
        self.calls.push(DeviceCall::SetFillMode(fill));
    }

    fn set_front_face(&mut self, front: wgpu::FrontFace) {
        self.calls.push(DeviceCall::SetFrontFace(front));
    }

    fn bind_stage(&mut self, kind: StageKind, id: StageId) {
        self.calls.push(DeviceCall::BindStage(kind, id));
    }

    fn unbind_stage(&mut self, kind: StageKind) {
        self.calls.push(DeviceCall::UnbindStage(kind));
    }

    fn write_pass_constants(&mut self, bytes: &[u8]) {
        self.calls.push(DeviceCall::WritePassConstants(bytes.len()));
    }

    fn write_object_constants(&mut self, bytes: &[u8]) {
        self.calls.push(DeviceCall::WriteObjectConstants(bytes.len()));
    }

    fn set_geometry(&mut self, geometry: Handle<Geometry>) {
        self.calls.push(DeviceCall::SetGeometry(geometry));
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32) {
        self.calls.push(DeviceCall::DrawIndexed(indices, base_vertex));
    }
}
