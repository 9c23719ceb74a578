use std::collections::HashMap;

use super::error::RenderError;
use super::state::StateBlock;
use super::step::RenderPassKind;

/// Identifier a shader manager hands out for one compiled stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageId(pub u32);

/// The closed set of programmable stages. Closed on purpose: dispatch is
/// a match on this tag rather than open inheritance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Pixel,
    Geometry,
    Compute,
}

/// One resolvable stage: its identity, the small integer used during
/// sort-key composition, and the state the stage declares as its default
/// (lowest-priority layer in the state merge).
#[derive(Debug, Clone)]
pub struct StageProgram {
    pub id: StageId,
    pub kind: StageKind,
    pub sort_id: u16,
    pub defaults: StateBlock,
}

impl StageProgram {
    pub fn new(id: StageId, kind: StageKind, sort_id: u16) -> Self {
        Self {
            id,
            kind,
            sort_id,
            defaults: StateBlock::EMPTY,
        }
    }

    pub fn with_defaults(mut self, defaults: StateBlock) -> Self {
        self.defaults = defaults;
        self
    }

    /// Bind this stage on the device. Stage binding is deliberately the
    /// only thing setup does; resource bindings live with the collaborator
    /// that owns the program object.
    pub fn setup(&self, device: &mut dyn super::device::Device) {
        device.bind_stage(self.kind, self.id);
    }

    pub fn cleanup(&self, device: &mut dyn super::device::Device) {
        device.unbind_stage(self.kind);
    }
}

/// The stage set a nugget binds for one pass. Vertex and pixel stages are
/// mandatory for anything drawable; geometry is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShaderSet {
    pub vertex: Option<StageId>,
    pub pixel: Option<StageId>,
    pub geometry: Option<StageId>,
}

impl ShaderSet {
    pub fn new(vertex: StageId, pixel: StageId) -> Self {
        Self {
            vertex: Some(vertex),
            pixel: Some(pixel),
            geometry: None,
        }
    }

    pub fn with_geometry(mut self, geometry: StageId) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn stages(&self) -> impl Iterator<Item = (StageKind, StageId)> {
        [
            self.vertex.map(|id| (StageKind::Vertex, id)),
            self.pixel.map(|id| (StageKind::Pixel, id)),
            self.geometry.map(|id| (StageKind::Geometry, id)),
        ]
        .into_iter()
        .flatten()
    }

    pub fn stage(&self, kind: StageKind) -> Option<StageId> {
        match kind {
            StageKind::Vertex => self.vertex,
            StageKind::Pixel => self.pixel,
            StageKind::Geometry => self.geometry,
            StageKind::Compute => None,
        }
    }

    /// Vertex and pixel stages are mandatory for every drawable nugget.
    pub fn require_drawable(&self, pass: RenderPassKind) -> Result<(), RenderError> {
        if self.vertex.is_none() {
            return Err(RenderError::MissingStage {
                pass,
                kind: StageKind::Vertex,
            });
        }
        if self.pixel.is_none() {
            return Err(RenderError::MissingStage {
                pass,
                kind: StageKind::Pixel,
            });
        }
        Ok(())
    }
}

/// Per-pass shader selection on a nugget. A pass with no entry means the
/// nugget does not draw in that pass.
#[derive(Debug, Clone, Default)]
pub struct PerPassShaders {
    sets: [Option<ShaderSet>; RenderPassKind::COUNT],
}

impl PerPassShaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(set: ShaderSet) -> Self {
        let mut shaders = Self::default();
        shaders.set(RenderPassKind::Forward, set);
        shaders
    }

    pub fn set(&mut self, pass: RenderPassKind, set: ShaderSet) {
        self.sets[pass.index()] = Some(set);
    }

    pub fn get(&self, pass: RenderPassKind) -> Option<&ShaderSet> {
        self.sets[pass.index()].as_ref()
    }

    pub fn declares(&self, pass: RenderPassKind) -> bool {
        self.sets[pass.index()].is_some()
    }
}

/// Resolves stage ids to program objects. The process-scoped catalog is
/// passed by reference into the scene and steps; it must outlive every
/// nugget referencing its ids.
pub trait ShaderCatalog {
    fn resolve(&self, id: StageId, kind: StageKind) -> Result<&StageProgram, RenderError>;
}

/// Default in-memory catalog.
#[derive(Default)]
pub struct ShaderLib {
    programs: HashMap<(StageId, StageKind), StageProgram>,
}

impl ShaderLib {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, program: StageProgram) -> StageId {
        let id = program.id;
        self.programs.insert((program.id, program.kind), program);
        id
    }
}

impl ShaderCatalog for ShaderLib {
    fn resolve(&self, id: StageId, kind: StageKind) -> Result<&StageProgram, RenderError> {
        self.programs
            .get(&(id, kind))
            .ok_or(RenderError::ShaderNotFound { id, kind })
    }
}

/// Fold stage sort-ids into the 10-bit shader field of a sort key. The
/// exact distribution matters less than determinism: equal stage sets
/// must land on equal field values so they sort contiguously.
pub fn hash_stage_sort_ids(ids: impl Iterator<Item = u16>) -> u32 {
    let mut hash = 0u32;
    for id in ids {
        hash = hash.wrapping_mul(31).wrapping_add(u32::from(id));
    }
    hash & ((1 << 10) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_reports_missing_stage_with_identity() {
        let lib = ShaderLib::new();
        let err = lib.resolve(StageId(42), StageKind::Pixel).unwrap_err();
        assert_eq!(
            err,
            RenderError::ShaderNotFound {
                id: StageId(42),
                kind: StageKind::Pixel,
            }
        );
    }

    #[test]
    fn equal_stage_sets_hash_equal() {
        let a = hash_stage_sort_ids([3u16, 7u16].into_iter());
        let b = hash_stage_sort_ids([3u16, 7u16].into_iter());
        assert_eq!(a, b);
        assert!(a < 1 << 10);
    }

    #[test]
    fn drawable_requires_vertex_and_pixel() {
        let set = ShaderSet {
            vertex: Some(StageId(1)),
            pixel: None,
            geometry: None,
        };
        let err = set.require_drawable(RenderPassKind::Forward).unwrap_err();
        assert!(matches!(
            err,
            RenderError::MissingStage {
                kind: StageKind::Pixel,
                ..
            }
        ));
    }
}
