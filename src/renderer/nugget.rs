use std::ops::Range;

use bitflags::bitflags;

use super::error::RenderError;
use super::shader::{hash_stage_sort_ids, PerPassShaders, ShaderCatalog};
use super::sort_key::{SortGroup, SortKey, TEXTURE_MASK};
use super::state::{CullMode, StateBlock};
use super::step::RenderPassKind;

bitflags! {
    /// Which attribute streams the nugget's vertex range carries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GeometryFlags: u32 {
        const NORMALS = 1 << 0;
        const COLOURS = 1 << 1;
        const COLOURS_HAVE_ALPHA = 1 << 2;
        const TEXCOORDS = 1 << 3;
    }
}

/// Opaque reference to a texture owned by the texture manager: the small
/// integer used in sort-key composition plus the alpha flag the manager
/// derived at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRef {
    pub sort_id: u16,
    pub has_alpha: bool,
}

slotmap::new_key_type! {
    /// Arena key for a nugget inside its owning model.
    pub struct NuggetKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NuggetRole {
    Standard,
    /// Synthesized dependent drawing back faces before the parent's front
    /// faces for two-pass alpha.
    AlphaBack,
}

/// Pre-enable state stashed by `set_alpha(true)` so disabling restores
/// the exact prior configuration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SavedAlphaState {
    pub group: SortGroup,
    pub fill_mode: wgpu::PolygonMode,
    pub cull_mode: CullMode,
    pub blend: Option<wgpu::BlendState>,
    pub depth_write: Option<bool>,
    pub state_cull: Option<CullMode>,
}

/// One contiguous, independently-statable slice of shared geometry.
///
/// Ranges are relative to the model's shared buffer, never to the model
/// itself, so a nugget can be reused against any instance of that buffer.
/// Dependents are arena keys owned by the same model and are destroyed
/// with their parent, depth-first.
#[derive(Debug, Clone)]
pub struct Nugget {
    pub topology: wgpu::PrimitiveTopology,
    pub geometry_flags: GeometryFlags,
    pub vertex_range: Range<u32>,
    pub index_range: Range<u32>,
    pub state: StateBlock,
    pub shaders: PerPassShaders,
    pub tint: [f32; 4],
    pub diffuse: Option<TextureRef>,
    pub hidden: bool,
    pub(crate) sort_key: SortKey,
    pub(crate) fill_mode: wgpu::PolygonMode,
    pub(crate) cull_mode: CullMode,
    pub(crate) deps: Vec<NuggetKey>,
    pub(crate) alpha_back: Option<NuggetKey>,
    pub(crate) role: NuggetRole,
    pub(crate) saved_alpha: Option<SavedAlphaState>,
    resolved: [Option<SortKey>; RenderPassKind::COUNT],
}

/// Creation-time description handed to the model manager.
#[derive(Debug, Clone)]
pub struct NuggetDesc {
    pub topology: wgpu::PrimitiveTopology,
    pub geometry_flags: GeometryFlags,
    pub vertex_range: Range<u32>,
    pub index_range: Range<u32>,
    pub group: SortGroup,
    pub shaders: PerPassShaders,
    pub tint: [f32; 4],
    pub diffuse: Option<TextureRef>,
}

impl NuggetDesc {
    pub fn new(vertex_range: Range<u32>, index_range: Range<u32>) -> Self {
        Self {
            topology: wgpu::PrimitiveTopology::TriangleList,
            geometry_flags: GeometryFlags::empty(),
            vertex_range,
            index_range,
            group: SortGroup::OPAQUE,
            shaders: PerPassShaders::new(),
            tint: [1.0; 4],
            diffuse: None,
        }
    }

    pub fn with_topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_flags(mut self, flags: GeometryFlags) -> Self {
        self.geometry_flags = flags;
        self
    }

    pub fn with_group(mut self, group: SortGroup) -> Self {
        self.group = group;
        self
    }

    pub fn with_shaders(mut self, shaders: PerPassShaders) -> Self {
        self.shaders = shaders;
        self
    }

    pub fn with_tint(mut self, tint: [f32; 4]) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_diffuse(mut self, diffuse: TextureRef) -> Self {
        self.diffuse = Some(diffuse);
        self
    }
}

impl Nugget {
    pub(crate) fn from_desc(desc: NuggetDesc) -> Self {
        Self {
            topology: desc.topology,
            geometry_flags: desc.geometry_flags,
            vertex_range: desc.vertex_range,
            index_range: desc.index_range,
            state: StateBlock::EMPTY,
            shaders: desc.shaders,
            tint: desc.tint,
            diffuse: desc.diffuse,
            hidden: false,
            sort_key: SortKey::default().with_group(desc.group),
            fill_mode: wgpu::PolygonMode::Fill,
            cull_mode: CullMode::Back,
            deps: Vec::new(),
            alpha_back: None,
            role: NuggetRole::Standard,
            saved_alpha: None,
            resolved: [None; RenderPassKind::COUNT],
        }
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn fill_mode(&self) -> wgpu::PolygonMode {
        self.fill_mode
    }

    pub fn cull_mode(&self) -> CullMode {
        self.cull_mode
    }

    pub fn dependents(&self) -> &[NuggetKey] {
        &self.deps
    }

    pub fn alpha_enabled(&self) -> bool {
        self.saved_alpha.is_some()
    }

    /// True when the geometry, the tint or the bound diffuse texture
    /// carries alpha.
    pub fn requires_alpha(&self) -> bool {
        self.tint[3] < 1.0
            || self
                .geometry_flags
                .contains(GeometryFlags::COLOURS_HAVE_ALPHA)
            || self.diffuse.map_or(false, |t| t.has_alpha)
    }

    /// Visibility test against stale raster overrides: a cull-mode
    /// override that disagrees with the declared cull mode means the
    /// nugget would draw faces it declared away, so it is skipped.
    pub fn visible(&self) -> bool {
        self.state.cull_mode.map_or(true, |cull| cull == self.cull_mode)
    }

    /// The nugget's layer in the state merge: explicit overrides plus
    /// the declared cull/fill modes when no override claims them.
    pub fn state_block(&self) -> StateBlock {
        let mut block = self.state;
        if block.cull_mode.is_none() {
            block.cull_mode = Some(self.cull_mode);
        }
        if block.fill_mode.is_none() {
            block.fill_mode = Some(self.fill_mode);
        }
        block
    }

    /// Compose the pass sort key, lazily resolving the shader and texture
    /// fields on first use. The shader field hashes together the sort-ids
    /// of every stage bound for the pass; the texture field takes the
    /// diffuse texture's sort id. Composed keys are cached per pass until
    /// the nugget's ordering inputs change.
    pub fn compose_key(
        &mut self,
        pass: RenderPassKind,
        catalog: &dyn ShaderCatalog,
    ) -> Result<SortKey, RenderError> {
        if let Some(key) = self.resolved[pass.index()] {
            return Ok(key);
        }

        let mut key = self.sort_key;
        if key.shader_id() == 0 {
            if let Some(set) = self.shaders.get(pass) {
                let mut sort_ids = [0u16; 3];
                let mut count = 0;
                for (kind, id) in set.stages() {
                    sort_ids[count] = catalog.resolve(id, kind)?.sort_id;
                    count += 1;
                }
                key.set_shader_id(hash_stage_sort_ids(sort_ids[..count].iter().copied()));
            }
        }
        if key.texture_id() == 0 {
            if let Some(diffuse) = self.diffuse {
                key.set_texture_id(u32::from(diffuse.sort_id) & TEXTURE_MASK);
            }
        }

        self.resolved[pass.index()] = Some(key);
        Ok(key)
    }

    /// Drop all cached per-pass keys. Called whenever a field feeding the
    /// key changes (group, alpha flag, shaders, diffuse texture).
    pub(crate) fn invalidate_keys(&mut self) {
        self.resolved = [None; RenderPassKind::COUNT];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::shader::{ShaderLib, ShaderSet, StageId, StageKind, StageProgram};

    fn catalog() -> ShaderLib {
        let mut lib = ShaderLib::new();
        lib.register(StageProgram::new(StageId(1), StageKind::Vertex, 5));
        lib.register(StageProgram::new(StageId(2), StageKind::Pixel, 9));
        lib
    }

    fn forward_nugget() -> Nugget {
        let set = ShaderSet::new(StageId(1), StageId(2));
        Nugget::from_desc(
            NuggetDesc::new(0..12, 0..36).with_shaders(PerPassShaders::forward(set)),
        )
    }

    #[test]
    fn composed_key_is_cached() {
        let lib = catalog();
        let mut nugget = forward_nugget();

        let first = nugget
            .compose_key(RenderPassKind::Forward, &lib)
            .unwrap();
        assert_ne!(first.shader_id(), 0);

        // Resolving against an empty catalog succeeds because the cached
        // key short-circuits the lookup.
        let empty = ShaderLib::new();
        let second = nugget.compose_key(RenderPassKind::Forward, &empty).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unresolvable_stage_surfaces_not_found() {
        let empty = ShaderLib::new();
        let mut nugget = forward_nugget();
        let err = nugget
            .compose_key(RenderPassKind::Forward, &empty)
            .unwrap_err();
        assert!(matches!(err, RenderError::ShaderNotFound { .. }));
    }

    #[test]
    fn texture_field_comes_from_diffuse_sort_id() {
        let lib = catalog();
        let set = ShaderSet::new(StageId(1), StageId(2));
        let mut nugget = Nugget::from_desc(
            NuggetDesc::new(0..4, 0..6)
                .with_shaders(PerPassShaders::forward(set))
                .with_diffuse(TextureRef {
                    sort_id: 77,
                    has_alpha: false,
                }),
        );
        let key = nugget.compose_key(RenderPassKind::Forward, &lib).unwrap();
        assert_eq!(key.texture_id(), 77);
    }

    #[test]
    fn stale_cull_override_hides_the_nugget() {
        let mut nugget = forward_nugget();
        assert!(nugget.visible());

        nugget.state.cull_mode = Some(CullMode::Front);
        assert!(!nugget.visible());

        nugget.state.cull_mode = Some(CullMode::Back);
        assert!(nugget.visible());
    }

    #[test]
    fn alpha_sources_are_all_detected() {
        let mut nugget = forward_nugget();
        assert!(!nugget.requires_alpha());

        nugget.tint = [1.0, 1.0, 1.0, 0.5];
        assert!(nugget.requires_alpha());

        nugget.tint = [1.0; 4];
        nugget.geometry_flags |= GeometryFlags::COLOURS_HAVE_ALPHA;
        assert!(nugget.requires_alpha());

        nugget.geometry_flags = GeometryFlags::empty();
        nugget.diffuse = Some(TextureRef {
            sort_id: 1,
            has_alpha: true,
        });
        assert!(nugget.requires_alpha());
    }
}
