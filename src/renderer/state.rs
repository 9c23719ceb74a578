/// Face-culling selection. `wgpu` spells this as `Option<wgpu::Face>` on a
/// pipeline; the pipeline core wants a plain enum it can diff and store in
/// override blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    Disabled,
    Back,
    Front,
}

impl CullMode {
    pub fn to_wgpu(self) -> Option<wgpu::Face> {
        match self {
            Self::Disabled => None,
            Self::Back => Some(wgpu::Face::Back),
            Self::Front => Some(wgpu::Face::Front),
        }
    }
}

impl Default for CullMode {
    fn default() -> Self {
        Self::Back
    }
}

/// One layer of render-state declarations. Each field is only "set" when
/// the layer explicitly declares it; merging layers lets later layers win
/// on the fields they set and leaves the rest untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateBlock {
    pub blend: Option<wgpu::BlendState>,
    pub depth_write: Option<bool>,
    pub depth_compare: Option<wgpu::CompareFunction>,
    pub cull_mode: Option<CullMode>,
    pub fill_mode: Option<wgpu::PolygonMode>,
    pub front_face: Option<wgpu::FrontFace>,
}

impl StateBlock {
    pub const EMPTY: Self = Self {
        blend: None,
        depth_write: None,
        depth_compare: None,
        cull_mode: None,
        fill_mode: None,
        front_face: None,
    };

    /// Overlay `over` onto `self`: fields `over` declares replace ours.
    /// The merge is associative, so layers can be folded in any grouping
    /// as long as priority order is preserved.
    pub fn merge(&mut self, over: &StateBlock) {
        if over.blend.is_some() {
            self.blend = over.blend;
        }
        if over.depth_write.is_some() {
            self.depth_write = over.depth_write;
        }
        if over.depth_compare.is_some() {
            self.depth_compare = over.depth_compare;
        }
        if over.cull_mode.is_some() {
            self.cull_mode = over.cull_mode;
        }
        if over.fill_mode.is_some() {
            self.fill_mode = over.fill_mode;
        }
        if over.front_face.is_some() {
            self.front_face = over.front_face;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

/// Fully-resolved device state: every field has a concrete value. The
/// default is the device reset state applied when a state stack opens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedState {
    pub blend: wgpu::BlendState,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub cull_mode: CullMode,
    pub fill_mode: wgpu::PolygonMode,
    pub front_face: wgpu::FrontFace,
}

impl ResolvedState {
    /// Resolve a merged declaration block against this state, producing
    /// the concrete state the next draw should run under.
    pub fn apply(&self, block: &StateBlock) -> ResolvedState {
        ResolvedState {
            blend: block.blend.unwrap_or(self.blend),
            depth_write: block.depth_write.unwrap_or(self.depth_write),
            depth_compare: block.depth_compare.unwrap_or(self.depth_compare),
            cull_mode: block.cull_mode.unwrap_or(self.cull_mode),
            fill_mode: block.fill_mode.unwrap_or(self.fill_mode),
            front_face: block.front_face.unwrap_or(self.front_face),
        }
    }
}

impl Default for ResolvedState {
    fn default() -> Self {
        Self {
            blend: wgpu::BlendState::REPLACE,
            depth_write: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            cull_mode: CullMode::Back,
            fill_mode: wgpu::PolygonMode::Fill,
            front_face: wgpu::FrontFace::Ccw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_win_on_conflicts() {
        let mut merged = StateBlock::EMPTY;
        let nugget = StateBlock {
            depth_write: Some(false),
            cull_mode: Some(CullMode::Front),
            ..StateBlock::EMPTY
        };
        let step = StateBlock {
            cull_mode: Some(CullMode::Disabled),
            ..StateBlock::EMPTY
        };

        merged.merge(&nugget);
        merged.merge(&step);

        assert_eq!(merged.depth_write, Some(false));
        assert_eq!(merged.cull_mode, Some(CullMode::Disabled));
        assert_eq!(merged.blend, None);
    }

    #[test]
    fn merge_is_associative() {
        let a = StateBlock {
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            ..StateBlock::EMPTY
        };
        let b = StateBlock {
            blend: Some(wgpu::BlendState::REPLACE),
            depth_write: Some(false),
            ..StateBlock::EMPTY
        };
        let c = StateBlock {
            depth_write: Some(true),
            fill_mode: Some(wgpu::PolygonMode::Line),
            ..StateBlock::EMPTY
        };

        let mut left = a;
        left.merge(&b);
        left.merge(&c);

        let mut bc = b;
        bc.merge(&c);
        let mut right = a;
        right.merge(&bc);

        assert_eq!(left, right);
    }

    #[test]
    fn apply_fills_unset_fields_from_base() {
        let base = ResolvedState::default();
        let block = StateBlock {
            depth_write: Some(false),
            ..StateBlock::EMPTY
        };
        let resolved = base.apply(&block);

        assert!(!resolved.depth_write);
        assert_eq!(resolved.cull_mode, base.cull_mode);
        assert_eq!(resolved.blend, base.blend);
    }
}
