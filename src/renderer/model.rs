use slotmap::SlotMap;

use crate::asset::{AssetCache, Bounds, Geometry, Handle};

use super::drawlist::{Drawlist, DrawlistEntry};
use super::error::RenderError;
use super::nugget::{Nugget, NuggetDesc, NuggetKey, NuggetRole, SavedAlphaState};
use super::shader::ShaderCatalog;
use super::sort_key::{SortGroup, SortKeyOverride};
use super::state::CullMode;
use super::step::RenderPassKind;

/// An ordered chain of nuggets over one shared geometry buffer.
///
/// The model owns its nuggets in an arena; dependents reference each
/// other by key, so there are no pointer cycles back into the arena.
pub struct Model {
    pub geometry: Handle<Geometry>,
    pub bounds: Bounds,
    nuggets: SlotMap<NuggetKey, Nugget>,
    roots: Vec<NuggetKey>,
}

impl Model {
    pub fn new(geometry: Handle<Geometry>) -> Self {
        Self {
            geometry,
            bounds: Bounds::default(),
            nuggets: SlotMap::with_key(),
            roots: Vec::new(),
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn add_nugget(&mut self, desc: NuggetDesc) -> NuggetKey {
        let key = self.nuggets.insert(Nugget::from_desc(desc));
        self.roots.push(key);
        key
    }

    pub fn add_dependent(&mut self, parent: NuggetKey, desc: NuggetDesc) -> Option<NuggetKey> {
        if !self.nuggets.contains_key(parent) {
            return None;
        }
        let key = self.nuggets.insert(Nugget::from_desc(desc));
        self.nuggets[parent].deps.push(key);
        Some(key)
    }

    pub fn nugget(&self, key: NuggetKey) -> Option<&Nugget> {
        self.nuggets.get(key)
    }

    pub fn nugget_mut(&mut self, key: NuggetKey) -> Option<&mut Nugget> {
        self.nuggets.get_mut(key)
    }

    pub fn roots(&self) -> &[NuggetKey] {
        &self.roots
    }

    pub fn nugget_count(&self) -> usize {
        self.nuggets.len()
    }

    /// True when any nugget in the chain binds shaders for `pass`.
    pub fn declares_pass(&self, pass: RenderPassKind) -> bool {
        self.nuggets.values().any(|n| n.shaders.declares(pass))
    }

    /// Expand the whole chain into `list` for one instance.
    pub fn add_to_drawlist(
        &mut self,
        handle: Handle<Model>,
        list: &mut Drawlist,
        instance: hecs::Entity,
        sort_override: Option<SortKeyOverride>,
        pass: RenderPassKind,
        catalog: &dyn ShaderCatalog,
    ) -> Result<(), RenderError> {
        for root in self.roots.clone() {
            self.add_nugget_to_drawlist(handle, root, list, instance, sort_override, pass, catalog)?;
        }
        Ok(())
    }

    fn add_nugget_to_drawlist(
        &mut self,
        handle: Handle<Model>,
        key: NuggetKey,
        list: &mut Drawlist,
        instance: hecs::Entity,
        sort_override: Option<SortKeyOverride>,
        pass: RenderPassKind,
        catalog: &dyn ShaderCatalog,
    ) -> Result<(), RenderError> {
        let (deps, alpha_back, fill_mode) = {
            let Some(nugget) = self.nuggets.get_mut(key) else {
                return Ok(());
            };
            if nugget.hidden {
                return Ok(());
            }
            if nugget.visible() && nugget.shaders.declares(pass) {
                let mut sort_key = nugget.compose_key(pass, catalog)?;
                if let Some(ovr) = sort_override {
                    sort_key = ovr.combine(sort_key);
                }
                list.push(DrawlistEntry {
                    instance,
                    model: handle,
                    nugget: key,
                    key: sort_key,
                });
            }
            (nugget.deps.clone(), nugget.alpha_back, nugget.fill_mode)
        };

        for dep in deps {
            // Point rendering has no interior surfaces to layer, so the
            // synthesized back-face dependent is skipped.
            if fill_mode == wgpu::PolygonMode::Point && Some(dep) == alpha_back {
                continue;
            }
            self.add_nugget_to_drawlist(handle, dep, list, instance, sort_override, pass, catalog)?;
        }
        Ok(())
    }

    /// Toggle two-pass alpha rendering for a nugget. Idempotent.
    ///
    /// Enabling moves the nugget to the alpha-front group, installs
    /// premultiplied blending with depth writes off and back-face
    /// culling, and synthesizes one dependent that draws the same ranges
    /// front-culled in the alpha-back group, so back faces land before
    /// front faces without duplicating geometry. Disabling removes the
    /// dependent and restores the exact pre-enable configuration.
    pub fn set_alpha(&mut self, key: NuggetKey, enable: bool) {
        let Some(nugget) = self.nuggets.get(key) else {
            return;
        };
        if nugget.alpha_enabled() == enable {
            return;
        }
        if enable {
            self.enable_alpha(key);
        } else {
            self.disable_alpha(key);
        }
    }

    fn enable_alpha(&mut self, key: NuggetKey) {
        let back = {
            let nugget = &mut self.nuggets[key];
            nugget.saved_alpha = Some(SavedAlphaState {
                group: nugget.sort_key.group(),
                fill_mode: nugget.fill_mode,
                cull_mode: nugget.cull_mode,
                blend: nugget.state.blend,
                depth_write: nugget.state.depth_write,
                state_cull: nugget.state.cull_mode,
            });
            nugget.sort_key.set_group(SortGroup::ALPHA_FRONT);
            nugget.sort_key.set_alpha(true);
            nugget.state.blend = Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING);
            nugget.state.depth_write = Some(false);
            nugget.state.cull_mode = Some(CullMode::Back);
            nugget.cull_mode = CullMode::Back;
            nugget.invalidate_keys();

            // Shallow duplicate: same ranges, same shaders, front-culled.
            let mut back = nugget.clone();
            back.deps = Vec::new();
            back.alpha_back = None;
            back.role = NuggetRole::AlphaBack;
            back.saved_alpha = None;
            back.sort_key.set_group(SortGroup::ALPHA_BACK);
            back.cull_mode = CullMode::Front;
            back.state.cull_mode = Some(CullMode::Front);
            back.invalidate_keys();
            back
        };

        let back_key = self.nuggets.insert(back);
        let nugget = &mut self.nuggets[key];
        nugget.deps.push(back_key);
        nugget.alpha_back = Some(back_key);
    }

    fn disable_alpha(&mut self, key: NuggetKey) {
        let back_key = {
            let Some(nugget) = self.nuggets.get_mut(key) else {
                return;
            };
            let Some(saved) = nugget.saved_alpha.take() else {
                return;
            };
            nugget.sort_key.set_group(saved.group);
            nugget.sort_key.set_alpha(false);
            nugget.fill_mode = saved.fill_mode;
            nugget.cull_mode = saved.cull_mode;
            nugget.state.blend = saved.blend;
            nugget.state.depth_write = saved.depth_write;
            nugget.state.cull_mode = saved.state_cull;
            nugget.invalidate_keys();
            nugget.alpha_back.take()
        };

        if let Some(back_key) = back_key {
            if let Some(nugget) = self.nuggets.get_mut(key) {
                nugget.deps.retain(|&k| k != back_key);
            }
            self.remove_subtree(back_key);
        }
    }

    /// Propagate a fill mode through the chain.
    pub fn set_fill_mode(&mut self, key: NuggetKey, mode: wgpu::PolygonMode) {
        let deps = {
            let Some(nugget) = self.nuggets.get_mut(key) else {
                return;
            };
            nugget.fill_mode = mode;
            nugget.deps.clone()
        };
        for dep in deps {
            self.set_fill_mode(dep, mode);
        }
    }

    /// Propagate a cull mode through the chain. A dependent serving the
    /// alpha back-face role keeps its forced front culling.
    pub fn set_cull_mode(&mut self, key: NuggetKey, mode: CullMode) {
        let deps = {
            let Some(nugget) = self.nuggets.get_mut(key) else {
                return;
            };
            if nugget.role != NuggetRole::AlphaBack {
                nugget.cull_mode = mode;
            }
            nugget.deps.clone()
        };
        for dep in deps {
            self.set_cull_mode(dep, mode);
        }
    }

    /// Destroy a nugget and its dependents, depth-first.
    pub fn remove_nugget(&mut self, key: NuggetKey) {
        self.roots.retain(|&k| k != key);
        for nugget in self.nuggets.values_mut() {
            nugget.deps.retain(|&k| k != key);
            if nugget.alpha_back == Some(key) {
                nugget.alpha_back = None;
                nugget.saved_alpha = None;
            }
        }
        self.remove_subtree(key);
    }

    fn remove_subtree(&mut self, key: NuggetKey) {
        if let Some(nugget) = self.nuggets.remove(key) {
            for dep in nugget.deps {
                self.remove_subtree(dep);
            }
        }
    }

    fn clear_nuggets(&mut self) {
        for root in std::mem::take(&mut self.roots) {
            self.remove_subtree(root);
        }
    }
}

/// Registry for geometry descriptors and the models built over them.
/// Geometry outlives every nugget ranged into it: a buffer is only
/// dropped once no registered model references it.
pub struct ModelAssets {
    geometries: AssetCache<Geometry>,
    models: AssetCache<Model>,
}

impl ModelAssets {
    pub fn new() -> Self {
        Self {
            geometries: AssetCache::new(),
            models: AssetCache::new(),
        }
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> Handle<Geometry> {
        self.geometries.insert(geometry)
    }

    pub fn geometry(&self, handle: Handle<Geometry>) -> Option<&Geometry> {
        self.geometries.get(handle)
    }

    pub fn create_model(&mut self, model: Model) -> Handle<Model> {
        self.models.insert(model)
    }

    /// Destroy a model: its nuggets go first, depth-first, then the
    /// model slot is released. The geometry buffer stays while other
    /// models still range into it.
    pub fn destroy_model(&mut self, handle: Handle<Model>) {
        if let Some(mut model) = self.models.remove(handle) {
            let geometry = model.geometry;
            model.clear_nuggets();
            drop(model);

            let still_referenced = self.models.iter().any(|(_, m)| m.geometry == geometry);
            if !still_referenced {
                self.geometries.remove(geometry);
            }
        }
    }

    pub fn get(&self, handle: Handle<Model>) -> Option<&Model> {
        self.models.get(handle)
    }

    pub fn get_mut(&mut self, handle: Handle<Model>) -> Option<&mut Model> {
        self.models.get_mut(handle)
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }
}

impl Default for ModelAssets {
    fn default() -> Self {
        Self::new()
    }
}
