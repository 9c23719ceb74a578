// scene/components.rs
// Instance capabilities as plain hecs components: code queries for what
// an instance carries instead of assuming a fixed layout.

use crate::asset::Handle;
use crate::renderer::Model;
use crate::renderer::SortKeyOverride;
use crate::renderer::StateBlock;
use crate::scene::Transform;

// ============================================================================
// Core Instance Components
// ============================================================================

/// Which model (nugget chain) the instance draws.
#[derive(Debug, Clone, Copy)]
pub struct ModelRef(pub Handle<Model>);

/// World transform of the instance.
#[derive(Debug, Clone, Copy)]
pub struct InstanceTransform(pub Transform);

/// Visibility component
#[derive(Debug, Clone, Copy)]
pub struct Visible(pub bool);

impl Default for Visible {
    fn default() -> Self {
        Self(true)
    }
}

// ============================================================================
// Sparse Capability Components
// ============================================================================

/// Per-instance tint colour.
#[derive(Debug, Clone, Copy)]
pub struct Tint(pub [f32; 4]);

/// Forces fields of every composed sort key for this instance, e.g. to
/// push an otherwise-opaque model into the alpha groups while tinted.
#[derive(Debug, Clone, Copy)]
pub struct SortOverride(pub SortKeyOverride);

/// Reflectivity weight consumed by the lighting pass.
#[derive(Debug, Clone, Copy)]
pub struct Reflectivity(pub f32);

/// Per-instance render-state overrides, the highest-priority layer in
/// the state merge.
#[derive(Debug, Clone, Copy)]
pub struct StateOverride(pub StateBlock);

// ============================================================================
// Utility Components
// ============================================================================

/// Name component for debugging
#[derive(Debug, Clone)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}
