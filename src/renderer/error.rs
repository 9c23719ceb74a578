use thiserror::Error;

use super::shader::{StageId, StageKind};
use super::step::RenderPassKind;

/// Structural pipeline failures. These indicate caller setup bugs and
/// abort the frame; degenerate geometry and absent optional components
/// are handled as no-ops, never through this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A shader stage id did not resolve in the catalog. Carries the
    /// unresolved identifier and stage kind for diagnosability.
    #[error("shader stage not found: {kind:?} id {id:?}")]
    ShaderNotFound { id: StageId, kind: StageKind },

    /// A drawable nugget reached execution without one of the mandatory
    /// vertex/pixel stages bound for the pass.
    #[error("missing mandatory {kind:?} stage for {pass:?} pass")]
    MissingStage { pass: RenderPassKind, kind: StageKind },

    /// A pass that renders off-screen was executed with no target bound.
    #[error("{pass:?} pass executed without a render target")]
    MissingTarget { pass: RenderPassKind },
}
