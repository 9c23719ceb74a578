pub mod device;
pub mod drawlist;
pub mod error;
pub mod lights;
pub mod model;
pub mod nugget;
pub mod shader;
pub mod shadow;
pub mod sort_key;
pub mod state;
pub mod state_stack;
pub mod step;
pub mod uniforms;

pub use device::{Device, DeviceCall, RecordingDevice};
pub use drawlist::{Drawlist, DrawlistEntry};
pub use error::RenderError;
pub use lights::{Light, LightKind, LightsData, MAX_LIGHTS, MAX_SHADOW_CASTERS};
pub use model::{Model, ModelAssets};
pub use nugget::{GeometryFlags, Nugget, NuggetDesc, NuggetKey, TextureRef};
pub use shader::{
    PerPassShaders, ShaderCatalog, ShaderLib, ShaderSet, StageId, StageKind, StageProgram,
};
pub use shadow::{
    compute_casters, frustum_faces, FaceKind, FrustumFace, ShadowCaster, ShadowProjector,
    FRUSTUM_FACE_COUNT,
};
pub use sort_key::{SortGroup, SortKey, SortKeyOverride, MAX_SORT_GROUPS};
pub use state::{CullMode, ResolvedState, StateBlock};
pub use state_stack::StateStack;
pub use step::{ExecutedStep, PassTarget, RenderPassKind, RenderStep, TargetId};
pub use uniforms::{CameraUniform, ObjectConstants, PassConstants, ShadowUniform};
