pub mod asset;
pub mod renderer;
pub mod scene;
pub mod settings;

pub use asset::{AssetCache, Bounds, Geometry, Handle};
pub use renderer::{
    CullMode, Device, DeviceCall, Drawlist, DrawlistEntry, ExecutedStep, GeometryFlags, Light,
    LightsData, Model, ModelAssets, Nugget, NuggetDesc, NuggetKey, PassTarget, PerPassShaders,
    RecordingDevice, RenderError, RenderPassKind, RenderStep, ShaderCatalog, ShaderLib, ShaderSet,
    ShadowProjector, SortGroup, SortKey, SortKeyOverride, StageId, StageKind, StageProgram,
    StateBlock, StateStack, TargetId, TextureRef,
};
pub use scene::{Camera, FrameStats, Ray, RayHit, Scene, Transform};
pub use settings::PipelineSettings;

/// Initialise logging for binaries and examples. Tests and library
/// consumers configure their own subscriber.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
