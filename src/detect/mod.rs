mod backend;
pub mod backends;
mod criteria;
mod registry;
mod result;

pub use backend::DetectorBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use backends::{ReplayBackend, ScriptedBackend, StubBackend};
pub use criteria::{DetectionCriteria, DEFAULT_TARGET_LABEL, DEFAULT_THRESHOLD};
pub use registry::BackendRegistry;
pub use result::{Detection, DetectionResult};
