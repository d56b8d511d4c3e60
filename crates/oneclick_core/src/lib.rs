//! One-click core: pure upload-flow state machine and view-model helpers.
mod effect;
mod endpoints;
mod msg;
mod settings;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use endpoints::{BackendEndpoints, EndpointError, DEFAULT_BACKEND_URL};
pub use msg::Msg;
pub use settings::{Settings, Theme};
pub use state::{AppState, FileHandle, ReadinessPolicy, RemoteJobState, UploadStatus};
pub use update::update;
pub use view_model::AppViewModel;
