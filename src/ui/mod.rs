//! Native egui window for facemime.
//!
//! Provides a desktop window with:
//! - The playback viewport, rendered with wgpu
//! - Readiness of the avatar, animation, topology and GPU setup
//!
//! Enabled via `--features native-ui`.

mod app;
mod renderer;
mod viewport;

pub use app::FacemimeApp;
pub use renderer::{FaceMeshRenderer, OffscreenTarget};
