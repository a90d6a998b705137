//! The playback session: asset readiness, GPU setup, clock and projection.
//!
//! A render tick never blocks and never loads anything itself. It consumes
//! finished background loads, then draws only once the avatar, the animation,
//! the topology and the GPU texture are all ready, in that order.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::animation::AnimationFile;
use crate::avatar::{AvatarAsset, AvatarDecoder};
use crate::config::Config;
use crate::error::{FacemimeError, TopologyError};
use crate::mesh::MeshTopology;
use crate::projection::Projection;
use crate::render::{self, DrawOutcome, FaceRenderer};

use super::clock::{ClockState, PlaybackClock};
use super::slot::{AssetSlot, AssetState};

/// Whether the current avatar has been uploaded to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuState {
    Pending,
    Ready,
    Failed,
}

enum GpuSetup {
    Pending,
    Ready(Arc<AvatarAsset>),
    Failed(String),
}

/// Result of one render tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Some asset is still empty or loading; nothing was touched
    Waiting,
    /// Some asset or the renderer failed; nothing is drawn until a new path is set
    Unavailable,
    /// The frame had no face; the target was only cleared
    Cleared { frame: usize },
    /// The frame was drawn
    Drawn { frame: usize },
}

/// Snapshot of readiness for status displays.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub avatar: AssetState,
    pub animation: AssetState,
    pub topology_ready: bool,
    pub gpu: GpuState,
    pub frame: Option<usize>,
    pub error: Option<String>,
}

pub struct PlaybackSession {
    avatar: AssetSlot<AvatarAsset>,
    animation: AssetSlot<AnimationFile>,
    topology: Result<Arc<MeshTopology>, TopologyError>,
    decoder: Arc<dyn AvatarDecoder>,
    clock: PlaybackClock,
    projection: Projection,
    view: (u32, u32),
    viewport_dirty: bool,
    gpu: GpuSetup,
    frame: Option<usize>,
}

impl PlaybackSession {
    /// Create an empty session around a topology load result.
    pub fn new(
        topology: Result<Arc<MeshTopology>, TopologyError>,
        decoder: Arc<dyn AvatarDecoder>,
        looping: bool,
    ) -> Self {
        if let Err(e) = &topology {
            tracing::error!("Rendering unavailable, topology failed to load: {}", e);
        }

        Self {
            avatar: AssetSlot::new("avatar"),
            animation: AssetSlot::new("animation"),
            topology,
            decoder,
            clock: PlaybackClock::new(looping),
            projection: Projection::new(),
            view: (1, 1),
            viewport_dirty: true,
            gpu: GpuSetup::Pending,
            frame: None,
        }
    }

    /// Create a session from configuration and start loading any configured paths.
    pub fn from_config(config: &Config, decoder: Arc<dyn AvatarDecoder>) -> Self {
        let topology = match &config.render.topology_path {
            Some(path) => MeshTopology::from_file(path).map(Arc::new),
            None => MeshTopology::packaged(),
        };

        let mut session = Self::new(topology, decoder, config.playback.loop_playback);
        session.resize(config.window.width, config.window.height);

        if let Some(path) = &config.playback.avatar_path {
            session.set_avatar_path(path.clone());
        }
        if let Some(path) = &config.playback.animation_path {
            session.set_animation_path(path.clone());
        }

        session
    }

    /// Replace the avatar; it is decoded in the background.
    pub fn set_avatar_path(&mut self, path: PathBuf) {
        let decoder = Arc::clone(&self.decoder);
        self.avatar
            .request(path, move |p| decoder.decode(p).map_err(FacemimeError::from));
        self.gpu = GpuSetup::Pending;
    }

    /// Replace the animation; it is parsed in the background and playback restarts.
    pub fn set_animation_path(&mut self, path: PathBuf) {
        self.animation
            .request(path, |p| AnimationFile::load(p).map_err(FacemimeError::from));
        self.restart();
    }

    /// Report a new view size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.view != (width, height) {
            self.view = (width, height);
            self.viewport_dirty = true;
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.clock.set_looping(looping);
    }

    /// Consume finished background loads. Never blocks.
    pub fn poll(&mut self) {
        if self.avatar.poll() {
            self.gpu = GpuSetup::Pending;
        }
        if self.animation.poll() {
            self.restart();
        }
    }

    /// Block until both loads settle or `timeout` elapses.
    pub fn wait_until_settled(&mut self, timeout: Duration) -> SessionStatus {
        let deadline = Instant::now() + timeout;

        let before = self.avatar.state();
        let after = self
            .avatar
            .wait(deadline.saturating_duration_since(Instant::now()));
        if before != after {
            self.gpu = GpuSetup::Pending;
        }

        let before = self.animation.state();
        let after = self
            .animation
            .wait(deadline.saturating_duration_since(Instant::now()));
        if before != after {
            self.restart();
        }

        self.status()
    }

    /// Run one display refresh.
    pub fn tick<R: FaceRenderer + ?Sized>(&mut self, now_ms: u64, renderer: &mut R) -> TickOutcome {
        self.poll();

        let avatar = match self.avatar.state() {
            AssetState::Ready => self.avatar.get().cloned(),
            AssetState::Failed => return TickOutcome::Unavailable,
            AssetState::Empty | AssetState::Loading => return TickOutcome::Waiting,
        };
        let animation = match self.animation.state() {
            AssetState::Ready => self.animation.get().cloned(),
            AssetState::Failed => return TickOutcome::Unavailable,
            AssetState::Empty | AssetState::Loading => return TickOutcome::Waiting,
        };
        let (Some(avatar), Some(animation)) = (avatar, animation) else {
            return TickOutcome::Waiting;
        };
        let topology = match &self.topology {
            Ok(topology) => Arc::clone(topology),
            Err(_) => return TickOutcome::Unavailable,
        };

        if !self.ensure_gpu_setup(&avatar, renderer) {
            return TickOutcome::Unavailable;
        }

        if self.viewport_dirty {
            let (width, height) = self.view;
            if width > 0 && height > 0 {
                renderer.set_viewport(width, height);
            }
            self.viewport_dirty = false;
        }

        self.projection
            .update(animation.max_coord(), self.view.0, self.view.1);

        let index =
            self.clock
                .current_frame_index(animation.frame_count(), animation.fps(), now_ms);
        let Some(frame) = animation.frame(index) else {
            return TickOutcome::Waiting;
        };
        self.frame = Some(index);

        match render::render_frame(
            renderer,
            frame,
            &avatar,
            &topology,
            self.projection.matrix(),
        ) {
            DrawOutcome::Drawn => TickOutcome::Drawn { frame: index },
            DrawOutcome::Cleared => TickOutcome::Cleared { frame: index },
        }
    }

    pub fn status(&self) -> SessionStatus {
        let gpu = match self.gpu {
            GpuSetup::Pending => GpuState::Pending,
            GpuSetup::Ready(_) => GpuState::Ready,
            GpuSetup::Failed(_) => GpuState::Failed,
        };
        let topology_error = self.topology.as_ref().err().map(|e| e.to_string());
        let gpu_error = match &self.gpu {
            GpuSetup::Failed(message) => Some(message.clone()),
            _ => None,
        };
        let error = self
            .avatar
            .error()
            .map(|e| e.to_string())
            .or_else(|| self.animation.error().map(|e| e.to_string()))
            .or(topology_error)
            .or(gpu_error);

        SessionStatus {
            avatar: self.avatar.state(),
            animation: self.animation.state(),
            topology_ready: self.topology.is_ok(),
            gpu,
            frame: self.frame,
            error,
        }
    }

    pub fn avatar(&self) -> Option<&Arc<AvatarAsset>> {
        self.avatar.get()
    }

    pub fn animation(&self) -> Option<&Arc<AnimationFile>> {
        self.animation.get()
    }

    pub fn topology(&self) -> Option<&Arc<MeshTopology>> {
        self.topology.as_ref().ok()
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    fn restart(&mut self) {
        self.clock.reset();
        self.projection.invalidate();
        self.frame = None;
    }

    /// Upload the avatar once per avatar. Returns false if the renderer refused it.
    fn ensure_gpu_setup<R: FaceRenderer + ?Sized>(
        &mut self,
        avatar: &Arc<AvatarAsset>,
        renderer: &mut R,
    ) -> bool {
        match &self.gpu {
            GpuSetup::Ready(uploaded) if Arc::ptr_eq(uploaded, avatar) => return true,
            GpuSetup::Failed(_) => return false,
            _ => {}
        }

        match renderer.upload_avatar(avatar) {
            Ok(()) => {
                tracing::info!(
                    "Avatar texture uploaded ({}x{})",
                    avatar.width(),
                    avatar.height()
                );
                self.gpu = GpuSetup::Ready(Arc::clone(avatar));
                true
            }
            Err(e) => {
                tracing::warn!("GPU setup failed: {}", e);
                self.gpu = GpuSetup::Failed(e.to_string());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AvatarError, RenderError};
    use crate::render::headless::HeadlessRenderer;
    use crate::render::MeshDraw;
    use crate::NUM_LANDMARKS;
    use glam::Vec2;
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(5);

    struct StubDecoder;

    impl AvatarDecoder for StubDecoder {
        fn decode(&self, path: &Path) -> Result<AvatarAsset, AvatarError> {
            if path.ends_with("broken.png") {
                return Err(AvatarError::Decode("corrupt".to_string()));
            }
            AvatarAsset::new(2, 2, vec![128; 16], vec![Vec2::splat(0.25); NUM_LANDMARKS])
        }
    }

    struct RefusingRenderer(HeadlessRenderer);

    impl FaceRenderer for RefusingRenderer {
        fn upload_avatar(&mut self, _avatar: &AvatarAsset) -> Result<(), RenderError> {
            Err(RenderError::TextureUpload("out of memory".to_string()))
        }
        fn set_viewport(&mut self, width: u32, height: u32) {
            self.0.set_viewport(width, height);
        }
        fn clear(&mut self) {
            self.0.clear();
        }
        fn draw_indexed(&mut self, draw: &MeshDraw<'_>) {
            self.0.draw_indexed(draw);
        }
    }

    fn write_animation(dir: &TempDir, name: &str, fps: f64, faces: &[bool]) -> PathBuf {
        let frames: Vec<serde_json::Value> = faces
            .iter()
            .map(|&has_face| {
                if has_face {
                    json!({ "has_face": true, "points3d": vec![[2.0f32, 1.0, 0.5]; NUM_LANDMARKS] })
                } else {
                    json!({ "has_face": false })
                }
            })
            .collect();
        let path = dir.path().join(name);
        std::fs::write(&path, json!({ "fps": fps, "frames": frames }).to_string()).unwrap();
        path
    }

    fn topology() -> Result<Arc<MeshTopology>, TopologyError> {
        MeshTopology::parse("n_tri: 2 { 0 1 2 2 3 0 }").map(Arc::new)
    }

    fn ready_session(dir: &TempDir, faces: &[bool]) -> PlaybackSession {
        let mut session = PlaybackSession::new(topology(), Arc::new(StubDecoder), false);
        session.set_avatar_path(PathBuf::from("avatar.png"));
        session.set_animation_path(write_animation(dir, "anim.json", 10.0, faces));
        let status = session.wait_until_settled(WAIT);
        assert_eq!(status.avatar, AssetState::Ready);
        assert_eq!(status.animation, AssetState::Ready);
        session
    }

    #[test]
    fn test_waits_until_assets_ready() {
        let mut session = PlaybackSession::new(topology(), Arc::new(StubDecoder), false);
        let mut renderer = HeadlessRenderer::new();

        assert_eq!(session.tick(0, &mut renderer), TickOutcome::Waiting);
        assert_eq!(renderer.clear_count(), 0);
        assert_eq!(renderer.upload_count(), 0);
        assert_eq!(session.clock_state(), ClockState::NotStarted);
    }

    #[test]
    fn test_plays_frames_over_time() {
        let dir = TempDir::new().unwrap();
        let mut session = ready_session(&dir, &[true, false, true]);
        let mut renderer = HeadlessRenderer::new();
        session.resize(200, 100);

        assert_eq!(session.tick(1_000, &mut renderer), TickOutcome::Drawn { frame: 0 });
        assert_eq!(session.tick(1_100, &mut renderer), TickOutcome::Cleared { frame: 1 });
        assert_eq!(session.tick(1_200, &mut renderer), TickOutcome::Drawn { frame: 2 });
        assert_eq!(session.tick(9_000, &mut renderer), TickOutcome::Drawn { frame: 2 });

        assert_eq!(renderer.upload_count(), 1);
        assert_eq!(renderer.texture_size(), Some((2, 2)));
        assert_eq!(renderer.viewport(), Some((200, 100)));
        assert_eq!(renderer.clear_count(), 4);
        assert_eq!(renderer.draw_count(), 3);

        // max_coord = 2.0, landscape view halves X
        let draw = renderer.last_draw().unwrap();
        assert_eq!(draw.projected[0], glam::Vec3::new(0.5, -0.5, 0.25));
    }

    #[test]
    fn test_faceless_frame_draws_nothing() {
        let dir = TempDir::new().unwrap();
        let mut session = ready_session(&dir, &[false]);
        let mut renderer = HeadlessRenderer::new();

        assert_eq!(session.tick(0, &mut renderer), TickOutcome::Cleared { frame: 0 });
        assert_eq!(renderer.clear_count(), 1);
        assert_eq!(renderer.draw_count(), 0);
    }

    #[test]
    fn test_reload_resets_clock() {
        let dir = TempDir::new().unwrap();
        let mut session = ready_session(&dir, &[true; 20]);
        let mut renderer = HeadlessRenderer::new();

        session.tick(0, &mut renderer);
        assert_eq!(session.tick(1_000, &mut renderer), TickOutcome::Drawn { frame: 10 });

        session.set_animation_path(write_animation(&dir, "other.json", 10.0, &[true; 20]));
        assert_eq!(session.clock_state(), ClockState::NotStarted);

        session.wait_until_settled(WAIT);
        assert_eq!(session.clock_state(), ClockState::NotStarted);
        assert_eq!(session.tick(5_000, &mut renderer), TickOutcome::Drawn { frame: 0 });
        assert_eq!(
            session.clock_state(),
            ClockState::Running { start_ms: 5_000 }
        );
        assert_eq!(session.tick(5_300, &mut renderer), TickOutcome::Drawn { frame: 3 });
    }

    #[test]
    fn test_failed_animation_is_unavailable_until_replaced() {
        let dir = TempDir::new().unwrap();
        let mut session = PlaybackSession::new(topology(), Arc::new(StubDecoder), false);
        let mut renderer = HeadlessRenderer::new();

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, r#"{ "fps": 30, "frames": [] }"#).unwrap();
        session.set_avatar_path(PathBuf::from("avatar.png"));
        session.set_animation_path(empty);

        let status = session.wait_until_settled(WAIT);
        assert_eq!(status.animation, AssetState::Failed);
        assert!(status.error.unwrap().contains("no frames"));
        for now in [0, 100, 10_000] {
            assert_eq!(session.tick(now, &mut renderer), TickOutcome::Unavailable);
        }
        assert_eq!(renderer.draw_count(), 0);

        session.set_animation_path(write_animation(&dir, "good.json", 30.0, &[true]));
        session.wait_until_settled(WAIT);
        assert_eq!(session.tick(20_000, &mut renderer), TickOutcome::Drawn { frame: 0 });
    }

    #[test]
    fn test_avatar_failure() {
        let dir = TempDir::new().unwrap();
        let mut session = PlaybackSession::new(topology(), Arc::new(StubDecoder), false);
        let mut renderer = HeadlessRenderer::new();

        session.set_avatar_path(PathBuf::from("broken.png"));
        session.set_animation_path(write_animation(&dir, "anim.json", 30.0, &[true]));
        let status = session.wait_until_settled(WAIT);

        assert_eq!(status.avatar, AssetState::Failed);
        assert_eq!(session.tick(0, &mut renderer), TickOutcome::Unavailable);
        assert_eq!(renderer.upload_count(), 0);
    }

    #[test]
    fn test_missing_topology_disables_rendering() {
        let dir = TempDir::new().unwrap();
        let broken = MeshTopology::parse("n_tri: 2 { 0 1 2 }").map(Arc::new);
        let mut session = PlaybackSession::new(broken, Arc::new(StubDecoder), false);
        let mut renderer = HeadlessRenderer::new();

        session.set_avatar_path(PathBuf::from("avatar.png"));
        session.set_animation_path(write_animation(&dir, "anim.json", 30.0, &[true]));
        let status = session.wait_until_settled(WAIT);

        assert!(!status.topology_ready);
        assert_eq!(session.tick(0, &mut renderer), TickOutcome::Unavailable);
        assert_eq!(renderer.clear_count(), 0);
    }

    #[test]
    fn test_gpu_setup_failure() {
        let dir = TempDir::new().unwrap();
        let mut session = ready_session(&dir, &[true]);
        let mut renderer = RefusingRenderer(HeadlessRenderer::new());

        assert_eq!(session.tick(0, &mut renderer), TickOutcome::Unavailable);
        assert_eq!(session.status().gpu, GpuState::Failed);
        assert_eq!(renderer.0.draw_count(), 0);

        // A new avatar gets another attempt
        session.set_avatar_path(PathBuf::from("second.png"));
        session.wait_until_settled(WAIT);
        let mut working = HeadlessRenderer::new();
        assert_eq!(session.tick(10, &mut working), TickOutcome::Drawn { frame: 0 });
        assert_eq!(session.status().gpu, GpuState::Ready);
    }

    #[test]
    fn test_resize_recomputes_projection() {
        let dir = TempDir::new().unwrap();
        let mut session = ready_session(&dir, &[true]);
        let mut renderer = HeadlessRenderer::new();

        session.resize(1000, 500);
        session.tick(0, &mut renderer);
        let landscape = *session.projection().matrix();

        session.resize(500, 1000);
        session.tick(1, &mut renderer);
        let portrait = *session.projection().matrix();

        assert_eq!(renderer.viewport(), Some((500, 1000)));
        assert_eq!(landscape.x_axis.x, -portrait.y_axis.y);
        assert_eq!(landscape.z_axis.z, portrait.z_axis.z);
    }

    #[test]
    fn test_from_config() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.playback.avatar_path = Some(PathBuf::from("avatar.png"));
        config.playback.animation_path =
            Some(write_animation(&dir, "anim.json", 30.0, &[true, true]));
        config.playback.loop_playback = true;

        let mut session = PlaybackSession::from_config(&config, Arc::new(StubDecoder));
        let status = session.wait_until_settled(WAIT);
        assert_eq!(status.avatar, AssetState::Ready);
        assert_eq!(status.animation, AssetState::Ready);
        assert!(status.topology_ready);
        assert!(session.topology().unwrap().triangle_count() > 0);

        let mut renderer = HeadlessRenderer::new();
        assert_eq!(renderer.viewport(), None);
        session.tick(0, &mut renderer);
        assert_eq!(renderer.viewport(), Some((800, 600)));
        // Looping wraps back to the first frame
        assert_eq!(session.tick(67, &mut renderer), TickOutcome::Drawn { frame: 0 });
    }
}
