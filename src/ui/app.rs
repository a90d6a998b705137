//! Main egui application with the playback viewport.

use std::sync::Arc;
use std::time::Instant;

use eframe::egui;

use crate::config::Config;
use crate::playback::{AssetState, GpuState, PlaybackSession, SessionStatus};

use super::renderer::FaceMeshRenderer;
use super::viewport::FaceViewportCallback;

/// The native egui application window.
pub struct FacemimeApp {
    config: Config,
    session: PlaybackSession,
    /// GPU renderer (created from wgpu render state)
    renderer: Option<FaceMeshRenderer>,
    /// Origin of the playback timeline
    start_time: Instant,
    looping: bool,
    /// Set when wgpu is not available at all
    init_error: Option<String>,
}

impl FacemimeApp {
    pub fn new(cc: &eframe::CreationContext<'_>, session: PlaybackSession, config: Config) -> Self {
        let (renderer, init_error) = match cc.wgpu_render_state.as_ref() {
            Some(rs) => (
                Some(FaceMeshRenderer::new(
                    Arc::clone(&rs.device),
                    Arc::clone(&rs.queue),
                    rs.target_format,
                    config.render.clear_color,
                )),
                None,
            ),
            None => {
                tracing::error!("wgpu render state not available");
                (None, Some("wgpu render state not available".to_string()))
            }
        };

        Self {
            looping: config.playback.loop_playback,
            config,
            session,
            renderer,
            start_time: Instant::now(),
            init_error,
        }
    }

    /// Launch the native UI window. Blocks until the window is closed.
    pub fn run(session: PlaybackSession, config: Config) -> eframe::Result {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title(config.window.title.clone())
                .with_inner_size([config.window.width as f32, config.window.height as f32]),
            ..Default::default()
        };

        eframe::run_native(
            "facemime",
            options,
            Box::new(move |cc| Ok(Box::new(Self::new(cc, session, config)))),
        )
    }

    fn now_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    fn reload(&mut self) {
        if let Some(path) = self.config.playback.avatar_path.clone() {
            self.session.set_avatar_path(path);
        }
        if let Some(path) = self.config.playback.animation_path.clone() {
            self.session.set_animation_path(path);
        }
    }

    fn status_panel(&mut self, ui: &mut egui::Ui, status: &SessionStatus) {
        ui.heading("Playback");
        ui.separator();

        asset_row(ui, "Avatar", status.avatar);
        asset_row(ui, "Animation", status.animation);
        ui.horizontal(|ui| {
            ui.label("Topology:");
            if status.topology_ready {
                ui.colored_label(egui::Color32::GREEN, "ready");
            } else {
                ui.colored_label(egui::Color32::RED, "failed");
            }
        });
        ui.horizontal(|ui| {
            ui.label("GPU:");
            match status.gpu {
                GpuState::Ready => ui.colored_label(egui::Color32::GREEN, "ready"),
                GpuState::Pending => ui.colored_label(egui::Color32::YELLOW, "pending"),
                GpuState::Failed => ui.colored_label(egui::Color32::RED, "failed"),
            };
        });

        ui.separator();

        match status.frame {
            Some(frame) => ui.label(format!("Frame: {}", frame)),
            None => ui.label("Frame: -"),
        };
        if let Some(animation) = self.session.animation() {
            ui.label(format!(
                "{} frames @ {} fps",
                animation.frame_count(),
                animation.fps()
            ));
        }

        ui.separator();

        if ui.checkbox(&mut self.looping, "Loop").changed() {
            self.session.set_looping(self.looping);
        }
        if ui.button("Reload").clicked() {
            self.reload();
        }

        if let Some(ref err) = status.error {
            ui.separator();
            ui.colored_label(egui::Color32::RED, err);
        }
    }
}

fn asset_row(ui: &mut egui::Ui, name: &str, state: AssetState) {
    ui.horizontal(|ui| {
        ui.label(format!("{}:", name));
        let color = match state {
            AssetState::Ready => egui::Color32::GREEN,
            AssetState::Loading => egui::Color32::YELLOW,
            AssetState::Empty => egui::Color32::GRAY,
            AssetState::Failed => egui::Color32::RED,
        };
        ui.colored_label(color, state.to_string());
    });
}

impl eframe::App for FacemimeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.session.poll();
        let status = self.session.status();

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.label("facemime");
                ui.separator();
                ui.label("expression playback");
            });
        });

        egui::SidePanel::left("status").show(ctx, |ui| {
            self.status_panel(ui, &status);
        });

        let now_ms = self.now_ms();
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(renderer) = self.renderer.as_mut() else {
                ui.heading("Avatar Preview");
                if let Some(ref err) = self.init_error {
                    ui.colored_label(egui::Color32::RED, err);
                }
                return;
            };

            let available_size = ui.available_size();
            let (rect, _response) = ui.allocate_exact_size(available_size, egui::Sense::hover());

            let ppp = ctx.pixels_per_point();
            let vp_width = (available_size.x * ppp) as u32;
            let vp_height = (available_size.y * ppp) as u32;
            self.session.resize(vp_width, vp_height);
            self.session.tick(now_ms, renderer);

            ui.painter().add(eframe::egui_wgpu::Callback::new_paint_callback(
                rect,
                FaceViewportCallback {
                    target: renderer.target(),
                },
            ));
        });

        // Repaint continuously for playback
        ctx.request_repaint();
    }
}
