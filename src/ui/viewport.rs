//! egui-wgpu `CallbackTrait` implementation for the playback viewport.
//!
//! The face is rendered offscreen during `update()`; `paint()` only copies the
//! result into the egui render pass.

#![cfg(feature = "native-ui")]

use eframe::egui_wgpu;
use eframe::wgpu;
use std::sync::Arc;

use super::renderer::OffscreenTarget;

/// Paint callback that blits the face target into the egui render pass.
pub struct FaceViewportCallback {
    pub target: Arc<OffscreenTarget>,
}

impl egui_wgpu::CallbackTrait for FaceViewportCallback {
    fn paint(
        &self,
        _info: eframe::egui::PaintCallbackInfo,
        render_pass: &mut wgpu::RenderPass<'static>,
        _callback_resources: &egui_wgpu::CallbackResources,
    ) {
        self.target.blit(render_pass);
    }
}
