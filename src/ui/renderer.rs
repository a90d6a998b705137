//! wgpu implementation of [`FaceRenderer`].
//!
//! Draws the textured face mesh into an offscreen color target. The target is
//! shared with the egui paint callback, which blits it into the window.

#![cfg(feature = "native-ui")]

use std::sync::{Arc, Mutex, MutexGuard};

use bytemuck::{Pod, Zeroable};
use eframe::wgpu;
use glam::{Vec2, Vec3};

use crate::avatar::AvatarAsset;
use crate::error::RenderError;
use crate::render::{FaceRenderer, MeshDraw};
use crate::NUM_LANDMARKS;

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// `u_camera` uniform block.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CameraUniform {
    u_camera: [[f32; 4]; 4],
}

/// Attribute layouts matching the shader: positions and UVs live in separate buffers.
fn position_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vec3>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBS,
    }
}

fn uv_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vec2>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBS,
    }
}

/// Avatar texture and the bind group that samples it.
struct AvatarBinding {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct IndexBuffer {
    buffer: wgpu::Buffer,
    contents: Vec<u32>,
}

struct OffscreenState {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    blit_bind_group: wgpu::BindGroup,
    size: [u32; 2],
}

/// Offscreen color target plus the pipeline that copies it into egui's pass.
pub struct OffscreenTarget {
    blit_pipeline: wgpu::RenderPipeline,
    blit_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    state: Mutex<OffscreenState>,
}

impl OffscreenTarget {
    fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("face_blit_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("blit.wgsl").into()),
        });

        let blit_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("face_blit_bgl"),
                entries: &[texture_entry(0), sampler_entry(1)],
            });

        let blit_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("face_blit_pl"),
                bind_group_layouts: &[&blit_bind_group_layout],
                push_constant_ranges: &[],
            });

        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("face_blit_pipeline"),
            layout: Some(&blit_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: Some("vs_blit"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: Some("fs_blit"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("face_blit_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let state = Self::create_state(device, &blit_bind_group_layout, &sampler, width, height);

        Self {
            blit_pipeline,
            blit_bind_group_layout,
            sampler,
            state: Mutex::new(state),
        }
    }

    fn create_state(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
    ) -> OffscreenState {
        let (texture, view) = create_color_texture(device, width, height);
        let blit_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("face_blit_bg"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        OffscreenState {
            _texture: texture,
            view,
            blit_bind_group,
            size: [width, height],
        }
    }

    fn lock(&self) -> MutexGuard<'_, OffscreenState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Recreate the color target if the size changed. Zero sizes are ignored.
    fn resize(&self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        let mut state = self.lock();
        if state.size == [width, height] {
            return;
        }
        *state = Self::create_state(
            device,
            &self.blit_bind_group_layout,
            &self.sampler,
            width,
            height,
        );
    }

    /// Copy the offscreen image into the current render pass. Call this in `paint()`.
    pub fn blit(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        let state = self.lock();
        render_pass.set_pipeline(&self.blit_pipeline);
        render_pass.set_bind_group(0, Some(&state.blit_bind_group), &[]);
        drop(state);
        render_pass.draw(0..3, 0..1);
    }
}

/// Renders the avatar mesh with wgpu.
pub struct FaceMeshRenderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: wgpu::RenderPipeline,
    mesh_bind_group_layout: wgpu::BindGroupLayout,
    avatar_sampler: wgpu::Sampler,
    camera_buffer: wgpu::Buffer,
    position_buffer: wgpu::Buffer,
    uv_buffer: wgpu::Buffer,
    index_buffer: Option<IndexBuffer>,
    avatar: Option<AvatarBinding>,
    clear_color: wgpu::Color,
    target: Arc<OffscreenTarget>,
}

impl FaceMeshRenderer {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        target_format: wgpu::TextureFormat,
        clear_color: [f32; 4],
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("face_mesh_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let mesh_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("face_mesh_bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    texture_entry(1),
                    sampler_entry(2),
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("face_mesh_pl"),
            bind_group_layouts: &[&mesh_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("face_mesh_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[position_layout(), uv_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: OFFSCREEN_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                // The Y flip reverses winding
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let avatar_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("face_avatar_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("face_camera_ub"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let position_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("face_position_vb"),
            size: (NUM_LANDMARKS * std::mem::size_of::<Vec3>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uv_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("face_uv_vb"),
            size: (NUM_LANDMARKS * std::mem::size_of::<Vec2>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let target = Arc::new(OffscreenTarget::new(&device, target_format, 1, 1));

        let [r, g, b, a] = clear_color.map(f64::from);

        Self {
            device,
            queue,
            pipeline,
            mesh_bind_group_layout,
            avatar_sampler,
            camera_buffer,
            position_buffer,
            uv_buffer,
            index_buffer: None,
            avatar: None,
            clear_color: wgpu::Color { r, g, b, a },
            target,
        }
    }

    /// The color target shared with the paint callback.
    pub fn target(&self) -> Arc<OffscreenTarget> {
        Arc::clone(&self.target)
    }

    fn sync_indices(&mut self, indices: &[u32]) {
        if let Some(existing) = &self.index_buffer {
            if existing.contents == indices {
                return;
            }
        }

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("face_mesh_ib"),
            size: std::mem::size_of_val(indices) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue
            .write_buffer(&buffer, 0, bytemuck::cast_slice(indices));
        self.index_buffer = Some(IndexBuffer {
            buffer,
            contents: indices.to_vec(),
        });
    }

    fn submit_pass(&self, load: wgpu::LoadOp<wgpu::Color>, index_count: Option<u32>) {
        let state = self.target.lock();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("face_offscreen_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("face_offscreen_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &state.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });

            if let (Some(count), Some(avatar), Some(indices)) =
                (index_count, &self.avatar, &self.index_buffer)
            {
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &avatar.bind_group, &[]);
                pass.set_vertex_buffer(0, self.position_buffer.slice(..));
                pass.set_vertex_buffer(1, self.uv_buffer.slice(..));
                pass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..count, 0, 0..1);
            }
        }

        drop(state);
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl FaceRenderer for FaceMeshRenderer {
    fn upload_avatar(&mut self, avatar: &AvatarAsset) -> Result<(), RenderError> {
        let (width, height) = avatar.dimensions();
        let limit = self.device.limits().max_texture_dimension_2d;
        if width > limit || height > limit {
            return Err(RenderError::TextureUpload(format!(
                "{}x{} exceeds the device limit of {}",
                width, height, limit
            )));
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("face_avatar_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            avatar.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&Default::default());

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("face_mesh_bg"),
            layout: &self.mesh_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.avatar_sampler),
                },
            ],
        });

        self.avatar = Some(AvatarBinding {
            _texture: texture,
            bind_group,
        });
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.target.resize(&self.device, width, height);
    }

    fn clear(&mut self) {
        self.submit_pass(wgpu::LoadOp::Clear(self.clear_color), None);
    }

    fn draw_indexed(&mut self, draw: &MeshDraw<'_>) {
        if self.avatar.is_none() {
            tracing::warn!("Draw requested before the avatar texture was uploaded");
            return;
        }

        let uniform = CameraUniform {
            u_camera: draw.transform.to_cols_array_2d(),
        };
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniform));
        self.queue
            .write_buffer(&self.position_buffer, 0, bytemuck::cast_slice(draw.positions));
        self.queue
            .write_buffer(&self.uv_buffer, 0, bytemuck::cast_slice(draw.uvs));
        self.sync_indices(draw.indices);

        self.submit_pass(wgpu::LoadOp::Load, Some(draw.indices.len() as u32));
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn create_color_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("face_offscreen_color"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&Default::default());
    (texture, view)
}
