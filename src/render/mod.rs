mod shaders;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::{bytes_of, cast_slice, Pod, Zeroable};
use glam::{Mat4, Vec3};
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::app::Viewport;
use crate::fireflies::FireflyField;
use crate::material::Material;
use crate::mesh::{MeshData, VERTEX_STRIDE};
use crate::scene::SceneGraph;
use crate::texture::BakedTexture;
use crate::uniforms::SceneUniforms;

/// Camera parameters consumed by the renderer's global uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

/// GPU renderer for the portal scene: baked/flat/portal mesh pipelines plus
/// the additive fireflies pass, all drawn in a single render pass.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    clear_color: wgpu::Color,

    global_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,

    baked_pipeline: wgpu::RenderPipeline,
    flat_pipeline: wgpu::RenderPipeline,
    portal_pipeline: wgpu::RenderPipeline,
    fireflies_pipeline: wgpu::RenderPipeline,

    texture_bind_group: wgpu::BindGroup,
    portal_buffer: wgpu::Buffer,
    portal_bind_group: wgpu::BindGroup,
    fireflies_buffer: wgpu::Buffer,
    fireflies_bind_group: wgpu::BindGroup,

    quad_vertices: wgpu::Buffer,
    quad_indices: wgpu::Buffer,
    firefly_count: u32,

    draws: Vec<MeshDraw>,
}

struct MeshDraw {
    kind: DrawKind,
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
    constants: wgpu::BindGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrawKind {
    Baked,
    Flat,
    Portal,
}

const QUAD_CORNERS: [[f32; 2]; 4] = [[-0.5, -0.5], [-0.5, 0.5], [0.5, -0.5], [0.5, 0.5]];
const QUAD_INDICES: [u16; 6] = [0, 2, 1, 1, 2, 3];

impl Renderer {
    /// Initializes the GPU renderer for the provided window and scene data.
    ///
    /// `graph` may be empty (a failed model load still renders background and
    /// fireflies); nodes without a bound material or mesh are skipped.
    pub async fn new(
        window: Arc<Window>,
        graph: &SceneGraph,
        meshes: &HashMap<String, MeshData>,
        texture: &BakedTexture,
        fireflies: &FireflyField,
    ) -> Result<Self> {
        use wgpu::util::DeviceExt;

        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("portal-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);

        // Bind group layouts shared across the pipelines.
        let global_layout = uniform_layout::<GlobalUniform>(&device, "global-bind-layout");
        let constants_layout = uniform_layout::<MeshConstants>(&device, "mesh-bind-layout");
        let portal_layout = uniform_layout::<PortalUniform>(&device, "portal-bind-layout");

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("baked-texture-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let fireflies_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fireflies-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<FirefliesUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<FireflyInstance>() as u64,
                        ),
                    },
                    count: None,
                },
            ],
        });

        // Shader modules.
        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh-shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::MESH_SHADER.into()),
        });
        let portal_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("portal-shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::PORTAL_SHADER.into()),
        });
        let fireflies_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fireflies-shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::FIREFLIES_SHADER.into()),
        });

        let mesh_vertex_layout = wgpu::VertexBufferLayout {
            array_stride: (VERTEX_STRIDE * std::mem::size_of::<f32>()) as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: (3 * std::mem::size_of::<f32>()) as u64,
                    shader_location: 1,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: (6 * std::mem::size_of::<f32>()) as u64,
                    shader_location: 2,
                },
            ],
        };

        let baked_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("baked-pipeline-layout"),
                bind_group_layouts: &[&global_layout, &constants_layout, &texture_layout],
                push_constant_ranges: &[],
            });
        let flat_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("flat-pipeline-layout"),
            bind_group_layouts: &[&global_layout, &constants_layout],
            push_constant_ranges: &[],
        });
        let portal_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("portal-pipeline-layout"),
                bind_group_layouts: &[&global_layout, &portal_layout],
                push_constant_ranges: &[],
            });
        let fireflies_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("fireflies-pipeline-layout"),
                bind_group_layouts: &[&global_layout, &fireflies_layout],
                push_constant_ranges: &[],
            });

        let baked_pipeline = build_mesh_pipeline(
            &device,
            "baked-pipeline",
            &baked_pipeline_layout,
            &mesh_shader,
            "fs_baked",
            mesh_vertex_layout.clone(),
            surface_format,
        );
        let flat_pipeline = build_mesh_pipeline(
            &device,
            "flat-pipeline",
            &flat_pipeline_layout,
            &mesh_shader,
            "fs_flat",
            mesh_vertex_layout.clone(),
            surface_format,
        );
        let portal_pipeline = build_mesh_pipeline(
            &device,
            "portal-pipeline",
            &portal_pipeline_layout,
            &portal_shader,
            "fs_main",
            mesh_vertex_layout.clone(),
            surface_format,
        );

        let fireflies_pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("fireflies-pipeline"),
                layout: Some(&fireflies_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &fireflies_shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: (2 * std::mem::size_of::<f32>()) as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 0,
                            shader_location: 0,
                        }],
                    }],
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    ..Default::default()
                },
                // Additive glow: test against the scene but never write depth.
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DepthBuffer::FORMAT,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &fireflies_shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: Some(wgpu::BlendState {
                            color: wgpu::BlendComponent {
                                src_factor: wgpu::BlendFactor::One,
                                dst_factor: wgpu::BlendFactor::One,
                                operation: wgpu::BlendOperation::Add,
                            },
                            alpha: wgpu::BlendComponent {
                                src_factor: wgpu::BlendFactor::One,
                                dst_factor: wgpu::BlendFactor::One,
                                operation: wgpu::BlendOperation::Add,
                            },
                        }),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            });

        // Static buffers.
        let global_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("global-uniform"),
            size: std::mem::size_of::<GlobalUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("global-bind-group"),
            layout: &global_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: global_buffer.as_entire_binding(),
            }],
        });

        let portal_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("portal-uniform"),
            size: std::mem::size_of::<PortalUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let portal_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("portal-bind-group"),
            layout: &portal_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: portal_buffer.as_entire_binding(),
            }],
        });

        let fireflies_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fireflies-uniform"),
            size: std::mem::size_of::<FirefliesUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let instances: Vec<FireflyInstance> = fireflies
            .positions
            .chunks_exact(3)
            .zip(fireflies.scales.iter())
            .map(|(position, scale)| FireflyInstance {
                position: [position[0], position[1], position[2]],
                scale: *scale,
            })
            .collect();
        // An empty storage binding is invalid; keep one zeroed instance and
        // draw zero of it instead.
        let instance_data = if instances.is_empty() {
            vec![FireflyInstance::zeroed()]
        } else {
            instances
        };
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fireflies-instances"),
            contents: cast_slice(&instance_data),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let fireflies_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fireflies-bind-group"),
            layout: &fireflies_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: fireflies_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: instance_buffer.as_entire_binding(),
                },
            ],
        });

        let quad_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fireflies-quad-vertices"),
            contents: bytes_of(&QUAD_CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fireflies-quad-indices"),
            contents: bytes_of(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let texture_bind_group =
            upload_baked_texture(&device, &queue, &texture_layout, texture);

        let draws = build_draws(&device, &constants_layout, graph, meshes);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            clear_color: wgpu::Color::BLACK,
            global_buffer,
            global_bind_group,
            baked_pipeline,
            flat_pipeline,
            portal_pipeline,
            fireflies_pipeline,
            texture_bind_group,
            portal_buffer,
            portal_bind_group,
            fireflies_buffer,
            fireflies_bind_group,
            quad_vertices,
            quad_indices,
            firefly_count: fireflies.len() as u32,
            draws,
        })
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// Exposes the inner window for event handling.
    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Resizes the swap chain to match the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    /// Updates the background clear color from the tweak state.
    pub fn set_clear_color(&mut self, color: Vec3) {
        self.clear_color = wgpu::Color {
            r: color.x as f64,
            g: color.y as f64,
            b: color.z as f64,
            a: 1.0,
        };
    }

    /// Writes the camera and per-material uniforms for this frame.
    pub fn update_uniforms(
        &self,
        camera: &CameraParams,
        uniforms: &SceneUniforms,
        viewport: &Viewport,
    ) {
        let global = GlobalUniform {
            view_proj: camera.view_proj.to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).into(),
        };
        self.queue
            .write_buffer(&self.global_buffer, 0, bytes_of(&global));

        let portal = PortalUniform {
            time: uniforms.portal.time,
            _pad0: [0.0; 3],
            color_start: uniforms.portal.color_start.into(),
            _pad1: 0.0,
            color_end: uniforms.portal.color_end.into(),
            _pad2: 0.0,
        };
        self.queue
            .write_buffer(&self.portal_buffer, 0, bytes_of(&portal));

        let fireflies = FirefliesUniform {
            pixel_ratio: viewport.pixel_ratio(),
            size: uniforms.fireflies.size,
            time: uniforms.fireflies.time,
            _pad0: 0.0,
            resolution: [self.size.width as f32, self.size.height as f32],
            _pad1: [0.0; 2],
        };
        self.queue
            .write_buffer(&self.fireflies_buffer, 0, bytes_of(&fireflies));
    }

    /// Submits one frame.
    ///
    /// `overlay` is invoked after the scene pass with the frame still open,
    /// so the debug panel can paint on top before presentation.
    pub fn render(
        &mut self,
        overlay: Option<&mut OverlayFn<'_>>,
    ) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("portal-encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("portal-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_bind_group(0, &self.global_bind_group, &[]);

            for draw in &self.draws {
                match draw.kind {
                    DrawKind::Baked => {
                        pass.set_pipeline(&self.baked_pipeline);
                        pass.set_bind_group(2, &self.texture_bind_group, &[]);
                    }
                    DrawKind::Flat => pass.set_pipeline(&self.flat_pipeline),
                    DrawKind::Portal => pass.set_pipeline(&self.portal_pipeline),
                }
                match draw.kind {
                    DrawKind::Portal => pass.set_bind_group(1, &self.portal_bind_group, &[]),
                    _ => pass.set_bind_group(1, &draw.constants, &[]),
                }
                pass.set_vertex_buffer(0, draw.vertex.slice(..));
                pass.set_index_buffer(draw.index.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }

            if self.firefly_count > 0 {
                pass.set_pipeline(&self.fireflies_pipeline);
                pass.set_bind_group(1, &self.fireflies_bind_group, &[]);
                pass.set_vertex_buffer(0, self.quad_vertices.slice(..));
                pass.set_index_buffer(self.quad_indices.slice(..), wgpu::IndexFormat::Uint16);
                pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..self.firefly_count);
            }
        }

        if let Some(overlay) = overlay {
            overlay(
                &self.device,
                &self.queue,
                &mut encoder,
                &view,
                [self.size.width, self.size.height],
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

/// Callback painting over the finished scene frame (see [`Renderer::render`]).
pub type OverlayFn<'a> = dyn FnMut(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView, [u32; 2])
    + 'a;

fn build_mesh_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    fragment_entry: &str,
    vertex_layout: wgpu::VertexBufferLayout<'_>,
    surface_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[vertex_layout],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            // The portal plane is viewed from both sides; nothing else in the
            // scene is closed enough to benefit from culling.
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

fn build_draws(
    device: &wgpu::Device,
    constants_layout: &wgpu::BindGroupLayout,
    graph: &SceneGraph,
    meshes: &HashMap<String, MeshData>,
) -> Vec<MeshDraw> {
    use wgpu::util::DeviceExt;

    let mut draws = Vec::new();
    for node in &graph.nodes {
        let (Some(material), Some(mesh_name)) = (&node.material, node.mesh.as_deref()) else {
            continue;
        };
        let Some(mesh) = meshes.get(mesh_name) else {
            log::warn!("mesh {mesh_name} referenced by {} is missing", node.name);
            continue;
        };

        let (kind, color) = match material {
            Material::Baked { .. } => (DrawKind::Baked, Vec3::ONE),
            Material::Flat { color } => (DrawKind::Flat, *color),
            Material::Portal => (DrawKind::Portal, Vec3::ONE),
        };

        let model = Mat4::from_translation(node.position)
            * Mat4::from_rotation_z(node.rotation.z.to_radians())
            * Mat4::from_rotation_y(node.rotation.y.to_radians())
            * Mat4::from_rotation_x(node.rotation.x.to_radians())
            * Mat4::from_scale(node.scale);
        let constants = MeshConstants {
            model: model.to_cols_array_2d(),
            color: color.extend(1.0).into(),
        };
        let constants_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}-constants", node.name)),
            contents: bytes_of(&constants),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let constants_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{}-bind-group", node.name)),
            layout: constants_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: constants_buffer.as_entire_binding(),
            }],
        });

        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}-vertices", node.name)),
            contents: cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}-indices", node.name)),
            contents: cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        draws.push(MeshDraw {
            kind,
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
            constants: constants_bind_group,
        });
    }
    draws
}

fn upload_baked_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    texture: &BakedTexture,
) -> wgpu::BindGroup {
    let size = wgpu::Extent3d {
        width: texture.width.max(1),
        height: texture.height.max(1),
        depth_or_array_layers: 1,
    };
    let gpu_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("baked-texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        // The bake is display-referred; sample it through sRGB hardware
        // decoding rather than treating it as linear data.
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &gpu_texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &texture.rgba,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * size.width),
            rows_per_image: Some(size.height),
        },
        size,
    );
    let view = gpu_texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("baked-sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("baked-texture-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    })
}

fn uniform_layout<T>(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
            },
            count: None,
        }],
    })
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GlobalUniform {
    view_proj: [[f32; 4]; 4],
    camera_position: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct MeshConstants {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PortalUniform {
    time: f32,
    _pad0: [f32; 3],
    color_start: [f32; 3],
    _pad1: f32,
    color_end: [f32; 3],
    _pad2: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct FirefliesUniform {
    pixel_ratio: f32,
    size: f32,
    time: f32,
    _pad0: f32,
    resolution: [f32; 2],
    _pad1: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct FireflyInstance {
    position: [f32; 3],
    scale: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<GlobalUniform>(), 80);
        assert_eq!(std::mem::size_of::<MeshConstants>(), 80);
        assert_eq!(std::mem::size_of::<PortalUniform>(), 48);
        assert_eq!(std::mem::size_of::<FirefliesUniform>(), 32);
        assert_eq!(std::mem::size_of::<FireflyInstance>(), 16);
    }
}
