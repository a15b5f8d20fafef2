// Terrain sculpting demo: paint a height map, the slab rises out of an animated sea.
// One wgpu pass draws the terrain and the translucent ocean, egui draws the
// height-map panel on top.

mod config;
mod engine;
mod error;

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use glam::{Mat4, Vec2, Vec3};
use wgpu::util::DeviceExt;
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use config::SculptArgs;
use engine::mesh::{normal_layout, position_layout, uv_layout};
use engine::ocean::{self, OCEAN_COLOR};
use engine::picking::pick_surface;
use engine::{
    Brush, InputState, OrbitCamera, PAINT_KEY, PanelStats, SculptPanel, SculptSession,
    SurfaceMesh, UploadTracker,
};
use error::AppError;

// ============================================================================
// SCENE CONSTANTS
// ============================================================================

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const BACKGROUND_RGB: u32 = 0xDDF7FB;
const SURFACE_RGB: u32 = 0xFAEE9F;
const LIGHT_DIR: Vec3 = Vec3::new(0.3, 1.0, 0.5);

/// sRGB hex colour to linear RGB for an sRGB render target.
fn linear_rgb(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xFF) as f32 / 255.0;
        if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
    };
    [channel(16), channel(8), channel(0)]
}

// ============================================================================
// UNIFORM DATA
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj:     [[f32; 4]; 4],
    light_dir:     [f32; 4],
    surface_color: [f32; 4],
    ocean_color:   [f32; 4],
    /// x = time, y = wave base, z = wave amplitude, w = noise scale
    wave:          [f32; 4],
}

impl Uniforms {
    fn new() -> Self {
        let surface = linear_rgb(SURFACE_RGB);
        let ocean = linear_rgb(0x3CE1FA);
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            light_dir: LIGHT_DIR.normalize().extend(0.0).to_array(),
            surface_color: [surface[0], surface[1], surface[2], 1.0],
            ocean_color: [ocean[0], ocean[1], ocean[2], OCEAN_COLOR[3]],
            wave: [0.0, ocean::WAVE_BASE, ocean::WAVE_AMPLITUDE, ocean::WAVE_NOISE_SCALE],
        }
    }
}

// ============================================================================
// GPU MESH
// ============================================================================

/// GPU copies of a slab mesh. Positions are COPY_DST so sculpting can rewrite
/// them in place; the buffer is never reallocated.
struct GpuSlab {
    positions:   wgpu::Buffer,
    normals:     wgpu::Buffer,
    uvs:         wgpu::Buffer,
    indices:     wgpu::Buffer,
    index_count: u32,
}

impl GpuSlab {
    fn upload(device: &wgpu::Device, mesh: &SurfaceMesh, label: &str) -> Self {
        let buffer = |suffix: &str, contents: &[u8], usage: wgpu::BufferUsages| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} {suffix}")),
                contents,
                usage,
            })
        };
        Self {
            positions: buffer(
                "Positions",
                bytemuck::cast_slice(mesh.positions()),
                wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            ),
            normals: buffer("Normals", bytemuck::cast_slice(mesh.normals()), wgpu::BufferUsages::VERTEX),
            uvs: buffer("UVs", bytemuck::cast_slice(mesh.uvs()), wgpu::BufferUsages::VERTEX),
            indices: buffer("Indices", bytemuck::cast_slice(mesh.indices()), wgpu::BufferUsages::INDEX),
            index_count: mesh.index_count() as u32,
        }
    }

    fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_vertex_buffer(0, self.positions.slice(..));
        render_pass.set_vertex_buffer(1, self.normals.slice(..));
        render_pass.set_vertex_buffer(2, self.uvs.slice(..));
        render_pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    label: &str,
    blend: wgpu::BlendState,
    depth_write_enabled: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[position_layout(), normal_layout(), uv_layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Both slabs are viewed from inside and below as well.
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    depth_view: wgpu::TextureView,
    terrain_pipeline: wgpu::RenderPipeline,
    ocean_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniforms: Uniforms,
    background: wgpu::Color,

    // Geometry
    session: SculptSession,
    terrain: GpuSlab,
    ocean: GpuSlab,
    upload_tracker: UploadTracker,

    // Interaction
    camera: OrbitCamera,
    input: InputState,
    /// Last terrain point under the pointer, in canvas pixels.
    pen_cursor: Option<Vec2>,
    panel: SculptPanel,

    // Timing
    started: Instant,
    last_frame: Instant,
    frame_count: u32,
    frame_time_accum_ms: f32,
    last_fps_update: Instant,
    fps: u32,
    frame_time_avg_ms: f32,
}

impl State {
    async fn new(window: Arc<Window>, args: &SculptArgs) -> Result<Self, AppError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(AppError::NoAdapter)?;
        log::info!("using adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let uniforms = Uniforms::new();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let terrain_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Terrain Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_surface.wgsl").into()),
        });
        let ocean_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Ocean Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_ocean.wgsl").into()),
        });

        let terrain_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &terrain_shader,
            config.format,
            "Terrain Pipeline",
            wgpu::BlendState::REPLACE,
            true,
        );
        // Drawn after the terrain; does not write depth so the slab shows through.
        let ocean_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &ocean_shader,
            config.format,
            "Ocean Pipeline",
            wgpu::BlendState::ALPHA_BLENDING,
            false,
        );

        let session = SculptSession::new(args.half_extent, Brush::new(args.brush_radius))?;
        let terrain = GpuSlab::upload(&device, session.mesh(), "Terrain");
        let upload_tracker = UploadTracker::synced_with(session.mesh());
        let ocean_mesh = ocean::build_ocean()?;
        let ocean = GpuSlab::upload(&device, &ocean_mesh, "Ocean");

        let panel = SculptPanel::new(&window, &device, config.format);

        let background = linear_rgb(BACKGROUND_RGB);
        let now = Instant::now();

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth_view,
            terrain_pipeline,
            ocean_pipeline,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
            background: wgpu::Color {
                r: background[0] as f64,
                g: background[1] as f64,
                b: background[2] as f64,
                a: 1.0,
            },
            session,
            terrain,
            ocean,
            upload_tracker,
            camera: OrbitCamera::new(),
            input: InputState::new(),
            pen_cursor: None,
            panel,
            started: now,
            last_frame: now,
            frame_count: 0,
            frame_time_accum_ms: 0.0,
            last_fps_update: now,
            fps: 0,
            frame_time_avg_ms: 0.0,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    /// Camera and 3D painting. Runs before the UI pass each frame.
    fn update(&mut self) {
        let now = Instant::now();
        let dt_ms = (now - self.last_frame).as_secs_f32() * 1000.0;
        self.last_frame = now;
        self.frame_count += 1;
        self.frame_time_accum_ms += dt_ms;
        if (now - self.last_fps_update).as_secs_f32() >= 1.0 {
            self.fps = self.frame_count;
            self.frame_time_avg_ms = self.frame_time_accum_ms / self.frame_count.max(1) as f32;
            log::debug!("FPS: {} | frame {:.2} ms", self.fps, self.frame_time_avg_ms);
            self.frame_count = 0;
            self.frame_time_accum_ms = 0.0;
            self.last_fps_update = now;
        }

        let over_panel = self.panel.wants_pointer();
        let painting = self.input.is_key_held(PAINT_KEY);
        self.camera.update(&self.input, !over_panel && !painting);

        if over_panel {
            return;
        }
        let window_size = (self.size.width, self.size.height);
        let Some(ray) = self.camera.screen_ray(self.input.mouse_position, window_size) else {
            return;
        };
        if let Some(hit) = pick_surface(self.session.mesh(), &ray) {
            let cursor = self.session.world_to_canvas(hit);
            self.pen_cursor = Some(cursor);
            self.session.apply(self.input.paint_input(cursor));
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // UI pass first: its strokes must land in this frame's upload.
        let stats = PanelStats {
            fps: self.fps,
            frame_time_avg_ms: self.frame_time_avg_ms,
            resolution: (self.size.width, self.size.height),
            axis_length: self.session.mesh().axis_length(),
            vertex_count: self.session.mesh().vertex_count(),
            triangle_count: self.session.mesh().triangle_count(),
            mesh_version: self.session.mesh().version(),
            uploads: self.upload_tracker.uploads(),
        };
        let panel_output = self.panel.run(
            &self.window,
            self.session.canvas(),
            &self.session.brush,
            self.pen_cursor,
            &stats,
        );
        if let Some(radius) = panel_output.brush_radius {
            self.session.brush.set_radius(radius);
        }
        if panel_output.clear {
            self.session.clear();
        }
        for stroke in panel_output.strokes {
            self.session.apply(stroke);
        }

        // At most one position upload per frame, however many edits happened.
        if let Some(positions) = self.upload_tracker.pending(self.session.mesh()) {
            self.queue
                .write_buffer(&self.terrain.positions, 0, bytemuck::cast_slice(positions));
            log::debug!(
                "uploaded terrain positions (version {})",
                self.session.mesh().version()
            );
        }

        let aspect = self.size.width as f32 / self.size.height.max(1) as f32;
        self.uniforms.view_proj = self.camera.view_projection(aspect).to_cols_array_2d();
        self.uniforms.wave[0] = self.started.elapsed().as_secs_f32();
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[self.uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);

            render_pass.set_pipeline(&self.terrain_pipeline);
            self.terrain.draw(&mut render_pass);

            render_pass.set_pipeline(&self.ocean_pipeline);
            self.ocean.draw(&mut render_pass);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        self.panel.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &view,
            &screen_descriptor,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn run(args: SculptArgs) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;

    let window_attributes = Window::default_attributes()
        .with_title("Shore Sculpt - paint the height map (Space over terrain to paint, F1 toggles panel)")
        .with_inner_size(winit::dpi::LogicalSize::new(args.width, args.height));

    #[allow(deprecated)]
    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut state = pollster::block_on(State::new(window.clone(), &args))?;
    log::info!(
        "terrain ready: half extent {} | grid {}x{}",
        state.session.half_extent(),
        state.session.mesh().axis_length(),
        state.session.mesh().axis_length()
    );

    #[allow(deprecated)]
    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                let response = state.panel.handle_window_event(&window, event);
                state.input.process_event_behind_ui(event, response.consumed);

                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                ..
                            },
                        ..
                    } => control_flow.exit(),
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::F1),
                                repeat: false,
                                ..
                            },
                        ..
                    } => state.panel.toggle(),
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        state.update();
                        match state.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                state.resize(state.size)
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("GPU out of memory, exiting");
                                control_flow.exit()
                            }
                            Err(e) => log::warn!("surface error: {e:?}"),
                        }
                        state.input.end_frame();
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}

fn main() {
    env_logger::init();

    let args = SculptArgs::parse();
    if let Err(e) = run(args) {
        log::error!("{e}");
        eprintln!("shore_sculpt: {e}");
        std::process::exit(1);
    }
}
