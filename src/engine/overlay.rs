// egui side panel: height-map canvas, brush controls and frame stats.
// The UI pass runs before the scene is drawn so its strokes reach the mesh
// in the same frame; the tessellated output is painted last.

use egui::epaint::Shadow;
use glam::Vec2;

use super::canvas::{Brush, HeightCanvas, MAX_BRUSH_RADIUS, MIN_BRUSH_RADIUS, PaintInput};

/// Screen points per canvas pixel in the preview.
pub const PREVIEW_SCALE: f32 = 7.3;

pub struct PanelStats {
    pub fps: u32,
    pub frame_time_avg_ms: f32,
    pub resolution: (u32, u32),
    pub axis_length: usize,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub mesh_version: u64,
    pub uploads: u64,
}

/// What the user asked for through the panel this frame.
#[derive(Debug, Default)]
pub struct PanelOutput {
    /// Paint events from dragging on the preview, in canvas pixels.
    pub strokes: Vec<PaintInput>,
    pub brush_radius: Option<f32>,
    pub clear: bool,
}

struct PendingFrame {
    primitives: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
}

pub struct SculptPanel {
    pub visible: bool,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    heightmap: Option<egui::TextureHandle>,
    heightmap_revision: Option<u64>,
    pending: Option<PendingFrame>,
}

impl SculptPanel {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::from_rgba_premultiplied(0, 0, 0, 190);
        visuals.window_stroke = egui::Stroke::NONE;
        visuals.window_shadow = Shadow::NONE;
        visuals.override_text_color = Some(egui::Color32::WHITE);
        egui_ctx.set_visuals(visuals);

        let mut style = (*egui_ctx.style()).clone();
        style.override_font_id = Some(egui::FontId::monospace(13.0));
        egui_ctx.set_style(style);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface_format,
            None,  // no depth
            1,     // msaa samples
            false, // no dithering
        );

        Self {
            visible: true,
            egui_ctx,
            egui_state,
            egui_renderer,
            heightmap: None,
            heightmap_revision: None,
            pending: None,
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// True while the pointer is over the panel, so the 3D view must ignore it.
    pub fn wants_pointer(&self) -> bool {
        self.egui_ctx.wants_pointer_input() || self.egui_ctx.is_pointer_over_area()
    }

    /// Run one UI pass and keep its tessellation for `render`.
    /// `picked` is the last terrain point under the pointer, in canvas pixels.
    pub fn run(
        &mut self,
        window: &winit::window::Window,
        canvas: &HeightCanvas,
        brush: &Brush,
        picked: Option<Vec2>,
        stats: &PanelStats,
    ) -> PanelOutput {
        self.refresh_heightmap(canvas);

        let raw_input = self.egui_state.take_egui_input(window);
        let side = canvas.side() as f32;
        let texture_id = self.heightmap.as_ref().map(|t| t.id());
        let visible = self.visible;
        let mut output = PanelOutput::default();

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            output = PanelOutput::default();
            if !visible {
                return;
            }

            egui::Window::new("Height map")
                .default_pos(egui::pos2(10.0, 10.0))
                .resizable(false)
                .collapsible(true)
                .show(ctx, |ui| {
                    let size = egui::vec2(side * PREVIEW_SCALE, side * PREVIEW_SCALE);
                    let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
                    let painter = ui.painter_at(rect);
                    painter.rect_filled(rect, 0.0, egui::Color32::WHITE);
                    if let Some(id) = texture_id {
                        painter.image(
                            id,
                            rect,
                            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                            egui::Color32::WHITE,
                        );
                    }

                    let mut radius = brush.radius();
                    let hovered = response.hover_pos().map(|pos| {
                        let local = (pos - rect.min) / PREVIEW_SCALE;
                        Vec2::new(local.x, local.y)
                    });
                    if let Some(cursor) = hovered {
                        // Wheel over the canvas resizes the brush one pixel per notch.
                        let scroll = ui.input(|i| i.raw_scroll_delta.y);
                        if scroll != 0.0 {
                            let mut resized = *brush;
                            resized.nudge(if scroll > 0.0 { 1 } else { -1 });
                            radius = resized.radius();
                            output.brush_radius = Some(radius);
                        }

                        let moved = ui.input(|i| i.pointer.delta());
                        output.strokes.extend(preview_stroke(
                            cursor,
                            response.is_pointer_button_down_on(),
                            Vec2::new(moved.x, moved.y),
                        ));
                    }

                    let pen = pen_centre(hovered, picked);
                    if let Some(centre) = pen {
                        painter.circle_stroke(
                            rect.min + egui::vec2(centre.x, centre.y) * PREVIEW_SCALE,
                            radius * PREVIEW_SCALE,
                            egui::Stroke::new(1.0, egui::Color32::DARK_GRAY),
                        );
                    }

                    ui.horizontal(|ui| {
                        if ui
                            .add(
                                egui::Slider::new(&mut radius, MIN_BRUSH_RADIUS..=MAX_BRUSH_RADIUS)
                                    .step_by(1.0)
                                    .text("size"),
                            )
                            .changed()
                        {
                            output.brush_radius = Some(radius);
                        }
                        if ui.button("Clear").clicked() {
                            output.clear = true;
                        }
                    });

                    ui.separator();
                    ui.label("Drag here, or hold Space over the terrain, to raise it.");
                    if let Some(centre) = pen {
                        let (x, y) = (centre.x.max(0.0) as usize, centre.y.max(0.0) as usize);
                        match canvas.alpha_at(x, y) {
                            Some(alpha) => ui.label(format!("Pen: ({x}, {y})  height {alpha}/255")),
                            None => ui.label("Pen: off canvas"),
                        };
                    }
                    ui.label(format!(
                        "FPS: {}  ({:.2} ms)  {} x {}",
                        stats.fps, stats.frame_time_avg_ms, stats.resolution.0, stats.resolution.1
                    ));
                    ui.label(format!(
                        "Grid: {0} x {0}  Vertices: {1}  Triangles: {2}",
                        stats.axis_length, stats.vertex_count, stats.triangle_count
                    ));
                    ui.label(format!(
                        "Heights v{}  GPU uploads: {}",
                        stats.mesh_version, stats.uploads
                    ));
                });
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        self.pending = Some(PendingFrame {
            primitives,
            textures_delta: full_output.textures_delta,
        });

        output
    }

    /// Paint the UI pass prepared by `run` on top of `view`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        let Some(frame) = self.pending.take() else {
            return;
        };

        for (id, image_delta) in &frame.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &frame.primitives, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &frame.primitives, screen_descriptor);
        }

        for id in &frame.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }

    // Re-upload the canvas preview only when its pixels changed.
    fn refresh_heightmap(&mut self, canvas: &HeightCanvas) {
        if self.heightmap_revision == Some(canvas.revision()) && self.heightmap.is_some() {
            return;
        }
        let image = egui::ColorImage::from_rgba_unmultiplied(
            [canvas.side(), canvas.side()],
            &canvas.to_rgba(),
        );
        match &mut self.heightmap {
            Some(handle) => handle.set(image, egui::TextureOptions::NEAREST),
            None => {
                self.heightmap = Some(self.egui_ctx.load_texture(
                    "heightmap",
                    image,
                    egui::TextureOptions::NEAREST,
                ));
            }
        }
        self.heightmap_revision = Some(canvas.revision());
    }
}

/// A drag on the preview paints only on frames where the pointer moved.
fn preview_stroke(cursor: Vec2, button_down: bool, pointer_delta: Vec2) -> Option<PaintInput> {
    (button_down && pointer_delta != Vec2::ZERO).then(|| PaintInput::drawing(cursor))
}

/// Pen circle position in canvas pixels: the pointer over the preview wins,
/// otherwise the last point picked on the terrain.
fn pen_centre(hovered: Option<Vec2>, picked: Option<Vec2>) -> Option<Vec2> {
    hovered.or(picked)
}
