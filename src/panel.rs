use egui_wgpu::ScreenDescriptor;
use glam::Vec3;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::tweaks::{TweakHandle, Tweaks, FIREFLIES_SIZE_RANGE};

/// The live-tweak panel: three color pickers and the fireflies size slider,
/// bound to the shared [`TweakHandle`].
///
/// The panel owns the egui context plus the winit and wgpu glue; the rest of
/// the runtime only sees the tweak state it writes through.
pub struct DebugPanel {
    context: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    tweaks: TweakHandle,
}

impl DebugPanel {
    pub fn new(
        window: &Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        tweaks: TweakHandle,
    ) -> Self {
        let context = egui::Context::default();
        let state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            None,
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);
        Self {
            context,
            state,
            renderer,
            tweaks,
        }
    }

    /// Forwards a window event; returns true when egui consumed it (the
    /// orbit controls must not also react to it).
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Runs the UI and paints it over the finished scene frame.
    pub fn paint(
        &mut self,
        window: &Window,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size_in_pixels: [u32; 2],
    ) {
        let raw_input = self.state.take_egui_input(window);
        let tweaks = &self.tweaks;
        let full_output = self.context.run(raw_input, |ctx| draw_ui(ctx, tweaks));
        self.state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .context
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen = ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in &full_output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        let _ = self
            .renderer
            .update_buffers(device, queue, encoder, &primitives, &screen);

        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("panel-pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            self.renderer.render(&mut pass, &primitives, &screen);
        }

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

fn draw_ui(ctx: &egui::Context, tweaks: &TweakHandle) {
    let mut edited = tweaks.snapshot();
    egui::Window::new("Scene")
        .default_width(240.0)
        .resizable(false)
        .show(ctx, |ui| {
            color_row(ui, "Portal start", &mut edited.portal_color_start);
            color_row(ui, "Portal end", &mut edited.portal_color_end);
            color_row(ui, "Clear color", &mut edited.clear_color);
            ui.add(
                egui::Slider::new(&mut edited.fireflies_size, FIREFLIES_SIZE_RANGE)
                    .text("Fireflies size"),
            );
        });
    tweaks.update(|shared: &mut Tweaks| *shared = edited);
}

fn color_row(ui: &mut egui::Ui, label: &str, color: &mut Vec3) {
    ui.horizontal(|ui| {
        let mut rgb = [color.x, color.y, color.z];
        if ui.color_edit_button_rgb(&mut rgb).changed() {
            *color = Vec3::from(rgb);
        }
        ui.label(label);
    });
}
