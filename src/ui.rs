use egui::Context;

use crate::frame_loop::Walkthrough;

/// Build the overlay for one frame.
pub fn build_ui(egui_ctx: &Context, raw_input: egui::RawInput, walkthrough: &Walkthrough) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        if walkthrough.affordance_visible() {
            draw_instructions(ctx);
        } else {
            draw_crosshair(ctx);
        }
        draw_debug_window(ctx, walkthrough);
    })
}

/// Highest device pixel ratio the web host renders at.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

/// `devicePixelRatio` capped at `MAX_PIXEL_RATIO`; unusable values read as 1.
pub fn capped_pixel_ratio(device_pixel_ratio: f64) -> f32 {
    let ratio = device_pixel_ratio as f32;
    if ratio.is_finite() && ratio > 0.0 {
        ratio.min(MAX_PIXEL_RATIO)
    } else {
        1.0
    }
}

/// Drawing-buffer size in device pixels for a viewport measured in CSS pixels.
pub fn physical_size(css_width: f64, css_height: f64, pixel_ratio: f32) -> (u32, u32) {
    let scale = f64::from(pixel_ratio);
    let px = |css: f64| (css * scale).round().max(1.0) as u32;
    (px(css_width), px(css_height))
}

/// Raw input for hosts that do not use egui-winit.
///
/// `width`/`height` are device pixels; egui lays out in points of
/// `pixels_per_point` pixels each.
pub fn raw_input_for(width: u32, height: u32, pixels_per_point: f32, time: f64) -> egui::RawInput {
    let mut raw_input = egui::RawInput {
        time: Some(time),
        screen_rect: Some(egui::Rect::from_min_size(
            egui::Pos2::ZERO,
            egui::vec2(width as f32 / pixels_per_point, height as f32 / pixels_per_point),
        )),
        ..Default::default()
    };
    raw_input
        .viewports
        .entry(egui::ViewportId::ROOT)
        .or_default()
        .native_pixels_per_point = Some(pixels_per_point);
    raw_input
}

fn draw_crosshair(ctx: &Context) {
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::TOP, egui::Id::new("crosshair")));
    let center = ctx.content_rect().center();
    let size = 8.0;
    let stroke = egui::Stroke::new(1.0, egui::Color32::WHITE);
    painter.line_segment([egui::pos2(center.x - size, center.y), egui::pos2(center.x + size, center.y)], stroke);
    painter.line_segment([egui::pos2(center.x, center.y - size), egui::pos2(center.x, center.y + size)], stroke);
}

/// The "click to start" prompt shown while pointer capture is released.
fn draw_instructions(ctx: &Context) {
    let screen = ctx.content_rect();
    ctx.layer_painter(egui::LayerId::new(egui::Order::Background, egui::Id::new("blocker")))
        .rect_filled(screen, 0.0, egui::Color32::from_black_alpha(128));

    egui::Area::new(egui::Id::new("instructions"))
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .interactable(false)
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new("Click to play").size(32.0).color(egui::Color32::WHITE));
                ui.add_space(8.0);
                ui.label(egui::RichText::new("Move: WASD / Arrow keys").color(egui::Color32::WHITE));
                ui.label(egui::RichText::new("Jump: Space").color(egui::Color32::WHITE));
                ui.label(egui::RichText::new("Look: Mouse").color(egui::Color32::WHITE));
                ui.label(egui::RichText::new("Release: Esc").color(egui::Color32::WHITE));
            });
        });
}

fn draw_debug_window(ctx: &Context, walkthrough: &Walkthrough) {
    let pose = walkthrough.pose();
    let vel = walkthrough.velocity();

    egui::Window::new("Debug")
        .default_pos([8.0, 8.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(format!("FPS: {:.0}", walkthrough.fps())).small());
            ui.label(
                egui::RichText::new(format!("Pos: x: {:.1} y: {:.1} z: {:.1}", pose.position.x, pose.position.y, pose.position.z))
                    .small(),
            );
            ui.label(
                egui::RichText::new(format!("Yaw: {:.1} Pitch: {:.1}", pose.yaw.to_degrees(), pose.pitch.to_degrees())).small(),
            );
            ui.label(egui::RichText::new(format!("Vel: x: {:.1} y: {:.1} z: {:.1}", vel.x, vel.y, vel.z)).small());
            ui.label(egui::RichText::new(format!("Can jump: {}", walkthrough.can_jump())).small());
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalkthroughConfig;

    #[test]
    fn test_pixel_ratio_is_capped() {
        assert_eq!(capped_pixel_ratio(1.0), 1.0);
        assert_eq!(capped_pixel_ratio(1.5), 1.5);
        assert_eq!(capped_pixel_ratio(3.0), MAX_PIXEL_RATIO);
        assert_eq!(capped_pixel_ratio(0.0), 1.0);
        assert_eq!(capped_pixel_ratio(f64::NAN), 1.0);
    }

    #[test]
    fn test_physical_size_scales_css_pixels() {
        assert_eq!(physical_size(1280.0, 720.0, 2.0), (2560, 1440));
        assert_eq!(physical_size(1280.0, 720.0, 1.0), (1280, 720));
        assert_eq!(physical_size(0.0, 720.0, 2.0), (1, 1440));
    }

    #[test]
    fn test_hidpi_overlay_lays_out_in_points() {
        let ctx = Context::default();
        let walkthrough = Walkthrough::new(WalkthroughConfig::default(), 2560, 1440).unwrap();
        let output = build_ui(&ctx, raw_input_for(2560, 1440, 2.0, 0.0), &walkthrough);

        assert_eq!(output.pixels_per_point, 2.0);
        let rect = ctx.content_rect();
        assert!((rect.width() - 1280.0).abs() < 1e-3);
        assert!((rect.height() - 720.0).abs() < 1e-3);
    }
}
