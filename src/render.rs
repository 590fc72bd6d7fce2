use anyhow::{Context, Result};
use tiny_skia::{
    Color, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapMut, PixmapPaint, Transform,
};

use crate::config::bar_alpha;
use crate::magnify::DockLayout;
use crate::types::{DockIcon, PointerSample};

const SHADOW_OPACITY: f32 = 0.2;
const SHADOW_OFFSET_Y: f32 = 5.0;
const SHADOW_RADIUS: f32 = 10.0;
const SHADOW_LAYERS: u32 = 4;
pub const ICON_CORNER_RATIO: f32 = 0.22;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconFrame {
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

pub struct DockScene<'a> {
    pub layout: &'a DockLayout,
    pub icons: &'a [DockIcon],
    pub corner_radius: f32,
}

/// Icons sit `padding` above the bottom edge, left to right, and the row is
/// centred as a whole so it re-centres while icons grow.
pub fn icon_frames(
    layout: &DockLayout,
    width: f32,
    height: f32,
    pointer: PointerSample,
) -> Vec<IconFrame> {
    let sizes = layout.icon_sizes(width, pointer);
    let gaps = sizes.len().saturating_sub(1) as f32 * layout.spacing();
    let total: f32 = sizes.iter().sum::<f32>() + gaps;
    let baseline = height - layout.padding();

    let mut x = (width - total) / 2.0;
    sizes
        .into_iter()
        .map(|size| {
            let frame = IconFrame {
                x,
                y: baseline - size,
                size,
            };
            x += size + layout.spacing();
            frame
        })
        .collect()
}

/// `transform` maps logical pixels onto the buffer.
pub fn render_dock(
    pixmap: &mut PixmapMut,
    scene: &DockScene,
    width: f32,
    height: f32,
    pointer: PointerSample,
    transform: Transform,
) {
    pixmap.fill(Color::from_rgba8(0, 0, 0, 0));

    let bar_height = scene.layout.dock_height().min(height);
    if let Some(bar) = rounded_rect_path(
        0.0,
        height - bar_height,
        width,
        bar_height,
        scene.corner_radius,
    ) {
        let mut paint = Paint::default();
        paint.set_color(Color::from_rgba8(128, 128, 128, bar_alpha()));
        paint.anti_alias = true;
        pixmap.fill_path(&bar, &paint, FillRule::Winding, transform, None);
    }

    let paint = PixmapPaint {
        quality: FilterQuality::Bicubic,
        ..PixmapPaint::default()
    };
    for (frame, icon) in icon_frames(scene.layout, width, height, pointer)
        .into_iter()
        .zip(scene.icons)
    {
        draw_icon_shadow(pixmap, frame, transform);
        let scale = frame.size / icon.image.width() as f32;
        let icon_transform = transform
            .pre_translate(frame.x, frame.y)
            .pre_scale(scale, scale);
        pixmap.draw_pixmap(0, 0, icon.image.as_ref().as_ref(), &paint, icon_transform, None);
    }
}

// Stacked, progressively wider rounded rects stand in for a blurred shadow;
// where all layers overlap the combined opacity is SHADOW_OPACITY.
fn draw_icon_shadow(pixmap: &mut PixmapMut, frame: IconFrame, transform: Transform) {
    let layer_opacity = 1.0 - (1.0 - SHADOW_OPACITY).powf(1.0 / SHADOW_LAYERS as f32);
    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, (layer_opacity * 255.0).round() as u8);
    paint.anti_alias = true;

    for layer in 0..SHADOW_LAYERS {
        let spread = SHADOW_RADIUS * layer as f32 / SHADOW_LAYERS as f32;
        let Some(path) = rounded_rect_path(
            frame.x - spread,
            frame.y + SHADOW_OFFSET_Y - spread,
            frame.size + spread * 2.0,
            frame.size + spread * 2.0,
            frame.size * ICON_CORNER_RATIO + spread,
        ) else {
            continue;
        };
        pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
    }
}

/// Standalone RGBA frame, used for previews.
pub fn render_to_pixmap(scene: &DockScene, width: u32, pointer: PointerSample) -> Result<Pixmap> {
    let height = scene.layout.surface_height().ceil() as u32;
    let mut pixmap = Pixmap::new(width, height)
        .with_context(|| format!("create {width}x{height} pixmap"))?;
    render_dock(
        &mut pixmap.as_mut(),
        scene,
        width as f32,
        height as f32,
        pointer,
        Transform::identity(),
    );
    Ok(pixmap)
}

/// RGBA to the little-endian ARGB8888 layout wl_shm expects.
pub fn swizzle_rgba_to_bgra(bytes: &mut [u8]) {
    for pixel in bytes.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
}

pub fn rounded_rect_path(
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    radius: f32,
) -> Option<tiny_skia::Path> {
    let r = radius.min(width / 2.0).min(height / 2.0).max(0.0);
    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(x + width - r, y);
    pb.quad_to(x + width, y, x + width, y + r);
    pb.line_to(x + width, y + height - r);
    pb.quad_to(x + width, y + height, x + width - r, y + height);
    pb.line_to(x + r, y + height);
    pb.quad_to(x, y + height, x, y + height - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);
    pb.close();
    pb.finish()
}
