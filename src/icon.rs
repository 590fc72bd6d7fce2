use anyhow::{Context, Result};
use freedesktop_icons::lookup;
use image::{DynamicImage, imageops::FilterType};
use resvg::usvg;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tiny_skia::{Color, FillRule, IntSize, Paint, Pixmap, Transform};

use crate::render::{ICON_CORNER_RATIO, rounded_rect_path};
use crate::types::DockIcon;

const FALLBACK_ICON: &str = "application-x-executable";

/// Icons rasterised once at `size`, the largest size the dock draws them at.
pub struct IconCache {
    size: u32,
    icons: HashMap<String, Arc<Pixmap>>,
}

impl IconCache {
    pub fn new(size: u32) -> Self {
        Self {
            size: size.max(1),
            icons: HashMap::new(),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn icon_for(&mut self, name: &str) -> Result<Arc<Pixmap>> {
        if let Some(icon) = self.icons.get(name) {
            return Ok(icon.clone());
        }
        let icon = match load_icon(name, self.size) {
            Ok(icon) => icon,
            Err(err) => {
                tracing::debug!("icon {name}: {err:#}, using placeholder");
                placeholder_icon(name, self.size)?
            }
        };
        let icon = Arc::new(icon);
        self.icons.insert(name.to_string(), icon.clone());
        Ok(icon)
    }

    pub fn dock_icons(&mut self, names: &[String]) -> Result<Vec<DockIcon>> {
        names
            .iter()
            .map(|name| {
                Ok(DockIcon {
                    name: name.clone(),
                    image: self.icon_for(name)?,
                })
            })
            .collect()
    }
}

fn name_candidates(name: &str) -> Vec<String> {
    let mut candidates = vec![name.to_string()];
    if let Some(trimmed) = name.strip_suffix(".desktop") {
        candidates.push(trimmed.to_string());
    }
    if let Some(last) = name.trim_end_matches(".desktop").rsplit('.').next() {
        if !candidates.iter().any(|c| c == last) {
            candidates.push(last.to_string());
        }
    }
    candidates
}

fn load_icon(name: &str, size: u32) -> Result<Pixmap> {
    let mut candidates = name_candidates(name);
    if let Some(icon_name) = desktop_icon_name(name) {
        if Path::new(&icon_name).is_absolute() {
            return load_icon_file(Path::new(&icon_name), size);
        }
        candidates.push(icon_name);
    }

    let path = candidates
        .into_iter()
        .find_map(|candidate| lookup(&candidate).with_size(size as u16).find())
        .or_else(|| lookup(FALLBACK_ICON).with_size(size as u16).find())
        .context("no icon found")?;

    load_icon_file(&path, size)
}

fn load_icon_file(path: &Path, size: u32) -> Result<Pixmap> {
    if path.extension().and_then(|ext| ext.to_str()) == Some("svg") {
        return render_svg(path, size);
    }

    let image = image::open(path).with_context(|| format!("open icon {}", path.display()))?;
    let resized = image.resize_exact(size, size, FilterType::Lanczos3);
    pixmap_from_image(resized)
}

fn pixmap_from_image(image: DynamicImage) -> Result<Pixmap> {
    let rgba = image.to_rgba8();
    let size = IntSize::from_wh(rgba.width(), rgba.height()).context("icon size")?;
    let mut pixmap = Pixmap::from_vec(rgba.into_raw(), size).context("pixmap from image")?;
    premultiply(pixmap.data_mut());
    Ok(pixmap)
}

// tiny-skia expects premultiplied RGBA, `image` hands out straight alpha.
fn premultiply(bytes: &mut [u8]) {
    for pixel in bytes.chunks_exact_mut(4) {
        let alpha = pixel[3] as u16;
        for channel in &mut pixel[..3] {
            *channel = ((*channel as u16 * alpha + 127) / 255) as u8;
        }
    }
}

fn placeholder_icon(name: &str, size: u32) -> Result<Pixmap> {
    let mut pixmap = Pixmap::new(size, size)
        .with_context(|| format!("create {size}x{size} placeholder"))?;
    let [r, g, b] = placeholder_tint(name);
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(r, g, b, 255));
    paint.anti_alias = true;
    let side = size as f32;
    if let Some(path) = rounded_rect_path(0.0, 0.0, side, side, side * ICON_CORNER_RATIO) {
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
    Ok(pixmap)
}

/// Stable mid-tone colour per identifier so placeholders stay distinguishable.
fn placeholder_tint(name: &str) -> [u8; 3] {
    let hash = name
        .bytes()
        .fold(0x811c_9dc5_u32, |hash, byte| (hash ^ byte as u32).wrapping_mul(0x0100_0193));
    let channel = |shift: u32| 70 + ((hash >> shift) & 0x7f) as u8;
    [channel(0), channel(8), channel(16)]
}

fn render_svg(path: &Path, size: u32) -> Result<Pixmap> {
    let data = fs::read(path).with_context(|| format!("read svg {}", path.display()))?;
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_data(&data, &options)
        .with_context(|| format!("parse svg {}", path.display()))?;
    let mut pixmap = Pixmap::new(size, size).context("create svg pixmap")?;
    let tree_size = tree.size();
    let scale = (size as f32 / tree_size.width()).min(size as f32 / tree_size.height());
    let dx = (size as f32 - tree_size.width() * scale) * 0.5;
    let dy = (size as f32 - tree_size.height() * scale) * 0.5;
    let transform = Transform::from_scale(scale, scale).post_translate(dx, dy);
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    Ok(pixmap)
}

fn application_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/applications"),
        PathBuf::from("/usr/local/share/applications"),
    ];
    if let Some(home) = std::env::var_os("HOME") {
        dirs.push(PathBuf::from(home).join(".local/share/applications"));
    }
    if let Ok(xdg_dirs) = std::env::var("XDG_DATA_DIRS") {
        dirs.extend(
            xdg_dirs
                .split(':')
                .filter(|dir| !dir.is_empty())
                .map(|dir| PathBuf::from(dir).join("applications")),
        );
    }
    dirs
}

fn desktop_icon_name(name: &str) -> Option<String> {
    let candidates = name_candidates(name);
    for base in application_dirs() {
        for candidate in &candidates {
            let file = if candidate.ends_with(".desktop") {
                base.join(candidate)
            } else {
                base.join(format!("{candidate}.desktop"))
            };
            let Ok(content) = fs::read_to_string(&file) else {
                continue;
            };
            if let Some(icon) = desktop_entry_icon(&content) {
                return Some(icon);
            }
        }
    }
    None
}

/// `Icon=` value of the `[Desktop Entry]` group.
fn desktop_entry_icon(content: &str) -> Option<String> {
    let mut in_entry = false;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_entry = line == "[Desktop Entry]";
            continue;
        }
        if !in_entry {
            continue;
        }
        if let Some(value) = line.strip_prefix("Icon=") {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
