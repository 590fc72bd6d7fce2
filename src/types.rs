use std::sync::Arc;
use tiny_skia::Pixmap;

/// Pointer x-coordinate in container space, or `None` when nothing hovers the dock.
pub type PointerSample = Option<f32>;

#[derive(Clone)]
pub struct DockIcon {
    pub name: String,
    pub image: Arc<Pixmap>,
}
