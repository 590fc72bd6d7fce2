use anyhow::{Context, Result};
use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState},
    delegate_compositor, delegate_keyboard, delegate_layer, delegate_output, delegate_pointer,
    delegate_registry, delegate_seat, delegate_shm, delegate_touch,
    output::{OutputHandler, OutputState},
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    seat::{
        Capability, SeatHandler, SeatState,
        keyboard::{KeyEvent, KeyboardHandler, Keysym, Modifiers},
        pointer::{PointerEvent, PointerEventKind, PointerHandler},
        touch::TouchHandler,
    },
    shell::{
        WaylandSurface,
        wlr_layer::{
            Anchor, KeyboardInteractivity, Layer, LayerShell, LayerShellHandler, LayerSurface,
            LayerSurfaceConfigure,
        },
    },
    shm::{Shm, ShmHandler, slot::SlotPool},
};
use tiny_skia::{PixmapMut, Transform};
use wayland_client::{
    Connection, QueueHandle,
    globals::registry_queue_init,
    protocol::{wl_keyboard, wl_output, wl_pointer, wl_seat, wl_shm, wl_surface, wl_touch},
};

use crate::config::DockConfig;
use crate::icon::IconCache;
use crate::magnify::DockLayout;
use crate::pointer::PointerState;
use crate::render::{DockScene, render_dock, swizzle_rgba_to_bgra};
use crate::types::DockIcon;

pub fn run_dock(config: &DockConfig) -> Result<()> {
    let layout = DockLayout::from_config(config);
    let mut icon_cache = IconCache::new(layout.magnified_max_size().ceil() as u32);
    let icons = icon_cache.dock_icons(&config.icons)?;
    tracing::info!(
        icons = layout.icon_count(),
        icon_size = icon_cache.size(),
        "starting dock"
    );
    for icon in &icons {
        tracing::debug!(name = %icon.name, width = icon.image.width(), "icon ready");
    }

    let height = layout.surface_height().ceil() as u32;
    let width = config.width.unwrap_or(0);

    let conn = Connection::connect_to_env().context("connect to Wayland")?;
    let (globals, mut event_queue) =
        registry_queue_init::<Dock>(&conn).context("init registry")?;
    let qh = event_queue.handle();

    let compositor =
        CompositorState::bind(&globals, &qh).context("wl_compositor not available")?;
    let layer_shell = LayerShell::bind(&globals, &qh).context("layer shell not available")?;
    let shm = Shm::bind(&globals, &qh).context("wl_shm not available")?;

    let surface = compositor.create_surface(&qh);
    let layer = layer_shell.create_layer_surface(&qh, surface, Layer::Top, Some("magdock"), None);
    match config.width {
        Some(width) => {
            layer.set_anchor(Anchor::BOTTOM);
            layer.set_size(width, height);
        }
        None => {
            layer.set_anchor(Anchor::BOTTOM | Anchor::LEFT | Anchor::RIGHT);
            layer.set_size(0, height);
        }
    }
    layer.set_keyboard_interactivity(KeyboardInteractivity::OnDemand);
    layer.set_exclusive_zone(layout.dock_height().ceil() as i32);
    layer.commit();

    let pool = SlotPool::new(buffer_len(width.max(1), height, 1)?, &shm)
        .context("create shm pool")?;

    let mut app = Dock {
        registry_state: RegistryState::new(&globals),
        seat_state: SeatState::new(&globals, &qh),
        output_state: OutputState::new(&globals, &qh),
        shm,
        layer,
        pool,
        width,
        height,
        buffer_scale: 1,
        configured: false,
        exit: false,
        keyboard: None,
        pointer: None,
        touch: None,
        pointer_state: PointerState::default(),
        layout,
        icons,
        corner_radius: config.corner_radius,
        redraw: true,
        frame_pending: false,
    };

    while !app.exit {
        event_queue
            .blocking_dispatch(&mut app)
            .context("dispatch events")?;
    }

    Ok(())
}

/// Bytes of an ARGB8888 buffer at `scale`. Errors instead of overflowing.
fn buffer_len(width: u32, height: u32, scale: u32) -> Result<usize> {
    let len = width
        .checked_mul(scale)
        .zip(height.checked_mul(scale))
        .and_then(|(w, h)| w.checked_mul(h))
        .and_then(|pixels| pixels.checked_mul(4))
        .filter(|&len| len <= i32::MAX as u32)
        .with_context(|| format!("{width}x{height}@{scale} buffer is too large"))?;
    Ok(len as usize)
}

struct Dock {
    registry_state: RegistryState,
    seat_state: SeatState,
    output_state: OutputState,
    shm: Shm,
    layer: LayerSurface,
    pool: SlotPool,
    width: u32,
    height: u32,
    buffer_scale: u32,
    configured: bool,
    exit: bool,
    keyboard: Option<wl_keyboard::WlKeyboard>,
    pointer: Option<wl_pointer::WlPointer>,
    touch: Option<wl_touch::WlTouch>,
    pointer_state: PointerState,
    layout: DockLayout,
    icons: Vec<DockIcon>,
    corner_radius: f32,
    redraw: bool,
    frame_pending: bool,
}

impl Dock {
    fn draw(&mut self, qh: &QueueHandle<Self>) -> Result<()> {
        let needed = buffer_len(self.width, self.height, self.buffer_scale)?;
        let buffer_width = self.width * self.buffer_scale;
        let buffer_height = self.height * self.buffer_scale;
        let stride = buffer_width as i32 * 4;

        if self.pool.len() < needed {
            self.pool.resize(needed).context("resize shm pool")?;
        }

        let (buffer, canvas) = self
            .pool
            .create_buffer(
                buffer_width as i32,
                buffer_height as i32,
                stride,
                wl_shm::Format::Argb8888,
            )
            .context("create buffer")?;

        {
            let mut pixmap = PixmapMut::from_bytes(canvas, buffer_width, buffer_height)
                .context("pixmap from buffer")?;
            let scene = DockScene {
                layout: &self.layout,
                icons: &self.icons,
                corner_radius: self.corner_radius,
            };
            let scale = self.buffer_scale as f32;
            render_dock(
                &mut pixmap,
                &scene,
                self.width as f32,
                self.height as f32,
                self.pointer_state.sample(),
                Transform::from_scale(scale, scale),
            );
        }
        swizzle_rgba_to_bgra(canvas);

        let surface = self.layer.wl_surface();
        surface.damage_buffer(0, 0, buffer_width as i32, buffer_height as i32);
        surface.frame(qh, surface.clone());
        buffer.attach_to(surface).context("buffer attach")?;
        self.layer.commit();
        self.redraw = false;
        self.frame_pending = true;
        Ok(())
    }

    fn paint(&mut self, qh: &QueueHandle<Self>) {
        if !self.configured || self.width == 0 || self.height == 0 {
            return;
        }
        if let Err(err) = self.draw(qh) {
            tracing::error!("draw failed: {err:#}");
            self.exit = true;
        }
    }

    /// Paints now if no frame callback is outstanding, otherwise on the next one.
    fn request_redraw(&mut self, qh: &QueueHandle<Self>) {
        self.redraw = true;
        if !self.frame_pending {
            self.paint(qh);
        }
    }

    fn is_dock_surface(&self, surface: &wl_surface::WlSurface) -> bool {
        self.layer.wl_surface() == surface
    }
}

impl CompositorHandler for Dock {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        surface: &wl_surface::WlSurface,
        new_factor: i32,
    ) {
        let scale = new_factor.max(1) as u32;
        if self.is_dock_surface(surface) && scale != self.buffer_scale {
            tracing::debug!(scale, "buffer scale changed");
            self.buffer_scale = scale;
            self.layer.wl_surface().set_buffer_scale(scale as i32);
            self.request_redraw(qh);
        }
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {
    }

    fn frame(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
        self.frame_pending = false;
        if self.redraw {
            self.paint(qh);
        }
    }

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }
}

impl OutputHandler for Dock {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}

    fn update_output(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}

    fn output_destroyed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}
}

impl LayerShellHandler for Dock {
    fn closed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _layer: &LayerSurface) {
        self.exit = true;
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _layer: &LayerSurface,
        configure: LayerSurfaceConfigure,
        _serial: u32,
    ) {
        let (width, height) = configure.new_size;
        if width > 0 {
            self.width = width;
        }
        if height > 0 {
            self.height = height;
        }
        tracing::info!(width = self.width, height = self.height, "dock configured");

        self.configured = true;
        self.frame_pending = false;
        self.redraw = true;
        self.paint(qh);
    }
}

impl SeatHandler for Dock {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {}

    fn new_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        if capability == Capability::Keyboard && self.keyboard.is_none() {
            match self.seat_state.get_keyboard(qh, &seat, None) {
                Ok(keyboard) => self.keyboard = Some(keyboard),
                Err(err) => tracing::warn!("create keyboard: {err}"),
            }
        }
        if capability == Capability::Pointer && self.pointer.is_none() {
            match self.seat_state.get_pointer(qh, &seat) {
                Ok(pointer) => self.pointer = Some(pointer),
                Err(err) => tracing::warn!("create pointer: {err}"),
            }
        }
        if capability == Capability::Touch && self.touch.is_none() {
            match self.seat_state.get_touch(qh, &seat) {
                Ok(touch) => self.touch = Some(touch),
                Err(err) => tracing::warn!("create touch: {err}"),
            }
        }
    }

    fn remove_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        if capability == Capability::Keyboard {
            if let Some(keyboard) = self.keyboard.take() {
                keyboard.release();
            }
        }
        if capability == Capability::Pointer {
            if let Some(pointer) = self.pointer.take() {
                pointer.release();
            }
            if self.pointer_state.release() {
                self.request_redraw(qh);
            }
        }
        if capability == Capability::Touch {
            if let Some(touch) = self.touch.take() {
                touch.release();
            }
            if self.pointer_state.touch_cancel() {
                self.request_redraw(qh);
            }
        }
    }

    fn remove_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {}
}

impl KeyboardHandler for Dock {
    fn enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _surface: &wl_surface::WlSurface,
        _serial: u32,
        _raw: &[u32],
        _keysyms: &[Keysym],
    ) {
    }

    fn leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _surface: &wl_surface::WlSurface,
        _serial: u32,
    ) {
    }

    fn press_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        event: KeyEvent,
    ) {
        if closes_dock(event.keysym) {
            tracing::info!("escape pressed, closing dock");
            self.exit = true;
        }
    }

    fn release_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        _event: KeyEvent,
    ) {
    }

    fn update_modifiers(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        _modifiers: Modifiers,
        _layout: u32,
    ) {
    }
}

fn closes_dock(keysym: Keysym) -> bool {
    keysym == Keysym::Escape
}

impl PointerHandler for Dock {
    fn pointer_frame(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _pointer: &wl_pointer::WlPointer,
        events: &[PointerEvent],
    ) {
        let mut changed = false;
        for event in events {
            if !self.is_dock_surface(&event.surface) {
                continue;
            }
            changed |= match event.kind {
                PointerEventKind::Enter { .. } | PointerEventKind::Motion { .. } => {
                    self.pointer_state.moved(event.position.0)
                }
                PointerEventKind::Leave { .. } => self.pointer_state.release(),
                _ => false,
            };
        }
        if changed {
            self.request_redraw(qh);
        }
    }
}

impl TouchHandler for Dock {
    fn down(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _touch: &wl_touch::WlTouch,
        _serial: u32,
        _time: u32,
        surface: wl_surface::WlSurface,
        id: i32,
        position: (f64, f64),
    ) {
        if self.is_dock_surface(&surface) && self.pointer_state.touch_down(id, position.0) {
            self.request_redraw(qh);
        }
    }

    fn up(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _touch: &wl_touch::WlTouch,
        _serial: u32,
        _time: u32,
        id: i32,
    ) {
        if self.pointer_state.touch_up(id) {
            self.request_redraw(qh);
        }
    }

    fn motion(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _touch: &wl_touch::WlTouch,
        _time: u32,
        id: i32,
        position: (f64, f64),
    ) {
        if self.pointer_state.touch_motion(id, position.0) {
            self.request_redraw(qh);
        }
    }

    fn shape(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _touch: &wl_touch::WlTouch,
        _id: i32,
        _major: f64,
        _minor: f64,
    ) {
    }

    fn orientation(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _touch: &wl_touch::WlTouch,
        _id: i32,
        _orientation: f64,
    ) {
    }

    fn cancel(&mut self, _conn: &Connection, qh: &QueueHandle<Self>, _touch: &wl_touch::WlTouch) {
        if self.pointer_state.touch_cancel() {
            self.request_redraw(qh);
        }
    }
}

impl ShmHandler for Dock {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm
    }
}

delegate_compositor!(Dock);
delegate_output!(Dock);
delegate_shm!(Dock);
delegate_seat!(Dock);
delegate_keyboard!(Dock);
delegate_pointer!(Dock);
delegate_touch!(Dock);
delegate_layer!(Dock);
delegate_registry!(Dock);

impl ProvidesRegistryState for Dock {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    registry_handlers![OutputState, SeatState];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_escape_closes() {
        assert!(closes_dock(Keysym::Escape));
        assert!(!closes_dock(Keysym::Return));
        assert!(!closes_dock(Keysym::Tab));
    }

    #[test]
    fn buffer_len_scales_with_output() {
        assert_eq!(buffer_len(400, 90, 1).unwrap(), 400 * 90 * 4);
        assert_eq!(buffer_len(400, 90, 2).unwrap(), 800 * 180 * 4);
    }

    #[test]
    fn buffer_len_rejects_overflow() {
        assert!(buffer_len(u32::MAX, 90, 1).is_err());
        assert!(buffer_len(4096, 4096, 8).is_err());
    }
}
