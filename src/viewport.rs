use crate::geometry::Point;
use tracing::debug;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 3.0;
/// Discrete zoom step for buttons and `+` / `-` keys.
pub const ZOOM_STEP: f32 = 1.2;
/// Continuous zoom step per Ctrl+wheel tick.
pub const WHEEL_ZOOM_STEP: f32 = 1.1;
/// Arrow-key pan nudge, in screen pixels.
pub const PAN_STEP: f32 = 20.0;
pub const TRANSITION_MS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub zoom: f32,
    pub pan: Point,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Point::ORIGIN,
        }
    }
}

pub fn clamp_zoom(zoom: f32) -> f32 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Plus,
    Equals,
    Minus,
    Zero,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

impl Key {
    /// Parse a DOM `KeyboardEvent.key` value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Escape" | "Esc" => Some(Key::Escape),
            "+" => Some(Key::Plus),
            "=" => Some(Key::Equals),
            "-" => Some(Key::Minus),
            "0" => Some(Key::Zero),
            "ArrowUp" => Some(Key::ArrowUp),
            "ArrowDown" => Some(Key::ArrowDown),
            "ArrowLeft" => Some(Key::ArrowLeft),
            "ArrowRight" => Some(Key::ArrowRight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

impl PointerButton {
    /// Map a DOM `MouseEvent.button` index.
    pub fn from_index(index: i16) -> Self {
        match index {
            1 => PointerButton::Middle,
            2 => PointerButton::Secondary,
            _ => PointerButton::Primary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEvent {
    Key(Key),
    PointerDown { position: Point, button: PointerButton },
    PointerMove { position: Point },
    PointerUp,
    PointerLeave,
    Wheel { delta_y: f32, ctrl: bool },
}

/// Whether an event was consumed; the host should suppress its default
/// action (page scroll, browser zoom) when it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Yes,
    No,
}

impl Handled {
    pub fn is_handled(self) -> bool {
        self == Handled::Yes
    }
}

/// Page-level scrolling the open viewport suspends.
pub trait ScrollHost {
    fn overflow(&self) -> String;
    fn set_overflow(&mut self, value: &str);
}

/// Host with no page to lock (headless rendering, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScrollHost;

impl ScrollHost for NoScrollHost {
    fn overflow(&self) -> String {
        String::new()
    }

    fn set_overflow(&mut self, _value: &str) {}
}

/// Scoped page-scroll suppression; restores the previous overflow on drop.
#[derive(Debug)]
pub struct ScrollLock<H: ScrollHost> {
    host: H,
    previous: String,
}

impl<H: ScrollHost> ScrollLock<H> {
    pub fn acquire(mut host: H) -> Self {
        let previous = host.overflow();
        host.set_overflow("hidden");
        Self { host, previous }
    }
}

impl<H: ScrollHost> Drop for ScrollLock<H> {
    fn drop(&mut self) {
        self.host.set_overflow(&self.previous);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// Applied immediately (active drag).
    None,
    EaseOut { duration_ms: u32 },
}

impl Transition {
    pub fn css(&self) -> String {
        match self {
            Transition::None => "none".to_string(),
            Transition::EaseOut { duration_ms } => {
                format!("transform {}s ease-out", *duration_ms as f32 / 1000.0)
            }
        }
    }
}

/// Translate by `pan`, then scale by `zoom` about the viewport center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub translate: Point,
    pub scale: f32,
    pub transition: Transition,
}

impl ViewTransform {
    pub fn identity() -> Self {
        Self {
            translate: Point::ORIGIN,
            scale: 1.0,
            transition: Transition::None,
        }
    }

    /// CSS `transform` value; pair with `transform-origin: center center`.
    pub fn css(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.translate.x, self.translate.y, self.scale
        )
    }

    /// Equivalent SVG `transform` attribute with an explicit pivot.
    pub fn svg(&self, center: Point) -> String {
        format!(
            "translate({:.2} {:.2}) scale({:.4}) translate({:.2} {:.2})",
            self.translate.x + center.x,
            self.translate.y + center.y,
            self.scale,
            -center.x,
            -center.y
        )
    }

    /// Content point to screen point.
    pub fn apply(&self, point: Point, center: Point) -> Point {
        self.translate + center + (point - center).scale(self.scale)
    }

    /// Screen point back to content point.
    pub fn invert(&self, screen: Point, center: Point) -> Point {
        (screen - self.translate - center).scale(1.0 / self.scale) + center
    }
}

#[derive(Debug)]
struct OpenView<H: ScrollHost> {
    state: ViewportState,
    drag_origin: Option<Point>,
    _lock: ScrollLock<H>,
}

#[derive(Debug)]
pub struct ViewportController<H: ScrollHost + Clone = NoScrollHost> {
    host: H,
    open: Option<OpenView<H>>,
}

impl Default for ViewportController<NoScrollHost> {
    fn default() -> Self {
        Self::new(NoScrollHost)
    }
}

impl<H: ScrollHost + Clone> ViewportController<H> {
    pub fn new(host: H) -> Self {
        Self { host, open: None }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Current state, or `None` while closed.
    pub fn state(&self) -> Option<ViewportState> {
        self.open.as_ref().map(|view| view.state)
    }

    pub fn zoom(&self) -> f32 {
        self.state().map_or(1.0, |state| state.zoom)
    }

    pub fn pan(&self) -> Point {
        self.state().map_or(Point::ORIGIN, |state| state.pan)
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.zoom() * 100.0).round() as u32
    }

    pub fn is_dragging(&self) -> bool {
        self.open
            .as_ref()
            .is_some_and(|view| view.drag_origin.is_some())
    }

    /// Open with a fresh state, whatever the previous session left behind.
    pub fn open(&mut self) {
        // Release any lock still held before re-acquiring, so the restored
        // overflow is the page's own value.
        self.open = None;
        self.open = Some(OpenView {
            state: ViewportState::default(),
            drag_origin: None,
            _lock: ScrollLock::acquire(self.host.clone()),
        });
        debug!("viewport opened");
    }

    pub fn close(&mut self) {
        if self.open.take().is_some() {
            debug!("viewport closed");
        }
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / ZOOM_STEP);
    }

    pub fn zoom_reset(&mut self) {
        if let Some(view) = self.open.as_mut() {
            view.state = ViewportState::default();
        }
    }

    fn zoom_by(&mut self, factor: f32) {
        if let Some(view) = self.open.as_mut() {
            view.state.zoom = clamp_zoom(view.state.zoom * factor);
            debug!(zoom = view.state.zoom, "viewport zoom");
        }
    }

    /// Start a drag; later moves are measured from `pointer - pan` so the
    /// pan is recomputed absolutely rather than accumulated.
    pub fn begin_drag(&mut self, pointer: Point) {
        if let Some(view) = self.open.as_mut() {
            view.drag_origin = Some(pointer - view.state.pan);
        }
    }

    pub fn drag_to(&mut self, pointer: Point) {
        if let Some(view) = self.open.as_mut()
            && let Some(origin) = view.drag_origin
        {
            view.state.pan = pointer - origin;
        }
    }

    pub fn end_drag(&mut self) {
        if let Some(view) = self.open.as_mut() {
            view.drag_origin = None;
        }
    }

    pub fn nudge(&mut self, dx: f32, dy: f32) {
        if let Some(view) = self.open.as_mut() {
            view.state.pan = view.state.pan + Point::new(dx, dy);
        }
    }

    pub fn handle(&mut self, event: ViewportEvent) -> Handled {
        if !self.is_open() {
            return Handled::No;
        }
        match event {
            ViewportEvent::Key(key) => {
                match key {
                    Key::Escape => self.close(),
                    Key::Plus | Key::Equals => self.zoom_in(),
                    Key::Minus => self.zoom_out(),
                    Key::Zero => self.zoom_reset(),
                    Key::ArrowUp => self.nudge(0.0, PAN_STEP),
                    Key::ArrowDown => self.nudge(0.0, -PAN_STEP),
                    Key::ArrowLeft => self.nudge(PAN_STEP, 0.0),
                    Key::ArrowRight => self.nudge(-PAN_STEP, 0.0),
                }
                Handled::Yes
            }
            ViewportEvent::PointerDown { position, button } => {
                if button != PointerButton::Primary {
                    return Handled::No;
                }
                self.begin_drag(position);
                Handled::Yes
            }
            ViewportEvent::PointerMove { position } => {
                if !self.is_dragging() {
                    return Handled::No;
                }
                self.drag_to(position);
                Handled::Yes
            }
            ViewportEvent::PointerUp | ViewportEvent::PointerLeave => {
                let was_dragging = self.is_dragging();
                self.end_drag();
                if was_dragging { Handled::Yes } else { Handled::No }
            }
            ViewportEvent::Wheel { delta_y, ctrl } => {
                if !ctrl {
                    return Handled::No;
                }
                if delta_y < 0.0 {
                    self.zoom_by(WHEEL_ZOOM_STEP);
                } else {
                    self.zoom_by(1.0 / WHEEL_ZOOM_STEP);
                }
                Handled::Yes
            }
        }
    }

    /// Transform for the current state; `None` while closed.
    pub fn transform(&self) -> Option<ViewTransform> {
        let view = self.open.as_ref()?;
        let transition = if view.drag_origin.is_some() {
            Transition::None
        } else {
            Transition::EaseOut {
                duration_ms: TRANSITION_MS,
            }
        };
        Some(ViewTransform {
            translate: view.state.pan,
            scale: view.state.zoom,
            transition,
        })
    }
}
