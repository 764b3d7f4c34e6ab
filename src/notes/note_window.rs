use super::{
    EMPTY_TITLE, MAX_TITLE_CHARS,
    background::{Background, BackgroundImage, ImageSource, ScaleMode},
    fit_solver::{FitLimits, FitRequest, fit},
    geometry::{Point, Rect, Size},
    metrics::TextMetrics,
    note_style::{FontSpec, NoteStyle, format_color, parse_color},
};
use crate::store::{NoteRecord, RecentFonts};
use chrono::{DateTime, Local, Utc};
use palette::Srgb;
use std::path::PathBuf;
use uuid::Uuid;

/// Pointer interaction constants of a note window.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct InteractionSettings {
    /// side of the square resize handle at the bottom-right corner
    pub resize_handle: i32,
    /// smallest width/height reachable by dragging the resize handle
    pub resize_floor: i32,
    /// part of the window that must stay on screen while dragging
    pub visible_margin: i32,
    /// window size minus the size of its text area
    pub chrome: Size,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            resize_handle: 10,
            resize_floor: 100,
            visible_margin: 50,
            chrome: Size::new(10, 10),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InteractionMode {
    #[default]
    Idle,
    /// pointer was pressed at `press` (window-local) and the window follows it
    Dragging { press: Point },
    /// pointer was pressed on the resize handle while the window was `start_rect`
    Resizing { press: Point, start_rect: Rect },
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Input delivered by the toolkit, positions are window-local.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub enum NoteEvent {
    PointerPressed {
        position: Point,
        button: PointerButton,
    },
    PointerMoved {
        position: Point,
    },
    PointerReleased,
    DoubleClicked,
    HoverEntered,
    HoverLeft {
        over_toolbar: bool,
    },
    TextChanged(String),
    /// window was resized by someone else than the note itself
    Resized(Size),
}

/// Toolbar and menu commands of a single note.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub enum NoteAction {
    SetAlignment(Alignment),
    SelectFont(String),
    AdjustFontSize(i32),
    SetTextColor(String),
    SetBackgroundColor(String),
    ChooseBackgroundImage(PathBuf),
    ScaleBackground(ScaleMode),
    TogglePin,
    Close,
}

/// Whether an event was consumed or should reach the text editor too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Captured,
    Ignored,
}

/// Changes the toolkit has to apply to the native window.
#[derive(serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRequest {
    Move(Point),
    Resize(Size),
    SetAlwaysOnTop(bool),
    Redraw,
    Close,
}

/// External collaborators a note consults while handling input.
pub struct NoteContext<'a> {
    pub metrics: &'a dyn TextMetrics,
    pub images: &'a dyn ImageSource,
    pub fonts: &'a dyn RecentFonts,
    pub screen: Size,
}

#[derive(Debug, Clone)]
pub struct NoteWindow {
    id: Uuid,
    content: String,
    geometry: Rect,
    font: FontSpec,
    background: Background,
    text_color: Srgb<u8>,
    alignment: Alignment,
    is_pinned: bool,
    interaction: InteractionMode,
    toolbars_visible: bool,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    limits: FitLimits,
    settings: InteractionSettings,
    requests: Vec<WindowRequest>,
    is_dirty: bool,
}

impl NoteWindow {
    #[must_use]
    pub fn new(
        style: NoteStyle,
        geometry: Rect,
        limits: FitLimits,
        settings: InteractionSettings,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content: String::new(),
            geometry,
            font: FontSpec {
                size: limits.clamp_font_size(style.font.size),
                ..style.font
            },
            background: Background::Color(style.background),
            text_color: style.text_color,
            alignment: Alignment::default(),
            is_pinned: false,
            interaction: InteractionMode::Idle,
            toolbars_visible: false,
            created: now,
            modified: now,
            limits,
            settings,
            requests: Vec::new(),
            is_dirty: true,
        }
    }

    /// Rebuilds a note from its stored record, falling back to `style` for unreadable colors
    /// and bounding its size like a window the user could have resized
    #[must_use]
    pub fn from_record(
        record: NoteRecord,
        style: &NoteStyle,
        limits: FitLimits,
        settings: InteractionSettings,
    ) -> Self {
        let background = parse_color(&record.background_color).unwrap_or_else(|e| {
            tracing::warn!(
                note = %record.id,
                "bad background color {}: {e}",
                record.background_color
            );
            style.background
        });
        let text_color = parse_color(&record.font_color).unwrap_or_else(|e| {
            tracing::warn!(note = %record.id, "bad text color {}: {e}", record.font_color);
            style.text_color
        });
        let stored = Size::new(record.size.0, record.size.1);
        // a note may have been dragged down to the resize floor, below the creation bounds
        let size = Size::new(
            stored
                .width
                .max(settings.resize_floor.min(limits.min_width))
                .min(limits.max_width),
            stored
                .height
                .max(settings.resize_floor.min(limits.min_height))
                .min(limits.max_height),
        );
        if size != stored {
            tracing::warn!(note = %record.id, ?stored, ?size, "stored size is out of bounds");
        }
        Self {
            id: record.id,
            content: record.content,
            geometry: Rect::new(record.position.0, record.position.1, size.width, size.height),
            font: FontSpec::new(
                &record.font_family,
                limits.clamp_font_size(record.font_size),
            ),
            background: Background::Color(background),
            text_color,
            alignment: Alignment::default(),
            is_pinned: record.is_top_most,
            interaction: InteractionMode::Idle,
            toolbars_visible: false,
            created: record.created_at,
            modified: record.updated_at,
            limits,
            settings,
            requests: Vec::new(),
            is_dirty: size != stored,
        }
    }

    #[must_use]
    pub fn to_record(&self) -> NoteRecord {
        // image backgrounds are not persisted, the note comes back with the default color
        let background_color = match &self.background {
            Background::Color(color) => format_color(*color),
            Background::Image(_) => format_color(super::DEF_BACKGROUND_COLOR),
        };
        NoteRecord {
            id: self.id,
            content: self.content.clone(),
            position: (self.geometry.x, self.geometry.y),
            size: (self.geometry.width, self.geometry.height),
            created_at: self.created,
            updated_at: self.modified,
            is_top_most: self.is_pinned,
            background_color,
            font_family: self.font.family.clone(),
            font_size: self.font.size,
            font_color: format_color(self.text_color),
        }
    }

    // getters

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn get_title(&self) -> &str {
        if self.content.is_empty() {
            EMPTY_TITLE
        } else {
            self.content.lines().next().map_or(EMPTY_TITLE, |line| {
                match line.char_indices().nth(MAX_TITLE_CHARS) {
                    None => line,
                    Some((byte_index, _)) => &line[..byte_index],
                }
            })
        }
    }

    #[must_use]
    pub fn get_content(&self) -> &str {
        self.content.as_str()
    }

    #[must_use]
    pub fn geometry(&self) -> Rect {
        self.geometry
    }

    /// Area left for the text editor inside the window
    #[must_use]
    pub fn content_area(&self) -> Size {
        self.geometry.size() - self.settings.chrome
    }

    #[must_use]
    pub fn font(&self) -> &FontSpec {
        &self.font
    }

    #[must_use]
    pub fn background(&self) -> &Background {
        &self.background
    }

    #[must_use]
    pub fn text_color(&self) -> Srgb<u8> {
        self.text_color
    }

    #[must_use]
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.is_pinned
    }

    #[must_use]
    pub fn interaction(&self) -> InteractionMode {
        self.interaction
    }

    #[must_use]
    pub fn toolbars_visible(&self) -> bool {
        self.toolbars_visible
    }

    #[must_use]
    pub fn get_modified(&self) -> DateTime<Local> {
        self.modified.into()
    }

    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.is_dirty
    }

    pub fn commit(&mut self) {
        self.is_dirty = false;
    }

    /// Hands the pending window requests over to the toolkit
    pub fn take_requests(&mut self) -> Vec<WindowRequest> {
        std::mem::take(&mut self.requests)
    }

    // input

    pub fn handle_event(&mut self, event: NoteEvent, ctx: &NoteContext<'_>) -> EventStatus {
        match event {
            NoteEvent::PointerPressed { position, button } => {
                self.on_pointer_pressed(position, button)
            }
            NoteEvent::PointerMoved { position } => self.on_pointer_moved(position, ctx),
            NoteEvent::PointerReleased => {
                if self.interaction == InteractionMode::Idle {
                    EventStatus::Ignored
                } else {
                    self.interaction = InteractionMode::Idle;
                    EventStatus::Captured
                }
            }
            NoteEvent::DoubleClicked => {
                if self.is_pinned {
                    self.set_pinned(false);
                    EventStatus::Captured
                } else {
                    // the editor selects words on double click
                    EventStatus::Ignored
                }
            }
            NoteEvent::HoverEntered => {
                self.show_toolbars();
                EventStatus::Captured
            }
            NoteEvent::HoverLeft { over_toolbar } => {
                // a drag keeps receiving moves outside of the window: keep the controls
                if self.toolbars_visible
                    && !over_toolbar
                    && !matches!(self.interaction, InteractionMode::Dragging { .. })
                {
                    self.toolbars_visible = false;
                    self.requests.push(WindowRequest::Redraw);
                }
                EventStatus::Captured
            }
            NoteEvent::TextChanged(text) => {
                self.set_content(text);
                self.refit(ctx);
                self.requests.push(WindowRequest::Redraw);
                EventStatus::Captured
            }
            NoteEvent::Resized(size) => {
                if size != self.geometry.size() {
                    self.geometry.set_size(size);
                    self.is_dirty = true;
                    self.on_size_changed(ctx);
                }
                EventStatus::Captured
            }
        }
    }

    pub fn perform(&mut self, action: NoteAction, ctx: &NoteContext<'_>) {
        match action {
            NoteAction::SetAlignment(alignment) => {
                if self.alignment != alignment {
                    self.alignment = alignment;
                    self.requests.push(WindowRequest::Redraw);
                }
            }
            NoteAction::SelectFont(family) => {
                ctx.fonts.record_font_used(&family);
                self.set_font(
                    FontSpec {
                        family,
                        size: self.font.size,
                    },
                    ctx,
                );
            }
            NoteAction::AdjustFontSize(delta) => {
                let size = self.limits.clamp_font_size(self.font.size.saturating_add(delta));
                self.set_font(
                    FontSpec {
                        family: self.font.family.clone(),
                        size,
                    },
                    ctx,
                );
            }
            NoteAction::SetTextColor(color) => match parse_color(&color) {
                Ok(color) => self.set_text_color(color),
                Err(e) => tracing::warn!(note = %self.id, "ignore text color {color}: {e}"),
            },
            NoteAction::SetBackgroundColor(color) => match parse_color(&color) {
                Ok(color) => self.set_background_color(color),
                Err(e) => tracing::warn!(note = %self.id, "ignore background color {color}: {e}"),
            },
            NoteAction::ChooseBackgroundImage(path) => self.load_background_image(path, ctx),
            NoteAction::ScaleBackground(mode) => self.scale_background(mode, ctx),
            NoteAction::TogglePin => self.set_pinned(!self.is_pinned),
            NoteAction::Close => {
                self.interaction = InteractionMode::Idle;
                self.requests.push(WindowRequest::Close);
            }
        }
    }

    // style updates, also broadcast by the control panel

    pub fn set_font(&mut self, font: FontSpec, ctx: &NoteContext<'_>) {
        self.font = FontSpec {
            size: self.limits.clamp_font_size(font.size),
            ..font
        };
        self.is_dirty = true;
        self.refit(ctx);
        self.requests.push(WindowRequest::Redraw);
    }

    pub fn set_background_color(&mut self, color: Srgb<u8>) {
        self.background = Background::Color(color);
        self.is_dirty = true;
        self.requests.push(WindowRequest::Redraw);
    }

    pub fn set_text_color(&mut self, color: Srgb<u8>) {
        if self.text_color != color {
            self.text_color = color;
            self.is_dirty = true;
            self.requests.push(WindowRequest::Redraw);
        }
    }

    // private methods

    fn on_pointer_pressed(&mut self, position: Point, button: PointerButton) -> EventStatus {
        if button != PointerButton::Left {
            return EventStatus::Ignored;
        }
        if self
            .geometry
            .in_bottom_right_corner(position, self.settings.resize_handle)
        {
            self.interaction = InteractionMode::Resizing {
                press: position,
                start_rect: self.geometry,
            };
        } else {
            self.interaction = InteractionMode::Dragging { press: position };
            self.show_toolbars();
        }
        EventStatus::Captured
    }

    fn on_pointer_moved(&mut self, position: Point, ctx: &NoteContext<'_>) -> EventStatus {
        match self.interaction {
            InteractionMode::Idle => EventStatus::Ignored,
            InteractionMode::Resizing { press, start_rect } => {
                let delta = position - press;
                let floor = self.settings.resize_floor;
                let size = Size::new(
                    (start_rect.width + delta.x).max(floor),
                    (start_rect.height + delta.y).max(floor),
                );
                if size != self.geometry.size() {
                    self.geometry.set_size(size);
                    self.is_dirty = true;
                    self.requests.push(WindowRequest::Resize(size));
                    self.on_size_changed(ctx);
                }
                EventStatus::Captured
            }
            InteractionMode::Dragging { press } => {
                let target = self.geometry.position() + (position - press);
                let margin = self.settings.visible_margin;
                let clamped = Point::new(
                    target
                        .x
                        .min(ctx.screen.width - margin)
                        .max(margin - self.geometry.width),
                    target
                        .y
                        .min(ctx.screen.height - margin)
                        .max(margin - self.geometry.height),
                );
                if clamped != self.geometry.position() {
                    self.geometry.set_position(clamped);
                    self.is_dirty = true;
                    self.requests.push(WindowRequest::Move(clamped));
                }
                EventStatus::Captured
            }
        }
    }

    fn show_toolbars(&mut self) {
        if !self.toolbars_visible {
            self.toolbars_visible = true;
            self.requests.push(WindowRequest::Redraw);
        }
    }

    fn set_pinned(&mut self, on: bool) {
        if self.is_pinned != on {
            self.is_pinned = on;
            self.is_dirty = true;
            self.requests.push(WindowRequest::SetAlwaysOnTop(on));
        }
    }

    fn set_content(&mut self, content: String) {
        if self.content != content {
            self.content = content;
            self.modified = Utc::now();
            self.is_dirty = true;
        }
    }

    fn on_size_changed(&mut self, ctx: &NoteContext<'_>) {
        self.background.refit(self.geometry.size());
        self.refit(ctx);
        self.requests.push(WindowRequest::Redraw);
    }

    /// Window size requested by the note itself: the toolkit has to follow
    fn resize_to(&mut self, size: Size, ctx: &NoteContext<'_>) {
        if size != self.geometry.size() {
            self.geometry.set_size(size);
            self.is_dirty = true;
            self.requests.push(WindowRequest::Resize(size));
        }
        self.on_size_changed(ctx);
    }

    /// Reconciles font size and window size with the current text
    fn refit(&mut self, ctx: &NoteContext<'_>) {
        let request = FitRequest {
            content_area: self.content_area(),
            text: &self.content,
            font_family: &self.font.family,
            font_size: self.font.size,
            window_size: self.geometry.size(),
        };
        let outcome = fit(&request, &self.limits, ctx.metrics);
        if outcome.is_unchanged(&request) {
            return;
        }
        if outcome.font_size != self.font.size {
            tracing::debug!(
                note = %self.id,
                from = self.font.size,
                to = outcome.font_size,
                "font size fitted"
            );
            self.font.size = outcome.font_size;
            self.is_dirty = true;
        }
        if outcome.window_size != self.geometry.size() {
            self.geometry.set_size(outcome.window_size);
            self.is_dirty = true;
            self.background.refit(outcome.window_size);
            self.requests.push(WindowRequest::Resize(outcome.window_size));
        }
    }

    fn load_background_image(&mut self, path: PathBuf, ctx: &NoteContext<'_>) {
        match ctx.images.try_image_size(&path) {
            Ok(natural) => {
                let mode = ScaleMode::Original;
                let window = mode.window_size_for(natural, self.geometry.size(), &self.limits);
                self.background = Background::Image(BackgroundImage {
                    source: path,
                    natural,
                    rendered: mode.render_size(natural, window),
                    mode,
                });
                self.resize_to(window, ctx);
            }
            Err(e) => {
                // previous background stays
                tracing::warn!(note = %self.id, "background image is not changed: {e}");
            }
        }
    }

    fn scale_background(&mut self, mode: ScaleMode, ctx: &NoteContext<'_>) {
        let Background::Image(image) = &mut self.background else {
            tracing::debug!(note = %self.id, "no background image to scale");
            return;
        };
        image.mode = mode;
        let window = mode.window_size_for(image.natural, self.geometry.size(), &self.limits);
        self.resize_to(window, ctx);
    }
}

#[cfg(test)]
use crate::notes::{
    background::BackgroundError,
    metrics::{EstimatedMetrics, TextExtent},
};
#[cfg(test)]
use std::{cell::RefCell, path::Path};

#[cfg(test)]
#[derive(Default)]
struct Ledger(RefCell<Vec<String>>);

#[cfg(test)]
impl RecentFonts for Ledger {
    fn record_font_used(&self, name: &str) {
        self.0.borrow_mut().retain(|font| font != name);
        self.0.borrow_mut().insert(0, name.to_string());
    }

    fn list_recent_fonts(&self, limit: usize) -> Vec<String> {
        self.0.borrow().iter().take(limit).cloned().collect()
    }
}

#[cfg(test)]
struct Images;

#[cfg(test)]
impl ImageSource for Images {
    fn try_image_size(&self, path: &Path) -> Result<Size, BackgroundError> {
        if path.ends_with("photo.png") {
            Ok(Size::new(640, 480))
        } else {
            Err(BackgroundError::Empty(path.to_path_buf()))
        }
    }
}

#[cfg(test)]
struct Fixture {
    metrics: EstimatedMetrics,
    ledger: Ledger,
}

#[cfg(test)]
impl Fixture {
    fn new() -> Self {
        Self {
            metrics: EstimatedMetrics::default(),
            ledger: Ledger::default(),
        }
    }

    fn ctx(&self) -> NoteContext<'_> {
        NoteContext {
            metrics: &self.metrics,
            images: &Images,
            fonts: &self.ledger,
            screen: Size::new(1920, 1080),
        }
    }
}

#[cfg(test)]
fn note() -> NoteWindow {
    NoteWindow::new(
        NoteStyle::default(),
        Rect::new(100, 100, 300, 200),
        FitLimits::default(),
        InteractionSettings::default(),
    )
}

#[cfg(test)]
fn press(x: i32, y: i32) -> NoteEvent {
    NoteEvent::PointerPressed {
        position: Point::new(x, y),
        button: PointerButton::Left,
    }
}

#[cfg(test)]
fn move_to(x: i32, y: i32) -> NoteEvent {
    NoteEvent::PointerMoved {
        position: Point::new(x, y),
    }
}

#[test]
fn press_on_handle_starts_resizing() {
    let fixture = Fixture::new();
    let mut note = note();
    note.handle_event(press(295, 195), &fixture.ctx());
    assert!(matches!(note.interaction(), InteractionMode::Resizing { .. }));
    // toolbars are revealed only by drags and hovering
    assert!(!note.toolbars_visible());

    note.handle_event(move_to(345, 235), &fixture.ctx());
    assert_eq!(note.geometry(), Rect::new(100, 100, 350, 240));

    note.handle_event(NoteEvent::PointerReleased, &fixture.ctx());
    assert_eq!(note.interaction(), InteractionMode::Idle);
}

#[test]
fn resize_is_floored_at_resize_minimum() {
    let fixture = Fixture::new();
    let mut note = note();
    note.handle_event(press(295, 195), &fixture.ctx());
    note.handle_event(move_to(-5000, -5000), &fixture.ctx());
    // looser than the creation bounds on purpose
    assert_eq!(note.geometry().size(), Size::new(100, 100));
    assert!(note.take_requests().contains(&WindowRequest::Resize(Size::new(100, 100))));
}

#[test]
fn press_elsewhere_starts_dragging_and_shows_toolbars() {
    let fixture = Fixture::new();
    let mut note = note();
    note.handle_event(press(20, 20), &fixture.ctx());
    assert_eq!(
        note.interaction(),
        InteractionMode::Dragging {
            press: Point::new(20, 20)
        }
    );
    assert!(note.toolbars_visible());

    note.handle_event(move_to(50, 70), &fixture.ctx());
    assert_eq!(note.geometry().position(), Point::new(130, 150));
    assert!(note.take_requests().contains(&WindowRequest::Move(Point::new(130, 150))));
}

#[test]
fn drag_keeps_part_of_the_window_on_screen() {
    let fixture = Fixture::new();
    for (dx, dy) in [(-10_000, -10_000), (10_000, 10_000), (-10_000, 10_000), (3, -4)] {
        let mut note = note();
        note.handle_event(press(20, 20), &fixture.ctx());
        note.handle_event(move_to(20 + dx, 20 + dy), &fixture.ctx());
        let rect = note.geometry();
        assert!(rect.x + rect.width >= 50, "left edge for {dx}");
        assert!(rect.x <= 1920 - 50, "right edge for {dx}");
        assert!(rect.y + rect.height >= 50, "top edge for {dy}");
        assert!(rect.y <= 1080 - 50, "bottom edge for {dy}");
    }
}

#[test]
fn other_buttons_do_not_start_interactions() {
    let fixture = Fixture::new();
    let mut note = note();
    let status = note.handle_event(
        NoteEvent::PointerPressed {
            position: Point::new(20, 20),
            button: PointerButton::Right,
        },
        &fixture.ctx(),
    );
    assert_eq!(status, EventStatus::Ignored);
    assert_eq!(note.interaction(), InteractionMode::Idle);
    assert_eq!(
        note.handle_event(move_to(80, 80), &fixture.ctx()),
        EventStatus::Ignored
    );
}

#[test]
fn hover_shows_and_hides_toolbars() {
    let fixture = Fixture::new();
    let mut note = note();
    note.handle_event(NoteEvent::HoverEntered, &fixture.ctx());
    note.handle_event(NoteEvent::HoverEntered, &fixture.ctx());
    assert!(note.toolbars_visible());

    note.handle_event(NoteEvent::HoverLeft { over_toolbar: true }, &fixture.ctx());
    assert!(note.toolbars_visible());

    note.handle_event(NoteEvent::HoverLeft { over_toolbar: false }, &fixture.ctx());
    assert!(!note.toolbars_visible());
}

#[test]
fn leaving_during_drag_keeps_toolbars() {
    let fixture = Fixture::new();
    let mut note = note();
    note.handle_event(press(20, 20), &fixture.ctx());
    note.handle_event(NoteEvent::HoverLeft { over_toolbar: false }, &fixture.ctx());
    assert!(note.toolbars_visible());

    note.handle_event(NoteEvent::PointerReleased, &fixture.ctx());
    note.handle_event(NoteEvent::HoverLeft { over_toolbar: false }, &fixture.ctx());
    assert!(!note.toolbars_visible());
}

#[test]
fn double_click_unpins() {
    let fixture = Fixture::new();
    let mut note = note();
    // not pinned: the editor gets the double click
    assert_eq!(
        note.handle_event(NoteEvent::DoubleClicked, &fixture.ctx()),
        EventStatus::Ignored
    );

    note.perform(NoteAction::TogglePin, &fixture.ctx());
    assert!(note.is_pinned());
    assert_eq!(note.take_requests(), vec![WindowRequest::SetAlwaysOnTop(true)]);

    assert_eq!(
        note.handle_event(NoteEvent::DoubleClicked, &fixture.ctx()),
        EventStatus::Captured
    );
    assert!(!note.is_pinned());
    assert_eq!(note.take_requests(), vec![WindowRequest::SetAlwaysOnTop(false)]);
}

#[test]
fn text_change_fits_font_and_window() {
    let fixture = Fixture::new();
    let mut note = note();
    let text = "x".repeat(60);
    note.handle_event(NoteEvent::TextChanged(text.clone()), &fixture.ctx());
    let limits = FitLimits::default();
    assert_eq!(note.get_content(), text);
    assert!((limits.min_width..=limits.max_width).contains(&note.geometry().width));
    let available = limits.effective_available(note.content_area());
    let extent: TextExtent = fixture.metrics.measure("Arial", note.font().size, &text);
    assert!(extent.width <= available.width as f32);
    assert!(extent.height <= available.height as f32);
    // top-left corner is not touched by fitting
    assert_eq!(note.geometry().position(), Point::new(100, 100));
}

#[test]
fn adjust_font_size_is_clamped_then_fitted() {
    let fixture = Fixture::new();
    let mut note = note();
    note.perform(NoteAction::AdjustFontSize(-100), &fixture.ctx());
    // no text, nothing to fit: only the clamp applies
    assert_eq!(note.font().size, 8);
    note.perform(NoteAction::AdjustFontSize(1000), &fixture.ctx());
    assert_eq!(note.font().size, 72);
}

#[test]
fn selecting_font_records_it_and_keeps_size() {
    let fixture = Fixture::new();
    let mut note = note();
    note.perform(NoteAction::SelectFont("Times New Roman".to_string()), &fixture.ctx());
    assert_eq!(note.font(), &FontSpec::new("Times New Roman", 12));
    assert_eq!(fixture.ledger.list_recent_fonts(5), vec!["Times New Roman"]);
}

#[test]
fn failed_image_load_keeps_previous_background() {
    let fixture = Fixture::new();
    let mut note = note();
    let before = note.background().clone();
    note.perform(
        NoteAction::ChooseBackgroundImage(PathBuf::from("/tmp/broken.png")),
        &fixture.ctx(),
    );
    assert_eq!(note.background(), &before);
    assert_eq!(note.geometry().size(), Size::new(300, 200));
}

#[test]
fn background_image_takes_its_size_and_follows_scale_mode() {
    let fixture = Fixture::new();
    let mut note = note();
    note.perform(
        NoteAction::ChooseBackgroundImage(PathBuf::from("/tmp/photo.png")),
        &fixture.ctx(),
    );
    assert_eq!(note.geometry().size(), Size::new(640, 480));

    note.handle_event(NoteEvent::Resized(Size::new(400, 400)), &fixture.ctx());
    note.perform(NoteAction::ScaleBackground(ScaleMode::FitWidth), &fixture.ctx());
    assert_eq!(note.geometry().size(), Size::new(400, 300));
    let Background::Image(image) = note.background() else {
        panic!("background must be an image");
    };
    assert_eq!(image.mode, ScaleMode::FitWidth);
    assert_eq!(image.rendered, Size::new(400, 300));

    note.perform(NoteAction::ScaleBackground(ScaleMode::Fit), &fixture.ctx());
    let Background::Image(image) = note.background() else {
        panic!("background must be an image");
    };
    assert_eq!(image.rendered, Size::new(400, 300));
}

#[test]
fn scaling_without_image_is_noop() {
    let fixture = Fixture::new();
    let mut note = note();
    note.perform(NoteAction::ScaleBackground(ScaleMode::Original), &fixture.ctx());
    assert_eq!(note.geometry().size(), Size::new(300, 200));
    assert!(note.take_requests().is_empty());
}

#[test]
fn record_round_trip_keeps_note_state() {
    let fixture = Fixture::new();
    let mut note = note();
    note.handle_event(NoteEvent::TextChanged("Hello".to_string()), &fixture.ctx());
    note.perform(NoteAction::TogglePin, &fixture.ctx());
    note.perform(NoteAction::SetTextColor("#FF0000".to_string()), &fixture.ctx());

    let restored = NoteWindow::from_record(
        note.to_record(),
        &NoteStyle::default(),
        FitLimits::default(),
        InteractionSettings::default(),
    );
    assert_eq!(restored.id(), note.id());
    assert_eq!(restored.get_content(), "Hello");
    assert_eq!(restored.geometry(), note.geometry());
    assert_eq!(restored.font(), note.font());
    assert!(restored.is_pinned());
    assert_eq!(restored.text_color(), Srgb::new(0xff, 0, 0));
    assert!(!restored.is_changed());
}

#[test]
fn restored_size_is_bounded() {
    let mut record = note().to_record();
    record.position = (40, 60);
    record.size = (5000, 4000);
    let restored = NoteWindow::from_record(
        record.clone(),
        &NoteStyle::default(),
        FitLimits::default(),
        InteractionSettings::default(),
    );
    assert_eq!(restored.geometry(), Rect::new(40, 60, 800, 600));
    // saved back with its new size
    assert!(restored.is_changed());

    // a note resized by hand down to the floor comes back as it was
    record.size = (100, 100);
    let restored = NoteWindow::from_record(
        record,
        &NoteStyle::default(),
        FitLimits::default(),
        InteractionSettings::default(),
    );
    assert_eq!(restored.geometry().size(), Size::new(100, 100));
    assert!(!restored.is_changed());
}

#[test]
fn title_is_first_line_prefix() {
    let fixture = Fixture::new();
    let mut note = note();
    assert_eq!(note.get_title(), EMPTY_TITLE);
    note.handle_event(
        NoteEvent::TextChanged("Groceries for the weekend\nmilk".to_string()),
        &fixture.ctx(),
    );
    assert_eq!(note.get_title(), "Groceries fo");
}
