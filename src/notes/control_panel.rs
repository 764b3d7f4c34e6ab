use super::{
    DEF_NOTE_HEIGHT, DEF_NOTE_WIDTH,
    fit_solver::FitLimits,
    geometry::{Rect, Size},
    note_style::{FontSpec, NoteStyle},
    note_window::{InteractionSettings, NoteAction, NoteContext, NoteWindow},
};
use crate::store::{NoteRecord, RecentFonts, font_choices};
use palette::Srgb;
use rand::Rng;
use uuid::Uuid;

/// Distance kept between a new note and the screen edges
const PLACEMENT_MARGIN: i32 = 50;

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PanelSettings {
    pub limits: FitLimits,
    pub interaction: InteractionSettings,
    pub note_size: Size,
    pub recent_fonts_limit: usize,
    pub common_fonts: Vec<String>,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            limits: FitLimits::default(),
            interaction: InteractionSettings::default(),
            note_size: Size::new(DEF_NOTE_WIDTH, DEF_NOTE_HEIGHT),
            recent_fonts_limit: 5,
            common_fonts: [
                "Arial",
                "Times New Roman",
                "Courier New",
                "Verdana",
                "Georgia",
                "Comic Sans MS",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl PanelSettings {
    /// Replaces unusable limits with the defaults and keeps the new note size in bounds
    #[must_use]
    pub fn validated(mut self) -> Self {
        if !self.limits.is_valid() {
            tracing::warn!(limits = ?self.limits, "invalid fit limits, using defaults");
            self.limits = FitLimits::default();
        }
        self.note_size = self.limits.clamp_size(self.note_size);
        self
    }
}

/// Registry of live notes in creation order, owner of the default note style.
///
/// A note leaving the registry is destroyed: there is no hidden or deleted state.
#[derive(Debug, Clone, Default)]
pub struct ControlPanel {
    notes: Vec<NoteWindow>,
    style: NoteStyle,
    settings: PanelSettings,
}

impl ControlPanel {
    #[must_use]
    pub fn new(style: NoteStyle, settings: PanelSettings) -> Self {
        Self {
            notes: Vec::new(),
            style,
            settings: settings.validated(),
        }
    }

    #[must_use]
    pub fn style(&self) -> &NoteStyle {
        &self.style
    }

    #[must_use]
    pub fn settings(&self) -> &PanelSettings {
        &self.settings
    }

    // operations with notes

    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NoteWindow> {
        self.notes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut NoteWindow> {
        self.notes.iter_mut()
    }

    #[must_use]
    pub fn get_note(&self, note_id: Uuid) -> Option<&NoteWindow> {
        self.notes.iter().find(|note| note.id() == note_id)
    }

    pub fn get_note_mut(&mut self, note_id: Uuid) -> Option<&mut NoteWindow> {
        self.notes.iter_mut().find(|note| note.id() == note_id)
    }

    /// Creates a note at a random place of the screen
    pub fn create_note(&mut self, screen: Size) -> Uuid {
        self.create_note_with_rng(screen, &mut rand::thread_rng())
    }

    pub fn create_note_with_rng<R: Rng>(&mut self, screen: Size, rng: &mut R) -> Uuid {
        let size = self.settings.note_size;
        let max_x = (screen.width - size.width - PLACEMENT_MARGIN).max(PLACEMENT_MARGIN);
        let max_y = (screen.height - size.height - PLACEMENT_MARGIN).max(PLACEMENT_MARGIN);
        let geometry = Rect::new(
            rng.gen_range(PLACEMENT_MARGIN..=max_x),
            rng.gen_range(PLACEMENT_MARGIN..=max_y),
            size.width,
            size.height,
        );
        let note = NoteWindow::new(
            self.style.clone(),
            geometry,
            self.settings.limits,
            self.settings.interaction,
        );
        let id = note.id();
        tracing::debug!(note = %id, x = geometry.x, y = geometry.y, "note created");
        self.notes.push(note);
        id
    }

    /// Puts a stored note back on screen
    pub fn restore_note(&mut self, record: NoteRecord) -> Uuid {
        if let Some(index) = self.notes.iter().position(|note| note.id() == record.id) {
            tracing::warn!(note = %record.id, "note is already live, replacing it");
            self.notes.remove(index);
        }
        let note = NoteWindow::from_record(
            record,
            &self.style,
            self.settings.limits,
            self.settings.interaction,
        );
        let id = note.id();
        self.notes.push(note);
        id
    }

    /// Drops the note from the registry, the caller owns what is left of it
    pub fn remove_note(&mut self, note_id: Uuid) -> Option<NoteWindow> {
        let index = self.notes.iter().position(|note| note.id() == note_id)?;
        tracing::debug!(note = %note_id, "note removed");
        Some(self.notes.remove(index))
    }

    /// Asks the note to close its window and removes it; closing twice is a no-op
    pub fn close_note(&mut self, note_id: Uuid, ctx: &NoteContext<'_>) -> Option<NoteWindow> {
        let mut note = self.remove_note(note_id)?;
        note.perform(NoteAction::Close, ctx);
        Some(note)
    }

    /// Closes every live note, the closed notes are returned in creation order
    pub fn shutdown(&mut self, ctx: &NoteContext<'_>) -> Vec<NoteWindow> {
        let ids: Vec<Uuid> = self.notes.iter().map(NoteWindow::id).collect();
        tracing::info!(count = ids.len(), "closing all notes");
        ids.into_iter()
            .filter_map(|id| self.close_note(id, ctx))
            .collect()
    }

    // default style, broadcast to every live note

    pub fn set_default_font(&mut self, font: FontSpec, ctx: &NoteContext<'_>) {
        ctx.fonts.record_font_used(&font.family);
        self.style.font = font;
        let font = self.style.font.clone();
        self.for_each_note_mut(|note| note.set_font(font.clone(), ctx));
    }

    pub fn set_default_background(&mut self, color: Srgb<u8>) {
        self.style.background = color;
        self.for_each_note_mut(|note| note.set_background_color(color));
    }

    pub fn set_default_text_color(&mut self, color: Srgb<u8>) {
        self.style.text_color = color;
        self.for_each_note_mut(|note| note.set_text_color(color));
    }

    /// Recent fonts first, then the configured common ones
    #[must_use]
    pub fn font_choices(&self, fonts: &dyn RecentFonts) -> Vec<String> {
        font_choices(
            fonts.list_recent_fonts(self.settings.recent_fonts_limit),
            &self.settings.common_fonts,
        )
    }

    // private methods

    /// Visits the notes live when the call started, by id
    fn for_each_note_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut NoteWindow),
    {
        let ids: Vec<Uuid> = self.notes.iter().map(NoteWindow::id).collect();
        for id in ids {
            if let Some(note) = self.get_note_mut(id) {
                f(note);
            }
        }
    }
}

#[cfg(test)]
use crate::notes::{
    background::{BackgroundError, ImageSource},
    metrics::EstimatedMetrics,
    note_window::WindowRequest,
    Background,
};
#[cfg(test)]
use rand::{SeedableRng, rngs::StdRng};
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
struct NoImages;

#[cfg(test)]
impl ImageSource for NoImages {
    fn try_image_size(&self, path: &Path) -> Result<Size, BackgroundError> {
        Err(BackgroundError::Empty(path.to_path_buf()))
    }
}

#[cfg(test)]
const SCREEN: Size = Size::new(1920, 1080);

#[cfg(test)]
fn ctx<'a>(metrics: &'a EstimatedMetrics, ledger: &'a Ledger) -> NoteContext<'a> {
    NoteContext {
        metrics,
        images: &NoImages,
        fonts: ledger,
        screen: SCREEN,
    }
}

#[test]
fn new_notes_are_placed_inside_the_screen() {
    let mut panel = ControlPanel::default();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        panel.create_note_with_rng(SCREEN, &mut rng);
    }
    assert_eq!(panel.len(), 50);
    for note in panel.iter() {
        let rect = note.geometry();
        assert_eq!(rect.size(), Size::new(300, 200));
        assert!((50..=1920 - 300 - 50).contains(&rect.x));
        assert!((50..=1080 - 200 - 50).contains(&rect.y));
    }
}

#[test]
fn tiny_screen_places_notes_at_margin() {
    let mut panel = ControlPanel::default();
    let id = panel.create_note(Size::new(320, 240));
    let note = panel.get_note(id).expect("note must exist");
    assert_eq!(note.geometry().position(), crate::notes::Point::new(50, 50));
}

#[test]
fn new_notes_take_the_default_style() {
    let metrics = EstimatedMetrics::default();
    let ledger = Ledger::default();
    let mut panel = ControlPanel::default();
    panel.set_default_font(FontSpec::new("Courier New", 14), &ctx(&metrics, &ledger));
    panel.set_default_background(Srgb::new(0xaa, 0xbb, 0xcc));

    let id = panel.create_note(SCREEN);
    let note = panel.get_note(id).expect("note must exist");
    assert_eq!(note.font(), &FontSpec::new("Courier New", 14));
    assert_eq!(
        note.background(),
        &Background::Color(Srgb::new(0xaa, 0xbb, 0xcc))
    );
}

#[test]
fn defaults_are_broadcast_to_live_notes() {
    let metrics = EstimatedMetrics::default();
    let ledger = Ledger::default();
    let ctx = ctx(&metrics, &ledger);
    let mut panel = ControlPanel::default();
    let ids = [panel.create_note(SCREEN), panel.create_note(SCREEN)];

    panel.set_default_text_color(Srgb::new(0x11, 0x22, 0x33));
    panel.set_default_font(FontSpec::new("Georgia", 20), &ctx);
    for id in ids {
        let note = panel.get_note(id).expect("note must exist");
        assert_eq!(note.text_color(), Srgb::new(0x11, 0x22, 0x33));
        assert_eq!(note.font().family, "Georgia");
    }
    assert_eq!(ledger.list_recent_fonts(5), vec!["Georgia"]);
}

#[test]
fn closing_twice_is_noop() {
    let metrics = EstimatedMetrics::default();
    let ledger = Ledger::default();
    let ctx = ctx(&metrics, &ledger);
    let mut panel = ControlPanel::default();
    let id = panel.create_note(SCREEN);
    let keep = panel.create_note(SCREEN);

    let mut closed = panel.close_note(id, &ctx).expect("note must be closed");
    assert!(closed.take_requests().contains(&WindowRequest::Close));
    assert!(panel.close_note(id, &ctx).is_none());
    assert!(panel.remove_note(id).is_none());
    assert_eq!(panel.len(), 1);
    assert!(panel.get_note(keep).is_some());
}

#[test]
fn shutdown_closes_every_note() {
    let metrics = EstimatedMetrics::default();
    let ledger = Ledger::default();
    let mut panel = ControlPanel::default();
    let ids: Vec<Uuid> = (0..3).map(|_| panel.create_note(SCREEN)).collect();

    let closed = panel.shutdown(&ctx(&metrics, &ledger));
    assert!(panel.is_empty());
    assert_eq!(closed.iter().map(NoteWindow::id).collect::<Vec<_>>(), ids);
    assert!(panel.shutdown(&ctx(&metrics, &ledger)).is_empty());
}

#[test]
fn restored_note_replaces_live_copy() {
    let mut panel = ControlPanel::default();
    let id = panel.create_note(SCREEN);
    let record = panel.get_note(id).expect("note must exist").to_record();
    assert_eq!(panel.restore_note(record), id);
    assert_eq!(panel.len(), 1);
}

#[test]
fn font_choices_start_with_recent_fonts() {
    let ledger = Ledger::default();
    ledger.record_font_used("Fira Sans");
    ledger.record_font_used("Verdana");
    let panel = ControlPanel::default();
    let choices = panel.font_choices(&ledger);
    assert_eq!(&choices[..3], ["Verdana", "Fira Sans", "Arial"]);
    assert_eq!(choices.iter().filter(|name| *name == "Verdana").count(), 1);
}

#[test]
fn unusable_limits_are_replaced() {
    let settings = PanelSettings {
        limits: FitLimits {
            min_width: 900,
            max_width: 300,
            ..FitLimits::default()
        },
        note_size: Size::new(50, 5000),
        ..PanelSettings::default()
    };
    let mut panel = ControlPanel::new(NoteStyle::default(), settings);
    assert_eq!(panel.settings().limits, FitLimits::default());
    assert_eq!(panel.settings().note_size, Size::new(200, 600));

    let id = panel.create_note(SCREEN);
    let note = panel.get_note(id).expect("note must exist");
    assert_eq!(note.geometry().size(), Size::new(200, 600));
}
