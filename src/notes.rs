use palette::Srgb;

pub use background::{
    Background, BackgroundError, BackgroundImage, ImageFiles, ImageSource, ScaleMode,
};
pub use control_panel::{ControlPanel, PanelSettings};
pub use fit_solver::{FitLimits, FitOutcome, FitRequest, fit};
pub use geometry::{Point, Rect, Size};
pub use metrics::{EstimatedMetrics, TextExtent, TextMetrics};
pub use note_style::{FontSpec, NoteStyle, format_color, parse_color};
pub use note_window::{
    Alignment, EventStatus, InteractionMode, InteractionSettings, NoteAction, NoteContext,
    NoteEvent, NoteWindow, PointerButton, WindowRequest,
};

mod background;
mod control_panel;
mod fit_solver;
mod geometry;
mod metrics;
mod note_style;
mod note_window;

const DEF_FONT_FAMILY: &str = "Arial";
const DEF_FONT_SIZE: i32 = 12;
const DEF_BACKGROUND_COLOR: Srgb<u8> = Srgb::new(0xFF, 0xFF, 0x99);
const DEF_TEXT_COLOR: Srgb<u8> = Srgb::new(0x00, 0x00, 0x00);
const DEF_NOTE_WIDTH: i32 = 300;
const DEF_NOTE_HEIGHT: i32 = 200;
const EMPTY_TITLE: &str = "<Empty>";
const MAX_TITLE_CHARS: usize = 12;
