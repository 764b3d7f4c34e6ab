pub use notes_db::{NoteRecord, NotesDatabase, NotesStoreError};

mod notes_db;

/// Fonts ordered by most recent use, shared by every note and font menu.
///
/// Failures never reach the interactive flow: implementations log them and degrade to
/// a no-op (recording) or an empty list (listing).
pub trait RecentFonts {
    fn record_font_used(&self, name: &str);
    fn list_recent_fonts(&self, limit: usize) -> Vec<String>;
}

/// Recent fonts first, then the common ones, each name listed once.
#[must_use]
pub fn font_choices(recent: Vec<String>, common: &[String]) -> Vec<String> {
    let mut choices = recent;
    for name in common {
        if !choices.contains(name) {
            choices.push(name.clone());
        }
    }
    choices
}

#[test]
fn font_choices_keep_recent_order_and_skip_duplicates() {
    let common = vec![
        "Arial".to_string(),
        "Times New Roman".to_string(),
        "Courier New".to_string(),
    ];
    let choices = font_choices(vec!["Courier New".to_string(), "Fira Sans".to_string()], &common);
    assert_eq!(
        choices,
        vec!["Courier New", "Fira Sans", "Arial", "Times New Roman"]
    );
}
