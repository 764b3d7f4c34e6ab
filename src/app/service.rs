// SPDX-License-Identifier: MPL-2.0

use crate::{
    app::{PanelCommand, PanelOutput},
    config::Config,
    notes::{
        ControlPanel, EstimatedMetrics, ImageFiles, NoteAction, NoteContext, NoteEvent,
        NoteWindow, Size, parse_color,
    },
    store::{NoteRecord, NotesDatabase, NotesStoreError},
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Failed writing snapshot {}: {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),
    #[error("Failed serializing notes: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Notes store failed: {0}")]
    Store(#[from] NotesStoreError),
    #[error("{failed} notes are not saved, {saved} saved")]
    NotSaved { saved: usize, failed: usize },
}

/// Collaborators every note consults, kept apart from the panel so both can be borrowed
struct Environment {
    metrics: EstimatedMetrics,
    images: ImageFiles,
    database: NotesDatabase,
    screen: Size,
}

impl Environment {
    fn ctx(&self) -> NoteContext<'_> {
        NoteContext {
            metrics: &self.metrics,
            images: &self.images,
            fonts: &self.database,
            screen: self.screen,
        }
    }
}

/// Headless notes service: applies panel commands and tells the toolkit what to do.
pub struct ServiceModel {
    panel: ControlPanel,
    env: Environment,
    is_running: bool,
}

fn failed(message: String) -> PanelOutput {
    tracing::warn!("{message}");
    PanelOutput::Failed { message }
}

fn drain_requests(note: &mut NoteWindow) -> impl Iterator<Item = PanelOutput> {
    let id = note.id();
    note.take_requests()
        .into_iter()
        .map(move |request| PanelOutput::Request { note: id, request })
}

#[allow(clippy::missing_errors_doc)]
impl ServiceModel {
    pub fn try_new(config: Config) -> Result<Self, ServiceError> {
        let database = NotesDatabase::new(&config.database);
        database.try_init()?;
        Ok(Self {
            panel: ControlPanel::new(config.style, config.panel),
            env: Environment {
                metrics: config.metrics,
                images: ImageFiles,
                database,
                screen: config.screen,
            },
            is_running: true,
        })
    }

    #[must_use]
    pub fn panel(&self) -> &ControlPanel {
        &self.panel
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Puts the stored notes back on screen, an unreadable store starts empty
    pub fn restore_notes(&mut self) -> Vec<PanelOutput> {
        let records = self.env.database.try_list_notes().unwrap_or_else(|e| {
            tracing::warn!("failed loading notes, starting without them: {e}");
            Vec::new()
        });
        tracing::info!(count = records.len(), "restoring notes");
        records
            .into_iter()
            .filter_map(|record| {
                let id = self.panel.restore_note(record);
                self.opened(id)
            })
            .collect()
    }

    pub async fn update(&mut self, command: PanelCommand) -> Vec<PanelOutput> {
        match command {
            PanelCommand::NewNote => {
                let id = self.panel.create_note(self.env.screen);
                self.opened(id).into_iter().collect()
            }
            PanelCommand::Event { note, event } => self.on_note_event(note, event),
            PanelCommand::Action {
                note,
                action: NoteAction::Close,
            } => self.on_close_note(note),
            PanelCommand::Action { note, action } => self.on_note_action(note, action),
            PanelCommand::SetDefaultFont { font } => {
                self.panel.set_default_font(font, &self.env.ctx());
                self.drain_all_requests()
            }
            PanelCommand::SetDefaultBackground { color } => match parse_color(&color) {
                Ok(color) => {
                    self.panel.set_default_background(color);
                    self.drain_all_requests()
                }
                Err(e) => vec![failed(format!("Invalid background color {color}: {e}"))],
            },
            PanelCommand::SetDefaultTextColor { color } => match parse_color(&color) {
                Ok(color) => {
                    self.panel.set_default_text_color(color);
                    self.drain_all_requests()
                }
                Err(e) => vec![failed(format!("Invalid text color {color}: {e}"))],
            },
            PanelCommand::ListFonts => vec![PanelOutput::FontChoices {
                fonts: self.panel.font_choices(&self.env.database),
            }],
            PanelCommand::Save => match self.try_save_notes() {
                Ok(_) => Vec::new(),
                Err(e) => vec![failed(format!("Failed saving notes: {e}"))],
            },
            PanelCommand::Export { path } => match self.try_export_snapshot(&path).await {
                Ok(notes) => vec![PanelOutput::Exported { path, notes }],
                Err(e) => vec![failed(format!("{e}"))],
            },
            PanelCommand::Quit => self.on_quit(),
        }
    }

    /// Stores every note changed since the last save, returns how many were written.
    ///
    /// A note that fails to save stays changed and does not stop the others.
    pub fn try_save_notes(&mut self) -> Result<usize, ServiceError> {
        let mut saved = 0;
        let mut failed = 0;
        for note in self.panel.iter_mut().filter(|note| note.is_changed()) {
            match self.env.database.try_save_note(&note.to_record()) {
                Ok(()) => {
                    note.commit();
                    saved += 1;
                }
                Err(e) => {
                    tracing::warn!(note = %note.id(), "failed saving note: {e}");
                    failed += 1;
                }
            }
        }
        tracing::debug!(saved, failed, "notes saved");
        if failed > 0 {
            return Err(ServiceError::NotSaved { saved, failed });
        }
        Ok(saved)
    }

    /// Writes the live notes as a JSON array, returns how many were written
    pub async fn try_export_snapshot(&self, path: &Path) -> Result<usize, ServiceError> {
        let records: Vec<NoteRecord> = self.panel.iter().map(NoteWindow::to_record).collect();
        let json = serde_json::to_string_pretty(&records)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ServiceError::Io(path.to_path_buf(), e))?;
        }
        tokio::fs::write(path, json)
            .await
            .map_err(|e| ServiceError::Io(path.to_path_buf(), e))?;
        tracing::info!(count = records.len(), path = %path.display(), "notes exported");
        Ok(records.len())
    }

    // private methods

    fn opened(&self, note_id: Uuid) -> Option<PanelOutput> {
        self.panel.get_note(note_id).map(|note| PanelOutput::Opened {
            note: note_id,
            geometry: note.geometry(),
            pinned: note.is_pinned(),
        })
    }

    fn drain_all_requests(&mut self) -> Vec<PanelOutput> {
        self.panel.iter_mut().flat_map(drain_requests).collect()
    }

    fn on_note_event(&mut self, note_id: Uuid, event: NoteEvent) -> Vec<PanelOutput> {
        let Some(note) = self.panel.get_note_mut(note_id) else {
            return vec![failed(format!("Note {note_id} is not found"))];
        };
        note.handle_event(event, &self.env.ctx());
        drain_requests(note).collect()
    }

    fn on_note_action(&mut self, note_id: Uuid, action: NoteAction) -> Vec<PanelOutput> {
        let Some(note) = self.panel.get_note_mut(note_id) else {
            return vec![failed(format!("Note {note_id} is not found"))];
        };
        note.perform(action, &self.env.ctx());
        drain_requests(note).collect()
    }

    fn on_close_note(&mut self, note_id: Uuid) -> Vec<PanelOutput> {
        let Some(mut note) = self.panel.close_note(note_id, &self.env.ctx()) else {
            tracing::debug!(note = %note_id, "note is already closed");
            return Vec::new();
        };
        match self.env.database.try_delete_note(note_id) {
            Ok(()) => tracing::debug!(note = %note_id, "stored note deleted"),
            // never saved
            Err(NotesStoreError::NoteNotFound(_)) => {}
            Err(e) => tracing::warn!(note = %note_id, "failed deleting stored note: {e}"),
        }
        drain_requests(&mut note).collect()
    }

    fn on_quit(&mut self) -> Vec<PanelOutput> {
        if let Err(e) = self.try_save_notes() {
            tracing::error!("failed saving notes on quit: {e}");
        }
        self.is_running = false;
        self.panel
            .shutdown(&self.env.ctx())
            .iter_mut()
            .flat_map(drain_requests)
            .collect()
    }
}

#[cfg(test)]
fn test_service() -> (tempfile::TempDir, ServiceModel) {
    let dir = tempfile::tempdir().expect("temp dir must be created");
    let config = Config {
        database: dir.path().join("notes.sqlite"),
        ..Config::default()
    };
    let service = ServiceModel::try_new(config).expect("service must start");
    (dir, service)
}

#[cfg(test)]
fn opened_note(outputs: &[PanelOutput]) -> Uuid {
    outputs
        .iter()
        .find_map(|output| match output {
            PanelOutput::Opened { note, .. } => Some(*note),
            _ => None,
        })
        .expect("a note must be opened")
}

#[tokio::test]
async fn unknown_note_is_reported() {
    let (_dir, mut service) = test_service();
    let outputs = service
        .update(PanelCommand::Event {
            note: Uuid::new_v4(),
            event: NoteEvent::HoverEntered,
        })
        .await;
    assert!(matches!(outputs.as_slice(), [PanelOutput::Failed { .. }]));
}

#[tokio::test]
async fn closing_note_deletes_its_record() {
    let (_dir, mut service) = test_service();
    let note = opened_note(&service.update(PanelCommand::NewNote).await);
    assert!(service.update(PanelCommand::Save).await.is_empty());
    assert_eq!(service.env.database.try_list_notes().expect("list").len(), 1);

    let close = PanelCommand::Action {
        note,
        action: NoteAction::Close,
    };
    let outputs = service.update(close.clone()).await;
    assert!(outputs.contains(&PanelOutput::Request {
        note,
        request: crate::notes::WindowRequest::Close,
    }));
    assert!(service.env.database.try_list_notes().expect("list").is_empty());
    // second close is a no-op
    assert!(service.update(close).await.is_empty());
}

#[tokio::test]
async fn invalid_default_color_is_reported() {
    let (_dir, mut service) = test_service();
    let outputs = service
        .update(PanelCommand::SetDefaultBackground {
            color: "yellowish".to_string(),
        })
        .await;
    assert!(matches!(outputs.as_slice(), [PanelOutput::Failed { .. }]));
    assert_eq!(
        service.panel().style().background,
        crate::notes::NoteStyle::default().background
    );
}

#[tokio::test]
async fn failed_saves_do_not_stop_the_others() {
    let (dir, mut service) = test_service();
    let first = opened_note(&service.update(PanelCommand::NewNote).await);
    let second = opened_note(&service.update(PanelCommand::NewNote).await);

    // the store can no longer be opened
    let database = dir.path().join("notes.sqlite");
    std::fs::remove_file(&database).expect("database must be removed");
    std::fs::create_dir(&database).expect("directory must be created");

    assert!(matches!(
        service.try_save_notes(),
        Err(ServiceError::NotSaved {
            saved: 0,
            failed: 2
        })
    ));
    for note in [first, second] {
        assert!(service.panel().get_note(note).expect("note must exist").is_changed());
    }
    let outputs = service.update(PanelCommand::Save).await;
    assert!(matches!(outputs.as_slice(), [PanelOutput::Failed { .. }]));
}
