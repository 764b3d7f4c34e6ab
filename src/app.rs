// SPDX-License-Identifier: MPL-2.0

use crate::notes::{FontSpec, NoteAction, NoteEvent, Rect, WindowRequest};
use std::path::PathBuf;
use uuid::Uuid;

pub use service::{ServiceError, ServiceModel};

mod service;

/// Commands accepted by the service, one JSON object per line.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PanelCommand {
    NewNote,
    // input delivered to one note window
    Event { note: Uuid, event: NoteEvent },
    // toolbar or menu command of one note
    Action { note: Uuid, action: NoteAction },
    SetDefaultFont { font: FontSpec },
    SetDefaultBackground { color: String },
    SetDefaultTextColor { color: String },
    ListFonts,
    Save,
    Export { path: PathBuf },
    Quit,
}

/// What the toolkit has to do after a command.
#[derive(serde::Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "output", rename_all = "snake_case")]
pub enum PanelOutput {
    // a note window has to be created
    Opened {
        note: Uuid,
        geometry: Rect,
        pinned: bool,
    },
    Request {
        note: Uuid,
        request: WindowRequest,
    },
    FontChoices {
        fonts: Vec<String>,
    },
    Exported {
        path: PathBuf,
        notes: usize,
    },
    Failed {
        message: String,
    },
}

#[test]
fn commands_read_from_json_lines() {
    let command: PanelCommand =
        serde_json::from_str(r#"{"command":"new_note"}"#).expect("valid command");
    assert_eq!(command, PanelCommand::NewNote);

    let note = Uuid::new_v4();
    let line = format!(
        r#"{{"command":"event","note":"{note}","event":{{"TextChanged":"Hello"}}}}"#
    );
    let command: PanelCommand = serde_json::from_str(&line).expect("valid command");
    assert_eq!(
        command,
        PanelCommand::Event {
            note,
            event: NoteEvent::TextChanged("Hello".to_string()),
        }
    );

    let line = format!(r#"{{"command":"action","note":"{note}","action":"TogglePin"}}"#);
    let command: PanelCommand = serde_json::from_str(&line).expect("valid command");
    assert_eq!(
        command,
        PanelCommand::Action {
            note,
            action: NoteAction::TogglePin,
        }
    );
}

#[test]
fn outputs_are_tagged() {
    let note = Uuid::nil();
    let json = serde_json::to_value(PanelOutput::Request {
        note,
        request: WindowRequest::SetAlwaysOnTop(true),
    })
    .expect("output must serialize");
    assert_eq!(json["output"], "request");
    assert_eq!(json["request"]["SetAlwaysOnTop"], true);
}
