use floating_notes::{
    app::{PanelCommand, PanelOutput, ServiceModel},
    config::Config,
    notes::{NoteAction, NoteEvent, WindowRequest},
    store::NoteRecord,
};
use uuid::Uuid;

fn config_in(dir: &tempfile::TempDir) -> Config {
    Config {
        database: dir.path().join("notes.sqlite"),
        ..Config::default()
    }
}

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
async fn notes_survive_a_restart() {
    let dir = tempfile::tempdir().expect("temp dir must be created");

    let mut service = ServiceModel::try_new(config_in(&dir)).expect("service must start");
    assert!(service.restore_notes().is_empty());

    let note = opened_note(&service.update(PanelCommand::NewNote).await);
    let outputs = service
        .update(PanelCommand::Event {
            note,
            event: NoteEvent::TextChanged("Hello".to_string()),
        })
        .await;
    assert!(outputs.contains(&PanelOutput::Request {
        note,
        request: WindowRequest::Redraw,
    }));

    let outputs = service
        .update(PanelCommand::Action {
            note,
            action: NoteAction::TogglePin,
        })
        .await;
    assert_eq!(
        outputs,
        vec![PanelOutput::Request {
            note,
            request: WindowRequest::SetAlwaysOnTop(true),
        }]
    );

    service
        .update(PanelCommand::Action {
            note,
            action: NoteAction::SelectFont("Courier New".to_string()),
        })
        .await;
    let outputs = service.update(PanelCommand::ListFonts).await;
    let [PanelOutput::FontChoices { fonts }] = outputs.as_slice() else {
        panic!("font choices expected, got {outputs:?}");
    };
    assert_eq!(fonts.first().map(String::as_str), Some("Courier New"));

    assert!(service.update(PanelCommand::Save).await.is_empty());

    let outputs = service.update(PanelCommand::Quit).await;
    assert!(outputs.contains(&PanelOutput::Request {
        note,
        request: WindowRequest::Close,
    }));
    assert!(!service.is_running());
    assert!(service.panel().is_empty());

    // quitting keeps the stored notes
    let mut service = ServiceModel::try_new(config_in(&dir)).expect("service must restart");
    let outputs = service.restore_notes();
    assert!(matches!(
        outputs.as_slice(),
        [PanelOutput::Opened { note: restored, pinned: true, .. }] if *restored == note
    ));
    let restored = service.panel().get_note(note).expect("note must be restored");
    assert_eq!(restored.get_content(), "Hello");
    assert_eq!(restored.font().family, "Courier New");
}

#[tokio::test]
async fn snapshot_holds_live_notes() {
    let dir = tempfile::tempdir().expect("temp dir must be created");
    let mut service = ServiceModel::try_new(config_in(&dir)).expect("service must start");
    let first = opened_note(&service.update(PanelCommand::NewNote).await);
    let second = opened_note(&service.update(PanelCommand::NewNote).await);
    service
        .update(PanelCommand::Event {
            note: second,
            event: NoteEvent::TextChanged("second note".to_string()),
        })
        .await;
    service
        .update(PanelCommand::Action {
            note: first,
            action: NoteAction::Close,
        })
        .await;

    let path = dir.path().join("export").join("snapshot.json");
    let outputs = service
        .update(PanelCommand::Export { path: path.clone() })
        .await;
    assert_eq!(
        outputs,
        vec![PanelOutput::Exported {
            path: path.clone(),
            notes: 1,
        }]
    );

    let json = tokio::fs::read_to_string(&path)
        .await
        .expect("snapshot must be written");
    let records: Vec<NoteRecord> = serde_json::from_str(&json).expect("snapshot must parse");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, second);
    assert_eq!(records[0].content, "second note");
}

#[tokio::test]
async fn default_style_reaches_every_note() {
    let dir = tempfile::tempdir().expect("temp dir must be created");
    let mut service = ServiceModel::try_new(config_in(&dir)).expect("service must start");
    let notes = [
        opened_note(&service.update(PanelCommand::NewNote).await),
        opened_note(&service.update(PanelCommand::NewNote).await),
    ];

    let outputs = service
        .update(PanelCommand::SetDefaultBackground {
            color: "#87CEEB".to_string(),
        })
        .await;
    for note in notes {
        assert!(outputs.contains(&PanelOutput::Request {
            note,
            request: WindowRequest::Redraw,
        }));
        let window = service.panel().get_note(note).expect("note must be live");
        assert_eq!(
            window.to_record().background_color,
            "#87CEEB",
            "background of {note}"
        );
    }
}
