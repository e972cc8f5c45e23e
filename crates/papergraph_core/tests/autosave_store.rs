use papergraph_core::{content_autosave, EntityService, NewNote, Store};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn closing_autosave_persists_latest_content() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let note = EntityService::new(&store)
        .create_note(NewNote::new("draft"))
        .unwrap();

    let autosave = content_autosave(Arc::clone(&store), note.id, Duration::from_secs(30)).unwrap();
    for text in ["h", "he", "hel", "hello"] {
        assert!(autosave.edit(text.to_string()));
    }
    autosave.close();

    let detail = EntityService::new(&store).get_entity(note.id).unwrap();
    assert_eq!(detail.entity.body(), Some("hello"));
}

#[test]
fn autosave_for_deleted_note_does_not_panic() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let service = EntityService::new(&store);
    let note = service.create_note(NewNote::new("gone")).unwrap();
    service.delete_entity(note.id).unwrap();

    let autosave = content_autosave(Arc::clone(&store), note.id, Duration::from_millis(10)).unwrap();
    autosave.edit("late edit".to_string());
    autosave.close();
}
