use papergraph_core::{
    AssociationMutator, CoreError, EntityService, ErrorKind, NewNote, NewPaper, Store, TagService,
};
use rusqlite::params;
use uuid::Uuid;

#[test]
fn duplicate_tag_name_is_conflict() {
    let store = Store::open_in_memory().unwrap();
    let tags = TagService::new(&store);

    tags.create_tag("ml").unwrap();
    let err = tags.create_tag("ml").unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    let err = tags.create_tag("  ml ").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(tags.list_tags().unwrap().len(), 1);
}

#[test]
fn tag_names_differing_only_in_case_coexist() {
    let store = Store::open_in_memory().unwrap();
    let tags = TagService::new(&store);

    let lower = tags.create_tag("ml").unwrap();
    let upper = tags.create_tag("ML").unwrap();
    assert_ne!(lower.id, upper.id);
    assert_eq!(upper.name, "ML");

    let names: Vec<String> = tags.list_tags().unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"ml".to_string()));
    assert!(names.contains(&"ML".to_string()));
    assert_eq!(
        tags.create_tag(" ML").unwrap_err().kind(),
        ErrorKind::Conflict
    );
}

#[test]
fn tag_names_are_normalized_and_bounded() {
    let store = Store::open_in_memory().unwrap();
    let tags = TagService::new(&store);

    let tag = tags.create_tag("  deep \t learning ").unwrap();
    assert_eq!(tag.name, "deep \t learning");

    assert_eq!(
        tags.create_tag("   ").unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        tags.create_tag(&"x".repeat(51)).unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert!(tags.create_tag(&"y".repeat(50)).is_ok());
}

#[test]
fn rename_keeps_uniqueness() {
    let store = Store::open_in_memory().unwrap();
    let tags = TagService::new(&store);
    let ml = tags.create_tag("ml").unwrap();
    tags.create_tag("nlp").unwrap();

    let renamed = tags.rename_tag(ml.id, "Machine Learning").unwrap();
    assert_eq!(renamed.id, ml.id);
    assert_eq!(renamed.name, "Machine Learning");

    assert_eq!(
        tags.rename_tag(ml.id, " nlp ").unwrap_err().kind(),
        ErrorKind::Conflict
    );
    assert_eq!(tags.rename_tag(ml.id, "NLP").unwrap().name, "NLP");
    assert_eq!(
        tags.rename_tag(Uuid::new_v4(), "other").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn delete_tag_detaches_without_touching_entities() {
    let store = Store::open_in_memory().unwrap();
    let tags = TagService::new(&store);
    let entities = EntityService::new(&store);
    let tag = tags.create_tag("ml").unwrap();
    let paper = entities
        .create_paper(NewPaper {
            tag_ids: vec![tag.id],
            ..NewPaper::new("p", "https://example.org")
        })
        .unwrap();

    tags.delete_tag(tag.id).unwrap();

    let detail = entities.get_entity(paper.id).unwrap();
    assert!(detail.tags.is_empty());
    assert_eq!(tags.get_tag(tag.id).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(tags.delete_tag(tag.id).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn list_and_search_order_by_name() {
    let store = Store::open_in_memory().unwrap();
    let tags = TagService::new(&store);
    for name in ["beta", "Alpha", "gamma", "alphabet"] {
        tags.create_tag(name).unwrap();
    }

    let names: Vec<String> = tags.list_tags().unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["Alpha", "alphabet", "beta", "gamma"]);

    let found: Vec<String> = tags
        .search_tags("ALPHA")
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(found, vec!["Alpha", "alphabet"]);
    assert!(tags.search_tags("  ").unwrap().is_empty());
    assert!(tags.search_tags("%").unwrap().is_empty());
}

#[test]
fn stats_and_documents_report_tag_usage() {
    let store = Store::open_in_memory().unwrap();
    let tags = TagService::new(&store);
    let entities = EntityService::new(&store);
    let tag = tags.create_tag("ml").unwrap();

    let first = entities
        .create_paper(NewPaper {
            tag_ids: vec![tag.id],
            ..NewPaper::new("first", "https://example.org/1")
        })
        .unwrap();
    let second = entities
        .create_paper(NewPaper {
            tag_ids: vec![tag.id],
            ..NewPaper::new("second", "https://example.org/2")
        })
        .unwrap();
    let note = entities
        .create_note(NewNote {
            tag_ids: vec![tag.id],
            ..NewNote::new("n")
        })
        .unwrap();
    store
        .lock()
        .execute(
            "UPDATE papers SET updated_at = ?2 WHERE id = ?1;",
            params![first.id.to_string(), i64::MAX / 2],
        )
        .unwrap();

    let stats = tags.tag_stats(tag.id).unwrap();
    assert_eq!(stats.paper_count, 2);
    assert_eq!(stats.note_count, 1);

    let docs = tags.tag_documents(tag.id).unwrap();
    let papers: Vec<Uuid> = docs.papers.iter().map(|p| p.id).collect();
    assert_eq!(papers, vec![first.id, second.id]);
    assert_eq!(docs.notes.len(), 1);
    assert_eq!(docs.notes[0].id, note.id);

    assert_eq!(
        tags.tag_stats(Uuid::new_v4()).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn create_tag_for_attaches_or_rolls_back() {
    let store = Store::open_in_memory().unwrap();
    let tags = TagService::new(&store);
    let note = EntityService::new(&store)
        .create_note(NewNote::new("n"))
        .unwrap();

    let tag = tags.create_tag_for("inline", note.id).unwrap();
    let current = AssociationMutator::new(&store)
        .current(note.id, papergraph_core::AssociationKind::Tags)
        .unwrap();
    assert!(current.contains(&tag.id));

    let err = tags.create_tag_for("ghost", Uuid::new_v4()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(tags.search_tags("ghost").unwrap().is_empty());
}
