use papergraph_core::{
    AssociationChange, AssociationKind, AssociationMutator, EntityService, ErrorKind, NewNote,
    NewPaper, Store, TagService,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

fn seed_paper(store: &Store, name: &str) -> Uuid {
    EntityService::new(store)
        .create_paper(NewPaper::new(name, "https://example.org"))
        .unwrap()
        .id
}

fn tag_ids(store: &Store, names: &[&str]) -> Vec<Uuid> {
    let tags = TagService::new(store);
    names
        .iter()
        .map(|name| tags.create_tag(name).unwrap().id)
        .collect()
}

fn count_rows(store: &Store, table: &str) -> i64 {
    store
        .lock()
        .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
            row.get(0)
        })
        .unwrap()
}

#[test]
fn apply_associations_adds_and_removes() {
    let store = Store::open_in_memory().unwrap();
    let paper = seed_paper(&store, "p");
    let tags = tag_ids(&store, &["a", "b", "c"]);
    let mutator = AssociationMutator::new(&store);

    let change = mutator
        .apply_associations(paper, AssociationKind::Tags, [tags[0], tags[1]], [])
        .unwrap();
    assert_eq!(change, AssociationChange { added: 2, removed: 0 });

    let change = mutator
        .apply_associations(paper, AssociationKind::Tags, [tags[2]], [tags[0]])
        .unwrap();
    assert_eq!(change, AssociationChange { added: 1, removed: 1 });

    let current = mutator.current(paper, AssociationKind::Tags).unwrap();
    assert_eq!(current, BTreeSet::from([tags[1], tags[2]]));
}

#[test]
fn duplicate_ids_in_request_collapse() {
    let store = Store::open_in_memory().unwrap();
    let paper = seed_paper(&store, "p");
    let tags = tag_ids(&store, &["a"]);

    let change = AssociationMutator::new(&store)
        .apply_associations(paper, AssociationKind::Tags, [tags[0], tags[0]], [])
        .unwrap();
    assert_eq!(change.added, 1);
    assert_eq!(count_rows(&store, "paper_tags"), 1);
}

#[test]
fn overlapping_add_and_remove_is_rejected() {
    let store = Store::open_in_memory().unwrap();
    let paper = seed_paper(&store, "p");
    let tags = tag_ids(&store, &["a"]);

    let err = AssociationMutator::new(&store)
        .apply_associations(paper, AssociationKind::Tags, [tags[0]], [tags[0]])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn adding_existing_pair_is_conflict_and_rolls_back() {
    let store = Store::open_in_memory().unwrap();
    let paper = seed_paper(&store, "p");
    let tags = tag_ids(&store, &["a", "b"]);
    let mutator = AssociationMutator::new(&store);
    mutator
        .apply_associations(paper, AssociationKind::Tags, [tags[0]], [])
        .unwrap();

    let err = mutator
        .apply_associations(paper, AssociationKind::Tags, [tags[0], tags[1]], [])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(
        mutator.current(paper, AssociationKind::Tags).unwrap(),
        BTreeSet::from([tags[0]])
    );
}

#[test]
fn missing_target_rolls_back_whole_mutation() {
    let store = Store::open_in_memory().unwrap();
    let paper = seed_paper(&store, "p");
    let tags = tag_ids(&store, &["a", "b"]);
    let mutator = AssociationMutator::new(&store);
    mutator
        .apply_associations(paper, AssociationKind::Tags, [tags[0]], [])
        .unwrap();

    let err = mutator
        .apply_associations(
            paper,
            AssociationKind::Tags,
            [tags[1], Uuid::new_v4()],
            [tags[0]],
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(
        mutator.current(paper, AssociationKind::Tags).unwrap(),
        BTreeSet::from([tags[0]])
    );
}

#[test]
fn unknown_entity_is_not_found() {
    let store = Store::open_in_memory().unwrap();
    let tags = tag_ids(&store, &["a"]);
    let err = AssociationMutator::new(&store)
        .set_desired_tags(Uuid::new_v4(), tags)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn set_desired_tags_is_idempotent() {
    let store = Store::open_in_memory().unwrap();
    let paper = seed_paper(&store, "p");
    let tags = tag_ids(&store, &["a", "b", "c"]);
    let mutator = AssociationMutator::new(&store);

    let first = mutator
        .set_desired_tags(paper, [tags[0], tags[1]])
        .unwrap();
    assert_eq!(first, AssociationChange { added: 2, removed: 0 });

    let repeat = mutator
        .set_desired_tags(paper, [tags[1], tags[0]])
        .unwrap();
    assert!(repeat.is_noop());

    let swap = mutator
        .set_desired_tags(paper, [tags[1], tags[2]])
        .unwrap();
    assert_eq!(swap, AssociationChange { added: 1, removed: 1 });

    let clear = mutator.set_desired_tags(paper, []).unwrap();
    assert_eq!(clear.removed, 2);
    assert_eq!(count_rows(&store, "paper_tags"), 0);
}

#[test]
fn peer_links_are_shared_between_paper_and_note_views() {
    let store = Store::open_in_memory().unwrap();
    let paper = seed_paper(&store, "p");
    let note = EntityService::new(&store)
        .create_note(NewNote::new("n"))
        .unwrap()
        .id;
    let mutator = AssociationMutator::new(&store);

    mutator
        .set_desired_associations(paper, AssociationKind::Peers, [note])
        .unwrap();
    assert_eq!(
        mutator.current(note, AssociationKind::Peers).unwrap(),
        BTreeSet::from([paper])
    );

    let err = mutator
        .set_desired_associations(note, AssociationKind::Peers, [note])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    mutator
        .set_desired_associations(note, AssociationKind::Peers, [])
        .unwrap();
    assert!(mutator.current(paper, AssociationKind::Peers).unwrap().is_empty());
}

#[test]
fn concurrent_set_desired_tags_settles_on_one_request() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let paper = seed_paper(&store, "p");
    let ids = tag_ids(&store, &["a", "b", "c", "d", "e"]);
    let first: BTreeSet<Uuid> = [ids[0], ids[1], ids[2]].into_iter().collect();
    let second: BTreeSet<Uuid> = [ids[2], ids[3], ids[4]].into_iter().collect();

    let workers: Vec<_> = [first.clone(), second.clone()]
        .into_iter()
        .map(|desired| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mutator = AssociationMutator::new(&store);
                for _ in 0..50 {
                    mutator.set_desired_tags(paper, desired.clone()).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let current = AssociationMutator::new(&store)
        .current(paper, AssociationKind::Tags)
        .unwrap();
    assert!(current == first || current == second, "mixed tag set: {current:?}");
    assert_eq!(count_rows(&store, "paper_tags"), current.len() as i64);

    let (orphans, distinct): (i64, i64) = store
        .lock()
        .query_row(
            "SELECT
                (SELECT COUNT(*) FROM paper_tags
                 WHERE tag_id NOT IN (SELECT id FROM tags)
                    OR paper_id NOT IN (SELECT id FROM papers)),
                (SELECT COUNT(DISTINCT paper_id || ':' || tag_id) FROM paper_tags);",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(orphans, 0);
    assert_eq!(distinct, current.len() as i64);
}
