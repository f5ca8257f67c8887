//! Behavior shared by every storage backend.

use canopy_core::{
    create_repository, ActorContext, Repository, RepositoryConfig, RepositoryError,
};
use std::thread::sleep;
use std::time::Duration;

/// Runs one check against a local-backend and a database-backend
/// repository, so contract behavior stays identical across substrates.
fn with_backends(check: impl Fn(&str, &Repository)) {
    let root = tempfile::tempdir().expect("temp dir should be creatable");
    let local = create_repository(&RepositoryConfig::local(root.path()))
        .expect("local repository should construct");
    check("local", &local);

    let database = create_repository(&RepositoryConfig::database_in_memory())
        .expect("database repository should construct");
    check("database", &database);
}

#[test]
fn create_and_read_round_trip() {
    with_backends(|label, repository| {
        let ctx = ActorContext::new("guest1");
        let resource = repository.resource("/docs/readme.txt").unwrap();
        resource.create(&ctx, b"hello repository").unwrap();

        assert!(resource.exists().unwrap(), "{label}: resource should exist");
        assert_eq!(resource.content().unwrap(), b"hello repository");
        assert!(!resource.is_binary().unwrap(), "{label}: text content");

        let info = resource.information().unwrap();
        assert_eq!(info.name, "readme.txt");
        assert_eq!(info.path, "/docs/readme.txt");
        assert_eq!(info.size, b"hello repository".len() as u64);
    });
}

#[test]
fn content_buffers_are_defensively_copied() {
    with_backends(|label, repository| {
        let ctx = ActorContext::new("guest1");
        let resource = repository.resource("/copy/data.bin").unwrap();
        resource.create(&ctx, &[1, 2, 3, 4]).unwrap();

        let mut first = resource.content().unwrap();
        first[0] = 99;
        first.push(100);

        assert_eq!(
            resource.content().unwrap(),
            vec![1, 2, 3, 4],
            "{label}: caller mutation must not reach stored state"
        );
    });
}

#[test]
fn write_refreshes_modified_and_preserves_created() {
    with_backends(|label, repository| {
        let guest1 = ActorContext::new("guest1");
        let resource = repository.resource("/c/toBeModified.txt").unwrap();
        resource.create(&guest1, b"Some content").unwrap();

        let first = resource.information().unwrap();
        assert_eq!(first.modified_by, "guest1", "{label}");
        assert_eq!(first.created_by, "guest1", "{label}");
        assert!(first.modified_at >= first.created_at, "{label}");

        // Millisecond timestamps; make sure the clock moves.
        sleep(Duration::from_millis(10));

        let guest2 = ActorContext::new("guest2");
        let reopened = repository.resource("/c/toBeModified.txt").unwrap();
        reopened
            .set_content(&guest2, b"Some modified content")
            .unwrap();

        let second = reopened.information().unwrap();
        assert_eq!(second.modified_by, "guest2", "{label}");
        assert!(
            second.modified_at > first.modified_at,
            "{label}: modified_at must advance"
        );
        assert_eq!(second.created_by, "guest1", "{label}: created_by is immutable");
        assert_eq!(second.created_at, first.created_at, "{label}: created_at is immutable");
        assert_eq!(reopened.content().unwrap(), b"Some modified content");
    });
}

#[test]
fn set_content_creates_missing_resource_and_parents() {
    with_backends(|label, repository| {
        let ctx = ActorContext::new("guest1");
        let resource = repository.resource("/deep/nested/file.txt").unwrap();
        resource.set_content(&ctx, b"made by set_content").unwrap();

        assert!(resource.exists().unwrap(), "{label}");
        let parent = repository.collection("/deep/nested").unwrap();
        assert!(parent.exists().unwrap(), "{label}: parents created implicitly");
        assert_eq!(parent.children().unwrap(), vec!["file.txt".to_string()]);
    });
}

#[test]
fn create_is_exclusive() {
    with_backends(|label, repository| {
        let ctx = ActorContext::new("guest1");
        let resource = repository.resource("/x/once.txt").unwrap();
        resource.create(&ctx, b"first").unwrap();

        let err = resource.create(&ctx, b"second").unwrap_err();
        assert!(
            matches!(err, RepositoryError::Conflict(_)),
            "{label}: got {err}"
        );
        assert_eq!(resource.content().unwrap(), b"first");
    });
}

#[test]
fn folder_and_document_are_mutually_exclusive() {
    with_backends(|label, repository| {
        let ctx = ActorContext::new("guest1");
        repository
            .collection("/shape/folder")
            .unwrap()
            .create(&ctx)
            .unwrap();
        repository
            .resource("/shape/doc.txt")
            .unwrap()
            .create(&ctx, b"doc")
            .unwrap();

        assert!(
            !repository.resource("/shape/folder").unwrap().exists().unwrap(),
            "{label}: folder path is not a resource"
        );
        assert!(
            !repository.collection("/shape/doc.txt").unwrap().exists().unwrap(),
            "{label}: document path is not a collection"
        );

        let err = repository
            .resource("/shape/folder")
            .unwrap()
            .information()
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)), "{label}");
    });
}

#[test]
fn children_are_listed_sorted_by_name() {
    with_backends(|label, repository| {
        let ctx = ActorContext::new("guest1");
        repository
            .resource("/p/b.txt")
            .unwrap()
            .create(&ctx, b"b")
            .unwrap();
        repository
            .resource("/p/a.txt")
            .unwrap()
            .create(&ctx, b"a")
            .unwrap();
        repository.collection("/p/c").unwrap().create(&ctx).unwrap();

        let names = repository.collection("/p").unwrap().children().unwrap();
        assert_eq!(names, ["a.txt", "b.txt", "c"], "{label}");
    });
}

#[test]
fn removing_collection_removes_all_descendants() {
    with_backends(|label, repository| {
        let ctx = ActorContext::new("guest1");
        repository
            .resource("/a/b/c.txt")
            .unwrap()
            .create(&ctx, b"leaf")
            .unwrap();

        repository.collection("/a").unwrap().remove().unwrap();

        assert!(!repository.resource("/a/b/c.txt").unwrap().exists().unwrap(), "{label}");
        assert!(!repository.collection("/a/b").unwrap().exists().unwrap(), "{label}");
        assert!(!repository.collection("/a").unwrap().exists().unwrap(), "{label}");
    });
}

#[test]
fn removing_missing_entity_is_not_found() {
    with_backends(|label, repository| {
        let err = repository
            .resource("/ghost.txt")
            .unwrap()
            .remove()
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)), "{label}");
    });
}

#[test]
fn rename_to_occupied_destination_is_conflict_and_harmless() {
    with_backends(|label, repository| {
        let ctx = ActorContext::new("guest1");
        let source = repository.resource("/r/source.txt").unwrap();
        let destination = repository.resource("/r/destination.txt").unwrap();
        source.create(&ctx, b"source bytes").unwrap();
        destination.create(&ctx, b"destination bytes").unwrap();

        let err = source.rename(&ctx, "/r/destination.txt").unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)), "{label}");

        assert_eq!(source.content().unwrap(), b"source bytes", "{label}");
        assert_eq!(
            destination.content().unwrap(),
            b"destination bytes",
            "{label}"
        );
    });
}

#[test]
fn rename_moves_a_whole_subtree() {
    with_backends(|label, repository| {
        let ctx = ActorContext::new("guest1");
        repository
            .resource("/m/sub/file.txt")
            .unwrap()
            .create(&ctx, b"payload")
            .unwrap();

        let renamed = repository
            .collection("/m")
            .unwrap()
            .rename(&ctx, "/n")
            .unwrap();

        assert!(renamed.exists().unwrap(), "{label}");
        assert_eq!(
            repository
                .resource("/n/sub/file.txt")
                .unwrap()
                .content()
                .unwrap(),
            b"payload",
            "{label}"
        );
        assert!(!repository.collection("/m").unwrap().exists().unwrap(), "{label}");
    });
}

#[test]
fn copy_duplicates_without_aliasing() {
    with_backends(|label, repository| {
        let guest1 = ActorContext::new("guest1");
        let source = repository.resource("/orig/file.txt").unwrap();
        source.create(&guest1, b"original").unwrap();

        let guest2 = ActorContext::new("guest2");
        let copy = source.copy(&guest2, "/dup/file.txt").unwrap();
        assert_eq!(copy.content().unwrap(), b"original", "{label}");
        assert_eq!(copy.information().unwrap().created_by, "guest2", "{label}");

        copy.set_content(&guest2, b"diverged").unwrap();
        assert_eq!(source.content().unwrap(), b"original", "{label}");

        let err = source.copy(&guest2, "/dup/file.txt").unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)), "{label}");
    });
}

#[test]
fn empty_content_round_trips() {
    with_backends(|label, repository| {
        let ctx = ActorContext::new("guest1");
        let resource = repository.resource("/empty.txt").unwrap();
        resource.set_content(&ctx, b"").unwrap();
        assert_eq!(resource.content().unwrap(), Vec::<u8>::new(), "{label}");
    });
}

#[test]
fn malformed_paths_are_rejected() {
    with_backends(|label, repository| {
        let err = repository.resource("/../escape.txt").unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidPath(_)), "{label}");
    });
}

#[test]
fn resolve_reports_entity_kind() {
    with_backends(|label, repository| {
        let ctx = ActorContext::new("guest1");
        repository
            .resource("/k/doc.txt")
            .unwrap()
            .create(&ctx, b"doc")
            .unwrap();

        assert!(matches!(
            repository.resolve("/k").unwrap(),
            Some(canopy_core::Entity::Collection(_))
        ), "{label}");
        assert!(matches!(
            repository.resolve("/k/doc.txt").unwrap(),
            Some(canopy_core::Entity::Resource(_))
        ), "{label}");
        assert!(repository.resolve("/k/missing").unwrap().is_none(), "{label}");
    });
}
