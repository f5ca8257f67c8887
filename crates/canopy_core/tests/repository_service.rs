//! Service facade entry points over a constructed repository.

use canopy_core::{
    create_repository, Entity, RepositoryConfig, RepositoryError, RepositoryService,
};

fn service() -> RepositoryService {
    let repository = create_repository(&RepositoryConfig::database_in_memory()).unwrap();
    RepositoryService::new(repository)
}

#[test]
fn write_read_list_round_trip() {
    let service = service();

    service.write("/notes/today.md", b"# today", "guest1").unwrap();
    service.write("/notes/later.md", b"# later", "guest1").unwrap();

    assert_eq!(service.read("/notes/today.md").unwrap(), b"# today");
    assert_eq!(service.list("/notes").unwrap(), ["later.md", "today.md"]);

    let info = service.metadata("/notes/today.md").unwrap();
    assert_eq!(info.modified_by, "guest1");
    assert_eq!(info.size, b"# today".len() as u64);
}

#[test]
fn resolve_distinguishes_kinds() {
    let service = service();
    service.write("/k/doc.txt", b"doc", "guest1").unwrap();

    assert!(matches!(
        service.resolve("/k").unwrap(),
        Some(Entity::Collection(_))
    ));
    assert!(matches!(
        service.resolve("/k/doc.txt").unwrap(),
        Some(Entity::Resource(_))
    ));
    assert!(service.resolve("/nowhere").unwrap().is_none());
}

#[test]
fn remove_works_for_both_kinds_and_reports_missing() {
    let service = service();
    service.write("/trash/a.txt", b"a", "guest1").unwrap();

    service.remove("/trash/a.txt").unwrap();
    service.remove("/trash").unwrap();

    let err = service.remove("/trash").unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[test]
fn metadata_of_missing_entity_is_not_found() {
    let service = service();
    let err = service.metadata("/absent").unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}
