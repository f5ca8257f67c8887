//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `canopy_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use canopy_core::{create_repository, RepositoryConfig, RepositoryService};

fn main() {
    println!("canopy_core version={}", canopy_core::core_version());

    let repository = match create_repository(&RepositoryConfig::database_in_memory()) {
        Ok(repository) => repository,
        Err(err) => {
            eprintln!("repository bootstrap failed: {err}");
            std::process::exit(1);
        }
    };

    let service = RepositoryService::new(repository);
    let probe = service
        .write("/probe/hello.txt", b"hello", "cli")
        .and_then(|()| service.read("/probe/hello.txt"));
    match probe {
        Ok(content) => println!("canopy_core probe bytes={}", content.len()),
        Err(err) => {
            eprintln!("repository probe failed: {err}");
            std::process::exit(1);
        }
    }
}
