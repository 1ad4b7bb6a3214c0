use super::*;

use std::io::Write;

use sea_orm::{ConnectOptions, Database, PaginatorTrait};
use tempfile::{NamedTempFile, TempDir};
use tokio_test::{assert_err, assert_ok};

use crate::binary::{create_binary, try_update_binary, update_binary, NewBinary};
use crate::grouping::{find_or_create_repo, GroupingKey};
use chacra::api::v1::binary::BinaryFields;
use chacra::checksum::Checksum;
use chacra::error::ChacraError;
use entity::repo;
use migration::{Migrator, MigratorTrait};

async fn setup_database() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let database = Database::connect(options).await.unwrap();
    Migrator::up(&database, None).await.unwrap();
    database
}

/// Opens a database file shared by several pooled connections.
async fn setup_shared_database(dir: &TempDir) -> DatabaseConnection {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("chacra.db").display());

    let mut options = ConnectOptions::new(url);
    options.max_connections(8).sqlx_logging(false);

    let database = Database::connect(options).await.unwrap();
    Migrator::up(&database, None).await.unwrap();
    database
}

fn artifact(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file
}

fn ubuntu_fields() -> BinaryFields {
    BinaryFields {
        distro: Some("ubuntu".to_string()),
        distro_version: Some("20.04".to_string()),
        arch: Some("amd64".to_string()),
        ..Default::default()
    }
}

fn with_path(file: &NamedTempFile) -> BinaryFields {
    BinaryFields {
        path: Some(file.path().to_str().unwrap().to_owned()),
        ..ubuntu_fields()
    }
}

async fn count_repos(database: &DatabaseConnection) -> u64 {
    Repo::find().count(database).await.unwrap()
}

async fn count_binaries(database: &DatabaseConnection) -> u64 {
    Binary::find().count(database).await.unwrap()
}

#[tokio::test]
async fn test_create_binary() {
    let database = setup_database().await;
    let project = database.find_or_create_project("ceph").await.unwrap();
    let file = artifact(b"hello");

    let binary = create_binary(
        &database,
        NewBinary::new("ceph.deb", &project, with_path(&file)),
    )
    .await
    .unwrap();

    assert_eq!("ceph.deb", binary.name);
    assert_eq!(project.id, binary.project_id);
    assert_eq!(binary.created, binary.modified);
    assert!(!binary.signed);
    assert_eq!(0, binary.size);
    assert_eq!(
        Some(Checksum::from_bytes(b"hello").to_hex()),
        binary.checksum
    );

    let repo = database.find_repo(binary.repo_id).await.unwrap();
    assert_eq!(project.id, repo.project_id);
    assert_eq!(None, repo.git_ref());
    assert_eq!("ubuntu", repo.distro);
    assert_eq!("20.04", repo.distro_version);

    assert_eq!(1, count_repos(&database).await);
    assert_eq!(1, count_binaries(&database).await);
}

#[tokio::test]
async fn test_create_binary_without_path() {
    let database = setup_database().await;
    let project = database.find_or_create_project("ceph").await.unwrap();

    let binary = create_binary(
        &database,
        NewBinary::new("ceph.deb", &project, ubuntu_fields()),
    )
    .await
    .unwrap();

    assert_eq!(None, binary.path);
    assert_eq!(None, binary.checksum);
}

#[tokio::test]
async fn test_create_binary_reuses_repo() {
    let database = setup_database().await;
    let project = database.find_or_create_project("ceph").await.unwrap();

    let first = create_binary(
        &database,
        NewBinary::new("ceph.deb", &project, ubuntu_fields()),
    )
    .await
    .unwrap();
    let second = create_binary(
        &database,
        NewBinary::new("ceph-common.deb", &project, ubuntu_fields()),
    )
    .await
    .unwrap();

    assert_eq!(first.repo_id, second.repo_id);
    assert_eq!(1, count_repos(&database).await);
    assert_eq!(2, count_binaries(&database).await);

    let binaries = database.list_binaries_for_repo(first.repo_id).await.unwrap();
    let names: Vec<&str> = binaries.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(vec!["ceph.deb", "ceph-common.deb"], names);
}

#[tokio::test]
async fn test_grouping_keys() {
    let database = setup_database().await;
    let ceph = database.find_or_create_project("ceph").await.unwrap();
    let rgw = database.find_or_create_project("radosgw").await.unwrap();

    let create = |project: ProjectModel, fields: BinaryFields| {
        let database = database.clone();
        async move {
            create_binary(&database, NewBinary::new("pkg.deb", &project, fields))
                .await
                .unwrap()
                .repo_id
        }
    };

    let no_ref = create(ceph.clone(), ubuntu_fields()).await;
    let empty_ref = create(
        ceph.clone(),
        BinaryFields {
            git_ref: Some(String::new()),
            ..ubuntu_fields()
        },
    )
    .await;
    let main_ref = create(
        ceph.clone(),
        BinaryFields {
            git_ref: Some("main".to_string()),
            ..ubuntu_fields()
        },
    )
    .await;
    let other_version = create(
        ceph.clone(),
        BinaryFields {
            distro_version: Some("22.04".to_string()),
            ..ubuntu_fields()
        },
    )
    .await;
    let other_project = create(rgw, ubuntu_fields()).await;

    // an empty ref is the same as no ref
    assert_eq!(no_ref, empty_ref);

    assert_ne!(no_ref, main_ref);
    assert_ne!(no_ref, other_version);
    assert_ne!(no_ref, other_project);
    assert_eq!(4, count_repos(&database).await);

    let main = database.find_repo(main_ref).await.unwrap();
    assert_eq!(Some("main"), main.git_ref());
}

#[tokio::test]
async fn test_find_or_create_repo_is_idempotent() {
    let database = setup_database().await;
    let project = database.find_or_create_project("ceph").await.unwrap();

    let key = GroupingKey {
        project_id: project.id,
        git_ref: "v17.2.0".to_string(),
        distro: "centos".to_string(),
        distro_version: "8".to_string(),
    };

    let first = find_or_create_repo(&database, &key).await.unwrap();
    let second = find_or_create_repo(&database, &key).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(project.id, first.project_id);
    assert_eq!(Some("v17.2.0"), first.git_ref());
    assert_eq!("centos", first.distro);
    assert_eq!("8", first.distro_version);
    assert_eq!(1, count_repos(&database).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creation_single_repo() {
    let dir = tempfile::tempdir().unwrap();
    let database = setup_shared_database(&dir).await;
    let project = database.find_or_create_project("ceph").await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let database = database.clone();
            let new = NewBinary::new(format!("ceph-{}.deb", i), &project, ubuntu_fields());
            tokio::spawn(async move { create_binary(&database, new).await })
        })
        .collect();

    let mut repo_ids = Vec::new();
    for task in tasks {
        match task.await.unwrap() {
            Ok(binary) => repo_ids.push(binary.repo_id),
            Err(e) => assert!(e.is_transient(), "Unexpected error: {}", e),
        }
    }

    assert!(!repo_ids.is_empty());
    assert_eq!(repo_ids.len() as u64, count_binaries(&database).await);

    repo_ids.dedup();
    assert_eq!(1, repo_ids.len());
    assert_eq!(1, count_repos(&database).await);
}

#[tokio::test]
async fn test_stale_update_is_not_written() {
    let database = setup_database().await;
    let project = database.find_or_create_project("ceph").await.unwrap();

    let binary = create_binary(
        &database,
        NewBinary::new("ceph.deb", &project, ubuntu_fields()),
    )
    .await
    .unwrap();

    // read by the second writer before the first one commits
    let stale = database.find_binary(binary.id).await.unwrap();

    let first = update_binary(
        &database,
        binary.id,
        BinaryFields {
            built_by: Some("builder-A".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(first.modified > binary.modified);

    let size_only = BinaryFields {
        size: Some(4242),
        ..Default::default()
    };

    let written = assert_ok!(try_update_binary(&database, stale, size_only.clone()).await);
    assert!(written.is_none());

    let stored = database.find_binary(binary.id).await.unwrap();
    assert_eq!(Some("builder-A"), stored.built_by.as_deref());
    assert_eq!(0, stored.size);

    // starting over from the current row keeps both changes
    let second = update_binary(&database, binary.id, size_only).await.unwrap();
    assert_eq!(Some("builder-A"), second.built_by.as_deref());
    assert_eq!(4242, second.size);
    assert!(second.modified > first.modified);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_keep_both_fields() {
    let dir = tempfile::tempdir().unwrap();
    let database = setup_shared_database(&dir).await;
    let project = database.find_or_create_project("ceph").await.unwrap();

    let binary = create_binary(
        &database,
        NewBinary::new("ceph.deb", &project, ubuntu_fields()),
    )
    .await
    .unwrap();

    let spawn_update = |fields: BinaryFields| {
        let database = database.clone();
        let binary_id = binary.id;
        tokio::spawn(async move { update_binary(&database, binary_id, fields).await })
    };

    let built_by = spawn_update(BinaryFields {
        built_by: Some("builder-A".to_string()),
        ..Default::default()
    });
    let size = spawn_update(BinaryFields {
        size: Some(4242),
        ..Default::default()
    });

    let built_by = built_by.await.unwrap();
    let size = size.await.unwrap();

    for result in [&built_by, &size] {
        if let Err(e) = result {
            assert!(e.is_transient(), "Unexpected error: {}", e);
        }
    }

    let stored = database.find_binary(binary.id).await.unwrap();
    if built_by.is_ok() {
        assert_eq!(Some("builder-A"), stored.built_by.as_deref());
    }
    if size.is_ok() {
        assert_eq!(4242, stored.size);
    }
}

#[tokio::test]
async fn test_create_binary_with_repo() {
    let database = setup_database().await;
    let ceph = database.find_or_create_project("ceph").await.unwrap();
    let rgw = database.find_or_create_project("radosgw").await.unwrap();

    let key = GroupingKey {
        project_id: ceph.id,
        git_ref: "nightly".to_string(),
        distro: "debian".to_string(),
        distro_version: "12".to_string(),
    };
    let repo = find_or_create_repo(&database, &key).await.unwrap();

    // the supplied repo wins over the one the fields would resolve to
    let binary = create_binary(
        &database,
        NewBinary::new("ceph.deb", &ceph, ubuntu_fields()).with_repo(repo.clone()),
    )
    .await
    .unwrap();
    assert_eq!(repo.id, binary.repo_id);
    assert_eq!(1, count_repos(&database).await);

    let err = create_binary(
        &database,
        NewBinary::new("rgw.deb", &rgw, ubuntu_fields()).with_repo(repo),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServerError::RepoProjectMismatch));
    assert!(err.is_validation_error());
}

#[tokio::test]
async fn test_create_binary_validation() {
    let database = setup_database().await;
    let project = database.find_or_create_project("ceph").await.unwrap();

    let fields = BinaryFields {
        arch: None,
        ..ubuntu_fields()
    };
    let err = assert_err!(
        create_binary(&database, NewBinary::new("ceph.deb", &project, fields)).await
    );

    assert!(err.is_validation_error());
    assert!(matches!(
        err,
        ServerError::ChacraError(ChacraError::InvalidBinaryField { field: "arch", .. })
    ));
    assert_eq!(0, count_repos(&database).await);
    assert_eq!(0, count_binaries(&database).await);
}

#[tokio::test]
async fn test_create_binary_unreadable_aborts() {
    let database = setup_database().await;
    let project = database.find_or_create_project("ceph").await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let fields = BinaryFields {
        path: Some(dir.path().join("missing.deb").to_str().unwrap().to_owned()),
        ..ubuntu_fields()
    };
    let err = assert_err!(
        create_binary(&database, NewBinary::new("ceph.deb", &project, fields)).await
    );

    assert_eq!("FileUnreadable", err.name());
    assert!(!err.is_transient());
    assert_eq!(0, count_repos(&database).await);
    assert_eq!(0, count_binaries(&database).await);
}

#[tokio::test]
async fn test_update_binary_recomputes_checksum() {
    let database = setup_database().await;
    let project = database.find_or_create_project("ceph").await.unwrap();
    let old = artifact(b"hello");
    let new = artifact(b"world");

    let binary = create_binary(
        &database,
        NewBinary::new("ceph.deb", &project, with_path(&old)),
    )
    .await
    .unwrap();

    let updated = assert_ok!(
        update_binary(
            &database,
            binary.id,
            BinaryFields {
                path: Some(new.path().to_str().unwrap().to_owned()),
                built_by: Some("builder-3".to_string()),
                ..Default::default()
            },
        )
        .await
    );

    assert_eq!(Some(Checksum::from_bytes(b"world").to_hex()), updated.checksum);
    assert_eq!(Some("builder-3"), updated.built_by.as_deref());
    assert_eq!(binary.created, updated.created);
    assert!(updated.modified >= updated.created);
    assert!(updated.modified >= binary.modified);

    // untouched fields survive
    assert_eq!("ubuntu", updated.distro);
    assert_eq!("amd64", updated.arch);
    assert_eq!(binary.repo_id, updated.repo_id);
}

#[tokio::test]
async fn test_update_binary_empty_path_keeps_checksum() {
    let database = setup_database().await;
    let project = database.find_or_create_project("ceph").await.unwrap();
    let file = artifact(b"hello");

    let binary = create_binary(
        &database,
        NewBinary::new("ceph.deb", &project, with_path(&file)),
    )
    .await
    .unwrap();

    let updated = update_binary(
        &database,
        binary.id,
        BinaryFields {
            path: Some(String::new()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(Some(""), updated.path.as_deref());
    assert_eq!(binary.checksum, updated.checksum);
}

#[tokio::test]
async fn test_update_binary_does_not_regroup() {
    let database = setup_database().await;
    let project = database.find_or_create_project("ceph").await.unwrap();

    let binary = create_binary(
        &database,
        NewBinary::new("ceph.deb", &project, ubuntu_fields()),
    )
    .await
    .unwrap();

    let updated = update_binary(
        &database,
        binary.id,
        BinaryFields {
            distro_version: Some("22.04".to_string()),
            git_ref: Some("main".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!("22.04", updated.distro_version);
    assert_eq!(binary.repo_id, updated.repo_id);
    assert_eq!(1, count_repos(&database).await);
}

#[tokio::test]
async fn test_update_binary_unreadable_keeps_record() {
    let database = setup_database().await;
    let project = database.find_or_create_project("ceph").await.unwrap();
    let file = artifact(b"hello");
    let dir = tempfile::tempdir().unwrap();

    let binary = create_binary(
        &database,
        NewBinary::new("ceph.deb", &project, with_path(&file)),
    )
    .await
    .unwrap();

    let err = update_binary(
        &database,
        binary.id,
        BinaryFields {
            path: Some(dir.path().join("gone.deb").to_str().unwrap().to_owned()),
            size: Some(4096),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!("FileUnreadable", err.name());

    let stored = database.find_binary(binary.id).await.unwrap();
    assert_eq!(binary, stored);
}

#[tokio::test]
async fn test_update_missing_binary() {
    let database = setup_database().await;

    let err = update_binary(&database, 42, ubuntu_fields()).await.unwrap_err();
    assert!(matches!(err, ServerError::NoSuchBinary));
}

#[tokio::test]
async fn test_list_binaries_for_project() {
    let database = setup_database().await;
    let ceph = database.find_or_create_project("ceph").await.unwrap();
    let rgw = database.find_or_create_project("radosgw").await.unwrap();

    for (name, project, distro_version) in [
        ("ceph-focal.deb", &ceph, "20.04"),
        ("ceph-jammy.deb", &ceph, "22.04"),
        ("rgw.deb", &rgw, "20.04"),
    ] {
        let fields = BinaryFields {
            distro_version: Some(distro_version.to_string()),
            ..ubuntu_fields()
        };
        create_binary(&database, NewBinary::new(name, project, fields))
            .await
            .unwrap();
    }

    let binaries = database.list_binaries_for_project(ceph.id).await.unwrap();
    let names: Vec<&str> = binaries.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(vec!["ceph-focal.deb", "ceph-jammy.deb"], names);
    assert_ne!(binaries[0].repo_id, binaries[1].repo_id);
}

#[tokio::test]
async fn test_find_or_create_project() {
    let database = setup_database().await;

    let first = database.find_or_create_project("ceph").await.unwrap();
    let second = database.find_or_create_project("ceph").await.unwrap();
    assert_eq!(first, second);

    assert!(matches!(
        database.find_project("nope").await,
        Err(ServerError::NoSuchProject)
    ));
    assert!(matches!(
        database.find_repo(42).await,
        Err(ServerError::NoSuchRepo)
    ));
}

#[tokio::test]
async fn test_binary_info() {
    let database = setup_database().await;
    let project = database.find_or_create_project("ceph").await.unwrap();

    let binary = create_binary(
        &database,
        NewBinary::new(
            "ceph.deb",
            &project,
            BinaryFields {
                git_ref: Some("main".to_string()),
                size: Some(512),
                ..ubuntu_fields()
            },
        ),
    )
    .await
    .unwrap();

    let info = binary.to_binary_info();
    assert_eq!("just now", info.last_changed);
    assert_eq!(Some("main"), info.git_ref.as_deref());
    assert_eq!(512, info.size);

    let value = serde_json::to_value(&info).unwrap();
    assert_eq!(13, value.as_object().unwrap().len());
    assert_eq!("main", value["ref"]);
}

#[tokio::test]
async fn test_session_detach() {
    let database = setup_database().await;
    let project = database.find_or_create_project("ceph").await.unwrap();
    let binary = create_binary(
        &database,
        NewBinary::new("ceph.deb", &project, ubuntu_fields()),
    )
    .await
    .unwrap();

    let session = Session::new(database.clone());
    let handle = session.find_binary(binary.id).await.unwrap();

    assert!(handle.is_attached());
    assert_eq!("<Binary \"ceph.deb\">", handle.to_string());
    assert_eq!(binary.id, handle.get().unwrap().id);

    session.close();

    assert!(!handle.is_attached());
    assert_eq!("<Binary detached>", handle.to_string());
    assert!(matches!(handle.get(), Err(ServerError::DetachedRecordAccess)));
}

#[tokio::test]
async fn test_repo_unique_index() {
    let database = setup_database().await;
    let project = database.find_or_create_project("ceph").await.unwrap();

    let insert = || {
        Repo::insert(repo::ActiveModel {
            project_id: Set(project.id),
            git_ref: Set(String::new()),
            distro: Set("ubuntu".to_string()),
            distro_version: Set("20.04".to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        })
        .exec(&database)
    };

    insert().await.unwrap();
    assert!(insert().await.is_err());
}
