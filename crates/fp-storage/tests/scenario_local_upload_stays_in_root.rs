//! Local filesystem storage writes inside the upload dir and serves
//! `/uploads/<key>` URLs.

use bytes::Bytes;
use fp_config::settings::StorageSettings;
use fp_storage::{build_storage, PutOptions, StorageError};

#[tokio::test]
async fn local_upload_writes_file_under_root() {
    let dir = tempfile::tempdir().unwrap();
    let settings = StorageSettings {
        provider: "local".into(),
        upload_dir: dir.path().to_string_lossy().to_string(),
        public_base: "/uploads/".into(),
        ..Default::default()
    };
    let storage = build_storage(&settings).unwrap();
    assert_eq!(storage.name(), "local");

    let stored = storage
        .put(
            Bytes::from_static(b"fake-jpeg"),
            PutOptions {
                folder: Some("places".into()),
                key: Some("gangnam.jpg".into()),
                content_type: Some("image/jpeg".into()),
            },
        )
        .await
        .unwrap();

    assert_eq!(stored.key, "places/gangnam.jpg");
    assert_eq!(stored.url, "/uploads/places/gangnam.jpg");
    let on_disk = std::fs::read(dir.path().join("places").join("gangnam.jpg")).unwrap();
    assert_eq!(on_disk, b"fake-jpeg");

    storage.delete(&stored.key).await.unwrap();
    assert!(!dir.path().join("places").join("gangnam.jpg").exists());
}

#[tokio::test]
async fn traversal_never_touches_disk() {
    let dir = tempfile::tempdir().unwrap();
    let settings = StorageSettings {
        provider: "local".into(),
        upload_dir: dir.path().join("uploads").to_string_lossy().to_string(),
        ..Default::default()
    };
    let storage = build_storage(&settings).unwrap();

    let err = storage
        .put(
            Bytes::from_static(b"x"),
            PutOptions {
                folder: Some("../escape".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidKey(_)));
    assert!(!dir.path().join("escape").exists());

    let err = storage.delete("../uploads").await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidKey(_)));
}
