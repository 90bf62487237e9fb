use std::path::{Path, PathBuf};
use std::sync::Arc;

use object_storage::{
    CompressionFormat, MemoryStore, MetadataConfig, MetadataStore, ObjectStorage, ObjectStorageError,
    ObjectStore,
};
use pretty_assertions::assert_eq;

fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn html_page() -> Vec<u8> {
    let mut page = b"<html><body>".to_vec();
    for i in 0..500 {
        page.extend_from_slice(format!("<p>item {} costs {}.99</p>", i, i % 17).as_bytes());
    }
    page.extend_from_slice(b"</body></html>");
    page
}

#[tokio::test]
async fn round_trip_is_byte_identical_for_every_format() {
    let store = Arc::new(MemoryStore::new("round-trip"));
    let storage = ObjectStorage::new(store.clone(), 6, false).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let contents = html_page();
    let input = write_file(dir.path(), "page.html", &contents);

    for format in CompressionFormat::ALL {
        let url = storage
            .compress_and_upload(&input, "page.html", "data/html", format.extension(), None)
            .await
            .unwrap();
        assert_eq!(url, format!("memory://round-trip/data/html/page.html.{}", format));

        let stored = store
            .object_bytes(&format!("data/html/page.html.{}", format))
            .await
            .unwrap();
        assert!(stored.len() < contents.len());

        let output = dir.path().join(format!("restored-{}.html", format));
        storage
            .download_and_decompress("page.html", &output, "data/html", format.extension())
            .await
            .unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), contents);
    }

    assert_eq!(store.len().await, CompressionFormat::ALL.len());
}

#[tokio::test]
async fn empty_file_round_trips() {
    let storage = ObjectStorage::new(Arc::new(MemoryStore::new("bucket")), 1, false).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "empty.txt", b"");

    storage
        .compress_and_upload(&input, "empty.txt", "", "gz", None)
        .await
        .unwrap();
    let output = dir.path().join("restored.txt");
    storage
        .download_and_decompress("empty.txt.gz", &output, "", "gz")
        .await
        .unwrap();
    assert_eq!(std::fs::read(&output).unwrap(), Vec::<u8>::new());
}

#[tokio::test]
async fn list_objects_only_returns_keys_under_prefix() {
    let storage = ObjectStorage::new(Arc::new(MemoryStore::new("bucket")), 6, false).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "a.txt", b"some text");

    for folder in ["data/html", "data/html/archive", "data/htmlx", "data/json", ""] {
        storage
            .compress_and_upload(&input, "a.txt", folder, "zstd", None)
            .await
            .unwrap();
    }

    let keys: Vec<String> = storage
        .list_objects("data/html")
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.key)
        .collect();
    assert_eq!(keys, vec!["data/html/a.txt.zstd", "data/html/archive/a.txt.zstd"]);
    assert!(keys.iter().all(|k| k.starts_with("data/html/")));

    assert_eq!(storage.list_objects("").await.unwrap().len(), 5);
    assert!(storage.list_objects("nothing").await.unwrap().is_empty());
}

#[tokio::test]
async fn format_mismatch_is_a_codec_error() {
    let store = Arc::new(MemoryStore::new("bucket"));
    let storage = ObjectStorage::new(store.clone(), 6, false).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "a.txt", &html_page());

    storage
        .compress_and_upload(&input, "a.txt", "", "bz2", None)
        .await
        .unwrap();

    // Same bytes stored under a zstd name
    let bz2_payload = store.object_bytes("a.txt.bz2").await.unwrap();
    let misnamed = write_file(dir.path(), "misnamed", &bz2_payload);
    store
        .put_object("a.txt.zstd", &misnamed, "application/zstd", false)
        .await
        .unwrap();

    let output = dir.path().join("out.txt");
    let err = storage
        .download_and_decompress("a.txt", &output, "", "zstd")
        .await
        .unwrap_err();
    assert!(matches!(err, ObjectStorageError::Codec(_)), "got {:?}", err);
    assert!(!output.exists());
}

#[tokio::test]
async fn concurrent_uploads_share_one_facade() {
    let metadata = MetadataStore::connect(&MetadataConfig::in_memory()).await.unwrap();
    let storage = Arc::new(
        ObjectStorage::new(Arc::new(MemoryStore::new("bucket")), 3, false)
            .unwrap()
            .with_metadata(metadata.clone()),
    );
    let dir = tempfile::tempdir().unwrap();

    let mut handles = Vec::new();
    for i in 0..10 {
        let input = write_file(dir.path(), &format!("file-{}.txt", i), format!("payload {}", i).as_bytes());
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            storage
                .compress_and_upload(&input, &format!("file-{}.txt", i), "batch", "zstd", None)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(storage.list_objects("batch").await.unwrap().len(), 10);
    assert_eq!(metadata.count().await.unwrap(), 10);
}

#[tokio::test]
async fn create_bucket_provisions_missing_bucket() {
    let storage = ObjectStorage::new(Arc::new(MemoryStore::without_bucket("fresh")), 6, false).unwrap();
    assert!(storage.list_objects("").await.is_err());

    storage.create_bucket().await.unwrap();
    storage.create_bucket().await.unwrap();
    assert!(storage.list_objects("").await.unwrap().is_empty());
}

#[tokio::test]
async fn names_ending_in_the_extension_round_trip() {
    let store = Arc::new(MemoryStore::new("bucket"));
    let storage = ObjectStorage::new(store.clone(), 6, false).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let contents = html_page();
    let input = write_file(dir.path(), "archive.bin", &contents);

    for format in CompressionFormat::ALL {
        let name = format!("archive.{}", format);
        storage
            .compress_and_upload(&input, &name, "backups", format.extension(), None)
            .await
            .unwrap();
        assert!(store.object_bytes(&format!("backups/{}.{}", name, format)).await.is_some());

        let output = dir.path().join(format!("restored-{}", format));
        storage
            .download_and_decompress(&name, &output, "backups", format.extension())
            .await
            .unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), contents);
    }
}
