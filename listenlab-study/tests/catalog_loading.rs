//! Catalog loading against a filesystem content store

use listenlab_common::config::StudyConfig;
use listenlab_common::Error;
use listenlab_study::content::{ContentCatalog, LocalContentStore};

fn write_fixture(root: &std::path::Path) {
    std::fs::create_dir_all(root.join("sentences/g0")).unwrap();
    std::fs::create_dir_all(root.join("sentences/g1")).unwrap();
    std::fs::create_dir_all(root.join("words")).unwrap();
    std::fs::write(root.join("sentences/g0/s1.wav"), b"s1").unwrap();
    std::fs::write(root.join("sentences/g1/s2.wav"), b"s2").unwrap();
    std::fs::write(root.join("words/w1.wav"), b"w1").unwrap();

    // Backslash paths and scruffy headers, as the sheet exports produce
    std::fs::write(
        root.join("sentences_metadata.csv"),
        "\u{feff}Current_Path, _Group \nsentences\\g0\\s1.wav,G0\nsentences/g1/s2.wav,G1\n",
    )
    .unwrap();
    std::fs::write(
        root.join("words_metadata.csv"),
        "current_path,_group\nwords/w1.wav,WER0\n",
    )
    .unwrap();
}

#[tokio::test]
async fn loads_pools_from_metadata_and_listing() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let store = LocalContentStore::new(dir.path());

    let catalog = ContentCatalog::load(&store, &StudyConfig::default())
        .await
        .unwrap();

    assert_eq!(catalog.sentences.total(), 2);
    assert_eq!(catalog.words.total(), 1);

    let g0 = catalog.sentences.group("G0");
    assert_eq!(g0.len(), 1);
    // Ids are the normalized relative paths
    assert_eq!(g0[0].id, "sentences/g0/s1.wav");
    assert_eq!(g0[0].blob_ref, "sentences/g0/s1.wav");

    assert!(catalog.find("sentences/g1/s2.wav").is_some());
    assert!(catalog.find("sentences/g9/nope.wav").is_none());
}

#[tokio::test]
async fn metadata_entry_without_blob_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    std::fs::write(
        dir.path().join("words_metadata.csv"),
        "current_path,_group\nwords/missing.wav,WER0\n",
    )
    .unwrap();
    let store = LocalContentStore::new(dir.path());

    let err = ContentCatalog::load(&store, &StudyConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn metadata_path_outside_folder_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    std::fs::write(
        dir.path().join("words_metadata.csv"),
        "current_path,_group\nelsewhere/w1.wav,WER0\n",
    )
    .unwrap();
    let store = LocalContentStore::new(dir.path());

    let err = ContentCatalog::load(&store, &StudyConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
