mod common;

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{ProbaMode, StubModel, LIVER_DESCRIPTOR_JSON};
use stageview::artifacts::file_sha256;
use stageview::{ArtifactLoadError, ArtifactPaths, ArtifactStore, StageModel};

fn write_artifacts(dir: &Path, descriptor: &str) -> ArtifactPaths {
    fs::write(dir.join("model.onnx"), b"stub model bytes").unwrap();
    fs::write(dir.join("features.json"), descriptor).unwrap();
    ArtifactPaths::under(dir)
}

fn counting_store(paths: ArtifactPaths, loads: Arc<AtomicUsize>) -> ArtifactStore {
    ArtifactStore::with_loader(paths, move |_path, _descriptor| {
        loads.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(StubModel::new("Stage_1", ProbaMode::Unsupported)) as Arc<dyn StageModel>)
    })
}

#[test]
fn test_load_reads_storage_once() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let paths = write_artifacts(dir.path(), LIVER_DESCRIPTOR_JSON);
    let loads = Arc::new(AtomicUsize::new(0));
    let store = counting_store(paths.clone(), Arc::clone(&loads));

    assert!(!store.is_loaded());
    let first = store.load()?;
    assert_eq!(first.descriptor.feature_columns, vec!["Age", "Bilirubin", "Sex"]);

    // Later calls never touch the files again.
    fs::remove_file(&paths.descriptor)?;
    fs::remove_file(&paths.model)?;
    let second = store.load()?;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(store.is_loaded());
    Ok(())
}

#[test]
fn test_missing_model_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("features.json"), LIVER_DESCRIPTOR_JSON)?;
    let loads = Arc::new(AtomicUsize::new(0));
    let store = counting_store(ArtifactPaths::under(dir.path()), Arc::clone(&loads));

    let err = store.load().unwrap_err();
    assert!(matches!(err, ArtifactLoadError::Missing { kind: "Model", .. }));
    assert_eq!(loads.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn test_missing_descriptor_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("model.onnx"), b"stub")?;
    let store = counting_store(ArtifactPaths::under(dir.path()), Arc::new(AtomicUsize::new(0)));

    let err = store.load().unwrap_err();
    assert!(matches!(err, ArtifactLoadError::Missing { kind: "Feature descriptor", .. }));
    assert!(err.to_string().contains("features.json"));
    Ok(())
}

#[test]
fn test_malformed_descriptor() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let paths = write_artifacts(dir.path(), "feature_columns: [Age]");
    let store = counting_store(paths, Arc::new(AtomicUsize::new(0)));

    assert!(matches!(store.load(), Err(ArtifactLoadError::MalformedDescriptor { .. })));
    Ok(())
}

#[test]
fn test_descriptor_with_duplicate_columns() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let paths = write_artifacts(dir.path(), r#"{"feature_columns": ["Age", "Age"]}"#);
    let store = counting_store(paths, Arc::new(AtomicUsize::new(0)));

    assert!(matches!(store.load(), Err(ArtifactLoadError::InvalidDescriptor(_))));
    Ok(())
}

#[test]
fn test_failed_load_is_retried() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let paths = ArtifactPaths::under(dir.path());
    let loads = Arc::new(AtomicUsize::new(0));
    let store = counting_store(paths, Arc::clone(&loads));

    assert!(store.load().is_err());
    assert!(!store.is_loaded());

    write_artifacts(dir.path(), LIVER_DESCRIPTOR_JSON);
    assert!(store.load().is_ok());
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_loader_errors_propagate() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let paths = write_artifacts(dir.path(), LIVER_DESCRIPTOR_JSON);
    let store = ArtifactStore::with_loader(paths, |_path, _descriptor| {
        Err(ArtifactLoadError::Model(stageview::ClassifierError::BuildError("bad graph".into())))
    });

    let err = store.load().unwrap_err();
    assert!(err.to_string().contains("bad graph"));
    Ok(())
}

#[test]
fn test_model_digest_verification() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let paths = write_artifacts(dir.path(), LIVER_DESCRIPTOR_JSON);
    let digest = file_sha256(&paths.model)?;

    let good = counting_store(paths.clone().with_model_sha256(digest.to_uppercase()), Arc::new(AtomicUsize::new(0)));
    assert!(good.load().is_ok());

    let bad = counting_store(paths.with_model_sha256("00".repeat(32)), Arc::new(AtomicUsize::new(0)));
    match bad.load() {
        Err(ArtifactLoadError::HashMismatch { actual, .. }) => assert_eq!(actual, digest),
        other => panic!("expected hash mismatch, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_corrupt_onnx_model_fails_to_load() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let paths = write_artifacts(dir.path(), LIVER_DESCRIPTOR_JSON);
    let store = ArtifactStore::new(paths);

    assert!(matches!(store.load(), Err(ArtifactLoadError::Model(_))));
    Ok(())
}
