//! Artifact uploads and content creation against the in-memory server.

use bytes::Bytes;
use proptest::prelude::*;
use squeezer_core::catalog;
use squeezer_core::{
    chunk_ranges, Engine, EngineConfig, Entity, NaturalKey, Payload, SqueezerError, FILE_FIELD,
};
use squeezer_testkit::prelude::*;
use std::path::Path;

fn artifact<'e>(engine: &'e Engine, path: &Path, sha256: &str) -> Entity<'e> {
    Entity::new(engine, &catalog::ARTIFACT, NaturalKey::new().with("sha256", sha256))
        .with_payload(FILE_FIELD, Payload::File(path.to_path_buf()))
}

fn content<'e>(engine: &'e Engine, sha256: &str) -> Entity<'e> {
    Entity::new(
        engine,
        &catalog::FILE_CONTENT,
        NaturalKey::new()
            .with("relative_path", "data/blob.bin")
            .with("sha256", sha256),
    )
}

#[test]
fn large_artifact_is_uploaded_in_exact_chunks() {
    let pulp = fake_pulp();
    let (file, sha256) = payload_file(1_300_000);

    let engine = engine_for(&pulp);
    artifact(&engine, file.path(), &sha256)
        .process(Some("present"))
        .unwrap();

    let ranges: Vec<String> = pulp
        .calls_to("uploads_update")
        .iter()
        .map(|call| call.parameters["Content-Range"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        ranges,
        [
            "bytes 0-524287/1300000",
            "bytes 524288-1048575/1300000",
            "bytes 1048576-1299999/1300000",
        ]
    );
    let sizes: Vec<usize> = pulp
        .calls_to("uploads_update")
        .iter()
        .map(|call| call.upload_sizes["file"])
        .collect();
    assert_eq!(sizes, [524_288, 524_288, 251_424]);

    assert!(engine.changed());
    assert_eq!(engine.result("artifact").unwrap()["sha256"], sha256.as_str());
    assert_eq!(pulp.entities(&catalog::ARTIFACT).len(), 1);
    assert_eq!(pulp.open_uploads(), 0);
    assert!(pulp.calls_to("artifacts_create").is_empty());
}

#[test]
fn small_artifact_is_sent_whole() {
    let pulp = fake_pulp();
    let (file, sha256) = payload_file(4_096);

    let engine = engine_for(&pulp);
    artifact(&engine, file.path(), &sha256)
        .process(Some("present"))
        .unwrap();

    let creates = pulp.calls_to("artifacts_create");
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].upload_sizes["file"], 4_096);
    assert!(pulp.calls_to("uploads_create").is_empty());
    assert_eq!(engine.result("artifact").unwrap()["size"], 4_096);
}

#[test]
fn existing_artifact_is_not_uploaded_again() {
    let pulp = fake_pulp();
    let data = payload_bytes(2_000);
    pulp.seed_artifact(&data).unwrap();

    let engine = engine_for(&pulp);
    Entity::new(
        &engine,
        &catalog::ARTIFACT,
        NaturalKey::new().with("sha256", sha256_hex(&data)),
    )
    .with_payload(FILE_FIELD, Payload::Bytes(Bytes::from(data)))
    .process(Some("present"))
    .unwrap();

    assert!(!engine.changed());
    assert!(pulp.mutating_calls().is_empty());
}

#[test]
fn failed_chunk_deletes_session_once() {
    let pulp = fake_pulp();
    pulp.fail_call("uploads_update", 2, 500);
    let (file, sha256) = payload_file(1_300_000);

    let engine = engine_for(&pulp);
    let err = artifact(&engine, file.path(), &sha256)
        .process(Some("present"))
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(pulp.calls_to("uploads_update").len(), 2);
    assert_eq!(pulp.calls_to("uploads_delete").len(), 1);
    assert!(pulp.calls_to("uploads_commit").is_empty());
    assert_eq!(pulp.open_uploads(), 0);
    assert!(pulp.entities(&catalog::ARTIFACT).is_empty());
}

#[test]
fn digest_mismatch_fails_commit_and_cleans_up() {
    let pulp = fake_pulp();
    let (file, _) = payload_file(700_000);
    let wrong = sha256_hex(b"something else");

    let engine = engine_for(&pulp);
    let err = artifact(&engine, file.path(), &wrong)
        .process(Some("present"))
        .unwrap_err();

    assert!(matches!(err, SqueezerError::TaskFailed { .. }));
    assert_eq!(pulp.calls_to("uploads_delete").len(), 1);
    assert_eq!(pulp.open_uploads(), 0);
}

#[test]
fn check_mode_upload_makes_no_calls() {
    let pulp = fake_pulp();
    let (file, sha256) = payload_file(1_300_000);

    let engine = check_engine_for(&pulp);
    artifact(&engine, file.path(), &sha256)
        .process(Some("present"))
        .unwrap();

    assert!(engine.changed());
    assert_eq!(engine.result("artifact").unwrap()["sha256"], sha256.as_str());
    assert!(pulp.mutating_calls().is_empty());
}

#[test]
fn content_is_created_from_artifact_digest() {
    let pulp = fake_pulp();
    let data = payload_bytes(3_000);
    let sha256 = sha256_hex(&data);
    let artifact_href = pulp.seed_artifact(&data).unwrap();

    let engine = engine_for(&pulp);
    content(&engine, &sha256).process(Some("present")).unwrap();
    let body = pulp.calls_to("content_file_files_create")[0]
        .body
        .clone()
        .unwrap();
    assert_eq!(body["artifact"], artifact_href.as_str());
    assert!(!body.contains_key("sha256"));
    assert!(engine.changed());

    let engine = engine_for(&pulp);
    content(&engine, &sha256).process(Some("present")).unwrap();
    assert!(!engine.changed());
    assert_eq!(pulp.entities(&catalog::FILE_CONTENT).len(), 1);
}

#[test]
fn content_without_artifact_is_rejected() {
    let pulp = fake_pulp();
    let engine = engine_for(&pulp);
    let err = Entity::new(
        &engine,
        &catalog::FILE_CONTENT,
        NaturalKey::new()
            .with("relative_path", "missing.bin")
            .with("sha256", "abc"),
    )
    .process(Some("present"))
    .unwrap_err();

    assert_eq!(err.to_string(), "artifact abc not found");
    assert!(pulp.mutating_calls().is_empty());
}

#[test]
fn content_in_check_mode_reports_digest() {
    let pulp = fake_pulp();
    let engine = check_engine_for(&pulp);
    Entity::new(
        &engine,
        &catalog::FILE_CONTENT,
        NaturalKey::new()
            .with("relative_path", "missing.bin")
            .with("sha256", "abc"),
    )
    .process(Some("present"))
    .unwrap();

    let content = engine.result("content").unwrap();
    assert_eq!(content["sha256"], "abc");
    assert!(content.get("artifact").is_none());
    assert!(pulp.mutating_calls().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn chunked_upload_reassembles_payload((size, chunk) in upload_geometry_strategy()) {
        let pulp = fake_pulp();
        let data = payload_bytes(size as usize);
        let sha256 = sha256_hex(&data);

        let config = EngineConfig::new()
            .with_chunk_size(chunk)
            .with_upload_threshold(0);
        let engine = engine_with(&pulp, config);
        Entity::new(&engine, &catalog::ARTIFACT, NaturalKey::new().with("sha256", sha256.as_str()))
            .with_payload(FILE_FIELD, Payload::Bytes(Bytes::from(data)))
            .process(Some("present"))
            .unwrap();

        let expected = chunk_ranges(size, chunk).count();
        prop_assert_eq!(pulp.calls_to("uploads_update").len(), expected);
        let artifacts = pulp.entities(&catalog::ARTIFACT);
        prop_assert_eq!(artifacts.len(), 1);
        prop_assert_eq!(artifacts[0]["sha256"].as_str(), Some(sha256.as_str()));
        prop_assert_eq!(pulp.open_uploads(), 0);
    }
}
