use assert_cmd::cargo::cargo_bin_cmd;
use pdf_editor_core::doc_model::{Annotation, AnnotationKind, Page, PageGeometry, Rect};
use pdf_engine::fixtures::{FixturePage, PdfBuilder};
use pdf_engine::SourceDocument;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).expect("fixture should be written");
    path
}

fn sample(dir: &TempDir) -> PathBuf {
    let bytes = PdfBuilder::new()
        .page(FixturePage::new(612.0, 792.0).text("A PDF file", 72.0, 700.0, 12.0))
        .page(FixturePage::new(400.0, 300.0).rotated(90).text("PDF one", 20.0, 200.0, 10.0).text("PDF two", 20.0, 100.0, 10.0))
        .build()
        .expect("fixture");
    write_fixture(dir, "sample.pdf", &bytes)
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout should contain valid json")
}

fn reload(path: &Path) -> SourceDocument {
    SourceDocument::load(&fs::read(path).expect("output should exist")).expect("output should load")
}

#[test]
fn info_emits_stable_json_contract() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = sample(&temp);

    let output = cargo_bin_cmd!("butterpaper-cli").arg("info").arg(&file).assert().success().get_output().stdout.clone();

    let value = stdout_json(&output);
    assert_eq!(value["page_count"], 2);
    assert_eq!(value["pages"][0]["width"], 612.0);
    assert_eq!(value["pages"][0]["fragment_count"], 1);
    assert_eq!(value["pages"][1]["rotation"], 90);
    assert_eq!(value["pages"][1]["fragment_count"], 2);
}

#[test]
fn fragments_can_be_limited_to_one_page() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = sample(&temp);

    let output = cargo_bin_cmd!("butterpaper-cli")
        .args(["fragments", "--page", "2"])
        .arg(&file)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    assert_eq!(value.as_array().map(Vec::len), Some(1));
    assert_eq!(value[0]["page"], 2);
    assert_eq!(value[0]["fragments"][0]["text"], "PDF one");
    assert_eq!(value[0]["fragments"][1]["id"], "p1-f1");
}

#[test]
fn fragments_rejects_page_zero() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = sample(&temp);

    cargo_bin_cmd!("butterpaper-cli")
        .args(["fragments", "--page", "0"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("1-based"));
}

#[test]
fn search_lists_matches_in_page_order() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = sample(&temp);

    let output =
        cargo_bin_cmd!("butterpaper-cli").arg("search").arg(&file).arg("pdf").assert().success().get_output().stdout.clone();

    let value = stdout_json(&output);
    let pages: Vec<u64> =
        value["matches"].as_array().expect("matches").iter().filter_map(|found| found["page"].as_u64()).collect();
    assert_eq!(pages, vec![0, 1, 1]);
    assert_eq!(value["matches"][0]["text"], "PDF");
}

#[test]
fn replace_writes_a_covered_document() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = sample(&temp);
    let output_path = temp.path().join("out/replaced.pdf");

    cargo_bin_cmd!("butterpaper-cli")
        .arg("replace")
        .arg(&file)
        .args(["PDF", "DOC", "--output"])
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"replaced\": 3"));

    let output = reload(&output_path);
    assert_eq!(output.page_count(), 2);

    cargo_bin_cmd!("butterpaper-cli")
        .arg("search")
        .arg(&output_path)
        .arg("DOC")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"page\": 1"));
}

#[test]
fn apply_serializes_a_page_model() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = sample(&temp);

    let mut first = Page::from_source(1, PageGeometry::new(400.0, 300.0));
    first.annotations.push(Annotation::new(Rect::new(10.0, 10.0, 50.0, 20.0), AnnotationKind::Whiteout));
    let model = vec![first, Page::blank(), Page::from_source(0, PageGeometry::new(612.0, 792.0))];
    let edits = write_fixture(&temp, "model.json", serde_json::to_string(&model).expect("model json").as_bytes());
    let output_path = temp.path().join("applied.pdf");

    cargo_bin_cmd!("butterpaper-cli")
        .arg("apply")
        .arg(&file)
        .arg("--edits")
        .arg(&edits)
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success();

    let output = reload(&output_path);
    assert_eq!(output.page_count(), 3);
    assert_eq!(output.page(0).expect("page").geometry.width, 400.0);
    assert_eq!(output.page(1).expect("page").geometry.width, 612.0);
}

#[test]
fn apply_rejects_foreign_page_indices() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = sample(&temp);
    let model = vec![Page::from_source(7, PageGeometry::new(10.0, 10.0))];
    let edits = write_fixture(&temp, "model.json", serde_json::to_string(&model).expect("model json").as_bytes());

    cargo_bin_cmd!("butterpaper-cli")
        .arg("apply")
        .arg(&file)
        .arg("--edits")
        .arg(&edits)
        .arg("--output")
        .arg(temp.path().join("never.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("page 7 out of range"));
}

#[test]
fn config_overrides_reach_the_editor() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = sample(&temp);
    let config = write_fixture(&temp, "config.json", br#"{"replace_padding": 4.0}"#);
    let output_path = temp.path().join("padded.pdf");

    cargo_bin_cmd!("butterpaper-cli")
        .arg("--config")
        .arg(&config)
        .arg("replace")
        .arg(&file)
        .args(["file", "doc", "--output"])
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"replaced\": 1"));
}

#[test]
fn invalid_config_is_reported() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = sample(&temp);
    let config = write_fixture(&temp, "config.json", b"{ not json");

    cargo_bin_cmd!("butterpaper-cli")
        .arg("info")
        .arg(&file)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn info_fails_for_missing_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    cargo_bin_cmd!("butterpaper-cli")
        .arg("info")
        .arg(temp.path().join("missing.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_invalid_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = write_fixture(&temp, "invalid.pdf", b"this is not a pdf");

    cargo_bin_cmd!("butterpaper-cli")
        .arg("info")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open PDF"));
}

#[test]
fn info_fails_for_encrypted_marker_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let mut bytes = PdfBuilder::new().page(FixturePage::new(100.0, 100.0)).build().expect("fixture");
    bytes.extend_from_slice(b"\n% /Encrypt 9 0 R\n");
    let file = write_fixture(&temp, "encrypted-marker.pdf", &bytes);

    cargo_bin_cmd!("butterpaper-cli")
        .arg("info")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("password protected"));
}
