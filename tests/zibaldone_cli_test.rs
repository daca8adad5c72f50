use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

fn zibaldone(home: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("zibaldone");
    cmd.current_dir(home).env("ZIBALDONE_HOME", home);
    cmd
}

fn manuscript_dir(home: &Path, dir: &str) -> PathBuf {
    home.join("books").join(dir).join("manuscript")
}

fn create_book(tmp: &TempDir, title: &str) {
    zibaldone(tmp.path())
        .args(["book-create", title])
        .assert()
        .success()
        .stdout(predicate::str::contains("book_id="));
}

#[test]
fn create_sync_render_and_inspect_a_book() {
    let tmp = tempdir().expect("tempdir");
    create_book(&tmp, "My Book");

    let book_dir = tmp.path().join("books/my_book");
    assert!(book_dir.join("README.md").is_file());
    assert!(book_dir.join("license.md").is_file());
    assert!(book_dir.join("render").is_dir());

    let manuscript = manuscript_dir(tmp.path(), "my_book");
    fs::write(manuscript.join("01_intro.md"), "# Intro\n\nHello *world*.\n").expect("intro");
    fs::write(manuscript.join("02_body.txt"), "Body text\n").expect("body");
    fs::write(manuscript.join("cover.pdf"), "binary").expect("pdf");

    zibaldone(tmp.path())
        .args(["sync", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added position=3 file=01_intro.md"))
        .stdout(predicate::str::contains("added position=4 file=02_body.txt"))
        .stdout(predicate::str::contains("cover.pdf").not());

    zibaldone(tmp.path())
        .args(["sync", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("index already up to date"));

    zibaldone(tmp.path())
        .args(["render", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fragments=2"));

    let html = fs::read_to_string(book_dir.join("render/my_book.html")).expect("artifact");
    assert!(html.contains("<h1>Intro</h1>"));
    assert!(html.contains("<em>world</em>"));
    let intro = html.find("Hello").expect("intro rendered");
    let body = html.find("Body text").expect("body rendered");
    assert!(intro < body);

    zibaldone(tmp.path())
        .args(["render-info", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rendered=true"))
        .stdout(predicate::str::contains("my_book.html"));

    let audit = fs::read_to_string(tmp.path().join("logs/audit.log")).expect("audit log");
    assert!(audit.lines().any(|l| l.contains("\"phase\":\"render\"")));
}

#[test]
fn render_info_before_first_render_reports_absence() {
    let tmp = tempdir().expect("tempdir");
    create_book(&tmp, "Unrendered");

    zibaldone(tmp.path())
        .args(["render-info", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rendered=false"));
}

#[test]
fn render_aborts_on_missing_fragment_and_keeps_previous_artifact() {
    let tmp = tempdir().expect("tempdir");
    create_book(&tmp, "Fragile");
    let manuscript = manuscript_dir(tmp.path(), "fragile");
    fs::write(manuscript.join("a.md"), "first").expect("a");
    fs::write(manuscript.join("b.md"), "second").expect("b");

    zibaldone(tmp.path())
        .args(["render", "1", "--sync"])
        .assert()
        .success();
    let artifact = tmp.path().join("books/fragile/render/fragile.html");
    let before = fs::read_to_string(&artifact).expect("artifact");

    fs::remove_file(manuscript.join("b.md")).expect("remove b");
    zibaldone(tmp.path())
        .args(["render", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("E002_NOT_FOUND"))
        .stderr(predicate::str::contains("ZIB_WARN"));

    assert_eq!(fs::read_to_string(&artifact).expect("artifact"), before);
}

#[test]
fn sentinel_hides_files_listed_after_it() {
    let tmp = tempdir().expect("tempdir");
    create_book(&tmp, "Sentinel Book");
    let manuscript = manuscript_dir(tmp.path(), "sentinel_book");
    for name in ["a.md", "Book.txt", "c.md"] {
        fs::write(manuscript.join(name), name).expect("write");
    }

    zibaldone(tmp.path()).args(["sync", "1"]).assert().success();
    zibaldone(tmp.path())
        .args(["fragment-list", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fragments=1"))
        .stdout(predicate::str::contains("file=a.md"))
        .stdout(predicate::str::contains("file=c.md").not());
}

#[test]
fn delete_cascades_to_directory_and_records() {
    let tmp = tempdir().expect("tempdir");
    create_book(&tmp, "Doomed");
    create_book(&tmp, "Survivor");
    fs::write(manuscript_dir(tmp.path(), "doomed").join("a.md"), "a").expect("a");

    zibaldone(tmp.path()).args(["sync", "1"]).assert().success();
    zibaldone(tmp.path())
        .args(["reference-add", "1", "https://example.com/source"])
        .assert()
        .success();

    zibaldone(tmp.path())
        .args(["book-delete", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fragments_removed=1"))
        .stdout(predicate::str::contains("references_removed=1"));

    assert!(!tmp.path().join("books/doomed").exists());
    assert!(tmp.path().join("books/survivor").is_dir());

    let out = zibaldone(tmp.path())
        .args(["book-list", "--json"])
        .output()
        .expect("book-list");
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json report");
    assert_eq!(report["command"], "book-list");
    assert_eq!(report["details"][0], "books=1");

    zibaldone(tmp.path())
        .args(["fragment-list", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("E002_NOT_FOUND"));
}

#[test]
fn rename_moves_directory_and_artifact() {
    let tmp = tempdir().expect("tempdir");
    create_book(&tmp, "Old Title");
    fs::write(manuscript_dir(tmp.path(), "old_title").join("a.md"), "a").expect("a");
    zibaldone(tmp.path())
        .args(["render", "1", "--sync"])
        .assert()
        .success();

    zibaldone(tmp.path())
        .args(["book-rename", "1", "New Title"])
        .assert()
        .success()
        .stdout(predicate::str::contains("moved_from=old_title"));

    assert!(!tmp.path().join("books/old_title").exists());
    assert!(tmp.path().join("books/new_title/manuscript/a.md").is_file());
    assert!(tmp.path().join("books/new_title/render/new_title.html").is_file());
}

#[test]
fn invalid_and_duplicate_titles_are_rejected() {
    let tmp = tempdir().expect("tempdir");
    zibaldone(tmp.path())
        .args(["book-create", "ab"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("E001_VALIDATION"));

    create_book(&tmp, "Twice");
    zibaldone(tmp.path())
        .args(["book-create", "twice"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("E001_VALIDATION"));
}

#[test]
fn status_flags_unknown_environment_variables() {
    let tmp = tempdir().expect("tempdir");
    create_book(&tmp, "Status Book");

    zibaldone(tmp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("books=1"));

    zibaldone(tmp.path())
        .arg("status")
        .env("ZIBALDONE_SENTINAL", "Book.txt")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("unknown environment variable ZIBALDONE_SENTINAL"));
}

#[test]
fn fragment_edit_reorders_and_links_reference() {
    let tmp = tempdir().expect("tempdir");
    create_book(&tmp, "Editable");
    let manuscript = manuscript_dir(tmp.path(), "editable");
    fs::write(manuscript.join("a.md"), "alpha").expect("a");
    fs::write(manuscript.join("b.md"), "beta").expect("b");
    zibaldone(tmp.path()).args(["sync", "1"]).assert().success();
    zibaldone(tmp.path())
        .args(["reference-add", "1", "https://example.com/alpha"])
        .assert()
        .success();

    zibaldone(tmp.path())
        .args([
            "fragment-edit",
            "1",
            "a.md",
            "--position",
            "10",
            "--child",
            "--reference",
            "1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("kind=reference"));

    zibaldone(tmp.path()).args(["render", "1"]).assert().success();
    let html =
        fs::read_to_string(tmp.path().join("books/editable/render/editable.html")).expect("html");
    assert!(html.find("beta").expect("beta") < html.find("alpha").expect("alpha"));
    assert!(html.contains("data-origin=\"https://example.com/alpha\""));
    assert!(html.contains("<li class=\"child\">"));
}
