//! Command-line behaviour of the `epub2pdf` binary.

#![cfg(feature = "cli")]

mod common;

use common::{dir_entries, png, write_epub, Entry};
use std::path::Path;
use std::process::{Command, Output};

fn run(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_epub2pdf"))
        .args(args)
        .current_dir(cwd)
        .env_remove("WKHTMLTOPDF_PATH")
        .env_remove("EPUB2PDF_LOG_FILE")
        .output()
        .unwrap()
}

#[test]
fn wrong_arity_prints_usage_and_writes_nothing() {
    for args in [&[][..], &["book.epub"][..], &["a.epub", "b.pdf", "c.pdf"][..]] {
        let cwd = tempfile::tempdir().unwrap();
        let out = run(cwd.path(), args);

        assert_eq!(out.status.code(), Some(2), "args {args:?}");
        let stdout = String::from_utf8_lossy(&out.stdout);
        assert!(stdout.starts_with("Usage: epub2pdf"), "args {args:?}: {stdout}");
        assert!(
            !stdout.contains("error:"),
            "args {args:?}: only the usage line expected, got {stdout}"
        );
        assert!(out.stderr.is_empty(), "args {args:?}: stderr not empty");
        assert!(
            dir_entries(cwd.path()).is_empty(),
            "args {args:?} left files behind"
        );
    }
}

#[test]
fn help_still_goes_through_clap() {
    let cwd = tempfile::tempdir().unwrap();
    let out = run(cwd.path(), &["--help"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("EXAMPLES:"));
    assert!(dir_entries(cwd.path()).is_empty());
}

#[test]
fn missing_input_fails_with_status_1() {
    let cwd = tempfile::tempdir().unwrap();
    let out = run(cwd.path(), &["--no-progress", "nope.epub", "nope.pdf"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("not found"));
    assert!(!cwd.path().join("nope.pdf").exists());
    // Arguments were valid, so the log file was opened.
    assert!(cwd.path().join("conversion.log").exists());
}

#[cfg(unix)]
#[test]
fn renderer_version_is_not_queried_without_verbose() {
    use std::os::unix::fs::PermissionsExt;

    let cwd = tempfile::tempdir().unwrap();
    write_epub(cwd.path(), "book.epub", "V", &[Entry::doc("a.xhtml", "<p>x</p>")]);
    let script = cwd.path().join("fake-wkhtmltopdf");
    std::fs::write(&script, "#!/bin/sh\necho \"$@\" >> \"$(dirname \"$0\")/calls.txt\"\nexit 1\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let out = run(
        cwd.path(),
        &["--no-progress", "--wkhtmltopdf", script.to_str().unwrap(), "book.epub", "book.pdf"],
    );
    assert_eq!(out.status.code(), Some(1));
    let calls = std::fs::read_to_string(cwd.path().join("calls.txt")).unwrap();
    assert!(!calls.contains("--version"), "{calls}");
    assert_eq!(calls.lines().count(), 1, "{calls}");
}

#[test]
fn inspect_only_prints_metadata() {
    let cwd = tempfile::tempdir().unwrap();
    write_epub(
        cwd.path(),
        "book.epub",
        "Ein Buch",
        &[
            Entry::doc("a.xhtml", "<p>x</p>"),
            Entry::image("a.png", "image/png", png(4, 4)),
        ],
    );
    let out = run(
        cwd.path(),
        &["--inspect-only", "--log-file", "inspect.log", "book.epub"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Title:        Ein Buch"), "{stdout}");
    assert!(stdout.contains("Images:       1"), "{stdout}");
    assert!(cwd.path().join("inspect.log").exists());
}

#[test]
fn json_inspect_is_parseable() {
    let cwd = tempfile::tempdir().unwrap();
    write_epub(cwd.path(), "book.epub", "J", &[Entry::doc("a.xhtml", "<p>x</p>")]);
    let out = run(cwd.path(), &["--inspect-only", "--json", "book.epub"]);
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["title"], "J");
    assert_eq!(v["documents"], 1);
}
