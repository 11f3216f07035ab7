//! CLI Integration Tests
//!
//! These tests run the built `blockvault` binary against a temporary vault
//! directory and inspect its JSON output.
//!
//! Run with:
//! ```bash
//! cargo test --test cli_integration
//! ```

use blockvault::{FileId, FileMetadataStore, FileRecord, MetadataStore};
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// A temporary vault plus an empty config file so no user config leaks in
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config("")
    }

    /// Extra TOML lines are appended to the fixture config
    fn with_config(extra: &str) -> Self {
        let dir = tempdir().unwrap();
        let config = format!("log_filter = \"warn\"\n{}", extra);
        std::fs::write(dir.path().join("config.toml"), config).unwrap();
        Fixture { dir }
    }

    fn vault_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("vault")
    }

    /// Run blockvault and return (stdout, stderr, success)
    fn run(&self, args: &[&str]) -> (String, String, bool) {
        let config = self.dir.path().join("config.toml");
        let vault = self.vault_dir();
        let output = Command::new(env!("CARGO_BIN_EXE_blockvault"))
            .arg("--config")
            .arg(&config)
            .arg("--vault")
            .arg(&vault)
            .args(["-f", "json"])
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute blockvault");

        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.success(),
        )
    }

    fn write_input(&self, name: &str, content: &[u8]) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path.to_str().unwrap().to_string()
    }

    /// Upload and return the new file id
    fn upload(&self, name: &str, content: &[u8]) -> String {
        let input = self.write_input(name, content);
        let (stdout, stderr, success) =
            self.run(&["upload", input.as_str(), "--type", "text/plain"]);
        assert!(success, "upload failed: {}", stderr);
        parse(&stdout)["file"]["id"].as_str().unwrap().to_string()
    }
}

fn parse(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout.trim()).expect("stdout should be one JSON document")
}

// ============================================================================
// Vault Initialization
// ============================================================================

#[test]
fn test_cli_init_creates_vault_files() {
    let fx = Fixture::new();

    let (stdout, _stderr, success) = fx.run(&["init"]);

    assert!(success, "init should succeed");
    assert_eq!(parse(&stdout)["status"], "ok");
    assert!(fx.vault_dir().join("metadata.vault").exists());
    assert!(fx.vault_dir().join("content.vault").exists());
}

// ============================================================================
// File Operations
// ============================================================================

#[test]
fn test_cli_upload_defaults_name_and_size() {
    let fx = Fixture::new();
    let input = fx.write_input("notes.txt", b"hello");

    let (stdout, _stderr, success) = fx.run(&["upload", input.as_str()]);

    assert!(success, "upload should succeed");
    let file = &parse(&stdout)["file"];
    assert_eq!(file["fileName"], "notes.txt");
    assert_eq!(file["fileSize"], 5);
    assert_eq!(file["fileType"], "application/octet-stream");
    assert!(file["updatedAt"].is_null());
}

#[test]
fn test_cli_upload_with_overrides() {
    let fx = Fixture::new();
    let input = fx.write_input("raw.bin", b"abc");

    let (stdout, _stderr, success) = fx.run(&[
        "upload",
        input.as_str(),
        "--name",
        "a.txt",
        "--type",
        "text/plain",
        "--size",
        "99",
    ]);

    assert!(success);
    let file = &parse(&stdout)["file"];
    assert_eq!(file["fileName"], "a.txt");
    assert_eq!(file["fileType"], "text/plain");
    assert_eq!(file["fileSize"], 99);
}

#[test]
fn test_cli_get_writes_content() {
    let fx = Fixture::new();
    let id = fx.upload("a.txt", b"ABC");
    let dest = fx.dir.path().join("out.txt");

    let (stdout, _stderr, success) =
        fx.run(&["get", id.as_str(), "--output", dest.to_str().unwrap()]);

    assert!(success, "get should succeed");
    let value = parse(&stdout);
    assert_eq!(value["file"]["id"], id.as_str());
    assert_eq!(value["contentLength"], 3);
    assert_eq!(std::fs::read(&dest).unwrap(), b"ABC");
}

#[test]
fn test_cli_get_nonexistent_file() {
    let fx = Fixture::new();
    fx.run(&["init"]);

    let (stdout, _stderr, success) = fx.run(&["get", "nonexistent"]);

    assert!(!success, "get nonexistent should fail");
    let value = parse(&stdout);
    assert_eq!(value["status"], "error");
    assert_eq!(value["message"], "File with id=nonexistent not found");
}

#[test]
fn test_cli_list_files() {
    let fx = Fixture::new();
    fx.upload("one.txt", b"1");
    fx.upload("two.txt", b"2");

    let (stdout, _stderr, success) = fx.run(&["list"]);

    assert!(success, "list should succeed");
    let value = parse(&stdout);
    assert_eq!(value["count"], 2);
    assert!(stdout.contains("one.txt"));
    assert!(stdout.contains("two.txt"));

    let (stdout, _, _) = fx.run(&["list", "--limit", "1"]);
    assert_eq!(parse(&stdout)["count"], 1);
}

#[test]
fn test_cli_update_file() {
    let fx = Fixture::new();
    let id = fx.upload("a.txt", b"ABC");

    let (stdout, _stderr, success) =
        fx.run(&["update", id.as_str(), "--name", "b.md", "--type", "text/markdown"]);

    assert!(success, "update should succeed");
    let file = &parse(&stdout)["file"];
    assert_eq!(file["fileName"], "b.md");
    assert_eq!(file["fileType"], "text/markdown");
    assert_eq!(file["fileSize"], 3);
    assert!(file["updatedAt"].is_u64());

    let (stdout, _, _) = fx.run(&["get", id.as_str()]);
    assert_eq!(parse(&stdout)["file"]["fileName"], "b.md");
}

#[test]
fn test_cli_update_nonexistent_file() {
    let fx = Fixture::new();

    let (stdout, _stderr, success) = fx.run(&["update", "ghost", "--name", "x", "--type", "y"]);

    assert!(!success);
    assert_eq!(parse(&stdout)["message"], "File with id=ghost not found");
}

#[test]
fn test_cli_delete_file() {
    let fx = Fixture::new();
    let id = fx.upload("gone.txt", b"bye");

    let (stdout, _stderr, success) = fx.run(&["delete", id.as_str()]);
    assert!(success, "delete should succeed");
    assert_eq!(parse(&stdout)["file"]["fileName"], "gone.txt");

    let (_, _, success) = fx.run(&["get", id.as_str()]);
    assert!(!success, "file should not exist after delete");

    let (_, _, success) = fx.run(&["delete", id.as_str()]);
    assert!(!success, "second delete should fail");
}

#[test]
fn test_cli_delete_split_pair_persists_without_sync_on_write() {
    let fx = Fixture::with_config("sync_on_write = false\n");
    fx.run(&["init"]);

    // Metadata with no content, as left by an upload that died halfway
    {
        let store =
            FileMetadataStore::open_or_create(fx.vault_dir().join("metadata.vault"), 3).unwrap();
        let id = FileId::new("split");
        store
            .insert(&id, &FileRecord::new(id.clone(), "half.txt", 4, "text/plain", 1))
            .unwrap();
    }

    let (stdout, _, _) = fx.run(&["status"]);
    assert_eq!(parse(&stdout)["records"], 1);

    let (stdout, _stderr, success) = fx.run(&["delete", "split"]);
    assert!(!success, "deleting a split pair reports NotFound");
    assert_eq!(parse(&stdout)["message"], "File with id=split not found");

    let (stdout, _, success) = fx.run(&["status"]);
    assert!(success);
    let value = parse(&stdout);
    assert_eq!(value["records"], 0, "metadata removal must survive the exit");
    assert_eq!(value["consistent"], true);
}

#[test]
fn test_cli_update_persists_without_sync_on_write() {
    let fx = Fixture::with_config("sync_on_write = false\n");
    let id = fx.upload("a.txt", b"ABC");

    let (_, _, success) = fx.run(&["update", id.as_str(), "--name", "b.txt", "--type", "x"]);
    assert!(success);

    let (_, _, success) = fx.run(&["update", "ghost", "--name", "c", "--type", "y"]);
    assert!(!success);

    let (stdout, _, _) = fx.run(&["get", id.as_str()]);
    assert_eq!(parse(&stdout)["file"]["fileName"], "b.txt");
}

// ============================================================================
// Consistency and Status
// ============================================================================

#[test]
fn test_cli_check_and_status() {
    let fx = Fixture::new();
    fx.upload("a.txt", b"A");
    fx.upload("b.txt", b"B");

    let (stdout, _stderr, success) = fx.run(&["check"]);
    assert!(success);
    let value = parse(&stdout);
    assert_eq!(value["consistent"], true);
    assert_eq!(value["repaired"], false);

    let (stdout, _stderr, success) = fx.run(&["status"]);
    assert!(success);
    let value = parse(&stdout);
    assert_eq!(value["records"], 2);
    assert_eq!(value["blobs"], 2);
}

#[test]
fn test_cli_rejects_bad_config() {
    let fx = Fixture::new();
    let bad = fx.dir.path().join("bad.toml");
    std::fs::write(&bad, "compression_level = 1000\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_blockvault"))
        .arg("--config")
        .arg(&bad)
        .arg("--vault")
        .arg(fx.vault_dir())
        .arg("status")
        .output()
        .expect("Failed to execute blockvault");

    assert!(!output.status.success());
    assert!(!fx.vault_dir().join("metadata.vault").exists());
}
