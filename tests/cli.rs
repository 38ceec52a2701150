//! Integration tests for CLI commands

#![allow(deprecated)]

use assert_cmd::{assert::OutputAssertExt, cargo::CommandCargoExt};
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

const CATALOG: &str = r#"
[git-blame]
author = "hubot"
description = "Inline blame annotations"

[markdown-preview]
author = "octocat"
description = "Live preview for Markdown buffers"
"#;

/// `crumb` isolated from the user's config and data directories
fn crumb(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("crumb").unwrap();
    cmd.arg("--data-dir")
        .arg(tmp.path().join("data"))
        .arg("--config")
        .arg(tmp.path().join("config.toml"))
        .env_remove("RUST_LOG");
    cmd
}

fn with_catalog(tmp: &TempDir) -> Command {
    let path = tmp.path().join("catalog.toml");
    std::fs::write(&path, CATALOG).unwrap();
    let mut cmd = crumb(tmp);
    cmd.arg("--catalog").arg(path);
    cmd
}

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("crumb").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("palette"))
        .stdout(predicate::str::contains("secret"))
        .stdout(predicate::str::contains("providers"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("ext"));
}

#[test]
fn test_config_set_provider_persists() {
    let tmp = TempDir::new().unwrap();

    crumb(&tmp)
        .args(["config", "set-provider", "Echo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Default chat provider set to Echo"));

    let saved = std::fs::read_to_string(tmp.path().join("config.toml")).unwrap();
    assert!(saved.contains("default_provider = \"Echo\""));
    assert!(!saved.contains("data_dir"));

    crumb(&tmp)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_provider = \"Echo\""));

    // The saved default is picked up without --provider
    crumb(&tmp)
        .args(["chat", "--key", "local", "from config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from config"));
}

#[test]
fn test_config_set_unknown_provider() {
    let tmp = TempDir::new().unwrap();

    crumb(&tmp)
        .args(["config", "set-provider", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown chat provider: Nope"));
    assert!(!tmp.path().join("config.toml").exists());
}

#[test]
fn test_secret_set_get_delete() {
    let tmp = TempDir::new().unwrap();

    crumb(&tmp)
        .args(["secret", "set", "GEMINI_API_KEY", "first"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored GEMINI_API_KEY"));
    crumb(&tmp)
        .args(["secret", "set", "GEMINI_API_KEY", "second"])
        .assert()
        .success();

    crumb(&tmp)
        .args(["secret", "get", "GEMINI_API_KEY"])
        .assert()
        .success()
        .stdout(predicate::eq("second\n"));

    crumb(&tmp)
        .args(["secret", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GEMINI_API_KEY"));

    crumb(&tmp)
        .args(["secret", "delete", "GEMINI_API_KEY"])
        .assert()
        .success();
    crumb(&tmp)
        .args(["secret", "get", "GEMINI_API_KEY"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No secret stored for GEMINI_API_KEY"));

    assert!(tmp.path().join("data").join("secrets.db").exists());
}

#[test]
fn test_palette_clone_entry() {
    let tmp = TempDir::new().unwrap();

    crumb(&tmp)
        .args(["palette", "clone:octocat/Hello-World", "--run", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Clone git repository"))
        .stdout(predicate::str::contains(
            "clone https://github.com/octocat/Hello-World",
        ))
        .stdout(predicate::str::contains(
            "Clone requested: https://github.com/octocat/Hello-World",
        ));
}

#[test]
fn test_palette_full_url_is_kept() {
    let tmp = TempDir::new().unwrap();

    crumb(&tmp)
        .args(["palette", "clone:https://example.com/x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("clone https://example.com/x"))
        .stdout(predicate::str::contains("github.com").not());
}

#[test]
fn test_palette_default_set_lists_commands() {
    let tmp = TempDir::new().unwrap();

    crumb(&tmp)
        .args(["palette", "api key"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Show and run commands"))
        .stdout(predicate::str::contains("Configure API Key..."))
        .stdout(predicate::str::contains("Clear API Key"))
        .stdout(predicate::str::contains("New Chat").not());
}

#[test]
fn test_palette_run_out_of_range() {
    let tmp = TempDir::new().unwrap();

    crumb(&tmp)
        .args(["palette", "@", "--run", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No entry 0"));
}

#[test]
fn test_providers_json() {
    let tmp = TempDir::new().unwrap();

    crumb(&tmp)
        .args(["secret", "set", "ECHO_API_KEY", "local"])
        .assert()
        .success();

    crumb(&tmp)
        .args(["providers", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Gemini 1.5 Flash\""))
        .stdout(predicate::str::contains("\"GEMINI_API_KEY\""))
        .stdout(predicate::str::contains("\"stored\""))
        .stdout(predicate::str::contains("\"missing\""));
}

#[test]
fn test_chat_with_echo_provider() {
    let tmp = TempDir::new().unwrap();

    crumb(&tmp)
        .args(["chat", "--provider", "Echo", "--key", "local", "hello there"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello there"));

    // The key was stored, so the next run needs no --key
    crumb(&tmp)
        .args(["chat", "--provider", "Echo", "again"])
        .assert()
        .success()
        .stdout(predicate::str::contains("again"));
}

#[test]
fn test_chat_without_key_fails() {
    let tmp = TempDir::new().unwrap();

    crumb(&tmp)
        .args(["chat", "--provider", "Echo", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key stored for Echo"));
}

#[test]
fn test_chat_unknown_provider() {
    let tmp = TempDir::new().unwrap();

    crumb(&tmp)
        .args(["chat", "--provider", "Nope", "--key", "k", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown chat provider: Nope"));
}

#[test]
fn test_ext_install_and_list() {
    let tmp = TempDir::new().unwrap();

    with_catalog(&tmp)
        .args(["ext", "search", "MARK"])
        .assert()
        .success()
        .stdout(predicate::str::contains("markdown-preview"))
        .stdout(predicate::str::contains("git-blame").not());

    with_catalog(&tmp)
        .args(["ext", "install", "git-blame"])
        .assert()
        .success()
        .stdout(predicate::str::contains("git-blame"));

    with_catalog(&tmp)
        .args(["ext", "installed", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"git-blame\""))
        .stdout(predicate::str::contains("\"installed\""));

    with_catalog(&tmp)
        .args(["ext", "by-user", "octocat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("markdown-preview"));

    // Installed extensions drop out of the palette
    with_catalog(&tmp)
        .args(["palette", ">install"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Install extension: markdown-preview"))
        .stdout(predicate::str::contains("Install extension: git-blame").not());
}

#[test]
fn test_ext_install_unknown() {
    let tmp = TempDir::new().unwrap();

    with_catalog(&tmp)
        .args(["ext", "install", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in the catalog"));
}
