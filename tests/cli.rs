use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn unicore(config_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("unicore").unwrap();
    cmd.arg("--config-dir").arg(config_dir);
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_render_inline_context() {
    let dir = tempdir().unwrap();
    let template = dir.path().join("hello.tpl");
    fs::write(&template, "Hello, <%= name %>!").unwrap();

    unicore(dir.path())
        .arg("render")
        .arg(&template)
        .args(["--context", r#"{"name": "Alice"}"#])
        .assert()
        .success()
        .stdout("Hello, Alice!\n");
}

#[test]
fn test_render_from_stdin_with_context_file() {
    let dir = tempdir().unwrap();
    let context = dir.path().join("ctx.json");
    fs::write(&context, r#"{"items": ["a", "b"], "admin": true}"#).unwrap();

    unicore(dir.path())
        .args(["render", "-", "--context-file"])
        .arg(&context)
        .write_stdin("<% for i in items %><%= i.upper() %><% endfor %><% if admin %>!<% endif %>")
        .assert()
        .success()
        .stdout("AB!\n");
}

#[test]
fn test_render_missing_key_fails_with_hint() {
    let dir = tempdir().unwrap();
    let template = dir.path().join("t.tpl");
    fs::write(&template, "<%= user.email %>").unwrap();

    unicore(dir.path())
        .arg("render")
        .arg(&template)
        .args(["--context", r#"{"user": {}}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Key 'email' not found in 'user'"))
        .stderr(predicate::str::contains("--missing empty"));

    unicore(dir.path())
        .arg("render")
        .arg(&template)
        .args(["--context", r#"{"user": {}}"#, "--missing", "empty"])
        .assert()
        .success()
        .stdout("\n");
}

#[test]
fn test_compress_and_decompress() {
    let dir = tempdir().unwrap();
    unicore(dir.path())
        .args(["compress", "aaabbc"])
        .assert()
        .success()
        .stdout("3a2b1c\n");
    unicore(dir.path())
        .args(["decompress", "3a2b1c"])
        .assert()
        .success()
        .stdout("aaabbc\n");
}

#[test]
fn test_chain_pipeline() {
    let dir = tempdir().unwrap();
    unicore(dir.path())
        .args([
            "chain",
            r#"[{"name": "ann", "age": 31}, {"name": "bob", "age": 17}]"#,
            r#"filter:[{"age": 31}]"#,
            r#"pluck:["name"]"#,
            "first",
        ])
        .assert()
        .success()
        .stdout("\"ann\"\n");
}

#[test]
fn test_chain_unknown_operation() {
    let dir = tempdir().unwrap();
    unicore(dir.path())
        .args(["chain", "[1, 2]", "frobnicate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No callable function named 'frobnicate'"));
}

#[test]
fn test_functions_lists_registry() {
    let dir = tempdir().unwrap();
    unicore(dir.path())
        .arg("functions")
        .assert()
        .success()
        .stdout(predicate::str::contains("group_by"))
        .stdout(predicate::str::contains("operations"));
}

#[test]
fn test_audit_appends_to_log_file() {
    let dir = tempdir().unwrap();
    let log_file = dir.path().join("audit.log");

    for message in ["first", "second"] {
        unicore(dir.path())
            .args(["audit", "user login", message, "--log-file"])
            .arg(&log_file)
            .assert()
            .success()
            .stdout(predicate::str::contains("USER_LOGIN"));
    }

    let content = fs::read_to_string(&log_file).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.lines().all(|l| l.contains(" | USER_LOGIN | ")));
}

#[test]
fn test_config_set_then_show() {
    let dir = tempdir().unwrap();
    unicore(dir.path())
        .args(["config", "set", "rate_limit.max_calls", "5"])
        .assert()
        .success();
    assert!(dir.path().join("config.toml").exists());

    unicore(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rate_limit.max_calls"))
        .stdout(predicate::str::contains("5"));

    unicore(dir.path())
        .args(["config", "set", "rate_limit.burst", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}
