//! Integration tests for the CLI binary.
//!
//! Registered as a [[test]] in the departure-marker-cli crate so that
//! CARGO_BIN_EXE_dmark is available. Every test runs against its own
//! temporary home directory with a cheap KDF.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const PASSPHRASE: &str = "correct horse battery staple";

struct Env {
    dir: tempfile::TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn dmark(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_dmark"))
            .arg("--home")
            .arg(self.home())
            .args(args)
            .env("DEPARTURE_PASSPHRASE", PASSPHRASE)
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to execute dmark")
    }

    fn ok(&self, args: &[&str]) -> String {
        let out = self.dmark(args);
        assert!(
            out.status.success(),
            "dmark {args:?} failed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&out.stdout),
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8_lossy(&out.stdout).into_owned()
    }

    fn keygen(&self, key: &str, algorithm: &str) {
        self.ok(&[
            "--key",
            key,
            "keygen",
            "--algorithm",
            algorithm,
            "--kdf-memory",
            "1024",
        ]);
    }
}

fn path_str(p: &Path) -> &str {
    p.to_str().expect("utf-8 path")
}

#[test]
fn cli_responds_to_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_dmark"))
        .arg("--help")
        .output()
        .expect("failed to execute dmark --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "got: {stdout}");
    assert!(stdout.contains("kel"));
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_dmark"))
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute dmark");
    assert!(!output.status.success());
}

#[test]
fn keygen_then_did() {
    let env = Env::new();
    env.keygen("default", "p256");
    let did = env.ok(&["did"]);
    assert!(did.trim().starts_with("did:key:zDn"), "got: {did}");

    let again = env.dmark(&["keygen", "--kdf-memory", "1024"]);
    assert!(!again.status.success(), "keygen must not overwrite");
}

#[test]
fn create_verify_and_id() {
    let env = Env::new();
    env.keygen("default", "ed25519");
    let marker = env.file("marker.json");
    env.ok(&[
        "create",
        "--origin",
        "https://platform.example",
        "--out",
        path_str(&marker),
    ]);

    let verified = env.ok(&["verify", path_str(&marker)]);
    assert!(verified.contains("valid"));

    let id = env.ok(&["id", path_str(&marker)]);
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&marker).unwrap()).unwrap();
    assert_eq!(id.trim(), json["id"].as_str().unwrap());

    let stored = env.home().join("markers").join(format!("{}.json", id.trim()));
    assert!(stored.exists());
}

#[test]
fn create_help_lists_accepted_types() {
    let env = Env::new();
    let help = env.ok(&["create", "--help"]);
    for ty in departure_marker::DepartureType::ALL {
        assert!(help.contains(ty.as_tag()), "help is missing {ty}");
    }
    assert!(!help.contains("involuntary"));

    env.keygen("default", "ed25519");
    let marker = env.file("forced.json");
    env.ok(&[
        "create",
        "--origin",
        "https://platform.example",
        "--type",
        "forced",
        "--no-store",
        "--out",
        path_str(&marker),
    ]);
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&marker).unwrap()).unwrap();
    assert_eq!(json["departureType"], "forced");
}

#[test]
fn tampered_marker_fails_verify() {
    let env = Env::new();
    env.keygen("default", "ed25519");
    let marker = env.file("marker.json");
    env.ok(&[
        "create",
        "--origin",
        "https://platform.example",
        "--path",
        "unilateral",
        "--out",
        path_str(&marker),
    ]);

    let mut json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&marker).unwrap()).unwrap();
    json["origin"] = serde_json::json!("https://elsewhere.example");
    std::fs::write(&marker, serde_json::to_string(&json).unwrap()).unwrap();

    let out = env.dmark(&["verify", path_str(&marker)]);
    assert!(!out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("invalid"), "got: {stdout}");
}

#[test]
fn emergency_requires_justification() {
    let env = Env::new();
    env.keygen("default", "ed25519");
    let out = env.dmark(&[
        "create",
        "--origin",
        "https://platform.example",
        "--type",
        "emergency",
        "--no-store",
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("emergencyJustification"));

    env.ok(&[
        "create",
        "--origin",
        "https://platform.example",
        "--type",
        "emergency",
        "--justification",
        "operator compromised",
        "--no-store",
    ]);
}

#[test]
fn witness_and_batch() {
    let env = Env::new();
    env.keygen("default", "ed25519");
    env.keygen("witness", "p256");

    let a = env.file("a.json");
    let b = env.file("b.json");
    for (path, origin) in [(&a, "https://a.example"), (&b, "https://b.example")] {
        env.ok(&["create", "--origin", origin, "--out", path_str(path)]);
    }

    let attestation = env.file("w.json");
    env.ok(&[
        "--key",
        "witness",
        "witness",
        path_str(&a),
        "--out",
        path_str(&attestation),
    ]);
    env.ok(&["verify", path_str(&a), "--witness", path_str(&attestation)]);
    let wrong = env.dmark(&["verify", path_str(&b), "--witness", path_str(&attestation)]);
    assert!(!wrong.status.success());

    let batch = env.ok(&["batch", path_str(&a), path_str(&b), "--sign"]);
    let doc: serde_json::Value = serde_json::from_str(&batch).unwrap();
    assert_eq!(doc["batch"]["markerIds"].as_array().unwrap().len(), 2);
    assert_eq!(doc["proofs"].as_array().unwrap().len(), 2);
    assert!(doc["batch"]["proof"].is_object());
}

#[test]
fn kel_incept_rotate_and_check() {
    let env = Env::new();
    env.keygen("default", "ed25519");
    let first = env.ok(&["did"]);

    let marker = env.file("old.json");
    env.ok(&[
        "create",
        "--origin",
        "https://platform.example",
        "--out",
        path_str(&marker),
    ]);

    let incept = env.ok(&["kel", "incept"]);
    let identifier = incept
        .split_whitespace()
        .last()
        .expect("identifier printed")
        .to_string();
    assert!(!env.dmark(&["kel", "incept"]).status.success());

    env.ok(&["kel", "rotate", "--reason", "scheduled"]);
    let second = env.ok(&["did"]);
    assert_ne!(first, second);

    let shown = env.ok(&["kel", "show"]);
    assert!(shown.contains(&identifier));
    assert!(shown.contains("Sequence: 1"));

    let log = env
        .home()
        .join("keylogs")
        .join(format!("{identifier}.json"));
    env.ok(&["kel", "check", path_str(&log)]);

    // The marker still verifies on its own but its key is retired.
    env.ok(&["verify", path_str(&marker)]);
    let out = env.dmark(&["verify", path_str(&marker), "--keylog", path_str(&log)]);
    assert!(!out.status.success());
}

#[test]
fn wrong_passphrase_rejected() {
    let env = Env::new();
    env.keygen("default", "ed25519");
    let out = Command::new(env!("CARGO_BIN_EXE_dmark"))
        .arg("--home")
        .arg(env.home())
        .args(["create", "--origin", "https://platform.example"])
        .env("DEPARTURE_PASSPHRASE", "not it")
        .output()
        .expect("failed to execute dmark");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("passphrase"));
}
