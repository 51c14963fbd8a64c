use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

const POLICY: &str = r#"
provider k8s {
    default_namespace = "apps"
}

let web = k8s.cilium_io_cilium_network_policy_v2 {
    metadata {
        name = "allow-web"
    }
    spec {
        egress {
            to_cidr_set {
                cidr = "10.0.0.0/8"
            }
        }
    }
}
"#;

fn crdform(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_crdform"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("CRDFORM_LOG")
        .output()
        .expect("failed to run crdform")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn validate_accepts_a_valid_policy() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("main.crdform"), POLICY).unwrap();

    let output = crdform(dir.path(), &["validate"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("cilium_io_cilium_network_policy_v2.web"));
}

#[test]
fn validate_reports_the_failing_path() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("main.crdform"),
        POLICY.replace("10.0.0.0/8", "10.0.0.0/33"),
    )
    .unwrap();

    let output = crdform(dir.path(), &["validate"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("spec.egress[0].to_cidr_set[0].cidr"));
}

#[test]
fn validate_rejects_a_misspelled_reference() {
    let dir = tempdir().unwrap();
    let config = format!(
        "{}\n{}",
        POLICY,
        r#"
let copy = k8s.cilium_io_cilium_network_policy_v2 {
    metadata {
        name = web.metdata.name
    }
}
"#
    );
    fs::write(dir.path().join("main.crdform"), config).unwrap();

    let output = crdform(dir.path(), &["validate"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("web.metdata.name"));

    let output = crdform(dir.path(), &["apply", "--auto-approve"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("crdform.state.json").exists());
}

#[test]
fn plan_previews_the_manifest() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("main.crdform"), POLICY).unwrap();

    let output = crdform(dir.path(), &["plan"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("+ cilium_io_cilium_network_policy_v2.web"));
    assert!(out.contains("kind: CiliumNetworkPolicy"));
    assert!(out.contains("Plan: 1 to create, 0 to update, 0 to delete"));
    assert!(!dir.path().join("crdform.state.json").exists());
}

#[test]
fn apply_show_and_destroy() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("main.crdform"), POLICY).unwrap();

    let output = crdform(dir.path(), &["apply", "--auto-approve"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let state = fs::read_to_string(dir.path().join("crdform.state.json")).unwrap();
    assert!(state.contains("allow-web"));
    assert!(!dir.path().join("crdform.state.lock").exists());

    let output = crdform(dir.path(), &["show"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let shown = stdout(&output);
    assert!(shown.starts_with("---\n"));
    assert!(shown.contains("kind: CiliumNetworkPolicy"));
    assert!(shown.contains("namespace: apps"));

    let output = crdform(dir.path(), &["apply", "--auto-approve"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("No changes"));

    let output = crdform(dir.path(), &["destroy", "--auto-approve"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let state = fs::read_to_string(dir.path().join("crdform.state.json")).unwrap();
    assert!(!state.contains("allow-web"));
}

#[test]
fn show_rejects_an_unknown_resource() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("main.crdform"), POLICY).unwrap();
    assert!(crdform(dir.path(), &["apply", "--auto-approve"]).status.success());

    let output = crdform(dir.path(), &["show", "--resource", "k8s.missing_v1.x"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("not found"));
}

#[test]
fn schema_lists_and_describes_kinds() {
    let dir = tempdir().unwrap();

    let output = crdform(dir.path(), &["schema"]);
    assert!(output.status.success());
    let listing = stdout(&output);
    assert!(listing.contains("k8s.cilium_io_cilium_network_policy_v2"));
    assert!(listing.contains("CiliumClusterwideNetworkPolicy (cluster-scoped)"));

    let output = crdform(dir.path(), &["schema", "k8s.cert_manager_io_certificate_v1"]);
    assert!(output.status.success());
    let detail = stdout(&output);
    assert!(detail.contains("metadata"));
    assert!(detail.contains("type: k8s_cert_manager_io_certificate_v1"));

    let output = crdform(dir.path(), &["schema", "k8s.nope_v1"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn force_unlock_without_a_lock_fails() {
    let dir = tempdir().unwrap();

    let output = crdform(dir.path(), &["force-unlock", "abc"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("No lock with ID abc"));
}
