//! CLI integration tests for the `nobadfuncs` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"{"func os.Exit(int)": "do not call os.Exit directly"}"#;

const FOO_GO: &str = "package foo\n\nimport \"os\"\n\nfunc Foo() {\n\tos.Exit(1)\n}\n";

/// A module with one denied call and a stand-in standard library.
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::write(root.join("go.mod"), "module example.com/foo\n").unwrap();
    fs::write(root.join("foo.go"), FOO_GO).unwrap();
    fs::create_dir_all(root.join("inner")).unwrap();
    fs::create_dir_all(root.join("goroot/src/os")).unwrap();
    fs::write(
        root.join("goroot/src/os/proc.go"),
        "package os\n\nfunc Exit(code int) {}\n",
    )
    .unwrap();
    tmp
}

fn nobadfuncs(dir: &Path, goroot: &Path) -> Command {
    let mut cmd = assert_cmd::cargo_bin_cmd!("nobadfuncs");
    cmd.current_dir(dir)
        .env("GOROOT", goroot)
        .env("NOBADFUNCS_CONFIG_DIR", goroot.join("no-global-config"))
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

// ============================================================
// Engine mode
// ============================================================

#[test]
fn engine_reports_denied_call() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");

    nobadfuncs(tmp.path(), &goroot)
        .args(["--config-json", CONFIG, "."])
        .assert()
        .code(1)
        .stdout("foo.go:6:5: do not call os.Exit directly\n");
}

#[test]
fn engine_paths_are_relative_to_working_directory() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");

    nobadfuncs(&tmp.path().join("inner"), &goroot)
        .args(["--config-json", CONFIG, ".."])
        .assert()
        .code(1)
        .stdout("../foo.go:6:5: do not call os.Exit directly\n");
}

#[test]
fn engine_exits_zero_without_matches() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");

    nobadfuncs(tmp.path(), &goroot)
        .args(["--config-json", r#"{"func os.Getenv(string) string": "no"}"#, "./..."])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn engine_reports_malformed_config_as_one_line() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");

    nobadfuncs(tmp.path(), &goroot)
        .args(["--config-json", "[1, 2]", "."])
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with(
            ".:1:1: failed to decode configuration JSON \"[1, 2]\": ",
        ))
        .stdout(predicate::str::contains("os.Exit").not());
}

#[test]
fn engine_requires_config_json() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");

    nobadfuncs(tmp.path(), &goroot)
        .args(["."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--config-json"));
}

// ============================================================
// Raw pass-through
// ============================================================

#[test]
fn run_check_cmd_forwards_output_and_exit_code() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");

    nobadfuncs(tmp.path(), &goroot)
        .args(["run-check-cmd", "--config-json", CONFIG, "."])
        .assert()
        .code(1)
        .stdout("foo.go:6:5: do not call os.Exit directly\n");
}

// ============================================================
// Metadata
// ============================================================

#[test]
fn type_and_priority() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");

    nobadfuncs(tmp.path(), &goroot)
        .arg("type")
        .assert()
        .success()
        .stdout("nobadfuncs\n");
    nobadfuncs(tmp.path(), &goroot)
        .arg("priority")
        .assert()
        .success()
        .stdout("0\n");
}

// ============================================================
// Orchestrated check
// ============================================================

const PLUGIN_CONFIG: &str = r#"checks:
  nobadfuncs:
    config:
      bad-funcs:
        "func os.Exit(int)": "do not call os.Exit directly"
"#;

#[test]
fn check_reads_project_config() {
    for mode in [None, Some("--in-process")] {
        let tmp = project();
        let goroot = tmp.path().join("goroot");
        fs::create_dir_all(tmp.path().join("godel/config")).unwrap();
        write_config(tmp.path(), "godel/config/check-plugin.yml", PLUGIN_CONFIG);

        let mut cmd = nobadfuncs(tmp.path(), &goroot);
        cmd.arg("check");
        if let Some(flag) = mode {
            cmd.arg(flag);
        }
        cmd.assert().code(1).stdout(
            "Running nobadfuncs...\nfoo.go:6:5: do not call os.Exit directly\nFinished nobadfuncs\n",
        );
    }
}

#[test]
fn check_upgrades_legacy_project_config() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");
    fs::create_dir_all(tmp.path().join("godel/config")).unwrap();
    write_config(
        tmp.path(),
        "godel/config/check.yml",
        r#"checks:
  nobadfuncs:
    args: ["--config", "{\"func os.Exit(int)\": \"legacy message\"}"]
"#,
    );

    nobadfuncs(tmp.path(), &goroot)
        .args(["check", "--in-process"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("foo.go:6:5: legacy message"))
        .stderr(predicate::str::contains("legacy schema"));
}

#[test]
fn check_honours_exclude_names() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");
    let config = write_config(
        tmp.path(),
        "custom.yml",
        &format!("{PLUGIN_CONFIG}    exclude:\n      names: [\"foo\\\\.go\"]\n"),
    );

    nobadfuncs(tmp.path(), &goroot)
        .args(["check", "--in-process", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout("Running nobadfuncs...\nFinished nobadfuncs\n");
}

#[test]
fn check_respects_skip() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");
    let config = write_config(tmp.path(), "custom.yml", "checks:\n  nobadfuncs:\n    skip: true\n");

    nobadfuncs(tmp.path(), &goroot)
        .args(["check", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout("");
}

// ============================================================
// Config upgrade
// ============================================================

fn legacy_args(args: &str) -> String {
    format!("checks:\n  nobadfuncs:\n    args: {args}\n")
}

#[test]
fn upgrade_converts_legacy_args() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");
    let file = write_config(
        tmp.path(),
        "check.yml",
        &legacy_args(r#"["--config", "{\"func os.Exit(int)\": \"no exit\"}"]"#),
    );

    let output = nobadfuncs(tmp.path(), &goroot)
        .args(["upgrade-config", "--legacy"])
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("Upgraded configuration for"))
        .get_output()
        .stdout
        .clone();

    insta::assert_snapshot!(String::from_utf8(output).unwrap(), @r#"
    checks:
      nobadfuncs:
        config:
          bad-funcs:
            func os.Exit(int): no exit
    "#);
}

#[test]
fn upgrade_leaves_current_config_untouched() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");
    let file = write_config(tmp.path(), "check-plugin.yml", PLUGIN_CONFIG);

    nobadfuncs(tmp.path(), &goroot)
        .arg("upgrade-config")
        .arg(&file)
        .assert()
        .success()
        .stdout(PLUGIN_CONFIG)
        .stderr("");
}

#[test]
fn upgrade_rejects_malformed_json_map() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");
    let file = write_config(
        tmp.path(),
        "check.yml",
        &legacy_args(r#"["--config", "{\"foo\":\"bar\",}"]"#),
    );

    nobadfuncs(tmp.path(), &goroot)
        .args(["upgrade-config", "--legacy"])
        .arg(&file)
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains(
            "failed to upgrade check \"nobadfuncs\" legacy configuration: failed to upgrade asset configuration: failed to unmarshal second element of \"args\" in nobadfuncs-asset legacy configuration as JSON map: ",
        ));
}

#[test]
fn upgrade_rejects_unsupported_first_arg() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");
    let file = write_config(tmp.path(), "check.yml", &legacy_args(r#"["-help"]"#));

    nobadfuncs(tmp.path(), &goroot)
        .args(["upgrade-config", "--legacy"])
        .arg(&file)
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains(
            "only supports legacy configuration if the first element in \"args\" is \"--config\"",
        ));
}

#[test]
fn upgrade_rejects_extra_args() {
    let tmp = project();
    let goroot = tmp.path().join("goroot");
    let file = write_config(tmp.path(), "check.yml", &legacy_args(r#"["--config", "a", "b"]"#));

    nobadfuncs(tmp.path(), &goroot)
        .args(["upgrade-config", "--legacy"])
        .arg(&file)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "only supports legacy configuration if \"args\" has exactly one element after \"--config\"",
        ));
}
