use assert_cmd::Command;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    fs::write(
        &path,
        format!(
            r#"install_dir = "{}"

[network]
bootstrap_nodes = ["enr:first-peer", "enr:second-peer"]
"#,
            dir.join("theQRL").display()
        ),
    )
    .unwrap();
    path
}

fn zond_setup() -> Command {
    let mut cmd = Command::cargo_bin("zond-setup").unwrap();
    cmd.env_remove("ZOND_SETUP_CONFIG");
    cmd
}

#[test]
fn render_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let first = zond_setup()
        .args(["render", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    let second = zond_setup()
        .args(["render", "--config"])
        .arg(&config)
        .output()
        .unwrap();

    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);

    let stdout = String::from_utf8(first.stdout).unwrap();
    assert!(stdout.contains("# ==> start-gzond.sh <=="));
    assert!(stdout.contains("exec ./gzond \\"));
    assert!(stdout.contains("--bootstrap-node=enr:first-peer \\"));
    assert!(stdout.contains("--bootstrap-node=enr:second-peer\n"));
    assert!(stdout.contains("# ==> zond-beacon.service <=="));
    assert!(stdout.contains(&format!(
        "ExecStart=\"{}\"",
        dir.path().join("theQRL").join("start-beacon.sh").display()
    )));
}

#[test]
fn render_to_directory_writes_four_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let out = dir.path().join("rendered");

    zond_setup()
        .env("ZOND_SETUP_CONFIG", &config)
        .args(["render", "--out"])
        .arg(&out)
        .assert()
        .success();

    for name in ["start-gzond.sh", "start-beacon.sh"] {
        let mode = fs::metadata(out.join(name)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755, "{name}");
    }
    for name in ["zond-gzond.service", "zond-beacon.service"] {
        assert!(out.join(name).is_file(), "{name}");
    }
}

#[test]
fn config_prints_effective_toml() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = zond_setup()
        .args(["config", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let parsed = zond_setup_lib::InstallerConfig::from_toml_str(&stdout).unwrap();
    assert_eq!(parsed.install_root(), dir.path().join("theQRL"));
    assert_eq!(parsed.requirements.min_storage_gb, 50);
    assert_eq!(parsed.network.bootstrap_nodes.len(), 2);
}

#[test]
fn missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    zond_setup()
        .args(["config", "--config"])
        .arg(dir.path().join("absent.toml"))
        .assert()
        .failure()
        .code(1);
}

#[test]
fn force_reinstall_without_yes_is_rejected() {
    zond_setup()
        .args(["install", "--force-reinstall"])
        .assert()
        .failure();
}
