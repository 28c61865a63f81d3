//! Integration tests for buildchain

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// Binary isolated from user config, tokens and CI variables
    fn buildchain(home: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("buildchain");
        cmd.env("BUILDCHAIN_CONFIG", home.join("config.toml"))
            .env_remove("GITHUB_TOKEN")
            .env_remove("GITHUB_OUTPUT")
            .env_remove("GITHUB_REPOSITORY")
            .env_remove("GITHUB_SHA")
            .env_remove("GITHUB_WORKSPACE")
            .env_remove("RUST_LOG")
            .current_dir(home);
        cmd
    }

    #[test]
    fn help_displays() {
        let home = TempDir::new().unwrap();
        buildchain(home.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("CI package builder"));
    }

    #[test]
    fn version_displays() {
        let home = TempDir::new().unwrap();
        buildchain(home.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("buildchain"));
    }

    #[test]
    fn key_for_commit_needs_no_network() {
        let home = TempDir::new().unwrap();
        let sha = "0123456789abcdef0123456789abcdef01234567";
        buildchain(home.path())
            .args([
                "key",
                "ecmwf/eckit",
                "--ref",
                sha,
                "--os",
                "linux",
                "--compiler",
                "gnu",
                "--dep",
                "ecbuild=abc",
                "--show-input",
            ])
            .assert()
            .success()
            .stdout(predicate::str::is_match("^linux-gnu-eckit-[0-9a-f]{40}\n").unwrap())
            .stdout(predicate::str::contains(format!("::eckit={}::ecbuild=abc", sha)));
    }

    #[test]
    fn key_is_stable_across_invocations() {
        let home = TempDir::new().unwrap();
        let args = [
            "key",
            "ecmwf/eckit",
            "--ref",
            "0123456789abcdef0123456789abcdef01234567",
            "--build-options",
            "-DB=2 -DA=1",
        ];
        let first = buildchain(home.path()).args(args).output().unwrap();
        let second = buildchain(home.path()).args(args).output().unwrap();
        assert!(first.status.success());
        assert_eq!(first.stdout, second.stdout);
    }

    #[test]
    fn deps_prints_closure() {
        let home = TempDir::new().unwrap();
        let tree = home.path().join("tree.json");
        std::fs::write(
            &tree,
            r#"{"atlas": ["fckit"], "fckit": ["eckit"], "eckit": ["ecbuild"]}"#,
        )
        .unwrap();

        buildchain(home.path())
            .args(["deps", "atlas", "--tree"])
            .arg(&tree)
            .assert()
            .success()
            .stdout("ecbuild\neckit\nfckit\n");
    }

    #[test]
    fn deps_rejects_missing_tree() {
        let home = TempDir::new().unwrap();
        buildchain(home.path())
            .args(["deps", "atlas", "--tree", "missing.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn run_reports_malformed_dependency_verbatim() {
        let home = TempDir::new().unwrap();
        buildchain(home.path())
            .args([
                "run",
                "--repository",
                "owner/repo",
                "--ref",
                "main",
                "--dependency",
                "owner-repo@branch",
            ])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains(
                "Unexpected dependency name, must be in '[packageName:]owner/repo[@branch]' format: owner-repo@branch",
            ))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn run_reports_malformed_option_line_verbatim() {
        let home = TempDir::new().unwrap();
        buildchain(home.path())
            .args([
                "run",
                "--repository",
                "owner/repo",
                "--ref",
                "main",
                "--dependency-options",
                "repo1 -DX=1",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "Unexpected CMake option, must be in 'packageName: option' format: repo1 -DX=1",
            ));
    }

    #[test]
    fn config_show() {
        let home = TempDir::new().unwrap();
        buildchain(home.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("dependency_branch = \"develop\""));
    }

    #[test]
    fn config_path_follows_flag() {
        let home = TempDir::new().unwrap();
        buildchain(home.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join("config.toml"), "[general\n").unwrap();
        buildchain(home.path())
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn config_init_local_writes_once() {
        let home = TempDir::new().unwrap();
        let target = home.path().join("buildchain.toml");

        buildchain(home.path())
            .args(["config", "init", "--local"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Configuration initialized"));
        let written = std::fs::read_to_string(&target).unwrap();
        assert!(written.contains("[build]"));

        std::fs::write(&target, "# edited\n").unwrap();
        buildchain(home.path())
            .args(["config", "init", "--local"])
            .assert()
            .success()
            .stderr(predicate::str::contains("--force"));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "# edited\n");
    }

    #[test]
    fn config_init_replaces_broken_config_when_forced() {
        let home = TempDir::new().unwrap();
        let path = home.path().join("config.toml");
        std::fs::write(&path, "[general\n").unwrap();

        buildchain(home.path())
            .args(["config", "init", "--force"])
            .assert()
            .success();

        buildchain(home.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("dependency_branch = \"develop\""));
    }

    #[test]
    fn completions_generate() {
        let home = TempDir::new().unwrap();
        buildchain(home.path())
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("buildchain"));
    }
}
