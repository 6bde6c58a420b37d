use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use predicates::prelude::*;

fn ecsforge(dir: &assert_fs::TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("ecsforge");
    cmd.current_dir(dir.path())
        .env_remove("ECSFORGE_ENV")
        .env_remove("ECSFORGE_CONFIG")
        .env_remove("CDK_DEFAULT_ACCOUNT")
        .env_remove("RUST_LOG");
    cmd
}

const SMALL_TABLE: &str = r#"
[settings]
format_version = 1
default_environment = "staging"

[environments.staging]
app_name = "billing"
image = "billing:1.4.2"
container_port = 3000
health_check_path = "/ready"
min_capacity = 1
max_capacity = 4
desired_count = 2
cpu = 256
memory_mib = 512
domain_name = "billing.staging.example.com"
env_file = "staging.env"

[environments.staging.env_vars]
LOG_LEVEL = "info"

[environments.staging.regions.eu-west-1]
vpc_id = "vpc-1"
subnet_ids = ["subnet-1"]
security_group_ids = ["sg-1"]
certificate_arn = "arn:aws:acm:eu-west-1:111122223333:certificate/abc"
hosted_zone_id = "ZSTAGING"
"#;

// ─── Check ──────────────────────────────────────────────────────

#[test]
fn check_builtin_table_is_valid() {
    let dir = assert_fs::TempDir::new().unwrap();

    ecsforge(&dir)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("4 environment(s) checked, all good"));
}

#[test]
fn check_reports_every_problem() {
    let dir = assert_fs::TempDir::new().unwrap();
    let broken = SMALL_TABLE
        .replace("desired_count = 2", "desired_count = 9")
        .replace("arn:aws:acm:eu-west-1", "arn:aws:acm:us-east-1")
        .replace("env_file = \"staging.env\"\n", "");
    dir.child("broken.toml").write_str(&broken).unwrap();

    ecsforge(&dir)
        .args(["check", "--config", "broken.toml"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Problems found (2)"))
        .stdout(predicate::str::contains("got 1 <= 9 <= 4"))
        .stdout(predicate::str::contains("staging/eu-west-1"))
        .stderr(predicate::str::contains("2 problem(s)"));
}

#[test]
fn deploy_refuses_invalid_environment() {
    let dir = assert_fs::TempDir::new().unwrap();
    let broken = SMALL_TABLE
        .replace("cpu = 256", "cpu = 300")
        .replace("env_file = \"staging.env\"\n", "");
    dir.child("ecsforge.toml").write_str(&broken).unwrap();

    ecsforge(&dir)
        .args(["deploy", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));

    dir.child("ecsforge.out").assert(predicate::path::missing());
}

// ─── Table discovery ────────────────────────────────────────────

#[test]
fn local_table_and_env_file_are_picked_up() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("ecsforge.toml").write_str(SMALL_TABLE).unwrap();
    dir.child("staging.env")
        .write_str("# shared\nexport FEATURE_X=on\nLOG_LEVEL=trace\n")
        .unwrap();

    ecsforge(&dir).arg("synth").assert().success();

    let template = dir.child("ecsforge.out/billing-staging-eu-west-1.template.json");
    template.assert(predicate::str::contains("\"FEATURE_X\""));
    // inline env_vars win over the file
    template.assert(predicate::str::contains("\"Value\": \"info\""));
    template.assert(predicate::str::contains("\"Value\": \"trace\"").not());
}

#[test]
fn missing_env_file_only_blocks_its_environment() {
    let dir = assert_fs::TempDir::new().unwrap();
    let start = SMALL_TABLE.find("[environments.staging]").unwrap();
    let sandbox = SMALL_TABLE[start..]
        .replace("staging", "sandbox")
        .replace("env_file = \"sandbox.env\"\n", "");
    dir.child("ecsforge.toml")
        .write_str(&format!("{SMALL_TABLE}\n{sandbox}"))
        .unwrap();

    ecsforge(&dir)
        .args(["synth", "--env", "sandbox"])
        .assert()
        .success();
    dir.child("ecsforge.out/billing-sandbox-eu-west-1.template.json")
        .assert(predicate::path::exists());

    ecsforge(&dir)
        .arg("environments")
        .assert()
        .success()
        .stdout(predicate::str::contains("staging"));

    ecsforge(&dir)
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Problems found (1)"))
        .stdout(predicate::str::contains("staging.env"));

    ecsforge(&dir)
        .args(["synth", "--env", "staging"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"))
        .stderr(predicate::str::contains("staging.env"));
}

#[test]
fn config_flag_missing_file_fails() {
    let dir = assert_fs::TempDir::new().unwrap();

    ecsforge(&dir)
        .args(["synth", "--config", "nowhere.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn config_env_var_is_honoured() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("tables/custom.toml")
        .write_str(&SMALL_TABLE.replace("env_file = \"staging.env\"\n", ""))
        .unwrap();

    ecsforge(&dir)
        .env("ECSFORGE_CONFIG", "tables/custom.toml")
        .arg("environments")
        .assert()
        .success()
        .stdout(predicate::str::contains("staging"))
        .stdout(predicate::str::contains("qa").not());
}

#[test]
fn newer_format_version_is_rejected() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("ecsforge.toml")
        .write_str(&SMALL_TABLE.replace("format_version = 1", "format_version = 7"))
        .unwrap();

    ecsforge(&dir)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("format version 7"));
}

// ─── Environments ───────────────────────────────────────────────

#[test]
fn environments_lists_builtin_table() {
    let dir = assert_fs::TempDir::new().unwrap();

    ecsforge(&dir)
        .arg("environments")
        .assert()
        .success()
        .stdout(predicate::str::contains("built-in table"))
        .stdout(predicate::str::contains("us-east-1, us-west-2"))
        .stdout(predicate::str::contains("blue-green"));
}
