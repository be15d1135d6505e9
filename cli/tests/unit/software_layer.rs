//! Software layer behavior against a simulated host.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use tokio_util::sync::CancellationToken;

use rpi_provisioner::application::services::orchestrator::run_layer;
use rpi_provisioner::application::services::software::{self, SoftwareEnv};
use rpi_provisioner::domain::error::LayerError;
use rpi_provisioner::domain::report::{LayerReport, StepOutcome, TailOutcome};
use rpi_provisioner::domain::secret::Secret;
use rpi_provisioner::domain::settings::SoftwareSettings;

use crate::mocks::{FakeHost, RecordingReporter};

fn env(sudo_password: &str) -> SoftwareEnv {
    SoftwareEnv {
        settings: SoftwareSettings {
            user: "deployer".to_string(),
            sudo_password: Secret::new(sudo_password),
        },
    }
}

async fn run(host: &FakeHost, env: &SoftwareEnv) -> Result<LayerReport, LayerError> {
    run_layer(
        host,
        env,
        &software::plan(),
        &RecordingReporter::default(),
        &CancellationToken::new(),
    )
    .await
}

#[tokio::test]
async fn test_fresh_host_installs_everything() {
    let host = FakeHost::new();

    let report = run(&host, &env("")).await.expect("layer succeeds");

    let names: Vec<&str> = report.steps.iter().map(|r| r.step).collect();
    assert_eq!(
        names,
        ["package-index", "packages", "fish", "docker", "docker-compose"]
    );
    assert!(report.steps.iter().all(|r| r.outcome == StepOutcome::Applied));
    assert_eq!(report.tail, TailOutcome::Skipped);
    for binary in ["fish", "docker", "docker-compose"] {
        assert!(host.has_binary(binary), "{binary} not installed");
    }
    assert_eq!(host.count("fish_add_path /home/deployer/.local/bin"), 1);
}

#[tokio::test]
async fn test_second_run_only_refreshes_packages() {
    let host = FakeHost::new();
    run(&host, &env("")).await.expect("first run");
    host.clear_calls();

    let report = run(&host, &env("")).await.expect("second run");

    for step in ["fish", "docker", "docker-compose"] {
        assert_eq!(
            report.outcome(step),
            Some(&StepOutcome::AlreadySatisfied),
            "{step}"
        );
    }
    assert_eq!(host.count("chsh"), 0);
    assert_eq!(host.count("get-docker.sh"), 0);
    assert_eq!(host.count("pip install"), 0);
    assert_eq!(host.count("apt-get update"), 1);
}

#[tokio::test]
async fn test_path_not_persisted_twice() {
    let host = FakeHost::new().with_local_bin_on_path();

    run(&host, &env("")).await.expect("layer succeeds");

    assert_eq!(host.count("fish_add_path"), 0);
    assert!(host.has_binary("docker-compose"));
}

#[tokio::test]
async fn test_preinstalled_docker_is_left_alone() {
    let host = FakeHost::new().with_binary("docker");

    let report = run(&host, &env("")).await.expect("layer succeeds");

    assert_eq!(report.outcome("docker"), Some(&StepOutcome::AlreadySatisfied));
    assert_eq!(report.outcome("fish"), Some(&StepOutcome::Applied));
    assert_eq!(host.count("usermod -aG docker"), 0);
}

#[tokio::test]
async fn test_upgrade_failure_stops_before_packages() {
    let host = FakeHost::new().fail_on("apt-get upgrade", "E: dpkg was interrupted");

    let err = run(&host, &env("")).await.unwrap_err();

    assert_eq!(err.step(), "package-index");
    assert!(format!("{:#}", anyhow::Error::from(err)).contains("dpkg was interrupted"));
    assert_eq!(host.count("apt-get install"), 0);
    assert!(!host.has_binary("fish"));
}

#[tokio::test]
async fn test_sudo_password_is_piped_not_logged() {
    let host = FakeHost::new().fail_on("build-essential", "E: Unable to locate package");

    let err = run(&host, &env("hunter2-sudo")).await.unwrap_err();

    assert_eq!(err.step(), "packages");
    assert!(host.count("printf '%s\\n' hunter2-sudo | sudo -S -p ''") >= 3);
    assert!(!format!("{:#}", anyhow::Error::from(err)).contains("hunter2-sudo"));
}
