//! Authorized-key reconciliation through the public service API.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use rpi_provisioner::application::services::reconcile::reconcile;
use rpi_provisioner::domain::error::{ReconcileError, ReconcileStage};
use rpi_provisioner::domain::secret::Secret;

use crate::mocks::FakeHost;

const KEY_A: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOneOneOne alice@laptop";
const KEY_B: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABTwoTwo bob@desktop";

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn test_missing_file_is_created() {
    let host = FakeHost::new();

    let changed = reconcile(&host, "deployer", "deployers", &keys(&[KEY_A]), &Secret::new("pw"))
        .await
        .expect("reconcile");

    assert!(changed);
    assert_eq!(host.authorized_keys().as_deref(), Some(format!("{KEY_A}\n").as_str()));
    assert_eq!(host.count("chmod 700 /home/deployer/.ssh"), 1);
    assert_eq!(host.count("chmod 600 /home/deployer/.ssh/authorized_keys"), 1);
    assert_eq!(host.count("chown deployer:deployers /home/deployer/.ssh"), 2);
}

#[tokio::test]
async fn test_reconcile_twice_writes_once() {
    let host = FakeHost::new();
    let desired = keys(&[KEY_B, KEY_A, KEY_B]);
    let pw = Secret::new("pw");

    assert!(reconcile(&host, "deployer", "deployers", &desired, &pw).await.expect("first"));
    assert!(!reconcile(&host, "deployer", "deployers", &desired, &pw).await.expect("second"));
    assert_eq!(host.count("chmod 600"), 1);
}

#[tokio::test]
async fn test_extra_key_on_host_is_removed() {
    let host = FakeHost::new().with_authorized_keys(&format!("{KEY_A}\n{KEY_B}\n"));

    let changed = reconcile(&host, "deployer", "deployers", &keys(&[KEY_A]), &Secret::new("pw"))
        .await
        .expect("reconcile");

    assert!(changed);
    assert_eq!(host.authorized_keys().as_deref(), Some(format!("{KEY_A}\n").as_str()));
}

#[tokio::test]
async fn test_root_uses_root_home() {
    let host = FakeHost::new();

    reconcile(&host, "root", "root", &keys(&[KEY_A]), &Secret::new("pw"))
        .await
        .expect("reconcile");

    assert_eq!(host.count("mkdir -p /root/.ssh"), 1);
    assert_eq!(host.count("/home/root"), 0);
}

#[tokio::test]
async fn test_failed_chown_names_the_stage() {
    let host = FakeHost::new().fail_on("chown deployer:deployers /home/deployer/.ssh/authorized_keys", "chown: invalid group");

    let err = reconcile(&host, "deployer", "deployers", &keys(&[KEY_A]), &Secret::new("pw"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Stage {
            stage: ReconcileStage::ChownFile,
            ..
        }
    ));
    assert_eq!(err.to_string(), "authorized keys chown-file failed");
}

#[tokio::test]
async fn test_failed_mkdir_writes_nothing() {
    let host = FakeHost::new().fail_on("mkdir -p /home/deployer/.ssh", "mkdir: Permission denied");

    let err = reconcile(&host, "deployer", "deployers", &keys(&[KEY_A]), &Secret::new("pw"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Stage {
            stage: ReconcileStage::CreateDirectory,
            ..
        }
    ));
    assert!(host.authorized_keys().is_none());
    assert_eq!(host.calls().len(), 1);
}
