use std::path::{Path, PathBuf};

use anyhow::Result;
use identity_sight::{
    model::{AccountStatus, OrganizationAccount, PrincipalType},
    provider::snapshot::{
        Snapshot, SnapshotAssignment, SnapshotInstance, SnapshotPermissionSet, SnapshotProvider,
    },
    run, ReportError, RunOptions,
};
use tempfile::TempDir;

const INSTANCE: &str = "arn:aws:sso:::instance/ssoins-1";
const ADMIN: &str = "arn:aws:sso:::permissionSet/ssoins-1/ps-1";

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/org_snapshot.json")
}

fn options(dir: &TempDir) -> RunOptions {
    RunOptions { output_dir: dir.path().to_path_buf(), quiet: true, ..RunOptions::default() }
}

fn account(id: &str, name: &str) -> OrganizationAccount {
    OrganizationAccount { id: id.into(), name: name.into(), status: AccountStatus::Active }
}

fn user_on(account_id: &str, user: &str) -> SnapshotAssignment {
    SnapshotAssignment {
        account_id: account_id.into(),
        permission_set_arn: ADMIN.into(),
        principal_type: PrincipalType::User,
        principal_id: user.into(),
    }
}

fn three_accounts() -> Snapshot {
    Snapshot {
        accounts: vec![account("1", "One"), account("2", "Two"), account("3", "Three")],
        instances: vec![SnapshotInstance {
            instance_arn: INSTANCE.into(),
            identity_store_id: "d-1".into(),
            name: None,
            owner_account_id: None,
        }],
        permission_sets: vec![SnapshotPermissionSet { arn: ADMIN.into(), name: "Admin".into() }],
        assignments: vec![user_on("1", "u-1"), user_on("2", "u-2"), user_on("3", "u-3")],
        users: [("u-1", "one"), ("u-2", "two"), ("u-3", "three")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        ..Snapshot::default()
    }
}

#[tokio::test]
async fn deleted_group_and_user_rows_render_beta_before_alpha() -> Result<()> {
    let dir = TempDir::new()?;
    let provider = SnapshotProvider::from_path(&fixture_path())?.with_page_size(1);

    let summary = run(&provider, &options(&dir)).await?;
    assert_eq!(summary.accounts, 2);
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.instance_name, "corp-identity");

    let file_name = summary.report_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("sso_report_Account_Assignments_"));
    assert!(file_name.ends_with(".html"));

    let html = std::fs::read_to_string(&summary.report_path)?;
    assert!(html.contains("AWS Identity Center Assignment Report - corp-identity"));
    assert_eq!(html.matches("<table").count(), 2);
    assert!(!html.contains("Closed"));

    let beta = html.find("<h2>Beta</h2>").expect("Beta section");
    let alpha = html.find("<h2>Alpha</h2>").expect("Alpha section");
    assert!(beta < alpha);

    let deleted = html.find("<tr><td>GROUP</td><td>DELETED-GROUP</td><td>Admin</td></tr>").unwrap();
    let alice = html.find("<tr><td>USER</td><td>alice@example.com</td><td>Admin</td></tr>").unwrap();
    assert!(beta < deleted && deleted < alpha);
    assert!(alpha < alice);
    Ok(())
}

#[tokio::test]
async fn break_after_limits_report_to_first_account() -> Result<()> {
    let dir = TempDir::new()?;
    let provider = SnapshotProvider::new(three_accounts());
    let options = RunOptions { break_after: Some(1), ..options(&dir) };

    let summary = run(&provider, &options).await?;
    assert_eq!(summary.rows, 1);

    let html = std::fs::read_to_string(&summary.report_path)?;
    assert!(html.contains("<h2>One</h2>"));
    assert!(!html.contains("<h2>Two</h2>"));
    assert!(!html.contains("<h2>Three</h2>"));
    Ok(())
}

#[tokio::test]
async fn json_export_matches_report_rows() -> Result<()> {
    let dir = TempDir::new()?;
    let json_out = dir.path().join("rows.json");
    let provider = SnapshotProvider::new(three_accounts());
    let options = RunOptions { json_out: Some(json_out.clone()), ..options(&dir) };

    run(&provider, &options).await?;

    let rows: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(json_out)?)?;
    let names: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["principal_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["one", "two", "three"]);
    Ok(())
}

#[tokio::test]
async fn missing_user_aborts_without_a_report() -> Result<()> {
    let dir = TempDir::new()?;
    let mut snapshot = three_accounts();
    snapshot.users.remove("u-2");
    let provider = SnapshotProvider::new(snapshot);

    let err = run(&provider, &options(&dir)).await.unwrap_err();
    match err {
        ReportError::Provider(inner) => assert!(inner.is_not_found()),
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn multiple_instances_need_explicit_selection() -> Result<()> {
    let dir = TempDir::new()?;
    let mut snapshot = three_accounts();
    snapshot.instances.push(SnapshotInstance {
        instance_arn: "arn:aws:sso:::instance/ssoins-2".into(),
        identity_store_id: "d-2".into(),
        name: Some("second".into()),
        owner_account_id: None,
    });
    let provider = SnapshotProvider::new(snapshot);

    let err = run(&provider, &options(&dir)).await.unwrap_err();
    assert!(matches!(err, ReportError::AmbiguousInstance { ref arns } if arns.len() == 2));

    let chosen = RunOptions { instance_arn: Some(INSTANCE.into()), ..options(&dir) };
    let summary = run(&provider, &chosen).await?;
    assert_eq!(summary.instance_name, "d-1");
    assert_eq!(summary.rows, 3);
    Ok(())
}
