mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::{provider_config, start_mock_provider};
use predicates::prelude::*;
use serde_json::{Value, json};
use std::io::Write;
use std::process::Command;

fn write_config(base_url: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let config = json!({
        "posted_by": "cli-test",
        "providers": [provider_config(base_url)],
    });
    write!(file, "{}", config).unwrap();
    file
}

#[test]
fn test_invalid_provider_reports_failure() {
    let mut cmd = Command::new(cargo_bin!("momo-gateway"));
    cmd.args([
        "deposit",
        "--provider",
        "MPESA",
        "--client",
        "CDS-1",
        "--amount",
        "5",
        "--msisdn",
        "71234567",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"success\": false"))
        .stdout(predicate::str::contains("Invalid provider: MPESA"));
}

#[test]
fn test_unconfigured_provider_reports_failure() {
    let mut cmd = Command::new(cargo_bin!("momo-gateway"));
    cmd.args([
        "withdraw",
        "--provider",
        "btc",
        "--client",
        "CDS-1",
        "--amount",
        "5",
        "--msisdn",
        "71234567",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("BTC provider not configured"));
}

#[test]
fn test_rejects_non_positive_amount() {
    let mut cmd = Command::new(cargo_bin!("momo-gateway"));
    cmd.args([
        "deposit",
        "--provider",
        "BTC",
        "--client",
        "CDS-1",
        "--amount",
        "-1",
        "--msisdn",
        "71234567",
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Amount must be positive"));
}

#[test]
fn test_unknown_transaction_fails() {
    let mut cmd = Command::new(cargo_bin!("momo-gateway"));
    cmd.args(["transaction", "DEP-NOPE", "--original"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Transaction DEP-NOPE not found"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deposit_end_to_end() {
    let provider = start_mock_provider().await;
    let config = write_config(&provider.base_url());
    let config_path = config.path().to_path_buf();

    let output = tokio::task::spawn_blocking(move || {
        Command::new(cargo_bin!("momo-gateway"))
            .arg("--config")
            .arg(&config_path)
            .args([
                "deposit",
                "--provider",
                "BTC",
                "--client",
                "CDS-1",
                "--amount",
                "50.00",
                "--msisdn",
                "71234567",
            ])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success());
    let response: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(response["status"], "PAUSED");
    assert_eq!(response["transactionReference"], "PRV1");
    assert!(
        response["originalTransactionReference"]
            .as_str()
            .unwrap()
            .starts_with("DEP-")
    );
    assert_eq!(provider.state.merchantpay_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_processes_rows_and_reports_bad_ones() {
    let provider = start_mock_provider().await;
    let config = write_config(&provider.base_url());
    let config_path = config.path().to_path_buf();

    let mut batch = tempfile::NamedTempFile::new().unwrap();
    writeln!(batch, "operation, provider, client, amount, msisdn").unwrap();
    writeln!(batch, "deposit, BTC, CDS-1, 50.00, 71234567").unwrap();
    writeln!(batch, "refund, BTC, CDS-1, 1.00, 71234567").unwrap();
    writeln!(batch, "withdraw, BTC, CDS-2, 20, 72000000").unwrap();
    writeln!(batch, "deposit, MPESA, CDS-3, 5, 73000000").unwrap();
    let batch_path = batch.path().to_path_buf();

    let output = tokio::task::spawn_blocking(move || {
        Command::new(cargo_bin!("momo-gateway"))
            .arg("--config")
            .arg(&config_path)
            .arg("batch")
            .arg(&batch_path)
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("line,operation,provider"));
    assert!(lines[1].starts_with("1,deposit,BTC,CDS-1,50.00,true,PAUSED,DEP-"));
    assert!(lines[2].starts_with("2,,,,,false,"));
    assert!(lines[3].starts_with("3,withdraw,BTC,CDS-2,20.00,true,SUCCESS,WD-"));
    assert!(lines[4].starts_with("4,deposit,MPESA,CDS-3,5.00,false,"));
    assert!(lines[4].ends_with("Invalid provider: MPESA"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error reading instruction"));
    assert_eq!(provider.state.auth_calls(), 1);
}
