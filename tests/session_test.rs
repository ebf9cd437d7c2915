mod common;

use anyhow::Result;
use common::{ALICE, BOB, balance_of, income, test_service};
use saldo::application::LedgerService;
use saldo::cli::{LoopControl, OutputFormat, RunMode, Session};
use std::fs;
use tempfile::TempDir;

async fn run_script(
    service: &LedgerService,
    format: OutputFormat,
    mode: RunMode,
    script: &str,
) -> Result<String> {
    let mut session = Session::new(service, ALICE, format);
    let mut out = Vec::new();
    session.run(script.as_bytes(), &mut out, mode).await?;
    Ok(String::from_utf8(out)?)
}

#[tokio::test]
async fn test_script_records_entries() -> Result<()> {
    let service = test_service();
    let script = "\
# opening balance
add income 100 Monthly salary

add expense 25.50 \"Coffee beans\"
list
";
    let output = run_script(&service, OutputFormat::Text, RunMode::Strict, script).await?;

    assert!(output.contains("Created entry #1: income 100.00 \"Monthly salary\""));
    assert!(output.contains("Created entry #2: expense 25.50 \"Coffee beans\""));
    assert!(output.contains("Balance: 74.50"));
    assert!(output.contains("2 entries | income 100.00 | expense 25.50 | balance 74.50"));
    assert_eq!(balance_of(&service, ALICE).await?, 7_450);

    Ok(())
}

#[tokio::test]
async fn test_strict_mode_stops_at_first_failure() -> Result<()> {
    let service = test_service();
    let script = "\
add income 10 Pocket money
add expense 50 Concert tickets
add income 10 Never reached
";
    let err = run_script(&service, OutputFormat::Text, RunMode::Strict, script)
        .await
        .unwrap_err();

    let message = format!("{:#}", err);
    assert!(message.starts_with("Line 2: add expense 50 Concert tickets"));
    assert!(message.contains("short by 40.00"));
    assert_eq!(service.list_entries(ALICE).await?.entries.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_keep_going_reports_and_continues() -> Result<()> {
    let service = test_service();
    let script = "\
add income 10 Pocket money
add expense 50 Concert tickets
show 99
add income 1.234 Too precise
add income 10 Allowance
";
    let output = run_script(&service, OutputFormat::Text, RunMode::KeepGoing, script).await?;

    assert!(output.contains("error: Insufficient balance for an expense of 50.00"));
    assert!(output.contains("error: Entry not found: 99"));
    assert!(output.contains("more than two decimal places"));
    assert!(output.contains("Created entry #2: income 10.00 \"Allowance\""));
    assert_eq!(balance_of(&service, ALICE).await?, 2_000);

    Ok(())
}

#[tokio::test]
async fn test_owner_switch_scopes_commands() -> Result<()> {
    let service = test_service();
    income(&service, BOB, 5_000).await?;

    let script = "\
add income 10 Alice salary
owner 2
list
show 2
owner
";
    let output = run_script(&service, OutputFormat::Text, RunMode::KeepGoing, script).await?;

    assert!(output.contains("Acting as owner 2"));
    assert!(output.contains("1 entries | income 50.00 | expense 0.00 | balance 50.00"));
    // entry 2 belongs to Alice and is invisible to Bob
    assert!(output.contains("error: Entry not found: 2"));
    assert_eq!(output.matches("Acting as owner 2").count(), 2);

    Ok(())
}

#[tokio::test]
async fn test_json_output() -> Result<()> {
    let service = test_service();
    let script = "\
add income 80 Freelance job
add expense 30 Train tickets
summary
";
    let output = run_script(&service, OutputFormat::Json, RunMode::Strict, script).await?;

    let documents: Vec<serde_json::Value> = serde_json::Deserializer::from_str(&output)
        .into_iter::<serde_json::Value>()
        .collect::<Result<_, _>>()?;
    assert_eq!(documents.len(), 3);
    assert_eq!(documents[0]["entry"]["kind"], "income");
    assert_eq!(documents[1]["current_balance"], 5_000);
    assert_eq!(documents[2]["balance"], 5_000);
    assert_eq!(documents[2]["entry_count"], 2);
    assert_eq!(documents[2]["recent_entries"][0]["id"], 2);

    Ok(())
}

#[tokio::test]
async fn test_update_and_delete() -> Result<()> {
    let service = test_service();
    let script = "\
add income 100 Salary
add expense 20 Groceries
update 2 --amount 120
update 2 --description \"Weekly groceries\"
delete 1
balance
";
    let output = run_script(&service, OutputFormat::Text, RunMode::KeepGoing, script).await?;

    assert!(output.contains("short by 20.00"));
    assert!(output.contains("Updated entry #2: expense 20.00 \"Weekly groceries\""));
    assert!(output.contains("Deleted entry #1: income 100.00 \"Salary\""));
    assert!(output.contains("Balance:        -20.00"));

    Ok(())
}

#[tokio::test]
async fn test_exit_ends_session() -> Result<()> {
    let service = test_service();
    let output = run_script(
        &service,
        OutputFormat::Text,
        RunMode::Strict,
        "add income 10 Allowance\nquit\nadd income 10 Ignored\n",
    )
    .await?;

    assert_eq!(output.matches("Created entry").count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_interactive_prompt_and_help() -> Result<()> {
    let service = test_service();
    let output = run_script(&service, OutputFormat::Text, RunMode::Interactive, "help\n").await?;

    assert!(output.starts_with("saldo[1]> "));
    assert!(output.contains("add"));
    assert!(output.contains("summary"));
    // one prompt per line plus the final one at end of input
    assert_eq!(output.matches("saldo[1]> ").count(), 2);

    Ok(())
}

#[tokio::test]
async fn test_execute_line_signals_exit() -> Result<()> {
    let service = test_service();
    let mut session = Session::new(&service, ALICE, OutputFormat::Text);
    let mut out = Vec::new();

    assert_eq!(
        session.execute_line("exit", &mut out).await?,
        LoopControl::Exit
    );
    assert_eq!(
        session.execute_line("owner 2", &mut out).await?,
        LoopControl::Continue
    );
    assert_eq!(session.owner(), BOB);

    Ok(())
}

#[tokio::test]
async fn test_export_and_import_files() -> Result<()> {
    let temp = TempDir::new()?;
    let csv_path = temp.path().join("alice.csv");
    let json_path = temp.path().join("alice.json");

    let service = test_service();
    let script = format!(
        "\
add income 300 Salary
add expense 120 Rent share
export --output {csv}
export --format json --output {json}
owner 2
import {csv} --dry-run
import {csv}
",
        csv = csv_path.display(),
        json = json_path.display()
    );
    let output = run_script(&service, OutputFormat::Text, RunMode::Strict, &script).await?;

    assert!(output.contains("Exported 2 entries to"));
    assert!(output.contains("Validated 2 entries (0 would be skipped for insufficient balance, dry run)"));
    assert!(output.contains("Imported 2 entries (0 skipped for insufficient balance)"));
    assert_eq!(balance_of(&service, BOB).await?, 18_000);

    let snapshot: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path)?)?;
    assert_eq!(snapshot["owner"], 1);
    assert_eq!(snapshot["summary"]["balance"], 18_000);

    Ok(())
}
