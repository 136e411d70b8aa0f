use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("chatshop"));
    cmd.arg("tests/fixtures/products.json")
        .arg("tests/fixtures/session.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("product,name,stock"))
        // Two teas sold once despite the repeated payment
        .stdout(predicate::str::contains("tea,Green Tea,8"))
        // The teapot order expired before it was paid
        .stdout(predicate::str::contains("pot,Clay Teapot,1"))
        .stdout(predicate::str::contains("intent,user,total,status,charge"))
        .stdout(predicate::str::is_match(r"pay_\d+_1_\d+,1,100,committed,ch_pay_")?)
        .stdout(predicate::str::is_match(r"pay_\d+_2_\d+,2,300,expired,\n")?);

    Ok(())
}

#[test]
fn test_cli_reports_bad_rows_and_continues() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "user,chat,action").unwrap();
    writeln!(file, "1,100,dance").unwrap();
    writeln!(file, "x,100,checkout").unwrap();
    writeln!(file, "1,100,add_cart:tea").unwrap();
    writeln!(file, "1,100,checkout").unwrap();

    let mut cmd = Command::new(cargo_bin!("chatshop"));
    cmd.arg("tests/fixtures/products.json").arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading event"))
        .stdout(predicate::str::contains("tea,Green Tea,10"))
        .stdout(predicate::str::contains(",1,50,pending,"));
}

#[test]
fn test_cli_survives_huge_sweep_ages() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "user,chat,action").unwrap();
    writeln!(file, "1,100,add_cart:tea").unwrap();
    writeln!(file, "1,100,checkout").unwrap();
    writeln!(file, "1,100,reap:999999999999999").unwrap();
    writeln!(file, "1,100,reap:-999999999999999").unwrap();

    let mut cmd = Command::new(cargo_bin!("chatshop"));
    cmd.arg("tests/fixtures/products.json")
        .arg(file.path())
        .arg("--pending-ttl-minutes")
        .arg("999999999999999");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(",1,50,expired,"));
}

#[test]
fn test_cli_persists_stock() {
    let mut events = NamedTempFile::new().unwrap();
    writeln!(events, "user,chat,action").unwrap();
    writeln!(events, "1,100,add_cart:pot").unwrap();
    writeln!(events, "1,100,checkout").unwrap();
    writeln!(events, "1,100,pay").unwrap();
    let stock_file = NamedTempFile::new().unwrap();

    let mut cmd = Command::new(cargo_bin!("chatshop"));
    cmd.arg("tests/fixtures/products.json")
        .arg(events.path())
        .arg("--persist-stock")
        .arg(stock_file.path());
    cmd.assert().success();

    let written = std::fs::read_to_string(stock_file.path()).unwrap();
    let products: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(products[1]["id"], "pot");
    assert_eq!(products[1]["stock"], 0);
}

#[test]
fn test_cli_missing_catalog_fails() {
    let mut cmd = Command::new(cargo_bin!("chatshop"));
    cmd.arg("tests/fixtures/no_such_catalog.json")
        .arg("tests/fixtures/session.csv");
    cmd.assert().failure();
}
