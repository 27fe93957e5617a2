use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_demo_wallet_fallback_warning() {
    let mut cmd = Command::new(cargo_bin!("topup-reconciler"));
    cmd.env("RUST_LOG", "info");
    cmd.arg("intention_id=int_1&status=successful&amount=100")
        .args(["--demo-credit-after", "0"])
        .env_remove("RECONCILER_BALANCE_URL");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains(
            "No balance endpoint configured. Falling back to an in-memory demo wallet.",
        ));
}

#[test]
fn test_balance_url_from_env_skips_fallback() {
    let mut cmd = Command::new(cargo_bin!("topup-reconciler"));
    cmd.env("RUST_LOG", "info");
    cmd.arg("status=failed")
        .env("RECONCILER_BALANCE_URL", "http://127.0.0.1:9/balance");

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("Falling back").not())
        .stderr(predicate::str::contains("Reading balances over HTTP"));
}
