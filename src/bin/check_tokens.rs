//! Probe each configured Xueqiu token once
//!
//! Usage:
//!   cargo run --bin check_tokens
//!   cargo run --bin check_tokens -- --symbol SH600519
//!
//! Tokens are read the same way the server reads them (`XUEQIU_TOKEN`,
//! `XUEQIU_TOKEN_<n>`, `.env`). Every token is called directly, without
//! rotation, so one bad token cannot hide behind a good one.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Map, Value};
use std::time::Instant;
use xueqiu_gateway::{
    config::Settings,
    services::{catalog, Credential, TokenCredential, Upstream, XueqiuClient},
};

/// Check which Xueqiu tokens the upstream currently accepts
#[derive(Parser, Debug)]
#[command(name = "check_tokens")]
#[command(about = "Check which Xueqiu tokens the upstream currently accepts")]
struct Args {
    /// Symbol used for the probe quote
    #[arg(long, default_value = "SH000001")]
    symbol: String,

    /// Exit with a non-zero status if any token fails
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load()?;

    if settings.tokens.is_empty() {
        println!("No tokens configured. Set XUEQIU_TOKEN or XUEQIU_TOKEN_1..N.");
        return Ok(());
    }

    let client = XueqiuClient::new(settings.client_config())
        .context("Failed to build upstream HTTP client")?;

    let mut probe_args = Map::new();
    probe_args.insert("stock_code".to_string(), Value::String(args.symbol.clone()));
    let request = catalog::find("quote_detail")
        .context("probe tool missing from catalog")?
        .build_request(&probe_args)
        .map_err(|e| anyhow::anyhow!("invalid probe symbol: {}", e))?;

    println!(
        "\nProbing {} token(s) against {}\n",
        settings.tokens.len(),
        client.urls().url_for(&request)
    );

    let mut failures = 0;
    for credential in TokenCredential::from_tokens(settings.tokens.as_slice()) {
        let started = Instant::now();
        let outcome = client.fetch(&request, Some(&credential)).await;
        let elapsed_ms = started.elapsed().as_millis();

        match outcome {
            Ok(_) => println!("✅ {:<24} ok ({} ms)", describe(&credential), elapsed_ms),
            Err(err) => {
                failures += 1;
                println!("❌ {:<24} {} [{}]", describe(&credential), err, err.class());
            }
        }
    }

    println!(
        "\n{} of {} token(s) usable\n",
        settings.tokens.len() - failures,
        settings.tokens.len()
    );

    if args.strict && failures > 0 {
        anyhow::bail!("{} token(s) failed", failures);
    }

    Ok(())
}

/// Name and length only; the token value is never printed
fn describe(credential: &TokenCredential) -> String {
    format!("{} ({} chars)", credential.name(), credential.secret().chars().count())
}
