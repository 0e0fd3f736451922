use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use tempotp::{render::QrPngRenderer, OtpHashAlgorithm, TotpOptions};
use tracing_subscriber::EnvFilter;

/// Print the current TOTP for a secret, write its QR code and optionally keep
/// refreshing the code.
#[derive(Parser)]
#[command(about, version)]
struct Opt {
    /// Base32 secret. A new one is generated when omitted.
    #[arg(long)]
    secret: Option<String>,
    #[arg(long)]
    issuer: Option<String>,
    #[arg(long)]
    account_name: Option<String>,
    /// One of SHA1, SHA256 or SHA512.
    #[arg(long)]
    algorithm: Option<OtpHashAlgorithm>,
    #[arg(long)]
    digits: Option<u32>,
    /// Seconds each code stays valid.
    #[arg(long)]
    period: Option<u64>,
    /// Adjacent periods accepted when verifying.
    #[arg(long)]
    window: Option<u64>,
    /// Where to write the provisioning QR code.
    #[arg(long, default_value = "totp-qr.png", value_hint = ValueHint::FilePath)]
    qr: PathBuf,
    /// Keep printing the code every second.
    #[arg(long)]
    live: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let opt = Opt::parse();

    let account = TotpOptions {
        secret: opt.secret,
        issuer: opt.issuer,
        account_name: opt.account_name,
        algorithm: opt.algorithm,
        digits: opt.digits,
        period: opt.period,
        window: opt.window,
    }
    .into_account()?;

    let cache = account.cache()?;
    let current = cache.snapshot_now()?;

    println!("Issuer:    {}", account.issuer);
    println!("Account:   {}", account.account_name);
    println!("Secret:    {}", account.secret);
    println!("Algorithm: {}", account.config.algorithm());
    println!("Digits:    {}", account.config.digits());
    println!("Period:    {} seconds", account.config.period());
    println!();
    println!("Current TOTP:   {}", current.code);
    println!("Remaining time: {} seconds", current.remaining_seconds);
    println!();
    println!("OtpAuth URI: {}", account.to_uri());

    let png = account.render(&QrPngRenderer::default())?;
    fs::write(&opt.qr, png)
        .with_context(|| format!("failed writing QR code to {}", opt.qr.display()))?;
    println!("QR code written to {}", opt.qr.display());

    if !opt.live {
        return Ok(());
    }

    println!("Starting live TOTP display (press Ctrl+C to exit)...");
    let mut stdout = io::stdout();

    loop {
        let current = cache.snapshot_now()?;
        write!(
            stdout,
            "\rCurrent TOTP: {} ({:>2}s remaining)",
            current.code, current.remaining_seconds
        )?;
        stdout.flush()?;

        thread::sleep(Duration::from_secs(1));
    }
}
