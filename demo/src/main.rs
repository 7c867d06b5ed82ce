//! CUSTOS Healthcare Compliance — Demo CLI
//!
//! Runs one or all of the three demo scenarios. Each scenario uses real
//! CUSTOS components (permission checker, PHI recorder, chained audit
//! store, analysis suite) wired together with simulated clinic traffic.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- access-control
//!   cargo run -p demo -- audit-trail
//!   cargo run -p demo -- compliance

mod scenarios;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scenarios::{access_control, audit_trail, compliance};

// ── CLI definition ────────────────────────────────────────────────────────────

/// CUSTOS — PHI access control and compliance audit demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "CUSTOS healthcare compliance demo",
    long_about = "Runs CUSTOS demo scenarios showing permission evaluation,\n\
                  tamper-evident audit recording, inline pattern detection,\n\
                  and compliance reporting."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three scenarios in sequence.
    RunAll,
    /// Scenario 1: permission decisions against the demo policy.
    AccessControl,
    /// Scenario 2: tamper-evident audit trail with inline detection.
    AuditTrail,
    /// Scenario 3: compliance report, integrity analysis, risk scoring.
    Compliance,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Structured logging. Set RUST_LOG=debug for decision-level detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::AccessControl => access_control::run_scenario(),
        Command::AuditTrail => audit_trail::run_scenario(),
        Command::Compliance => compliance::run_scenario(),
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_all() -> custos_contracts::error::CustosResult<()> {
    access_control::run_scenario()?;
    audit_trail::run_scenario()?;
    compliance::run_scenario()?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("CUSTOS — PHI Access Control & Compliance Audit");
    println!("Healthcare Demo");
    println!("==============================================");
    println!();
    println!("CUSTOS pipeline per PHI operation:");
    println!("  [1] Permission checker evaluates (role, resource, action, conditions)");
    println!("  [2] Operation runs only after an explicit allow");
    println!("  [3] Audit entry durably written to the SHA-256 hash chain (fail-closed)");
    println!("  [4] Pattern detector scans the user's recent window (best-effort)");
    println!("  [5] Detected patterns append a linked VIOLATION entry");
    println!();
}
