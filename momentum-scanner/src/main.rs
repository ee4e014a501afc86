//! momentum-scan: daily Trend Template + VCP scan.
//!
//! Meant to run once after the close on trading days (e.g. from a systemd
//! timer). Exits 0 on weekends and exchange holidays.

use anyhow::Result;
use momentum_common::config::Config;
use momentum_common::logging::init_logging;
use momentum_scanner::{MomentumScanner, ProgressEvent, ScanOutcome};

/// Qualifying stocks printed after the summary.
const TOP_QUALIFYING: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load_with_env()?;
    config.validate()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Momentum Scanner v{}", env!("CARGO_PKG_VERSION"));

    let scanner = MomentumScanner::new(config)?;
    tracing::info!(db_path = %scanner.storage().db_path().display(), "Storage ready");

    let print_progress = |event: &ProgressEvent| println!("  {}", event);

    let report = match scanner.run_today(&print_progress).await? {
        ScanOutcome::Skipped { date, reason } => {
            println!("Skipping scan: {} ({})", reason, date);
            return Ok(());
        }
        ScanOutcome::Completed(report) => report,
    };

    for path in scanner.save_reports(&report)? {
        println!("Report saved: {}", path.display());
    }

    if let Some(error) = &report.error_message {
        eprintln!("Scan failed: {}", error);
        std::process::exit(1);
    }

    println!("\nScan complete:");
    for line in report.summary_lines() {
        println!("  {}", line);
    }

    if !report.qualifying.is_empty() {
        println!("\nTop qualifying stocks (by RS rating):");
        for s in report.top(TOP_QUALIFYING) {
            println!(
                "  {}: RS={:.1} Close={} {}",
                s.symbol,
                s.rs_rating,
                s.close.map(|c| format!("{:.2}", c)).unwrap_or_else(|| "-".into()),
                s.chart_link()
            );
        }
    }

    if !report.vcp_candidates.is_empty() {
        println!("\nVCP candidates:");
        for v in &report.vcp_candidates {
            println!(
                "  {}: {} Pivot={:.2} ({:.1}% away)",
                v.symbol, v.notation, v.pivot_price, v.pct_from_pivot
            );
        }
    }

    if !report.breakouts.is_empty() {
        println!("\nBreakouts today:");
        for b in &report.breakouts {
            println!(
                "  {}: Price={:.2} Vol={:.2}x Stop={:.2}",
                b.symbol, b.breakout_price, b.volume_ratio, b.suggested_stop
            );
        }
    }

    Ok(())
}
