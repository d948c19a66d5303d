//! `vigil analyze` - run one frame through the analyzer.

use anyhow::{Context as _, Result};
use colored::{ColoredString, Colorize};
use tracing::debug;
use vigil::{AnalysisResult, Monitor, Provenance, RiskBand, SessionId};

use super::Context;
use crate::cli::args::AnalyzeArgs;

pub async fn execute(ctx: &Context, args: AnalyzeArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("failed to read {}", args.image.display()))?;

    let monitor = Monitor::from_config(&ctx.monitor_config())?;
    if !monitor.has_service() {
        eprintln!(
            "{} no API key configured, using mock analysis",
            "Note:".yellow().bold()
        );
    }

    let session = SessionId::new(args.session);
    debug!(session = %session, bytes = bytes.len(), base64 = args.base64, "analyzing frame");

    let record = if args.base64 {
        let frame = String::from_utf8(bytes).context("base64 frame is not valid UTF-8")?;
        monitor.submit_frame(&session, &frame).await
    } else {
        monitor.submit_image(&session, &bytes).await
    };

    if !ctx.output_format.emit(&record)? {
        print_record_pretty(&record);
    }

    Ok(())
}

fn band_colored(band: RiskBand) -> ColoredString {
    let label = band.to_string();
    match band {
        RiskBand::Low => label.green().bold(),
        RiskBand::Medium => label.yellow().bold(),
        RiskBand::High => label.red().bold(),
        RiskBand::Unknown => label.dimmed(),
    }
}

fn print_record_pretty(record: &AnalysisResult) {
    println!(
        "{} {}  {}",
        "Session:".bold(),
        record.session_id.to_string().cyan(),
        record.timestamp.to_rfc3339().dimmed()
    );
    println!("{} {}", "Fraud risk:".bold(), band_colored(record.fraud_risk));
    match record.provenance {
        Provenance::Normal => {}
        Provenance::Mock => println!("{}", "(mock analysis)".dimmed()),
        Provenance::Error => println!("{}", "(analysis failed)".red()),
    }
    println!();

    let scores = &record.scores;
    println!("{}", "Scores:".bold().underline());
    println!("  {:<26}{:>6.1}", "Facial expression", scores.facial_expression);
    println!("  {:<26}{:>6.1}", "Eye movement", scores.eye_movement);
    println!("  {:<26}{:>6.1}", "Behavioral", scores.behavioral);
    println!("  {:<26}{:>6.1}", "Authenticity confidence", scores.authenticity_confidence);

    print_list("Red flags:", &record.red_flags, |s| s.red().to_string());
    print_list("Observations:", &record.observations, ToString::to_string);
    print_list("Recommendations:", &record.recommendations, ToString::to_string);
}

fn print_list(title: &str, items: &[String], style: impl Fn(&str) -> String) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("{}", title.bold());
    for item in items {
        println!("  {} {}", "-".dimmed(), style(item));
    }
}
