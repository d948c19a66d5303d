//! `vigil parse` - score a saved raw model answer offline.

use anyhow::{Context as _, Result};
use colored::Colorize;
use tokio::io::AsyncReadExt;
use vigil::{parse_response, ParseMethod, ParsedAnalysis};

use super::Context;
use crate::cli::args::ParseArgs;

pub async fn execute(ctx: &Context, args: &ParseArgs) -> Result<()> {
    let raw = if args.file.as_os_str() == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("failed to read stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(&args.file)
            .await
            .with_context(|| format!("failed to read {}", args.file.display()))?
    };

    let parsed = parse_response(&raw);

    if !ctx.output_format.emit(&parsed)? {
        print_parsed_pretty(&parsed);
    }

    Ok(())
}

fn print_parsed_pretty(parsed: &ParsedAnalysis) {
    let method = match parsed.method {
        ParseMethod::Structured => "structured JSON".green(),
        ParseMethod::Lenient => "lenient number scraping".yellow(),
    };
    println!("{} {}", "Parsed via:".bold(), method);
    println!("{} {}", "Fraud risk:".bold(), parsed.fraud_risk);
    println!(
        "{} facial {:.1}, eye {:.1}, behavioral {:.1}, authenticity {:.1} (mean {:.2})",
        "Scores:".bold(),
        parsed.scores.facial_expression,
        parsed.scores.eye_movement,
        parsed.scores.behavioral,
        parsed.scores.authenticity_confidence,
        parsed.scores.average()
    );
    println!("{} {}", "Red flags:".bold(), parsed.red_flags.join(", "));
    for observation in &parsed.observations {
        println!("  {} {}", "-".dimmed(), observation);
    }
}
