//! Command implementations.

use std::path::Path;

use regval::{Analysis, Pipeline, Severity, parse_observed, render, verify};
use tracing::{error, info};

use crate::cli::{AnalysisArgs, Cli, Commands, EXIT_FAILURE, EXIT_SUCCESS, FormatArg};
use crate::terminal;

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Analyze {
            input,
            format,
            analysis,
        } => cmd_analyze(input, *format, analysis, cli.silent),
        Commands::Verify {
            input,
            observed,
            analysis,
        } => cmd_verify(input, observed, analysis),
    }
}

fn run_pipeline(input: &Path, args: &AnalysisArgs) -> Option<Analysis> {
    info!(input = %input.display(), "analyzing");
    let pipeline = Pipeline::new(args.config()).with_tracked_names(args.tracked.iter().cloned());
    match pipeline.run_file(input) {
        Ok(analysis) => Some(analysis),
        Err(err) => {
            error!(error = %err, "analysis failed");
            terminal::error(&err.to_string());
            None
        }
    }
}

fn report_diagnostics(analysis: &Analysis, silent: bool) {
    let threshold = if silent {
        Severity::Error
    } else {
        Severity::Warning
    };
    for diagnostic in analysis.report.diagnostics_at(threshold) {
        terminal::diagnostic(diagnostic);
    }
}

fn cmd_analyze(input: &Path, format: FormatArg, args: &AnalysisArgs, silent: bool) -> i32 {
    let Some(analysis) = run_pipeline(input, args) else {
        return EXIT_FAILURE;
    };
    report_diagnostics(&analysis, silent);
    print!("{}", render(format.into(), &analysis.report.facts, &analysis.arch));
    if !silent {
        terminal::dim(&format!(
            "{} facts from {} functions ({} failed)",
            analysis.report.facts.len(),
            analysis.report.analyzed + analysis.report.failed,
            analysis.report.failed
        ));
    }
    EXIT_SUCCESS
}

fn cmd_verify(input: &Path, observed: &Path, args: &AnalysisArgs) -> i32 {
    let Some(analysis) = run_pipeline(input, args) else {
        return EXIT_FAILURE;
    };
    let observed = match std::fs::read_to_string(observed)
        .map_err(regval::Error::from)
        .and_then(|text| parse_observed(&text, &analysis.arch))
    {
        Ok(observed) => observed,
        Err(err) => {
            terminal::error(&err.to_string());
            return EXIT_FAILURE;
        }
    };

    let result = verify(&analysis.report.facts, &observed);
    for (obs, fact) in &result.mismatched {
        terminal::error(&format!(
            "{:#x}: {} observed {} but inferred {}",
            obs.address,
            analysis.arch.register_name(obs.register),
            obs.value,
            fact.signed()
        ));
    }
    let summary = format!(
        "{} matched, {} mismatched, {} without a fact",
        result.matched.len(),
        result.mismatched.len(),
        result.missing.len()
    );
    if result.is_sound() {
        terminal::success(&summary);
        EXIT_SUCCESS
    } else {
        terminal::error(&summary);
        EXIT_FAILURE
    }
}
