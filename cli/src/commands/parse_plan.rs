use clap::Args;
use trener_core::plan::{ParsedPlan, PlanParseStrategy, parse_plan_text};

use crate::util;

#[derive(Args)]
pub struct ParsePlanArgs {
    /// Plan text file ("-" reads stdin)
    #[arg(long, default_value = "-")]
    pub file: String,
}

/// Parse plan text locally with the deterministic matcher chain.
pub fn run(args: ParsePlanArgs, raw: bool) -> i32 {
    let text = match util::read_text(&args.file) {
        Ok(text) => text,
        Err(e) => return util::usage_error(&e, Some("Pass --file <path> or pipe the plan to stdin.")),
    };
    let parsed = ParsedPlan {
        exercises: parse_plan_text(&text),
        strategy: PlanParseStrategy::Deterministic,
    };
    tracing::debug!(exercises = parsed.exercises.len(), "plan parsed");
    util::print_json(&parsed, raw)
}
