use clap::Args;
use serde::Serialize;
use trener_core::intent::{self, IntentClassification};
use trener_core::mode::{self, ModeHint};

use crate::util;

#[derive(Args)]
pub struct ClassifyArgs {
    /// Message to classify
    pub text: String,
    /// Mode the conversation is currently in
    #[arg(long)]
    pub current_mode: Option<ModeHint>,
}

#[derive(Debug, Serialize)]
struct ClassifyReport {
    #[serde(flatten)]
    classification: IntentClassification,
    mode_hint: Option<ModeHint>,
    partial_workout: bool,
    plan_request: bool,
    /// Note kind a turn with this message would write
    resolved_kind: Option<String>,
}

fn report(args: &ClassifyArgs) -> ClassifyReport {
    let resolution = mode::resolve_mode(&args.text, args.current_mode, false);
    ClassifyReport {
        classification: intent::classify_intent(&args.text, args.current_mode),
        mode_hint: intent::mode_hint(&args.text, args.current_mode),
        partial_workout: intent::is_partial_workout_record(&args.text),
        plan_request: resolution.plan_request,
        resolved_kind: resolution.kind.map(|kind| kind.to_string()),
    }
}

/// Classify locally, without the API.
pub fn run(args: ClassifyArgs, raw: bool) -> i32 {
    util::print_json(&report(&args), raw)
}
