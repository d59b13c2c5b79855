use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::json;
use trener_core::notes::NoteKind;

use crate::util::{self, Target, api_request};

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Today's plan as a checklist with set progress
    Today,
    /// Update one planned set
    SetState {
        /// Exercise name as shown in the checklist
        #[arg(long)]
        exercise: String,
        /// Set number, starting at 1
        #[arg(long)]
        set: u32,
        #[arg(long)]
        completed: Option<bool>,
        #[arg(long)]
        skipped: Option<bool>,
        /// Reps actually performed
        #[arg(long)]
        reps: Option<String>,
        /// Weight actually used, kg
        #[arg(long)]
        weight: Option<f64>,
    },
    /// Generate and store a plan for a day
    Generate {
        /// Day (YYYY-MM-DD); defaults to today on the server
        #[arg(long)]
        date: Option<NaiveDate>,
        /// workouts or meals
        #[arg(long, default_value = "workouts")]
        kind: NoteKind,
    },
}

pub async fn run(target: Target<'_>, command: PlanCommands) -> i32 {
    if let Err(code) = util::require_user(&target) {
        return code;
    }
    match command {
        PlanCommands::Today => {
            api_request(target, reqwest::Method::GET, "/v1/workout-plan/today", None, &[]).await
        }
        PlanCommands::SetState {
            exercise,
            set,
            completed,
            skipped,
            reps,
            weight,
        } => {
            if set == 0 {
                return util::usage_error("--set starts at 1", None);
            }
            let body = json!({
                "exercise_name": exercise,
                "set_number": set,
                "completed": completed,
                "skipped": skipped,
                "reps": reps,
                "weight": weight,
            });
            api_request(
                target,
                reqwest::Method::POST,
                "/v1/workout-plan/set-state",
                Some(body),
                &[],
            )
            .await
        }
        PlanCommands::Generate { date, kind } => {
            if kind == NoteKind::Plan {
                return util::usage_error("--kind must be workouts or meals", None);
            }
            let body = json!({ "d": date, "kind": kind });
            api_request(target, reqwest::Method::POST, "/v1/plans/generate", Some(body), &[]).await
        }
    }
}
