use clap::{Args, Subcommand};
use trener_core::profile::ProfileUpdate;

use crate::util::{self, Target, api_request};

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Print the training profile
    Get,
    /// Update profile fields; an empty string clears a text field
    Set(ProfileSetArgs),
}

#[derive(Args, Default)]
pub struct ProfileSetArgs {
    #[arg(long)]
    pub height_cm: Option<i32>,
    /// Body weight in kg
    #[arg(long)]
    pub weight: Option<f64>,
    #[arg(long)]
    pub age: Option<i32>,
    #[arg(long)]
    pub sex: Option<String>,
    /// Training goal, e.g. "набор массы"
    #[arg(long)]
    pub goal: Option<String>,
    #[arg(long)]
    pub experience: Option<String>,
    /// Injuries or limitations to respect in plans
    #[arg(long)]
    pub injuries: Option<String>,
    #[arg(long)]
    pub equipment: Option<String>,
    #[arg(long)]
    pub schedule: Option<String>,
    #[arg(long)]
    pub target_weight: Option<f64>,
    #[arg(long)]
    pub workouts_per_week: Option<i32>,
}

impl ProfileSetArgs {
    fn into_update(self) -> ProfileUpdate {
        ProfileUpdate {
            height_cm: self.height_cm,
            weight_kg: self.weight,
            age: self.age,
            sex: self.sex,
            goal: self.goal,
            experience: self.experience,
            injuries: self.injuries,
            equipment: self.equipment,
            schedule: self.schedule,
            target_weight_kg: self.target_weight,
            workouts_per_week: self.workouts_per_week,
        }
    }
}

pub async fn run(target: Target<'_>, command: ProfileCommands) -> i32 {
    if let Err(code) = util::require_user(&target) {
        return code;
    }
    match command {
        ProfileCommands::Get => {
            api_request(target, reqwest::Method::GET, "/v1/profile", None, &[]).await
        }
        ProfileCommands::Set(args) => {
            let update = args.into_update();
            if update.is_empty() {
                return util::usage_error(
                    "Nothing to update",
                    Some("Pass at least one field, e.g. --goal 'набор массы'."),
                );
            }
            let body = match serde_json::to_value(&update) {
                Ok(body) => body,
                Err(e) => return util::usage_error(&e.to_string(), None),
            };
            api_request(target, reqwest::Method::PUT, "/v1/profile", Some(body), &[]).await
        }
    }
}
