use clap::Args;
use serde_json::json;
use trener_core::mode::ModeHint;

use crate::util::{self, Target, api_request};

#[derive(Args)]
pub struct ChatArgs {
    /// Message, as typed in the chat
    pub text: String,
    /// Mode to assume: sets, meals or plan
    #[arg(long)]
    pub mode: Option<ModeHint>,
    /// Skip classification and trust --mode
    #[arg(long, requires = "mode")]
    pub force: bool,
}

pub async fn run(target: Target<'_>, args: ChatArgs) -> i32 {
    if let Err(code) = util::require_user(&target) {
        return code;
    }
    if args.text.trim().is_empty() {
        return util::usage_error("Message text must not be empty", None);
    }
    let body = json!({
        "text": args.text,
        "mode_hint": args.mode,
        "force_hint": args.force,
    });
    api_request(target, reqwest::Method::POST, "/v1/turn", Some(body), &[]).await
}
