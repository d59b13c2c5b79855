use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::json;
use trener_core::notes::NoteKind;

use crate::util::{self, Target, api_request};

#[derive(Subcommand)]
pub enum NoteCommands {
    /// Print a note
    Get {
        /// Day (YYYY-MM-DD); defaults to today on the server
        #[arg(long)]
        date: Option<NaiveDate>,
        /// workouts, meals or plan
        #[arg(long)]
        kind: NoteKind,
    },
    /// Replace a note's text
    Put {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        kind: NoteKind,
        /// New text ("-" reads stdin)
        #[arg(long)]
        text: String,
    },
    /// Append text to a note
    Append {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        kind: NoteKind,
        /// Text to append ("-" reads stdin)
        #[arg(long)]
        text: String,
    },
}

pub async fn run(target: Target<'_>, command: NoteCommands) -> i32 {
    if let Err(code) = util::require_user(&target) {
        return code;
    }
    match command {
        NoteCommands::Get { date, kind } => {
            let mut query = vec![("kind", kind.to_string())];
            if let Some(d) = date {
                query.push(("d", d.to_string()));
            }
            api_request(target, reqwest::Method::GET, "/v1/notes", None, &query).await
        }
        NoteCommands::Put { date, kind, text } => {
            write(target, reqwest::Method::PUT, "/v1/notes", date, kind, &text).await
        }
        NoteCommands::Append { date, kind, text } => {
            write(target, reqwest::Method::POST, "/v1/notes/append", date, kind, &text).await
        }
    }
}

async fn write(
    target: Target<'_>,
    method: reqwest::Method,
    path: &str,
    date: Option<NaiveDate>,
    kind: NoteKind,
    text: &str,
) -> i32 {
    let text = if text == "-" {
        match util::read_text("-") {
            Ok(text) => text,
            Err(e) => return util::usage_error(&e, None),
        }
    } else {
        text.to_string()
    };
    let body = json!({ "d": date, "kind": kind, "text": text });
    api_request(target, method, path, Some(body), &[]).await
}
