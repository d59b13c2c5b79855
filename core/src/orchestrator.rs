//! One conversational turn: classify, read today's notes, generate, repair
//! the proposed writes, enforce the plan invariant and persist.
//!
//! A turn never fails. Collaborator errors end in a degraded reply, and
//! persistence errors are logged per write.

use std::time::Duration;

use chrono::NaiveDate;
use crate::generation::{
    ChatMessage, CompletionRequest, GenerationResponse, Generator, RawWrite,
    parse_generation_response, validate_write,
};
use crate::mode::{ModeHint, ModeResolution, resolve_mode};
use crate::normalize::{head_chars, strip_markup, tail_chars};
use crate::notes::{NoteKind, NoteStore, NoteWrite, WriteMode};
use crate::prompts::{self, PlanFocus, TurnPrompt};

/// Notes are fed to the collaborator as at most this many trailing characters.
pub const CONTEXT_TAIL_CHARS: usize = 1800;
/// Plan texts shorter than this are treated as degenerate.
pub const MIN_PLAN_CHARS: usize = 50;
/// Replies shorter than this are treated as placeholders for a plan request.
pub const PLACEHOLDER_REPLY_CHARS: usize = 30;
pub const DEGRADED_REPLY_CHARS: usize = 200;
pub const FALLBACK_REPLY: &str = "Ок.";

const PLAN_ACKNOWLEDGEMENTS: &[&str] = &["план создан", "plan created"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptBudget {
    pub temperature: f32,
    pub max_tokens: u32,
}

pub const FIRST_ATTEMPT: AttemptBudget = AttemptBudget {
    temperature: 0.15,
    max_tokens: 450,
};

pub const STRICT_RETRY: AttemptBudget = AttemptBudget {
    temperature: 0.0,
    max_tokens: 400,
};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Bound on each generation attempt.
    pub attempt_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(12),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnRequest<'a> {
    pub user_id: &'a str,
    pub text: &'a str,
    /// Sticky mode from the caller's session, or an explicit hint.
    pub mode_hint: Option<ModeHint>,
    /// Skip classification and trust `mode_hint`.
    pub force_hint: bool,
    /// Calendar date in the deployment timezone.
    pub today: NaiveDate,
    /// Wall clock shown to the collaborator, e.g. "2026-03-14 09:30".
    pub now_label: &'a str,
    /// Rendered user profile and goals.
    pub profile: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub writes: Vec<NoteWrite>,
    /// Writes that reached the store.
    pub applied: usize,
    /// Both generation attempts failed.
    pub degraded: bool,
    pub resolution: ModeResolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    StrictRetry,
}

impl Attempt {
    fn budget(self) -> AttemptBudget {
        match self {
            Attempt::First => FIRST_ATTEMPT,
            Attempt::StrictRetry => STRICT_RETRY,
        }
    }

    fn next(self) -> Option<Attempt> {
        match self {
            Attempt::First => Some(Attempt::StrictRetry),
            Attempt::StrictRetry => None,
        }
    }
}

/// What generation produced once retries are exhausted.
#[derive(Debug, Clone, PartialEq)]
enum Generated {
    WellFormed { reply: String, writes: Vec<RawWrite> },
    Degraded { last_raw: Option<String> },
}

#[derive(Debug, Default)]
struct NotesSnapshot {
    workouts: String,
    meals: String,
    plan: String,
}

pub struct Orchestrator<'a> {
    store: &'a dyn NoteStore,
    generator: &'a dyn Generator,
    config: OrchestratorConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        store: &'a dyn NoteStore,
        generator: &'a dyn Generator,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            generator,
            config,
        }
    }

    pub async fn run_turn(&self, request: TurnRequest<'_>) -> TurnOutcome {
        let text = request.text.trim();
        let resolution = resolve_mode(text, request.mode_hint, request.force_hint);
        if resolution.overridden {
            tracing::info!(
                user_id = %request.user_id,
                from = ?request.mode_hint,
                to = ?resolution.hint,
                confidence = resolution.classification.map(|c| c.confidence),
                "message intent overrides sticky mode"
            );
        }

        let snapshot = self.read_snapshot(request.user_id, request.today).await;
        let prompt = TurnPrompt {
            now_label: request.now_label,
            today: request.today,
            hint: resolution.hint,
            classification: resolution.classification.as_ref(),
            profile: request.profile,
            workouts: &snapshot.workouts,
            meals: &snapshot.meals,
            plan: &snapshot.plan,
            message: text,
        }
        .render();

        let (mut reply, raw_writes, degraded) = match self.generate(&prompt).await {
            Generated::WellFormed { reply, writes } => (strip_markup(&reply), writes, false),
            Generated::Degraded { last_raw } => {
                tracing::error!(user_id = %request.user_id, "generation failed twice, degrading turn");
                (degraded_reply(last_raw.as_deref()), Vec::new(), true)
            }
        };

        let mut writes = validated_writes(&raw_writes, request.today);
        if writes.is_empty() {
            if let Some(write) = synthesized_write(&resolution, text, request.today) {
                tracing::debug!(kind = %write.kind, "synthesizing write for classified message");
                writes.push(write);
            }
        }

        if resolution.plan_request {
            let (plan_write, substituted) = plan_write(&writes, text, request.today);
            if substituted {
                tracing::info!(user_id = %request.user_id, "substituting fallback plan");
            }
            if is_placeholder_reply(&reply) {
                reply = plan_write.text.clone();
            }
            writes = vec![plan_write];
        }

        let applied = self.persist(request.user_id, &writes).await;

        if reply.trim().is_empty() {
            reply = FALLBACK_REPLY.to_string();
        }

        TurnOutcome {
            reply,
            writes,
            applied,
            degraded,
            resolution,
        }
    }

    async fn read_snapshot(&self, user_id: &str, today: NaiveDate) -> NotesSnapshot {
        let mut snapshot = NotesSnapshot::default();
        for kind in NoteKind::ALL {
            let text = match self.store.get(user_id, today, kind).await {
                Ok(text) => tail_chars(&text, CONTEXT_TAIL_CHARS),
                Err(error) => {
                    tracing::warn!(user_id = %user_id, kind = %kind, error = %error, "note read failed, using empty context");
                    String::new()
                }
            };
            match kind {
                NoteKind::Workouts => snapshot.workouts = text,
                NoteKind::Meals => snapshot.meals = text,
                NoteKind::Plan => snapshot.plan = text,
            }
        }
        snapshot
    }

    async fn generate(&self, prompt: &str) -> Generated {
        let mut attempt = Attempt::First;
        let mut last_raw = None;
        loop {
            let request = completion_request(prompt, attempt);
            let outcome =
                tokio::time::timeout(self.config.attempt_timeout, self.generator.complete(&request))
                    .await;

            match outcome {
                Ok(Ok(raw)) => match parse_generation_response(&raw) {
                    GenerationResponse::WellFormed { reply, writes } => {
                        return Generated::WellFormed { reply, writes };
                    }
                    GenerationResponse::Malformed { raw, reason } => {
                        tracing::warn!(?attempt, reason = %reason, "malformed generation response");
                        last_raw = Some(raw);
                    }
                },
                Ok(Err(error)) => {
                    tracing::warn!(?attempt, error = %error, "generation attempt failed");
                }
                Err(_) => {
                    tracing::warn!(
                        ?attempt,
                        timeout_secs = self.config.attempt_timeout.as_secs(),
                        "generation attempt timed out"
                    );
                }
            }

            match attempt.next() {
                Some(next) => attempt = next,
                None => return Generated::Degraded { last_raw },
            }
        }
    }

    async fn persist(&self, user_id: &str, writes: &[NoteWrite]) -> usize {
        let mut applied = 0;
        for write in writes {
            match self.store.apply(user_id, write).await {
                Ok(()) => applied += 1,
                Err(error) => {
                    tracing::warn!(
                        user_id = %user_id,
                        kind = %write.kind,
                        mode = write.mode.as_str(),
                        error = %error,
                        "note write failed, continuing"
                    );
                }
            }
        }
        applied
    }
}

fn completion_request(prompt: &str, attempt: Attempt) -> CompletionRequest {
    let user_content = match attempt {
        Attempt::First => prompt.to_string(),
        Attempt::StrictRetry => format!("{prompt}{}", prompts::STRICT_RETRY_SUFFIX),
    };
    let budget = attempt.budget();
    CompletionRequest {
        messages: vec![
            ChatMessage::system(prompts::turn_system_prompt()),
            ChatMessage::user(user_content),
        ],
        temperature: budget.temperature,
        max_tokens: budget.max_tokens,
    }
}

fn degraded_reply(last_raw: Option<&str>) -> String {
    let prose = last_raw.map(strip_markup).unwrap_or_default();
    if prose.is_empty() {
        FALLBACK_REPLY.to_string()
    } else {
        head_chars(&prose, DEGRADED_REPLY_CHARS).trim().to_string()
    }
}

fn validated_writes(raw_writes: &[RawWrite], today: NaiveDate) -> Vec<NoteWrite> {
    raw_writes
        .iter()
        .filter_map(|raw| match validate_write(raw, today) {
            Ok(write) => Some(write),
            Err(reason) => {
                tracing::debug!(reason = %reason, "dropping invalid write");
                None
            }
        })
        .collect()
}

fn synthesized_write(
    resolution: &ModeResolution,
    text: &str,
    today: NaiveDate,
) -> Option<NoteWrite> {
    let kind = resolution.kind?;
    if text.is_empty() {
        return None;
    }
    Some(NoteWrite {
        d: today,
        kind,
        mode: resolution.write_mode.unwrap_or(kind.default_write_mode()),
        text: prompts::synthesized_write_text(kind, text),
    })
}

/// The single plan write for a plan request, and whether the fallback plan
/// had to stand in for the generated one.
fn plan_write(writes: &[NoteWrite], message: &str, today: NaiveDate) -> (NoteWrite, bool) {
    let synthesized = prompts::synthesized_write_text(NoteKind::Plan, message);
    let candidate = writes
        .iter()
        .rev()
        .find(|write| write.kind == NoteKind::Plan && write.text != synthesized);

    let d = candidate.map_or(today, |write| write.d);
    match candidate {
        Some(write) if write.text.chars().count() >= MIN_PLAN_CHARS => (
            NoteWrite {
                d,
                kind: NoteKind::Plan,
                mode: WriteMode::Replace,
                text: write.text.clone(),
            },
            false,
        ),
        _ => (
            NoteWrite {
                d,
                kind: NoteKind::Plan,
                mode: WriteMode::Replace,
                text: prompts::fallback_plan(PlanFocus::detect(message), Some(d)),
            },
            true,
        ),
    }
}

fn is_placeholder_reply(reply: &str) -> bool {
    let reply = reply.trim();
    if reply.chars().count() < PLACEHOLDER_REPLY_CHARS {
        return true;
    }
    let lowered = reply.to_lowercase();
    PLAN_ACKNOWLEDGEMENTS
        .iter()
        .any(|marker| lowered.contains(marker))
}
