//! Line-oriented plan grammar.
//!
//! Each line is cleaned of list markers and handed to an ordered chain of
//! [`LineMatcher`]s; the first one that recognises the line produces a
//! [`Fragment`]. Colon lines delegate their right-hand side to a second
//! ordered chain of [`DescriptionMatcher`]s. A small builder folds fragments
//! into exercises.

use std::sync::LazyLock;

use regex::Regex;

use super::{DEFAULT_EXERCISE_NAME, ExerciseEntry, SetEntry, normalize_reps, parse_weight_value};

const SKIPPED_SECTIONS: &[&str] = &[
    "разминка",
    "разогрев",
    "заминка",
    "растяжка после",
    "отдых между подходами",
    "правило прогрессии",
    "прогрессия",
    "warm-up",
    "warmup",
    "cool-down",
    "cooldown",
    "rest between sets",
    "progression",
];

const MAIN_SECTIONS: &[&str] = &["основная часть", "основная", "main block", "main part", "main set"];

static LEADING_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\p{L}\p{N}(]+").expect("valid leading marker regex"));
static LIST_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s*[.)]").expect("valid list number regex"));
static COLON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?):\s*(.*)$").expect("valid colon regex"));
static SET_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)подход|повтор|\bsets?\b|\breps?\b").expect("valid set keyword regex")
});

static NUMBERED_SET_LEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s*(?:-?[йи]\s*)?(?:подход|set)\b\s*[:\-.]?\s*(.*)$")
        .expect("valid numbered set regex")
});
static NUMBERED_SET_TRAILING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:подход|set)\s*(\d+)\s*[:\-.]?\s*(.*)$")
        .expect("valid trailing numbered set regex")
});
static SET_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:-?[йи]\s*)?(?:подход|set)\b\s*[:\-]?")
        .expect("valid set marker regex")
});
static WEIGHT_UNIT_LEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:кг|kg)").expect("valid weight unit lead regex"));
static LONG_FORM_LEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:по|of)\s").expect("valid long form lead regex"));

const REPS_PATTERN: &str = r"\d+\s*-\s*\d+|\d+|до\s*отказа|до\s*о|to\s+failure|max|макс[а-яё]*";
const REPS_UNIT_PATTERN: &str = r"(?:\s*(?:секунд[а-яё]*|сек|мин[а-яё]*|sec[a-z]*|min[a-z]*))?";

static COMPACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(\d+)\s*[хx×]\s*({REPS_PATTERN}){REPS_UNIT_PATTERN}"
    ))
    .expect("valid compact notation regex")
});
static LONG_FORM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(\d+)\s*(?:подход[а-яё]*|sets?)\s*(?:(?:по|of)\s*)?(?:({REPS_PATTERN}){REPS_UNIT_PATTERN})?"
    ))
    .expect("valid long form regex")
});

static EXPLICIT_WEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:с\s+)?весом\s+(\d+(?:[.,]\d+)?)\s*(?:кг|kg)")
        .expect("valid explicit weight regex")
});
static BARE_WEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@?\s*(\d+(?:[.,]\d+)?)\s*(?:кг|kg)").expect("valid bare weight regex")
});
static RPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(?\s*rpe\s*[:=]?\s*((?:≤|<=|~)?\s*\d+(?:[.,]\d+)?(?:\s*[-–—]\s*\d+(?:[.,]\d+)?)?)\s*\)?")
        .expect("valid rpe regex")
});
static REST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:отдых|rest)\s*[:\-]?\s*(\d+(?:[.,]\d+)?(?:\s*-\s*\d+)?\s*(?:секунд[а-яё]*|сек|с\b|мин[а-яё]*|м\b|sec[a-z]*|s\b|min[a-z]*)?)")
        .expect("valid rest regex")
});

/// What one line of plan text means.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Warm-up, cool-down and similar blocks. `standalone` headers open a
    /// section whose bullet lines are ignored until the next real exercise.
    SkippedSection { standalone: bool },
    /// A main-block label; ends any skipped section.
    MainSection,
    /// A bare line ending in ':'; names the next exercise if set lines follow.
    SectionTitle(String),
    /// `Name: description`. `structured` is true when the description used
    /// set notation rather than free text.
    Exercise {
        name: String,
        sets: Vec<SetEntry>,
        structured: bool,
    },
    /// Set notation with no name text before it, belonging to the open exercise.
    Sets(Vec<SetEntry>),
    /// One numbered set ("2 подход: 80кг х 6").
    Set(SetEntry),
    /// A bare exercise name with no set detail on the line.
    Name(String),
    Ignored,
}

/// One recognised line grammar.
pub struct LineMatcher {
    pub name: &'static str,
    pub apply: fn(&str) -> Option<Fragment>,
}

/// One recognised set-description grammar for the right-hand side of a colon line.
pub struct DescriptionMatcher {
    pub name: &'static str,
    pub structured: bool,
    pub apply: fn(&str) -> Option<Vec<SetEntry>>,
}

/// Line grammars in priority order.
pub const LINE_MATCHERS: &[LineMatcher] = &[
    LineMatcher {
        name: "section_header",
        apply: match_section_header,
    },
    LineMatcher {
        name: "section_title",
        apply: match_section_title,
    },
    LineMatcher {
        name: "numbered_set",
        apply: match_numbered_set,
    },
    LineMatcher {
        name: "colon_exercise",
        apply: match_colon_exercise,
    },
    LineMatcher {
        name: "set_detail",
        apply: match_set_detail,
    },
    LineMatcher {
        name: "bare_name",
        apply: match_bare_name,
    },
];

/// Description grammars in priority order.
pub const DESCRIPTION_MATCHERS: &[DescriptionMatcher] = &[
    DescriptionMatcher {
        name: "per_set",
        structured: true,
        apply: match_per_set,
    },
    DescriptionMatcher {
        name: "compact",
        structured: true,
        apply: match_compact,
    },
    DescriptionMatcher {
        name: "long_form",
        structured: true,
        apply: match_long_form,
    },
    DescriptionMatcher {
        name: "free_text",
        structured: false,
        apply: match_free_text,
    },
];

/// Remove emoji, bullets and list numbering from the start of a line, and
/// unify dash variants.
pub fn clean_line(line: &str) -> String {
    let line = line.trim().replace(['–', '—'], "-");
    let line = LEADING_MARKER_RE.replace(&line, "").to_string();
    let line = strip_list_number(&line);
    let line = LEADING_MARKER_RE.replace(&line, "");
    line.trim().to_string()
}

fn strip_list_number(line: &str) -> String {
    let Some(found) = LIST_NUMBER_RE.find(line) else {
        return line.to_string();
    };
    let rest = &line[found.end()..];
    // "1.5 мин" is a value, not a list number.
    if found.as_str().ends_with('.') && rest.starts_with(|c: char| c.is_ascii_digit()) {
        return line.to_string();
    }
    rest.trim_start().to_string()
}

fn clean_name(raw: &str) -> String {
    let name = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c: char| matches!(c, '-' | ':' | ',' | '.' | ';') || c.is_whitespace())
        .to_string();
    if name.is_empty() {
        DEFAULT_EXERCISE_NAME.to_string()
    } else {
        name
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Explicit "весом X кг" wins over a bare "X кг" anywhere in the text.
pub fn extract_weight(text: &str) -> Option<f64> {
    let captures = EXPLICIT_WEIGHT_RE
        .captures(text)
        .or_else(|| BARE_WEIGHT_RE.captures(text))?;
    parse_weight_value(captures.get(1)?.as_str())
}

pub fn extract_rpe(text: &str) -> Option<String> {
    let captures = RPE_RE.captures(text)?;
    let value = captures.get(1)?.as_str().replace(['–', '—'], "-");
    let value: String = value.split_whitespace().collect();
    (!value.is_empty()).then_some(value)
}

pub fn extract_rest(text: &str) -> Option<u32> {
    let captures = REST_RE.captures(text)?;
    super::parse_rest_seconds(captures.get(1)?.as_str())
}

/// Free-text reps: the description with weight, RPE and rest tokens removed.
fn residual_reps(text: &str) -> String {
    let text = EXPLICIT_WEIGHT_RE.replace_all(text, " ");
    let text = BARE_WEIGHT_RE.replace_all(&text, " ");
    let text = RPE_RE.replace_all(&text, " ");
    let text = REST_RE.replace_all(&text, " ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed
        .trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '-' | '(' | ')') || c.is_whitespace());
    let trimmed = match trimmed.strip_prefix(['x', 'х', '×', 'X']) {
        Some(rest) if rest.starts_with(|c: char| c.is_whitespace() || c.is_ascii_digit()) => {
            rest.trim_start()
        }
        _ => trimmed,
    };
    normalize_reps(trimmed)
}

fn detail_set(number: u32, description: &str) -> SetEntry {
    SetEntry {
        number,
        reps: residual_reps(description),
        weight_kg: extract_weight(description),
        rpe: extract_rpe(description),
        rest_sec: extract_rest(description),
    }
}

fn repeated_sets(count: u32, reps: &str, description: &str) -> Vec<SetEntry> {
    let reps = normalize_reps(reps);
    let weight_kg = extract_weight(description);
    let rpe = extract_rpe(description);
    let rest_sec = extract_rest(description);
    (1..=count)
        .map(|number| SetEntry {
            number,
            reps: reps.clone(),
            weight_kg,
            rpe: rpe.clone(),
            rest_sec,
        })
        .collect()
}

/// `1 подход 60кг, 2 подход 80кг, ...`: one set per marker, each with its own weight.
pub fn match_per_set(description: &str) -> Option<Vec<SetEntry>> {
    let markers: Vec<_> = SET_MARKER_RE.captures_iter(description).collect();
    if markers.len() < 2 {
        return None;
    }
    let mut sets = Vec::with_capacity(markers.len());
    for (index, captures) in markers.iter().enumerate() {
        let marker = captures.get(0)?;
        let end = markers
            .get(index + 1)
            .and_then(|next| next.get(0))
            .map_or(description.len(), |next| next.start());
        let number: u32 = captures.get(1)?.as_str().parse().ok()?;
        sets.push(detail_set(number, &description[marker.end()..end]));
    }
    Some(sets)
}

/// `N×M[-K]`, optionally with a weight token anywhere in the description.
pub fn match_compact(description: &str) -> Option<Vec<SetEntry>> {
    let captures = COMPACT_RE.captures(description)?;
    let count: u32 = captures.get(1)?.as_str().parse().ok()?;
    if count == 0 {
        return None;
    }
    let whole = captures.get(0)?;
    let reps_start = captures.get(2)?.start();
    let reps = &description[reps_start..whole.end()];
    Some(repeated_sets(count, reps, description))
}

/// `N подхода по M[-K] повторений` or `N sets of M`.
pub fn match_long_form(description: &str) -> Option<Vec<SetEntry>> {
    let captures = LONG_FORM_RE.captures(description)?;
    let count: u32 = captures.get(1)?.as_str().parse().ok()?;
    if count == 0 {
        return None;
    }
    let whole = captures.get(0)?;
    let reps = match captures.get(2) {
        // "1 подход 60кг": the number is a weight, not reps.
        Some(_) if WEIGHT_UNIT_LEAD_RE.is_match(&description[whole.end()..]) => "",
        Some(reps) => &description[reps.start()..whole.end()],
        None => "",
    };
    Some(repeated_sets(count, reps, description))
}

/// Anything else: one set carrying the description as reps.
pub fn match_free_text(description: &str) -> Option<Vec<SetEntry>> {
    if description.trim().is_empty() {
        return None;
    }
    Some(vec![detail_set(1, description)])
}

/// Run the description chain, returning the sets and whether set notation was used.
pub fn parse_description(description: &str) -> Option<(Vec<SetEntry>, bool)> {
    DESCRIPTION_MATCHERS.iter().find_map(|matcher| {
        let sets = (matcher.apply)(description)?;
        tracing::trace!(matcher = matcher.name, sets = sets.len(), "set description matched");
        Some((sets, matcher.structured))
    })
}

fn header_part(line: &str) -> &str {
    line.split_once(':').map_or(line, |(head, _)| head)
}

pub fn match_section_header(line: &str) -> Option<Fragment> {
    let head = header_part(line).to_lowercase();
    let standalone = line
        .split_once(':')
        .is_none_or(|(_, rest)| rest.trim().is_empty());

    if contains_any(&head, SKIPPED_SECTIONS) {
        return Some(Fragment::SkippedSection { standalone });
    }
    if contains_any(&head, MAIN_SECTIONS) {
        return Some(Fragment::MainSection);
    }
    None
}

pub fn match_section_title(line: &str) -> Option<Fragment> {
    let title = line.strip_suffix(':')?;
    if title.contains(':') || title.trim().is_empty() {
        return None;
    }
    Some(Fragment::SectionTitle(clean_name(title)))
}

pub fn match_numbered_set(line: &str) -> Option<Fragment> {
    let captures = NUMBERED_SET_LEADING_RE
        .captures(line)
        .or_else(|| NUMBERED_SET_TRAILING_RE.captures(line))?;
    let rest = captures.get(2).map_or("", |m| m.as_str());
    // "4 подхода по 8" is long-form notation, not the fourth set.
    if LONG_FORM_LEAD_RE.is_match(rest) {
        return None;
    }
    let number: u32 = captures.get(1)?.as_str().parse().ok()?;
    Some(Fragment::Set(detail_set(number, rest)))
}

pub fn match_colon_exercise(line: &str) -> Option<Fragment> {
    let captures = COLON_RE.captures(line)?;
    let name = clean_name(captures.get(1)?.as_str());
    let description = captures.get(2).map_or("", |m| m.as_str());
    let (sets, structured) = parse_description(description).unwrap_or_default();
    Some(Fragment::Exercise {
        name,
        sets,
        structured,
    })
}

/// Set notation without a colon. Text before the notation names a new
/// exercise ("Жим лёжа 4х8 80кг"); a line that starts with the notation
/// continues the open one.
pub fn match_set_detail(line: &str) -> Option<Fragment> {
    let (sets, notation) = match match_compact(line) {
        Some(sets) => (sets, COMPACT_RE.find(line)?),
        None => (match_long_form(line)?, LONG_FORM_RE.find(line)?),
    };
    let lead = BARE_WEIGHT_RE.replace_all(&line[..notation.start()], " ");
    if !lead.chars().any(char::is_alphabetic) {
        return Some(Fragment::Sets(sets));
    }
    Some(Fragment::Exercise {
        name: clean_name(&lead),
        sets,
        structured: true,
    })
}

pub fn match_bare_name(line: &str) -> Option<Fragment> {
    if SET_KEYWORD_RE.is_match(line) {
        return Some(Fragment::Ignored);
    }
    Some(Fragment::Name(clean_name(line)))
}

/// Classify a cleaned line with the first matching grammar.
pub fn classify_line(line: &str) -> Fragment {
    for matcher in LINE_MATCHERS {
        if let Some(fragment) = (matcher.apply)(line) {
            tracing::trace!(matcher = matcher.name, line, "plan line matched");
            return fragment;
        }
    }
    Fragment::Ignored
}

#[derive(Debug, Default)]
struct PlanBuilder {
    exercises: Vec<ExerciseEntry>,
    current: Option<ExerciseEntry>,
    /// Some set of the open exercise came from notation without a stated number.
    unnumbered: bool,
    pending_title: Option<String>,
    skipping: bool,
}

impl PlanBuilder {
    fn flush(&mut self) {
        if let Some(exercise) = self.current.take() {
            let exercise = if self.unnumbered {
                exercise.finalize()
            } else {
                exercise.finalize_by_number()
            };
            self.exercises.push(exercise);
        }
        self.unnumbered = false;
    }

    fn open(&mut self, name: String) {
        self.flush();
        self.pending_title = None;
        self.current = Some(ExerciseEntry::new(name));
    }

    fn current_or_open(&mut self) -> &mut ExerciseEntry {
        if self.current.is_none() {
            let name = self
                .pending_title
                .take()
                .unwrap_or_else(|| DEFAULT_EXERCISE_NAME.to_string());
            self.current = Some(ExerciseEntry::new(name));
        }
        self.current.get_or_insert_with(|| ExerciseEntry::new(DEFAULT_EXERCISE_NAME))
    }

    fn push(&mut self, fragment: Fragment) {
        match fragment {
            Fragment::SkippedSection { standalone } => {
                self.flush();
                self.pending_title = None;
                if standalone {
                    self.skipping = true;
                }
            }
            Fragment::MainSection => {
                self.flush();
                self.pending_title = None;
                self.skipping = false;
            }
            Fragment::SectionTitle(title) => {
                self.flush();
                self.skipping = false;
                self.pending_title = Some(title);
            }
            Fragment::Exercise {
                name,
                sets,
                structured,
            } => {
                if self.skipping && !structured {
                    return;
                }
                self.skipping = false;
                self.open(name);
                self.unnumbered = true;
                self.current_or_open().sets.extend(sets);
            }
            Fragment::Sets(sets) => {
                if !self.skipping {
                    self.unnumbered = true;
                    self.current_or_open().sets.extend(sets);
                }
            }
            Fragment::Set(set) => {
                if !self.skipping {
                    self.current_or_open().sets.push(set);
                }
            }
            Fragment::Name(name) => {
                if !self.skipping {
                    self.open(name);
                }
            }
            Fragment::Ignored => {}
        }
    }

    fn finish(mut self) -> Vec<ExerciseEntry> {
        self.flush();
        self.exercises
    }
}

/// Fold every line of `text` into exercises, in first-seen order.
pub fn parse_lines(text: &str) -> Vec<ExerciseEntry> {
    let mut builder = PlanBuilder::default();
    for raw in text.lines() {
        let line = clean_line(raw);
        if line.is_empty() {
            continue;
        }
        builder.push(classify_line(&line));
    }
    builder.finish()
}
