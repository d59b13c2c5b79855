use std::sync::LazyLock;

use regex::Regex;

static TRAILING_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+\n").expect("valid trailing space regex"));
static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank run regex"));

/// Lowercase and collapse every whitespace run to a single space.
///
/// Pure and idempotent: `normalize_text(&normalize_text(x)) == normalize_text(x)`.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove markdown control characters that chat models like to emit.
/// Notes are plain text rendered in a messenger, so these never survive.
pub fn strip_markup(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '`' | '#' | '~' | '>' | '[' | ']' | '{' | '}'))
        .collect();
    let cleaned = TRAILING_SPACE_RE.replace_all(&cleaned, "\n");
    let cleaned = BLANK_RUN_RE.replace_all(&cleaned, "\n\n");
    cleaned.trim().to_string()
}

/// Keep at most `limit` trailing characters of trimmed `text`.
/// The oldest content is dropped, never the newest.
pub fn tail_chars(text: &str, limit: usize) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= limit {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - limit).collect()
}

/// First `limit` characters of `text`, on a char boundary.
pub fn head_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_is_case_insensitive_and_collapses_whitespace() {
        assert_eq!(normalize_text("  ЖИМ   Лёжа "), normalize_text("жим лёжа"));
        assert_eq!(normalize_text("Bench\t\n 80KG"), "bench 80kg");
    }

    #[test]
    fn normalize_text_is_idempotent() {
        for input in ["", "   ", "Составь  ПЛАН\nна завтра", "жим 4х8 80кг"] {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once);
        }
    }

    #[test]
    fn normalize_text_of_empty_is_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text(" \n\t "), "");
    }

    #[test]
    fn strip_markup_drops_markdown_and_squeezes_blank_lines() {
        let raw = "## **План**  \n\n\n\n- `жим` 4х8\n> цитата";
        assert_eq!(strip_markup(raw), "План\n\n- жим 4х8\n цитата");
    }

    #[test]
    fn tail_chars_keeps_newest_content() {
        assert_eq!(tail_chars("абвгд", 3), "вгд");
        assert_eq!(tail_chars("  short  ", 10), "short");
    }

    #[test]
    fn head_chars_respects_char_boundaries() {
        assert_eq!(head_chars("приседания", 3), "при");
    }
}
