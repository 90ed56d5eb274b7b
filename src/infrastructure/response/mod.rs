use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

static ANSWER_PREFIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(respuesta|answer)\s*:\s*").unwrap());

/// Reduce a model reply to the single value it names.
///
/// Models asked for "only the option" still wrap it in reasoning tags,
/// list bullets, quotes or an "Answer:" prefix; all of that is dropped and
/// the first non-empty line is returned.
pub fn clean_llm_response(response: &str) -> String {
    let mut cleaned = THINK_TAG_PATTERN.replace_all(response, "").to_string();
    cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "").to_string();

    let line = cleaned
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");

    let line = ANSWER_PREFIX_PATTERN.replace(line, "");
    let line = line.trim_start_matches(|c| matches!(c, '-' | '*' | '•')).trim();

    line.trim_matches(|c| matches!(c, '"' | '\'' | '`' | '“' | '”'))
        .trim()
        .to_string()
}
