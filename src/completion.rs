//! Candidates offered while a value is being typed.

use std::process::Command as ProcessCommand;

use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};

use crate::spec::OptionSpec;

/// Upper bound on rows in the completion list, whatever the screen height.
pub const MAX_COMPLETIONS: usize = 40;

/// Static candidates followed by the output of the option's completion
/// command, if it has one.
pub fn option_candidates(option: &OptionSpec) -> Vec<String> {
    let mut candidates = option.completion.values.clone();
    if !option.completion.command.is_empty() {
        candidates.extend(run_completion_command(&option.completion.command));
    }
    candidates
}

/// Run `argv` and return its non-empty stdout lines. Failures only cost the
/// candidates, so they are logged rather than reported.
pub fn run_completion_command(argv: &[String]) -> Vec<String> {
    let Some((program, args)) = argv.split_first() else {
        return Vec::new();
    };

    let output = match ProcessCommand::new(program).args(args).output() {
        Ok(output) => output,
        Err(e) => {
            log::warn!("failed to run completion command `{}`: {e}", argv.join(" "));
            return Vec::new();
        }
    };

    if !output.status.success() {
        log::warn!(
            "completion command `{}` exited with {}",
            argv.join(" "),
            output.status
        );
        return Vec::new();
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// `NAME=` for each variable name, sorted and deduplicated.
pub fn environment_candidates<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut candidates: Vec<String> = names.into_iter().map(|name| format!("{name}=")).collect();
    candidates.sort();
    candidates.dedup();
    candidates
}

/// Names (not values) of the current process environment.
pub fn process_environment_names() -> Vec<String> {
    std::env::vars_os()
        .filter_map(|(name, _)| name.into_string().ok())
        .collect()
}

/// Candidates matching `text`, best first. An empty `text` matches
/// everything in the declared order.
pub fn filter(candidates: &[String], text: &str) -> Vec<String> {
    if text.is_empty() {
        return candidates.to_vec();
    }

    let mut matcher = Matcher::new(Config::DEFAULT);
    let mut scored: Vec<(u32, &String)> = candidates
        .iter()
        .map(|candidate| (fuzzy_match_score(candidate, text, &mut matcher), candidate))
        .filter(|(score, _)| *score > 0)
        .collect();
    // Stable, so equal scores keep their declared order.
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, c)| c.clone()).collect()
}

/// Fuzzy match using nucleo-matcher Pattern, returns score (0 if no match).
pub fn fuzzy_match_score(text: &str, pattern: &str, matcher: &mut Matcher) -> u32 {
    let pattern = Pattern::parse(pattern, CaseMatching::Smart, Normalization::Smart);
    let mut haystack_buf = Vec::new();
    let haystack = Utf32Str::new(text, &mut haystack_buf);
    pattern.score(haystack, matcher).unwrap_or(0)
}

/// Fuzzy match and return both score and the sorted, deduplicated char
/// positions that matched.
pub fn fuzzy_match_indices(text: &str, pattern: &str, matcher: &mut Matcher) -> (u32, Vec<u32>) {
    let pattern = Pattern::parse(pattern, CaseMatching::Smart, Normalization::Smart);
    let mut haystack_buf = Vec::new();
    let haystack = Utf32Str::new(text, &mut haystack_buf);

    let mut indices = Vec::new();
    match pattern.indices(haystack, matcher, &mut indices) {
        Some(score) => {
            indices.sort_unstable();
            indices.dedup();
            (score, indices)
        }
        None => (0, Vec::new()),
    }
}

/// How many completion rows fit above the prompt, leaving a little space
/// around the list.
pub fn visible_rows(screen_height: u16) -> usize {
    (screen_height as usize).saturating_sub(3).min(MAX_COMPLETIONS)
}
