//! Validation and transformation of one stage's free-text output into the
//! input of the next. Nothing here trusts the model's formatting.

use serde_json::Value;

use crate::llm_client::extract_json;

/// Most titles handed to the search and salary stages.
pub const MAX_ROLE_TITLES: usize = 5;
/// Longest line still considered a job title.
const MAX_TITLE_WORDS: usize = 8;

/// Item labels the role suggester is asked to number under each role.
const RUBRIC_LABELS: [&str; 6] = [
    "job title",
    "why",
    "key technologies",
    "key competencies",
    "key skills",
    "required",
];

const TITLE_KEYS: [&str; 4] = ["job_title", "title", "Job Title", "role"];
const LIST_KEYS: [&str; 4] = ["job_roles", "roles", "suggested_roles", "jobs"];

/// What the skills stage hands on: the parsed JSON when the model produced
/// some, otherwise its raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillsHandoff {
    pub json: Option<Value>,
    pub raw: String,
}

impl SkillsHandoff {
    pub fn from_output(text: &str) -> Self {
        Self {
            json: extract_json(text).filter(Value::is_object),
            raw: text.to_string(),
        }
    }

    /// Text embedded in downstream prompts.
    pub fn for_prompt(&self) -> String {
        self.json
            .as_ref()
            .and_then(|v| serde_json::to_string_pretty(v).ok())
            .unwrap_or_else(|| self.raw.trim().to_string())
    }
}

/// Job titles named in the role-suggestion output, in order, deduplicated
/// case-insensitively and capped at `MAX_ROLE_TITLES`.
pub fn extract_job_titles(text: &str) -> Vec<String> {
    let mut titles = extract_json(text)
        .map(|v| titles_from_json(&v))
        .unwrap_or_default();
    if titles.is_empty() {
        titles = labelled_titles(text);
    }
    if titles.is_empty() {
        let headings = heading_titles(text);
        titles = if headings.len() > 1 {
            headings
        } else {
            Some(listed_titles(text))
                .filter(|listed| !listed.is_empty())
                .unwrap_or(headings)
        };
    }
    dedup_and_cap(titles)
}

fn titles_from_json(value: &Value) -> Vec<String> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => LIST_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => TITLE_KEYS
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_str))
                .map(String::from),
            _ => None,
        })
        .map(|t| clean(&t))
        .filter(|t| is_title_like(t))
        .collect()
}

/// Lines like `Job Title: Data Analyst` or `**Job Title**: Data Analyst`.
fn labelled_titles(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let plain = strip_emphasis(line);
            let line = strip_list_marker(&plain);
            ["job title:", "title:"]
                .iter()
                .find_map(|label| strip_label(line, label))
                .map(clean)
        })
        .filter(|t| is_title_like(t))
        .collect()
}

/// Markdown headings at the deepest level used: `### Data Analyst`, `## 1. Data Engineer`.
fn heading_titles(text: &str) -> Vec<String> {
    let headings: Vec<(usize, &str)> = text
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let level = line.chars().take_while(|c| *c == '#').count();
            if !(2..=4).contains(&level) {
                return None;
            }
            Some((level, line[level..].strip_prefix(' ')?))
        })
        .collect();
    let Some(deepest) = headings.iter().map(|(level, _)| *level).max() else {
        return Vec::new();
    };
    headings
        .into_iter()
        .filter(|(level, _)| *level == deepest)
        .filter_map(|(_, heading)| {
            let plain = strip_emphasis(heading);
            let (_, rest) = strip_numbering(plain.trim());
            (!is_rubric_label(rest)).then(|| clean(title_head(rest)))
        })
        .filter(|t| is_title_like(t))
        .collect()
}

/// Numbered items, also under headings: `1. **Data Analyst** - ...`, `### 2. Data Engineer`.
/// Rubric items such as `1. Why it's a good fit: ...` are not titles.
fn listed_titles(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let stripped = strip_emphasis(line.trim().trim_start_matches('#'));
            let (numbered, rest) = strip_numbering(stripped.trim());
            if !numbered || is_rubric_label(rest) {
                return None;
            }
            Some(clean(title_head(rest)))
        })
        .filter(|t| is_title_like(t))
        .collect()
}

/// The part of a list item before any description.
fn title_head(item: &str) -> &str {
    let head = item.split([':', '(', '|']).next().unwrap_or(item);
    let head = head.split(" - ").next().unwrap_or(head);
    head.split(" – ").next().unwrap_or(head)
}

fn is_rubric_label(item: &str) -> bool {
    let head = item
        .split(':')
        .next()
        .unwrap_or(item)
        .trim()
        .to_ascii_lowercase();
    RUBRIC_LABELS
        .iter()
        .any(|label| head == *label || head.starts_with(&format!("{label} ")))
}

fn strip_emphasis(line: &str) -> String {
    line.replace("**", "").replace('`', "")
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim().trim_start_matches('#').trim();
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line);
    strip_numbering(line).1
}

/// Case-insensitive ASCII label match; returns what follows the label.
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    if head.eq_ignore_ascii_case(label) {
        line.get(label.len()..)
    } else {
        None
    }
}

/// Splits a leading `1.` / `2)` marker. Returns whether one was found.
fn strip_numbering(line: &str) -> (bool, &str) {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return (false, line);
    }
    match line[digits..].chars().next() {
        Some('.') | Some(')') => (true, line[digits + 1..].trim()),
        _ => (false, line),
    }
}

fn clean(title: &str) -> String {
    title
        .trim()
        .trim_matches(|c: char| c == '*' || c == '_' || c == '"' || c == '.' || c == ',')
        .trim()
        .to_string()
}

fn is_title_like(title: &str) -> bool {
    let words = title.split_whitespace().count();
    (1..=MAX_TITLE_WORDS).contains(&words) && title.chars().any(char::is_alphabetic)
}

fn dedup_and_cap(titles: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for title in titles {
        if !out.iter().any(|t| t.eq_ignore_ascii_case(&title)) {
            out.push(title);
        }
        if out.len() == MAX_ROLE_TITLES {
            break;
        }
    }
    out
}
