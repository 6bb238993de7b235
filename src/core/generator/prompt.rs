//! Prompt assembly for the text generator.
//!
//! The generator is asked to answer in the language of the requested locale
//! and is optionally given the contents of up to [`MAX_CONTEXT_FILES`] files,
//! stripped of the noise that reads badly when spoken aloud.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tokio::io::AsyncReadExt;

/// Maximum number of context files read per request.
pub const MAX_CONTEXT_FILES: usize = 3;

/// Maximum number of bytes read from each context file.
pub const MAX_CONTEXT_BYTES: u64 = 5000;

static TRIPLE_DOUBLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)""".*?""""#).expect("valid regex"));
static TRIPLE_SINGLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)'''.*?'''").expect("valid regex"));
static QUOTED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*"[^"]*"\s*$"#).expect("valid regex"));
static SEPARATOR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[#/\\\-\s]+$").expect("valid regex"));

const BOILERPLATE_LINES: &[&str] = &[
    "*", "-", "--", "***", "#", "# ...", "# Copyright", "# License", "/", "//", "///", "////",
    "\\", "\\\\", "...",
];

/// English name of a base language code, if known.
pub fn language_name(base: &str) -> Option<&'static str> {
    let name = match base {
        "en" => "English",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "it" => "Italian",
        "pt" => "Portuguese",
        "zh" => "Chinese",
        "nl" => "Dutch",
        "hi" => "Hindi",
        "ko" => "Korean",
        "ta" => "Tamil",
        "pl" => "Polish",
        "bn" => "Bengali",
        "ja" => "Japanese",
        "tr" => "Turkish",
        "id" => "Indonesian",
        _ => return None,
    };
    Some(name)
}

/// Lowercased base language subtag, `en` when the locale is blank.
pub fn base_language(locale: &str) -> String {
    let lower = locale.trim().to_ascii_lowercase();
    match lower.split('-').next() {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => "en".to_string(),
    }
}

/// Remove docstrings, quoted lines, separators and license banners.
pub fn clean_context(source: &str) -> String {
    let stripped = TRIPLE_DOUBLE_QUOTED.replace_all(source, "");
    let stripped = TRIPLE_SINGLE_QUOTED.replace_all(&stripped, "");
    let stripped = QUOTED_LINE.replace_all(&stripped, "");

    stripped
        .lines()
        .filter(|line| keep_line(line.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn keep_line(trimmed: &str) -> bool {
    if trimmed.is_empty() || BOILERPLATE_LINES.contains(&trimmed) {
        return false;
    }
    if trimmed.starts_with('#') {
        let lower = trimmed.to_ascii_lowercase();
        if lower.contains("copyright") || lower.contains("license") {
            return false;
        }
    }
    if SEPARATOR_LINE.is_match(trimmed) {
        return false;
    }
    let single_quoted = trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'');
    let double_quoted = trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"');
    !(single_quoted || double_quoted)
}

async fn read_prefix(path: &Path) -> std::io::Result<String> {
    let file = tokio::fs::File::open(path).await?;
    let mut buf = Vec::with_capacity(MAX_CONTEXT_BYTES as usize);
    file.take(MAX_CONTEXT_BYTES).read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Read and clean the first [`MAX_CONTEXT_FILES`] context files.
///
/// Unreadable files contribute an inline error marker instead of failing
/// the request.
pub async fn build_context(files: &[String]) -> String {
    let mut parts = Vec::new();
    for path in files.iter().take(MAX_CONTEXT_FILES) {
        match read_prefix(Path::new(path)).await {
            Ok(raw) => parts.push(clean_context(&raw)),
            Err(e) => parts.push(format!("[{path} error: {e}]")),
        }
    }
    parts.join("\n\n")
}

/// Full prompt sent to the model.
pub fn build_prompt(prompt: &str, locale: &str, context: &str) -> String {
    let locale = {
        let trimmed = locale.trim();
        if trimmed.is_empty() { "en-us".to_string() } else { trimmed.to_ascii_lowercase() }
    };
    let base = base_language(&locale);
    let language = language_name(&base).unwrap_or(base.as_str());

    let mut out = format!(
        "You are Vibe, a multilingual coding copilot and senior software engineer.\n\
         IMPORTANT: Reply entirely in {language} ({locale}). \
         Speak in a natural, conversational way, as if mentoring a junior developer.\n\
         Be concise, practical, and code-aware. Prefer bullet points, diffs, or actionable commands.\n\
         Do NOT just translate; perform code-aware reasoning and avoid reading out code symbols, \
         asterisks, boilerplate, quotes, or docstrings.\n\
         - When explaining a repo/file, focus on its purpose, tech stack, key modules, data flow, \
         design patterns, code smells, risks, and next steps.\n\
         - If information is missing (e.g., repo URL), ask once, then stop.\n\
         - If asked for code, provide only the relevant code, not the entire file.\n\n\
         User:\n{prompt}"
    );
    if !context.is_empty() {
        out.push_str("\n\nContext:\n");
        out.push_str(context);
    }
    out
}
