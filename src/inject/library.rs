//! Library loader - parses snippet-definition files into injections
//!
//! Library files are plain text containing `#define name(params)` and
//! `#macro NAME value` blocks. The file is split at each keyword; the text
//! up to the next keyword (or EOF) belongs to that entry. Define bodies may
//! optionally be wrapped in one outer `{ ... }` pair.
//!
//! A malformed library file is a fatal error for the whole run: partially
//! applying a shared library is riskier than stopping.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::inject::model::{dedent, Define, GmlInjection, Macro};

/// Library directories under `<root>/assistant`, in load order.
pub const LIBRARY_FOLDERS: &[&str] = &["assistant/.inject", "assistant/user_inject"];

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("could not read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("mismatched curly braces in entry '{name}'")]
    MismatchedBraces { name: String },
    #[error("missing ) for parameter list of '{name}'")]
    UnclosedParams { name: String },
    #[error("empty entry after #{keyword}")]
    MissingName { keyword: String },
}

fn keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#(define|macro)").expect("static pattern"))
}

/// Every library file under the project's library directories, in load
/// order.
pub fn library_file_paths(root_dir: &Path) -> Vec<PathBuf> {
    let mut all = Vec::new();
    for folder in LIBRARY_FOLDERS {
        let pattern = root_dir.join(folder).join("**/*.gml");
        let Ok(entries) = glob::glob(&pattern.to_string_lossy()) else {
            continue;
        };
        let mut paths: Vec<PathBuf> = entries.flatten().collect();
        paths.sort();
        all.extend(paths);
    }
    all
}

/// Read every library file under the project's library directories.
pub fn read_injection_library(root_dir: &Path) -> Result<Vec<GmlInjection>, LibraryError> {
    let mut injections = Vec::new();
    for path in library_file_paths(root_dir) {
        let content = fs::read_to_string(&path)
            .map_err(|source| LibraryError::Io { path: path.clone(), source })?;
        injections.extend(parse_library_gml(&content, Some(&path))?);
    }
    Ok(injections)
}

/// Parse one library file's text into injections.
pub fn parse_library_gml(
    content: &str,
    filepath: Option<&Path>,
) -> Result<Vec<GmlInjection>, LibraryError> {
    let matches: Vec<(usize, usize, &str)> = keyword_regex()
        .find_iter(content)
        .map(|m| (m.start(), m.end(), &content[m.start() + 1..m.end()]))
        .collect();

    let mut injections = Vec::new();
    for (i, (_, body_start, keyword)) in matches.iter().enumerate() {
        let body_end = matches.get(i + 1).map(|next| next.0).unwrap_or(content.len());
        let entry = &content[*body_start..body_end];
        injections.push(parse_entry(keyword, entry, filepath)?);
    }
    Ok(injections)
}

fn parse_entry(
    keyword: &str,
    entry: &str,
    filepath: Option<&Path>,
) -> Result<GmlInjection, LibraryError> {
    let entry = entry.strip_prefix(' ').unwrap_or(entry);
    let trimmed = entry.trim_start();

    // Name runs to the first whitespace or parameter list.
    let name_len = trimmed
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(trimmed.len());
    let name = &trimmed[..name_len];
    if name.is_empty() {
        return Err(LibraryError::MissingName { keyword: keyword.to_string() });
    }
    let mut rest = &trimmed[name_len..];

    let mut params = Vec::new();
    if let Some(after_paren) = rest.strip_prefix('(') {
        let close = after_paren
            .find(')')
            .ok_or_else(|| LibraryError::UnclosedParams { name: name.to_string() })?;
        params = after_paren[..close]
            .split(',')
            .map(|param| param.trim().to_string())
            .filter(|param| !param.is_empty())
            .collect();
        rest = &after_paren[close + 1..];
    }

    match keyword {
        "define" => {
            // Everything between the signature and the body is a divider; it
            // may carry a `// Version N` annotation.
            let (divider, body) = split_divider(rest);
            let version = parse_version(divider);
            let body = remove_brackets(name, body)?;
            let body = dedent(&body);
            let body = body.trim_matches('\n');
            let (docs, content) = split_docs_and_gml(body);
            Ok(GmlInjection::Define(Define::new(
                name,
                content,
                version,
                docs,
                params,
                filepath.map(Path::to_path_buf),
            )))
        }
        _ => {
            let value = rest.strip_prefix(' ').unwrap_or(rest);
            let value = dedent(value);
            let value: String = value
                .trim_matches('\n')
                .lines()
                .map(str::trim_end)
                .collect::<Vec<_>>()
                .join("\n");
            Ok(GmlInjection::Macro(Macro::new(name, value, filepath.map(Path::to_path_buf))))
        }
    }
}

/// Split a define entry's remainder into (divider, body). The divider ends
/// at the first newline or at an opening brace, whichever comes first.
fn split_divider(text: &str) -> (&str, &str) {
    for (idx, c) in text.char_indices() {
        if c == '{' {
            return (&text[..idx], &text[idx..]);
        }
        if c == '\n' {
            return (&text[..idx], &text[idx + 1..]);
        }
    }
    (text, "")
}

fn parse_version(divider: &str) -> u32 {
    let Some(after) = divider.split("Version").nth(1) else {
        return 0;
    };
    let digits: String = after.trim_start().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Strip one outer `{ ... }` pair if the body is brace-wrapped.
///
/// The body counts as wrapped only when the trimmed content both starts
/// with `{` and ends with `}`; an embedded `if x { }` block is body text,
/// not a wrapper. Unbalanced braces are fatal.
fn remove_brackets(name: &str, body: &str) -> Result<String, LibraryError> {
    let trimmed = body.trim();
    let starts = trimmed.starts_with('{');
    let ends = trimmed.ends_with('}');
    let opens = body.matches('{').count();
    let closes = body.matches('}').count();

    if (starts && !ends) || opens != closes {
        return Err(LibraryError::MismatchedBraces { name: name.to_string() });
    }
    if starts && ends {
        let inner = &trimmed[1..trimmed.len() - 1];
        Ok(inner.trim_matches('\n').to_string())
    } else {
        Ok(body.to_string())
    }
}

/// Split leading contiguous `//` comment lines off as docs.
fn split_docs_and_gml(body: &str) -> (String, String) {
    let mut doc_lines = Vec::new();
    let mut gml_lines = Vec::new();
    let mut in_docs = true;

    for line in body.lines() {
        if in_docs {
            if let Some(after) = line.trim_start().strip_prefix("//") {
                doc_lines.push(after.strip_prefix(' ').unwrap_or(after).trim_end());
                continue;
            }
            in_docs = false;
        }
        gml_lines.push(line.trim_end());
    }

    (doc_lines.join("\n"), gml_lines.join("\n"))
}
