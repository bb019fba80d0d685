//! Injection entities - named snippets with usage/declaration detection
//!
//! Each injection renders its GML once at construction, and can answer two
//! structural questions about arbitrary script text: "is my name invoked
//! here" and "does this text already declare me itself". Both checks scan
//! for whole-identifier occurrences using an explicit token-boundary rule
//! rather than a tokenizer.

use std::path::{Path, PathBuf};

/// A character ends an identifier if it is whitespace or ASCII punctuation
/// other than underscore.
pub fn is_token_boundary(c: char) -> bool {
    c.is_whitespace() || (c != '_' && c.is_ascii_punctuation())
}

/// True if the character before byte `idx` is a token boundary (or there is
/// no character there).
fn boundary_before(text: &str, idx: usize) -> bool {
    text[..idx].chars().next_back().map(is_token_boundary).unwrap_or(true)
}

/// True if the character at byte `idx` is a token boundary (or the text
/// ends there).
fn boundary_at(text: &str, idx: usize) -> bool {
    text[idx..].chars().next().map(is_token_boundary).unwrap_or(true)
}

/// Strip the common leading whitespace of all non-blank lines.
///
/// Counts whitespace in characters, not bytes, so mixed-width whitespace
/// (tabs next to no-break spaces) dedents without splitting a character.
pub fn dedent(text: &str) -> String {
    let common = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                let cut = line
                    .char_indices()
                    .nth(common)
                    .map(|(idx, _)| idx)
                    .unwrap_or(line.len());
                &line[cut..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix every non-blank line.
fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A `#define` function snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: String,
    pub params: Vec<String>,
    pub version: u32,
    pub docs: String,
    pub content: String,
    /// Full rendered snippet, computed once at construction.
    pub gml: String,
    /// Library file this snippet came from, for dependency tracking.
    pub filepath: Option<PathBuf>,
}

impl Define {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        version: u32,
        docs: impl Into<String>,
        params: Vec<String>,
        filepath: Option<PathBuf>,
    ) -> Self {
        let name = name.into();
        let content = content.into();
        let docs = docs.into();

        let param_string =
            if params.is_empty() { String::new() } else { format!("({})", params.join(", ")) };
        let head = format!("#define {name}{param_string} // Version {version}");

        let mut gml = head;
        if !docs.trim().is_empty() {
            gml.push('\n');
            gml.push_str(&indent(&dedent(&docs), "    // "));
        }
        let body = indent(&dedent(&content), "    ");
        if !body.trim().is_empty() {
            gml.push('\n');
            gml.push_str(&body);
        }
        let gml = gml.trim().to_string();

        Self { name, params, version, docs, content, gml, filepath }
    }

    /// Does `gml` call this define? The name must be immediately followed by
    /// `(`, preceded by a token boundary, and not be its own `#define` line.
    pub fn is_used(&self, gml: &str) -> bool {
        let needle = format!("{}(", self.name);
        gml.match_indices(&needle).any(|(idx, _)| {
            boundary_before(gml, idx) && !gml[..idx].ends_with("#define ")
        })
    }

    /// Does `gml` declare its own `#define` of this name?
    pub fn is_given(&self, gml: &str) -> bool {
        let needle = format!("#define {}", self.name);
        gml.match_indices(&needle).any(|(idx, _)| boundary_at(gml, idx + needle.len()))
    }
}

/// A `#macro` constant snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    pub name: String,
    pub value: String,
    pub gml: String,
    pub filepath: Option<PathBuf>,
}

impl Macro {
    pub fn new(name: impl Into<String>, value: impl Into<String>, filepath: Option<PathBuf>) -> Self {
        let name = name.into();
        let value = value.into();
        let gml = format!("#macro {name} {value}");
        Self { name, value, gml, filepath }
    }

    /// Does `gml` reference this macro as a standalone token, outside its
    /// own `#macro` declaration?
    pub fn is_used(&self, gml: &str) -> bool {
        gml.match_indices(&self.name).any(|(idx, _)| {
            boundary_before(gml, idx)
                && boundary_at(gml, idx + self.name.len())
                && !gml[..idx].ends_with("#macro ")
        })
    }

    pub fn is_given(&self, gml: &str) -> bool {
        let needle = format!("#macro {}", self.name);
        gml.match_indices(&needle).any(|(idx, _)| boundary_at(gml, idx + needle.len()))
    }
}

/// A library snippet that can be supplied into a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GmlInjection {
    Define(Define),
    Macro(Macro),
}

impl GmlInjection {
    pub fn name(&self) -> &str {
        match self {
            GmlInjection::Define(define) => &define.name,
            GmlInjection::Macro(macro_) => &macro_.name,
        }
    }

    pub fn gml(&self) -> &str {
        match self {
            GmlInjection::Define(define) => &define.gml,
            GmlInjection::Macro(macro_) => &macro_.gml,
        }
    }

    pub fn filepath(&self) -> Option<&Path> {
        match self {
            GmlInjection::Define(define) => define.filepath.as_deref(),
            GmlInjection::Macro(macro_) => macro_.filepath.as_deref(),
        }
    }

    pub fn is_used(&self, gml: &str) -> bool {
        match self {
            GmlInjection::Define(define) => define.is_used(gml),
            GmlInjection::Macro(macro_) => macro_.is_used(gml),
        }
    }

    pub fn is_given(&self, gml: &str) -> bool {
        match self {
            GmlInjection::Define(define) => define.is_given(gml),
            GmlInjection::Macro(macro_) => macro_.is_given(gml),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn define(name: &str) -> Define {
        Define::new(name, "content", 0, "", vec![], None)
    }

    #[test]
    fn test_define_render_plain() {
        let d = Define::new("helper", "return x + 1", 0, "", vec!["x".to_string()], None);
        assert_eq!(d.gml, "#define helper(x) // Version 0\n    return x + 1");
    }

    #[test]
    fn test_define_render_with_docs_and_params() {
        let d = Define::new(
            "clamp2",
            "val = clamp(val, lo, hi)\nreturn val",
            3,
            "Clamp a value.\nSecond line.",
            vec!["val".to_string(), "lo".to_string(), "hi".to_string()],
            None,
        );
        assert_eq!(
            d.gml,
            "#define clamp2(val, lo, hi) // Version 3\n\
             \x20   // Clamp a value.\n\
             \x20   // Second line.\n\
             \x20   val = clamp(val, lo, hi)\n\
             \x20   return val"
        );
    }

    #[test]
    fn test_define_render_preserves_relative_indentation() {
        let d = Define::new("nested", "    if (x) {\n        y()\n    }", 0, "", vec![], None);
        assert_eq!(d.gml, "#define nested // Version 0\n    if (x) {\n        y()\n    }");
    }

    #[test]
    fn test_define_is_used() {
        let d = define("foo");
        assert!(d.is_used("foo()"));
        assert!(d.is_used("x = foo(1, 2)"));
        assert!(d.is_used("if (foo())"));
        assert!(!d.is_used("foo"));
        assert!(!d.is_used("barfoo()"));
        assert!(!d.is_used("foo_bar()"));
        assert!(!d.is_used("#define foo()"));
        // A definition elsewhere doesn't hide a real call.
        assert!(d.is_used("#define foo()\nfoo()"));
    }

    #[test]
    fn test_define_is_given() {
        let d = define("foo");
        assert!(d.is_given("#define foo"));
        assert!(d.is_given("#define foo()"));
        assert!(d.is_given("code\n#define foo\nmore"));
        assert!(!d.is_given("#define foobar"));
        assert!(!d.is_given("foo()"));
    }

    #[test]
    fn test_macro_is_used() {
        let m = Macro::new("GRAVITY", "0.5", None);
        assert!(m.is_used("y += GRAVITY"));
        assert!(m.is_used("GRAVITY"));
        assert!(!m.is_used("GRAVITY_MOD"));
        assert!(!m.is_used("MY_GRAVITY"));
        assert!(!m.is_used("#macro GRAVITY 0.5"));
    }

    #[test]
    fn test_macro_is_given() {
        let m = Macro::new("GRAVITY", "0.5", None);
        assert!(m.is_given("#macro GRAVITY 0.5"));
        assert!(!m.is_given("#macro GRAVITY_MOD 2"));
        assert!(!m.is_given("GRAVITY"));
    }

    #[test]
    fn test_underscore_is_not_a_boundary() {
        assert!(!is_token_boundary('_'));
        assert!(is_token_boundary(' '));
        assert!(is_token_boundary('('));
        assert!(is_token_boundary(';'));
        assert!(!is_token_boundary('a'));
        assert!(!is_token_boundary('9'));
    }

    #[test]
    fn test_dedent_counts_characters_not_bytes() {
        // A no-break space is two bytes; one narrow space is still the
        // common prefix, so only one character comes off each line.
        assert_eq!(dedent("\u{00A0}   x = 1\n y = 2"), "   x = 1\ny = 2");
        assert_eq!(dedent("\t\ta()\n\tb()"), "\ta()\nb()");
    }

    #[test]
    fn test_macro_render() {
        let m = Macro::new("GRAVITY", "0.5", None);
        assert_eq!(m.gml, "#macro GRAVITY 0.5");
    }
}
