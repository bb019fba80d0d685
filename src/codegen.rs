//! Seed expansion - `$...$` lines replaced with generated GML
//!
//! A line whose pre-comment text carries exactly one `$seed$` span is
//! replaced by generated code. A seed nobody recognizes gets an ERROR
//! comment appended instead, so the author sees the miss in their editor.
//! Runs line by line, before injection, on fresh scripts only.

use crate::scripts::Script;

const NO_MATCH_COMMENT: &str = " // ERROR: No code injection match found";

/// Expand seeds in each fresh script's working content.
pub fn handle_codegen(scripts: &mut [Script]) {
    for script in scripts.iter_mut().filter(|script| script.is_fresh) {
        script.working_content = expand_script(&script.working_content);
    }
}

fn expand_script(gml: &str) -> String {
    gml.split('\n').map(expand_line).collect::<Vec<_>>().join("\n")
}

fn expand_line(line: &str) -> String {
    // A stale ERROR comment comes off first so a still-unmatched seed
    // doesn't accumulate one per run.
    let line = line.strip_suffix(NO_MATCH_COMMENT).unwrap_or(line);

    let before_comment = line.split("//").next().unwrap_or(line);
    if before_comment.matches('$').count() != 2 {
        return line.to_string();
    }
    let mut parts = line.splitn(3, '$');
    let (Some(before), Some(seed), Some(after)) = (parts.next(), parts.next(), parts.next())
    else {
        return line.to_string();
    };

    match expand_seed(seed) {
        Some(code) if !before.is_empty() && before.chars().all(char::is_whitespace) => {
            let indented: Vec<String> =
                code.lines().map(|code_line| format!("{before}{code_line}")).collect();
            format!("{}{after}", indented.join("\n"))
        }
        Some(code) => format!("{before}{code}{after}"),
        None => format!("{line}{NO_MATCH_COMMENT}"),
    }
}

fn expand_seed(seed: &str) -> Option<String> {
    expand_foreach(seed.trim())
}

/// `foreach <collection>` becomes an index loop with a named item variable.
fn expand_foreach(seed: &str) -> Option<String> {
    let collection = seed.strip_prefix("foreach ")?.trim();
    if collection.is_empty() || collection.contains(char::is_whitespace) {
        return None;
    }
    let item = format!("{collection}_item");
    let index = format!("{item}_i");
    Some(format!(
        "for (var {index} = 0; {index} < array_length({collection}); {index}++) {{\n\
         \x20   var {item} = {collection}[{index}]\n\
         }}"
    ))
}
