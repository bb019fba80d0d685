//! Line-oriented lint warnings appended to script lines
//!
//! Each rule appends ` // WARN: ...` to offending lines. Existing warnings
//! are stripped before rules run, so re-running never duplicates a warning
//! and a fixed line loses its stale one. A line containing `NO-WARN` is
//! never warned.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::scripts::Script;

pub const WARNING_PREFIX: &str = " // WARN: ";

const SUPPRESS_TOKEN: &str = "NO-WARN";

const UNSAFE_CAMERA_READ_X: &str =
    "Possible Desync. Consider using get_instance_x(asset_get(\"camera_obj\")).";
const UNSAFE_CAMERA_READ_Y: &str =
    "Possible Desync. Consider using get_instance_y(asset_get(\"camera_obj\")).";
const OBJECT_VAR_SET_IN_DRAW_SCRIPT: &str =
    "Possible Desync. Object var set in draw script. \
     Consider using `var` or creating constants in `init.gml`.";
const WINDOW_TIMER_EQ_DURING_HITPAUSE: &str =
    "Possible repetition during hitpause. Consider using window_time_is(frame) \
     https://rivalslib.com/assistant/function_library/attacks/window_time_is.html";
const WINDOW_TIMER_MOD_DURING_HITPAUSE: &str =
    "Possible repetition during hitpause. Consider using window_time_is_div(frame) \
     https://rivalslib.com/assistant/function_library/attacks/window_time_is_div.html";
const RECURSIVE_SET_ATTACK: &str = "Risk of crash. in `attack_set.gml` you can just write \
     `attack = x` instead of `set_attack(x)`.";

/// A line with this token (and no `window_timer`) guards the rest of the
/// script against the hitpause-repetition rules.
const NOT_HITPAUSE: &str = "!hitpause";

/// Apply every warning rule to each fresh script's working content.
pub fn handle_warnings(scripts: &mut [Script]) {
    for script in scripts.iter_mut().filter(|script| script.is_fresh) {
        script.working_content = apply_warnings(&script.path, &script.working_content);
    }
}

fn apply_warnings(path: &Path, gml: &str) -> String {
    let draw_script = is_draw_script(path);
    let set_attack_script = stem_is(path, "set_attack");
    let mut local_vars: Vec<String> = Vec::new();
    let mut hitpause_guard_seen = false;
    let mut out = Vec::new();

    for line in gml.split('\n') {
        let line = strip_warning(line);
        for capture in local_var_regex().captures_iter(line) {
            local_vars.push(capture[1].to_string());
        }
        if is_hitpause_guard(line) {
            hitpause_guard_seen = true;
        }

        let mut rendered = line.to_string();
        if !is_suppressed(line) {
            if line.contains("view_get_xview(") {
                rendered.push_str(WARNING_PREFIX);
                rendered.push_str(UNSAFE_CAMERA_READ_X);
            }
            if line.contains("view_get_yview(") {
                rendered.push_str(WARNING_PREFIX);
                rendered.push_str(UNSAFE_CAMERA_READ_Y);
            }
            if draw_script && is_object_var_assignment(line, &local_vars) {
                rendered.push_str(WARNING_PREFIX);
                rendered.push_str(OBJECT_VAR_SET_IN_DRAW_SCRIPT);
            }
            if !hitpause_guard_seen && !line.contains(NOT_HITPAUSE) {
                if window_timer_eq_regex().is_match(line) {
                    rendered.push_str(WARNING_PREFIX);
                    rendered.push_str(WINDOW_TIMER_EQ_DURING_HITPAUSE);
                }
                if window_timer_mod_regex().is_match(line) {
                    rendered.push_str(WARNING_PREFIX);
                    rendered.push_str(WINDOW_TIMER_MOD_DURING_HITPAUSE);
                }
            }
            if set_attack_script && line.contains("set_attack(") {
                rendered.push_str(WARNING_PREFIX);
                rendered.push_str(RECURSIVE_SET_ATTACK);
            }
        }
        out.push(rendered);
    }
    out.join("\n")
}

/// A guard line turns the hitpause rules off for the rest of the script. A
/// line that also mentions `window_timer` is a check, not a guard.
fn is_hitpause_guard(line: &str) -> bool {
    line.contains(NOT_HITPAUSE) && !line.contains("window_timer")
}

fn is_suppressed(line: &str) -> bool {
    line.to_uppercase().contains(SUPPRESS_TOKEN)
}

/// Drop a previously appended warning from the line, if any.
fn strip_warning(line: &str) -> &str {
    match line.find(WARNING_PREFIX) {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn is_draw_script(path: &Path) -> bool {
    let Some(stem) = path.file_stem().map(|stem| stem.to_string_lossy()) else {
        return false;
    };
    stem.ends_with("_draw") || stem == "init_shader" || stem == "draw_hud"
}

fn stem_is(path: &Path, name: &str) -> bool {
    path.file_stem().map(|stem| stem.to_string_lossy() == name).unwrap_or(false)
}

fn window_timer_eq_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*if.*(= window_timer\s*|\s*window_timer\s*=)").expect("static pattern")
    })
}

fn window_timer_mod_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*if.*window_timer\s*%\s*\S+\s*==?\s*0").expect("static pattern")
    })
}

fn local_var_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"var (\w+)").expect("static pattern"))
}

fn assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\w+)\s*(=|\+=|-=|\*=|/=)\s*(\S)").expect("static pattern"))
}

/// An assignment to a name that is neither a `var` declaration nor a local
/// declared earlier in the file.
fn is_object_var_assignment(line: &str, local_vars: &[String]) -> bool {
    let Some(capture) = assignment_regex().captures(line) else {
        return false;
    };
    let name = &capture[1];
    // `x == y` is a comparison, not a set.
    if &capture[2] == "=" && &capture[3] == "=" {
        return false;
    }
    name != "var" && !local_vars.iter().any(|local| local == name)
}
