//! Injection application - rewrites each script's managed region
//!
//! Everything the user wrote stays untouched above the region marker; the
//! region below it is machine-owned and rebuilt from scratch each run from
//! the snippets the user content (transitively) needs. Applying the pass to
//! its own output is a no-op.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::aseprite::anims::Anim;
use crate::inject::model::GmlInjection;
use crate::manifest::Manifest;
use crate::scripts::Script;

pub const INJECTION_START_MARKER: &str = "// #region vvv LIBRARY DEFINES AND MACROS vvv\n";

/// Marker variants written by older releases, still recognized when
/// re-parsing previously processed scripts.
pub const OLD_INJECTION_START_MARKERS: &[&str] = &["// vvv LIBRARY DEFINES AND MACROS vvv\n"];

pub const INJECTION_START_WARNING: &str =
    "// DANGER File below this point will be overwritten! Generated defines and macros below.\n\
     // Write NO-INJECT in a comment above this area to disable injection.";

pub const INJECTION_START_HEADER: &str = concat!(
    "// #region vvv LIBRARY DEFINES AND MACROS vvv\n",
    "// DANGER File below this point will be overwritten! Generated defines and macros below.\n",
    "// Write NO-INJECT in a comment above this area to disable injection."
);

pub const INJECTION_END_HEADER: &str =
    "// DANGER: Write your code ABOVE the LIBRARY DEFINES AND MACROS header or it will be overwritten!\n\
     // #endregion";

/// Token a user writes (anywhere above the region) to opt a script out of
/// injection entirely.
pub const NO_INJECT_TOKEN: &str = "NO-INJECT";

/// Folder name whose scripts are matched against anim names for window
/// macro injection.
const ATTACKS_FOLDER: &str = "attacks";

/// Update every fresh script with the library snippets and window macros it
/// needs. Scripts that are stale and have no fresh matching anim are left
/// untouched.
pub fn apply_injection(
    scripts: &mut [Script],
    library: &[GmlInjection],
    anims: &[Anim],
    manifest: &mut Manifest,
) {
    for script in scripts.iter_mut() {
        let anim = anim_for_script(script, anims);
        if script.is_fresh || anim.map(|a| a.is_fresh).unwrap_or(false) {
            apply_to_script(script, library, anim, manifest);
        }
    }
}

fn apply_to_script(
    script: &mut Script,
    library: &[GmlInjection],
    anim: Option<&Anim>,
    manifest: &mut Manifest,
) {
    let user_content = user_content(&script.working_content).to_string();

    if user_content.contains(NO_INJECT_TOKEN) {
        // Opt-out drops any previously injected region too.
        script.working_content = user_content;
        manifest.set_injection_sources(&script.path, Vec::new());
        return;
    }

    let needed = needed_injections(&user_content, library);

    // Track which library files fed this script, so a change to one of them
    // can re-freshen the script next run.
    let mut sources: Vec<PathBuf> = Vec::new();
    for injection in &needed {
        if let Some(path) = injection.filepath() {
            if !sources.iter().any(|existing| existing == path) {
                sources.push(path.to_path_buf());
            }
        }
    }
    manifest.set_injection_sources(&script.path, sources);

    let mut gmls: Vec<&str> = needed.iter().map(|injection| injection.gml()).collect();
    // Window macros are always supplied when the anim has them; they are
    // not subject to the usage check.
    if let Some(anim) = anim {
        gmls.extend(anim.windows.iter().map(|window| window.gml.as_str()));
    }

    script.working_content = render(&user_content, &gmls);
}

/// The portion of the script above the managed region, right-trimmed.
pub fn user_content(script: &str) -> &str {
    let mut cut = script.len();
    for marker in std::iter::once(&INJECTION_START_MARKER).chain(OLD_INJECTION_START_MARKERS) {
        if let Some(idx) = script.find(marker) {
            cut = cut.min(idx);
        }
    }
    script[..cut].trim_end()
}

/// Resolve the transitive closure of library snippets the text needs,
/// excluding ones the text already declares itself.
///
/// Resolution is a worklist over snippet bodies: each newly discovered
/// snippet's own GML is scanned against the full library in turn. Output
/// order is order of first discovery.
fn needed_injections<'a>(user_content: &str, library: &'a [GmlInjection]) -> Vec<&'a GmlInjection> {
    let mut found: Vec<&GmlInjection> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut worklist: Vec<String> = vec![user_content.to_string()];
    let mut cursor = 0;

    while cursor < worklist.len() {
        let text = worklist[cursor].clone();
        cursor += 1;
        for injection in library {
            if !seen.contains(injection.name()) && injection.is_used(&text) {
                seen.insert(injection.name());
                found.push(injection);
                worklist.push(injection.gml().to_string());
            }
        }
    }

    found.retain(|injection| !injection.is_given(user_content));
    found
}

fn render(user_content: &str, gmls: &[&str]) -> String {
    if gmls.is_empty() {
        return user_content.to_string();
    }
    format!(
        "{user_content}\n\n{INJECTION_START_HEADER}\n{}\n{INJECTION_END_HEADER}",
        gmls.join("\n\n")
    )
}

/// Match a script in the attacks folder to the anim with the same base
/// name, ignoring any hurtbox marker on the anim.
fn anim_for_script<'a>(script: &Script, anims: &'a [Anim]) -> Option<&'a Anim> {
    let parent = script.path.parent()?.file_name()?;
    if parent != ATTACKS_FOLDER {
        return None;
    }
    let stem = script.stem();
    anims.iter().find(|anim| anim.script_match_name() == stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aseprite::windows::Window;
    use crate::inject::model::{Define, Macro};
    use std::path::Path;

    fn script(path: &str, content: &str) -> Script {
        Script {
            path: PathBuf::from(path),
            original_content: content.to_string(),
            working_content: content.to_string(),
            is_fresh: true,
        }
    }

    fn define(name: &str, content: &str) -> GmlInjection {
        GmlInjection::Define(Define::new(name, content, 0, "", vec![], None))
    }

    fn apply(scripts: &mut [Script], library: &[GmlInjection], anims: &[Anim]) -> Manifest {
        let mut manifest = Manifest::default();
        apply_injection(scripts, library, anims, &mut manifest);
        manifest
    }

    fn anim(name: &str, windows: Vec<Window>) -> Anim {
        Anim {
            name: name.to_string(),
            start: 0,
            end: 0,
            windows,
            frame_hash: String::new(),
            is_fresh: true,
        }
    }

    #[test]
    fn test_no_matching_injection_leaves_script_alone() {
        let mut scripts = [script("scripts/init.gml", "content")];
        apply(&mut scripts, &[define("irrelevant", "")], &[]);
        assert_eq!(scripts[0].working_content, "content");
    }

    #[test]
    fn test_single_injection() {
        let helper = define("helper", "return x + 1");
        let mut scripts = [script("scripts/init.gml", "result = helper(5)")];
        apply(&mut scripts, std::slice::from_ref(&helper), &[]);
        assert_eq!(
            scripts[0].working_content,
            format!(
                "result = helper(5)\n\n{INJECTION_START_HEADER}\n{}\n{INJECTION_END_HEADER}",
                helper.gml()
            )
        );
    }

    #[test]
    fn test_injection_is_idempotent() {
        let library = [define("helper", "return x + 1")];
        let mut scripts = [script("scripts/init.gml", "result = helper(5)")];
        apply(&mut scripts, &library, &[]);
        let once = scripts[0].working_content.clone();

        apply(&mut scripts, &library, &[]);
        assert_eq!(scripts[0].working_content, once);
    }

    #[test]
    fn test_transitive_needs_are_supplied_in_discovery_order() {
        let library = [
            define("a", "return b()"),
            define("b", "return c()"),
            define("c", "return 3"),
        ];
        let mut scripts = [script("scripts/init.gml", "a()")];
        apply(&mut scripts, &library, &[]);

        let content = &scripts[0].working_content;
        let pos_a = content.find("#define a").unwrap();
        let pos_b = content.find("#define b").unwrap();
        let pos_c = content.find("#define c").unwrap();
        assert!(pos_a < pos_b && pos_b < pos_c);
    }

    #[test]
    fn test_self_declared_snippet_is_not_supplied() {
        let library = [define("foo", "return 1")];
        let source = "#define foo\n    return 99\nfoo()";
        let mut scripts = [script("scripts/init.gml", source)];
        apply(&mut scripts, &library, &[]);
        assert_eq!(scripts[0].working_content, source);
    }

    #[test]
    fn test_no_inject_opt_out_drops_region() {
        let library = [define("helper", "return 1")];
        let source = format!(
            "// NO-INJECT\nhelper()\n\n{INJECTION_START_HEADER}\nstale\n{INJECTION_END_HEADER}"
        );
        let mut scripts = [script("scripts/init.gml", &source)];
        apply(&mut scripts, &library, &[]);
        assert_eq!(scripts[0].working_content, "// NO-INJECT\nhelper()");
    }

    #[test]
    fn test_unneeded_region_is_removed() {
        let source =
            format!("content\n\n{INJECTION_START_HEADER}\n#define old()\n{INJECTION_END_HEADER}");
        let mut scripts = [script("scripts/init.gml", &source)];
        apply(&mut scripts, &[], &[]);
        assert_eq!(scripts[0].working_content, "content");
    }

    #[test]
    fn test_legacy_marker_is_recognized() {
        let library = [define("helper", "return 1")];
        let source = format!(
            "helper()\n\n{}{INJECTION_START_WARNING}\nstale gml\n{INJECTION_END_HEADER}",
            OLD_INJECTION_START_MARKERS[0]
        );
        let mut scripts = [script("scripts/init.gml", &source)];
        apply(&mut scripts, &library, &[]);
        assert_eq!(
            scripts[0].working_content,
            format!(
                "helper()\n\n{INJECTION_START_HEADER}\n{}\n{INJECTION_END_HEADER}",
                library[0].gml()
            )
        );
    }

    #[test]
    fn test_stale_script_is_skipped() {
        let library = [define("helper", "return 1")];
        let mut scripts = [script("scripts/init.gml", "helper()")];
        scripts[0].is_fresh = false;
        apply(&mut scripts, &library, &[]);
        assert_eq!(scripts[0].working_content, "helper()");
    }

    #[test]
    fn test_attack_script_gets_window_macros() {
        let windows = vec![Window::new("w1", 1, 1)];
        let anims = [anim("bair", windows.clone())];
        let mut scripts = [script("scripts/attacks/bair.gml", "content")];
        apply(&mut scripts, &[], &anims);
        assert_eq!(
            scripts[0].working_content,
            format!(
                "content\n\n{INJECTION_START_HEADER}\n{}\n{INJECTION_END_HEADER}",
                windows[0].gml
            )
        );
    }

    #[test]
    fn test_hurtbox_marker_is_ignored_when_matching_anims() {
        let anims = [anim("bair HURTBOX", vec![Window::new("w1", 1, 1)])];
        let mut scripts = [script("scripts/attacks/bair.gml", "content")];
        apply(&mut scripts, &[], &anims);
        assert!(scripts[0].working_content.contains("W1_FRAMES"));
    }

    #[test]
    fn test_non_attack_script_gets_no_window_macros() {
        let anims = [anim("bair", vec![Window::new("w1", 1, 1)])];
        let mut scripts = [script("scripts/bair.gml", "content")];
        apply(&mut scripts, &[], &anims);
        assert_eq!(scripts[0].working_content, "content");
    }

    #[test]
    fn test_fresh_anim_reprocesses_stale_attack_script() {
        let anims = [anim("bair", vec![Window::new("w1", 1, 1)])];
        let mut scripts = [script("scripts/attacks/bair.gml", "content")];
        scripts[0].is_fresh = false;
        apply(&mut scripts, &[], &anims);
        assert!(scripts[0].working_content.contains("W1_FRAMES"));
    }

    #[test]
    fn test_macro_injection() {
        let gravity = GmlInjection::Macro(Macro::new("GRAVITY", "0.5", None));
        let mut scripts = [script("scripts/init.gml", "y += GRAVITY")];
        apply(&mut scripts, std::slice::from_ref(&gravity), &[]);
        assert!(scripts[0].working_content.contains("#macro GRAVITY 0.5"));
    }

    #[test]
    fn test_dependency_sources_recorded() {
        let helper = GmlInjection::Define(Define::new(
            "helper",
            "return 1",
            0,
            "",
            vec![],
            Some(PathBuf::from("assistant/.inject/math.gml")),
        ));
        let mut scripts = [script("scripts/init.gml", "helper()")];
        let manifest = apply(&mut scripts, std::slice::from_ref(&helper), &[]);
        assert_eq!(
            manifest.clients_for_injection(Path::new("assistant/.inject/math.gml")),
            vec![PathBuf::from("scripts/init.gml")]
        );
    }

    #[test]
    fn test_user_content_split() {
        assert_eq!(user_content("code\n"), "code");
        assert_eq!(
            user_content(&format!("code\n\n{INJECTION_START_HEADER}\nstuff")),
            "code"
        );
        assert_eq!(
            user_content(&format!("code\n\n{}stuff", OLD_INJECTION_START_MARKERS[0])),
            "code"
        );
    }
}
