//! Attack windows - timing sub-ranges exported as GML macros
//!
//! A window never becomes pixels; it only generates timing macros that get
//! injected into the matching attack script.

/// An attack window in an anim.
///
/// `start` and `end` are 1-indexed and relative to the owning anim, not to
/// the aseprite file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub name: String,
    pub start: u16,
    pub end: u16,
    /// GML macro text, rendered once at construction.
    pub gml: String,
}

impl Window {
    pub fn new(name: impl Into<String>, start: u16, end: u16) -> Self {
        let name = name.into();
        let gml = make_gml(&name, start, end);
        Self { name, start, end, gml }
    }
}

fn make_gml(name: &str, start: u16, end: u16) -> String {
    let upper = name.to_uppercase();
    format!(
        "#macro {upper}_FRAMES {frames}\n\
         #define _get_{name}_frames()\n    \
         return {upper}_FRAMES\n\
         #macro {upper}_FRAME_START {frame_start}\n\
         #define _get_{name}_frame_start()\n    \
         return {upper}_FRAME_START",
        frames = end - start + 1,
        frame_start = start - 1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_gml() {
        let window = Window::new("w1", 1, 1);
        assert_eq!(
            window.gml,
            "#macro W1_FRAMES 1\n\
             #define _get_w1_frames()\n\
             \x20   return W1_FRAMES\n\
             #macro W1_FRAME_START 0\n\
             #define _get_w1_frame_start()\n\
             \x20   return W1_FRAME_START"
        );
    }

    #[test]
    fn test_multi_frame_window() {
        let window = Window::new("startup", 2, 5);
        assert!(window.gml.contains("#macro STARTUP_FRAMES 4"));
        assert!(window.gml.contains("#macro STARTUP_FRAME_START 1"));
    }
}
