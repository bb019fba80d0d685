//! Tag records - named, colored frame ranges inside an aseprite file
//!
//! Tags are the authoring convention the assistant builds on: a tag colored
//! with an "anim" color marks a spritesheet to export, and a tag colored
//! with a "window" color marks an attack-timing sub-range within it.

/// The color assigned to a tag in the authoring tool.
///
/// Tags store three RGB bytes on disk. The classic swatches Aseprite offers
/// for tags map to named colors here so configuration can refer to them by
/// name; anything else is carried through as a raw triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagColor {
    Black,
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Gray,
    Rgb(u8, u8, u8),
}

/// RGB values of the classic tag swatches.
const NAMED_SWATCHES: &[(TagColor, (u8, u8, u8))] = &[
    (TagColor::Black, (0, 0, 0)),
    (TagColor::Red, (237, 28, 36)),
    (TagColor::Orange, (255, 126, 0)),
    (TagColor::Yellow, (255, 242, 0)),
    (TagColor::Green, (34, 177, 76)),
    (TagColor::Blue, (0, 162, 232)),
    (TagColor::Purple, (163, 73, 164)),
    (TagColor::Gray, (127, 127, 127)),
];

impl TagColor {
    /// Map the tag's stored RGB bytes to a named swatch where one matches.
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        for (color, rgb) in NAMED_SWATCHES {
            if *rgb == (r, g, b) {
                return *color;
            }
        }
        TagColor::Rgb(r, g, b)
    }

    /// Look up a named swatch from its configuration name.
    ///
    /// Returns `None` for names that are not a known swatch.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "black" => Some(TagColor::Black),
            "red" => Some(TagColor::Red),
            "orange" => Some(TagColor::Orange),
            "yellow" => Some(TagColor::Yellow),
            "green" => Some(TagColor::Green),
            "blue" => Some(TagColor::Blue),
            "purple" => Some(TagColor::Purple),
            "gray" | "grey" => Some(TagColor::Gray),
            _ => None,
        }
    }
}

/// A named frame range parsed from a frame-tags chunk.
///
/// `start` and `end` are inclusive, 0-indexed frame numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsepriteTag {
    pub name: String,
    pub start: u16,
    pub end: u16,
    pub color: TagColor,
}
