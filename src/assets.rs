//! Placeholder sprite generation for referenced-but-missing assets
//!
//! Scripts reference sprites with `sprite_get("name")`. When a referenced
//! name follows the shape convention `[<color>_]<shape>_<width>[_<height>]`
//! (shapes `rect`, `ellipse`, `circle`) and no matching file exists under
//! the sprites folder, a placeholder image is drawn so the game can run
//! before real art exists. Names outside the convention are left alone.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use image::{Rgba, RgbaImage};
use log::{debug, error};
use regex::Regex;

use crate::export::SPRITES_FOLDER;
use crate::scripts::Script;

const BORDER: Rgba<u8> = Rgba([0, 0, 0, 255]);

fn sprite_get_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"sprite_get\(["']([^"']+)["']\)"#).expect("static pattern"))
}

/// Generate placeholders for every referenced sprite that has no file yet.
/// Returns the number of sprites written.
pub fn supply_missing_sprites(root_dir: &Path, scripts: &[Script]) -> usize {
    let sprites_dir = root_dir.join(SPRITES_FOLDER);
    let mut supplied = 0;
    for name in required_sprites(scripts) {
        let path = sprites_dir.join(format!("{name}.png"));
        if path.exists() {
            continue;
        }
        let Some(sprite) = generate_sprite(&name) else {
            continue;
        };
        if let Err(e) = fs::create_dir_all(&sprites_dir) {
            error!("could not create {}: {}", sprites_dir.display(), e);
            return supplied;
        }
        match sprite.save(&path) {
            Ok(()) => {
                debug!("supplied placeholder sprite {}", path.display());
                supplied += 1;
            }
            Err(e) => error!("could not write {}: {}", path.display(), e),
        }
    }
    supplied
}

/// Every sprite name referenced by any script, deduplicated and sorted.
fn required_sprites(scripts: &[Script]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for script in scripts {
        for capture in sprite_get_regex().captures_iter(&script.working_content) {
            names.insert(capture[1].trim_end_matches(".png").to_string());
        }
    }
    names
}

/// Draw a placeholder for a shape-convention name, or `None` when the name
/// does not follow the convention.
fn generate_sprite(name: &str) -> Option<RgbaImage> {
    let (shape, width, height, fill) = parse_shape_name(name)?;
    let mut image = RgbaImage::new(width, height);
    match shape {
        Shape::Rect => draw_rect(&mut image, fill),
        Shape::Ellipse => draw_ellipse(&mut image, fill),
    }
    Some(image)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Rect,
    Ellipse,
}

fn parse_shape_name(name: &str) -> Option<(Shape, u32, u32, Rgba<u8>)> {
    let parts: Vec<&str> = name.split('_').collect();
    let shape_at = parts.iter().position(|part| matches!(*part, "rect" | "ellipse" | "circle"))?;
    if shape_at > 1 {
        return None;
    }

    let fill = match shape_at {
        0 => Rgba([255, 255, 255, 255]),
        _ => color_by_name(parts[0])?,
    };
    let dimensions = &parts[shape_at + 1..];
    let (width, height) = match (parts[shape_at], dimensions) {
        ("circle", [diameter]) => (diameter.parse().ok()?, diameter.parse().ok()?),
        ("rect" | "ellipse", [width, height]) => (width.parse().ok()?, height.parse().ok()?),
        _ => return None,
    };
    if width == 0 || height == 0 {
        return None;
    }

    let shape = if parts[shape_at] == "rect" { Shape::Rect } else { Shape::Ellipse };
    Some((shape, width, height, fill))
}

fn color_by_name(name: &str) -> Option<Rgba<u8>> {
    let rgb = match name {
        "black" => [0, 0, 0],
        "white" => [255, 255, 255],
        "red" => [255, 0, 0],
        "orange" => [255, 126, 0],
        "yellow" => [255, 242, 0],
        "green" => [34, 177, 76],
        "blue" => [0, 162, 232],
        "purple" => [163, 73, 164],
        "gray" | "grey" => [127, 127, 127],
        _ => return None,
    };
    Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

fn draw_rect(image: &mut RgbaImage, fill: Rgba<u8>) {
    let (width, height) = image.dimensions();
    for y in 0..height {
        for x in 0..width {
            let edge = x == 0 || y == 0 || x == width - 1 || y == height - 1;
            image.put_pixel(x, y, if edge { BORDER } else { fill });
        }
    }
}

fn draw_ellipse(image: &mut RgbaImage, fill: Rgba<u8>) {
    let (width, height) = image.dimensions();
    let rx = f64::from(width) / 2.0;
    let ry = f64::from(height) / 2.0;
    let inside = |x: u32, y: u32| {
        let dx = (f64::from(x) + 0.5 - rx) / rx;
        let dy = (f64::from(y) + 0.5 - ry) / ry;
        dx * dx + dy * dy <= 1.0
    };
    for y in 0..height {
        for x in 0..width {
            if !inside(x, y) {
                continue;
            }
            // Boundary pixels are those with an outside 4-neighbor.
            let edge = x == 0
                || y == 0
                || x == width - 1
                || y == height - 1
                || !inside(x - 1, y)
                || !inside(x + 1, y)
                || !inside(x, y - 1)
                || !inside(x, y + 1);
            image.put_pixel(x, y, if edge { BORDER } else { fill });
        }
    }
}
