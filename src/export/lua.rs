//! Embedded Lua collaborator scripts
//!
//! The Aseprite binary does the real pixel work; these scripts tell it how.
//! They are embedded in the executable and written out under the project's
//! assistant directory before each export run, so the subprocess always
//! sees the version matching this build.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const SHEET_SCRIPT_NAME: &str = "export-sheet.lua";
pub const HURTMASK_SCRIPT_NAME: &str = "export-hurtmask.lua";

const SHEET_SCRIPT: &str = r#"-- Export a horizontal strip of the selected layers and frame range.
-- Params: filename, dest, startFrame, endFrame, scale, targetLayers
local params = app.params
local sprite = app.open(params["filename"])
if sprite == nil then return end

local startFrame = tonumber(params["startFrame"])
local endFrame = tonumber(params["endFrame"])
local scale = tonumber(params["scale"])

-- Empty targetLayers means every layer stays visible.
local wanted = {}
local any = false
for index in string.gmatch(params["targetLayers"] or "", "[^,]+") do
  wanted[tonumber(index)] = true
  any = true
end

local index = 0
for _, layer in ipairs(sprite.layers) do
  if not layer.isGroup then
    index = index + 1
    if any then layer.isVisible = wanted[index] or false end
  end
end

-- Drop frames outside the anim range, back to front.
for i = #sprite.frames, 1, -1 do
  if i < startFrame or i > endFrame then
    sprite:deleteFrame(i)
  end
end

sprite:resize(sprite.width * scale, sprite.height * scale)
app.command.ExportSpriteSheet {
  ui = false,
  type = SpriteSheetType.HORIZONTAL,
  textureFilename = params["dest"],
}
"#;

const HURTMASK_SCRIPT: &str = r#"-- Export a solid hurtbox mask for the selected frame range.
-- Params as export-sheet.lua, plus hurtboxLayer and hurtmaskLayer
-- (1-based indices over non-group layers; either may be empty).
local params = app.params
local sprite = app.open(params["filename"])
if sprite == nil then return end

local startFrame = tonumber(params["startFrame"])
local endFrame = tonumber(params["endFrame"])
local scale = tonumber(params["scale"])
local hurtbox = tonumber(params["hurtboxLayer"])
local hurtmask = tonumber(params["hurtmaskLayer"])

local wanted = {}
local any = false
for index in string.gmatch(params["targetLayers"] or "", "[^,]+") do
  wanted[tonumber(index)] = true
  any = true
end

-- A dedicated HURTBOX layer replaces the content silhouette outright;
-- otherwise the target layers form the silhouette and the HURTMASK layer
-- (if any) punches holes in it.
local index = 0
for _, layer in ipairs(sprite.layers) do
  if not layer.isGroup then
    index = index + 1
    if hurtbox ~= nil then
      layer.isVisible = index == hurtbox
    elseif any then
      layer.isVisible = wanted[index] or index == hurtmask
    end
  end
end

sprite:flatten()
for _, cel in ipairs(sprite.cels) do
  local image = cel.image
  for it in image:pixels() do
    if app.pixelColor.rgbaA(it()) > 0 then
      it(app.pixelColor.rgba(0, 0, 0, 255))
    end
  end
end

for i = #sprite.frames, 1, -1 do
  if i < startFrame or i > endFrame then
    sprite:deleteFrame(i)
  end
end

sprite:resize(sprite.width * scale, sprite.height * scale)
app.command.ExportSpriteSheet {
  ui = false,
  type = SpriteSheetType.HORIZONTAL,
  textureFilename = params["dest"],
}
"#;

/// On-disk locations of the supplied scripts.
#[derive(Debug, Clone)]
pub struct LuaScripts {
    pub sheet: PathBuf,
    pub hurtmask: PathBuf,
}

/// Write both scripts into `dir`, creating it if needed.
pub fn supply_lua_scripts(dir: &Path) -> io::Result<LuaScripts> {
    fs::create_dir_all(dir)?;
    let sheet = dir.join(SHEET_SCRIPT_NAME);
    let hurtmask = dir.join(HURTMASK_SCRIPT_NAME);
    fs::write(&sheet, SHEET_SCRIPT)?;
    fs::write(&hurtmask, HURTMASK_SCRIPT)?;
    Ok(LuaScripts { sheet, hurtmask })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_supply_writes_both_scripts() {
        let dir = TempDir::new().unwrap();
        let scripts = supply_lua_scripts(&dir.path().join("assistant")).unwrap();
        assert!(scripts.sheet.exists());
        assert!(scripts.hurtmask.exists());
        let sheet = fs::read_to_string(&scripts.sheet).unwrap();
        assert!(sheet.contains("targetLayers"));
    }

    #[test]
    fn test_supply_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join(SHEET_SCRIPT_NAME);
        fs::write(&target, "stale").unwrap();
        supply_lua_scripts(dir.path()).unwrap();
        assert_ne!(fs::read_to_string(&target).unwrap(), "stale");
    }
}
