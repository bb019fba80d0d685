//! Layer classification - groups visible layers by naming convention
//!
//! The export tool addresses layers by a dense 0-based index over
//! normal-type layers only, so group layers must not consume an index.

use std::collections::BTreeMap;

use log::warn;

use crate::aseprite::chunks::LayerChunk;
use crate::aseprite::loader::RawAsepriteFile;

pub const SPLIT_PREFIX: &str = "SPLIT(";
pub const OPT_PREFIX: &str = "OPT(";
pub const HURTBOX_LAYER_NAME: &str = "HURTBOX";
pub const HURTMASK_LAYER_NAME: &str = "HURTMASK";

/// A visible, normal-type layer with its export index assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub name: String,
    pub flags: u16,
    /// Dense 0-based index over normal-type layers, in file order.
    pub index: usize,
}

/// The semantic grouping of a file's layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AsepriteLayers {
    /// Plain content layers, in file order.
    pub normals: Vec<Layer>,
    pub hurtbox: Option<Layer>,
    pub hurtmask: Option<Layer>,
    /// `SPLIT(key)` layers, grouped by key. Each split exports on its own.
    pub splits: BTreeMap<String, Vec<Layer>>,
    /// `OPT(key)` layers, grouped by key. Each opt exports on top of the
    /// normals.
    pub opts: BTreeMap<String, Vec<Layer>>,
}

impl AsepriteLayers {
    pub fn from_file(file: &RawAsepriteFile) -> Self {
        Self::from_chunks(&file.layers())
    }

    pub fn from_chunks(chunks: &[&LayerChunk]) -> Self {
        let mut layers = Self::default();

        // Indices are assigned over normal-type layers before the visibility
        // filter, so hiding a layer doesn't shift its siblings.
        let indexed = chunks
            .iter()
            .filter(|chunk| !chunk.is_group())
            .enumerate()
            .map(|(index, chunk)| Layer {
                name: chunk.name.clone(),
                flags: chunk.flags,
                index,
            });

        for layer in indexed.filter(|layer| layer.flags % 2 == 1) {
            if let Some(key) = parenthesized_key(&layer.name, SPLIT_PREFIX) {
                layers.splits.entry(key).or_default().push(layer);
            } else if let Some(key) = parenthesized_key(&layer.name, OPT_PREFIX) {
                layers.opts.entry(key).or_default().push(layer);
            } else if layer.name == HURTBOX_LAYER_NAME {
                if layers.hurtbox.is_some() {
                    warn!("multiple HURTBOX layers; using the last one");
                }
                layers.hurtbox = Some(layer);
            } else if layer.name == HURTMASK_LAYER_NAME {
                if layers.hurtmask.is_some() {
                    warn!("multiple HURTMASK layers; using the last one");
                }
                layers.hurtmask = Some(layer);
            } else {
                layers.normals.push(layer);
            }
        }
        layers
    }
}

/// Extract `key` from a `PREFIX(key)...` layer name.
fn parenthesized_key(name: &str, prefix: &str) -> Option<String> {
    let rest = name.strip_prefix(prefix)?;
    let (key, _) = rest.split_once(')')?;
    Some(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aseprite::chunks::{GROUP_LAYER_TYPE, NORMAL_LAYER_TYPE};

    fn chunk(flags: u16, layer_type: u16, name: &str) -> LayerChunk {
        LayerChunk { flags, layer_type, name: name.to_string() }
    }

    fn classify(chunks: &[LayerChunk]) -> AsepriteLayers {
        AsepriteLayers::from_chunks(&chunks.iter().collect::<Vec<_>>())
    }

    #[test]
    fn test_group_layers_do_not_consume_indices() {
        let chunks = [
            chunk(1, GROUP_LAYER_TYPE, "folder"),
            chunk(1, NORMAL_LAYER_TYPE, "a"),
            chunk(1, GROUP_LAYER_TYPE, "folder2"),
            chunk(1, NORMAL_LAYER_TYPE, "b"),
            chunk(1, NORMAL_LAYER_TYPE, "c"),
        ];
        let layers = classify(&chunks);
        let indices: Vec<usize> = layers.normals.iter().map(|l| l.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_hidden_layers_keep_sibling_indices() {
        let chunks = [
            chunk(0, NORMAL_LAYER_TYPE, "hidden"),
            chunk(1, NORMAL_LAYER_TYPE, "shown"),
        ];
        let layers = classify(&chunks);
        assert_eq!(layers.normals.len(), 1);
        assert_eq!(layers.normals[0].name, "shown");
        assert_eq!(layers.normals[0].index, 1);
    }

    #[test]
    fn test_split_and_opt_classification() {
        let chunks = [
            chunk(1, NORMAL_LAYER_TYPE, "SPLIT(cape)"),
            chunk(1, NORMAL_LAYER_TYPE, "body"),
            chunk(1, NORMAL_LAYER_TYPE, "OPT(hat)"),
            chunk(1, NORMAL_LAYER_TYPE, "SPLIT(cape)"),
        ];
        let layers = classify(&chunks);
        assert_eq!(layers.normals.len(), 1);
        assert_eq!(layers.splits["cape"].len(), 2);
        assert_eq!(layers.opts["hat"].len(), 1);
    }

    #[test]
    fn test_hurtbox_and_hurtmask_singletons() {
        let chunks = [
            chunk(1, NORMAL_LAYER_TYPE, "HURTBOX"),
            chunk(1, NORMAL_LAYER_TYPE, "HURTMASK"),
            chunk(1, NORMAL_LAYER_TYPE, "body"),
        ];
        let layers = classify(&chunks);
        assert_eq!(layers.hurtbox.as_ref().map(|l| l.index), Some(0));
        assert_eq!(layers.hurtmask.as_ref().map(|l| l.index), Some(1));
        assert_eq!(layers.normals.len(), 1);
    }

    #[test]
    fn test_duplicate_hurtbox_last_wins() {
        let chunks = [
            chunk(1, NORMAL_LAYER_TYPE, "HURTBOX"),
            chunk(1, NORMAL_LAYER_TYPE, "HURTBOX"),
        ];
        let layers = classify(&chunks);
        assert_eq!(layers.hurtbox.as_ref().map(|l| l.index), Some(1));
    }
}
