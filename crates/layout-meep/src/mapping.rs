//! Layer to material table

use std::collections::BTreeMap;

use crate::error::Result;
use crate::layers::{LayerId, LayerSet, LAYER_PORT, LAYER_SOURCE};
use crate::material::Medium;

/// What a layer means to the simulation
#[derive(Debug, Clone, PartialEq)]
pub enum LayerMaterial {
    /// Polygons are solid regions made of this medium
    Physical(Medium),
    /// The layer's bounding box is the simulation cell
    CellBoundary,
    /// Source or port annotations, never rendered as geometry
    Metadata,
}

/// Registry names used to build a [`LayerMapping`]
#[derive(Debug, Clone)]
pub struct MappingNames {
    pub guide: String,
    pub cell_boundary: String,
}

impl Default for MappingNames {
    fn default() -> Self {
        Self {
            guide: "wg_deep".to_string(),
            cell_boundary: "FLOORPLAN".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerMapping {
    entries: BTreeMap<LayerId, LayerMaterial>,
}

impl LayerMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer: LayerId, material: LayerMaterial) -> &mut Self {
        self.entries.insert(layer, material);
        self
    }

    pub fn get(&self, layer: LayerId) -> Option<&LayerMaterial> {
        self.entries.get(&layer)
    }

    pub fn iter(&self) -> impl Iterator<Item = (LayerId, &LayerMaterial)> {
        self.entries.iter().map(|(layer, material)| (*layer, material))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_metadata(&self, layer: LayerId) -> bool {
        matches!(self.get(layer), Some(LayerMaterial::Metadata))
    }
}

/// Silicon guide on `wg_deep`, cell boundary on `FLOORPLAN`, markers on layers 1 and 2
pub fn get_layer_mapping(layer_set: &LayerSet) -> Result<LayerMapping> {
    get_layer_mapping_with(layer_set, &MappingNames::default(), Medium::silicon())
}

pub fn get_layer_mapping_with(
    layer_set: &LayerSet,
    names: &MappingNames,
    guide: Medium,
) -> Result<LayerMapping> {
    let mut mapping = LayerMapping::new();
    mapping
        .insert(layer_set.gds_layer(&names.guide)?, LayerMaterial::Physical(guide))
        .insert(layer_set.gds_layer(&names.cell_boundary)?, LayerMaterial::CellBoundary)
        .insert(LAYER_SOURCE, LayerMaterial::Metadata)
        .insert(LAYER_PORT, LayerMaterial::Metadata);
    Ok(mapping)
}
