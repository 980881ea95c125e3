//! Symbolic layer registry

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};

/// GDS layer number
pub type LayerId = u16;

/// Layer carrying excitation source markers
pub const LAYER_SOURCE: LayerId = 1;
/// Layer carrying flux port markers
pub const LAYER_PORT: LayerId = 2;

/// A named layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub gds_layer: LayerId,
}

/// Mapping from human readable layer names to GDS layers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSet {
    layers: BTreeMap<String, Layer>,
}

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The photonics layer scheme: shallow and deep waveguide etches plus a floorplan
    pub fn photonic() -> Self {
        let mut lys = Self::new();
        lys.add_layer("wg_shallow", 21);
        lys.add_layer("wg_deep", 22);
        lys.add_layer("FLOORPLAN", 99);
        lys
    }

    /// Adds (or replaces) a layer
    pub fn add_layer(&mut self, name: &str, gds_layer: LayerId) -> &mut Self {
        self.layers.insert(
            name.to_string(),
            Layer {
                name: name.to_string(),
                gds_layer,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Result<&Layer> {
        self.layers
            .get(name)
            .ok_or_else(|| LayoutError::LayerNotFound(name.to_string()))
    }

    /// Shorthand for the GDS layer number of a named layer
    pub fn gds_layer(&self, name: &str) -> Result<LayerId> {
        self.get(name).map(|layer| layer.gds_layer)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
