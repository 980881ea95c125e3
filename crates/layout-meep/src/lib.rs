//! layout-meep: Convert photonic mask layouts to MEEP FDTD simulations
//!
//! This crate provides:
//! - A hierarchical layout model with a JSON interchange format and flattening
//! - Layer to material mapping and conversion of polygon layers to MEEP prisms
//! - Parametric photonic devices (Bragg cavities, rib waveguides, MMI splitters)
//! - Python script generation for MEEP simulations
//!
//! Layouts are drawn in µm, which is also the default MEEP length unit, so
//! frequencies are inverse vacuum wavelengths in µm.

pub mod codegen;
pub mod convert;
pub mod devices;
pub mod error;
pub mod layers;
pub mod layout;
pub mod mapping;
pub mod material;
pub mod meep;

pub use codegen::{generate_geometry_script, generate_meep_script};
pub use convert::{annotation_markers, device_to_meep, layout_file_to_meep, layout_to_meep, Conversion, Marker};
pub use error::LayoutError;
pub use layers::{Layer, LayerId, LayerSet, LAYER_PORT, LAYER_SOURCE};
pub use layout::{Cell, CellReference, FlatLayout, Layout, Polygon, PolygonGroup, Port};
pub use mapping::{get_layer_mapping, get_layer_mapping_with, LayerMapping, LayerMaterial, MappingNames};
pub use material::{MaterialLibrary, Medium};
pub use meep::{MeepGeometry, MeepPrimitive, MeepSimulation, MeepSource, Normalization};

use anyhow::{Context, Result};

/// Main entry point: parse a JSON layout and generate a MEEP Python script
pub fn translate(json: &str, layer_set: &LayerSet, config: &TranslationConfig) -> Result<String> {
    let layout = Layout::from_json(json).context("Failed to parse layout")?;
    let simulation = simulate_layout(&layout, layer_set, config)?;
    let script = generate_meep_script(&simulation, config)?;
    Ok(script)
}

/// Flatten, rescale and convert a layout into a simulation setup
pub fn simulate_layout(
    layout: &Layout,
    layer_set: &LayerSet,
    config: &TranslationConfig,
) -> Result<MeepSimulation> {
    let mut flat = layout.flatten().context("Failed to flatten layout")?;
    let scale = config.layout_unit.scale_to(&config.meep_unit);
    if scale != 1.0 {
        flat.scale(scale);
    }

    let mapping = get_layer_mapping_with(
        layer_set,
        &MappingNames::default(),
        config.guide_material.clone(),
    )?;
    let markers = annotation_markers(&flat, &mapping);
    let conversion = device_to_meep(flat.into_polygon_groups(), &mapping)?;
    if !conversion.skipped_layers.is_empty() {
        tracing::info!(layers = ?conversion.skipped_layers, "layers without a material were ignored");
    }

    MeepSimulation::from_conversion(conversion, &markers, config)
}

/// Configuration for the translation process
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    /// Length unit of layout coordinates (default: µm)
    pub layout_unit: LengthUnit,
    /// MEEP length unit (default: µm)
    pub meep_unit: LengthUnit,
    /// Resolution in pixels per MEEP length unit
    pub resolution: f64,
    /// PML thickness in MEEP units
    pub pml_thickness: f64,
    /// Source centre wavelength in MEEP units
    pub wavelength: f64,
    /// Gaussian pulse width as a fraction of the centre frequency
    pub fwidth_fraction: f64,
    /// Number of frequencies recorded by flux monitors
    pub nfreq: usize,
    /// Field component driven by sources and checked for decay
    pub component: String,
    /// Medium of the guide layer
    pub guide_material: Medium,
    /// Background medium
    pub default_material: Medium,
    /// Include flux monitors at port markers
    pub flux_monitors: bool,
    /// Fixed run time; `None` runs until fields decay
    pub until: Option<f64>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            layout_unit: LengthUnit::Micrometer,
            meep_unit: LengthUnit::Micrometer,
            resolution: 30.0,
            pml_thickness: 1.0,
            wavelength: 1.22,
            fwidth_fraction: 0.2,
            nfreq: 100,
            component: "Ey".to_string(),
            guide_material: Medium::silicon(),
            default_material: Medium::oxide(),
            flux_monitors: true,
            until: None,
        }
    }
}

impl TranslationConfig {
    /// Centre frequency in MEEP units
    pub fn fcen(&self) -> f64 {
        1.0 / self.wavelength
    }

    pub fn fwidth(&self) -> f64 {
        self.fcen() * self.fwidth_fraction
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LengthUnit {
    Meter,
    Millimeter,
    Micrometer,
    Nanometer,
}

impl LengthUnit {
    /// Convert from this unit to meters
    pub fn to_meters(&self, value: f64) -> f64 {
        match self {
            LengthUnit::Meter => value,
            LengthUnit::Millimeter => value * 1e-3,
            LengthUnit::Micrometer => value * 1e-6,
            LengthUnit::Nanometer => value * 1e-9,
        }
    }

    /// Convert from meters to this unit
    pub fn from_meters(&self, value: f64) -> f64 {
        match self {
            LengthUnit::Meter => value,
            LengthUnit::Millimeter => value * 1e3,
            LengthUnit::Micrometer => value * 1e6,
            LengthUnit::Nanometer => value * 1e9,
        }
    }

    /// Get scale factor to convert from one unit to another
    pub fn scale_to(&self, target: &LengthUnit) -> f64 {
        if self == target {
            return 1.0;
        }
        target.from_meters(self.to_meters(1.0))
    }
}
