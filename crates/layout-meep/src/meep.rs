//! MEEP simulation representation

use anyhow::{bail, Result};
use nalgebra::Vector3;

use crate::convert::{Conversion, Marker};
use crate::layers::{LAYER_PORT, LAYER_SOURCE};
use crate::material::Medium;
use crate::TranslationConfig;

/// A MEEP simulation setup
#[derive(Debug, Clone)]
pub struct MeepSimulation {
    /// Cell size in MEEP units
    pub cell_size: Vector3<f64>,
    /// Position of the cell centre in geometry coordinates
    pub geometry_center: Vector3<f64>,
    /// Resolution (pixels per length unit)
    pub resolution: f64,
    /// PML thickness
    pub pml_thickness: f64,
    /// Background medium
    pub default_material: Medium,
    pub geometry: Vec<MeepGeometry>,
    pub sources: Vec<MeepSource>,
    /// Flux monitors (for transmission / reflection)
    pub flux_monitors: Vec<MeepFluxMonitor>,
    pub symmetries: Vec<MeepSymmetry>,
    /// Center frequency (MEEP units)
    pub fcen: f64,
    /// Frequency width (MEEP units)
    pub fwidth: f64,
    /// Number of flux frequencies
    pub nfreq: usize,
    pub stop: StopCondition,
    /// Reference run whose flux is subtracted from one monitor
    pub normalization: Option<Normalization>,
}

/// A reference run, e.g. a straight guide without the scatterer
///
/// The reference flux at `monitor` is loaded negated into the device run, so
/// that monitor records only the field scattered back by the device.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub geometry: Vec<MeepGeometry>,
    /// Name of the flux monitor to normalize
    pub monitor: String,
}

/// MEEP geometry object
#[derive(Debug, Clone, PartialEq)]
pub struct MeepGeometry {
    pub name: String,
    pub primitive: MeepPrimitive,
    pub material: Medium,
}

/// MEEP primitive types used by the photonic devices
#[derive(Debug, Clone, PartialEq)]
pub enum MeepPrimitive {
    /// Axis-aligned block; infinite extents are allowed
    Block { center: Vector3<f64>, size: Vector3<f64> },
    /// Extruded polygon; height 0 is a flat 2D region
    Prism { vertices: Vec<Vector3<f64>>, height: f64 },
}

/// Cartesian axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

/// MEEP source definition
#[derive(Debug, Clone, PartialEq)]
pub struct MeepSource {
    pub source_type: MeepSourceType,
    pub component: String, // "Ez", "Hy", etc.
    pub center: Vector3<f64>,
    pub size: Vector3<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeepSourceType {
    GaussianSource { fcen: f64, fwidth: f64 },
    /// Gaussian pulse launched into a waveguide mode
    EigenModeSource {
        fcen: f64,
        fwidth: f64,
        eig_band: u32,
        direction: Axis,
    },
}

/// Flux monitor
#[derive(Debug, Clone, PartialEq)]
pub struct MeepFluxMonitor {
    pub name: String,
    pub center: Vector3<f64>,
    pub size: Vector3<f64>,
    /// Normal of the flux plane
    pub axis: Axis,
    pub direction: i32, // +1 or -1
}

/// Mirror symmetry plane normal to `axis`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeepSymmetry {
    pub axis: Axis,
    pub phase: f64,
}

/// When `sim.run` stops
#[derive(Debug, Clone, PartialEq)]
pub enum StopCondition {
    Until(f64),
    /// `until_after_sources=mp.stop_when_fields_decayed(dt, component, point, decay_by)`
    FieldsDecayed {
        dt: f64,
        component: String,
        point: Vector3<f64>,
        decay_by: f64,
    },
}

impl MeepSimulation {
    /// Create a MEEP simulation from a converted layout and its annotation markers
    ///
    /// Source markers become Gaussian line sources and port markers become
    /// flux monitors. Markers are collapsed to a line along their thin side.
    pub fn from_conversion(
        conversion: Conversion,
        markers: &[Marker],
        config: &TranslationConfig,
    ) -> Result<Self> {
        if conversion.cell_size.x <= 0.0 || conversion.cell_size.y <= 0.0 {
            bail!(
                "degenerate simulation cell {} x {}",
                conversion.cell_size.x,
                conversion.cell_size.y
            );
        }

        let fcen = config.fcen();
        let fwidth = config.fwidth();

        let mut sources = Vec::new();
        let mut flux_monitors = Vec::new();
        for marker in markers {
            let (center, size, axis) = marker_line(marker);
            match marker.layer {
                LAYER_SOURCE => sources.push(MeepSource {
                    source_type: MeepSourceType::GaussianSource { fcen, fwidth },
                    component: config.component.clone(),
                    center,
                    size,
                }),
                LAYER_PORT => {
                    if config.flux_monitors {
                        flux_monitors.push(MeepFluxMonitor {
                            name: format!("port_{}", flux_monitors.len() + 1),
                            center,
                            size,
                            axis,
                            direction: 1,
                        });
                    }
                }
                other => tracing::debug!(layer = other, "marker on unrecognised metadata layer"),
            }
        }

        if sources.is_empty() {
            // Point source at the cell centre
            tracing::warn!("no source markers in layout, using a point source at the cell centre");
            sources.push(MeepSource {
                source_type: MeepSourceType::GaussianSource { fcen, fwidth },
                component: config.component.clone(),
                center: conversion.cell_center,
                size: Vector3::zeros(),
            });
        }

        let stop = match config.until {
            Some(t) => StopCondition::Until(t),
            None => StopCondition::FieldsDecayed {
                dt: 50.0,
                component: config.component.clone(),
                point: flux_monitors
                    .first()
                    .map_or(conversion.cell_center, |m| m.center),
                decay_by: 1e-3,
            },
        };

        Ok(Self {
            cell_size: conversion.cell_size,
            geometry_center: conversion.cell_center,
            resolution: config.resolution,
            pml_thickness: config.pml_thickness,
            default_material: config.default_material.clone(),
            geometry: conversion.geometry,
            sources,
            flux_monitors,
            symmetries: Vec::new(),
            fcen,
            fwidth,
            nfreq: config.nfreq,
            stop,
            normalization: None,
        })
    }

    /// True when the cell has no thickness
    pub fn is_2d(&self) -> bool {
        self.cell_size.z == 0.0
    }
}

/// Centre, line size and normal axis for a marker rectangle
fn marker_line(marker: &Marker) -> (Vector3<f64>, Vector3<f64>, Axis) {
    let center = Vector3::new(marker.center.x, marker.center.y, 0.0);
    if marker.size.x <= marker.size.y {
        (center, Vector3::new(0.0, marker.size.y, 0.0), Axis::X)
    } else {
        (center, Vector3::new(marker.size.x, 0.0, 0.0), Axis::Y)
    }
}
