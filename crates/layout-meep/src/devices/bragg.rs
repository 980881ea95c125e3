//! Bragg grating cavity built from MEEP blocks
//!
//! A single-mode waveguide whose width alternates between `sm_width ± dw/2`
//! with period `pitch`. A wide section of `cavity * pitch` sits at the middle
//! period. Straight access sections of length `buffer` sit at both ends.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::material::Medium;
use crate::meep::{
    Axis, MeepFluxMonitor, MeepGeometry, MeepPrimitive, MeepSimulation, MeepSource, MeepSourceType,
    MeepSymmetry, Normalization, StopCondition,
};

/// PML thickness around the grating cell
pub const DPML: f64 = 1.0;
/// Centre frequency, 1.22 µm vacuum wavelength
pub const FCEN: f64 = 1.0 / 1.22;
pub const DF: f64 = FCEN / 5.0;
pub const NFREQ: usize = 1001;
/// Transverse cell size
pub const CELL_Y: f64 = 3.0;

/// Grating geometry, lengths in µm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BraggParams {
    pub sm_width: f64,
    pub pitch: f64,
    pub duty: f64,
    pub dw: f64,
    pub n_periods: usize,
    pub buffer: f64,
    /// Cavity length as a multiple of `pitch`
    pub cavity: f64,
    /// Silicon thickness; 0 means a 2D simulation
    pub thickness: f64,
}

impl Default for BraggParams {
    fn default() -> Self {
        Self {
            sm_width: 0.35,
            pitch: 0.21,
            duty: 0.5,
            dw: 0.25,
            n_periods: 50,
            buffer: 4.0,
            cavity: 1.25,
            thickness: 0.0,
        }
    }
}

/// Partial parameter set; `None` keeps the base value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BraggOverrides {
    pub sm_width: Option<f64>,
    pub pitch: Option<f64>,
    pub duty: Option<f64>,
    pub dw: Option<f64>,
    pub n_periods: Option<usize>,
    pub buffer: Option<f64>,
    pub cavity: Option<f64>,
    pub thickness: Option<f64>,
}

impl BraggParams {
    /// 3D variant with a 220 nm silicon layer
    pub fn three_d() -> Self {
        Self {
            pitch: 0.264,
            thickness: 0.22,
            ..Self::default()
        }
    }

    /// Copy of `self` with every set field of `overrides` applied
    pub fn overridden(&self, overrides: &BraggOverrides) -> Self {
        Self {
            sm_width: overrides.sm_width.unwrap_or(self.sm_width),
            pitch: overrides.pitch.unwrap_or(self.pitch),
            duty: overrides.duty.unwrap_or(self.duty),
            dw: overrides.dw.unwrap_or(self.dw),
            n_periods: overrides.n_periods.unwrap_or(self.n_periods),
            buffer: overrides.buffer.unwrap_or(self.buffer),
            cavity: overrides.cavity.unwrap_or(self.cavity),
            thickness: overrides.thickness.unwrap_or(self.thickness),
        }
    }

    pub fn is_2d(&self) -> bool {
        self.thickness == 0.0
    }

    pub fn cell_x(&self) -> f64 {
        self.pitch * self.n_periods as f64 + self.cavity * self.pitch + 2.0 * self.buffer
    }

    pub fn cell(&self) -> Vector3<f64> {
        let cell_z = if self.is_2d() { 0.0 } else { self.thickness + 3.0 };
        Vector3::new(self.cell_x(), CELL_Y, cell_z)
    }

    /// x position of the transmission monitor; reflection sits at the mirror image
    pub fn monitor_x(&self) -> f64 {
        self.cell_x() / 2.0 - DPML - 0.5
    }

    pub fn geometry(&self) -> Vec<MeepGeometry> {
        let cell_x = self.cell_x();
        let silicon = Medium::silicon();
        let block = |name: String, length: f64, width: f64, x: f64| MeepGeometry {
            name,
            primitive: MeepPrimitive::Block {
                center: Vector3::new(x, 0.0, 0.0),
                size: Vector3::new(length, width, self.thickness),
            },
            material: silicon.clone(),
        };

        let mut geometry = Vec::with_capacity(2 * self.n_periods + 3);
        for (name, side) in [("access_left", -1.0), ("access_right", 1.0)] {
            geometry.push(block(
                name.to_string(),
                self.buffer,
                self.sm_width,
                (cell_x - self.buffer) * side / 2.0,
            ));
        }

        let mut x0 = self.buffer - cell_x / 2.0;
        for period in 0..self.n_periods {
            if period == self.n_periods / 2 {
                let length = self.cavity * self.pitch;
                geometry.push(block(
                    "cavity".to_string(),
                    length,
                    self.sm_width + self.dw / 2.0,
                    x0 + length / 2.0,
                ));
                x0 += length;
            }
            let teeth = [
                (self.pitch * self.duty, self.sm_width + self.dw / 2.0),
                (self.pitch * (1.0 - self.duty), self.sm_width - self.dw / 2.0),
            ];
            for (tooth, (length, width)) in teeth.into_iter().enumerate() {
                geometry.push(block(
                    format!("period{}_tooth{}", period, tooth),
                    length,
                    width,
                    x0 + length / 2.0,
                ));
                x0 += length;
            }
        }
        geometry
    }

    /// Unperturbed guide spanning the whole cell, for the normalization run
    pub fn reference_geometry(&self) -> Vec<MeepGeometry> {
        vec![MeepGeometry {
            name: "straight".to_string(),
            primitive: MeepPrimitive::Block {
                center: Vector3::zeros(),
                size: Vector3::new(self.cell_x(), self.sm_width, self.thickness),
            },
            material: Medium::silicon(),
        }]
    }

    /// Eigenmode source just outside the reflection monitor
    pub fn source(&self) -> MeepSource {
        let cell = self.cell();
        MeepSource {
            source_type: MeepSourceType::EigenModeSource {
                fcen: FCEN,
                fwidth: DF,
                eig_band: 2,
                direction: Axis::X,
            },
            component: "Ey".to_string(),
            center: Vector3::new(-self.monitor_x() - 0.5, 0.0, 0.0),
            size: Vector3::new(0.0, cell.y, cell.z),
        }
    }

    /// Reflection and transmission flux planes
    pub fn flux_monitors(&self) -> Vec<MeepFluxMonitor> {
        let size = Vector3::new(0.0, 2.0 * self.sm_width, 2.0 * self.thickness);
        [("refl", -1.0), ("tran", 1.0)]
            .into_iter()
            .map(|(name, side)| MeepFluxMonitor {
                name: name.to_string(),
                center: Vector3::new(side * self.monitor_x(), 0.0, 0.0),
                size,
                axis: Axis::X,
                direction: 1,
            })
            .collect()
    }

    pub fn symmetries(&self) -> Vec<MeepSymmetry> {
        let mut symmetries = vec![MeepSymmetry {
            axis: Axis::Y,
            phase: -1.0,
        }];
        if !self.is_2d() {
            symmetries.push(MeepSymmetry {
                axis: Axis::Z,
                phase: 1.0,
            });
        }
        symmetries
    }

    /// Runs to a fixed time, or until Ey at the transmission monitor decays by 1e-3
    pub fn stop_condition(&self, until: Option<f64>) -> StopCondition {
        match until {
            Some(t) => StopCondition::Until(t),
            None => StopCondition::FieldsDecayed {
                dt: 20.0,
                component: "Ey".to_string(),
                point: Vector3::new(self.monitor_x(), 0.0, 0.0),
                decay_by: 1e-3,
            },
        }
    }

    pub fn simulation(&self, resolution: f64, until: Option<f64>) -> MeepSimulation {
        MeepSimulation {
            cell_size: self.cell(),
            geometry_center: Vector3::zeros(),
            resolution,
            pml_thickness: DPML,
            default_material: Medium::oxide(),
            geometry: self.geometry(),
            sources: vec![self.source()],
            flux_monitors: self.flux_monitors(),
            symmetries: self.symmetries(),
            fcen: FCEN,
            fwidth: DF,
            nfreq: NFREQ,
            stop: self.stop_condition(until),
            normalization: Some(Normalization {
                geometry: self.reference_geometry(),
                monitor: "refl".to_string(),
            }),
        }
    }
}

/// Accuracy presets trading run time for fidelity
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SimLevel {
    /// Locating the resonance wavelength
    Rough,
    /// Decent resonance line shapes
    Shape,
    /// Loss profile
    Loss,
}

impl SimLevel {
    pub fn overrides(&self) -> BraggOverrides {
        match self {
            SimLevel::Rough => BraggOverrides {
                n_periods: Some(10),
                buffer: Some(2.0),
                dw: Some(0.3),
                ..Default::default()
            },
            SimLevel::Shape => BraggOverrides {
                buffer: Some(4.0),
                ..Default::default()
            },
            SimLevel::Loss => BraggOverrides {
                buffer: Some(14.0),
                ..Default::default()
            },
        }
    }

    pub fn resolution(&self) -> f64 {
        match self {
            SimLevel::Rough => 20.0,
            SimLevel::Shape => 30.0,
            SimLevel::Loss => 40.0,
        }
    }

    /// Parameters and resolution for this level, starting from `base`
    pub fn apply(&self, base: &BraggParams) -> (BraggParams, f64) {
        (base.overridden(&self.overrides()), self.resolution())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_default_cell() {
        let geo = BraggParams::default();
        // 0.21 * 50 + 1.25 * 0.21 + 8
        assert!(approx(geo.cell_x(), 18.7625));
        assert_eq!(geo.cell().z, 0.0);
        assert!(approx(geo.monitor_x(), 18.7625 / 2.0 - 1.5));

        let geo3d = BraggParams::three_d();
        assert!(approx(geo3d.cell().z, 3.22));
    }

    #[test]
    fn test_override_leaves_base_untouched() {
        let base = BraggParams::default();
        let geo = base.overridden(&BraggOverrides {
            n_periods: Some(4),
            dw: Some(0.1),
            ..Default::default()
        });
        assert_eq!(geo.n_periods, 4);
        assert_eq!(geo.dw, 0.1);
        assert_eq!(geo.pitch, base.pitch);
        assert_eq!(base, BraggParams::default());
    }

    #[test]
    fn test_overrides_from_json() {
        let overrides: BraggOverrides = serde_json::from_str(r#"{"buffer": 6.5}"#).unwrap();
        let geo = BraggParams::default().overridden(&overrides);
        assert_eq!(geo.buffer, 6.5);
        assert_eq!(geo.n_periods, 50);
    }

    #[test]
    fn test_geometry_fills_cell() {
        let geo = BraggParams::default().overridden(&BraggOverrides {
            n_periods: Some(4),
            ..Default::default()
        });
        let blocks = geo.geometry();
        // two access sections, one cavity, two teeth per period
        assert_eq!(blocks.len(), 2 + 1 + 2 * 4);

        let total: f64 = blocks
            .iter()
            .map(|g| match &g.primitive {
                MeepPrimitive::Block { size, .. } => size.x,
                other => panic!("Expected Block, got {:?}", other),
            })
            .sum();
        assert!(approx(total, geo.cell_x()));

        // grating starts where the left access section ends
        match &blocks[2].primitive {
            MeepPrimitive::Block { center, size } => {
                assert!(approx(center.x - size.x / 2.0, geo.buffer - geo.cell_x() / 2.0));
                assert!(approx(size.y, geo.sm_width + geo.dw / 2.0));
            }
            other => panic!("Expected Block, got {:?}", other),
        }
        assert!(blocks.iter().any(|g| g.name == "cavity"));
    }

    #[test]
    fn test_reference_is_straight_guide() {
        let geo = BraggParams::three_d();
        let reference = geo.reference_geometry();
        assert_eq!(reference.len(), 1);
        match &reference[0].primitive {
            MeepPrimitive::Block { center, size } => {
                assert_eq!(*center, Vector3::zeros());
                assert!(approx(size.x, geo.cell_x()));
                assert_eq!(size.y, geo.sm_width);
                assert_eq!(size.z, geo.thickness);
            }
            other => panic!("Expected Block, got {:?}", other),
        }
    }

    #[test]
    fn test_level_names() {
        use clap::ValueEnum;
        assert_eq!(SimLevel::from_str("loss", true), Ok(SimLevel::Loss));
        assert_eq!(SimLevel::from_str("Rough", true), Ok(SimLevel::Rough));
        assert!(SimLevel::from_str("fine", true).is_err());
    }

    #[test]
    fn test_levels() {
        let (rough, res) = SimLevel::Rough.apply(&BraggParams::default());
        assert_eq!(rough.n_periods, 10);
        assert_eq!(rough.buffer, 2.0);
        assert_eq!(rough.dw, 0.3);
        assert_eq!(res, 20.0);

        let (loss, res) = SimLevel::Loss.apply(&BraggParams::default());
        assert_eq!(loss.buffer, 14.0);
        assert_eq!(loss.n_periods, 50);
        assert_eq!(res, 40.0);
    }

    #[test]
    fn test_simulation_setup() {
        let geo = BraggParams::default();
        let sim = geo.simulation(30.0, None);
        assert_eq!(sim.symmetries.len(), 1);
        assert_eq!(sim.flux_monitors[0].center.x, -geo.monitor_x());
        assert_eq!(sim.sources[0].center.x, -geo.monitor_x() - 0.5);
        assert_eq!(sim.sources[0].size.y, CELL_Y);
        assert!(matches!(sim.stop, StopCondition::FieldsDecayed { dt, .. } if dt == 20.0));

        let reference = sim.normalization.as_ref().unwrap();
        assert_eq!(reference.monitor, "refl");
        assert!(sim.flux_monitors.iter().any(|f| f.name == reference.monitor));

        let sim3d = BraggParams::three_d().simulation(30.0, Some(100.0));
        assert_eq!(sim3d.symmetries[1].axis, Axis::Z);
        assert_eq!(sim3d.stop, StopCondition::Until(100.0));
    }
}
