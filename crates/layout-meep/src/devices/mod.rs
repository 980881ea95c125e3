//! Parametric photonic devices

pub mod bragg;
pub mod mmi;
pub mod waveguide;

pub use bragg::{BraggOverrides, BraggParams, SimLevel};
pub use mmi::{mmi1x2, simulation_cell, MmiParams, SimulationCellParams};
pub use waveguide::{cutoff_k, microring_1d, strip_waveguide, RibCrossSection};
