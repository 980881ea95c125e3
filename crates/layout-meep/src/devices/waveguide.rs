//! Waveguide cross-sections for mode solving
//!
//! Cross-sections lie in the y-z plane and extend infinitely along x, the
//! propagation direction.

use nalgebra::Vector3;

use crate::material::Medium;
use crate::meep::{MeepGeometry, MeepPrimitive};

/// Rib silicon thickness
pub const T_SI: f64 = 0.220;
/// Partial-etch pedestal thickness and width
pub const T_PED: f64 = 0.050;
pub const W_PED: f64 = 3.0;
/// Buried oxide below and cladding above the silicon
pub const T_BOX: f64 = 1.2;
pub const T_TOP: f64 = 1.2;
/// Supercell extent
pub const SC_Y: f64 = 3.5;
pub const SC_Z: f64 = T_BOX + T_TOP;

fn block(name: &str, center: Vector3<f64>, size: Vector3<f64>, material: &Medium) -> MeepGeometry {
    MeepGeometry {
        name: name.to_string(),
        primitive: MeepPrimitive::Block { center, size },
        material: material.clone(),
    }
}

/// Silicon rib on a shallow pedestal, optionally paired and oxide encapsulated
#[derive(Debug, Clone, PartialEq)]
pub struct RibCrossSection {
    pub wg_width: f64,
    /// Gap between two parallel ribs; `None` for a single rib
    pub two_wg_gap: Option<f64>,
    /// Conformal oxide thickness over the silicon
    pub encapsulation: Option<f64>,
    /// Medium above the chip (air by default)
    pub cladding: Medium,
}

impl Default for RibCrossSection {
    fn default() -> Self {
        Self {
            wg_width: 0.35,
            two_wg_gap: None,
            encapsulation: None,
            cladding: Medium::air(),
        }
    }
}

impl RibCrossSection {
    /// Supercell size for the mode solver lattice
    pub fn lattice_size(&self) -> Vector3<f64> {
        Vector3::new(0.0, SC_Y, SC_Z)
    }

    /// Rib centre offsets along y
    pub fn offsets(&self) -> Vec<f64> {
        match self.two_wg_gap {
            None => vec![0.0],
            Some(gap) => {
                let half = (self.wg_width + gap) / 2.0;
                vec![-half, half]
            }
        }
    }

    /// Blocks from the bottom up; later blocks take precedence in MEEP
    pub fn geometry(&self) -> Vec<MeepGeometry> {
        let inf = f64::INFINITY;
        let oxide = Medium::silica();
        let cold_si = Medium::cold_silicon();

        let mut geometry = vec![
            block(
                "cladding",
                Vector3::new(0.0, 0.0, T_TOP / 2.0),
                Vector3::new(inf, inf, T_TOP),
                &self.cladding,
            ),
            block(
                "box",
                Vector3::new(0.0, 0.0, -T_BOX / 2.0),
                Vector3::new(inf, inf, T_BOX),
                &oxide,
            ),
        ];

        if let Some(encapsulation) = self.encapsulation {
            let t_ped = T_PED + encapsulation;
            let t_rib = T_SI + encapsulation;
            geometry.push(block(
                "encapsulation_pedestal",
                Vector3::new(0.0, 0.0, t_ped / 2.0),
                Vector3::new(inf, inf, t_ped),
                &oxide,
            ));
            geometry.push(block(
                "encapsulation_rib",
                Vector3::new(0.0, 0.0, t_rib / 2.0),
                Vector3::new(inf, self.wg_width + 2.0 * encapsulation, t_rib),
                &oxide,
            ));
        }

        geometry.push(block(
            "pedestal",
            Vector3::new(0.0, 0.0, T_PED / 2.0),
            Vector3::new(inf, W_PED, T_PED),
            &cold_si,
        ));
        for (i, offset) in self.offsets().into_iter().enumerate() {
            geometry.push(block(
                &format!("core{}", i),
                Vector3::new(0.0, offset, T_SI / 2.0),
                Vector3::new(inf, self.wg_width, T_SI),
                &cold_si,
            ));
        }
        geometry
    }
}

/// Wavenumber of the light line in the buried oxide at `freq`
pub fn cutoff_k(freq: f64) -> f64 {
    freq * Medium::silica().index()
}

/// Fully etched silicon strip with oxide above, in a `sc_z` tall supercell
pub fn strip_waveguide(width: f64, height: f64, sc_z: f64) -> Vec<MeepGeometry> {
    let inf = f64::INFINITY;
    vec![
        block(
            "core",
            Vector3::zeros(),
            Vector3::new(inf, width, height),
            &Medium::si(),
        ),
        block(
            "top_oxide",
            Vector3::new(0.0, 0.0, 0.25 * (sc_z + height)),
            Vector3::new(inf, inf, 0.5 * (sc_z - height)),
            &Medium::silica(),
        ),
    ]
}

/// One-dimensional slice through a microring of index `n`, width `w` and radius `r`
///
/// The background spans from the ring axis to `r + w + pad` along x.
pub fn microring_1d(n: f64, w: f64, r: f64, pad: f64) -> Vec<MeepGeometry> {
    let inf = f64::INFINITY;
    let bg_radius = r + w + pad;
    vec![
        block(
            "background",
            Vector3::new(bg_radius / 2.0, 0.0, 0.0),
            Vector3::new(bg_radius, inf, inf),
            &Medium::from_index("background", 1.0),
        ),
        block(
            "ring",
            Vector3::new(r + w / 2.0, 0.0, 0.0),
            Vector3::new(w, inf, inf),
            &Medium::from_index("ring", n),
        ),
    ]
}
