//! Dielectric media and MEEP material mapping

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Isotropic electromagnetic medium as understood by `mp.Medium`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medium {
    /// Display name, used as a lookup key in [`MaterialLibrary`]
    pub name: String,
    /// Relative permittivity (epsilon_r)
    pub epsilon: f64,
    /// Relative permeability (mu_r)
    #[serde(default = "unity")]
    pub mu: f64,
    /// Electric conductivity in MEEP units
    #[serde(default)]
    pub conductivity: f64,
}

fn unity() -> f64 {
    1.0
}

impl Medium {
    pub fn from_epsilon(name: &str, epsilon: f64) -> Self {
        Self {
            name: name.to_string(),
            epsilon,
            mu: 1.0,
            conductivity: 0.0,
        }
    }

    /// Medium with refractive index `n`, i.e. epsilon = n²
    pub fn from_index(name: &str, index: f64) -> Self {
        Self::from_epsilon(name, index * index)
    }

    pub fn air() -> Self {
        Self::from_epsilon("air", 1.0)
    }

    /// Crystalline silicon as used for 2D guides (epsilon = 12, n ≈ 3.46)
    pub fn silicon() -> Self {
        Self::from_epsilon("silicon", 12.0)
    }

    /// Oxide cladding (n = 1.5)
    pub fn oxide() -> Self {
        Self::from_epsilon("oxide", 2.25)
    }

    /// Silicon at 1.22 µm (n = 3.45)
    pub fn si() -> Self {
        Self::from_index("Si", 3.45)
    }

    /// Silicon at cryogenic temperature (n = 3.49)
    pub fn cold_silicon() -> Self {
        Self::from_index("ColdSi", 3.49)
    }

    /// Thermal oxide (n = 1.45)
    pub fn silica() -> Self {
        Self::from_index("SiO2", 1.45)
    }

    /// Refractive index sqrt(epsilon * mu)
    pub fn index(&self) -> f64 {
        (self.epsilon * self.mu).sqrt()
    }

    pub fn is_air(&self) -> bool {
        self.epsilon == 1.0 && self.mu == 1.0 && self.conductivity == 0.0
    }

    /// Generate MEEP Python code for this medium
    pub fn to_meep_python(&self) -> String {
        if self.is_air() {
            return "mp.air".to_string();
        }

        let mut args = vec![format!("epsilon={}", self.epsilon)];
        if self.mu != 1.0 {
            args.push(format!("mu={}", self.mu));
        }
        if self.conductivity > 0.0 {
            args.push(format!("D_conductivity={:.6e}", self.conductivity));
        }
        format!("mp.Medium({})", args.join(", "))
    }
}

/// Material library with the media used by the photonic devices
pub struct MaterialLibrary {
    materials: HashMap<String, Medium>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        let mut lib = Self {
            materials: HashMap::new(),
        };

        lib.add(Medium::air());
        lib.add(Medium::silicon());
        lib.add(Medium::oxide());
        lib.add(Medium::si());
        lib.add(Medium::cold_silicon());
        lib.add(Medium::silica());

        lib
    }

    pub fn add(&mut self, medium: Medium) {
        self.materials.insert(medium.name.to_lowercase(), medium);
    }

    pub fn get(&self, name: &str) -> Option<&Medium> {
        self.materials.get(&name.to_lowercase())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.materials.values().map(|m| m.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for MaterialLibrary {
    fn default() -> Self {
        Self::new()
    }
}
