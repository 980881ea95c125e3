//! Python code generation for MEEP simulations

use anyhow::Result;
use minijinja::{context, Environment};
use nalgebra::Vector3;
use serde::Serialize;

use crate::meep::{MeepGeometry, MeepPrimitive, MeepSimulation, MeepSourceType, StopCondition};
use crate::TranslationConfig;

const MEEP_TEMPLATE: &str = r##"#!/usr/bin/env python3
"""
MEEP FDTD Simulation - Auto-generated from a mask layout
{{ header_comment }}

Generated: {{ timestamp }}
Layout unit: {{ layout_unit }}
MEEP unit: {{ meep_unit }}
"""

import meep as mp
import numpy as np
import argparse
import os
from datetime import datetime

# =============================================================================
# Simulation Parameters (MEEP normalized units)
# =============================================================================

CELL_SIZE = {{ cell_size }}
GEOMETRY_CENTER = {{ geometry_center }}

# Resolution (pixels per length unit)
RESOLUTION = {{ resolution }}

# PML thickness
PML_THICKNESS = {{ pml_thickness }}

# Frequency (MEEP units: inverse vacuum wavelength)
FCEN = {{ fcen }}
FWIDTH = {{ fwidth }}
NFREQ = {{ nfreq }}

DEFAULT_MATERIAL = {{ default_material }}


# =============================================================================
# Geometry Definition
# =============================================================================
{% macro append_geometry(geom) %}

    # {{ geom.name }}
{% if geom.type == "block" %}
    geometry.append(mp.Block(
        center={{ geom.center }},
        size={{ geom.size }},
        material={{ geom.material }}
    ))
{% elif geom.type == "prism" %}
    geometry.append(mp.Prism(
        [{% for v in geom.vertices %}{{ v }}{% if not loop.last %}, {% endif %}{% endfor %}],
        height={{ geom.height }},
        material={{ geom.material }}
    ))
{% endif %}
{% endmacro %}

def build_geometry():
    """Build MEEP geometry objects."""
    geometry = []
{% for geom in geometry %}
{{ append_geometry(geom) }}
{% endfor %}

    return geometry
{% if normalization %}


def build_reference_geometry():
    """Geometry of the normalization run."""
    geometry = []
{% for geom in normalization.geometry %}
{{ append_geometry(geom) }}
{% endfor %}

    return geometry
{% endif %}


# =============================================================================
# Sources
# =============================================================================

def build_sources():
    """Build MEEP excitation sources."""
    sources = []
{% for src in sources %}

{% if src.type == "gaussian" %}
    sources.append(mp.Source(
        src=mp.GaussianSource(frequency={{ src.fcen }}, fwidth={{ src.fwidth }}),
        component=mp.{{ src.component }},
        center={{ src.center }},
        size={{ src.size }}
    ))
{% elif src.type == "eigenmode" %}
    sources.append(mp.EigenModeSource(
        mp.GaussianSource(frequency={{ src.fcen }}, fwidth={{ src.fwidth }}),
        eig_band={{ src.eig_band }},
        direction=mp.{{ src.direction }},
        component=mp.{{ src.component }},
        center={{ src.center }},
        size={{ src.size }}
    ))
{% endif %}
{% endfor %}

    return sources


def build_symmetries():
    return [
{% for sym in symmetries %}
        mp.Mirror(mp.{{ sym.axis }}, phase={{ sym.phase }}),
{% endfor %}
    ]


# =============================================================================
# Flux Regions
# =============================================================================
{% if flux_monitors|length > 0 %}

def build_flux_monitors(sim, fcen, fwidth, nfreq=NFREQ):
    """Add flux monitors to the simulation."""
    monitors = {}
{% for flux in flux_monitors %}
    monitors["{{ flux.name }}"] = sim.add_flux(
        fcen, fwidth, nfreq,
        mp.FluxRegion(
            center={{ flux.center }},
            size={{ flux.size }},
            direction=mp.{{ flux.axis }},
            weight={{ flux.direction }}
        )
    )
{% endfor %}
    return monitors
{% endif %}


# =============================================================================
# Main Simulation
# =============================================================================

def make_simulation(geometry, resolution):
    return mp.Simulation(
        cell_size=CELL_SIZE,
        geometry_center=GEOMETRY_CENTER,
        geometry=geometry,
        sources=build_sources(),
        symmetries=build_symmetries(),
        boundary_layers=[mp.PML(PML_THICKNESS)],
        resolution=resolution,
        default_material=DEFAULT_MATERIAL,
    )


def run_to_stop(sim):
{% if stop.type == "until" %}
    sim.run(until={{ stop.until }})
{% else %}
    sim.run(
        until_after_sources=mp.stop_when_fields_decayed(
            {{ stop.dt }}, mp.{{ stop.component }}, {{ stop.point }}, {{ stop.decay_by }}
        )
    )
{% endif %}


def run_simulation(output_dir="output", resolution=RESOLUTION):
    """Run the FDTD simulation."""

    os.makedirs(output_dir, exist_ok=True)

    print("=" * 60)
    print("MEEP FDTD Simulation")
    print("=" * 60)
    print(f"Cell size: {CELL_SIZE}")
    print(f"Resolution: {resolution} pixels/unit")
    print(f"Frequency: {FCEN:.4e} (MEEP units)")
    print()

    results = {}
{% if normalization %}
    # Reference run: the incident pulse at "{{ normalization.monitor }}"
    print("Running normalization...")
    ref_sim = make_simulation(build_reference_geometry(), resolution)
    ref_monitors = build_flux_monitors(ref_sim, FCEN, FWIDTH)
    run_to_stop(ref_sim)
    ref_flux_data = ref_sim.get_flux_data(ref_monitors["{{ normalization.monitor }}"])
    results["incident_flux"] = mp.get_fluxes(ref_monitors["{{ normalization.monitor }}"])
    ref_sim.reset_meep()
{% endif %}

    sim = make_simulation(build_geometry(), resolution)
{% if flux_monitors|length > 0 %}
    flux_monitors = build_flux_monitors(sim, FCEN, FWIDTH)
{% endif %}
{% if normalization %}
    sim.load_minus_flux_data(flux_monitors["{{ normalization.monitor }}"], ref_flux_data)
{% endif %}

    print("Running simulation...")
    run_to_stop(sim)

    print("Simulation complete.")

{% if flux_monitors|length > 0 %}
    for name, flux in flux_monitors.items():
        results[f"{name}_freqs"] = mp.get_flux_freqs(flux)
        results[f"{name}_flux"] = mp.get_fluxes(flux)

    np.savez(f"{output_dir}/results.npz", **results)
    print(f"Results saved to {output_dir}/results.npz")
{% endif %}

    return sim


# =============================================================================
# Entry Point
# =============================================================================

if __name__ == "__main__":
    parser = argparse.ArgumentParser(description="MEEP FDTD Simulation")
    parser.add_argument("--output", type=str, default="output", help="Output directory")
    parser.add_argument("--resolution", type=float, default=RESOLUTION, help="Override resolution")

    args = parser.parse_args()

    timestamp = datetime.now().strftime("%Y%m%d_%H%M%S")
    output_dir = f"{args.output}/sim_{timestamp}"

    run_simulation(output_dir=output_dir, resolution=args.resolution)
"##;

const GEOMETRY_TEMPLATE: &str = r##"#!/usr/bin/env python3
"""
MEEP geometry - Auto-generated cross-section
Generated: {{ timestamp }}
"""

import meep as mp

RESOLUTION = {{ resolution }}
geometry_lattice = mp.Lattice(size={{ lattice_size }})

geometry = [
{% for geom in geometry %}
    # {{ geom.name }}
    mp.Block(center={{ geom.center }}, size={{ geom.size }}, material={{ geom.material }}),
{% endfor %}
]
"##;

/// Python float literal that parses back to exactly `value`
///
/// Infinities map to `mp.inf`. Very small or large values come out in
/// exponent form, which keeps SI-unit coordinates intact.
fn py_num(value: f64) -> String {
    if value.is_infinite() {
        let inf = if value > 0.0 { "mp.inf" } else { "-mp.inf" };
        inf.to_string()
    } else {
        format!("{:?}", value)
    }
}

fn py_vec(v: &Vector3<f64>) -> String {
    format!("mp.Vector3({}, {}, {})", py_num(v.x), py_num(v.y), py_num(v.z))
}

#[derive(Serialize)]
struct GeometryContext {
    name: String,
    #[serde(rename = "type")]
    geom_type: &'static str,
    center: String,
    size: String,
    vertices: Vec<String>,
    height: String,
    material: String,
}

fn geometry_context(g: &MeepGeometry) -> GeometryContext {
    let material = g.material.to_meep_python();
    match &g.primitive {
        MeepPrimitive::Block { center, size } => GeometryContext {
            name: g.name.clone(),
            geom_type: "block",
            center: py_vec(center),
            size: py_vec(size),
            vertices: vec![],
            height: String::new(),
            material,
        },
        MeepPrimitive::Prism { vertices, height } => GeometryContext {
            name: g.name.clone(),
            geom_type: "prism",
            center: String::new(),
            size: String::new(),
            vertices: vertices.iter().map(py_vec).collect(),
            height: py_num(*height),
            material,
        },
    }
}

/// Generate a MEEP Python script from a simulation definition
pub fn generate_meep_script(sim: &MeepSimulation, config: &TranslationConfig) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("meep", MEEP_TEMPLATE)?;

    let template = env.get_template("meep")?;

    let geometry: Vec<_> = sim.geometry.iter().map(geometry_context).collect();

    let sources: Vec<_> = sim
        .sources
        .iter()
        .map(|s| {
            let base = serde_json::json!({
                "component": s.component,
                "center": py_vec(&s.center),
                "size": py_vec(&s.size),
            });
            let extra = match &s.source_type {
                MeepSourceType::GaussianSource { fcen, fwidth } => serde_json::json!({
                    "type": "gaussian",
                    "fcen": py_num(*fcen),
                    "fwidth": py_num(*fwidth),
                }),
                MeepSourceType::EigenModeSource {
                    fcen,
                    fwidth,
                    eig_band,
                    direction,
                } => serde_json::json!({
                    "type": "eigenmode",
                    "fcen": py_num(*fcen),
                    "fwidth": py_num(*fwidth),
                    "eig_band": eig_band,
                    "direction": direction.as_str(),
                }),
            };
            merge(base, extra)
        })
        .collect();

    let flux_monitors: Vec<_> = sim
        .flux_monitors
        .iter()
        .map(|f| {
            serde_json::json!({
                "name": f.name,
                "center": py_vec(&f.center),
                "size": py_vec(&f.size),
                "axis": f.axis.as_str(),
                "direction": f.direction,
            })
        })
        .collect();

    let symmetries: Vec<_> = sim
        .symmetries
        .iter()
        .map(|s| serde_json::json!({ "axis": s.axis.as_str(), "phase": py_num(s.phase) }))
        .collect();

    let stop = match &sim.stop {
        StopCondition::Until(t) => serde_json::json!({ "type": "until", "until": py_num(*t) }),
        StopCondition::FieldsDecayed {
            dt,
            component,
            point,
            decay_by,
        } => serde_json::json!({
            "type": "decay",
            "dt": py_num(*dt),
            "component": component,
            "point": py_vec(point),
            "decay_by": py_num(*decay_by),
        }),
    };

    let normalization = match &sim.normalization {
        Some(n) => {
            if !sim.flux_monitors.iter().any(|f| f.name == n.monitor) {
                anyhow::bail!("normalization monitor `{}` is not a flux monitor", n.monitor);
            }
            let geometry: Vec<_> = n.geometry.iter().map(geometry_context).collect();
            Some(serde_json::json!({ "monitor": n.monitor, "geometry": geometry }))
        }
        None => None,
    };

    let output = template.render(context! {
        header_comment => "Translated from layout polygons",
        timestamp => chrono::Utc::now().to_rfc3339(),
        layout_unit => format!("{:?}", config.layout_unit),
        meep_unit => format!("{:?}", config.meep_unit),
        cell_size => py_vec(&sim.cell_size),
        geometry_center => py_vec(&sim.geometry_center),
        resolution => py_num(sim.resolution),
        pml_thickness => py_num(sim.pml_thickness),
        fcen => py_num(sim.fcen),
        fwidth => py_num(sim.fwidth),
        nfreq => sim.nfreq,
        default_material => sim.default_material.to_meep_python(),
        geometry => geometry,
        sources => sources,
        symmetries => symmetries,
        flux_monitors => flux_monitors,
        stop => stop,
        normalization => normalization,
    })?;

    Ok(output)
}

/// Generate a Python module defining a block geometry list and its lattice
///
/// Used for mode-solver cross-sections, which are built from blocks only.
pub fn generate_geometry_script(
    geometry: &[MeepGeometry],
    lattice_size: &Vector3<f64>,
    resolution: f64,
) -> Result<String> {
    if let Some(g) = geometry
        .iter()
        .find(|g| !matches!(g.primitive, MeepPrimitive::Block { .. }))
    {
        anyhow::bail!("cross-section geometry `{}` is not a block", g.name);
    }

    let mut env = Environment::new();
    env.add_template("geometry", GEOMETRY_TEMPLATE)?;
    let template = env.get_template("geometry")?;

    let geometry: Vec<_> = geometry.iter().map(geometry_context).collect();
    let output = template.render(context! {
        timestamp => chrono::Utc::now().to_rfc3339(),
        resolution => py_num(resolution),
        lattice_size => py_vec(lattice_size),
        geometry => geometry,
    })?;
    Ok(output)
}

fn merge(mut base: serde_json::Value, extra: serde_json::Value) -> serde_json::Value {
    if let (Some(base), serde_json::Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
    base
}
