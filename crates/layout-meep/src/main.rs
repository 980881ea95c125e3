//! layout-to-meep: CLI tool for turning photonic layouts into MEEP simulations

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use layout_meep::devices::{
    mmi1x2, simulation_cell, BraggOverrides, BraggParams, MmiParams, RibCrossSection, SimLevel,
    SimulationCellParams,
};
use layout_meep::{
    generate_geometry_script, generate_meep_script, translate, LayerSet, LengthUnit, MaterialLibrary,
    Medium, TranslationConfig,
};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "layout-to-meep")]
#[command(about = "Convert photonic mask layouts to MEEP FDTD simulations")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a JSON layout into a MEEP script
    Layout(LayoutArgs),
    /// Generate a Bragg grating cavity simulation
    Bragg(BraggArgs),
    /// Generate a rib waveguide cross-section for mode solving
    Xs(XsArgs),
    /// Write the JSON layout of an MMI splitter inside a simulation cell
    Mmi(OutputArgs),
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Output file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the result to stdout instead of a file
    #[arg(long)]
    stdout: bool,
}

#[derive(clap::Args, Debug)]
struct LayoutArgs {
    /// Input JSON layout
    #[arg(short, long)]
    input: PathBuf,

    #[command(flatten)]
    out: OutputArgs,

    /// Resolution in pixels per length unit
    #[arg(long, default_value = "30")]
    resolution: f64,

    /// PML thickness in MEEP units
    #[arg(long, default_value = "1")]
    pml_thickness: f64,

    /// Source centre wavelength in MEEP units
    #[arg(long, default_value = "1.22")]
    wavelength: f64,

    /// Pulse width as a fraction of the centre frequency
    #[arg(long, default_value = "0.2")]
    fwidth_fraction: f64,

    /// Number of flux frequencies
    #[arg(long, default_value = "100")]
    nfreq: usize,

    /// Field component driven by the sources
    #[arg(long, default_value = "Ey")]
    component: String,

    /// Layout length unit (m, mm, um, nm)
    #[arg(long, default_value = "um")]
    layout_unit: String,

    /// MEEP length unit (m, mm, um, nm)
    #[arg(long, default_value = "um")]
    meep_unit: String,

    /// Skip flux monitors at port markers
    #[arg(long)]
    no_flux_monitors: bool,

    /// Run for a fixed time instead of until the fields decay
    #[arg(long)]
    until: Option<f64>,

    /// GDS layer of the guide (wg_deep)
    #[arg(long, default_value = "22")]
    guide_layer: u16,

    /// GDS layer of the simulation cell (FLOORPLAN)
    #[arg(long, default_value = "99")]
    floorplan_layer: u16,

    /// Material of the guide layer
    #[arg(long, default_value = "silicon")]
    guide_material: String,

    /// Background material
    #[arg(long, default_value = "oxide")]
    background: String,
}

#[derive(clap::Args, Debug)]
struct BraggArgs {
    #[command(flatten)]
    out: OutputArgs,

    /// Accuracy preset
    #[arg(long, value_enum, default_value = "shape")]
    level: SimLevel,

    /// Use the 220 nm thick 3D geometry
    #[arg(long)]
    three_d: bool,

    /// JSON file of parameter overrides, applied after the preset
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Run for a fixed time instead of until the fields decay
    #[arg(long)]
    until: Option<f64>,

    /// Skip the straight-guide reference run that normalizes reflection
    #[arg(long)]
    no_normalization: bool,
}

#[derive(clap::Args, Debug)]
struct XsArgs {
    #[command(flatten)]
    out: OutputArgs,

    /// Rib width in µm
    #[arg(long, default_value = "0.35")]
    width: f64,

    /// Gap to a second rib
    #[arg(long)]
    gap: Option<f64>,

    /// Oxide encapsulation thickness
    #[arg(long)]
    encapsulation: Option<f64>,

    /// Resolution in pixels per µm
    #[arg(long, default_value = "64")]
    resolution: f64,
}

fn parse_unit(s: &str) -> Result<LengthUnit> {
    match s.to_lowercase().as_str() {
        "m" | "meter" | "meters" => Ok(LengthUnit::Meter),
        "mm" | "millimeter" | "millimeters" => Ok(LengthUnit::Millimeter),
        "um" | "µm" | "micrometer" | "micrometers" => Ok(LengthUnit::Micrometer),
        "nm" | "nanometer" | "nanometers" => Ok(LengthUnit::Nanometer),
        _ => anyhow::bail!("Unknown unit: {}. Use: m, mm, um, or nm", s),
    }
}

fn lookup_material(library: &MaterialLibrary, name: &str) -> Result<Medium> {
    library
        .get(name)
        .cloned()
        .with_context(|| format!("Unknown material: {}. Use: {}", name, library.names().join(", ")))
}

fn write_output(out: &OutputArgs, contents: &str) -> Result<()> {
    match (&out.output, out.stdout) {
        (Some(path), false) => {
            fs::write(path, contents)
                .with_context(|| format!("Failed to write output file: {:?}", path))?;
            info!("Wrote {:?}", path);
        }
        _ => println!("{}", contents),
    }
    Ok(())
}

fn run_layout(args: &LayoutArgs) -> Result<()> {
    let json = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input file: {:?}", args.input))?;

    let library = MaterialLibrary::new();
    let config = TranslationConfig {
        guide_material: lookup_material(&library, &args.guide_material)?,
        default_material: lookup_material(&library, &args.background)?,
        layout_unit: parse_unit(&args.layout_unit)?,
        meep_unit: parse_unit(&args.meep_unit)?,
        resolution: args.resolution,
        pml_thickness: args.pml_thickness,
        wavelength: args.wavelength,
        fwidth_fraction: args.fwidth_fraction,
        nfreq: args.nfreq,
        component: args.component.clone(),
        flux_monitors: !args.no_flux_monitors,
        until: args.until,
    };

    let mut layer_set = LayerSet::photonic();
    layer_set
        .add_layer("wg_deep", args.guide_layer)
        .add_layer("FLOORPLAN", args.floorplan_layer);

    let script = translate(&json, &layer_set, &config).context("Translation failed")?;
    write_output(&args.out, &script)
}

fn run_bragg(args: &BraggArgs) -> Result<()> {
    let base = if args.three_d {
        BraggParams::three_d()
    } else {
        BraggParams::default()
    };
    let (mut params, resolution) = args.level.apply(&base);

    if let Some(path) = &args.overrides {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read overrides: {:?}", path))?;
        let overrides: BraggOverrides =
            serde_json::from_str(&json).context("Invalid Bragg overrides")?;
        params = params.overridden(&overrides);
    }
    info!(?params, resolution, "Bragg grating");

    let mut sim = params.simulation(resolution, args.until);
    if args.no_normalization {
        sim.normalization = None;
    }
    let script = generate_meep_script(&sim, &TranslationConfig::default())?;
    write_output(&args.out, &script)
}

fn run_xs(args: &XsArgs) -> Result<()> {
    let xs = RibCrossSection {
        wg_width: args.width,
        two_wg_gap: args.gap,
        encapsulation: args.encapsulation,
        ..Default::default()
    };
    let script = generate_geometry_script(&xs.geometry(), &xs.lattice_size(), args.resolution)?;
    write_output(&args.out, &script)
}

fn run_mmi(out: &OutputArgs) -> Result<()> {
    let layer_set = LayerSet::photonic();
    let mmi = mmi1x2(&MmiParams::default(), &layer_set)?;
    let layout = simulation_cell(&mmi, &SimulationCellParams::default(), &layer_set)?;
    write_output(out, &layout.to_json()?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match &args.command {
        Command::Layout(args) => run_layout(args),
        Command::Bragg(args) => run_bragg(args),
        Command::Xs(args) => run_xs(args),
        Command::Mmi(out) => run_mmi(out),
    }
}
