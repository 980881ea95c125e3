//! 1x2 multimode interference splitter and the simulation cell wrapper

use nalgebra::Point2;

use crate::error::{LayoutError, Result};
use crate::layers::{LayerSet, LAYER_PORT, LAYER_SOURCE};
use crate::layout::{Bbox, Cell, CellReference, Layout, Port};

#[derive(Debug, Clone, PartialEq)]
pub struct MmiParams {
    pub length_port: f64,
    pub length_mmi: f64,
    pub width_mmi: f64,
    /// Edge to edge spacing of the two output guides
    pub gap_mmi: f64,
    pub wg_width: f64,
}

impl Default for MmiParams {
    fn default() -> Self {
        Self {
            length_port: 0.2,
            length_mmi: 2.8,
            width_mmi: 1.55,
            gap_mmi: 0.65,
            wg_width: 0.35,
        }
    }
}

/// MMI body centred on the origin with ports `wg_in_1`, `wg_out_1` and `wg_out_2`
pub fn mmi1x2(params: &MmiParams, layer_set: &LayerSet) -> Result<Layout> {
    let layer = layer_set.gds_layer("wg_deep")?;
    let half_body = params.length_mmi / 2.0;
    let stub_x = half_body + params.length_port / 2.0;
    let end_x = half_body + params.length_port;
    let out_y = (params.wg_width + params.gap_mmi) / 2.0;
    let stub = [params.length_port, params.wg_width];

    let mut cell = Cell::new("MMI");
    cell.add_centered_rect(layer, [0.0, 0.0], [params.length_mmi, params.width_mmi])
        .add_centered_rect(layer, [-stub_x, 0.0], stub)
        .add_centered_rect(layer, [stub_x, out_y], stub)
        .add_centered_rect(layer, [stub_x, -out_y], stub);

    for (name, midpoint, orientation) in [
        ("wg_in_1", [-end_x, 0.0], 180.0),
        ("wg_out_1", [end_x, out_y], 0.0),
        ("wg_out_2", [end_x, -out_y], 0.0),
    ] {
        cell.add_port(Port {
            name: name.to_string(),
            midpoint,
            width: params.wg_width,
            orientation,
        });
    }

    Ok(Layout::new(cell))
}

/// Cell-wrapper settings
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationCellParams {
    /// Length of the straight access guide feeding the device
    pub entry_length: f64,
    /// Clearance between the device and the cell edge
    pub cell_buffer: f64,
    /// Port of the device that the access guide connects to
    pub port: String,
}

impl Default for SimulationCellParams {
    fn default() -> Self {
        Self {
            entry_length: 8.0,
            cell_buffer: 1.0,
            port: "wg_in_1".to_string(),
        }
    }
}

/// Places `device` behind an access guide and surrounds it with a floorplan cell
///
/// The access guide starts at x = 0 and runs along +x into the device port.
/// A source marker sits 1 µm and a port marker 2 µm from the guide start.
pub fn simulation_cell(
    device: &Layout,
    params: &SimulationCellParams,
    layer_set: &LayerSet,
) -> Result<Layout> {
    let wg_layer = layer_set.gds_layer("wg_deep")?;
    let floorplan = layer_set.gds_layer("FLOORPLAN")?;

    let top = device.top_cell()?;
    let port = top.port(&params.port)?;
    const TOP_NAME: &str = "simulation_cell";
    if device.cell(TOP_NAME).is_some() {
        return Err(LayoutError::DuplicateCell(TOP_NAME.to_string()));
    }

    // Turn the device so the port faces -x, then put it on the guide end
    let rotation = 180.0 - port.orientation;
    let rotated = CellReference::new(&top.name)
        .rotated(rotation)
        .transform_matrix()
        .transform_point(&Point2::new(port.midpoint[0], port.midpoint[1]));
    let reference = CellReference::new(&top.name)
        .rotated(rotation)
        .at(params.entry_length - rotated.x, -rotated.y);

    let device_bbox = device
        .flatten()?
        .bbox()
        .map(|b| placed_bbox(&b, &reference))
        .unwrap_or(Bbox {
            min: Point2::new(params.entry_length, 0.0),
            max: Point2::new(params.entry_length, 0.0),
        });

    let half_width = port.width / 2.0;
    let buffer = params.cell_buffer;
    let mut cell = Cell::new(TOP_NAME);
    cell.add_rect(wg_layer, [0.0, -half_width], [params.entry_length, half_width])
        .add_reference(reference)
        .add_rect(
            floorplan,
            [0.0, device_bbox.min.y - buffer],
            [device_bbox.max.x + buffer, device_bbox.max.y + buffer],
        )
        .add_centered_rect(LAYER_SOURCE, [1.0, 0.0], [0.1, 1.0])
        .add_centered_rect(LAYER_PORT, [2.0, 0.0], [0.1, 1.0]);

    let mut layout = Layout::new(cell);
    for child in &device.cells {
        layout.add_cell(child.clone());
    }
    Ok(layout)
}

fn placed_bbox(bbox: &Bbox, reference: &CellReference) -> Bbox {
    let matrix = reference.transform_matrix();
    let corners = [
        bbox.min,
        Point2::new(bbox.max.x, bbox.min.y),
        bbox.max,
        Point2::new(bbox.min.x, bbox.max.y),
    ]
    .map(|c| matrix.transform_point(&c));
    let first = Bbox {
        min: corners[0],
        max: corners[0],
    };
    corners[1..].iter().fold(first, |b, c| b.include(c))
}
