//! Layout to MEEP geometry conversion
//!
//! Polygon groups are dispatched on their layer's [`LayerMaterial`]:
//! physical layers become flat prisms, the cell-boundary layer sets the
//! simulation cell, metadata layers are left to [`annotation_markers`].

use std::path::Path;

use nalgebra::{Point2, Vector2, Vector3};
use tracing::{debug, warn};

use crate::error::{LayoutError, Result};
use crate::layers::{LayerId, LayerSet};
use crate::layout::{FlatLayout, Layout, PolygonGroup};
use crate::mapping::{get_layer_mapping, LayerMapping, LayerMaterial};
use crate::meep::{MeepGeometry, MeepPrimitive};

/// Output of a layout conversion
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Cell extent; z is zero for 2D simulations
    pub cell_size: Vector3<f64>,
    /// Centre of the cell-boundary bounding box in layout coordinates
    pub cell_center: Vector3<f64>,
    /// Flat prisms in input order
    pub geometry: Vec<MeepGeometry>,
    /// Layers that had no entry in the mapping, in order of appearance
    pub skipped_layers: Vec<LayerId>,
}

/// Converts flattened polygon groups into a MEEP cell and geometry list
pub fn device_to_meep<I>(groups: I, mapping: &LayerMapping) -> Result<Conversion>
where
    I: IntoIterator<Item = PolygonGroup>,
{
    let mut cell: Option<(Vector3<f64>, Vector3<f64>)> = None;
    let mut boundary_groups = 0usize;
    let mut boundary_layer = 0;
    let mut geometry = Vec::new();
    let mut skipped_layers = Vec::new();

    for group in groups {
        let layer = group.layer;
        let Some(material) = mapping.get(layer) else {
            warn!(layer, "layer not in meep mapping, skipping");
            skipped_layers.push(layer);
            continue;
        };

        match material {
            LayerMaterial::CellBoundary => {
                boundary_groups += 1;
                boundary_layer = layer;
                let center = group
                    .bbox()
                    .map_or_else(Point2::origin, |b| b.center());
                cell = Some((
                    Vector3::new(group.xsize(), group.ysize(), 0.0),
                    Vector3::new(center.x, center.y, 0.0),
                ));
                debug!(layer, x = group.xsize(), y = group.ysize(), "cell boundary");
            }
            LayerMaterial::Metadata => {
                debug!(layer, "metadata layer, no geometry");
            }
            LayerMaterial::Physical(medium) => {
                for (i, poly) in group.polygons.iter().enumerate() {
                    let vertices = poly
                        .points
                        .iter()
                        .map(|p| Vector3::new(p.x, p.y, 0.0))
                        .collect();
                    geometry.push(MeepGeometry {
                        name: format!("layer{}_poly{}", layer, i),
                        primitive: MeepPrimitive::Prism {
                            vertices,
                            height: 0.0,
                        },
                        material: medium.clone(),
                    });
                }
            }
        }
    }

    if boundary_groups > 1 {
        return Err(LayoutError::MultipleCellBoundaries {
            layer: boundary_layer,
            count: boundary_groups,
        });
    }
    let (cell_size, cell_center) = cell.ok_or(LayoutError::MissingCellBoundary)?;

    Ok(Conversion {
        cell_size,
        cell_center,
        geometry,
        skipped_layers,
    })
}

/// Flattens a layout and converts it
pub fn layout_to_meep(layout: &Layout, mapping: &LayerMapping) -> Result<Conversion> {
    device_to_meep(layout.flatten()?.into_polygon_groups(), mapping)
}

/// Loads a JSON layout file and converts it with the default mapping for `layer_set`
pub fn layout_file_to_meep(path: impl AsRef<Path>, layer_set: &LayerSet) -> Result<Conversion> {
    let layout = Layout::load(path)?;
    let mapping = get_layer_mapping(layer_set)?;
    layout_to_meep(&layout, &mapping)
}

/// A source or port marker taken from a metadata layer
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub layer: LayerId,
    pub center: Point2<f64>,
    pub size: Vector2<f64>,
}

/// Bounding boxes of every polygon on a metadata layer, in layout order
pub fn annotation_markers(flat: &FlatLayout, mapping: &LayerMapping) -> Vec<Marker> {
    flat.polygons
        .iter()
        .filter(|p| mapping.is_metadata(p.layer))
        .filter_map(|p| {
            let bbox = p.polygon.bbox()?;
            Some(Marker {
                layer: p.layer,
                center: bbox.center(),
                size: Vector2::new(bbox.width(), bbox.height()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{LAYER_PORT, LAYER_SOURCE};
    use crate::layout::{Cell, Polygon};
    use crate::material::Medium;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::new(vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ])
    }

    fn mapping() -> LayerMapping {
        get_layer_mapping(&LayerSet::photonic()).unwrap()
    }

    #[test]
    fn test_cell_center_follows_boundary() {
        let groups = vec![PolygonGroup::new(99, vec![rect(2.0, -1.0, 6.0, 3.0)])];
        let conv = device_to_meep(groups, &mapping()).unwrap();
        assert_eq!(conv.cell_size, Vector3::new(4.0, 4.0, 0.0));
        assert_eq!(conv.cell_center, Vector3::new(4.0, 1.0, 0.0));
    }

    #[test]
    fn test_missing_cell_boundary() {
        let groups = vec![PolygonGroup::new(22, vec![rect(0.0, 0.0, 1.0, 1.0)])];
        assert!(matches!(
            device_to_meep(groups, &mapping()),
            Err(LayoutError::MissingCellBoundary)
        ));
    }

    #[test]
    fn test_multiple_cell_boundaries() {
        let groups = vec![
            PolygonGroup::new(99, vec![rect(0.0, 0.0, 1.0, 1.0)]),
            PolygonGroup::new(99, vec![rect(0.0, 0.0, 2.0, 2.0)]),
        ];
        match device_to_meep(groups, &mapping()) {
            Err(LayoutError::MultipleCellBoundaries { layer, count }) => {
                assert_eq!(layer, 99);
                assert_eq!(count, 2);
            }
            other => panic!("Expected MultipleCellBoundaries, got {:?}", other),
        }
    }

    #[test]
    fn test_prism_naming_and_material() {
        let groups = vec![
            PolygonGroup::new(99, vec![rect(0.0, 0.0, 10.0, 10.0)]),
            PolygonGroup::new(22, vec![rect(0.0, 0.0, 1.0, 1.0), rect(2.0, 0.0, 3.0, 1.0)]),
        ];
        let conv = device_to_meep(groups, &mapping()).unwrap();
        assert_eq!(conv.geometry.len(), 2);
        assert_eq!(conv.geometry[1].name, "layer22_poly1");
        assert_eq!(conv.geometry[1].material, Medium::silicon());
        match &conv.geometry[1].primitive {
            MeepPrimitive::Prism { vertices, height } => {
                assert_eq!(*height, 0.0);
                assert_eq!(vertices[0], Vector3::new(2.0, 0.0, 0.0));
            }
            other => panic!("Expected Prism, got {:?}", other),
        }
    }

    #[test]
    fn test_annotation_markers() {
        let mut top = Cell::new("top");
        top.add_rect(99, [0.0, 0.0], [10.0, 4.0])
            .add_centered_rect(LAYER_SOURCE, [1.0, 2.0], [0.1, 1.0])
            .add_centered_rect(22, [5.0, 2.0], [10.0, 0.35])
            .add_centered_rect(LAYER_PORT, [2.0, 2.0], [0.1, 1.0]);
        let flat = Layout::new(top).flatten().unwrap();

        let markers = annotation_markers(&flat, &mapping());
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].layer, LAYER_SOURCE);
        assert!((markers[0].center.x - 1.0).abs() < 1e-12);
        assert!((markers[0].size.y - 1.0).abs() < 1e-12);
        assert_eq!(markers[1].layer, LAYER_PORT);
        assert!((markers[1].center.x - 2.0).abs() < 1e-12);
    }
}
