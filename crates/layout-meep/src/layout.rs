//! Hierarchical mask layout, its JSON interchange format and flattening
//!
//! A layout is a set of named cells. Each cell holds polygons tagged with a
//! GDS layer, references to other cells, and optical ports. Flattening
//! collapses the reference hierarchy below the top cell into a single list
//! of polygons in top-cell coordinates.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use nalgebra::{Matrix3, Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};
use crate::layers::LayerId;

/// Serialized layout: the top cell name plus every cell definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub top: String,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cell {
    pub name: String,
    #[serde(default)]
    pub polygons: Vec<LayerPolygon>,
    #[serde(default)]
    pub references: Vec<CellReference>,
    #[serde(default)]
    pub ports: Vec<Port>,
}

/// Closed polygon on a layer; the closing edge is implicit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerPolygon {
    pub layer: LayerId,
    pub points: Vec<[f64; 2]>,
}

/// Placement of another cell. Applied as reflect, magnify, rotate, translate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellReference {
    pub cell: String,
    #[serde(default)]
    pub origin: [f64; 2],
    /// Counter-clockwise rotation in degrees
    #[serde(default)]
    pub rotation: f64,
    /// Mirror about the x axis before rotating
    #[serde(default)]
    pub x_reflection: bool,
    #[serde(default = "unity")]
    pub magnification: f64,
}

fn unity() -> f64 {
    1.0
}

/// Optical port on a cell edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub midpoint: [f64; 2],
    pub width: f64,
    /// Direction the port faces, in degrees (0 = +x)
    pub orientation: f64,
}

impl Layout {
    pub fn new(top: Cell) -> Self {
        Self {
            top: top.name.clone(),
            cells: vec![top],
        }
    }

    /// Adds a cell definition that the top cell (or its children) can reference
    pub fn add_cell(&mut self, cell: Cell) -> &mut Self {
        self.cells.push(cell);
        self
    }

    pub fn cell(&self, name: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.name == name)
    }

    pub fn top_cell(&self) -> Result<&Cell> {
        self.cell(&self.top)
            .ok_or_else(|| LayoutError::TopCellNotFound(self.top.clone()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a layout from a JSON interchange file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Collapses every reference below the top cell into top-cell coordinates
    pub fn flatten(&self) -> Result<FlatLayout> {
        let mut by_name: HashMap<&str, &Cell> = HashMap::new();
        for cell in &self.cells {
            if by_name.insert(cell.name.as_str(), cell).is_some() {
                return Err(LayoutError::DuplicateCell(cell.name.clone()));
            }
        }
        let top = self.top_cell()?;

        let mut flat = FlatLayout {
            polygons: Vec::new(),
            ports: top.ports.clone(),
        };
        let mut stack = HashSet::new();
        flatten_cell(top, &Matrix3::identity(), &by_name, &mut stack, &mut flat.polygons)?;

        tracing::debug!(
            top = %self.top,
            polygons = flat.polygons.len(),
            "flattened layout"
        );
        Ok(flat)
    }
}

fn flatten_cell<'a>(
    cell: &'a Cell,
    transform: &Matrix3<f64>,
    cells: &HashMap<&str, &'a Cell>,
    stack: &mut HashSet<&'a str>,
    output: &mut Vec<FlatPolygon>,
) -> Result<()> {
    if !stack.insert(cell.name.as_str()) {
        return Err(LayoutError::ReferenceCycle(cell.name.clone()));
    }

    for poly in &cell.polygons {
        let points = poly
            .points
            .iter()
            .map(|p| transform.transform_point(&Point2::new(p[0], p[1])))
            .collect();
        output.push(FlatPolygon {
            layer: poly.layer,
            polygon: Polygon::new(points),
        });
    }

    for reference in &cell.references {
        let child = cells
            .get(reference.cell.as_str())
            .copied()
            .ok_or_else(|| LayoutError::UnknownCell {
                parent: cell.name.clone(),
                child: reference.cell.clone(),
            })?;
        let child_transform = transform * reference.transform_matrix();
        flatten_cell(child, &child_transform, cells, stack, output)?;
    }

    stack.remove(cell.name.as_str());
    Ok(())
}

impl Cell {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn add_polygon(&mut self, layer: LayerId, points: impl IntoIterator<Item = [f64; 2]>) -> &mut Self {
        self.polygons.push(LayerPolygon {
            layer,
            points: points.into_iter().collect(),
        });
        self
    }

    /// Axis-aligned rectangle from its lower-left and upper-right corners
    pub fn add_rect(&mut self, layer: LayerId, min: [f64; 2], max: [f64; 2]) -> &mut Self {
        self.add_polygon(
            layer,
            [[min[0], min[1]], [max[0], min[1]], [max[0], max[1]], [min[0], max[1]]],
        )
    }

    /// Axis-aligned rectangle of `size` centred on `center`
    pub fn add_centered_rect(&mut self, layer: LayerId, center: [f64; 2], size: [f64; 2]) -> &mut Self {
        let (hw, hh) = (size[0] / 2.0, size[1] / 2.0);
        self.add_rect(
            layer,
            [center[0] - hw, center[1] - hh],
            [center[0] + hw, center[1] + hh],
        )
    }

    pub fn add_reference(&mut self, reference: CellReference) -> &mut Self {
        self.references.push(reference);
        self
    }

    pub fn add_port(&mut self, port: Port) -> &mut Self {
        self.ports.push(port);
        self
    }

    pub fn port(&self, name: &str) -> Result<&Port> {
        self.ports
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| LayoutError::PortNotFound {
                cell: self.name.clone(),
                port: name.to_string(),
            })
    }

    /// Bounding box of the polygons defined directly in this cell
    pub fn local_bbox(&self) -> Option<Bbox> {
        self.polygons
            .iter()
            .flat_map(|p| p.points.iter())
            .map(|p| Point2::new(p[0], p[1]))
            .fold(None, |acc: Option<Bbox>, p| {
                Some(match acc {
                    Some(b) => b.include(&p),
                    None => Bbox { min: p, max: p },
                })
            })
    }
}

impl CellReference {
    pub fn new(cell: &str) -> Self {
        Self {
            cell: cell.to_string(),
            origin: [0.0, 0.0],
            rotation: 0.0,
            x_reflection: false,
            magnification: 1.0,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.origin = [x, y];
        self
    }

    pub fn rotated(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn reflected(mut self) -> Self {
        self.x_reflection = !self.x_reflection;
        self
    }

    /// Homogeneous 2D transform placing the referenced cell in the parent
    pub fn transform_matrix(&self) -> Matrix3<f64> {
        let translation = Matrix3::new_translation(&Vector2::new(self.origin[0], self.origin[1]));
        let rotation = Matrix3::new_rotation(self.rotation.to_radians());
        let scale = Matrix3::new_scaling(self.magnification);
        let reflection = if self.x_reflection {
            Matrix3::new_nonuniform_scaling(&Vector2::new(1.0, -1.0))
        } else {
            Matrix3::identity()
        };
        translation * rotation * scale * reflection
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Bbox {
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point2<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn include(self, p: &Point2<f64>) -> Self {
        Self {
            min: Point2::new(self.min.x.min(p.x), self.min.y.min(p.y)),
            max: Point2::new(self.max.x.max(p.x), self.max.y.max(p.y)),
        }
    }

    pub fn union(self, other: &Bbox) -> Self {
        self.include(&other.min).include(&other.max)
    }
}

/// Closed polygon with vertices in layout units
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub points: Vec<Point2<f64>>,
}

impl Polygon {
    pub fn new(points: Vec<Point2<f64>>) -> Self {
        Self { points }
    }

    pub fn bbox(&self) -> Option<Bbox> {
        let (first, rest) = self.points.split_first()?;
        Some(rest.iter().fold(Bbox { min: *first, max: *first }, |b, p| b.include(p)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatPolygon {
    pub layer: LayerId,
    pub polygon: Polygon,
}

/// Layout with no remaining hierarchy
#[derive(Debug, Clone, Default)]
pub struct FlatLayout {
    pub polygons: Vec<FlatPolygon>,
    /// Ports of the top cell
    pub ports: Vec<Port>,
}

impl FlatLayout {
    /// Groups polygons by layer, layers in order of first appearance
    ///
    /// Consumes the layout; polygons are moved into their groups.
    pub fn into_polygon_groups(self) -> Vec<PolygonGroup> {
        let mut index: HashMap<LayerId, usize> = HashMap::new();
        let mut groups: Vec<PolygonGroup> = Vec::new();
        for FlatPolygon { layer, polygon } in self.polygons {
            let slot = *index.entry(layer).or_insert_with(|| {
                groups.push(PolygonGroup::new(layer, Vec::new()));
                groups.len() - 1
            });
            groups[slot].polygons.push(polygon);
        }
        groups
    }

    pub fn bbox(&self) -> Option<Bbox> {
        self.polygons
            .iter()
            .filter_map(|p| p.polygon.bbox())
            .reduce(|a, b| a.union(&b))
    }

    /// Multiplies every coordinate by `factor` (unit conversion)
    pub fn scale(&mut self, factor: f64) {
        for flat in &mut self.polygons {
            for p in &mut flat.polygon.points {
                *p *= factor;
            }
        }
        for port in &mut self.ports {
            port.midpoint = [port.midpoint[0] * factor, port.midpoint[1] * factor];
            port.width *= factor;
        }
    }
}

/// All polygons on one layer of a flattened layout
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonGroup {
    pub layer: LayerId,
    pub polygons: Vec<Polygon>,
}

impl PolygonGroup {
    pub fn new(layer: LayerId, polygons: Vec<Polygon>) -> Self {
        Self { layer, polygons }
    }

    pub fn bbox(&self) -> Option<Bbox> {
        self.polygons
            .iter()
            .filter_map(Polygon::bbox)
            .reduce(|a, b| a.union(&b))
    }

    /// Bounding box width, zero for an empty group
    pub fn xsize(&self) -> f64 {
        self.bbox().map_or(0.0, |b| b.width())
    }

    /// Bounding box height, zero for an empty group
    pub fn ysize(&self) -> f64 {
        self.bbox().map_or(0.0, |b| b.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_parse_layout() {
        let json = r#"{
            "top": "chip",
            "cells": [
                {
                    "name": "chip",
                    "polygons": [{"layer": 99, "points": [[0, 0], [31, 0], [31, 15], [0, 15]]}],
                    "references": [{"cell": "wg", "origin": [1.0, 2.0]}]
                },
                {
                    "name": "wg",
                    "polygons": [{"layer": 22, "points": [[0, 0], [8, 0], [8, 0.35], [0, 0.35]]}]
                }
            ]
        }"#;

        let layout = Layout::from_json(json).unwrap();
        assert_eq!(layout.top, "chip");
        assert_eq!(layout.cells.len(), 2);
        assert_eq!(layout.cells[0].references[0].magnification, 1.0);

        let flat = layout.flatten().unwrap();
        assert_eq!(flat.polygons.len(), 2);
        let wg = &flat.polygons[1];
        assert_eq!(wg.layer, 22);
        assert!(approx(wg.polygon.points[0].x, 1.0));
        assert!(approx(wg.polygon.points[2].y, 2.35));
    }

    #[test]
    fn test_reference_transform_order() {
        // reflect, then rotate 90°, then translate
        let reference = CellReference::new("c").reflected().rotated(90.0).at(10.0, 0.0);
        let p = reference
            .transform_matrix()
            .transform_point(&Point2::new(1.0, 2.0));
        // (1, 2) -> (1, -2) -> (2, 1) -> (12, 1)
        assert!(approx(p.x, 12.0));
        assert!(approx(p.y, 1.0));
    }

    #[test]
    fn test_nested_flatten_composes_transforms() {
        let mut leaf = Cell::new("leaf");
        leaf.add_rect(22, [0.0, 0.0], [1.0, 1.0]);
        let mut mid = Cell::new("mid");
        mid.add_reference(CellReference::new("leaf").at(5.0, 0.0));
        let mut top = Cell::new("top");
        top.add_reference(CellReference::new("mid").at(0.0, 3.0));
        top.add_reference(CellReference::new("mid").at(0.0, -3.0));

        let mut layout = Layout::new(top);
        layout.add_cell(mid).add_cell(leaf);

        let flat = layout.flatten().unwrap();
        assert_eq!(flat.polygons.len(), 2);
        let bbox = flat.bbox().unwrap();
        assert!(approx(bbox.min.x, 5.0));
        assert!(approx(bbox.min.y, -3.0));
        assert!(approx(bbox.max.y, 4.0));
    }

    #[test]
    fn test_flatten_errors() {
        let mut top = Cell::new("top");
        top.add_reference(CellReference::new("ghost"));
        let layout = Layout::new(top);
        assert!(matches!(layout.flatten(), Err(LayoutError::UnknownCell { .. })));

        let mut a = Cell::new("a");
        a.add_reference(CellReference::new("b"));
        let mut b = Cell::new("b");
        b.add_reference(CellReference::new("a"));
        let mut layout = Layout::new(a);
        layout.add_cell(b);
        assert!(matches!(layout.flatten(), Err(LayoutError::ReferenceCycle(_))));

        let layout = Layout {
            top: "missing".to_string(),
            cells: vec![],
        };
        assert!(matches!(layout.flatten(), Err(LayoutError::TopCellNotFound(_))));

        let mut layout = Layout::new(Cell::new("dup"));
        layout.add_cell(Cell::new("dup"));
        assert!(matches!(layout.flatten(), Err(LayoutError::DuplicateCell(_))));
    }

    #[test]
    fn test_repeated_reference_is_not_a_cycle() {
        let mut leaf = Cell::new("leaf");
        leaf.add_rect(22, [0.0, 0.0], [1.0, 1.0]);
        let mut top = Cell::new("top");
        top.add_reference(CellReference::new("leaf"));
        top.add_reference(CellReference::new("leaf").at(2.0, 0.0));
        let mut layout = Layout::new(top);
        layout.add_cell(leaf);
        assert_eq!(layout.flatten().unwrap().polygons.len(), 2);
    }

    #[test]
    fn test_polygon_groups_first_appearance_order() {
        let mut top = Cell::new("top");
        top.add_rect(22, [0.0, 0.0], [1.0, 1.0])
            .add_rect(99, [-1.0, -1.0], [4.0, 2.0])
            .add_rect(22, [2.0, 0.0], [3.0, 0.5]);
        let flat = Layout::new(top).flatten().unwrap();

        let groups = flat.into_polygon_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].layer, 22);
        assert_eq!(groups[0].polygons.len(), 2);
        assert!(approx(groups[0].polygons[1].points[0].x, 2.0));
        assert!(approx(groups[0].xsize(), 3.0));
        assert!(approx(groups[0].ysize(), 1.0));
        assert_eq!(groups[1].layer, 99);
        assert!(approx(groups[1].xsize(), 5.0));
    }

    #[test]
    fn test_scale() {
        let mut top = Cell::new("top");
        top.add_centered_rect(22, [1.0, 1.0], [2.0, 2.0]);
        let mut flat = Layout::new(top).flatten().unwrap();
        flat.scale(1000.0);
        let bbox = flat.bbox().unwrap();
        assert!(approx(bbox.width(), 2000.0));
        assert!(approx(bbox.center().x, 1000.0));
    }
}
