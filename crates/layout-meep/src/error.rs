//! Error types for layout loading and conversion

use thiserror::Error;

use crate::layers::LayerId;

/// Errors raised while loading, flattening or converting a layout
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A symbolic layer name is not present in the layer set
    #[error("layer `{0}` is not defined in the layer set")]
    LayerNotFound(String),

    /// No polygon group was tagged as the simulation cell boundary
    #[error("no cell-boundary layer found in layout")]
    MissingCellBoundary,

    /// More than one polygon group was tagged as the simulation cell boundary
    #[error("{count} polygon groups map to the cell boundary (last on layer {layer})")]
    MultipleCellBoundaries { layer: LayerId, count: usize },

    #[error("top cell `{0}` not found in layout")]
    TopCellNotFound(String),

    #[error("cell `{parent}` references unknown cell `{child}`")]
    UnknownCell { parent: String, child: String },

    #[error("cell `{0}` is instantiated inside itself")]
    ReferenceCycle(String),

    #[error("cell `{0}` is defined more than once")]
    DuplicateCell(String),

    #[error("cell `{cell}` has no port named `{port}`")]
    PortNotFound { cell: String, port: String },

    #[error("failed to read layout file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
