//! Static, impassable world geometry built once per world load

use log::info;
use serde::Deserialize;
use shared::{Position, Rect};
use std::path::Path;
use thiserror::Error;

/// Collision map shipped with the client, used when no layout file is given.
pub const DEFAULT_LAYOUT: &str = include_str!("../assets/lobby_collisions.json");

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("tile layout must have at least one column")]
    ZeroColumns,
    #[error("tile layout has {len} tiles, not a multiple of {columns} columns")]
    RaggedGrid { len: usize, columns: usize },
    #[error("tile size must be a positive finite number, got {0}")]
    InvalidTileSize(f32),
    #[error("obstacle #{index} has a non-positive or non-finite extent")]
    InvalidRect { index: usize },
    #[error("failed to read layout file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse layout: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Row-major tile grid; every cell equal to `blocked` is an obstacle.
#[derive(Debug, Clone, Deserialize)]
pub struct TileLayout {
    pub columns: usize,
    pub tile_size: f32,
    pub blocked: u32,
    #[serde(default)]
    pub origin: Position,
    pub tiles: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Tiles(TileLayout),
    Rects(Vec<Rect>),
}

impl Layout {
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Clone)]
pub struct ObstacleField {
    obstacles: Vec<Rect>,
    bounds: Rect,
}

impl ObstacleField {
    pub fn build(layout: &Layout) -> Result<Self, LayoutError> {
        let field = match layout {
            Layout::Tiles(tiles) => Self::from_tiles(tiles)?,
            Layout::Rects(rects) => Self::from_rects(rects.clone())?,
        };
        info!(
            "Built obstacle field: {} obstacles within {:?}",
            field.obstacles.len(),
            field.bounds
        );
        Ok(field)
    }

    fn from_tiles(layout: &TileLayout) -> Result<Self, LayoutError> {
        if layout.columns == 0 {
            return Err(LayoutError::ZeroColumns);
        }
        if layout.tiles.len() % layout.columns != 0 {
            return Err(LayoutError::RaggedGrid {
                len: layout.tiles.len(),
                columns: layout.columns,
            });
        }
        let size = layout.tile_size;
        if !size.is_finite() || size <= 0.0 {
            return Err(LayoutError::InvalidTileSize(size));
        }

        let rows = layout.tiles.len() / layout.columns;
        let obstacles = layout
            .tiles
            .chunks(layout.columns)
            .enumerate()
            .flat_map(|(row, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .filter(|(_, symbol)| **symbol == layout.blocked)
                    .map(move |(column, _)| {
                        Rect::new(
                            layout.origin.x + column as f32 * size,
                            layout.origin.y + row as f32 * size,
                            size,
                            size,
                        )
                    })
            })
            .collect();

        Ok(Self {
            obstacles,
            bounds: Rect::at(
                layout.origin,
                layout.columns as f32 * size,
                rows as f32 * size,
            ),
        })
    }

    pub fn from_rects(obstacles: Vec<Rect>) -> Result<Self, LayoutError> {
        if let Some(index) = obstacles.iter().position(|rect| !rect.is_valid()) {
            return Err(LayoutError::InvalidRect { index });
        }
        let bounds = obstacles
            .iter()
            .copied()
            .reduce(|acc, rect| acc.union(&rect))
            .unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));
        Ok(Self { obstacles, bounds })
    }

    pub fn empty() -> Self {
        Self {
            obstacles: Vec::new(),
            bounds: Rect::new(0.0, 0.0, 0.0, 0.0),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rect> {
        self.obstacles.iter()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// World-space extent of the layout; sizes the background and foreground.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }
}
