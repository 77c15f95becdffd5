use fastrand::Rng;

use crate::palette::{Palette, Rgb};

/// Pixel size in CSS units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// What the host measured: the container's rendered box, the window as a
/// fallback for containers not laid out yet, and the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub container: Size,
    pub window: Size,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    /// Each side falls back to the window on its own when the container
    /// reports zero (or garbage) for it.
    pub fn effective_size(&self) -> Size {
        let pick = |container: f64, window: f64| {
            if container.is_finite() && container > 0.0 {
                container
            } else {
                window
            }
        };

        Size::new(
            pick(self.container.width, self.window.width),
            pick(self.container.height, self.window.height),
        )
    }

    /// Non-finite or non-positive ratios count as 1.
    pub fn pixel_ratio(&self) -> f64 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Grid {
    pub columns: usize,
    pub rows: usize,
}

impl Grid {
    pub fn for_surface(size: Size, cell_width: u32, cell_height: u32) -> Self {
        let cells_along = |px: f64, cell: u32| {
            if px <= 0.0 || !px.is_finite() {
                0
            } else {
                (px / cell as f64).ceil() as usize
            }
        };

        Self {
            columns: cells_along(size.width, cell_width),
            rows: cells_along(size.height, cell_height),
        }
    }

    pub fn len(&self) -> usize {
        self.columns * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One glyph position. `progress == 1.0` means settled: `color == target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub glyph: char,
    pub color: Rgb,
    pub start: Rgb,
    pub target: Rgb,
    pub progress: f32,
}

impl Cell {
    pub fn settled(glyph: char, color: Rgb) -> Self {
        Self {
            glyph,
            color,
            start: color,
            target: color,
            progress: 1.0,
        }
    }

    pub fn in_transition(&self) -> bool {
        self.progress < 1.0
    }
}

/// Row-major cells of one grid. Rebuilt whole, never resized in place.
#[derive(Debug, Clone, Default)]
pub struct Cells {
    grid: Grid,
    cells: Vec<Cell>,
}

impl Cells {
    /// `glyphs` must not be empty.
    pub fn fill(grid: Grid, glyphs: &[char], palette: &Palette, rng: &mut Rng) -> Self {
        let cells = (0..grid.len())
            .map(|_| Cell::settled(glyphs[rng.usize(..glyphs.len())], palette.pick(rng)))
            .collect();

        Self { grid, cells }
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn as_slice(&self) -> &[Cell] {
        &self.cells
    }

    pub fn as_mut_slice(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Top-left pixel of the cell at `index`.
    pub fn origin(&self, index: usize, cell_width: u32, cell_height: u32) -> (f64, f64) {
        let columns = self.grid.columns.max(1);
        let col = index % columns;
        let row = index / columns;

        (
            (col * cell_width as usize) as f64,
            (row * cell_height as usize) as f64,
        )
    }
}
