use crate::grid::{Cells, Size, Viewport};
use crate::palette::Rgb;

/// CSS size plus the device pixel ratio the backing store is scaled by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub css: Size,
    pub device_pixel_ratio: f64,
}

impl Surface {
    pub fn from_viewport(viewport: &Viewport) -> Self {
        Self {
            css: viewport.effective_size(),
            device_pixel_ratio: viewport.pixel_ratio(),
        }
    }

    /// Backing store dimensions in device pixels.
    pub fn backing_size(&self) -> (u32, u32) {
        let scale = |css: f64| (css.max(0.0) * self.device_pixel_ratio).round() as u32;
        (scale(self.css.width), scale(self.css.height))
    }
}

/// The subset of a 2D drawing context the animator needs.
pub trait Canvas {
    /// Resize the backing store and reset the transform to the pixel ratio.
    fn resize(&mut self, surface: &Surface);

    fn clear(&mut self, width: f64, height: f64);

    fn set_font(&mut self, font: &str);

    fn set_global_alpha(&mut self, alpha: f64);

    /// `x`/`y` are the top-left of the glyph box in CSS pixels.
    fn fill_glyph(&mut self, glyph: char, x: f64, y: f64, color: Rgb);
}

/// Fixed text settings for a full repaint.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font: String,
    pub opacity: f64,
    pub cell_width: u32,
    pub cell_height: u32,
}

/// Clear, then paint every cell at its grid position.
pub fn redraw<C: Canvas + ?Sized>(canvas: &mut C, cells: &Cells, surface: &Surface, style: &TextStyle) {
    canvas.clear(surface.css.width, surface.css.height);
    canvas.set_font(&style.font);
    canvas.set_global_alpha(style.opacity);

    for (index, cell) in cells.as_slice().iter().enumerate() {
        let (x, y) = cells.origin(index, style.cell_width, style.cell_height);
        canvas.fill_glyph(cell.glyph, x, y, cell.color);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Resize { backing: (u32, u32), css: Size, scale: f64 },
    Clear { width: f64, height: f64 },
    Font(String),
    GlobalAlpha(f64),
    Glyph { glyph: char, x: f64, y: f64, color: Rgb },
}

/// Canvas that only records what it was asked to do.
#[derive(Debug, Default, Clone)]
pub struct RecordingCanvas {
    pub calls: Vec<DrawCall>,
}

impl RecordingCanvas {
    pub fn clears(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Clear { .. }))
            .count()
    }

    pub fn glyphs(&self) -> impl Iterator<Item = &DrawCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Glyph { .. }))
    }

    pub fn take(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }
}

impl Canvas for RecordingCanvas {
    fn resize(&mut self, surface: &Surface) {
        self.calls.push(DrawCall::Resize {
            backing: surface.backing_size(),
            css: surface.css,
            scale: surface.device_pixel_ratio,
        });
    }

    fn clear(&mut self, width: f64, height: f64) {
        self.calls.push(DrawCall::Clear { width, height });
    }

    fn set_font(&mut self, font: &str) {
        self.calls.push(DrawCall::Font(font.to_string()));
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.calls.push(DrawCall::GlobalAlpha(alpha));
    }

    fn fill_glyph(&mut self, glyph: char, x: f64, y: f64, color: Rgb) {
        self.calls.push(DrawCall::Glyph { glyph, x, y, color });
    }
}

#[cfg(test)]
mod tests {
    use fastrand::Rng;

    use crate::grid::Grid;
    use crate::palette::Palette;

    use super::*;

    fn style() -> TextStyle {
        TextStyle {
            font: "16px monospace".into(),
            opacity: 0.65,
            cell_width: 10,
            cell_height: 20,
        }
    }

    #[test]
    fn backing_size_scales_by_ratio() {
        let surface = Surface {
            css: Size::new(300.5, 200.0),
            device_pixel_ratio: 2.0,
        };
        assert_eq!(surface.backing_size(), (601, 400));
    }

    #[test]
    fn backing_size_rounds_to_nearest() {
        let surface = Surface {
            css: Size::new(100.3, 100.5),
            device_pixel_ratio: 1.5,
        };
        // 150.45 and 150.75
        assert_eq!(surface.backing_size(), (150, 151));

        let surface = Surface {
            css: Size::new(100.5, 99.4),
            device_pixel_ratio: 1.0,
        };
        assert_eq!(surface.backing_size(), (101, 99));
    }

    #[test]
    fn redraw_clears_then_paints_every_cell() {
        let palette = Palette::from_colors(vec![Rgb::new(97, 220, 163)]);
        let cells = Cells::fill(Grid { columns: 3, rows: 2 }, &['Z'], &palette, &mut Rng::with_seed(0));
        let surface = Surface {
            css: Size::new(30.0, 40.0),
            device_pixel_ratio: 1.0,
        };
        let mut canvas = RecordingCanvas::default();

        redraw(&mut canvas, &cells, &surface, &style());

        assert_eq!(
            &canvas.calls[..3],
            &[
                DrawCall::Clear { width: 30.0, height: 40.0 },
                DrawCall::Font("16px monospace".into()),
                DrawCall::GlobalAlpha(0.65),
            ]
        );
        assert_eq!(canvas.glyphs().count(), 6);
        assert_eq!(
            canvas.calls.last(),
            Some(&DrawCall::Glyph {
                glyph: 'Z',
                x: 20.0,
                y: 20.0,
                color: Rgb::new(97, 220, 163),
            })
        );
    }
}
