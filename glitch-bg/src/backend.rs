use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::widgets::Widget;

use crate::canvas::{Canvas, Surface};
use crate::grid::Size;
use crate::palette::Rgb;
use crate::vignette::Vignette;

/// [`Canvas`] over a ratatui [`Buffer`], one terminal cell per glyph box.
///
/// Terminals have no alpha channel, so global alpha and the vignette
/// overlays are composited over black into the foreground color.
pub struct BufferCanvas {
    buffer: Buffer,
    cell_width: u32,
    cell_height: u32,
    css: Size,
    alpha: f64,
    vignette: Vignette,
}

impl BufferCanvas {
    pub fn new(cell_width: u32, cell_height: u32, vignette: Vignette) -> Self {
        Self {
            buffer: Buffer::empty(Rect::default()),
            cell_width: cell_width.max(1),
            cell_height: cell_height.max(1),
            css: Size::default(),
            alpha: 1.0,
            vignette,
        }
    }

    /// CSS pixel box that maps `area` onto exactly one glyph per cell.
    pub fn css_size_for(area: Rect, cell_width: u32, cell_height: u32) -> Size {
        Size::new(
            area.width as f64 * cell_width as f64,
            area.height as f64 * cell_height as f64,
        )
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    fn shade(&self, x: f64, y: f64, color: Rgb) -> Color {
        let cx = x + self.cell_width as f64 / 2.0;
        let cy = y + self.cell_height as f64 / 2.0;
        let overlay = self.vignette.alpha_at(cx, cy, self.css.width, self.css.height);
        let factor = (self.alpha * (1.0 - overlay)).clamp(0.0, 1.0);

        let scale = |c: u8| (c as f64 * factor).round() as u8;
        Color::Rgb(scale(color.r), scale(color.g), scale(color.b))
    }
}

impl Canvas for BufferCanvas {
    fn resize(&mut self, surface: &Surface) {
        let cells_along = |px: f64, cell: u32| (px.max(0.0) / cell as f64).ceil().min(u16::MAX as f64) as u16;

        self.css = surface.css;
        self.buffer = Buffer::empty(Rect::new(
            0,
            0,
            cells_along(surface.css.width, self.cell_width),
            cells_along(surface.css.height, self.cell_height),
        ));
    }

    fn clear(&mut self, _width: f64, _height: f64) {
        self.buffer.reset();

        let area = self.buffer.area;
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                if let Some(cell) = self.buffer.cell_mut((x, y)) {
                    cell.set_bg(Color::Black);
                }
            }
        }
    }

    /// Terminal glyphs use the terminal's own font.
    fn set_font(&mut self, _font: &str) {}

    fn set_global_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    fn fill_glyph(&mut self, glyph: char, x: f64, y: f64, color: Rgb) {
        if x < 0.0 || y < 0.0 {
            return;
        }

        let col = (x / self.cell_width as f64).floor();
        let row = (y / self.cell_height as f64).floor();
        if col > u16::MAX as f64 || row > u16::MAX as f64 {
            return;
        }

        let fg = self.shade(x, y, color);
        if let Some(cell) = self.buffer.cell_mut((col as u16, row as u16)) {
            cell.set_char(glyph).set_fg(fg);
        }
    }
}

impl Widget for &BufferCanvas {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let src = self.buffer.area;

        for y in 0..area.height.min(src.height) {
            for x in 0..area.width.min(src.width) {
                let Some(from) = self.buffer.cell((x, y)) else {
                    continue;
                };
                if let Some(to) = buf.cell_mut((area.x + x, area.y + y)) {
                    *to = from.clone();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fastrand::Rng;

    use crate::animator::GlitchAnimator;
    use crate::config::GlitchConfig;
    use crate::grid::Viewport;

    use super::*;

    fn animator(config: GlitchConfig, area: Rect) -> GlitchAnimator<BufferCanvas> {
        let canvas = BufferCanvas::new(config.cell_width, config.cell_height, Vignette::from_config(&config));
        let css = BufferCanvas::css_size_for(area, config.cell_width, config.cell_height);
        let viewport = Viewport {
            container: css,
            window: css,
            device_pixel_ratio: 1.0,
        };

        GlitchAnimator::with_rng(canvas, config, viewport, Duration::ZERO, Rng::with_seed(5)).unwrap()
    }

    #[test]
    fn one_buffer_cell_per_grid_cell() {
        let a = animator(GlitchConfig::default(), Rect::new(0, 0, 30, 10));

        assert_eq!(a.canvas().buffer().area, Rect::new(0, 0, 30, 10));
        assert_eq!(a.grid().columns, 30);
        assert_eq!(a.grid().rows, 10);
    }

    #[test]
    fn glyphs_are_dimmed_by_opacity() {
        let config = GlitchConfig {
            colors: vec!["#ffffff".into()],
            characters: "Q".into(),
            outer_vignette: false,
            ..GlitchConfig::default()
        };
        let a = animator(config, Rect::new(0, 0, 4, 2));
        let cell = &a.canvas().buffer()[(1, 1)];

        assert_eq!(cell.symbol(), "Q");
        assert_eq!(cell.fg, Color::Rgb(166, 166, 166));
        assert_eq!(cell.bg, Color::Black);
    }

    #[test]
    fn outer_vignette_darkens_corners() {
        let config = GlitchConfig {
            colors: vec!["#ffffff".into()],
            ..GlitchConfig::default()
        };
        let a = animator(config, Rect::new(0, 0, 41, 21));
        let buffer = a.canvas().buffer();

        let brightness = |c: Color| match c {
            Color::Rgb(r, _, _) => r,
            _ => panic!("expected rgb, got {c:?}"),
        };

        assert!(brightness(buffer[(0, 0)].fg) < brightness(buffer[(20, 10)].fg));
    }

    #[test]
    fn widget_copies_into_frame() {
        let a = animator(GlitchConfig::default(), Rect::new(0, 0, 5, 3));
        let mut frame = Buffer::empty(Rect::new(0, 0, 8, 4));

        a.canvas().render(Rect::new(1, 1, 7, 3), &mut frame);

        assert_eq!(frame[(1, 1)], a.canvas().buffer()[(0, 0)]);
        assert_eq!(frame[(0, 0)].symbol(), " ");
    }

    #[test]
    fn out_of_range_glyphs_are_ignored() {
        let mut canvas = BufferCanvas::new(10, 20, Vignette::default());
        canvas.resize(&Surface {
            css: Size::new(20.0, 20.0),
            device_pixel_ratio: 1.0,
        });

        canvas.fill_glyph('X', 500.0, 0.0, Rgb::WHITE);
        canvas.fill_glyph('X', -1.0, 0.0, Rgb::WHITE);

        assert!(canvas.buffer().content().iter().all(|c| c.symbol() == " "));
    }
}
