use fastrand::Rng;

use crate::grid::Cell;
use crate::palette::Palette;

/// How many index draws one glitch tick makes: at least one for any non-empty grid.
pub fn draw_count(total: usize, fraction: f64) -> usize {
    if total == 0 {
        return 0;
    }

    ((total as f64 * fraction).floor() as usize).max(1)
}

/// Knobs of one glitch tick.
#[derive(Debug, Clone, Copy)]
pub struct GlitchParams<'a> {
    pub glyphs: &'a [char],
    pub palette: &'a Palette,
    pub smooth: bool,
    pub fraction: f64,
}

/// Reassigns glyph and color of randomly drawn cells.
///
/// Indices are drawn with replacement: a cell can be hit twice in one tick
/// while another is skipped. Returns the number of draws.
pub fn glitch(cells: &mut [Cell], params: &GlitchParams<'_>, rng: &mut Rng) -> usize {
    let draws = draw_count(cells.len(), params.fraction);

    for _ in 0..draws {
        let index = rng.usize(..cells.len());
        let glyph = params.glyphs[rng.usize(..params.glyphs.len())];
        let color = params.palette.pick(rng);
        let cell = &mut cells[index];

        cell.glyph = glyph;

        if params.smooth {
            cell.start = cell.color;
            cell.target = color;
            cell.progress = 0.0;
        } else {
            *cell = Cell::settled(glyph, color);
        }
    }

    draws
}
