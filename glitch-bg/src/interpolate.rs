use crate::grid::Cell;
use crate::palette::Rgb;

/// Per-channel linear blend, rounded to the nearest integer.
/// `t` must be in `[0.0, 1.0]`.
pub fn lerp_rgb(start: Rgb, target: Rgb, t: f32) -> Rgb {
    Rgb::new(
        lerp_channel(start.r, target.r, t),
        lerp_channel(start.g, target.g, t),
        lerp_channel(start.b, target.b, t),
    )
}

fn lerp_channel(start: u8, target: u8, t: f32) -> u8 {
    let s = start as f32;
    let d = target as f32;
    (s + (d - s) * t).round().clamp(0.0, 255.0) as u8
}

/// Moves every in-flight transition forward by `step`, clamped to 1.
/// Returns how many cells moved; any of them means the canvas is stale.
pub fn advance(cells: &mut [Cell], step: f32) -> usize {
    let mut advanced = 0;

    for cell in cells.iter_mut().filter(|c| c.in_transition()) {
        cell.progress = (cell.progress + step).min(1.0);
        cell.color = lerp_rgb(cell.start, cell.target, cell.progress);
        advanced += 1;
    }

    advanced
}
