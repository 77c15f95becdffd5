use std::time::Duration;

use fastrand::Rng;

use crate::canvas::{self, Canvas, Surface, TextStyle};
use crate::config::GlitchConfig;
use crate::debounce::Debouncer;
use crate::error::ConfigResult;
use crate::grid::{Cells, Grid, Viewport};
use crate::interpolate;
use crate::mutate::{self, GlitchParams};
use crate::palette::Palette;
use crate::schedule::{FrameScheduler, LoopState, Visibility};
use crate::vignette::Vignette;

/// What one frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    /// Index draws of the glitch tick; zero when the interval had not elapsed.
    pub draws: usize,
    /// Cells whose color transition moved this frame.
    pub advanced: usize,
    pub redrawn: bool,
}

/// Glitching letter grid painted onto a [`Canvas`].
///
/// The animator never talks to a clock or a frame source itself. Hosts pass
/// the current time (any monotonic origin) and a [`FrameScheduler`], which
/// keeps pausing and resuming testable without a browser.
pub struct GlitchAnimator<C: Canvas> {
    canvas: C,
    config: GlitchConfig,
    palette: Palette,
    glyphs: Vec<char>,
    style: TextStyle,
    vignette: Vignette,
    rng: Rng,
    surface: Surface,
    cells: Cells,
    last_mutation: Duration,
    resize_debounce: Debouncer,
    state: LoopState,
}

impl<C: Canvas> GlitchAnimator<C> {
    pub fn new(canvas: C, config: GlitchConfig, viewport: Viewport, now: Duration) -> ConfigResult<Self> {
        Self::with_rng(canvas, config, viewport, now, Rng::new())
    }

    /// Sizes the canvas, fills the grid and paints it once. The loop starts
    /// paused; call [`start`](Self::start) to begin animating.
    pub fn with_rng(
        canvas: C,
        config: GlitchConfig,
        viewport: Viewport,
        now: Duration,
        rng: Rng,
    ) -> ConfigResult<Self> {
        config.validate()?;

        let style = TextStyle {
            font: config.font(),
            opacity: config.opacity,
            cell_width: config.cell_width,
            cell_height: config.cell_height,
        };

        let mut animator = Self {
            canvas,
            palette: Palette::from_hex_list(config.colors.as_slice()),
            glyphs: config.glyphs(),
            vignette: Vignette::from_config(&config),
            resize_debounce: Debouncer::new(config.resize_debounce()),
            style,
            rng,
            surface: Surface::from_viewport(&viewport),
            cells: Cells::default(),
            last_mutation: now,
            state: LoopState::Paused,
            config,
        };

        animator.resize(viewport);
        Ok(animator)
    }

    pub fn grid(&self) -> Grid {
        self.cells.grid()
    }

    pub fn cells(&self) -> &Cells {
        &self.cells
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    pub fn config(&self) -> &GlitchConfig {
        &self.config
    }

    pub fn vignette(&self) -> Vignette {
        self.vignette
    }

    pub fn loop_state(&self) -> LoopState {
        self.state
    }

    /// Begin the frame loop. Same as becoming visible.
    pub fn start(&mut self, now: Duration, scheduler: &mut impl FrameScheduler) {
        self.set_visibility(Visibility::Visible, now, scheduler);
    }

    /// Glitch if the interval elapsed, advance transitions, repaint if
    /// anything changed.
    pub fn step(&mut self, now: Duration) -> FrameReport {
        let mut report = FrameReport::default();

        if now.saturating_sub(self.last_mutation) >= self.config.mutation_interval() {
            let params = GlitchParams {
                glyphs: &self.glyphs,
                palette: &self.palette,
                smooth: self.config.smooth,
                fraction: self.config.mutation_fraction,
            };
            report.draws = mutate::glitch(self.cells.as_mut_slice(), &params, &mut self.rng);
            self.last_mutation = now;
        }

        report.advanced = interpolate::advance(self.cells.as_mut_slice(), self.config.transition_step);

        if report.draws > 0 || report.advanced > 0 {
            self.draw();
            report.redrawn = true;
        }

        report
    }

    /// Frame callback. Stale callbacks that arrive while paused are ignored.
    pub fn on_frame(&mut self, now: Duration, scheduler: &mut impl FrameScheduler) -> Option<FrameReport> {
        if !self.state.is_running() {
            return None;
        }

        let report = self.step(now);
        self.state = match scheduler.request_frame() {
            Some(handle) => LoopState::Running(handle),
            None => LoopState::Paused,
        };

        Some(report)
    }

    pub fn set_visibility(&mut self, visibility: Visibility, now: Duration, scheduler: &mut impl FrameScheduler) {
        match (visibility, self.state) {
            (Visibility::Hidden, LoopState::Running(handle)) => {
                scheduler.cancel_frame(handle);
                self.state = LoopState::Paused;
                tracing::debug!("glitch loop paused");
            }
            (Visibility::Visible, LoopState::Paused) => {
                // No catch-up burst for the time spent hidden.
                self.last_mutation = now;
                self.state = match scheduler.request_frame() {
                    Some(handle) => LoopState::Running(handle),
                    None => {
                        tracing::warn!("host refused a frame request, glitch loop stays paused");
                        LoopState::Paused
                    }
                };
            }
            _ => {}
        }
    }

    /// Record a raw window resize event.
    pub fn note_resize(&mut self, now: Duration) {
        self.resize_debounce.trigger(now);
    }

    /// True once when the resize burst has been quiet long enough.
    pub fn resize_due(&mut self, now: Duration) -> bool {
        self.resize_debounce.fire(now)
    }

    /// Rebuild everything for a new viewport. Prior cell state is discarded.
    pub fn resize(&mut self, viewport: Viewport) {
        self.resize_debounce.cancel();
        self.surface = Surface::from_viewport(&viewport);
        self.canvas.resize(&self.surface);

        let grid = Grid::for_surface(self.surface.css, self.config.cell_width, self.config.cell_height);
        self.cells = Cells::fill(grid, &self.glyphs, &self.palette, &mut self.rng);

        tracing::debug!(
            columns = grid.columns,
            rows = grid.rows,
            ratio = self.surface.device_pixel_ratio,
            "glitch grid rebuilt"
        );

        self.draw();
    }

    fn draw(&mut self) {
        canvas::redraw(&mut self.canvas, &self.cells, &self.surface, &self.style);
    }
}
