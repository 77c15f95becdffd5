use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::Parser;
use crossterm::event::{self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Rect, Size};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};
use tracing_subscriber::EnvFilter;

use glitch_bg::backend::BufferCanvas;
use glitch_bg::grid::Viewport;
use glitch_bg::schedule::{ManualScheduler, Visibility};
use glitch_bg::vignette::Vignette;
use glitch_bg::{GlitchAnimator, GlitchConfig};

#[derive(Parser, Debug)]
#[command(name = "glitch-bg-harness", version)]
struct Cli {
    /// Animator config JSON. Missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed the glitch RNG for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,

    /// Frames per second.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=240))]
    fps: u32,

    /// Write tracing output to this file. Nothing is logged otherwise,
    /// since the terminal is busy drawing.
    #[arg(long)]
    log: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref())?;
    let config = load_config(cli.config.as_deref())?;

    enable_raw_mode()?;
    crossterm::execute!(io::stdout(), EnterAlternateScreen, EnableFocusChange)?;

    let result = run(&cli, config);

    disable_raw_mode()?;
    crossterm::execute!(io::stdout(), DisableFocusChange, LeaveAlternateScreen)?;

    result
}

fn init_tracing(path: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<GlitchConfig> {
    let Some(path) = path else {
        return Ok(GlitchConfig::default());
    };

    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    GlitchConfig::from_json_str(&json).with_context(|| format!("loading config {}", path.display()))
}

/// One terminal cell per glyph box.
fn viewport(size: Size, config: &GlitchConfig) -> Viewport {
    let area = Rect::new(0, 0, size.width, size.height);
    let css = BufferCanvas::css_size_for(area, config.cell_width, config.cell_height);

    Viewport {
        container: css,
        window: css,
        device_pixel_ratio: 1.0,
    }
}

fn run(cli: &Cli, config: GlitchConfig) -> anyhow::Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    let clock = Instant::now();

    let rng = cli.seed.map(fastrand::Rng::with_seed).unwrap_or_else(fastrand::Rng::new);
    let canvas = BufferCanvas::new(config.cell_width, config.cell_height, Vignette::from_config(&config));
    let initial = viewport(terminal.size()?, &config);
    let mut animator = GlitchAnimator::with_rng(canvas, config, initial, clock.elapsed(), rng)?;

    let mut scheduler = ManualScheduler::new();
    let mut visibility = Visibility::Visible;
    animator.start(clock.elapsed(), &mut scheduler);

    tracing::info!(grid = ?animator.grid(), fps = cli.fps, "harness started");

    let frame_interval = Duration::from_secs(1) / cli.fps;
    let mut dirty = true;

    loop {
        let frame_start = Instant::now();
        let now = clock.elapsed();

        if animator.resize_due(now) {
            let size = terminal.size()?;
            animator.resize(viewport(size, animator.config()));
            terminal.clear()?;
            dirty = true;
        }

        if scheduler.take_due().is_some() {
            if let Some(report) = animator.on_frame(now, &mut scheduler) {
                dirty |= report.redrawn;
            }
        }

        if dirty {
            terminal.draw(|f| {
                f.render_widget(animator.canvas(), f.area());
                header(f, visibility);
            })?;
            dirty = false;
        }

        let timeout = frame_interval.saturating_sub(frame_start.elapsed());
        if !event::poll(timeout)? {
            continue;
        }

        let next = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Char('p') => Some(match visibility {
                    Visibility::Visible => Visibility::Hidden,
                    Visibility::Hidden => Visibility::Visible,
                }),
                _ => None,
            },
            Event::FocusLost => Some(Visibility::Hidden),
            Event::FocusGained => Some(Visibility::Visible),
            Event::Resize(..) => {
                animator.note_resize(clock.elapsed());
                None
            }
            _ => None,
        };

        if let Some(next) = next {
            visibility = next;
            animator.set_visibility(visibility, clock.elapsed(), &mut scheduler);
            tracing::debug!(?visibility, state = ?animator.loop_state(), "visibility changed");
            dirty = true;
        }
    }

    Ok(())
}

fn header(f: &mut Frame, visibility: Visibility) {
    let label = match visibility {
        Visibility::Visible => "glitch-bg  [p pause]  [q quit]",
        Visibility::Hidden => "glitch-bg  paused  [p resume]  [q quit]",
    };

    let area = f.area();
    f.render_widget(
        Paragraph::new(label).style(Style::new().fg(Color::DarkGray).bg(Color::Black)),
        Rect::new(area.x, area.y, area.width, area.height.min(1)),
    );
}
