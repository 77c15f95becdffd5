//! Letter-glitch background: a grid of random glyphs that keeps flickering to
//! new characters and colors, drawn onto any 2D [`canvas::Canvas`].
//!
//! The animator is host-agnostic. A browser host lives in `web` (wasm32
//! only), and [`backend::BufferCanvas`] draws into a ratatui buffer.

#![forbid(unsafe_code)]

pub mod animator;
pub mod backend;
pub mod canvas;
pub mod config;
pub mod debounce;
pub mod embed;
pub mod error;
pub mod grid;
pub mod interpolate;
pub mod mutate;
pub mod palette;
pub mod schedule;
pub mod vignette;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use animator::{FrameReport, GlitchAnimator};
pub use config::GlitchConfig;
pub use error::{ConfigError, EmbedError};
