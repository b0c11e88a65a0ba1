// src/chart/font.rs

use once_cell::sync::OnceCell;
use plotters::style::{register_font, FontStyle};

use crate::error::PipelineError;

static DEJAVU_SANS: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/fonts/DejaVuSans.ttf"));

static REGISTERED: OnceCell<()> = OnceCell::new();

/// Register the bundled face as "sans-serif" so text draws without system fonts.
pub(super) fn ensure_registered() -> Result<(), PipelineError> {
    REGISTERED
        .get_or_try_init(|| {
            register_font("sans-serif", FontStyle::Normal, DEJAVU_SANS)
                .map_err(|_| PipelineError::Render("bundled font rejected: InvalidFont".to_string()))
        })
        .map(|_| ())
}
