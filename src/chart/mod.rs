// src/chart/mod.rs

mod font;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbImage};
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use std::{error::Error, io::Cursor, ops::Range};
use tracing::{instrument, trace};

use crate::analysis::stats::LinearFit;
use crate::error::PipelineError;

/// 6x4 inches at 100 dpi.
pub const WIDTH: u32 = 600;
pub const HEIGHT: u32 = 400;

pub const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Scatter of (rank, peak) with the fitted line dotted over it, as PNG bytes.
#[instrument(level = "debug", skip(points, fit), fields(points = points.len(), fitted = fit.is_some()))]
pub fn render_scatter_png(points: &[(f64, f64)], fit: Option<LinearFit>) -> Result<Vec<u8>, PipelineError> {
    font::ensure_registered()?;

    let mut rgb = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    draw_scatter(&mut rgb, points, fit).map_err(|e| PipelineError::Render(e.to_string()))?;

    let img = RgbImage::from_raw(WIDTH, HEIGHT, rgb)
        .ok_or_else(|| PipelineError::Render("pixel buffer does not match canvas".to_string()))?;
    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, ImageFormat::Png)
        .map_err(|e| PipelineError::Render(e.to_string()))?;
    let png = png.into_inner();
    trace!(bytes = png.len(), "encoded png");
    Ok(png)
}

/// `data:image/png;base64,...` for the given PNG bytes.
pub fn png_data_uri(png: &[u8]) -> String {
    format!("{}{}", DATA_URI_PREFIX, STANDARD.encode(png))
}

fn draw_scatter(buf: &mut [u8], points: &[(f64, f64)], fit: Option<LinearFit>) -> Result<(), Box<dyn Error>> {
    let x_range = padded_range(points.iter().map(|p| p.0));
    let line: Option<Vec<(f64, f64)>> = fit.map(|f| {
        vec![(x_range.start, f.at(x_range.start)), (x_range.end, f.at(x_range.end))]
    });
    let y_range = padded_range(
        points
            .iter()
            .map(|p| p.1)
            .chain(line.iter().flatten().map(|p| p.1)),
    );

    let root = BitMapBackend::with_buffer(buf, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Rank vs Peak", ("sans-serif", 20))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(48)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Rank")
        .y_desc("Peak")
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, BLUE.mix(0.8).filled())),
    )?;

    if let Some(line) = line {
        chart
            .draw_series(DashedLineSeries::new(line, 2, 4, RED.stroke_width(2)))?
            .label("Regression line")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// Data bounds with 5% slack on each side; never an empty range.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return 0.0..1.0;
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    (lo - pad)..(hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn renders_png_of_expected_size() {
        let points = [(1.0, 1.0), (2.0, 1.0), (3.0, 2.0), (4.0, 4.0)];
        let fit = crate::analysis::stats::linear_fit(&[1.0, 2.0, 3.0, 4.0], &[1.0, 1.0, 2.0, 4.0]);
        let png = render_scatter_png(&points, fit).unwrap();
        assert_eq!(png[..8], PNG_SIGNATURE);

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (WIDTH, HEIGHT));
    }

    #[test]
    fn renders_without_fit_or_points() {
        assert!(render_scatter_png(&[(7.0, 3.0)], None).is_ok());
        assert!(render_scatter_png(&[], None).is_ok());
    }

    #[test]
    fn data_uri_is_valid_base64() {
        let uri = png_data_uri(&PNG_SIGNATURE);
        let payload = uri.strip_prefix(DATA_URI_PREFIX).unwrap();
        assert_eq!(STANDARD.decode(payload).unwrap(), PNG_SIGNATURE);
    }

    #[test]
    fn range_padding() {
        assert_eq!(padded_range([2.0, 2.0].into_iter()), 1.0..3.0);
        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
        let r = padded_range([0.0, 10.0].into_iter());
        assert_eq!(r, -0.5..10.5);
    }
}
