// src/analysis/stats.rs

/// Least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Centered sums (sxx, syy, sxy) over paired samples.
fn centered_sums(xs: &[f64], ys: &[f64]) -> (f64, f64, f64) {
    let (mx, my) = (mean(xs), mean(ys));
    xs.iter()
        .zip(ys)
        .fold((0.0, 0.0, 0.0), |(sxx, syy, sxy), (&x, &y)| {
            let (dx, dy) = (x - mx, y - my);
            (sxx + dx * dx, syy + dy * dy, sxy + dx * dy)
        })
}

/// Pearson correlation of two equal-length samples.
///
/// `None` with fewer than two points or when either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let (sxx, syy, sxy) = centered_sums(xs, ys);
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    // guard against rounding pushing |r| just past 1
    Some(r.clamp(-1.0, 1.0))
}

/// First-degree least-squares fit of `ys` on `xs`.
///
/// `None` with fewer than two points or when every x is the same.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let (sxx, _, sxy) = centered_sums(xs, ys);
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: mean(ys) - slope * mean(xs),
    })
}

/// Round half away from zero to `places` decimals.
pub fn round_to(x: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (x * factor).round() / factor
}
