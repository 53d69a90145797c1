//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - rebinned densities: `#` bars, as wide as their (non-uniform) bins
//! - fitted Gaussian: `*` line, drawn only inside the fit range

use crate::domain::{GaussianFit, RebinnedSpectrumHistogram, SpectrumFile};

/// Render a histogram and optional fit.
pub fn render_ascii_plot(
    hist: &RebinnedSpectrumHistogram,
    fit: Option<&GaussianFit>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((x_min, x_max)) = x_range(hist) else {
        return "Plot: (empty histogram)\n".to_string();
    };
    let curve = fit.map(|f| sample_fit(f, x_min, x_max, width));

    // Bars start at zero; only the top is padded.
    let y_max = content_max(hist, curve.as_deref()).unwrap_or(1.0);
    let (_, y_max) = pad_range(0.0, y_max, 0.05);
    let y_min = 0.0;

    let mut grid = vec![vec![' '; width]; height];

    for col in 0..width {
        let x = column_x(col, x_min, x_max, width);
        let Some(bin) = find_bin(hist, x) else {
            continue;
        };
        let content = hist.contents[bin];
        if !(content.is_finite() && content > y_min) {
            continue;
        }
        let top = map_y(content, y_min, y_max, height);
        for row in grid.iter_mut().skip(top) {
            row[col] = '#';
        }
    }

    if let Some(curve) = &curve {
        draw_curve(&mut grid, curve, x_min, x_max, y_min, y_max);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: adc=[{x_min:.3}, {x_max:.3}] | density=[{y_min:.2}, {y_max:.2}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

/// Render a plot from a saved spectrum JSON file.
pub fn render_ascii_plot_from_file(spectrum: &SpectrumFile, width: usize, height: usize) -> String {
    render_ascii_plot(&spectrum.rebinned, spectrum.fit.as_ref(), width, height)
}

fn x_range(hist: &RebinnedSpectrumHistogram) -> Option<(f64, f64)> {
    let min_x = hist.edges.iter().copied().fold(f64::INFINITY, f64::min);
    let max_x = hist.edges.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x && hist.bin_count() > 0 {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn content_max(hist: &RebinnedSpectrumHistogram, curve: Option<&[(f64, f64)]>) -> Option<f64> {
    let mut max_y = hist
        .contents
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if let Some(curve) = curve {
        for &(_, y) in curve {
            max_y = max_y.max(y);
        }
    }
    (max_y.is_finite() && max_y > 0.0).then_some(max_y)
}

/// Bin containing `x`; the last bin also owns its upper edge.
fn find_bin(hist: &RebinnedSpectrumHistogram, x: f64) -> Option<usize> {
    let n = hist.bin_count();
    (0..n).find(|&i| {
        let (lo, hi) = (hist.bin_low(i), hist.bin_high(i));
        (x >= lo && x < hi) || (i == n - 1 && x == hi)
    })
}

fn sample_fit(fit: &GaussianFit, x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    (0..n)
        .map(|col| column_x(col, x_min, x_max, n))
        .filter(|&x| fit.range.contains(x))
        .map(|x| (x, fit.evaluate(x)))
        .collect()
}

fn column_x(col: usize, x_min: f64, x_max: f64, width: usize) -> f64 {
    x_min + col as f64 * (x_max - x_min) / (width as f64 - 1.0)
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '*');
        } else {
            grid[row][col] = '*';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FitRange;

    fn three_bins() -> RebinnedSpectrumHistogram {
        RebinnedSpectrumHistogram {
            edges: vec![0.5, 1.6, 2.5, 3.5],
            contents: vec![10.0 / 1.1, 20.0 / 0.9, 30.0],
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let txt = render_ascii_plot(&three_bins(), None, 10, 5);
        let expected = concat!(
            "Plot: adc=[0.500, 3.500] | density=[0.00, 31.50]\n",
            "      ####\n",
            "    ######\n",
            "    ######\n",
            "##########\n",
            "##########\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn fit_curve_stays_inside_range() {
        let fit = GaussianFit {
            amplitude: 25.0,
            mean: 2.5,
            sigma: 0.8,
            chi2: 0.0,
            ndf: 0,
            iterations: 1,
            range: FitRange { lo: 2.0, hi: 3.5 },
        };
        let txt = render_ascii_plot(&three_bins(), Some(&fit), 30, 8);
        let rows: Vec<&str> = txt.lines().skip(1).collect();
        assert_eq!(rows.len(), 8);
        // Columns left of x = 2.0 never carry the curve.
        let first_fit_col = map_x(2.0, 0.5, 3.5, 30);
        for row in &rows {
            assert!(!row[..first_fit_col - 1].contains('*'), "{txt}");
        }
        assert!(txt.contains('*'));
    }

    #[test]
    fn empty_histogram_does_not_panic() {
        let hist = RebinnedSpectrumHistogram {
            edges: vec![0.5],
            contents: vec![],
        };
        assert_eq!(render_ascii_plot(&hist, None, 20, 5), "Plot: (empty histogram)\n");
    }
}
