//! Terminal line charts for error curves

use crate::insight_core::ErrorCurve;
use crate::utils::AnalysisError;

const LABEL_WIDTH: usize = 10;
const TEST_MARKER: char = '*';
const TRAIN_MARKER: char = 'o';
const OVERLAP_MARKER: char = '#';

/// Render a curve as a `width` x `height` character plot
///
/// Layout, top to bottom: title, y label, `height` plot rows with the y
/// range on the left, the x axis with its first and last value, the x
/// label and the legend. Consecutive points are joined column by column.
pub fn render(curve: &ErrorCurve, width: usize, height: usize) -> Result<String, AnalysisError> {
    if width < 2 || height < 2 {
        return Err(AnalysisError::ValidationError(format!(
            "chart must be at least 2x2, got {}x{}",
            width, height
        )));
    }
    if curve.is_empty() {
        return Err(AnalysisError::ValidationError(
            "cannot chart an empty curve".to_string(),
        ));
    }
    if curve.train_error.len() != curve.len() || curve.test_error.len() != curve.len() {
        return Err(AnalysisError::ValidationError(format!(
            "curve '{}' has {} x values but {} train and {} test errors",
            curve.title,
            curve.len(),
            curve.train_error.len(),
            curve.test_error.len()
        )));
    }

    let axes = Axes::fit(curve, width, height);
    let mut grid = vec![vec![' '; width]; height];
    plot_series(&mut grid, &axes, &curve.x, &curve.test_error, TEST_MARKER);
    plot_series(&mut grid, &axes, &curve.x, &curve.train_error, TRAIN_MARKER);

    let mut lines = Vec::with_capacity(height + 6);
    lines.push(curve.title.clone());
    lines.push(curve.y_label.clone());

    let middle = height / 2;
    for (r, row) in grid.iter().enumerate() {
        let label = if r == 0 {
            format!("{:.2}", axes.y_max)
        } else if r == middle {
            format!("{:.2}", axes.y_at_row(r))
        } else if r == height - 1 {
            format!("{:.2}", axes.y_min)
        } else {
            String::new()
        };
        let row: String = row.iter().collect();
        lines.push(format!("{:>w$} |{}", label, row, w = LABEL_WIDTH));
    }

    lines.push(format!("{:>w$} +{}", "", "-".repeat(width), w = LABEL_WIDTH));

    let first = format_tick(axes.x_min);
    let last = format_tick(axes.x_max);
    let gap = (width + 1).saturating_sub(first.len() + last.len()).max(1);
    lines.push(format!(
        "{:>w$} {}{}{}",
        "",
        first,
        " ".repeat(gap),
        last,
        w = LABEL_WIDTH
    ));

    let pad = LABEL_WIDTH + 2 + width.saturating_sub(curve.x_label.len()) / 2;
    lines.push(format!("{}{}", " ".repeat(pad), curve.x_label));

    lines.push(format!(
        "{:>w$} {} test error   {} training error",
        "",
        TEST_MARKER,
        TRAIN_MARKER,
        w = LABEL_WIDTH
    ));

    Ok(lines.join("\n"))
}

/// Data ranges mapped onto grid coordinates
struct Axes {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    width: usize,
    height: usize,
}

impl Axes {
    fn fit(curve: &ErrorCurve, width: usize, height: usize) -> Self {
        let (x_min, x_max) = bounds(curve.x.iter().copied());
        let (y_min, mut y_max) = bounds(curve.train_error.iter().chain(&curve.test_error).copied());
        if y_max <= y_min {
            y_max = y_min + 1.0;
        }
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
            width,
            height,
        }
    }

    fn column(&self, x: f64) -> usize {
        if self.x_max <= self.x_min {
            return 0;
        }
        let t = (x - self.x_min) / (self.x_max - self.x_min);
        ((t * (self.width - 1) as f64).round() as usize).min(self.width - 1)
    }

    fn row(&self, y: f64) -> usize {
        let t = (self.y_max - y) / (self.y_max - self.y_min);
        ((t * (self.height - 1) as f64).round().max(0.0) as usize).min(self.height - 1)
    }

    fn y_at_row(&self, row: usize) -> f64 {
        self.y_max - (self.y_max - self.y_min) * row as f64 / (self.height - 1) as f64
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn plot_series(grid: &mut [Vec<char>], axes: &Axes, x: &[f64], y: &[f64], marker: char) {
    let mut mark = |col: usize, row: usize| {
        let cell = &mut grid[row][col];
        *cell = match *cell {
            ' ' => marker,
            existing if existing == marker => marker,
            _ => OVERLAP_MARKER,
        };
    };

    if x.len() == 1 {
        mark(axes.column(x[0]), axes.row(y[0]));
        return;
    }

    for i in 1..x.len() {
        let (c0, c1) = (axes.column(x[i - 1]), axes.column(x[i]));
        if c1 <= c0 {
            mark(c1, axes.row(y[i]));
            continue;
        }
        for col in c0..=c1 {
            let t = (col - c0) as f64 / (c1 - c0) as f64;
            let value = y[i - 1] + (y[i] - y[i - 1]) * t;
            mark(col, axes.row(value));
        }
    }
}

fn format_tick(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> ErrorCurve {
        ErrorCurve {
            title: "Errors".to_string(),
            x_label: "Max Depth".to_string(),
            y_label: "Error".to_string(),
            x: vec![1.0, 2.0, 3.0],
            train_error: vec![0.0, 0.0, 0.0],
            test_error: vec![3.0, 2.0, 1.0],
        }
    }

    #[test]
    fn test_render_layout() {
        let chart = render(&curve(), 30, 10).unwrap();
        let lines: Vec<&str> = chart.lines().collect();

        assert_eq!(lines.len(), 16);
        assert_eq!(lines[0], "Errors");
        assert_eq!(lines[1], "Error");
        assert!(lines[2].trim_start().starts_with("3.00 |"));
        assert!(lines[11].trim_start().starts_with("0.00 |"));
        assert!(lines[13].contains('1') && lines[13].contains('3'));
        assert!(lines[14].contains("Max Depth"));
        assert!(lines[15].contains("test error"));
        assert!(lines[15].contains("training error"));
    }

    #[test]
    fn test_render_places_points() {
        let chart = render(&curve(), 30, 10).unwrap();
        let lines: Vec<&str> = chart.lines().collect();
        let plot_start = LABEL_WIDTH + 2;

        // highest test error sits in the top-left corner
        assert_eq!(lines[2].chars().nth(plot_start), Some(TEST_MARKER));
        // zero training error runs along the bottom row
        let bottom: String = lines[11].chars().skip(plot_start).collect();
        assert_eq!(bottom, "o".repeat(30));
    }

    #[test]
    fn test_render_marks_overlap() {
        let mut c = curve();
        c.test_error = vec![0.0, 1.0, 2.0];
        let chart = render(&c, 20, 5).unwrap();
        let lines: Vec<&str> = chart.lines().collect();

        assert_eq!(lines[6].chars().nth(LABEL_WIDTH + 2), Some(OVERLAP_MARKER));
    }

    #[test]
    fn test_render_flat_and_single_point() {
        let flat = ErrorCurve {
            x: vec![5.0],
            train_error: vec![2.0],
            test_error: vec![2.0],
            ..curve()
        };
        let chart = render(&flat, 10, 4).unwrap();
        assert!(chart.contains(OVERLAP_MARKER));
    }

    #[test]
    fn test_render_invalid() {
        assert!(render(&curve(), 1, 10).is_err());

        let mut bad = curve();
        bad.test_error.pop();
        assert!(render(&bad, 30, 10).is_err());

        let empty = ErrorCurve {
            x: vec![],
            train_error: vec![],
            test_error: vec![],
            ..curve()
        };
        assert!(render(&empty, 30, 10).is_err());
    }
}
