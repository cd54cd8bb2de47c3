use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::insight_core::ErrorCurve;
use crate::utils::AnalysisError;

/// Write a curve as CSV: one row per x value with training and test error
pub fn write_curve<W: io::Write>(curve: &ErrorCurve, writer: W) -> crate::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([curve.x_label.as_str(), "training error", "test error"])?;

    for ((x, train), test) in curve.x.iter().zip(&curve.train_error).zip(&curve.test_error) {
        csv_writer.write_record(&[x.to_string(), train.to_string(), test.to_string()])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write every curve into `dir`, one file per curve named after its title
pub fn export_curves(curves: &[ErrorCurve], dir: &Path) -> crate::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| {
        AnalysisError::DatasetError(format!("failed to create {}: {}", dir.display(), e))
    })?;

    let mut written = Vec::with_capacity(curves.len());
    for curve in curves {
        let path = dir.join(format!("{}.csv", slugify(&curve.title)));
        let file = fs::File::create(&path).map_err(|e| {
            AnalysisError::DatasetError(format!("failed to create {}: {}", path.display(), e))
        })?;
        write_curve(curve, io::BufWriter::new(file))?;
        written.push(path);
    }

    Ok(written)
}

/// Lowercase ASCII alphanumerics joined by single underscores
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}
