/// Curve rendering and export
pub mod chart;
pub mod export;

pub use chart::render;
pub use export::{export_curves, write_curve};
