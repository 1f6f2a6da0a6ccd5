mod args;
mod driver;
mod engine;
mod spectrum;
mod write;

pub use args::*;
pub use driver::{MZCascader, MZCascaderError};
pub use engine::{peak_group_from_solution, select_solutions, Averagine, EngineDeconvoluter};
pub use spectrum::{precursor_window_of, CentroidedSpectrum, DEFAULT_ISOLATION_HALF_WIDTH};
pub use write::{write_peak_groups, OutputFormat, PeakGroupRow};
