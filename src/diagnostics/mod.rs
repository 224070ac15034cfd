// Diagnostics: per-session frame and effect statistics.

pub mod stats;
