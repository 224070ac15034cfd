// Preview pipeline: frame delivery and re-encoding.

pub mod capture;
pub mod compress;
pub mod source;
