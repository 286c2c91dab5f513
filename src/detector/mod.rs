pub mod analyzer;
pub mod rules;

pub use analyzer::SuspicionDetector;
