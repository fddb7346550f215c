pub mod distance;
pub mod error;
pub mod estimator;
pub mod filter;
pub mod layout;
pub mod planarity;
pub mod progress;
pub mod render;
pub mod synth;
pub mod triangle;
