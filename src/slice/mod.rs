/// Grid layout and per-cell cropping.
pub mod grid;
