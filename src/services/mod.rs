pub mod progress;

pub use progress::extract_width_percentage;
