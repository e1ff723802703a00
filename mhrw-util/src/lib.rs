pub mod duration;
pub mod moving_average;

pub use duration::format_duration;
pub use moving_average::MovingAverageBuffer;
