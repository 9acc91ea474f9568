pub mod log;
pub mod metrics;

pub use self::log::LogManager;
pub use self::metrics::{MetricsSnapshot, RecomputeMetrics};
