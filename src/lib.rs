pub mod body;
pub mod config;
pub mod error;
pub mod expr;
pub mod forces;
pub mod geometry;
pub mod partition;
pub mod profiler;
pub mod simulation;
pub mod sites;
pub mod units;

#[cfg(feature = "profiling")]
use once_cell::sync::Lazy;
#[cfg(feature = "profiling")]
use parking_lot::Mutex;

#[cfg(feature = "profiling")]
pub static PROFILER: Lazy<Mutex<profiler::Profiler>> =
    Lazy::new(|| Mutex::new(profiler::Profiler::new()));
