//! Sliding window admission control.

mod limiter;
mod quota;
mod window;

pub use limiter::SlidingWindowLimiter;
pub use quota::{Quota, TimeUnit};
pub use tokio_util::sync::CancellationToken;
pub use window::{AdmissionWindow, NextSlot};
