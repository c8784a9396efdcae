//! [`RepeatingTimer`](crate::application::scheduling::RepeatingTimer)
//! implementations.
//!
//! - **`tokio_timer`** – [`TokioTimer`], which runs each task on the Tokio runtime.
//! - **`manual`** – [`ManualTimer`], a test double whose ticks are fired by
//!   hand.

pub mod manual;
pub mod tokio_timer;

pub use manual::ManualTimer;
pub use tokio_timer::TokioTimer;
