//! Core functionalities.
mod batch;
mod env;
mod replay_buffer;
mod step;
pub use batch::TransitionBatch;
pub use env::Env;
pub use replay_buffer::{ExperienceBufferBase, ReplayBufferBase};
pub use step::Step;
