//! 用户行为状态机

mod engine;
mod transitions;
mod types;

pub use engine::BehaviorEngine;
pub use transitions::{Transition, TransitionTable};
pub use types::{EventType, State};
