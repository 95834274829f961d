//! 会话模型与注册表

mod model;
mod registry;

pub use model::{PickedProduct, Session, SessionView};
pub use registry::{SessionHandle, SessionRegistry};
