mod propagation_status;
mod trail;

pub use propagation_status::*;
pub(crate) use trail::*;
