mod base;
mod batch;
mod sink;

pub use base::*;
pub use batch::*;
pub use sink::*;
