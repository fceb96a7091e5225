pub use identity::*;
pub use timestamp::*;

mod identity;
mod timestamp;
