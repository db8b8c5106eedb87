pub mod month;
pub mod subscription;

pub use month::*;
pub use subscription::*;
