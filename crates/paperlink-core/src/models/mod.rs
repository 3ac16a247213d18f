pub mod link;
pub mod record;

pub use link::*;
pub use record::*;
