pub mod link;
pub mod record;
pub mod report;

pub use link::*;
pub use record::*;
pub use report::*;
