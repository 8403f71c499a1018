pub mod member;
pub mod enrollment;
pub mod report;
pub mod submission;

pub use member::*;
pub use enrollment::*;
pub use report::*;
pub use submission::*;
