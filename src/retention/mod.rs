mod classifier;
mod policy;

pub use classifier::{classify, parse_timestamp, Classification};
pub use policy::{Cutoff, RetentionPolicy};
