pub mod dashboard;
pub mod identity;
pub mod progress;
pub mod recorder;

mod tally;
