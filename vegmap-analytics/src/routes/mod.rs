pub mod health;
pub mod progress;
pub mod stats;
pub mod track;
