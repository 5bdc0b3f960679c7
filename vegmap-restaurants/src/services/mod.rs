pub mod filter;
pub mod identity;
pub mod suggestions;
