pub mod admin;
pub mod health;
pub mod restaurants;
pub mod side_dishes;
pub mod suggestions;
