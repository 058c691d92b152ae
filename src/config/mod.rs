pub mod env;
pub mod views;

pub use env::*;
pub use views::*;
