pub mod book;
pub mod errors;
pub mod loan;
pub mod policy;
pub mod value_objects;

pub use book::{Book, CategoryFilter, Stock};
pub use errors::*;
pub use value_objects::*;
