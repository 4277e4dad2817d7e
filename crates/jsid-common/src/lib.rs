pub mod change;
pub mod error;
pub mod inference;
pub mod model;
pub mod protocol;
pub mod selector;
