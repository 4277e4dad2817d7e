pub mod analyzer;
pub mod capture;
pub mod codegen;
pub mod config;
pub mod driver;
pub mod observer;
pub mod recorder;
pub mod session;
pub mod tracker;

pub use jsid_common::change;
pub use jsid_common::error;
pub use jsid_common::inference;
pub use jsid_common::model;
pub use jsid_common::protocol;
pub use jsid_common::selector;
