pub mod backend;
pub mod capture;
pub mod cdp;
pub mod inject;
pub mod listeners;

pub use backend::HeadlessDriver;
