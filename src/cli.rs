pub mod commands {
    pub mod report;
}
pub mod global;

pub use global::{CommandLineArgs, GlobalArgs};
