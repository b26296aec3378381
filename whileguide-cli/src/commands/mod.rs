//! Command implementations for the whileguide CLI

pub mod copy;
pub mod debug;
pub mod export;
pub mod session;
pub mod show;
pub mod stats;
pub mod tabs;

pub use copy::run_copy;
pub use debug::run_debug;
pub use export::run_export;
pub use session::run_session;
pub use show::run_show;
pub use stats::run_stats;
pub use tabs::run_tabs;
