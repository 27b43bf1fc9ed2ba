pub mod common;
pub mod logging;
pub mod seed;

pub use common::DataRootArgs;
pub use logging::init_tracing;
pub use seed::resolve_seed;
