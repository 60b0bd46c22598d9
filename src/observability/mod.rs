pub mod logging;

pub use logging::{init_default_tracing, init_json_tracing};
