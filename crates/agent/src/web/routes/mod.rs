pub mod metrics_routes;

pub use metrics_routes::*;
