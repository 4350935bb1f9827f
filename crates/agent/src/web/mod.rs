use axum::{Router, middleware as axum_middleware};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::agent_modules::config::AgentConfig;
use crate::agent_modules::metrics::{
    DiskIoSampler, DiskPlatform, DiskSampler, DiskStatsSource, LoadSampler, LoadSource,
    ProcDiskStats, SystemDiskPlatform, SystemLoadSource,
};
use crate::web::{middleware::auth, routes::*};

pub mod error;
pub mod middleware;
pub mod routes;

pub use error::AppError;

/// Which of the two server flavours to run.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Load average only, no authentication, port 3000.
    Public,
    /// Load average and disk statistics behind Basic auth, port 10052.
    Secured,
}

impl Variant {
    pub fn listen_address(self) -> SocketAddr {
        let port = match self {
            Variant::Public => 3000,
            Variant::Secured => 10052,
        };
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
    }
}

pub struct AppState {
    pub config: Arc<AgentConfig>,
    pub load_sampler: LoadSampler,
    pub disk_sampler: DiskSampler,
    pub disk_io_sampler: DiskIoSampler,
}

impl AppState {
    pub fn new(
        config: Arc<AgentConfig>,
        load_source: Arc<dyn LoadSource>,
        disk_platform: Arc<dyn DiskPlatform>,
        disk_stats: Arc<dyn DiskStatsSource>,
    ) -> Self {
        let disk_sampler = DiskSampler::new(disk_platform);
        Self {
            config,
            load_sampler: LoadSampler::new(load_source),
            disk_io_sampler: DiskIoSampler::new(disk_sampler.clone(), disk_stats),
            disk_sampler,
        }
    }

    /// State backed by the running host.
    pub fn from_system(config: Arc<AgentConfig>) -> Self {
        Self::new(
            config,
            Arc::new(SystemLoadSource),
            Arc::new(SystemDiskPlatform::default()),
            Arc::new(ProcDiskStats::default()),
        )
    }
}

pub fn create_axum_router(variant: Variant, app_state: Arc<AppState>) -> Router {
    let routes = match variant {
        Variant::Public => load_router(),
        Variant::Secured => load_router().merge(disk_router()).route_layer(
            axum_middleware::from_fn_with_state(app_state.clone(), auth::basic_auth),
        ),
    };

    routes
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(app_state)
}
