//! Command line: `hass-monitor [--config <file>] [<domain> <service> [<entity_id>]]`.

use std::fmt;
use std::path::PathBuf;

use clap::Parser;

/// Follow a hub's entity states and optionally call one service.
#[derive(Parser, Debug, Default, Clone, PartialEq, Eq)]
#[command(name = "hass-monitor", about = "Follow a hub's entity states", version)]
pub struct MonitorArgs {
    /// JSON hub config file. Without it the hub is configured from `HASS_*` variables.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Domain of a service to call after connecting, e.g. `light`.
    #[arg(requires = "service")]
    pub domain: Option<String>,

    /// Service within the domain, e.g. `toggle`.
    pub service: Option<String>,

    /// Entity the service call targets.
    pub entity_id: Option<String>,
}

impl MonitorArgs {
    /// The service call requested on the command line, if any.
    pub fn service_call(&self) -> Option<ServiceCall> {
        Some(ServiceCall {
            domain: self.domain.clone()?,
            service: self.service.clone()?,
            entity_id: self.entity_id.clone(),
        })
    }
}

/// One service call to issue after connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    pub entity_id: Option<String>,
}

impl fmt::Display for ServiceCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity_id {
            Some(entity_id) => write!(f, "{}.{}({entity_id})", self.domain, self.service),
            None => write!(f, "{}.{}", self.domain, self.service),
        }
    }
}
