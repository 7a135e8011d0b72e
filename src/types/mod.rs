//! Core type definitions shared by the pipeline stages.

mod domain;
mod port;
mod record;
mod run_id;

pub use domain::{parse_domain_list, Domain};
pub use port::{PortError, PortRange, PortSpec, MAX_PORT, MIN_PORT};
pub use record::{HttpProbeResult, ScanRecord, NOT_AVAILABLE};
pub use run_id::RunId;
