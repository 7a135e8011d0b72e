//! Domain resolution with an ordered fallback.
//!
//! The platform resolver is tried first; if it fails, an `A` query is sent
//! straight to a public recursive resolver. Each strategy runs under its own
//! timeout. Nothing is cached: every call resolves afresh.

use crate::error::{ResolutionError, ResolutionResult};
use crate::types::Domain;
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing::{debug, info, warn};
use trust_dns_resolver::config::{
    LookupIpStrategy, NameServerConfigGroup, ResolverConfig, ResolverOpts,
};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::TokioAsyncResolver;

/// Recursive resolver used by the fallback query.
pub const FALLBACK_NAMESERVER: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), 53);

/// Default per-strategy time budget.
pub const DEFAULT_STRATEGY_TIMEOUT: Duration = Duration::from_secs(5);

/// Anything that can turn a domain into an address.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, domain: &Domain) -> ResolutionResult<IpAddr>;
}

/// One way of looking up a host name.
#[async_trait]
pub trait LookupStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(&self, host: &str) -> ResolutionResult<IpAddr>;
}

/// The operating system's resolver (`getaddrinfo`), first IPv4 answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLookup;

#[async_trait]
impl LookupStrategy for SystemLookup {
    fn name(&self) -> &'static str {
        "system"
    }

    async fn lookup(&self, host: &str) -> ResolutionResult<IpAddr> {
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| ResolutionError::Other {
                domain: host.to_string(),
                reason: e.to_string(),
            })?;

        addrs
            .map(|addr| addr.ip())
            .find(IpAddr::is_ipv4)
            .ok_or_else(|| ResolutionError::Other {
                domain: host.to_string(),
                reason: "no IPv4 address returned".to_string(),
            })
    }
}

/// A direct `A` query to one nameserver.
#[derive(Debug, Clone, Copy)]
pub struct DnsQueryLookup {
    nameserver: SocketAddr,
    timeout: Duration,
}

impl DnsQueryLookup {
    pub fn new(nameserver: SocketAddr, timeout: Duration) -> Self {
        Self { nameserver, timeout }
    }

    fn build_resolver(&self) -> TokioAsyncResolver {
        let servers = NameServerConfigGroup::from_ips_clear(
            &[self.nameserver.ip()],
            self.nameserver.port(),
            true,
        );
        let config = ResolverConfig::from_parts(None, vec![], servers);

        let mut opts = ResolverOpts::default();
        opts.timeout = self.timeout;
        opts.attempts = 1;
        opts.cache_size = 0;
        opts.ip_strategy = LookupIpStrategy::Ipv4Only;

        TokioAsyncResolver::tokio(config, opts)
    }
}

impl Default for DnsQueryLookup {
    fn default() -> Self {
        Self::new(FALLBACK_NAMESERVER, DEFAULT_STRATEGY_TIMEOUT)
    }
}

#[async_trait]
impl LookupStrategy for DnsQueryLookup {
    fn name(&self) -> &'static str {
        "dns-query"
    }

    async fn lookup(&self, host: &str) -> ResolutionResult<IpAddr> {
        let response = self
            .build_resolver()
            .lookup_ip(host)
            .await
            .map_err(|e| classify_resolve_error(host, &e))?;

        response
            .iter()
            .find(IpAddr::is_ipv4)
            .ok_or_else(|| ResolutionError::Other {
                domain: host.to_string(),
                reason: "no A record in answer".to_string(),
            })
    }
}

/// Map a resolver error onto the resolution error taxonomy.
fn classify_resolve_error(host: &str, err: &ResolveError) -> ResolutionError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. }
            if *response_code == ResponseCode::NXDomain =>
        {
            ResolutionError::NxDomain(host.to_string())
        }
        ResolveErrorKind::Timeout => ResolutionError::Timeout(host.to_string()),
        ResolveErrorKind::NoConnections => ResolutionError::NoNameservers(host.to_string()),
        _ => ResolutionError::Other {
            domain: host.to_string(),
            reason: err.to_string(),
        },
    }
}

/// Resolver that walks an ordered list of strategies.
pub struct DomainResolver {
    strategies: Vec<Box<dyn LookupStrategy>>,
    timeout: Duration,
}

impl DomainResolver {
    /// Platform resolver first, then a direct query to 1.1.1.1.
    pub fn new(timeout: Duration) -> Self {
        Self::with_strategies(
            vec![
                Box::new(SystemLookup),
                Box::new(DnsQueryLookup::new(FALLBACK_NAMESERVER, timeout)),
            ],
            timeout,
        )
    }

    pub fn with_strategies(strategies: Vec<Box<dyn LookupStrategy>>, timeout: Duration) -> Self {
        Self {
            strategies,
            timeout,
        }
    }
}

impl Default for DomainResolver {
    fn default() -> Self {
        Self::new(DEFAULT_STRATEGY_TIMEOUT)
    }
}

#[async_trait]
impl Resolve for DomainResolver {
    async fn resolve(&self, domain: &Domain) -> ResolutionResult<IpAddr> {
        if !domain.has_valid_host() {
            return Err(ResolutionError::InvalidDomain(domain.to_string()));
        }

        let host = domain.host();
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }

        let mut last_error = ResolutionError::NoNameservers(host.clone());

        for strategy in &self.strategies {
            match tokio::time::timeout(self.timeout, strategy.lookup(&host)).await {
                Ok(Ok(ip)) => {
                    info!(%host, %ip, strategy = strategy.name(), "resolved");
                    return Ok(ip);
                }
                Ok(Err(e)) => {
                    debug!(%host, strategy = strategy.name(), error = %e, "lookup failed");
                    last_error = e;
                }
                Err(_) => {
                    debug!(%host, strategy = strategy.name(), "lookup timed out");
                    last_error = ResolutionError::Timeout(host.clone());
                }
            }
        }

        warn!(%host, error = %last_error, "all resolution strategies failed");
        Err(last_error)
    }
}
