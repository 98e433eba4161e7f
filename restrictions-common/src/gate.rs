use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tracing::instrument;

use crate::error::StoreError;
use crate::settings::{SettingKey, Settings};

pub const DEFAULT_NETWORK: Ipv4Addr = Ipv4Addr::new(192, 168, 122, 0);
pub const DEFAULT_NETMASK: Ipv4Addr = Ipv4Addr::new(255, 255, 254, 0);
pub const DEFAULT_TRUSTED_PROXIES: [IpAddr; 2] = [
    IpAddr::V4(Ipv4Addr::LOCALHOST),
    IpAddr::V6(Ipv6Addr::LOCALHOST),
];

/// What the host knows about the request being served.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub is_admin: bool,
    pub remote_addr: Option<IpAddr>,
    /// Raw `X-Forwarded-For` header value.
    pub forwarded_for: Option<String>,
    pub logged_in: bool,
}

/// Predicate deciding whether restrictions apply to the visitor behind a
/// request. Only consulted while the filter setting is enabled.
pub trait ClientFilter: Send + Sync {
    fn applies_to(&self, request: &RequestContext) -> bool;
}

/// Restricts visitors coming from outside a fixed subnet.
#[derive(Debug, Clone)]
pub struct SubnetFilter {
    network: IpAddr,
    netmask: IpAddr,
    trusted_proxies: Vec<IpAddr>,
}

impl Default for SubnetFilter {
    fn default() -> Self {
        SubnetFilter::new(
            IpAddr::V4(DEFAULT_NETWORK),
            IpAddr::V4(DEFAULT_NETMASK),
            DEFAULT_TRUSTED_PROXIES.to_vec(),
        )
    }
}

impl SubnetFilter {
    pub fn new(network: IpAddr, netmask: IpAddr, trusted_proxies: Vec<IpAddr>) -> Self {
        SubnetFilter {
            network: canonical(network),
            netmask: canonical(netmask),
            trusted_proxies: trusted_proxies.into_iter().map(canonical).collect(),
        }
    }

    /// The address the visitor connected from. A trusted proxy's
    /// `X-Forwarded-For` header takes precedence over the peer address.
    pub fn client_ip(&self, request: &RequestContext) -> Option<IpAddr> {
        let remote = canonical(request.remote_addr?);

        if !self.trusted_proxies.contains(&remote) {
            return Some(remote);
        }

        match request
            .forwarded_for
            .as_deref()
            .and_then(|header| header.split(',').next())
            .map(str::trim)
            .filter(|first| !first.is_empty())
        {
            Some(forwarded) => match forwarded.parse::<IpAddr>() {
                Ok(ip) => Some(canonical(ip)),
                Err(_) => {
                    tracing::warn!(forwarded, "unparseable forwarded address");
                    None
                }
            },
            None => Some(remote),
        }
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        in_subnet(canonical(ip), self.network, self.netmask)
    }

    pub fn is_inside(&self, request: &RequestContext) -> bool {
        self.client_ip(request)
            .map(|ip| self.contains(ip))
            .unwrap_or(false)
    }
}

impl ClientFilter for SubnetFilter {
    fn applies_to(&self, request: &RequestContext) -> bool {
        !self.is_inside(request)
    }
}

/// Restricts anonymous visitors only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginFilter;

impl ClientFilter for LoginFilter {
    fn applies_to(&self, request: &RequestContext) -> bool {
        !request.logged_in
    }
}

pub struct ApplicabilityGate {
    settings: Settings,
    filter: Box<dyn ClientFilter>,
}

impl ApplicabilityGate {
    pub fn new(settings: Settings, filter: Box<dyn ClientFilter>) -> Self {
        ApplicabilityGate { settings, filter }
    }

    /// Restrictions never run in the admin context. Elsewhere they run unless
    /// the filter is enabled and rejects the visitor.
    #[instrument(skip_all, fields(admin = request.is_admin))]
    pub fn is_applicable(&self, request: &RequestContext) -> Result<bool, StoreError> {
        if request.is_admin {
            return Ok(false);
        }

        if !self.settings.get_bool(SettingKey::FilterEnabled)? {
            return Ok(true);
        }

        let applies = self.filter.applies_to(request);
        tracing::debug!(applies, "client filter evaluated");
        Ok(applies)
    }
}

fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}

fn in_subnet(ip: IpAddr, network: IpAddr, netmask: IpAddr) -> bool {
    match (ip, network, netmask) {
        (IpAddr::V4(ip), IpAddr::V4(network), IpAddr::V4(mask)) => {
            let mask = u32::from(mask);
            u32::from(ip) & mask == u32::from(network) & mask
        }
        (IpAddr::V6(ip), IpAddr::V6(network), IpAddr::V6(mask)) => {
            let mask = u128::from(mask);
            u128::from(ip) & mask == u128::from(network) & mask
        }
        _ => false,
    }
}
