//! Caller identification and the allow-list gate for destructive operations.

use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::server::AppState;

/// Header consulted for the original client address behind a proxy.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Who is making a request, as far as the transport can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallerIdentity {
    /// Canonical address (IPv4-mapped IPv6 collapsed to IPv4).
    pub addr: IpAddr,
}

impl CallerIdentity {
    /// Wraps an address, canonicalising it.
    #[must_use]
    pub const fn new(addr: IpAddr) -> Self {
        Self {
            addr: addr.to_canonical(),
        }
    }

    /// Derives the caller from request headers and the socket peer.
    ///
    /// With `trust_forwarded_for`, the first parseable `X-Forwarded-For`
    /// entry wins. Otherwise, or when the header is absent, the peer address
    /// is used. With neither, the caller is the unspecified address, which no
    /// allow-list contains.
    #[must_use]
    pub fn from_parts(
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
        trust_forwarded_for: bool,
    ) -> Self {
        let forwarded = trust_forwarded_for
            .then(|| forwarded_addr(headers))
            .flatten();
        let addr = forwarded
            .or_else(|| peer.map(|p| p.ip()))
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        Self::new(addr)
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.addr.fmt(f)
    }
}

fn forwarded_addr(headers: &HeaderMap) -> Option<IpAddr> {
    let value = headers.get(FORWARDED_FOR)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    first
        .parse::<IpAddr>()
        .ok()
        .or_else(|| first.parse::<SocketAddr>().ok().map(|s| s.ip()))
}

/// Decides whether a caller may perform gated operations.
pub trait Authorizer: Send + Sync {
    /// Returns true if `caller` is allowed.
    fn is_allowed(&self, caller: &CallerIdentity) -> bool;
}

/// Fixed set of allowed addresses.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    addrs: HashSet<IpAddr>,
}

impl AllowList {
    /// Builds an allow-list; entries are canonicalised.
    pub fn new(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            addrs: addrs.into_iter().map(|a| a.to_canonical()).collect(),
        }
    }

    /// Only the IPv4 and IPv6 loopback addresses.
    #[must_use]
    pub fn loopback() -> Self {
        Self::new([
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(std::net::Ipv6Addr::LOCALHOST),
        ])
    }
}

impl Authorizer for AllowList {
    fn is_allowed(&self, caller: &CallerIdentity) -> bool {
        self.addrs.contains(&caller.addr)
    }
}

/// Extractor yielding the [`CallerIdentity`] of the current request.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub CallerIdentity);

impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|ConnectInfo(addr)| addr);
        Ok(Self(CallerIdentity::from_parts(
            &parts.headers,
            peer,
            state.trust_forwarded_for,
        )))
    }
}
