//! Per-IP request limiting for the admin API.

use std::net::IpAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use masque_relay::Throttle;

pub type IpLimiter = Throttle<IpAddr>;

pub async fn rate_limit_middleware(
    State(limiter): State<IpLimiter>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let ip = extract_client_ip(&req);

    if let Some(ip) = ip {
        if !limiter.check(ip).await {
            warn!(ip = %ip, "Rate limit exceeded");
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
    }

    Ok(next.run(req).await)
}

/// Try ConnectInfo first, then X-Forwarded-For, then X-Real-IP.
fn extract_client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<std::net::SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());

    if let Some(first) = header("x-forwarded-for").and_then(|v| v.split(',').next()) {
        if let Ok(ip) = first.trim().parse::<IpAddr>() {
            return Some(ip);
        }
    }

    header("x-real-ip").and_then(|v| v.trim().parse::<IpAddr>().ok())
}
