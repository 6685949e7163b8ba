//! Fixed-window rate limiting per client IP

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, SecondsFormat, Utc};

use super::AppState;
use super::error::ApiError;
use crate::config::RateLimitConfig;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    pub fn headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        let reset = self.reset_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        [
            ("x-ratelimit-limit", self.limit.to_string()),
            ("x-ratelimit-remaining", self.remaining.to_string()),
            ("x-ratelimit-reset", reset),
        ]
        .into_iter()
        .filter_map(|(name, value)| Some((HeaderName::from_static(name), HeaderValue::from_str(&value).ok()?)))
        .collect()
    }
}

pub struct RateLimiter {
    enabled: bool,
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_requests: config.max_requests,
            window: Duration::seconds(config.window_secs as i64),
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn check(&self, client: &str) -> RateLimitDecision {
        self.check_at(client, Utc::now())
    }

    /// Count one request from `client` at `now`
    pub fn check_at(&self, client: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.retain(|_, window| window.reset_at >= now);

        let window = clients.entry(client.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });

        if window.count >= self.max_requests {
            return RateLimitDecision {
                allowed: false,
                limit: self.max_requests,
                remaining: 0,
                reset_at: window.reset_at,
            };
        }

        window.count += 1;
        RateLimitDecision {
            allowed: true,
            limit: self.max_requests,
            remaining: self.max_requests - window.count,
            reset_at: window.reset_at,
        }
    }
}

/// First `x-forwarded-for` entry, then `x-real-ip`, then the peer address
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    if let Some(forwarded) = header("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next().map(str::trim).filter(|ip| !ip.is_empty()) {
            return first.to_string();
        }
    }
    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }
    peer.map(|ip| ip.to_string()).unwrap_or_else(|| "localhost".to_string())
}

/// Middleware for the image generation routes
pub async fn limit_generation(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    if !state.rate_limiter.enabled() {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let client = client_ip(request.headers(), peer);
    let decision = state.rate_limiter.check(&client);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, "rate limit exceeded");
        ApiError::rate_limited().into_response()
    };
    for (name, value) in decision.headers() {
        response.headers_mut().insert(name, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            max_requests,
            window_secs: 60,
        })
    }

    #[test]
    fn test_window_exhausts_then_resets() {
        let limiter = limiter(2);
        let t0 = Utc::now();

        let first = limiter.check_at("1.2.3.4", t0);
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        assert_eq!(first.reset_at, t0 + Duration::seconds(60));

        assert!(limiter.check_at("1.2.3.4", t0).allowed);
        let blocked = limiter.check_at("1.2.3.4", t0 + Duration::seconds(30));
        assert!(!blocked.allowed);
        assert_eq!(blocked.remaining, 0);

        // Other clients have their own window
        assert!(limiter.check_at("5.6.7.8", t0).allowed);

        let later = limiter.check_at("1.2.3.4", t0 + Duration::seconds(61));
        assert!(later.allowed);
        assert_eq!(later.remaining, 1);
    }

    #[test]
    fn test_expired_entries_are_purged() {
        let limiter = limiter(1);
        let t0 = Utc::now();
        limiter.check_at("a", t0);
        limiter.check_at("b", t0);
        limiter.check_at("c", t0 + Duration::seconds(120));
        assert_eq!(limiter.clients.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_client_ip_precedence() {
        let mut headers = HeaderMap::new();
        let peer: IpAddr = "10.0.0.9".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)), "10.0.0.9");
        assert_eq!(client_ip(&headers, None), "localhost");

        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(client_ip(&headers, Some(peer)), "9.9.9.9");

        headers.insert("x-forwarded-for", HeaderValue::from_static(" 1.1.1.1 , 2.2.2.2"));
        assert_eq!(client_ip(&headers, Some(peer)), "1.1.1.1");
    }

    #[test]
    fn test_headers() {
        let decision = limiter(10).check_at("a", Utc::now());
        let headers = decision.headers();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[0].1, "10");
        assert_eq!(headers[1].1, "9");
        assert!(headers[2].1.to_str().unwrap().ends_with('Z'));
    }
}
