//! Audit trail type definitions

use actix_web::http::header;
use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    TestConnection, // Connectivity probe against a stored connection
    Submit,         // Survey response submission
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::TestConnection => "test_connection",
            Self::Submit => "submit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "test_connection" => Some(Self::TestConnection),
            "submit" => Some(Self::Submit),
            _ => None,
        }
    }
}

/// Request metadata attached to audit rows.
///
/// Both fields are optional and independently switchable in configuration.
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditContext {
    /// Capture context from an HTTP request, honoring the audit config.
    pub fn from_request(req: &HttpRequest) -> Self {
        let conf = crate::app_config::audit();

        let ip_address = if conf.record_ip {
            extract_client_ip(req)
        } else {
            None
        };

        let user_agent = if conf.record_user_agent {
            req.headers()
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        } else {
            None
        };

        Self {
            ip_address,
            user_agent,
        }
    }
}

/// Best-effort client address.
///
/// Checks X-Forwarded-For (first hop), then X-Real-IP, then the peer socket.
/// Header values that do not parse as an IP are ignored.
pub fn extract_client_ip(req: &HttpRequest) -> Option<String> {
    if let Some(xff) = req.headers().get("x-forwarded-for") {
        if let Ok(value) = xff.to_str() {
            if let Some(first) = value.split(',').next() {
                let trimmed = first.trim();
                if trimmed.parse::<IpAddr>().is_ok() {
                    return Some(trimmed.to_owned());
                }
            }
        }
    }

    if let Some(xri) = req.headers().get("x-real-ip") {
        if let Ok(value) = xri.to_str() {
            let trimmed = value.trim();
            if trimmed.parse::<IpAddr>().is_ok() {
                return Some(trimmed.to_owned());
            }
        }
    }

    req.peer_addr().map(|addr| addr.ip().to_string())
}
