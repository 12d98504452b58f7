//! Classify connection failures into a few actionable buckets. Diagnostic only; nothing retries.

use std::fmt;
use std::io;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectErrorKind {
    /// Wrong user or password.
    Authentication,
    /// Refused, unreachable, timed out, or rejected by a host allow-list.
    NetworkAccess,
    /// Host name did not resolve.
    Dns,
    Other,
}

/// SQLSTATE codes for failed authentication.
const AUTH_CODES: &[&str] = &["28P01", "28000"];

const DNS_MARKERS: &[&str] = &[
    "failed to lookup address",
    "name or service not known",
    "nodename nor servname",
    "no such host",
    "temporary failure in name resolution",
];

impl ConnectErrorKind {
    pub fn classify(err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_) => ConnectErrorKind::NetworkAccess,
            sqlx::Error::Io(io) => Self::classify_io(io),
            sqlx::Error::Database(db) => {
                let message = db.message().to_lowercase();
                if message.contains("pg_hba.conf") {
                    ConnectErrorKind::NetworkAccess
                } else if db.code().is_some_and(|c| AUTH_CODES.iter().any(|a| *a == c)) {
                    ConnectErrorKind::Authentication
                } else {
                    Self::classify_text(&message)
                }
            }
            other => Self::classify_text(&other.to_string()),
        }
    }

    /// Classify `err` and log it with the matching hint.
    pub fn report(err: &sqlx::Error) -> Self {
        let kind = Self::classify(err);
        tracing::error!(error = %err, kind = %kind, hint = kind.hint(), "database connection failed");
        kind
    }

    fn classify_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::TimedOut
            | io::ErrorKind::AddrNotAvailable => ConnectErrorKind::NetworkAccess,
            _ => Self::classify_text(&err.to_string()),
        }
    }

    /// Fallback on the error text, for drivers that only surface a message.
    pub fn classify_text(message: &str) -> Self {
        let message = message.to_lowercase();
        if DNS_MARKERS.iter().any(|m| message.contains(m)) {
            ConnectErrorKind::Dns
        } else if message.contains("password authentication failed") || message.contains("authentication failed") {
            ConnectErrorKind::Authentication
        } else if message.contains("pg_hba.conf")
            || message.contains("connection refused")
            || message.contains("network is unreachable")
            || message.contains("no route to host")
            || message.contains("timed out")
        {
            ConnectErrorKind::NetworkAccess
        } else {
            ConnectErrorKind::Other
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            ConnectErrorKind::Authentication => {
                "Check the user and password in DATABASE_URL. Percent-encode special characters in the password."
            }
            ConnectErrorKind::NetworkAccess => {
                "The server refused or did not answer. Check that it is running and reachable on the given port, \
                 and that this machine's address is allowed (pg_hba.conf or the provider's IP allow-list)."
            }
            ConnectErrorKind::Dns => {
                "The host in DATABASE_URL did not resolve. Check it for typos and check DNS from this machine."
            }
            ConnectErrorKind::Other => "Run with RUST_LOG=storefront=debug for more detail.",
        }
    }
}

impl fmt::Display for ConnectErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectErrorKind::Authentication => "authentication",
            ConnectErrorKind::NetworkAccess => "network access",
            ConnectErrorKind::Dns => "dns",
            ConnectErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_socket_is_network_access() {
        let err = sqlx::Error::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert_eq!(ConnectErrorKind::classify(&err), ConnectErrorKind::NetworkAccess);
    }

    #[test]
    fn report_returns_the_classified_kind() {
        let err = sqlx::Error::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert_eq!(ConnectErrorKind::report(&err), ConnectErrorKind::NetworkAccess);
    }

    #[test]
    fn acquire_timeout_is_network_access() {
        assert_eq!(
            ConnectErrorKind::classify(&sqlx::Error::PoolTimedOut),
            ConnectErrorKind::NetworkAccess
        );
    }

    #[test]
    fn lookup_failure_is_dns() {
        let err = sqlx::Error::Io(io::Error::new(
            io::ErrorKind::Other,
            "failed to lookup address information: Name or service not known",
        ));
        assert_eq!(ConnectErrorKind::classify(&err), ConnectErrorKind::Dns);
    }

    #[test]
    fn text_classification() {
        assert_eq!(
            ConnectErrorKind::classify_text("FATAL: password authentication failed for user \"app\""),
            ConnectErrorKind::Authentication
        );
        assert_eq!(
            ConnectErrorKind::classify_text("no pg_hba.conf entry for host \"10.0.0.7\""),
            ConnectErrorKind::NetworkAccess
        );
        assert_eq!(ConnectErrorKind::classify_text("something odd"), ConnectErrorKind::Other);
    }

    #[test]
    fn every_kind_has_a_hint() {
        for kind in [
            ConnectErrorKind::Authentication,
            ConnectErrorKind::NetworkAccess,
            ConnectErrorKind::Dns,
            ConnectErrorKind::Other,
        ] {
            assert!(!kind.hint().is_empty());
        }
    }
}
