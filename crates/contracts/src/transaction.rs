//! DnsTransaction - the record produced per resolved (or failed) DNS query
//!
//! This is the concrete item type fed into the dispatcher by the resolver side.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a DNS transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Complete,
    SendFail,
    TransportError,
    NoResponse,
    BadResponse,
    BadQuery,
    InternalError,
    Canceled,
}

impl TransactionStatus {
    /// Whether a usable response came back
    pub fn is_success(&self) -> bool {
        matches!(self, TransactionStatus::Complete)
    }
}

/// Upstream transport used for the query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// DNS-over-HTTPS
    #[default]
    Doh,
    /// DNSCrypt
    DnsCrypt,
    /// Plain DNS53 proxy
    DnsProxy,
}

impl QueryType {
    /// Transport label as reported by the resolver ("DoH", "DNSCrypt", "DNS53")
    ///
    /// Unknown labels fall back to DoH.
    pub fn from_transport(label: &str) -> Self {
        match label {
            "DoH" => QueryType::Doh,
            "DNSCrypt" => QueryType::DnsCrypt,
            "DNS53" => QueryType::DnsProxy,
            _ => QueryType::Doh,
        }
    }

    pub fn is_dns_crypt(&self) -> bool {
        matches!(self, QueryType::DnsCrypt)
    }
}

/// A complete DNS transaction, whether it succeeded or failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsTransaction {
    /// Query send time (epoch milliseconds)
    pub query_time: u64,

    /// Queried name
    pub name: String,

    /// Query record type (A = 1, AAAA = 28, ...)
    pub qtype: u16,

    /// Response receive time (epoch milliseconds, 0 until answered)
    #[serde(default)]
    pub response_time: u64,

    /// Outcome
    #[serde(default)]
    pub status: TransactionStatus,

    /// Raw response packet
    #[serde(default)]
    pub response: Bytes,

    /// Wall-clock time of the response
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,

    /// Upstream server that answered
    #[serde(default)]
    pub server_ip: Option<String>,

    /// Blocklist(s) that matched the name, if any
    #[serde(default)]
    pub blocklist: Option<String>,

    /// Relay used for anonymized transports
    #[serde(default)]
    pub relay_ip: Option<String>,

    /// Upstream transport
    #[serde(default)]
    pub query_type: QueryType,
}

impl DnsTransaction {
    /// Create a transaction for an outgoing query
    pub fn new(name: impl Into<String>, qtype: u16, query_time: u64) -> Self {
        Self {
            query_time,
            name: name.into(),
            qtype,
            response_time: 0,
            status: TransactionStatus::Complete,
            response: Bytes::new(),
            responded_at: None,
            server_ip: None,
            blocklist: None,
            relay_ip: None,
            query_type: QueryType::Doh,
        }
    }

    /// Record a successful response
    pub fn complete(mut self, response: Bytes, response_time: u64) -> Self {
        self.response = response;
        self.response_time = response_time;
        self.status = TransactionStatus::Complete;
        self.responded_at = DateTime::from_timestamp_millis(response_time as i64);
        self
    }

    /// Record a failed transaction; the response stays empty
    pub fn fail(mut self, status: TransactionStatus, response_time: u64) -> Self {
        self.status = status;
        self.response_time = response_time;
        self.responded_at = DateTime::from_timestamp_millis(response_time as i64);
        self
    }

    /// Round-trip time in milliseconds (None until answered)
    pub fn latency_ms(&self) -> Option<u64> {
        if self.response_time == 0 {
            None
        } else {
            Some(self.response_time.saturating_sub(self.query_time))
        }
    }

    /// Whether a blocklist matched this name
    pub fn is_blocked(&self) -> bool {
        self.blocklist.as_deref().is_some_and(|b| !b.is_empty())
    }
}
