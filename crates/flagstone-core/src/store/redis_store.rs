//! Networked store speaking the redis protocol.
//!
//! Connection refusal, DNS failure, timeouts and protocol errors all map to
//! [`StoreUnavailable`]; the pool discards the connection afterwards.

use super::{Connection, Connector};
use crate::error::StoreUnavailable;
use std::time::Duration;

/// Keys fetched per SCAN round trip.
const SCAN_BATCH: usize = 100;

/// Opens redis connections with bounded connect/read/write timeouts.
#[derive(Clone)]
pub struct RedisConnector {
    client: redis::Client,
    timeout: Duration,
}

impl RedisConnector {
    /// Validate `url` (`redis://host:port/db`) without connecting.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, StoreUnavailable> {
        let client = redis::Client::open(url).map_err(classify)?;
        Ok(Self { client, timeout })
    }
}

impl Connector for RedisConnector {
    type Conn = RedisConnection;

    fn connect(&self) -> Result<RedisConnection, StoreUnavailable> {
        let conn = self
            .client
            .get_connection_with_timeout(self.timeout)
            .map_err(classify)?;
        conn.set_read_timeout(Some(self.timeout)).map_err(classify)?;
        conn.set_write_timeout(Some(self.timeout)).map_err(classify)?;
        Ok(RedisConnection { conn })
    }
}

pub struct RedisConnection {
    conn: redis::Connection,
}

impl Connection for RedisConnection {
    fn get(&mut self, key: &str) -> Result<Option<String>, StoreUnavailable> {
        redis::cmd("GET")
            .arg(key)
            .query(&mut self.conn)
            .map_err(classify)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<bool, StoreUnavailable> {
        let reply: String = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query(&mut self.conn)
            .map_err(classify)?;
        Ok(reply == "OK")
    }

    fn scan_prefix(&mut self, prefix: &str) -> Result<Vec<String>, StoreUnavailable> {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query(&mut self.conn)
                .map_err(classify)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

fn classify(err: redis::RedisError) -> StoreUnavailable {
    if err.is_connection_refusal() {
        StoreUnavailable::ConnectionRefused(err.to_string())
    } else {
        StoreUnavailable::backend(err)
    }
}

/// Escape redis glob metacharacters so a namespace matches literally.
fn escape_glob(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
