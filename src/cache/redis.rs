//! Redis cache store.
//!
//! Opens one connection per operation and drops it when the operation ends,
//! so a failed call never leaves a half-used connection behind. Expiry is
//! native (`SET ... EX`).

use std::time::Duration;

use ::redis::{Client, Commands};

use super::CacheStore;
use crate::config::CacheConfig;
use crate::error::GatewayResult;

pub struct RedisStore {
    client: Client,
    timeout: Duration,
}

impl RedisStore {
    /// Parses the URL only; no connection is made here.
    pub fn from_config(config: &CacheConfig) -> GatewayResult<Self> {
        let client = Client::open(config.redis_url())?;
        Ok(RedisStore {
            client,
            timeout: Duration::from_millis(config.timeout_ms.max(1)),
        })
    }

    fn connection(&self) -> GatewayResult<::redis::Connection> {
        let conn = self.client.get_connection_with_timeout(self.timeout)?;
        conn.set_read_timeout(Some(self.timeout))?;
        conn.set_write_timeout(Some(self.timeout))?;
        Ok(conn)
    }
}

impl CacheStore for RedisStore {
    fn get(&self, key: &str) -> GatewayResult<Option<String>> {
        let mut conn = self.connection()?;
        let value: Option<String> = conn.get(key)?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> GatewayResult<()> {
        let mut conn = self.connection()?;
        // EX 0 is rejected by Redis
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)?;
        Ok(())
    }
}
