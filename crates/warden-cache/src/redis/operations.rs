//! Redis-backed shared store.
//!
//! Single-key commands go straight to Redis. Multi-key operations use
//! `MULTI/EXEC` pipelines or server-side Lua so other instances never
//! observe a half-applied change.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Script};
use tracing::debug;

use warden_core::error::{AppError, ErrorKind};
use warden_core::result::AppResult;
use warden_core::traits::store::{SharedStore, StoreOp};

use super::client::RedisClient;

/// Increments a counter and sets its expiry when it is new or has none.
const INCR_WITH_EXPIRY: &str = r"
local c = redis.call('INCR', KEYS[1])
if c == 1 or redis.call('PTTL', KEYS[1]) == -1 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return c
";

/// Reads and deletes KEYS[1], then applies follow-up writes encoded in ARGV as
/// groups of (kind, key, value, ttl_ms) with `$value` bound to the read value.
const CONSUME: &str = r"
local v = redis.call('GET', KEYS[1])
if not v then
  return false
end
redis.call('DEL', KEYS[1])
local bound = string.gsub(v, '%%', '%%%%')
for i = 1, #ARGV, 4 do
  local key = string.gsub(ARGV[i + 1], '%$value', bound)
  if ARGV[i] == 'S' then
    local val = string.gsub(ARGV[i + 2], '%$value', bound)
    redis.call('SET', key, val, 'PX', ARGV[i + 3])
  else
    redis.call('DEL', key)
  end
end
return v
";

const SCAN_BATCH: usize = 100;

/// Redis-backed [`SharedStore`].
#[derive(Debug, Clone)]
pub struct RedisStore {
    client: RedisClient,
}

impl RedisStore {
    /// Create a new Redis store over a connected client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Store, format!("Redis error: {e}"), e)
    }

    /// Redis rejects a zero expiry, so sub-millisecond TTLs round up.
    fn ttl_millis(ttl: Duration) -> u64 {
        u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
    }

    /// Escape glob metacharacters so a literal prefix can be used with `MATCH`.
    fn glob_escape(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for c in raw.chars() {
            if matches!(c, '*' | '?' | '[' | ']' | '\\') {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: Option<String> = conn.get(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = redis::cmd("SET")
            .arg(&full_key)
            .arg(value)
            .arg("PX")
            .arg(Self::ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let removed: u64 = conn.del(&full_key).await.map_err(Self::map_err)?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: bool = conn.exists(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let millis: i64 = redis::cmd("PTTL")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(match millis {
            -2 => None,
            -1 => Some(Duration::MAX),
            ms => Some(Duration::from_millis(ms.max(0) as u64)),
        })
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> AppResult<i64> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let count: i64 = Script::new(INCR_WITH_EXPIRY)
            .key(&full_key)
            .arg(Self::ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(count)
    }

    async fn transact(&self, ops: &[StoreOp]) -> AppResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in ops {
            match op {
                StoreOp::Set { key, value, ttl } => {
                    pipe.cmd("SET")
                        .arg(self.client.prefixed_key(key))
                        .arg(value)
                        .arg("PX")
                        .arg(Self::ttl_millis(*ttl))
                        .ignore();
                }
                StoreOp::Delete { key } => {
                    pipe.cmd("DEL").arg(self.client.prefixed_key(key)).ignore();
                }
            }
        }
        let mut conn = self.client.conn_mut();
        let _: () = pipe.query_async(&mut conn).await.map_err(Self::map_err)?;
        debug!(ops = ops.len(), "Applied Redis transaction");
        Ok(())
    }

    async fn consume(&self, key: &str, then: &[StoreOp]) -> AppResult<Option<String>> {
        let script = Script::new(CONSUME);
        let mut invocation = script.key(self.client.prefixed_key(key));
        for op in then {
            match op {
                StoreOp::Set { key, value, ttl } => {
                    invocation
                        .arg("S")
                        .arg(self.client.prefixed_key(key))
                        .arg(value)
                        .arg(Self::ttl_millis(*ttl));
                }
                StoreOp::Delete { key } => {
                    invocation
                        .arg("D")
                        .arg(self.client.prefixed_key(key))
                        .arg("")
                        .arg(0);
                }
            }
        }
        let mut conn = self.client.conn_mut();
        let consumed: Option<String> = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(consumed)
    }

    async fn scan_prefix(&self, prefix: &str) -> AppResult<Vec<String>> {
        let pattern = format!("{}*", Self::glob_escape(&self.client.prefixed_key(prefix)));
        let mut conn = self.client.conn_mut();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(Self::map_err)?;
            keys.extend(
                batch
                    .iter()
                    .map(|k| self.client.unprefixed_key(k).to_string()),
            );
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
