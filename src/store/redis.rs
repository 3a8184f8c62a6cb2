use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{RedisError, Script, Value};

use super::{RawEntry, RawValue, Store, WriteOp};
use crate::constants::{defaults, BATCH_READ_SCRIPT};
use crate::types::{StoreError, StoreResult, ValueType};

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> StoreError {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            StoreError::Transport(err.to_string())
        } else {
            StoreError::Response(err.to_string())
        }
    }
}

/// A store reached over a single multiplexed connection.
pub struct RedisStore {
    conn: MultiplexedConnection,
    script: Script,
}

impl RedisStore {
    pub async fn connect(url: &str) -> StoreResult<RedisStore> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(RedisStore::new(conn))
    }

    pub fn new(conn: MultiplexedConnection) -> RedisStore {
        RedisStore {
            conn,
            script: Script::new(BATCH_READ_SCRIPT),
        }
    }
}

fn raw_value(value: Value) -> StoreResult<RawValue> {
    match value {
        Value::Nil => Ok(RawValue::Nil),
        Value::BulkString(bytes) => String::from_utf8(bytes)
            .map(RawValue::Text)
            .map_err(|e| StoreError::Response(format!("value is not UTF-8: {}", e))),
        Value::SimpleString(text) => Ok(RawValue::Text(text)),
        Value::Int(n) => Ok(RawValue::Text(n.to_string())),
        array @ Value::Array(_) => Ok(RawValue::Array(redis::from_owned_redis_value(array)?)),
        other => Err(StoreError::Response(format!(
            "unexpected reply shape: {:?}",
            other
        ))),
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn select(&mut self, db: u32) -> StoreResult<()> {
        redis::cmd("SELECT")
            .arg(db)
            .query_async::<()>(&mut self.conn)
            .await?;
        Ok(())
    }

    async fn database_count(&mut self) -> StoreResult<u32> {
        let reply: Vec<String> = redis::cmd("CONFIG")
            .arg("GET")
            .arg("databases")
            .query_async(&mut self.conn)
            .await?;
        Ok(reply
            .get(1)
            .and_then(|count| count.parse().ok())
            .unwrap_or(0))
    }

    async fn key_count(&mut self) -> StoreResult<u64> {
        Ok(redis::cmd("DBSIZE").query_async(&mut self.conn).await?)
    }

    async fn scan_keys(&mut self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("COUNT")
                .arg(defaults::SCAN_COUNT)
                .query_async(&mut self.conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }

    async fn flush(&mut self) -> StoreResult<()> {
        redis::cmd("FLUSHDB")
            .query_async::<()>(&mut self.conn)
            .await?;
        Ok(())
    }

    async fn fetch_batch(&mut self, keys: &[String]) -> StoreResult<Vec<RawEntry>> {
        let mut invocation = self.script.prepare_invoke();
        for key in keys {
            invocation.key(key);
        }
        let reply: Vec<(String, String, i64, Value)> =
            invocation.invoke_async(&mut self.conn).await?;

        reply
            .into_iter()
            .map(|(key, kind, pttl, value)| {
                Ok(RawEntry {
                    key,
                    kind,
                    pttl,
                    value: raw_value(value)?,
                })
            })
            .collect()
    }

    async fn key_type(&mut self, key: &str) -> StoreResult<String> {
        Ok(redis::cmd("TYPE")
            .arg(key)
            .query_async(&mut self.conn)
            .await?)
    }

    async fn pttl(&mut self, key: &str) -> StoreResult<i64> {
        Ok(redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut self.conn)
            .await?)
    }

    async fn read_value(&mut self, key: &str, value_type: ValueType) -> StoreResult<RawValue> {
        let mut cmd = match value_type {
            ValueType::String => redis::cmd("GET"),
            ValueType::List => redis::cmd("LRANGE"),
            ValueType::Set => redis::cmd("SMEMBERS"),
            ValueType::SortedSet => redis::cmd("ZRANGE"),
            ValueType::Hash => redis::cmd("HGETALL"),
        };
        cmd.arg(key);
        match value_type {
            ValueType::List => {
                cmd.arg(0).arg(-1);
            }
            ValueType::SortedSet => {
                cmd.arg(0).arg(-1).arg("WITHSCORES");
            }
            _ => {}
        }
        let reply: Value = cmd.query_async(&mut self.conn).await?;
        raw_value(reply)
    }

    async fn apply(&mut self, writes: &[WriteOp]) -> StoreResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for op in writes {
            match op {
                WriteOp::Set { key, value, ttl } => {
                    pipe.cmd("SET").arg(key).arg(value);
                    if let Some(ttl) = ttl {
                        pipe.arg("PX").arg(*ttl);
                    }
                }
                WriteOp::Delete { key } => {
                    pipe.cmd("DEL").arg(key);
                }
                WriteOp::RPush { key, values } => {
                    pipe.cmd("RPUSH").arg(key).arg(values);
                }
                WriteOp::SAdd { key, members } => {
                    pipe.cmd("SADD").arg(key).arg(members);
                }
                WriteOp::ZAdd { key, members } => {
                    pipe.cmd("ZADD").arg(key);
                    for (score, member) in members {
                        pipe.arg(*score).arg(member);
                    }
                }
                WriteOp::HSet { key, fields } => {
                    pipe.cmd("HSET").arg(key);
                    for (field, value) in fields {
                        pipe.arg(field).arg(value);
                    }
                }
                WriteOp::PExpire { key, ttl } => {
                    pipe.cmd("PEXPIRE").arg(key).arg(*ttl);
                }
            }
            pipe.ignore();
        }

        pipe.query_async::<()>(&mut self.conn).await?;
        Ok(())
    }
}
