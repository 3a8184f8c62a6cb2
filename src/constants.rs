pub mod defaults {
    pub const BATCH_SIZE: usize = 100;
    pub const DATABASE_COUNT: u32 = 16;
    pub const SCAN_COUNT: usize = 1000;
    pub const SERVER: &str = "redis://127.0.0.1:6379";
    pub const SNAPSHOT_FILE: &str = "dump.json";
}

/// Type names as reported by `TYPE` and written to the snapshot.
pub mod type_tag {
    pub const STRING: &str = "string";
    pub const LIST: &str = "list";
    pub const SET: &str = "set";
    pub const ZSET: &str = "zset";
    pub const HASH: &str = "hash";
    pub const NONE: &str = "none";
}

pub mod field {
    pub const TYPE: &str = "Type";
    pub const VALUE: &str = "Value";
    pub const TTL: &str = "TTL";
    pub const MEMBER: &str = "Member";
    pub const SCORE: &str = "Score";
}

pub mod ttl {
    /// `PTTL` reply for a key without expiry.
    pub const NO_EXPIRY: i64 = -1;
    /// `PTTL` reply for a key that does not exist.
    pub const MISSING: i64 = -2;
}

pub mod score {
    pub const POS_INF: &str = "inf";
    pub const NEG_INF: &str = "-inf";
}

/// Reads type, remaining TTL and value of every key in `KEYS` in one call.
///
/// Each reply element is `{key, type, pttl, value}`; `value` is nil for
/// types outside the five supported ones.
pub const BATCH_READ_SCRIPT: &str = r#"
local out = {}
for i, key in ipairs(KEYS) do
    local kind = redis.call('TYPE', key)['ok']
    local ttl = redis.call('PTTL', key)
    local value = false
    if kind == 'string' then
        value = redis.call('GET', key)
    elseif kind == 'list' then
        value = redis.call('LRANGE', key, 0, -1)
    elseif kind == 'set' then
        value = redis.call('SMEMBERS', key)
    elseif kind == 'zset' then
        value = redis.call('ZRANGE', key, 0, -1, 'WITHSCORES')
    elseif kind == 'hash' then
        value = redis.call('HGETALL', key)
    end
    out[i] = {key, kind, ttl, value}
end
return out
"#;
