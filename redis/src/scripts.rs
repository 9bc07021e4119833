//! Server-side Lua scripts.
//!
//! Each script is the sole linearization point for the multi-key step it
//! implements. `Script` sends `EVALSHA` and falls back to `EVAL` on a cache miss.

use redis::Script;
use std::sync::LazyLock;

/// Insert-if-absent, set the activity heartbeat, return the rank.
///
/// KEYS: queue, activity. ARGV: user id, score, activity TTL (seconds).
pub static ENTER: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
redis.call('ZADD', KEYS[1], 'NX', ARGV[2], ARGV[1])
redis.call('SET', KEYS[2], '1', 'EX', ARGV[3])
return redis.call('ZRANK', KEYS[1], ARGV[1])
",
    )
});

/// The admission decision.
///
/// KEYS: token, counter, queue. ARGV: user id, max concurrent, token TTL (seconds).
/// Returns `1` granted, `0` not yet, `-1` not in queue.
pub static ACQUIRE_TOKEN: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
local tokenKey = KEYS[1]
local countKey = KEYS[2]
local queueKey = KEYS[3]
local userId = ARGV[1]
local maxConcurrent = tonumber(ARGV[2])
local ttl = tonumber(ARGV[3])

if redis.call('EXISTS', tokenKey) == 1 then
    return 1
end

local rank = redis.call('ZRANK', queueKey, userId)
if rank == false then
    return -1
end

local current = tonumber(redis.call('GET', countKey) or 0)
local remaining = maxConcurrent - current

if rank < remaining then
    redis.call('SET', tokenKey, 1, 'EX', ttl)
    redis.call('INCR', countKey)
    redis.call('ZREM', queueKey, userId)
    return 1
end

return 0
",
    )
});

/// Delete the token and decrement the counter, only if the token existed.
///
/// KEYS: token, counter. Returns `1` if a token was released.
pub static RELEASE_TOKEN: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
if redis.call('DEL', KEYS[1]) == 1 then
    redis.call('DECR', KEYS[2])
    return 1
end
return 0
",
    )
});

/// Delete a lock only if it is still held by the caller's token.
///
/// KEYS: lock. ARGV: owner token. Returns `1` if deleted.
pub static UNLOCK: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
",
    )
});
