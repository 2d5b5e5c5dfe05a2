//! Redis connection constants.
use std::{env::var, sync::LazyLock};

/// The hostname where the Redis session store can be found.
pub static REDIS_HOST: LazyLock<String> = LazyLock::new(|| {
    var("REDIS_HOST").expect("REDIS_HOST not provided in environment variables")
});

/// Connection URL built from `REDIS_HOST`.
pub static REDIS_URL: LazyLock<String> = LazyLock::new(|| format!("redis://{}/", *REDIS_HOST));
