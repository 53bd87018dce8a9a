//! Build identity reported by `--version`, log context and the `build_info` metric.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_COMMIT_HASH: &str = env!("DUENDE_WORKER_GIT_COMMIT_HASH");
pub const VERSION_WITH_COMMIT: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "+",
    env!("DUENDE_WORKER_GIT_COMMIT_HASH")
);

const SHORT_HASH_LEN: usize = 12;

/// Abbreviated commit hash; `"unknown"` passes through untouched.
pub fn short_commit_hash() -> &'static str {
    match GIT_COMMIT_HASH.get(..SHORT_HASH_LEN) {
        Some(short) if GIT_COMMIT_HASH != "unknown" => short,
        _ => GIT_COMMIT_HASH,
    }
}

#[cfg(test)]
mod tests {
    use super::{short_commit_hash, GIT_COMMIT_HASH, VERSION, VERSION_WITH_COMMIT};

    #[test]
    fn version_with_commit_is_semver_plus_hash() {
        assert!(VERSION_WITH_COMMIT.starts_with(VERSION));
        assert!(VERSION_WITH_COMMIT.ends_with(GIT_COMMIT_HASH));
        assert!(VERSION_WITH_COMMIT.contains('+'));
    }

    #[test]
    fn short_hash_is_a_prefix_of_the_full_hash() {
        assert!(!short_commit_hash().is_empty());
        assert!(GIT_COMMIT_HASH.starts_with(short_commit_hash()));
        assert!(short_commit_hash().len() <= 12);
    }
}
