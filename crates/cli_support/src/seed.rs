use std::time::{SystemTime, UNIX_EPOCH};

pub const SEED_ENV: &str = "BEARCART_SEED";

/// Resolve seed from CLI, then env (`BEARCART_SEED`), else time.
pub fn resolve_seed(cli_seed: Option<u64>) -> u64 {
    if let Some(s) = cli_seed {
        return s;
    }
    if let Ok(env_seed) = std::env::var(SEED_ENV) {
        if let Ok(parsed) = env_seed.trim().parse::<u64>() {
            return parsed;
        }
        tracing::warn!("ignoring unparsable {SEED_ENV}={env_seed:?}");
    }
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_seed_wins() {
        assert_eq!(resolve_seed(Some(7)), 7);
    }
}
