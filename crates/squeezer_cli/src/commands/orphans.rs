//! Orphans command implementation.

use squeezer_core::workflow::cleanup_orphans;
use squeezer_core::{Engine, SqueezerResult};

/// Runs the orphans command.
pub fn run(engine: &Engine) -> SqueezerResult<()> {
    cleanup_orphans(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use squeezer_testkit::prelude::*;

    #[test]
    fn reports_summary() {
        let pulp = fake_pulp();
        pulp.seed_artifact(b"orphaned").unwrap();
        let engine = engine_for(&pulp);

        run(&engine).unwrap();

        assert_eq!(
            engine.result("summary"),
            Some(json!({"artifacts": 1, "content": 0}))
        );
    }
}
