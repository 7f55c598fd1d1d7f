//! LR(0) automaton construction with bounded lookahead conflict resolution.

pub mod conflict;
pub mod grammar;
pub mod item;
pub mod look;
pub mod lr0;
pub mod priority;
pub mod types;
pub mod util;

#[cfg(test)]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
