//! Scenario-based tests for deckhand

mod onetime;
mod orphan_cleanup;
mod standing_pipelines;
