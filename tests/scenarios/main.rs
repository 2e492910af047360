//! Scenario-based tests for stageline

mod helpers;

mod fail_fast;
mod ordering;
mod provisioning;
mod success_chain;
