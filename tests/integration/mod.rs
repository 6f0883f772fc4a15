//! Integration tests for cargo-ship
//!
//! Every test drives the built binary against a throwaway git repository.
//! Nothing here talks to a real registry or remote.

mod helpers;
mod test_plan;
mod test_run;
