// Shared plumbing for the `load-stats` and `generate-cards` binaries.

pub mod args;
pub mod startup;
