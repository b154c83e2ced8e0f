//! vCenter connectivity CLI
//!
//! Derives port group names, checks and generates resource configuration,
//! and runs connectivity requests against a simulated vCenter inventory.

pub mod commands;

#[cfg(test)]
mod tests;
