//! Combat rules around the virtual machine.
//!
//! - [`fighter`]: a named program with health and strength
//! - [`resolver`]: Gamble draws and the damage matrix
//! - [`config`]: match settings and their environment overrides
//! - [`duel`]: the round loop and match reports

pub mod config;
pub mod duel;
pub mod fighter;
pub mod resolver;
