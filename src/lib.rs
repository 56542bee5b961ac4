//! Fighting-program virtual machine.
//!
//! Two small assembly programs face each other. Each round both run on a
//! register VM and return an intent (defend, attack or gamble), which the
//! arena turns into damage until one of them is out of health.

pub mod arena;
pub mod utils;
pub mod virtual_machine;
