//! Always-on audit FSMs (spec.md §4.4.9): unlike the action FSMs these run
//! every pass regardless of admin action, and more than one may be active
//! on the same host at once — invariant 2's "one action FSM at a time"
//! rule does not apply here.

pub mod bmc;
pub mod config;
pub mod degrade;
pub mod in_service;
pub mod offline;
pub mod online;
pub mod out_of_service;
pub mod uptime;
