//! Roomies Messaging - Direct messaging core
//!
//! Persists one-to-one conversations between roommate-matching users and
//! relays new messages in real time to every connection a user has open.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
