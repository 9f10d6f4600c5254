//! Rune - a user-account chat client with owner commands, auto-replies,
//! and a local control API.

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod format;
pub mod gateway;
pub mod handlers;
pub mod response;
pub mod rest;
pub mod runtime;
pub mod server;
pub mod stats;
