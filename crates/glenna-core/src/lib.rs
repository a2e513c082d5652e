//! Core of glenna: keeps a locally installed plugin binary in sync with the
//! build published on a remote server.

pub mod config;
pub mod logging;

pub mod checksum;
pub mod event_log;
pub mod fetch;
pub mod install;
pub mod service;
pub mod update;
