//! Schoolgate Server
//!
//! Role and permission gated backend for school management. Hosts the
//! authorization core: credential verification, sessions, permission
//! resolution and the role and permission gates.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod permissions;
pub mod seed;
