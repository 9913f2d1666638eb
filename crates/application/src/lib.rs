//! Proxyscan Application Layer
pub mod ports;
