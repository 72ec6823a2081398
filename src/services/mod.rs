//! Core services implementing the business logic.
//!
//! This module contains the main service implementations:
//! - `blockchain`: Capability traits, the EVM JSON-RPC client and its transport
//! - `chain_poller`: Per-chain polling loop
//! - `sentinel`: Multi-chain orchestration
//! - `subscription`: Per-chain subscription registry and log fan-out

pub mod blockchain;
pub mod chain_poller;
pub mod sentinel;
pub mod subscription;
