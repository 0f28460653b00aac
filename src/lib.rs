//! Car Price AI: a conversational wizard that collects vehicle details
//! and asks a valuation service for a price estimate.

pub mod catalog;
pub mod channels;
pub mod config;
pub mod error;
pub mod gateway;
pub mod transcript;
pub mod web;
pub mod wizard;
