//! Statement Service - Commission statement ledger as a microservice.

pub mod config;
pub mod dtos;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod startup;
