//! Route Handlers

pub mod alerts;
pub mod dashboard;
pub mod predictions;
pub mod sensors;
