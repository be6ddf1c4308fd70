pub mod handler;
pub mod models;
pub mod reports;
pub(crate) mod repository;
pub mod service;
pub mod stats;
pub mod validation;
