pub mod models;
pub(crate) mod repository;
pub mod service;
