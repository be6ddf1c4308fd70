pub(crate) mod budget_repository;
pub mod budget_service;
pub mod evaluation;
pub mod handler;
pub mod models;
pub(crate) mod repository;
pub mod service;
