// src/services/mod.rs
pub mod auth_service;
pub mod export_service;
pub mod pesagem_service;
pub mod relatorio_service;
pub mod user_service;
