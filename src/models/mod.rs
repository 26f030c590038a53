// src/models/mod.rs
pub mod pesagem;
pub mod relatorio;
pub mod user;
