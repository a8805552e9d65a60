//! # Power Core
//!
//! Crate compartilhada do nó de telemetria de energia: modelo de medição,
//! célula compartilhada da última leitura, formatação do display, da
//! resposta HTTP e dos valores publicados, e configuração TOML.
//!
//! ## Módulos
//! - [`types`] – Measurement, RawSample, Reading e canais
//! - [`cell`] – SharedReadingCell (um escritor, vários leitores)
//! - [`render`] – Linhas do display e resposta HTTP, funções puras
//! - [`config`] – Configuração unificada via TOML
//! - [`error`] – Taxonomia de falhas

pub mod types;
pub mod cell;
pub mod render;
pub mod config;
pub mod error;

// Re-exports convenientes
pub use types::{Channel, Measurement, RawSample, Reading};
pub use cell::SharedReadingCell;
pub use config::NodeConfig;
