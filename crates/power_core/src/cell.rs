//! Célula compartilhada com a última medição.
//!
//! Um escritor (loop de amostragem) e vários leitores (display, publicador,
//! responder HTTP). O valor guardado é `Copy`, então a seção crítica é uma
//! única cópia: leitores nunca seguram o lock além disso e nunca veem um
//! valor parcialmente escrito.

use crate::types::{Measurement, Reading};
use std::sync::{PoisonError, RwLock};

/// Holder sincronizado da última [`Measurement`].
///
/// Compartilhado via `Arc<SharedReadingCell>` entre as duas atividades.
#[derive(Debug, Default)]
pub struct SharedReadingCell {
    inner: RwLock<Reading>,
}

impl SharedReadingCell {
    /// Cria a célula contendo a sentinela.
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitui o valor guardado.
    pub fn set(&self, measurement: Measurement) {
        // Um leitor que entrou em pânico não corrompe um valor `Copy`.
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Reading::Sampled(measurement);
    }

    /// Retorna a última medição ou [`Reading::NotYetSampled`].
    pub fn get(&self) -> Reading {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
