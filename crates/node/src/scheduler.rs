//! Supervisor das duas atividades do nó.
//!
//! Ordem de partida: cria a célula com a sentinela, abre o listener HTTP
//! (falha é fatal), inicia o responder em uma thread nomeada e roda o loop
//! de amostragem no thread principal.

use crate::ports::{DisplayDriver, Publisher, SensorDriver};
use crate::responder::HttpResponder;
use crate::sampler::{CycleStats, SamplingPublishLoop};
use power_core::error::InitFault;
use power_core::{NodeConfig, SharedReadingCell};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, info};

const RESPONDER_THREAD: &str = "http-responder";

/// Ciclos entre resumos de saúde no log.
const STATS_EVERY: u64 = 60;

/// Nó montado, ainda sem atividades rodando.
pub struct Scheduler<S, D, P> {
    responder: HttpResponder,
    sampler: SamplingPublishLoop<S, D, P>,
}

impl<S, D, P> Scheduler<S, D, P>
where
    S: SensorDriver,
    D: DisplayDriver,
    P: Publisher,
{
    /// Monta célula, responder e loop. Drivers já devem estar prontos.
    pub fn new(config: &NodeConfig, sensor: S, display: D, publisher: P) -> Result<Self, InitFault> {
        let interval = config.sampling.interval().ok_or_else(|| {
            InitFault::InvalidConfig(vec![format!(
                "Intervalo de amostragem inválido: {}",
                config.sampling.interval_secs
            )])
        })?;
        let cell = Arc::new(SharedReadingCell::new());
        let responder = HttpResponder::bind(&config.http, Arc::clone(&cell))?;
        let sampler = SamplingPublishLoop::new(sensor, display, publisher, cell, interval);

        Ok(Self { responder, sampler })
    }

    #[cfg(test)]
    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.responder.local_addr()
    }

    /// Inicia o responder em segundo plano (uma única vez).
    pub fn start(self) -> Result<RunningNode<S, D, P>, InitFault> {
        let http_addr = self.responder.local_addr().ok();
        let responder = self.responder;

        let handle = std::thread::Builder::new()
            .name(RESPONDER_THREAD.into())
            .spawn(move || {
                responder.run();
            })
            .map_err(|source| InitFault::Spawn {
                name: RESPONDER_THREAD,
                source,
            })?;

        info!("Responder HTTP iniciado na thread '{RESPONDER_THREAD}'");

        Ok(RunningNode {
            sampler: self.sampler,
            responder: handle,
            http_addr,
        })
    }
}

/// Nó com o responder rodando; o loop roda no chamador.
pub struct RunningNode<S, D, P> {
    sampler: SamplingPublishLoop<S, D, P>,
    responder: JoinHandle<()>,
    http_addr: Option<SocketAddr>,
}

impl<S, D, P> RunningNode<S, D, P>
where
    S: SensorDriver,
    D: DisplayDriver,
    P: Publisher,
{
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http_addr
    }

    #[cfg(test)]
    pub fn sampler_mut(&mut self) -> &mut SamplingPublishLoop<S, D, P> {
        &mut self.sampler
    }

    /// Roda o loop de amostragem para sempre.
    ///
    /// Só retorna se o responder morrer (pânico na thread), o que é tratado
    /// como falha fatal para que a plataforma reinicie o processo.
    pub fn run(mut self) -> InitFault {
        info!(
            "Loop de amostragem iniciado (intervalo {:?})",
            self.sampler.interval()
        );
        let mut stats = CycleStats::default();
        loop {
            stats.record(&self.sampler.tick());
            if stats.cycles == STATS_EVERY {
                info!(
                    "Resumo de {} ciclos: {} sem leitura, {} falhas de display, {} publicações perdidas, última amostra em {:?}",
                    stats.cycles,
                    stats.skipped,
                    stats.display_failures,
                    stats.dropped_publishes,
                    stats.last_sampled_at
                );
                stats = CycleStats::default();
            }

            if self.responder.is_finished() {
                if let Err(panic) = self.responder.join() {
                    error!("Thread '{RESPONDER_THREAD}' entrou em pânico: {panic:?}");
                }
                return InitFault::ResponderStopped;
            }
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
