//! Loop de amostragem e publicação.
//!
//! A cada ciclo: lê o sensor, atualiza a célula, desenha o display e publica
//! os dois canais. Falhas de um ciclo ficam no ciclo; o loop nunca termina.

use crate::ports::{DisplayDriver, Publisher, SensorDriver};
use power_core::render::{display_lines, format_quantity};
use power_core::{Channel, Measurement, SharedReadingCell};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Resultado de um ciclo.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Leitura válida gravada na célula.
    Sampled(Measurement),
    /// Sensor falhou; display, publicação e célula ficaram intocados.
    Skipped,
}

/// Resumo de um ciclo, usado para log e testes.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub display_ok: bool,
    /// Canais publicados com sucesso
    pub published: Vec<Channel>,
}

impl CycleReport {
    fn skipped() -> Self {
        Self {
            outcome: CycleOutcome::Skipped,
            display_ok: false,
            published: Vec::new(),
        }
    }
}

/// Contadores acumulados entre resumos periódicos.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleStats {
    pub cycles: u64,
    pub skipped: u64,
    pub display_failures: u64,
    /// Publicações descartadas (canal a canal)
    pub dropped_publishes: u64,
    pub last_sampled_at: Option<Duration>,
}

impl CycleStats {
    pub fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        match &report.outcome {
            CycleOutcome::Sampled(m) => {
                self.last_sampled_at = Some(m.sampled_at());
                if !report.display_ok {
                    self.display_failures += 1;
                }
                self.dropped_publishes += (Channel::ALL.len() - report.published.len()) as u64;
            }
            CycleOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Driver periódico da aquisição e do fan-out.
pub struct SamplingPublishLoop<S, D, P> {
    sensor: S,
    display: D,
    publisher: P,
    cell: Arc<SharedReadingCell>,
    interval: Duration,
    clock: Instant,
    cycles: u64,
    sensor_faults_in_row: u32,
}

impl<S, D, P> SamplingPublishLoop<S, D, P>
where
    S: SensorDriver,
    D: DisplayDriver,
    P: Publisher,
{
    pub fn new(
        sensor: S,
        display: D,
        publisher: P,
        cell: Arc<SharedReadingCell>,
        interval: Duration,
    ) -> Self {
        Self {
            sensor,
            display,
            publisher,
            cell,
            interval,
            clock: Instant::now(),
            cycles: 0,
            sensor_faults_in_row: 0,
        }
    }

    /// Ciclos executados até agora.
    #[cfg(test)]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Executa um ciclo sem dormir.
    pub fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;

        let measurement = match self
            .sensor
            .read()
            .and_then(|raw| Measurement::new(raw, self.clock.elapsed()))
        {
            Ok(m) => m,
            Err(e) => {
                self.sensor_faults_in_row += 1;
                warn!(
                    "Ciclo {}: falha no sensor ({} seguidas): {e}",
                    self.cycles, self.sensor_faults_in_row
                );
                return CycleReport::skipped();
            }
        };

        if self.sensor_faults_in_row > 0 {
            info!("Sensor recuperado após {} falhas", self.sensor_faults_in_row);
            self.sensor_faults_in_row = 0;
        }

        self.cell.set(measurement);

        let display_ok = match self.display.render(&display_lines(&measurement)) {
            Ok(()) => true,
            Err(e) => {
                warn!("Ciclo {}: falha no display: {e}", self.cycles);
                false
            }
        };

        let mut published = Vec::with_capacity(Channel::ALL.len());
        for channel in Channel::ALL {
            match self.publisher.publish(channel, measurement.value_for(channel)) {
                Ok(()) => published.push(channel),
                // Telemetria sendo descartada: sempre em nível de erro
                Err(e) => error!("Ciclo {}: falha ao publicar '{channel}': {e}", self.cycles),
            }
        }

        info!(
            "Ciclo {} | {} uA | {} V | display {} | publicados {}/{}",
            self.cycles,
            format_quantity(measurement.current_ua()),
            format_quantity(measurement.voltage_v()),
            if display_ok { "ok" } else { "falhou" },
            published.len(),
            Channel::ALL.len()
        );

        CycleReport {
            outcome: CycleOutcome::Sampled(measurement),
            display_ok,
            published,
        }
    }

    /// Executa um ciclo e dorme pelo tempo restante do intervalo.
    pub fn tick(&mut self) -> CycleReport {
        let cycle_start = Instant::now();
        let report = self.run_cycle();

        let elapsed = cycle_start.elapsed();
        if elapsed < self.interval {
            std::thread::sleep(self.interval - elapsed);
        } else {
            debug!("Ciclo {} excedeu o intervalo ({elapsed:?})", self.cycles);
        }

        report
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
