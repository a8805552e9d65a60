//! # Power Node
//!
//! Nó de telemetria de energia: amostra um INA219, desenha a leitura no
//! display, publica corrente e tensão no broker MQTT e serve a última leitura em
//! um endpoint HTTP mínimo.
//!
//! ## Uso
//! ```bash
//! power_node                          # power_node.toml ao lado do executável
//! POWER_NODE_USERNAME=fulano POWER_NODE_KEY=aio_xxx power_node
//! RUST_LOG=debug power_node           # log detalhado por conexão/ciclo
//! ```

mod console_display;
mod hwmon_sensor;
mod mqtt_publisher;
mod ports;
mod responder;
mod sampler;
mod scheduler;
mod simulated_sensor;

#[cfg(test)]
mod fakes;

use console_display::ConsoleDisplay;
use hwmon_sensor::HwmonSensor;
use mqtt_publisher::MqttPublisher;
use ports::{Disabled, DisplayDriver, Publisher, SensorDriver};
use power_core::config::{DisplayConfig, PublisherConfig, SensorConfig};
use power_core::error::InitFault;
use power_core::NodeConfig;
use scheduler::Scheduler;
use simulated_sensor::SimulatedSensor;
use std::convert::Infallible;
use std::process::ExitCode;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Carregar config ──
    let config_path = NodeConfig::default_path();
    let mut config = NodeConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    config.apply_env();

    match run(&config) {
        Ok(never) => match never {},
        Err(e) => {
            error!("Falha fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Monta os drivers e entrega o processo ao scheduler.
fn run(config: &NodeConfig) -> Result<Infallible, InitFault> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(InitFault::InvalidConfig(errors));
    }

    let sensor = build_sensor(&config.sensor)?;
    let display = build_display(&config.display);
    let publisher = build_publisher(&config.publisher)?;

    let scheduler = Scheduler::new(config, sensor, display, publisher)?;
    print_banner(config);

    let node = scheduler.start()?;
    if let Some(addr) = node.http_addr() {
        info!("Endpoint HTTP pronto em http://{addr}/");
    }
    Err(node.run())
}

fn build_sensor(config: &SensorConfig) -> Result<Box<dyn SensorDriver>, InitFault> {
    match config.source.as_str() {
        "hwmon" => Ok(Box::new(HwmonSensor::open(&config.hwmon_path)?)),
        _ => {
            info!(
                "Sensor simulado ({} uA, {} V)",
                config.sim_current_ua, config.sim_bus_voltage_v
            );
            Ok(Box::new(SimulatedSensor::from_config(config)))
        }
    }
}

fn build_display(config: &DisplayConfig) -> Box<dyn DisplayDriver> {
    if config.enabled {
        Box::new(ConsoleDisplay::new(std::io::stdout(), config))
    } else {
        info!("Display desabilitado");
        Box::new(Disabled)
    }
}

fn build_publisher(config: &PublisherConfig) -> Result<Box<dyn Publisher>, InitFault> {
    if config.enabled {
        Ok(Box::new(MqttPublisher::connect(config)?))
    } else {
        info!("Publicador desabilitado");
        Ok(Box::new(Disabled))
    }
}

fn print_banner(config: &NodeConfig) {
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ⚡ POWER NODE – ATIVO");
    println!("══════════════════════════════════════════════");
    println!("  HTTP:      {}:{}", config.http.bind_ip, config.http.port);
    println!("  Sensor:    {}", config.sensor.source);
    println!("  Intervalo: {:.1}s", config.sampling.interval_secs);
    if config.publisher.enabled {
        println!(
            "  Broker:    {}:{} ({})",
            config.publisher.broker_host,
            config.publisher.port,
            if config.publisher.has_credentials() { "autenticado" } else { "anônimo" }
        );
    }
    println!("══════════════════════════════════════════════");
    println!();
}
