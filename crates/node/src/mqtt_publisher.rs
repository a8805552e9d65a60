//! Publicador de telemetria via MQTT (Adafruit IO ou qualquer broker 3.1.1).
//!
//! `publish` apenas enfileira a mensagem no cliente; uma thread dedicada
//! conduz o event loop (CONNECT, envio, reconexão). Assim o loop de
//! amostragem nunca bloqueia esperando a rede.

use crate::ports::Publisher;
use power_core::config::PublisherConfig;
use power_core::error::{InitFault, PublishFault};
use power_core::render::format_quantity;
use power_core::Channel;
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tracing::{debug, info, warn};

const EVENT_LOOP_THREAD: &str = "mqtt-event-loop";

/// Espera entre tentativas de reconexão ao broker.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

pub struct MqttPublisher {
    client: Client,
    username: String,
}

impl MqttPublisher {
    /// Cria o cliente e inicia o event loop em segundo plano.
    ///
    /// A conexão com o broker é estabelecida de forma assíncrona: um broker
    /// fora do ar não impede o nó de iniciar.
    pub fn connect(config: &PublisherConfig) -> Result<Self, InitFault> {
        if !config.client_id_is_valid() {
            return Err(InitFault::InvalidConfig(vec![format!(
                "client_id MQTT inválido: {:?}",
                config.client_id
            )]));
        }

        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.port,
        );
        options.set_keep_alive(config.keep_alive());
        if config.has_credentials() {
            options.set_credentials(config.username.clone(), config.key.clone());
        } else {
            warn!("Publicador MQTT sem usuário/chave: o broker pode recusar a conexão");
        }

        let (client, connection) = Client::new(options, config.queue_capacity);
        let broker = format!("{}:{}", config.broker_host, config.port);

        std::thread::Builder::new()
            .name(EVENT_LOOP_THREAD.into())
            .spawn(move || drive_event_loop(connection, &broker))
            .map_err(|source| InitFault::Spawn {
                name: EVENT_LOOP_THREAD,
                source,
            })?;

        info!(
            "Publicador MQTT → {}:{} (cliente '{}')",
            config.broker_host, config.port, config.client_id
        );

        Ok(Self {
            client,
            username: config.username.clone(),
        })
    }

    /// Tópico completo de um canal (`usuario/feeds/canal`).
    pub fn topic(&self, channel: Channel) -> String {
        feed_topic(&self.username, channel)
    }
}

fn feed_topic(username: &str, channel: Channel) -> String {
    if username.is_empty() {
        channel.as_str().to_string()
    } else {
        format!("{username}/feeds/{channel}")
    }
}

/// Conduz o event loop até o cliente ser descartado.
fn drive_event_loop(mut connection: Connection, broker: &str) {
    let mut connected = false;
    for event in connection.iter() {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                connected = true;
                info!("✓ Conectado ao broker {broker} ({:?})", ack.code);
            }
            Ok(other) => debug!("MQTT: {other:?}"),
            Err(e) => {
                if connected {
                    warn!("✗ Conexão com {broker} perdida: {e}");
                } else {
                    warn!("✗ Broker {broker} inacessível: {e}");
                }
                connected = false;
                std::thread::sleep(RECONNECT_BACKOFF);
            }
        }
    }
    debug!("Event loop MQTT encerrado");
}

impl Publisher for MqttPublisher {
    fn publish(&mut self, channel: Channel, value: f64) -> Result<(), PublishFault> {
        let topic = self.topic(channel);
        let payload = format_quantity(value);
        self.client
            .try_publish(topic.as_str(), QoS::AtMostOnce, false, payload.as_bytes())
            .map_err(|e| PublishFault::Rejected(e.to_string()))?;
        debug!("→ {topic} = {payload}");
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
