//! Taxonomia de falhas do nó.
//!
//! Falhas por ciclo ([`SensorFault`], [`DisplayFault`], [`PublishFault`]) e
//! por conexão ([`ConnectionFault`]) são tratadas dentro da própria iteração.
//! Apenas [`InitFault`] sobe até o processo.

use std::io;
use std::net::SocketAddr;

/// Falha ao ler o sensor.
#[derive(Debug, thiserror::Error)]
pub enum SensorFault {
    #[error("Erro de barramento: {0}")]
    Bus(#[from] io::Error),

    #[error("Leitura inválida: {0}")]
    InvalidData(String),

    #[error("Sensor indisponível: {0}")]
    Unavailable(String),
}

/// Falha ao desenhar o frame no display.
#[derive(Debug, thiserror::Error)]
pub enum DisplayFault {
    #[error("Erro de escrita no display: {0}")]
    Io(#[from] io::Error),
}

/// Falha ao publicar um canal de telemetria.
#[derive(Debug, thiserror::Error)]
pub enum PublishFault {
    /// Fila do cliente MQTT cheia ou cliente encerrado.
    #[error("Publicação recusada pelo cliente MQTT: {0}")]
    Rejected(String),
}

/// Falha em uma conexão HTTP. Abandona apenas aquela conexão.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionFault {
    #[error("Erro de I/O: {0}")]
    Io(#[from] io::Error),

    #[error("Requisição malformada: {0:?}")]
    MalformedRequest(String),

    #[error("Requisição excede {0} bytes")]
    RequestTooLarge(usize),

    #[error("Conexão fechada pelo cliente antes da requisição")]
    Closed,
}

/// Falha fatal de inicialização ou de supervisão. Não é recuperável
/// dentro do nó: sobe até `main`, que encerra o processo.
#[derive(Debug, thiserror::Error)]
pub enum InitFault {
    #[error("Falha ao abrir listener em {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Endereço inválido: {0}")]
    Address(String),

    #[error("Sensor indisponível: {0}")]
    Sensor(String),

    #[error("Configuração inválida: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("Falha ao criar thread {name}: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Responder HTTP parou inesperadamente")]
    ResponderStopped,
}

impl ConnectionFault {
    /// Timeout de leitura/escrita (peer lento ou silencioso).
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ConnectionFault::Io(e)
                if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock
        )
    }
}
