//! Configuração unificada via TOML.
//!
//! Um único `power_node.toml` ao lado do executável. Campos ausentes usam
//! os valores padrão; credenciais podem vir de variáveis de ambiente para
//! não ficarem gravadas no arquivo.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Variável de ambiente que sobrescreve `publisher.username`.
pub const ENV_USERNAME: &str = "POWER_NODE_USERNAME";

/// Variável de ambiente que sobrescreve `publisher.key`.
pub const ENV_KEY: &str = "POWER_NODE_KEY";

/// Maior timeout HTTP aceito (segundos).
pub const MAX_HTTP_TIMEOUT_SECS: f64 = 300.0;

/// Fontes de sensor aceitas em `sensor.source`.
pub const SENSOR_SOURCES: [&str; 2] = ["simulated", "hwmon"];

/// Cadência do loop de amostragem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Intervalo entre ciclos em segundos
    pub interval_secs: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { interval_secs: 5.0 }
    }
}

impl SamplingConfig {
    /// Faixa aceita para `interval_secs`.
    pub const INTERVAL_RANGE: std::ops::RangeInclusive<f64> = 0.1..=3600.0;

    /// `None` fora de [`Self::INTERVAL_RANGE`] (inclui NaN e infinito).
    pub fn interval(&self) -> Option<Duration> {
        Self::INTERVAL_RANGE
            .contains(&self.interval_secs)
            .then(|| Duration::from_secs_f64(self.interval_secs))
    }
}

/// Endpoint HTTP de uma conexão por vez.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// IP local para bind ("0.0.0.0" = todas as interfaces)
    pub bind_ip: String,
    /// Porta TCP
    pub port: u16,
    /// Backlog do listen
    pub backlog: u32,
    /// Timeout de leitura da requisição (segundos)
    pub read_timeout_secs: f64,
    /// Timeout de escrita da resposta (segundos)
    pub write_timeout_secs: f64,
    /// Tamanho máximo do cabeçalho da requisição
    pub max_request_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_ip: "0.0.0.0".into(),
            port: 80,
            backlog: 1,
            read_timeout_secs: 2.0,
            write_timeout_secs: 2.0,
            max_request_bytes: 2048,
        }
    }
}

impl HttpConfig {
    pub fn bind_addr(&self) -> Option<SocketAddr> {
        let ip: IpAddr = self.bind_ip.parse().ok()?;
        Some(SocketAddr::new(ip, self.port))
    }

    /// Tempo total para receber o cabeçalho da requisição.
    ///
    /// `None` para valores que não formam um timeout de socket (zero,
    /// negativo, NaN, infinito ou acima de [`MAX_HTTP_TIMEOUT_SECS`]).
    pub fn read_timeout(&self) -> Option<Duration> {
        socket_timeout(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        socket_timeout(self.write_timeout_secs)
    }
}

fn socket_timeout(secs: f64) -> Option<Duration> {
    if secs > MAX_HTTP_TIMEOUT_SECS {
        return None;
    }
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
}

/// Display OLED (emulado em texto).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub enabled: bool,
    /// Largura em pixels
    pub width_px: u32,
    /// Altura em pixels
    pub height_px: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width_px: 128,
            height_px: 64,
        }
    }
}

impl DisplayConfig {
    /// Largura de um caractere da fonte embutida (px)
    pub const GLYPH_WIDTH_PX: u32 = 6;
    /// Altura de uma linha de texto (px)
    pub const LINE_HEIGHT_PX: u32 = 10;

    pub fn columns(&self) -> usize {
        (self.width_px / Self::GLYPH_WIDTH_PX) as usize
    }

    pub fn rows(&self) -> usize {
        (self.height_px / Self::LINE_HEIGHT_PX) as usize
    }
}

/// Origem das leituras de corrente/tensão.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// "simulated" ou "hwmon"
    pub source: String,
    /// Diretório hwmon do driver ina2xx
    pub hwmon_path: String,
    /// Corrente base do sensor simulado (µA)
    pub sim_current_ua: f64,
    /// Tensão de barramento do sensor simulado (V)
    pub sim_bus_voltage_v: f64,
    /// Tensão de shunt do sensor simulado (mV)
    pub sim_shunt_voltage_mv: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            source: "simulated".into(),
            hwmon_path: "/sys/class/hwmon/hwmon0".into(),
            sim_current_ua: 100.0,
            sim_bus_voltage_v: 5.0,
            sim_shunt_voltage_mv: 10.0,
        }
    }
}

/// Publicação no broker MQTT (Adafruit IO por padrão).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub enabled: bool,
    /// Host do broker
    pub broker_host: String,
    /// Porta TCP do broker (1883 = MQTT sem TLS)
    pub port: u16,
    /// Client id apresentado no CONNECT
    pub client_id: String,
    /// Usuário do broker, também prefixo dos tópicos (`usuario/feeds/canal`)
    pub username: String,
    /// Chave/senha do broker. Prefira `POWER_NODE_KEY` a gravá-la aqui
    pub key: String,
    /// Keep-alive do MQTT (segundos)
    pub keep_alive_secs: u64,
    /// Mensagens aguardando o event loop antes de recusar novas
    pub queue_capacity: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            broker_host: "io.adafruit.com".into(),
            port: 1883,
            client_id: "power-node".into(),
            username: String::new(),
            key: String::new(),
            keep_alive_secs: 60,
            queue_capacity: 10,
        }
    }
}

impl PublisherConfig {
    /// Faixa de keep-alive aceita pelo cliente MQTT (campo de 16 bits).
    pub const KEEP_ALIVE_RANGE: std::ops::RangeInclusive<u64> = 5..=u16::MAX as u64;

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Client id não vazio e sem espaço inicial (exigência do cliente MQTT).
    pub fn client_id_is_valid(&self) -> bool {
        !self.client_id.is_empty() && !self.client_id.starts_with(char::is_whitespace)
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.key.is_empty()
    }
}

/// Configuração raiz do nó.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub sampling: SamplingConfig,
    pub http: HttpConfig,
    pub display: DisplayConfig,
    pub sensor: SensorConfig,
    pub publisher: PublisherConfig,
}

impl NodeConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<NodeConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        NodeConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do power_node.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("power_node.toml")
    }

    /// Aplica sobrescritas do ambiente do processo.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Aplica sobrescritas a partir de um lookup arbitrário.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(username) = lookup(ENV_USERNAME).filter(|u| !u.is_empty()) {
            info!("Usuário de telemetria definido por {ENV_USERNAME}");
            self.publisher.username = username;
        }
        if let Some(key) = lookup(ENV_KEY).filter(|k| !k.is_empty()) {
            info!("Chave do broker definida por {ENV_KEY}");
            self.publisher.key = key;
        }
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.sampling.interval().is_none() {
            errors.push(format!(
                "Intervalo de amostragem inválido: {} (0.1–3600.0)",
                self.sampling.interval_secs
            ));
        }

        if self.http.port == 0 {
            errors.push("Porta HTTP não pode ser 0".into());
        }
        if self.http.bind_addr().is_none() {
            errors.push(format!("IP de bind HTTP inválido: {:?}", self.http.bind_ip));
        }
        if self.http.backlog == 0 {
            errors.push("Backlog HTTP não pode ser 0".into());
        }
        if self.http.read_timeout().is_none() || self.http.write_timeout().is_none() {
            errors.push(format!(
                "Timeouts HTTP inválidos: leitura {}, escrita {} (0–{MAX_HTTP_TIMEOUT_SECS}s, exclusivo em 0)",
                self.http.read_timeout_secs, self.http.write_timeout_secs
            ));
        }
        if self.http.max_request_bytes < 16 {
            errors.push(format!(
                "max_request_bytes muito pequeno: {}",
                self.http.max_request_bytes
            ));
        }

        if self.display.enabled && (self.display.columns() == 0 || self.display.rows() < 2) {
            errors.push(format!(
                "Display {}x{} não comporta duas linhas",
                self.display.width_px, self.display.height_px
            ));
        }

        if !SENSOR_SOURCES.contains(&self.sensor.source.as_str()) {
            errors.push(format!(
                "Fonte de sensor desconhecida: {:?} (use {})",
                self.sensor.source,
                SENSOR_SOURCES.join(" ou ")
            ));
        }

        if self.publisher.enabled {
            let publisher = &self.publisher;
            if publisher.broker_host.trim().is_empty() {
                errors.push("Host do broker MQTT não pode ser vazio".into());
            }
            if publisher.port == 0 {
                errors.push("Porta do broker MQTT não pode ser 0".into());
            }
            if !publisher.client_id_is_valid() {
                errors.push(format!("client_id MQTT inválido: {:?}", publisher.client_id));
            }
            if !PublisherConfig::KEEP_ALIVE_RANGE.contains(&publisher.keep_alive_secs) {
                errors.push(format!(
                    "Keep-alive MQTT inválido: {} (5–65535)",
                    publisher.keep_alive_secs
                ));
            }
            if publisher.queue_capacity == 0 {
                errors.push("queue_capacity do publicador não pode ser 0".into());
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = NodeConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
        assert_eq!(config.sampling.interval(), Some(Duration::from_secs(5)));
        assert_eq!(config.http.backlog, 1);
        assert_eq!(config.http.bind_addr(), Some("0.0.0.0:80".parse().unwrap()));
    }

    #[test]
    fn roundtrip_toml() {
        let config = NodeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: NodeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.http.port, parsed.http.port);
        assert_eq!(config.sensor.source, parsed.sensor.source);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
[sampling]
interval_secs = 1.5

[http]
port = 8080
"#;
        let config: NodeConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.sampling.interval_secs, 1.5);
        assert_eq!(config.http.port, 8080);
        // Outros campos devem ter valor padrão
        assert_eq!(config.http.backlog, 1);
        assert_eq!(config.display.width_px, 128);
        assert_eq!(config.publisher.port, 1883);
        assert_eq!(config.publisher.broker_host, "io.adafruit.com");
    }

    #[test]
    fn validation_reports_each_problem() {
        let mut config = NodeConfig::default();
        config.sampling.interval_secs = 0.0;
        config.http.port = 0;
        config.http.backlog = 0;
        config.http.read_timeout_secs = 0.0;
        config.sensor.source = "ina3221".into();

        let errors = config.validate();
        assert_eq!(errors.len(), 5, "Erros: {:?}", errors);
        assert!(errors.iter().any(|e| e.contains("ina3221")));
    }

    #[test]
    fn non_finite_or_huge_timeouts_are_rejected() {
        for bad in [f64::INFINITY, f64::NAN, -1.0, 0.0, 1e12] {
            let mut config = NodeConfig::default();
            config.http.read_timeout_secs = bad;
            assert_eq!(config.http.read_timeout(), None, "{bad}");
            let errors = config.validate();
            assert_eq!(errors.len(), 1, "{bad}: {errors:?}");
            assert!(errors[0].contains("Timeouts HTTP"));
        }

        let mut config = NodeConfig::default();
        config.http.write_timeout_secs = f64::INFINITY;
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn non_finite_interval_is_rejected() {
        for bad in [f64::INFINITY, f64::NAN, -5.0, 0.0] {
            let mut config = NodeConfig::default();
            config.sampling.interval_secs = bad;
            assert_eq!(config.sampling.interval(), None, "{bad}");
            assert_eq!(config.validate().len(), 1, "{bad}");
        }
    }

    #[test]
    fn inf_timeout_parses_from_toml_but_fails_validation() {
        let config: NodeConfig = toml::from_str("[http]\nread_timeout_secs = inf\n").unwrap();
        assert!(config.http.read_timeout_secs.is_infinite());
        assert!(!config.validate().is_empty());
    }

    #[test]
    fn publisher_settings_are_validated() {
        let mut config = NodeConfig::default();
        config.publisher.broker_host = " ".into();
        config.publisher.keep_alive_secs = 1;
        config.publisher.queue_capacity = 0;
        config.publisher.client_id = " node".into();
        assert_eq!(config.validate().len(), 4, "{:?}", config.validate());

        // Publicador desabilitado não é validado
        config.publisher.enabled = false;
        assert!(config.validate().is_empty());
    }

    #[test]
    fn invalid_bind_ip_is_rejected() {
        let mut config = NodeConfig::default();
        config.http.bind_ip = "not-an-ip".into();
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn display_geometry_matches_oled() {
        let display = DisplayConfig::default();
        assert_eq!(display.columns(), 21);
        assert_eq!(display.rows(), 6);
    }

    #[test]
    fn env_override_sets_username() {
        let mut config = NodeConfig::default();
        config.apply_overrides(|key| (key == ENV_USERNAME).then(|| "sameureka".to_string()));
        assert_eq!(config.publisher.username, "sameureka");

        // Valor vazio não apaga o configurado
        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config.publisher.username, "sameureka");
        assert!(!config.publisher.has_credentials());
    }

    #[test]
    fn env_override_sets_key() {
        let mut config = NodeConfig::default();
        config.publisher.username = "sameureka".into();
        config.apply_overrides(|key| (key == ENV_KEY).then(|| "aio_segredo".to_string()));
        assert_eq!(config.publisher.key, "aio_segredo");
        assert!(config.publisher.has_credentials());
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!("power_node_cfg_{}.toml", std::process::id()));
        let mut config = NodeConfig::default();
        config.http.port = 8081;
        config.save(&path).unwrap();

        let loaded = NodeConfig::load(&path);
        assert_eq!(loaded.http.port, 8081);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let loaded = NodeConfig::load(Path::new("/definitely/not/here/power_node.toml"));
        assert_eq!(loaded.http.port, 80);
    }
}
