//! Tipos de medição do nó de telemetria de energia.
//!
//! O driver do sensor entrega um [`RawSample`]; o loop de amostragem carimba
//! o tempo e constrói um [`Measurement`] imutável, que é o único valor que
//! circula entre display, publicador e HTTP.

use crate::error::SensorFault;
use std::fmt;
use std::time::Duration;

// ──────────────────────────────────────────────
// Amostra bruta
// ──────────────────────────────────────────────

/// Leitura bruta do INA219, antes do carimbo de tempo.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawSample {
    /// Corrente (µA)
    pub current_ua: f64,
    /// Tensão do barramento (V)
    pub bus_voltage_v: f64,
    /// Tensão do shunt (mV)
    pub shunt_voltage_mv: f64,
}

impl RawSample {
    pub const fn new(current_ua: f64, bus_voltage_v: f64, shunt_voltage_mv: f64) -> Self {
        Self {
            current_ua,
            bus_voltage_v,
            shunt_voltage_mv,
        }
    }
}

// ──────────────────────────────────────────────
// Medição
// ──────────────────────────────────────────────

/// Snapshot imutável de uma leitura.
///
/// A tensão efetiva (`bus + shunt / 1000`) é calculada uma única vez em
/// [`Measurement::new`] e armazenada; quem consome apenas lê o campo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    current_ua: f64,
    bus_voltage_v: f64,
    shunt_voltage_mv: f64,
    voltage_v: f64,
    sampled_at: Duration,
}

impl Measurement {
    /// Constrói a medição, rejeitando valores não finitos.
    pub fn new(sample: RawSample, sampled_at: Duration) -> Result<Self, SensorFault> {
        let RawSample {
            current_ua,
            bus_voltage_v,
            shunt_voltage_mv,
        } = sample;

        for (name, value) in [
            ("current", current_ua),
            ("bus_voltage", bus_voltage_v),
            ("shunt_voltage", shunt_voltage_mv),
        ] {
            if !value.is_finite() {
                return Err(SensorFault::InvalidData(format!("{name} = {value}")));
            }
        }

        Ok(Self {
            current_ua,
            bus_voltage_v,
            shunt_voltage_mv,
            voltage_v: bus_voltage_v + shunt_voltage_mv / 1000.0,
            sampled_at,
        })
    }

    /// Corrente (µA)
    pub fn current_ua(&self) -> f64 {
        self.current_ua
    }

    /// Tensão do barramento (V)
    pub fn bus_voltage_v(&self) -> f64 {
        self.bus_voltage_v
    }

    /// Tensão do shunt (mV)
    pub fn shunt_voltage_mv(&self) -> f64 {
        self.shunt_voltage_mv
    }

    /// Tensão efetiva (V): barramento + shunt/1000.
    pub fn voltage_v(&self) -> f64 {
        self.voltage_v
    }

    /// Instante da amostra, relativo ao início do nó.
    pub fn sampled_at(&self) -> Duration {
        self.sampled_at
    }

    /// Valor publicado em cada canal.
    pub fn value_for(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Current => self.current_ua,
            Channel::Voltage => self.voltage_v,
        }
    }
}

// ──────────────────────────────────────────────
// Estado da célula
// ──────────────────────────────────────────────

/// Conteúdo da célula compartilhada: sentinela ou a última medição.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Reading {
    /// Nenhuma amostra bem-sucedida ainda.
    #[default]
    NotYetSampled,
    Sampled(Measurement),
}

impl Reading {
    pub fn measurement(&self) -> Option<&Measurement> {
        match self {
            Reading::Sampled(m) => Some(m),
            Reading::NotYetSampled => None,
        }
    }

    pub fn is_sampled(&self) -> bool {
        matches!(self, Reading::Sampled(_))
    }
}

// ──────────────────────────────────────────────
// Canais de telemetria
// ──────────────────────────────────────────────

/// Canais publicados a cada ciclo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Current,
    Voltage,
}

impl Channel {
    /// Ordem de publicação dentro de um ciclo.
    pub const ALL: [Channel; 2] = [Channel::Current, Channel::Voltage];

    /// Nome do canal no fio.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Current => "current",
            Channel::Voltage => "voltage",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_voltage_adds_shunt_in_millivolts() {
        let pairs = [(5.0, 10.0), (5.1, 12.0), (3.3, -4.5), (0.0, 0.0), (12.0, 320.0)];
        for (bus, shunt) in pairs {
            let m = Measurement::new(RawSample::new(1.0, bus, shunt), Duration::ZERO).unwrap();
            assert_eq!(m.voltage_v(), bus + shunt / 1000.0);
            assert_eq!(m.bus_voltage_v(), bus);
            assert_eq!(m.shunt_voltage_mv(), shunt);
        }
    }

    #[test]
    fn rejects_non_finite_fields() {
        let bad = [
            RawSample::new(f64::NAN, 5.0, 1.0),
            RawSample::new(1.0, f64::INFINITY, 1.0),
            RawSample::new(1.0, 5.0, f64::NEG_INFINITY),
        ];
        for sample in bad {
            assert!(matches!(
                Measurement::new(sample, Duration::ZERO),
                Err(SensorFault::InvalidData(_))
            ));
        }
    }

    #[test]
    fn value_for_maps_channels() {
        let m = Measurement::new(RawSample::new(250.0, 5.0, 10.0), Duration::from_secs(3)).unwrap();
        assert_eq!(m.value_for(Channel::Current), 250.0);
        assert_eq!(m.value_for(Channel::Voltage), m.voltage_v());
        assert_eq!(m.sampled_at(), Duration::from_secs(3));
    }

    #[test]
    fn default_reading_is_sentinel() {
        let r = Reading::default();
        assert!(!r.is_sampled());
        assert!(r.measurement().is_none());
    }

    #[test]
    fn channel_wire_names() {
        assert_eq!(Channel::Current.to_string(), "current");
        assert_eq!(Channel::Voltage.as_str(), "voltage");
    }
}
