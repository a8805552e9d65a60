//! Sensor simulado para desenvolvimento sem hardware.
//!
//! Oscila suavemente em torno dos valores base da configuração, de forma
//! determinística (sem RNG), para que o display e a página mudem a cada ciclo.

use crate::ports::SensorDriver;
use power_core::RawSample;
use power_core::config::SensorConfig;
use power_core::error::SensorFault;

pub struct SimulatedSensor {
    base: RawSample,
    step: u64,
}

impl SimulatedSensor {
    pub fn new(base: RawSample) -> Self {
        Self { base, step: 0 }
    }

    pub fn from_config(config: &SensorConfig) -> Self {
        Self::new(RawSample::new(
            config.sim_current_ua,
            config.sim_bus_voltage_v,
            config.sim_shunt_voltage_mv,
        ))
    }
}

impl SensorDriver for SimulatedSensor {
    fn read(&mut self) -> Result<RawSample, SensorFault> {
        let phase = self.step as f64 * 0.3;
        self.step += 1;

        // ±10% na corrente, ±1% no barramento; shunt acompanha a corrente
        let swing = phase.sin();
        let current = (self.base.current_ua * (1.0 + 0.1 * swing)).round();
        let bus = self.base.bus_voltage_v * (1.0 + 0.01 * phase.cos());
        let shunt = self.base.shunt_voltage_mv * (1.0 + 0.1 * swing);

        Ok(RawSample::new(current, bus, shunt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reading_is_the_base_current() {
        let mut sensor = SimulatedSensor::new(RawSample::new(100.0, 5.0, 10.0));
        let first = sensor.read().unwrap();
        assert_eq!(first.current_ua, 100.0);
        assert_eq!(first.shunt_voltage_mv, 10.0);
    }

    #[test]
    fn stays_within_ten_percent() {
        let mut sensor = SimulatedSensor::from_config(&SensorConfig::default());
        for _ in 0..100 {
            let s = sensor.read().unwrap();
            assert!((89.0..=111.0).contains(&s.current_ua), "{s:?}");
            assert!((4.9..=5.1).contains(&s.bus_voltage_v), "{s:?}");
        }
    }
}
