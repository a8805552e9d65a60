//! INA219 via driver `ina2xx` do kernel Linux (hwmon).
//!
//! Com o chip declarado no device tree, o kernel expõe em
//! `/sys/class/hwmon/hwmonN/`:
//! - `curr1_input` – corrente (mA)
//! - `in0_input` – tensão do shunt (mV)
//! - `in1_input` – tensão do barramento (mV)

use crate::ports::SensorDriver;
use power_core::RawSample;
use power_core::error::{InitFault, SensorFault};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CURRENT_FILE: &str = "curr1_input";
const SHUNT_FILE: &str = "in0_input";
const BUS_FILE: &str = "in1_input";

/// Nomes de chip aceitos no arquivo `name`.
const KNOWN_CHIPS: [&str; 4] = ["ina219", "ina220", "ina226", "ina2xx"];

pub struct HwmonSensor {
    dir: PathBuf,
}

impl HwmonSensor {
    /// Verifica o diretório hwmon e os três atributos necessários.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, InitFault> {
        let dir = dir.as_ref().to_path_buf();

        for file in [CURRENT_FILE, SHUNT_FILE, BUS_FILE] {
            if !dir.join(file).exists() {
                return Err(InitFault::Sensor(format!(
                    "{} sem atributo {file}",
                    dir.display()
                )));
            }
        }

        match std::fs::read_to_string(dir.join("name")) {
            Ok(name) if KNOWN_CHIPS.contains(&name.trim()) => {
                info!("✓ Sensor hwmon: {} em {}", name.trim(), dir.display());
            }
            Ok(name) => warn!("Chip hwmon inesperado {:?} em {}", name.trim(), dir.display()),
            Err(_) => warn!("{} sem arquivo 'name'", dir.display()),
        }

        Ok(Self { dir })
    }

    fn read_attr(&self, file: &str) -> Result<f64, SensorFault> {
        let text = std::fs::read_to_string(self.dir.join(file))?;
        text.trim()
            .parse::<i64>()
            .map(|v| v as f64)
            .map_err(|e| SensorFault::InvalidData(format!("{file} = {:?}: {e}", text.trim())))
    }
}

impl SensorDriver for HwmonSensor {
    fn read(&mut self) -> Result<RawSample, SensorFault> {
        let current_ma = self.read_attr(CURRENT_FILE)?;
        let shunt_mv = self.read_attr(SHUNT_FILE)?;
        let bus_mv = self.read_attr(BUS_FILE)?;
        debug!("hwmon: {current_ma} mA | shunt {shunt_mv} mV | bus {bus_mv} mV");

        Ok(RawSample::new(current_ma * 1000.0, bus_mv / 1000.0, shunt_mv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Diretório hwmon falso em /tmp, único por teste.
    fn fake_hwmon(tag: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("power_node_hwmon_{tag}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn reads_and_converts_units() {
        let dir = fake_hwmon(
            "ok",
            &[
                ("name", "ina219\n"),
                (CURRENT_FILE, "12\n"),
                (SHUNT_FILE, "10\n"),
                (BUS_FILE, "5000\n"),
            ],
        );
        let mut sensor = HwmonSensor::open(&dir).unwrap();
        let sample = sensor.read().unwrap();
        assert_eq!(sample, RawSample::new(12_000.0, 5.0, 10.0));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_attribute_is_init_fault() {
        let dir = fake_hwmon("missing", &[("name", "ina219\n"), (CURRENT_FILE, "1\n")]);
        assert!(matches!(HwmonSensor::open(&dir), Err(InitFault::Sensor(_))));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn garbage_value_is_invalid_data() {
        let dir = fake_hwmon(
            "garbage",
            &[(CURRENT_FILE, "abc\n"), (SHUNT_FILE, "0\n"), (BUS_FILE, "0\n")],
        );
        let mut sensor = HwmonSensor::open(&dir).unwrap();
        assert!(matches!(sensor.read(), Err(SensorFault::InvalidData(_))));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn vanished_device_is_bus_fault() {
        let dir = fake_hwmon(
            "vanished",
            &[(CURRENT_FILE, "1\n"), (SHUNT_FILE, "0\n"), (BUS_FILE, "0\n")],
        );
        let mut sensor = HwmonSensor::open(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();
        assert!(matches!(sensor.read(), Err(SensorFault::Bus(_))));
    }
}
