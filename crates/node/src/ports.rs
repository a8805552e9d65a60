//! Interfaces dos colaboradores externos do loop.
//!
//! Cada driver é tocado apenas pelo loop de amostragem, portanto as
//! implementações recebem `&mut self` e não precisam de sincronização.

use power_core::error::{DisplayFault, PublishFault, SensorFault};
use power_core::{Channel, RawSample};

/// Sensor de corrente/tensão (INA219 ou equivalente).
pub trait SensorDriver: Send {
    /// Lê uma amostra bruta. Operação bloqueante.
    fn read(&mut self) -> Result<RawSample, SensorFault>;
}

/// Display de texto de tamanho fixo.
pub trait DisplayDriver: Send {
    /// Desenha as linhas sobrescrevendo o frame anterior.
    fn render(&mut self, lines: &[String]) -> Result<(), DisplayFault>;
}

/// Cliente de telemetria já autenticado.
pub trait Publisher: Send {
    /// Publica o valor escalar de um canal.
    fn publish(&mut self, channel: Channel, value: f64) -> Result<(), PublishFault>;
}

impl<T: SensorDriver + ?Sized> SensorDriver for Box<T> {
    fn read(&mut self) -> Result<RawSample, SensorFault> {
        (**self).read()
    }
}

impl<T: DisplayDriver + ?Sized> DisplayDriver for Box<T> {
    fn render(&mut self, lines: &[String]) -> Result<(), DisplayFault> {
        (**self).render(lines)
    }
}

impl<T: Publisher + ?Sized> Publisher for Box<T> {
    fn publish(&mut self, channel: Channel, value: f64) -> Result<(), PublishFault> {
        (**self).publish(channel, value)
    }
}

/// Sink desabilitado por configuração: aceita tudo e não faz nada.
#[derive(Debug, Default, Clone, Copy)]
pub struct Disabled;

impl DisplayDriver for Disabled {
    fn render(&mut self, _lines: &[String]) -> Result<(), DisplayFault> {
        Ok(())
    }
}

impl Publisher for Disabled {
    fn publish(&mut self, _channel: Channel, _value: f64) -> Result<(), PublishFault> {
        Ok(())
    }
}
