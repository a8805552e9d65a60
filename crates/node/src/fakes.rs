//! Drivers falsos para testes: roteiro de leituras e sinks que gravam tudo.

use crate::ports::{DisplayDriver, Publisher, SensorDriver};
use power_core::error::{DisplayFault, PublishFault, SensorFault};
use power_core::{Channel, RawSample};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Sensor que devolve as leituras roteirizadas, em ordem.
pub struct ScriptedSensor {
    script: VecDeque<Result<RawSample, SensorFault>>,
}

impl ScriptedSensor {
    pub fn new(script: Vec<Result<RawSample, SensorFault>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl SensorDriver for ScriptedSensor {
    fn read(&mut self) -> Result<RawSample, SensorFault> {
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(SensorFault::Unavailable("roteiro esgotado".into())))
    }
}

/// Display que grava cada frame; clones compartilham o registro.
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    frames: Arc<Mutex<Vec<Vec<String>>>>,
    fail: bool,
}

impl RecordingDisplay {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn frames(&self) -> Vec<Vec<String>> {
        self.frames.lock().unwrap().clone()
    }
}

impl DisplayDriver for RecordingDisplay {
    fn render(&mut self, lines: &[String]) -> Result<(), DisplayFault> {
        if self.fail {
            return Err(DisplayFault::Io(io::Error::other("display desconectado")));
        }
        self.frames.lock().unwrap().push(lines.to_vec());
        Ok(())
    }
}

#[derive(Clone, Copy, Default)]
enum FailMode {
    #[default]
    Never,
    Always,
    On(Channel),
}

/// Publicador que grava cada publicação bem-sucedida.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    published: Arc<Mutex<Vec<(Channel, f64)>>>,
    attempts: Arc<AtomicUsize>,
    fail: FailMode,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: FailMode::Always,
            ..Self::default()
        }
    }

    pub fn failing_on(channel: Channel) -> Self {
        Self {
            fail: FailMode::On(channel),
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<(Channel, f64)> {
        self.published.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&mut self, channel: Channel, value: f64) -> Result<(), PublishFault> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let fails = match self.fail {
            FailMode::Never => false,
            FailMode::Always => true,
            FailMode::On(c) => c == channel,
        };
        if fails {
            return Err(PublishFault::Rejected("fila do cliente cheia".into()));
        }
        self.published.lock().unwrap().push((channel, value));
        Ok(())
    }
}
