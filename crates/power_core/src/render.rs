//! Formatação pura: medição → linhas do display e resposta HTTP.
//!
//! Nenhuma função aqui toca socket ou driver, o que permite testar o
//! formato exato da resposta isoladamente.

use crate::types::{Measurement, Reading};

/// Placeholder exibido antes da primeira amostra.
pub const NO_DATA: &str = "no data";

/// Casas decimais mantidas antes de remover zeros à direita.
const DECIMALS: usize = 6;

/// Formata um valor decimal sem artefatos de ponto flutuante.
///
/// Arredonda para [`DECIMALS`] casas e remove zeros (e o ponto) à direita:
/// `100.0 → "100"`, `5.111999999999999 → "5.112"`.
pub fn format_quantity(value: f64) -> String {
    let text = format!("{value:.prec$}", prec = DECIMALS);
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Textos de corrente e tensão, ou o placeholder para a sentinela.
pub fn reading_fields(reading: &Reading) -> (String, String) {
    match reading.measurement() {
        Some(m) => (format_quantity(m.current_ua()), format_quantity(m.voltage_v())),
        None => (NO_DATA.to_string(), NO_DATA.to_string()),
    }
}

/// As duas linhas do display para uma medição.
pub fn display_lines(measurement: &Measurement) -> [String; 2] {
    [
        format!("Current: {} uA", format_quantity(measurement.current_ua())),
        format!("Voltage: {} V", format_quantity(measurement.voltage_v())),
    ]
}

/// Corpo HTML da resposta.
pub fn html_body(reading: &Reading) -> String {
    let (current, voltage) = reading_fields(reading);
    format!(
        "<html><body><h1>Current: {current} uA</h1><h1>Voltage: {voltage} V</h1></body></html>\r\n"
    )
}

/// Resposta HTTP completa (status, cabeçalhos, linha em branco, corpo).
pub fn http_response(reading: &Reading) -> Vec<u8> {
    let mut response = String::with_capacity(192);
    response.push_str("HTTP/1.1 200 OK\r\n");
    response.push_str("Content-Type: text/html\r\n");
    response.push_str("Connection: close\r\n");
    response.push_str("\r\n");
    response.push_str(&html_body(reading));
    response.into_bytes()
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
