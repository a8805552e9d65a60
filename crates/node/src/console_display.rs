//! Display de caracteres emulado no terminal.
//!
//! Reproduz a geometria do OLED 128x64 (fonte 6x10): cada frame tem sempre
//! o mesmo número de linhas e colunas; texto excedente é cortado.

use crate::ports::DisplayDriver;
use power_core::config::DisplayConfig;
use power_core::error::DisplayFault;
use std::io::Write;

pub struct ConsoleDisplay<W> {
    out: W,
    columns: usize,
    rows: usize,
}

impl<W: Write + Send> ConsoleDisplay<W> {
    pub fn new(out: W, config: &DisplayConfig) -> Self {
        Self {
            out,
            columns: config.columns(),
            rows: config.rows(),
        }
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.out
    }

    /// Monta o frame completo: `rows` linhas de exatamente `columns` chars.
    fn frame(&self, lines: &[String]) -> String {
        let border = "─".repeat(self.columns);
        let mut frame = format!("┌{border}┐\n");
        for row in 0..self.rows {
            let text: String = lines
                .get(row)
                .map(|l| l.chars().take(self.columns).collect())
                .unwrap_or_default();
            frame.push_str(&format!("│{text:<width$}│\n", width = self.columns));
        }
        frame.push_str(&format!("└{border}┘\n"));
        frame
    }
}

impl<W: Write + Send> DisplayDriver for ConsoleDisplay<W> {
    fn render(&mut self, lines: &[String]) -> Result<(), DisplayFault> {
        let frame = self.frame(lines);
        self.out.write_all(frame.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}
