use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::arch::tilemm::{Phase, TickReport};
use crate::error::Result;

/// JSON-lines trace: one object per phase change and per C write.
pub struct TraceWriter {
  writer: Option<BufWriter<Box<dyn Write>>>,
  last_phase: Option<Phase>,
}

impl TraceWriter {
  pub fn disabled() -> Self {
    Self {
      writer: None,
      last_phase: None,
    }
  }

  /// Open `path` for writing; an empty path disables tracing.
  pub fn create(path: &str) -> Result<Self> {
    if path.is_empty() {
      return Ok(Self::disabled());
    }
    let file = File::create(path)?;
    Ok(Self::from_writer(Box::new(file)))
  }

  pub fn from_writer(writer: Box<dyn Write>) -> Self {
    Self {
      writer: Some(BufWriter::new(writer)),
      last_phase: None,
    }
  }

  pub fn is_enabled(&self) -> bool {
    self.writer.is_some()
  }

  pub fn record_tick(&mut self, report: &TickReport) -> Result<()> {
    let Some(writer) = self.writer.as_mut() else {
      return Ok(());
    };
    if self.last_phase != Some(report.phase) {
      let entry = json!({
        "cycle": report.cycle,
        "event": "phase",
        "phase": report.phase,
      });
      writeln!(writer, "{}", entry)?;
      self.last_phase = Some(report.phase);
    }
    if let Some((addr, word)) = &report.c_write {
      let entry = json!({
        "cycle": report.cycle,
        "event": "c_write",
        "addr": addr,
        "word": word,
      });
      writeln!(writer, "{}", entry)?;
    }
    Ok(())
  }

  /// Routed event-simulation message.
  pub fn record_message(&mut self, message: &sim::simulator::Message) -> Result<()> {
    let Some(writer) = self.writer.as_mut() else {
      return Ok(());
    };
    let entry = json!({
      "time": message.time(),
      "source": message.source_id(),
      "source_port": message.source_port(),
      "target": message.target_id(),
      "target_port": message.target_port(),
      "content": message.content(),
    });
    writeln!(writer, "{}", entry)?;
    Ok(())
  }

  pub fn finish(&mut self) -> Result<()> {
    if let Some(writer) = self.writer.as_mut() {
      writer.flush()?;
    }
    Ok(())
  }
}
