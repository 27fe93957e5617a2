use crate::domain::outcome::Outcome;
use crate::error::Result;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Text,
}

/// Writes reconciliation outcomes to any `Write` sink (e.g. stdout).
pub struct OutcomeWriter<W: Write> {
    writer: W,
    format: ReportFormat,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(writer: W, format: ReportFormat) -> Self {
        Self { writer, format }
    }

    pub fn write_outcome(&mut self, outcome: &Outcome) -> Result<()> {
        match self.format {
            ReportFormat::Json => {
                serde_json::to_writer(&mut self.writer, outcome)?;
                writeln!(self.writer)?;
            }
            ReportFormat::Text => self.write_text(outcome)?,
        }
        self.writer.flush()?;
        Ok(())
    }

    fn write_text(&mut self, outcome: &Outcome) -> Result<()> {
        writeln!(self.writer, "status: {}", outcome.phase.name())?;
        writeln!(self.writer, "message: {}", outcome.message)?;
        if let Some(action) = outcome.recovery {
            writeln!(self.writer, "next: {}", action.label())?;
        }
        if let Some(id) = &outcome.intention_id {
            writeln!(self.writer, "intention: {id}")?;
        }
        if let (Some(initial), Some(last)) = (outcome.initial_balance, outcome.final_balance) {
            writeln!(self.writer, "balance: {initial} -> {last}")?;
        }
        writeln!(self.writer, "polls: {}", outcome.poll_count)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::callback::CallbackParams;
    use crate::domain::money::Balance;
    use crate::domain::reconciliation::{Phase, ReconciliationState};
    use rust_decimal_macros::dec;

    fn success_outcome() -> Outcome {
        let mut state = ReconciliationState::new();
        state.capture_initial(Some(Balance::new(dec!(50)))).unwrap();
        state.observe(Some(Balance::new(dec!(150.00)))).unwrap();
        state.finish(Phase::Success).unwrap();
        let params = CallbackParams::from_query("intention_id=int_9&status=successful&amount=100");
        Outcome::from_state(&state, &params)
    }

    #[test]
    fn test_write_json_line() {
        let mut buf = Vec::new();
        OutcomeWriter::new(&mut buf, ReportFormat::Json)
            .write_outcome(&success_outcome())
            .unwrap();

        let output = String::from_utf8(buf).unwrap();
        assert!(output.ends_with('\n'));
        let json: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(json["phase"], "success");
        assert_eq!(json["recovery"], "view_wallet");
        assert_eq!(json["intention_id"], "int_9");
    }

    #[test]
    fn test_write_text() {
        let mut buf = Vec::new();
        OutcomeWriter::new(&mut buf, ReportFormat::Text)
            .write_outcome(&success_outcome())
            .unwrap();

        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("status: success"));
        assert!(output.contains("next: View wallet"));
        assert!(output.contains("balance: 50 -> 150"));
        assert!(output.contains("polls: 0"));
    }
}
