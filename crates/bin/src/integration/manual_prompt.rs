//! Interactive entry of per-period returns.

use ff5_data::DataError;
use ff5_data::manual::{MANUAL_COLUMNS, ManualEntryBuilder, ManualSeries, parse_value};
use std::io::{self, BufRead, Write};

/// Prompt for `periods` rows of `Stock, RF, Mkt-RF, SMB, HML, RMW, CMA`.
///
/// Invalid values are reported and asked for again; a row that fails the
/// row-level checks is entered again from its first field.
pub(crate) fn prompt_periods<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    periods: usize,
) -> Result<ManualSeries, DataError> {
    writeln!(output, "Enter returns as decimals (0.01 = 1%) for {periods} periods.")?;

    let mut builder = ManualEntryBuilder::new();
    while builder.len() < periods {
        let row = builder.len() + 1;
        writeln!(output, "Period {row}:")?;

        let mut fields = Vec::with_capacity(MANUAL_COLUMNS.len());
        for column in MANUAL_COLUMNS {
            fields.push(prompt_value(input, output, row, column)?);
        }

        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        if let Err(e) = builder.push_fields(&fields) {
            writeln!(output, "  {e}; please re-enter period {row}.")?;
        }
    }

    builder.build()
}

fn prompt_value<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    row: usize,
    column: &str,
) -> Result<String, DataError> {
    loop {
        write!(output, "  {column}: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(DataError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("input ended before period {row} was complete"),
            )));
        }

        match parse_value(row, column, &line) {
            Ok(_) => return Ok(line.trim().to_string()),
            Err(e) => writeln!(output, "  {e}")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(text: &str, periods: usize) -> (Result<ManualSeries, DataError>, String) {
        let mut input = Cursor::new(text.as_bytes().to_vec());
        let mut output = Vec::new();
        let result = prompt_periods(&mut input, &mut output, periods);
        (result, String::from_utf8(output).unwrap())
    }

    const PERIOD: &str = "0.02\n0.001\n0.015\n0.0\n0.0\n0.0\n0.0\n";

    #[test]
    fn reads_requested_periods() {
        let (result, transcript) = run(&PERIOD.repeat(3), 3);
        let series = result.unwrap();

        assert_eq!(series.stock.len(), 3);
        assert_eq!(series.stock[&1], 0.02);
        assert_eq!(series.factors[&3].risk_free, 0.001);
        assert!(transcript.contains("Period 3:"));
        assert!(transcript.contains("  Mkt-RF: "));
    }

    #[test]
    fn reprompts_for_non_numeric_values() {
        let text = format!("abc\n{PERIOD}{PERIOD}");
        let (result, transcript) = run(&text, 2);

        assert_eq!(result.unwrap().stock.len(), 2);
        assert_eq!(transcript.matches("  Stock: ").count(), 3);
    }

    #[test]
    fn reenters_a_row_with_impossible_return() {
        // A stock return of -150% parses but fails the row checks.
        let bad = "-1.5\n0.001\n0.015\n0.0\n0.0\n0.0\n0.0\n";
        let text = format!("{bad}{PERIOD}{PERIOD}");
        let (result, transcript) = run(&text, 2);

        assert_eq!(result.unwrap().stock.len(), 2);
        assert!(transcript.contains("please re-enter period 1"));
    }

    #[test]
    fn early_end_of_input_is_an_error() {
        let (result, _) = run("0.02\n0.001\n", 2);
        assert!(matches!(result, Err(DataError::Io(_))));
    }
}
