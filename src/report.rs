//! Result reporting module
//!
//! Renders [`BenchResult`]s as an aligned text table or as JSON.

use crate::bench::BenchResult;
use crate::error::Result;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Report output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// Format nanoseconds with the largest unit that keeps the value at or above one
pub fn format_duration(nanos: f64) -> String {
    if nanos >= 1e9 {
        format!("{:.3} s", nanos / 1e9)
    } else if nanos >= 1e6 {
        format!("{:.3} ms", nanos / 1e6)
    } else if nanos >= 1e3 {
        format!("{:.3} µs", nanos / 1e3)
    } else {
        format!("{nanos:.0} ns")
    }
}

/// Write `results` to `writer` in the requested format
pub fn write_report<W: Write>(
    results: &[BenchResult],
    format: OutputFormat,
    mut writer: W,
) -> Result<()> {
    match format {
        OutputFormat::Text => write_text(results, &mut writer)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, results)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn write_text<W: Write>(results: &[BenchResult], writer: &mut W) -> Result<()> {
    let name_width = results
        .iter()
        .map(|result| result.name.chars().count())
        .chain(std::iter::once("name".len()))
        .max()
        .unwrap_or(4);

    writeln!(
        writer,
        "{:<name_width$}  {:>12}  {:>14}  {:>14}  {:>14}",
        "name", "iterations", "total", "per iter", "ops/sec"
    )?;

    for result in results {
        writeln!(
            writer,
            "{:<name_width$}  {:>12}  {:>14}  {:>14}  {:>14.1}",
            result.name,
            result.iterations,
            format_duration(result.total as f64),
            format_duration(result.per_iteration()),
            result.ops_per_sec()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Vec<BenchResult> {
        vec![
            BenchResult {
                name: "sync".to_owned(),
                total: 2_500_000,
                iterations: 10,
            },
            BenchResult {
                name: "a-much-longer-name".to_owned(),
                total: 1_000_000_000,
                iterations: 1000,
            },
        ]
    }

    /// **What is tested:** Unit selection in format_duration
    /// **Why it is tested:** Reports should be readable at every scale
    /// **Test conditions:** Values in ns, µs, ms and s ranges
    /// **Expectations:** Matching unit suffix and precision
    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(512.0), "512 ns");
        assert_eq!(format_duration(1_500.0), "1.500 µs");
        assert_eq!(format_duration(250_000.0 * 10.0), "2.500 ms");
        assert_eq!(format_duration(3e9), "3.000 s");
    }

    /// **What is tested:** Text report layout
    /// **Why it is tested:** Each result gets one aligned row under a header
    /// **Test conditions:** Two results with names of different lengths
    /// **Expectations:** Header plus two rows, each row carrying name and derived figures
    #[test]
    fn test_text_report() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut output = Vec::new();
        write_report(&sample(), OutputFormat::Text, &mut output)?;

        let text = String::from_utf8(output)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("name"));
        assert!(lines[1].starts_with("sync "));
        assert!(lines[1].contains("2.500 ms"));
        assert!(lines[1].contains("250.000 µs"));
        assert!(lines[2].contains("1000.0"));
        Ok(())
    }

    /// **What is tested:** JSON report contents
    /// **Why it is tested:** Machine-readable output must parse back into results
    /// **Test conditions:** Writes the sample results as JSON
    /// **Expectations:** Deserializes to the same results
    #[test]
    fn test_json_report() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut output = Vec::new();
        write_report(&sample(), OutputFormat::Json, &mut output)?;

        let parsed: Vec<BenchResult> = serde_json::from_slice(&output)?;
        assert_eq!(parsed, sample());
        Ok(())
    }

    /// **What is tested:** OutputFormat parsing and display
    /// **Why it is tested:** Format names come from CLI flags and environment variables
    /// **Test conditions:** Mixed case and unknown names
    /// **Expectations:** Case-insensitive match, error for unknown names, Display round-trips
    #[test]
    fn test_output_format_from_str() {
        assert_eq!("Text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert_eq!(" json ".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("csv".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    proptest! {
        /// Every duration renders with exactly one known unit.
        #[test]
        fn prop_format_duration_has_unit(nanos in 0.0f64..1e12) {
            let rendered = format_duration(nanos);
            let units = ["ns", "µs", "ms", " s"];
            prop_assert_eq!(units.iter().filter(|unit| rendered.ends_with(*unit)).count(), 1);
        }

        /// Per-iteration time times iterations recovers the total.
        #[test]
        fn prop_per_iteration_consistent(total in 0u64..1_000_000_000_000, iterations in 1u64..1_000_000) {
            let result = BenchResult { name: "p".to_owned(), total, iterations };
            let recovered = result.per_iteration() * iterations as f64;
            prop_assert!((recovered - total as f64).abs() <= 1e-6 * (total as f64).max(1.0));
        }
    }
}
