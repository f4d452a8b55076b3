//! Output formatting for CLI

use crate::{
    Result,
    pipeline::{Snapshot, Status},
    ports::Observer,
};

/// Print a section header
pub fn print_section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:20} {}", format!("{}:", key), value);
}

/// Render a value map with fixed-width cells, one grid row per line
pub fn format_value_table(values: &[Vec<f64>]) -> String {
    values
        .iter()
        .map(|row| {
            row.iter()
                .map(|value| format!("{value:6.2}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print the final value table
pub fn print_value_table(values: &[Vec<f64>]) {
    if values.is_empty() {
        return;
    }
    println!("value table:");
    println!("{}", format_value_table(values));
}

/// Prints one line per finished episode
#[derive(Debug, Default)]
pub struct EpisodePrinter;

impl Observer for EpisodePrinter {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.status == Status::EpisodeComplete {
            println!(
                "episode {}: reward={:.2} steps={}",
                snapshot.episode, snapshot.episode_reward, snapshot.episode_steps
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value_table() {
        let table = format_value_table(&[vec![0.0, 1.5], vec![-0.25, 10.0]]);
        assert_eq!(table, "  0.00   1.50\n -0.25  10.00");
    }
}
