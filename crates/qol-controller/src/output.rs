//! Output formatting

use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
}

impl OutputFormat {
    pub fn print<T: Serialize>(&self, data: &T) -> anyhow::Result<()> {
        let text = match self {
            OutputFormat::Json => serde_json::to_string(data)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(data)?,
        };
        println!("{}", text);
        Ok(())
    }
}
