use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;
use palindrome_checker::verdict;

/// Check whether a string is a palindrome (case-insensitive)
#[derive(Parser)]
#[command(name = "palindrome-checker")]
#[command(version = "0.1.0")]
struct Cli {
    /// String to check; read from stdin when omitted
    input: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let input = match cli.input {
        Some(s) => s,
        None => prompt("Enter a string to check: ")?,
    };

    println!("{}", verdict(&input));
    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{message}")?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
