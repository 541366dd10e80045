//! Terminal output formatting for the `check` and `backtest` commands.

use std::fmt::Display;

use owo_colors::OwoColorize;

pub fn header(version: &str) {
    println!("{} {}", "edgelord-arb".bold(), version.dimmed());
    println!();
}

pub fn section(title: &str) {
    println!();
    println!("{}", title.bold());
}

pub fn field(label: &str, value: impl Display) {
    println!("  {:<20} {}", label.dimmed(), value);
}

pub fn success(message: &str) {
    println!("  {} {}", "\u{2713}".green(), message);
}

pub fn warning(message: &str) {
    println!("  {} {}", "\u{26a0}".yellow(), message);
}

pub fn error(message: &str) {
    eprintln!("  {} {}", "\u{d7}".red(), message);
}

pub fn key_value(label: &str, value: impl Display) {
    field(label, value);
}

pub fn ok(message: &str) {
    success(message);
}
