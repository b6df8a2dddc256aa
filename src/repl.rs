//! REPL (Read-Eval-Print Loop) for interactive memory scanning: a thin
//! first-scan/next-scan front-end over `Session`, bookkeeping the current
//! candidate address set at the CLI layer rather than in the library.

use crate::{MathOp, apply_math_op, format_value, parse_address, parse_value};
use anyhow::{Result, bail};
use libmemscan::{Comparator, LogicalType, Session};
use owo_colors::OwoColorize;
use std::io::{self, Write};

pub struct Repl {
    session: Session,
    logical_type: LogicalType,
    length: u8,
    candidates: Vec<usize>,
}

impl Repl {
    pub fn new(session: Session, logical_type: LogicalType, length: u8) -> Self {
        Self {
            session,
            logical_type,
            length,
            candidates: Vec::new(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        println!("{}", "=== Interactive Memory Scanner ===".bright_yellow().bold());
        println!("{} Type 'help' for available commands", "[info]".bright_cyan());
        println!();

        loop {
            print!("{} ", ">".bright_yellow().bold());
            io::stdout().flush()?;

            let mut input = String::new();
            if io::stdin().read_line(&mut input)? == 0 {
                break;
            }
            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match self.handle_command(input) {
                Ok(should_continue) => {
                    if !should_continue {
                        break;
                    }
                }
                Err(e) => println!("{} {}", "[error]".bright_red(), e),
            }
        }

        Ok(())
    }

    fn handle_command(&mut self, input: &str) -> Result<bool> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        match parts[0] {
            "help" | "h" => self.print_help(),
            "scan" => self.first_scan(&parts[1..])?,
            "next" | "narrow" => self.next_scan(&parts[1..])?,
            "list" | "l" => self.list_matches(),
            "set" | "s" => self.set_value(&parts[1..])?,
            "add" => self.math_op(MathOp::Add, &parts[1..])?,
            "sub" => self.math_op(MathOp::Sub, &parts[1..])?,
            "mul" => self.math_op(MathOp::Mul, &parts[1..])?,
            "div" => self.math_op(MathOp::Div, &parts[1..])?,
            "quit" | "q" | "exit" => {
                println!("{} Exiting...", "[info]".bright_cyan());
                return Ok(false);
            }
            other => {
                println!("{} Unknown command: {}", "[error]".bright_red(), other);
                println!("Type 'help' for available commands");
            }
        }
        Ok(true)
    }

    fn print_help(&self) {
        println!("{}", "Available commands:".bright_yellow().bold());
        println!("  {} - Show this help", "help, h".green());
        println!("  {} - First scan: replace candidates with every address matching value", "scan <value>".green());
        println!("  {} - Next scan: keep only candidates still matching value", "next <value>".green());
        println!("  {} - List current candidate addresses (max 20)", "list, l".green());
        println!("  {} - Write value at address(es)", "set <value> [address]".green());
        println!("  {} - Add/subtract/multiply/divide every candidate by a value", "add|sub|mul|div <value>".green());
        println!("  {} - Exit the REPL", "quit, q, exit".green());
        println!();
        println!(
            "{} If no address is given to 'set', the value is written to every candidate",
            "[note]".bright_black()
        );
    }

    fn first_scan(&mut self, args: &[&str]) -> Result<()> {
        let Some(raw) = args.first() else {
            bail!("usage: scan <value>");
        };
        let value = parse_value(self.logical_type, raw)?;
        let cursor = self.session.search_value(
            self.logical_type,
            self.length,
            &value,
            Comparator::Equal,
            false,
            false,
            None,
        )?;
        self.candidates = cursor.filter_map(|r| r.ok()).map(|hit| hit.address).collect();
        println!(
            "{} found {} candidate addresses",
            "[done]".bright_cyan(),
            self.candidates.len().to_string().bright_green()
        );
        Ok(())
    }

    fn next_scan(&mut self, args: &[&str]) -> Result<()> {
        let Some(raw) = args.first() else {
            bail!("usage: next <value>");
        };
        if self.candidates.is_empty() {
            bail!("no candidates yet; run 'scan <value>' first");
        }
        let value = parse_value(self.logical_type, raw)?;
        let before = self.candidates.len();
        self.candidates = self
            .session
            .search_by_addresses(&self.candidates, self.logical_type, self.length)?
            .into_iter()
            .filter(|(_, current)| *current == value)
            .map(|(addr, _)| addr)
            .collect();
        println!(
            "{} narrowed from {} to {} candidates",
            "[done]".bright_cyan(),
            before.to_string().bright_yellow(),
            self.candidates.len().to_string().bright_green()
        );
        Ok(())
    }

    fn list_matches(&self) {
        println!("{} candidates", self.candidates.len().to_string().bright_green());
        let display_count = self.candidates.len().min(20);
        for (i, addr) in self.candidates.iter().take(display_count).enumerate() {
            let value = self.session.read(*addr, self.logical_type, self.length);
            let value_str = value.map(|v| format_value(&v)).unwrap_or_else(|e| format!("<{e}>"));
            println!(
                "  {}: {} = {}",
                i.to_string().bright_black(),
                format!("{addr:016x}").bright_yellow(),
                value_str.bright_green()
            );
        }
        if self.candidates.len() > display_count {
            println!(
                "  {} ... and {} more",
                "[...]".bright_black(),
                (self.candidates.len() - display_count).to_string().bright_black()
            );
        }
    }

    /// Apply an arithmetic operation to every candidate's current value and
    /// write the result back in place, e.g. `add 5` increments every match.
    fn math_op(&mut self, op: MathOp, args: &[&str]) -> Result<()> {
        let Some(raw) = args.first() else {
            bail!("usage: add|sub|mul|div <value>");
        };
        if self.candidates.is_empty() {
            bail!("no candidates yet; run 'scan <value>' first");
        }
        let operand = parse_value(self.logical_type, raw)?;

        let mut count = 0;
        for &addr in &self.candidates {
            let Ok(current) = self.session.read(addr, self.logical_type, self.length) else {
                continue;
            };
            let Ok(next) = apply_math_op(&current, &operand, op) else {
                continue;
            };
            if self.session.write(addr, self.logical_type, self.length, &next).is_ok() {
                count += 1;
            }
        }
        println!(
            "{} modified {} of {} candidates",
            "[done]".bright_cyan(),
            count.to_string().bright_green(),
            self.candidates.len().to_string().bright_yellow()
        );
        Ok(())
    }

    fn set_value(&mut self, args: &[&str]) -> Result<()> {
        let Some(raw) = args.first() else {
            bail!("usage: set <value> [address]");
        };
        let value = parse_value(self.logical_type, raw)?;

        if let Some(addr_str) = args.get(1) {
            let addr = parse_address(addr_str)?;
            self.session.write(addr, self.logical_type, self.length, &value)?;
            println!("{} wrote value at {:016x}", "[done]".bright_cyan(), addr);
        } else {
            let mut count = 0;
            for &addr in &self.candidates {
                if self.session.write(addr, self.logical_type, self.length, &value).is_ok() {
                    count += 1;
                }
            }
            println!(
                "{} wrote value at {} addresses",
                "[done]".bright_cyan(),
                count.to_string().bright_green()
            );
        }
        Ok(())
    }
}
