mod cli;
mod repl;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, CliType, Command};
use libmemscan::{Comparator, LogicalType, Permission, ProcessSelector, Session, Value};
use owo_colors::OwoColorize;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Scan {
            target,
            r#type,
            length,
            value,
            writable_only,
            chunk_size,
            progress,
            window,
            list,
        } => run_scan(
            &target,
            r#type,
            length,
            &value,
            writable_only,
            chunk_size,
            progress,
            window,
            list,
        ),
        Command::Read {
            target,
            address,
            r#type,
            length,
        } => run_read(&target, &address, r#type, length),
        Command::Write {
            target,
            address,
            value,
            r#type,
            length,
        } => run_write(&target, &address, &value, r#type, length),
        Command::Repl {
            target,
            r#type,
            length,
            window,
        } => run_repl(&target, r#type, length, window),
    }
}

/// `-v`/`-vv`/`-vvv` raises the log level shown on stderr; `RUST_LOG` still
/// overrides this when set, matching `env_logger`'s usual precedence.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn selector_for(target: &str, window: bool) -> ProcessSelector {
    if window {
        return ProcessSelector::WindowTitle(target.to_string());
    }
    if target.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(pid) = target.parse::<u32>() {
            return ProcessSelector::Pid(pid);
        }
    }
    ProcessSelector::Name(target.to_string())
}

fn run_scan(
    target: &str,
    ty: CliType,
    length: u8,
    value: &str,
    writable_only: bool,
    chunk_size: Option<usize>,
    progress: bool,
    window: bool,
    list: bool,
) -> Result<()> {
    let session = Session::open(selector_for(target, window), Permission::ReadOnly)
        .context("failed to open target process")?;
    println!("{} attached to pid {}", "[info]".bright_cyan(), session.pid());

    let logical_type: LogicalType = ty.into();
    let parsed = parse_value(logical_type, value)?;

    let cursor = session.search_value(
        logical_type,
        length,
        &parsed,
        Comparator::Equal,
        progress,
        writable_only,
        chunk_size,
    )?;

    let mut count = 0usize;
    for result in cursor {
        let hit = result.context("scan failed")?;
        count += 1;
        if list {
            println!("{}  {:016x}", "[match]".bright_green(), hit.address);
        }
        if let Some(p) = hit.progress {
            if count % 10_000 == 0 {
                eprintln!(
                    "{} {} matches so far ({:.1}%)",
                    "[progress]".bright_black(),
                    count,
                    p.progress * 100.0
                );
            }
        }
    }

    println!("{} {} matches found", "[done]".bright_cyan(), count.to_string().bright_green());
    Ok(())
}

fn run_read(target: &str, address: &str, ty: CliType, length: u8) -> Result<()> {
    let session = Session::open(selector_for(target, false), Permission::ReadOnly)?;
    let addr = parse_address(address)?;
    let logical_type: LogicalType = ty.into();
    let value = session.read(addr, logical_type, length)?;
    println!("{}  {:016x} = {}", "[value]".bright_green(), addr, format_value(&value));
    Ok(())
}

fn run_write(target: &str, address: &str, value: &str, ty: CliType, length: u8) -> Result<()> {
    let session = Session::open(selector_for(target, false), Permission::ReadWrite)?;
    let addr = parse_address(address)?;
    let logical_type: LogicalType = ty.into();
    let parsed = parse_value(logical_type, value)?;
    session.write(addr, logical_type, length, &parsed)?;
    println!("{} wrote {} at {:016x}", "[done]".bright_cyan(), format_value(&parsed), addr);
    Ok(())
}

fn run_repl(target: &str, ty: CliType, length: u8, window: bool) -> Result<()> {
    let session = Session::open(selector_for(target, window), Permission::ReadWrite)?;
    println!("{} attached to pid {}", "[info]".bright_cyan(), session.pid());
    repl::Repl::new(session, ty.into(), length).run()
}

pub(crate) fn parse_value(ty: LogicalType, s: &str) -> Result<Value> {
    Ok(match ty {
        LogicalType::Bool => Value::Bool(matches!(s, "1" | "true" | "yes")),
        LogicalType::Int => Value::Int(s.parse().context("invalid integer value")?),
        LogicalType::Float => Value::Float(s.parse().context("invalid float value")?),
        LogicalType::Text => Value::Text(s.to_string()),
        LogicalType::Bytes => Value::Bytes(libmemscan::parse_hex_pattern(s)?),
    })
}

pub(crate) fn parse_address(s: &str) -> Result<usize> {
    if let Some(hex) = s.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).context("invalid hex address")
    } else {
        s.parse().context("invalid address")
    }
}

pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::Bool(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Text(v) => v.clone(),
        Value::Bytes(v) => v.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" "),
    }
}

/// An in-place arithmetic modification the REPL's `add`/`sub`/`mul`/`div`
/// commands apply to a candidate's current value before writing it back.
#[derive(Debug, Clone, Copy)]
pub(crate) enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Apply `op` to `current` using `operand`, wrapping on integer overflow the
/// way the target's own arithmetic would. `Bool`/`Text`/`Bytes` have no
/// arithmetic meaning and are rejected.
pub(crate) fn apply_math_op(current: &Value, operand: &Value, op: MathOp) -> Result<Value> {
    match (current, operand) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(match op {
            MathOp::Add => a.wrapping_add(*b),
            MathOp::Sub => a.wrapping_sub(*b),
            MathOp::Mul => a.wrapping_mul(*b),
            MathOp::Div => a.checked_div(*b).context("division by zero")?,
        })),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(match op {
            MathOp::Add => a + b,
            MathOp::Sub => a - b,
            MathOp::Mul => a * b,
            MathOp::Div => a / b,
        })),
        _ => anyhow::bail!("arithmetic is only defined for int/float values"),
    }
}
