use clap::{Parser, Subcommand, ValueEnum, builder::styling::AnsiColor};

/// MemScan – inspect and edit another process's memory.
#[derive(Parser, Debug)]
#[command(
    name = "memscan",
    bin_name = "memscan",
    about = "A cross-platform process memory scanner and editor",
    version,
    propagate_version = true,
    arg_required_else_help = true,
    styles = clap::builder::Styles::styled()
        .header(AnsiColor::BrightYellow.on_default())
        .usage(AnsiColor::BrightYellow.on_default())
        .literal(AnsiColor::BrightGreen.on_default())
        .placeholder(AnsiColor::BrightCyan.on_default())
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// The logical type of a value read, written, or scanned for.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum CliType {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a process's memory for a value, narrowing by predicate.
    Scan {
        /// Target process: pid, executable name, or (Windows) window title.
        target: String,

        /// Logical type of the value being searched for.
        #[arg(short = 't', long, value_enum, default_value = "int")]
        r#type: CliType,

        /// Byte width for Int/Text/Bytes values (ignored for Bool/Float).
        #[arg(short = 'l', long, default_value_t = 4)]
        length: u8,

        /// The value to search for (e.g. "42", "3.14", "HELLO", or hex for Bytes).
        value: String,

        /// Only consider writable regions.
        #[arg(short = 'w', long)]
        writable_only: bool,

        /// Per-region read chunk size in bytes (defaults to the scanner's
        /// built-in cap; regions larger than this are streamed in pieces).
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Report a running progress fraction over the total scannable
        /// memory while the scan is in flight.
        #[arg(long)]
        progress: bool,

        /// Treat `target` as a window title instead of a pid/name.
        #[arg(long)]
        window: bool,

        /// Print every match address instead of just the count.
        #[arg(long)]
        list: bool,
    },

    /// Read a single typed value at an address.
    Read {
        target: String,

        /// Address to read, decimal or 0x-prefixed hex.
        address: String,

        #[arg(short = 't', long, value_enum, default_value = "int")]
        r#type: CliType,

        #[arg(short = 'l', long, default_value_t = 4)]
        length: u8,
    },

    /// Write a single typed value at an address.
    Write {
        target: String,

        address: String,

        value: String,

        #[arg(short = 't', long, value_enum, default_value = "int")]
        r#type: CliType,

        #[arg(short = 'l', long, default_value_t = 4)]
        length: u8,
    },

    /// Start an interactive first-scan/next-scan session.
    Repl {
        target: String,

        #[arg(short = 't', long, value_enum, default_value = "int")]
        r#type: CliType,

        #[arg(short = 'l', long, default_value_t = 4)]
        length: u8,

        #[arg(long)]
        window: bool,
    },
}

impl From<CliType> for libmemscan::LogicalType {
    fn from(t: CliType) -> Self {
        match t {
            CliType::Bool => libmemscan::LogicalType::Bool,
            CliType::Int => libmemscan::LogicalType::Int,
            CliType::Float => libmemscan::LogicalType::Float,
            CliType::Text => libmemscan::LogicalType::Text,
            CliType::Bytes => libmemscan::LogicalType::Bytes,
        }
    }
}
