use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::info;

use capio::buffered::DEFAULT_BUFFER_SIZE;
use capio::util::{content_equals, copy_all, read_full};
use capio::{
    BasicOutput, BufferOptions, BufferedReader, BufferedWriter, ChecksumKind, ChecksumSlot, Close,
    CrcCapture, PartialReader, ReverseBytes, Seekable, StdStream,
};

#[derive(Parser)]
#[command(name = "capio", about = "Windowed, buffered and checksummed file streams")]
struct Cli {
    /// Buffer size in KiB (clamped to 4..=1024)
    #[arg(long, global = true, default_value_t = DEFAULT_BUFFER_SIZE / 1024)]
    buffer_kib: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Checksum a file, or a window of it
    Crc {
        input: PathBuf,
        /// Use OpenPGP CRC-24 instead of CRC-32
        #[arg(long)]
        crc24: bool,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Window size in bytes (default: to end of file)
        #[arg(long)]
        size: Option<u64>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy a window of a file into a new file
    Slice {
        input: PathBuf,
        #[arg(long)]
        offset: u64,
        #[arg(long)]
        size: u64,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write a byte range of a file in reverse order
    Reverse {
        input: PathBuf,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Number of bytes (default: to end of file)
        #[arg(long)]
        count: Option<u64>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Compare two files byte for byte; exits with 1 if they differ
    Cmp {
        left:  PathBuf,
        right: PathBuf,
    },
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli  = Cli::parse();
    let opts = BufferOptions::with_capacity(cli.buffer_kib.saturating_mul(1024));

    match cli.command {

        // ── Crc ──────────────────────────────────────────────────────────────
        Commands::Crc { input, crc24, offset, size, json } => {
            let kind = if crc24 { ChecksumKind::Crc24 } else { ChecksumKind::Crc32 };
            let slot = ChecksumSlot::<u64>::new();
            let window  = PartialReader::with_start(StdStream::open(&input)?, offset, size, false)?;
            let capture = CrcCapture::new(window, kind, slot.clone(), false);
            let mut reader: BufferedReader<_> = BufferedReader::with_options(capture, opts);
            drain(&mut reader, opts.effective_capacity())?;
            reader.close()?;

            let result = slot.get().ok_or("checksum was not published")?;
            if json {
                println!("{}", result.to_json()?);
            } else {
                println!("{}  {}", result, input.display());
            }
        }

        // ── Slice ────────────────────────────────────────────────────────────
        Commands::Slice { input, offset, size, output } => {
            let mut window = PartialReader::with_start(StdStream::open(&input)?, offset, Some(size), false)?;
            let mut writer: BufferedWriter<_> = BufferedWriter::with_options(StdStream::create(&output)?, opts);
            let copied = copy_all(&mut window, &mut writer, None)?;
            writer.close()?;
            window.close()?;
            if copied < size {
                eprintln!("warning: input ended after {copied} of {size} byte(s)");
            }
            println!("Wrote {copied} byte(s) → {}", output.display());
        }

        // ── Reverse ──────────────────────────────────────────────────────────
        Commands::Reverse { input, offset, count, output } => {
            let mut file = StdStream::open(&input)?;
            let count = match count {
                Some(n) => n,
                None    => file.length()?.saturating_sub(offset),
            };
            let mut rev = ReverseBytes::new(file, offset, count, false)?;
            let mut writer: BufferedWriter<_> = BufferedWriter::with_options(StdStream::create(&output)?, opts);
            let mut chunk = Vec::with_capacity(opts.effective_capacity());
            for byte in rev.by_ref() {
                chunk.push(byte?);
                if chunk.len() == chunk.capacity() {
                    writer.write_all(&chunk)?;
                    chunk.clear();
                }
            }
            writer.write_all(&chunk)?;
            writer.close()?;
            rev.close()?;
            println!("Reversed {count} byte(s) → {}", output.display());
        }

        // ── Cmp ──────────────────────────────────────────────────────────────
        Commands::Cmp { left, right } => {
            let mut a: BufferedReader<_> = BufferedReader::with_options(StdStream::open(&left)?, opts);
            let mut b: BufferedReader<_> = BufferedReader::with_options(StdStream::open(&right)?, opts);
            let same = content_equals(&mut a, &mut b)?;
            a.close()?;
            b.close()?;
            report_cmp(&left, &right, same);
            if !same {
                return Ok(ExitCode::from(1));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn drain<S: capio::BasicInput>(input: &mut S, chunk: usize) -> capio::Result<u64> {
    let mut buf   = vec![0u8; chunk];
    let mut total = 0u64;
    loop {
        match read_full(input, &mut buf)? {
            0 => break,
            n => total += n as u64,
        }
    }
    info!("read {total} byte(s)");
    Ok(total)
}

fn report_cmp(left: &Path, right: &Path, same: bool) {
    if same {
        println!("{} and {} are identical", left.display(), right.display());
    } else {
        println!("{} and {} differ", left.display(), right.display());
    }
}
