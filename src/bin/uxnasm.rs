use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use uxn::asm;

/// Assembles a tal source file into a raw uxn ROM.
#[derive(Parser, Debug)]
#[command(name = "uxnasm")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source file to assemble
    input: PathBuf,
    /// ROM file to write
    output: PathBuf,
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Warn })
        .init();

    let assembled = match asm::assemble(&args.input) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("uxnasm: {e}");
            return ExitCode::FAILURE;
        }
    };
    log::info!("assembled {} bytes, {} labels", assembled.rom.len(), assembled.symbols.len());

    if let Err(e) = std::fs::write(&args.output, &assembled.rom) {
        eprintln!("uxnasm: could not write {:?}: {e}", args.output);
        return ExitCode::FAILURE;
    }

    let mut sym_path = args.output.clone();
    let mut sym_name = sym_path.file_name().unwrap_or_default().to_os_string();
    sym_name.push(".sym");
    sym_path.set_file_name(sym_name);
    let sym_bytes = asm::write_symbols(&assembled.symbols);
    if let Err(e) = std::fs::write(&sym_path, &sym_bytes) {
        eprintln!("uxnasm: could not write {sym_path:?}: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
