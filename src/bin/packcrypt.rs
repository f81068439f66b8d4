//! packcrypt CLI
//! Usage:
//!   packcrypt -ce -i <input> -o <output> -k <key> [--comp-alg ALG] [--enc-alg ALG]
//!   packcrypt -ud -i <input> -o <output> -k <key> [--comp-alg ALG] [--enc-alg ALG]

use log::LevelFilter;
use packcrypt::batch;
use packcrypt::config::{usage, Config, ParseOutcome};
use std::io::Write;
use std::time::Instant;
use std::{env, process};

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    builder.format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()));
    // RUST_LOG, when set, overrides the level chosen above.
    builder.parse_default_env();
    let _ = builder.try_init();
}

fn main() {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "packcrypt".to_string());

    let config = match Config::from_args(args) {
        Ok(ParseOutcome::Run(config)) => config,
        Ok(ParseOutcome::Help) => {
            print!("{}", usage(&program));
            return;
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            eprintln!("Try '{} --help' for usage.", program);
            process::exit(1);
        }
    };

    init_logging(config.verbose);

    if let Err(err) = config.validate() {
        log::error!("{}", err);
        process::exit(1);
    }

    log::info!(
        "operations: {}, compression: {}, encryption: {}, threads: {}",
        config.operations,
        config.compression,
        config.cipher,
        config.threads
    );
    log::info!("input: {}", config.input.display());
    log::info!("output: {}", config.output.display());

    let started = Instant::now();
    let report = match batch::run(&config) {
        Ok(report) => report,
        Err(err) => {
            log::error!("{}", err);
            process::exit(1);
        }
    };
    let elapsed = started.elapsed();

    println!(
        "Done. {} file(s) processed, {} failed, {} bytes -> {} bytes in {:.2?}",
        report.succeeded(),
        report.failed(),
        report.bytes_in(),
        report.bytes_out(),
        elapsed
    );
    for (path, err) in report.failures() {
        eprintln!("  {}: {} (status {})", path.display(), err, err.kind().exit_code());
    }

    if !report.is_success() {
        process::exit(1);
    }
}
