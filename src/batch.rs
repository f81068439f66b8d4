//! File and directory driver around [`run_pipeline`].
//!
//! A directory is processed non-recursively: every regular file directly
//! inside it is run through the pipeline on a rayon pool and written under
//! the same name in the output directory. One file failing does not stop the
//! others; the failure is logged and counted in the [`BatchReport`].

use crate::buffer::ByteBuffer;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::run_pipeline;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Sizes recorded for one successfully processed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_len: u64,
    pub output_len: u64,
}

/// Outcome of one file within a batch.
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: Result<FileReport>,
}

/// Per-file outcomes of a run, in input path order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.input.as_path(), e)))
    }

    pub fn bytes_in(&self) -> u64 {
        self.reports().map(|r| r.input_len).sum()
    }

    pub fn bytes_out(&self) -> u64 {
        self.reports().map(|r| r.output_len).sum()
    }

    fn reports(&self) -> impl Iterator<Item = &FileReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }
}

/// Reads `input`, runs the configured pipeline and writes `output`.
///
/// Nothing is written if any stage fails.
pub fn process_file(input: &Path, output: &Path, config: &Config) -> Result<FileReport> {
    log::info!("processing {} -> {}", input.display(), output.display());
    let data = fs::read(input).map_err(|e| Error::io(input, e))?;
    let input_len = data.len() as u64;

    let result = run_pipeline(ByteBuffer::from(data), config.operations, config)?;
    fs::write(output, result.as_slice()).map_err(|e| Error::io(output, e))?;

    log::debug!(
        "{}: {} -> {} bytes",
        input.display(),
        input_len,
        result.len()
    );
    Ok(FileReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        input_len,
        output_len: result.len() as u64,
    })
}

/// Regular files directly inside `dir`, sorted by path.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Processes every regular file in `config.input` into `config.output`.
///
/// Returns `Err` only when the batch cannot start (unreadable input
/// directory, output directory not creatable, pool not buildable). Per-file
/// failures are reported in the returned [`BatchReport`].
pub fn process_directory(config: &Config) -> Result<BatchReport> {
    let files = list_files(&config.input)?;
    if !config.output.is_dir() {
        fs::create_dir_all(&config.output).map_err(|e| Error::io(&config.output, e))?;
    }
    if files.is_empty() {
        log::warn!("no regular files in {}", config.input.display());
        return Ok(BatchReport::default());
    }

    let workers = config.threads.min(files.len()).max(1);
    log::info!(
        "processing {} files from {} with {} workers",
        files.len(),
        config.input.display(),
        workers
    );
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("packcrypt-worker-{}", i))
        .build()
        .map_err(|e| Error::Thread(e.to_string()))?;

    let outcomes = pool.install(|| {
        files
            .par_iter()
            .map(|input| {
                let output = match input.file_name() {
                    Some(name) => config.output.join(name),
                    None => config.output.clone(),
                };
                let result = process_file(input, &output, config);
                if let Err(err) = &result {
                    log::error!(
                        "{} failed ({}): {}",
                        input.display(),
                        err.kind().exit_code(),
                        err
                    );
                }
                FileOutcome {
                    input: input.clone(),
                    result,
                }
            })
            .collect::<Vec<_>>()
    });

    Ok(BatchReport { outcomes })
}

/// Dispatches on whether `config.input` is a directory or a single file.
pub fn run(config: &Config) -> Result<BatchReport> {
    let metadata = fs::metadata(&config.input).map_err(|_| {
        Error::InvalidInput(format!(
            "input path {} does not exist",
            config.input.display()
        ))
    })?;

    if metadata.is_dir() {
        return process_directory(config);
    }

    let result = process_file(&config.input, &config.output, config);
    if let Err(err) = &result {
        log::error!("{} failed: {}", config.input.display(), err);
    }
    Ok(BatchReport {
        outcomes: vec![FileOutcome {
            input: config.input.clone(),
            result,
        }],
    })
}
