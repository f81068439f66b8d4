//! Run configuration: command-line parsing and validation.
//!
//! Short flags may be combined (`-ce`, `-duv`). A flag that takes a value
//! (`-i`, `-o`, `-k`, `-t`) may only appear last in a combined group, and its
//! value is the next argument.

use crate::compression::CompressionAlgorithm;
use crate::error::{Error, Result};
use crate::pipeline::Operations;
use crate::security::{CipherAlgorithm, MAX_PASSPHRASE_LEN};
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroize;

pub const DEFAULT_THREADS: usize = 4;
pub const MAX_THREADS: usize = 16;

/// The user's passphrase, wiped when dropped and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(Vec<u8>);

impl Passphrase {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Passphrase {
    fn from(s: String) -> Self {
        Passphrase(s.into_bytes())
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Passphrase(s.as_bytes().to_vec())
    }
}

impl Drop for Passphrase {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase([REDACTED])")
    }
}

/// Everything a run needs: what to do, with which algorithms, on which paths.
#[derive(Debug, Clone)]
pub struct Config {
    pub operations: Operations,
    pub compression: CompressionAlgorithm,
    pub cipher: CipherAlgorithm,
    pub input: PathBuf,
    pub output: PathBuf,
    pub key: Option<Passphrase>,
    pub threads: usize,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            operations: Operations::NONE,
            compression: CompressionAlgorithm::default(),
            cipher: CipherAlgorithm::default(),
            input: PathBuf::new(),
            output: PathBuf::new(),
            key: None,
            threads: DEFAULT_THREADS,
            verbose: false,
        }
    }
}

/// Result of parsing the command line.
#[derive(Debug)]
pub enum ParseOutcome {
    Run(Config),
    Help,
}

fn parse_threads(value: &str) -> Result<usize> {
    let threads: usize = value
        .parse()
        .map_err(|_| Error::InvalidInput(format!("invalid thread count '{}'", value)))?;
    if !(1..=MAX_THREADS).contains(&threads) {
        return Err(Error::InvalidInput(format!(
            "thread count must be between 1 and {}, got {}",
            MAX_THREADS, threads
        )));
    }
    Ok(threads)
}

impl Config {
    /// Parses arguments, not including the program name.
    ///
    /// Only syntax is checked here; call [`Config::validate`] before running.
    pub fn from_args<I, S>(args: I) -> Result<ParseOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            let mut value_for = |flag: &str| {
                args.next()
                    .ok_or_else(|| Error::InvalidInput(format!("missing argument for {}", flag)))
            };

            match arg.as_str() {
                "-h" | "--help" => return Ok(ParseOutcome::Help),
                "--comp-alg" => config.compression = value_for("--comp-alg")?.parse()?,
                "--enc-alg" => config.cipher = value_for("--enc-alg")?.parse()?,
                flags if flags.len() > 1 && flags.starts_with('-') && !flags.starts_with("--") => {
                    let letters: Vec<char> = flags[1..].chars().collect();
                    for (pos, &letter) in letters.iter().enumerate() {
                        let is_last = pos + 1 == letters.len();
                        let needs_value = matches!(letter, 'i' | 'o' | 'k' | 't');
                        if needs_value && !is_last {
                            return Err(Error::InvalidInput(format!(
                                "-{} must be the last flag in a combined group",
                                letter
                            )));
                        }
                        match letter {
                            'c' => config.operations.insert(Operations::COMPRESS),
                            'd' => config.operations.insert(Operations::DECOMPRESS),
                            'e' => config.operations.insert(Operations::ENCRYPT),
                            'u' => config.operations.insert(Operations::DECRYPT),
                            'v' => config.verbose = true,
                            'h' => return Ok(ParseOutcome::Help),
                            'i' => config.input = PathBuf::from(value_for("-i")?),
                            'o' => config.output = PathBuf::from(value_for("-o")?),
                            'k' => config.key = Some(Passphrase::from(value_for("-k")?)),
                            't' => config.threads = parse_threads(&value_for("-t")?)?,
                            other => {
                                return Err(Error::InvalidInput(format!("unknown option -{}", other)))
                            }
                        }
                    }
                }
                other => return Err(Error::InvalidInput(format!("unknown option {}", other))),
            }
        }

        Ok(ParseOutcome::Run(config))
    }

    /// Checks that the configuration describes a runnable job.
    pub fn validate(&self) -> Result<()> {
        let ops = self.operations;
        if ops.is_empty() {
            return Err(Error::InvalidInput(
                "no operation specified; use -c, -d, -e or -u".into(),
            ));
        }
        if ops.contains(Operations::COMPRESS | Operations::DECOMPRESS) {
            return Err(Error::InvalidInput(
                "cannot compress and decompress at the same time".into(),
            ));
        }
        if ops.contains(Operations::ENCRYPT | Operations::DECRYPT) {
            return Err(Error::InvalidInput(
                "cannot encrypt and decrypt at the same time".into(),
            ));
        }
        if ops.contains(Operations::COMPRESS | Operations::DECRYPT)
            || ops.contains(Operations::ENCRYPT | Operations::DECOMPRESS)
        {
            return Err(Error::InvalidInput(format!(
                "'{}' has no valid ordering; use -ce to pack and -ud to unpack",
                ops
            )));
        }

        if ops.needs_key() {
            match &self.key {
                None => return Err(Error::InvalidInput("encryption requires a key (-k)".into())),
                Some(key) if key.is_empty() => {
                    return Err(Error::InvalidInput("key must not be empty".into()))
                }
                Some(key) if key.len() > MAX_PASSPHRASE_LEN => {
                    return Err(Error::InvalidInput(format!(
                        "key is {} bytes, limit is {}",
                        key.len(),
                        MAX_PASSPHRASE_LEN
                    )))
                }
                Some(_) => {}
            }
        }

        if !(1..=MAX_THREADS).contains(&self.threads) {
            return Err(Error::InvalidInput(format!(
                "thread count must be between 1 and {}, got {}",
                MAX_THREADS, self.threads
            )));
        }
        if self.input.as_os_str().is_empty() {
            return Err(Error::InvalidInput("input path is required (-i)".into()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(Error::InvalidInput("output path is required (-o)".into()));
        }
        Ok(())
    }
}

/// Help text printed for `-h`.
pub fn usage(program: &str) -> String {
    format!(
        "Usage: {program} [OPTIONS]

Operations (combinable, e.g. -ce):
  -c              compress
  -d              decompress
  -e              encrypt
  -u              decrypt

Options:
  -i PATH         input file or directory
  -o PATH         output file or directory
  -k KEY          passphrase for encryption/decryption
  -t N            worker threads for directories (1-{max}, default {default})
  --comp-alg ALG  lz77 | huffman | rle | lzw (default lz77)
  --enc-alg ALG   chacha20 | salsa20 | rc4 (default chacha20)
  -v              verbose logging
  -h, --help      show this help

Examples:
  {program} -ce --comp-alg huffman --enc-alg salsa20 -i report.txt -o report.pc -k secret
  {program} -ud --comp-alg huffman --enc-alg salsa20 -i report.pc -o report.txt -k secret
",
        program = program,
        max = MAX_THREADS,
        default = DEFAULT_THREADS
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config> {
        match Config::from_args(args.iter().copied())? {
            ParseOutcome::Run(config) => Ok(config),
            ParseOutcome::Help => panic!("unexpected help"),
        }
    }

    #[test]
    fn test_combined_flags() {
        let cfg = parse(&["-cev", "-i", "in.txt", "-o", "out.bin", "-k", "pw"]).unwrap();
        assert!(cfg.operations.contains(Operations::COMPRESS | Operations::ENCRYPT));
        assert!(cfg.verbose);
        assert_eq!(cfg.input, PathBuf::from("in.txt"));
        assert_eq!(cfg.key.as_ref().map(|k| k.as_bytes()), Some(&b"pw"[..]));
        cfg.validate().unwrap();
    }

    #[test]
    fn test_value_flag_at_end_of_group() {
        let err = parse(&["-udk", "pw", "-ti", "in", "-o", "out"]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let cfg = parse(&["-udk", "pw", "-i", "in", "-o", "out", "-t", "8"]).unwrap();
        assert_eq!(cfg.threads, 8);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let cfg = parse(&["-c", "-i", "a", "-o", "b"]).unwrap();
        assert_eq!(cfg.compression, CompressionAlgorithm::Lz77);
        assert_eq!(cfg.cipher, CipherAlgorithm::ChaCha20);
        assert_eq!(cfg.threads, DEFAULT_THREADS);
        assert!(cfg.key.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn test_algorithm_selection() {
        let cfg = parse(&["--comp-alg", "lzw", "--enc-alg", "rc4"]).unwrap();
        assert_eq!(cfg.compression, CompressionAlgorithm::Lzw);
        assert_eq!(cfg.cipher, CipherAlgorithm::Rc4);
        assert!(parse(&["--enc-alg", "aes128"]).is_err());
        assert!(parse(&["--comp-alg"]).is_err());
    }

    #[test]
    fn test_help() {
        assert!(matches!(
            Config::from_args(["-c", "--help"]).unwrap(),
            ParseOutcome::Help
        ));
        assert!(usage("packcrypt").contains("--comp-alg"));
    }

    #[test]
    fn test_bad_thread_counts() {
        assert!(parse(&["-t", "0"]).is_err());
        assert!(parse(&["-t", "17"]).is_err());
        assert!(parse(&["-t", "many"]).is_err());
    }

    #[test]
    fn test_unknown_options() {
        assert!(parse(&["-x"]).is_err());
        assert!(parse(&["--frobnicate"]).is_err());
        assert!(parse(&["stray"]).is_err());
    }

    #[test]
    fn test_validate_rejections() {
        let base = || parse(&["-i", "in", "-o", "out", "-k", "pw"]).unwrap();

        let cfg = base();
        assert!(cfg.validate().is_err());

        for ops in [
            Operations::COMPRESS | Operations::DECOMPRESS,
            Operations::ENCRYPT | Operations::DECRYPT,
            Operations::COMPRESS | Operations::DECRYPT,
            Operations::ENCRYPT | Operations::DECOMPRESS,
        ] {
            let mut cfg = base();
            cfg.operations = ops;
            assert!(matches!(cfg.validate(), Err(Error::InvalidInput(_))), "{}", ops);
        }

        let mut cfg = base();
        cfg.operations = Operations::ENCRYPT;
        cfg.key = None;
        assert!(cfg.validate().is_err());
        cfg.key = Some(Passphrase::from(""));
        assert!(cfg.validate().is_err());
        cfg.key = Some(Passphrase::from("k".repeat(MAX_PASSPHRASE_LEN + 1)));
        assert!(cfg.validate().is_err());

        let mut cfg = base();
        cfg.operations = Operations::COMPRESS;
        cfg.output = PathBuf::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_passphrase_debug_is_redacted() {
        let cfg = parse(&["-k", "hunter2"]).unwrap();
        assert!(!format!("{:?}", cfg).contains("hunter2"));
    }
}
