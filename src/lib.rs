//! Reversible file transformations: four lossless compression engines and
//! three (toy) stream ciphers, chained by a pipeline that always undoes work in
//! the reverse order it was applied.
//!
//! ```rust
//! use packcrypt::{run_pipeline, ByteBuffer, Config, Operations};
//! use packcrypt::config::Passphrase;
//!
//! let config = Config {
//!     key: Some(Passphrase::from("secret")),
//!     ..Config::default()
//! };
//! let data = ByteBuffer::from(b"hello hello hello hello".to_vec());
//! let sealed = run_pipeline(data.clone(), Operations::COMPRESS | Operations::ENCRYPT, &config).unwrap();
//! let opened = run_pipeline(sealed, Operations::DECRYPT | Operations::DECOMPRESS, &config).unwrap();
//! assert_eq!(opened, data);
//! ```

pub mod batch;
pub mod buffer;
pub mod compression;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod security;

pub use buffer::ByteBuffer;
pub use compression::{compress, decompress, CompressionAlgorithm};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{run_pipeline, Operations};
pub use security::{decrypt, encrypt, CipherAlgorithm};
