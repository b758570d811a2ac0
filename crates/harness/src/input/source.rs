//! Recorded input macro sources.
//!
//! A macro is a flat byte stream, four bytes per frame. It arrives either as a JSON object
//! keyed by decimal byte index (`{"0": 128, "1": 0, ...}`) or as a raw `.m64` movie whose
//! input section follows a fixed-size header. Both forms expose the same interface:
//! 1. **Frame count:** Entries divided by four, floored; trailing bytes are never used.
//! 2. **Frame decode:** Pure lookup of the four record bytes for a frame index.

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use super::command::InputCommand;
use crate::common::constants::M64_HEADER_SIZE;
use crate::common::{Error, FRAME_RECORD_SIZE, Result};
use crate::config::MacroFormat;

/// Backing storage for a macro.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Storage {
    /// Sparse index-to-byte mapping; indices may be missing.
    Keyed(HashMap<usize, u8>),
    /// Contiguous bytes starting at index 0.
    Dense(Vec<u8>),
}

/// A read-only recorded input stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MacroSource {
    storage: Storage,
}

impl MacroSource {
    /// Builds a macro from an index-to-byte mapping.
    pub fn from_entries(entries: HashMap<usize, u8>) -> Self {
        let source = Self {
            storage: Storage::Keyed(entries),
        };
        source.warn_on_trailing();
        source
    }

    /// Builds a macro from contiguous bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let source = Self {
            storage: Storage::Dense(bytes),
        };
        source.warn_on_trailing();
        source
    }

    /// Builds a macro from a raw `.m64` byte stream.
    ///
    /// # Arguments
    ///
    /// * `bytes` - The file contents.
    /// * `skip_header` - Drop the leading 0x400-byte movie header.
    ///
    /// # Returns
    ///
    /// The macro, or `MacroFormat` if the header was requested but the file is shorter.
    pub fn from_m64_bytes(mut bytes: Vec<u8>, skip_header: bool) -> Result<Self> {
        if skip_header {
            if bytes.len() < M64_HEADER_SIZE {
                return Err(Error::MacroFormat {
                    reason: format!(
                        "{} bytes is shorter than the {M64_HEADER_SIZE:#x}-byte m64 header",
                        bytes.len()
                    ),
                });
            }
            drop(bytes.drain(..M64_HEADER_SIZE));
        }
        Ok(Self::from_bytes(bytes))
    }

    /// Parses the keyed JSON form.
    ///
    /// Keys must be canonical non-negative decimal integers (`"0"`, `"17"`, never
    /// `"017"`); values must fit in a byte.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: HashMap<String, u8> = serde_json::from_str(json)?;
        Self::from_keyed(raw)
    }

    /// Parses the keyed JSON form from a reader.
    pub fn from_json_reader(reader: impl Read) -> Result<Self> {
        let raw: HashMap<String, u8> = serde_json::from_reader(reader)?;
        Self::from_keyed(raw)
    }

    /// Loads a macro file in the given format.
    pub fn load(path: impl AsRef<Path>, format: MacroFormat, skip_header: bool) -> Result<Self> {
        let path = path.as_ref();
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        let source = match format {
            MacroFormat::Json => {
                let file = fs::File::open(path).map_err(io_err)?;
                Self::from_json_reader(std::io::BufReader::new(file))?
            }
            MacroFormat::M64 => {
                let bytes = fs::read(path).map_err(io_err)?;
                Self::from_m64_bytes(bytes, skip_header)?
            }
        };
        debug!(
            path = %path.display(),
            ?format,
            entries = source.len(),
            frames = source.frame_count(),
            "loaded input macro"
        );
        Ok(source)
    }

    fn from_keyed(raw: HashMap<String, u8>) -> Result<Self> {
        let entries = raw
            .into_iter()
            .map(|(key, value)| parse_index(&key).map(|index| (index, value)))
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self::from_entries(entries))
    }

    /// Total number of byte entries in the macro.
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Keyed(map) => map.len(),
            Storage::Dense(bytes) => bytes.len(),
        }
    }

    /// Returns true if the macro holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of complete frames; trailing bytes short of a full record are ignored.
    pub fn frame_count(&self) -> usize {
        self.len() / FRAME_RECORD_SIZE
    }

    /// Looks up one byte by flat index.
    pub fn byte(&self, index: usize) -> Option<u8> {
        match &self.storage {
            Storage::Keyed(map) => map.get(&index).copied(),
            Storage::Dense(bytes) => bytes.get(index).copied(),
        }
    }

    /// Reads the raw record for a frame.
    ///
    /// # Arguments
    ///
    /// * `frame` - Zero-based frame index.
    ///
    /// # Returns
    ///
    /// The four record bytes, or `MissingIndex` naming the first absent byte.
    pub fn record(&self, frame: usize) -> Result<[u8; FRAME_RECORD_SIZE]> {
        let mut record = [0u8; FRAME_RECORD_SIZE];
        let base = frame.checked_mul(FRAME_RECORD_SIZE);
        for (i, slot) in record.iter_mut().enumerate() {
            let index = base.and_then(|b| b.checked_add(i));
            *slot = index
                .and_then(|index| self.byte(index))
                .ok_or_else(|| Error::MissingIndex {
                    index: index.unwrap_or(usize::MAX),
                    frame,
                })?;
        }
        Ok(record)
    }

    /// Decodes the input command for a frame.
    pub fn decode_frame(&self, frame: usize) -> Result<InputCommand> {
        self.record(frame).map(InputCommand::from_record)
    }

    /// Iterates the decoded commands of every complete frame, in order.
    pub fn commands(&self) -> impl Iterator<Item = Result<InputCommand>> + '_ {
        (0..self.frame_count()).map(|frame| self.decode_frame(frame))
    }

    fn warn_on_trailing(&self) {
        let trailing = self.len() % FRAME_RECORD_SIZE;
        if trailing != 0 {
            warn!(
                trailing,
                frames = self.frame_count(),
                "macro length is not a multiple of {FRAME_RECORD_SIZE}; trailing bytes are ignored"
            );
        }
    }
}

/// Total number of frames in a macro.
pub fn frame_count(source: &MacroSource) -> usize {
    source.frame_count()
}

/// Decodes the input command for `frame` of `source`.
pub fn decode_frame(source: &MacroSource, frame: usize) -> Result<InputCommand> {
    source.decode_frame(frame)
}

fn parse_index(key: &str) -> Result<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::MacroFormat {
            reason: format!("key '{key}' is not a decimal index"),
        });
    }
    if key.len() > 1 && key.starts_with('0') {
        return Err(Error::MacroFormat {
            reason: format!("key '{key}' has a leading zero"),
        });
    }
    key.parse().map_err(|_| Error::MacroFormat {
        reason: format!("key '{key}' is out of range"),
    })
}
