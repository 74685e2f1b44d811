//! The `CFG` positional token (§6): "the serialized, compressed,
//! base64-encoded representation of the config mapping" passed to every
//! `host <verb>-host` subcommand.
//!
//! `Config` already round-trips cleanly through `serde_json::Value` (it's
//! how `xact_core::cfg::prepare` builds one in the first place), and
//! `xact_types::buffer::DataTypeSpec` is an untagged enum, which only
//! deserializes correctly through a self-describing format. JSON fits
//! that bill without pulling `rmp-serde`/`bincode` into this crate just
//! for a CLI argument, so we deflate the JSON text rather than switching
//! formats.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use xact_types::Config;

use crate::errors::CliError;

pub fn encode(cfg: &Config) -> Result<String, CliError> {
    let json = serde_json::to_vec(cfg).map_err(|e| CliError::Other(format!("cannot serialize cfg: {e}")))?;

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| CliError::Other(format!("cannot compress cfg: {e}")))?;
    let compressed = encoder
        .finish()
        .map_err(|e| CliError::Other(format!("cannot compress cfg: {e}")))?;

    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

pub fn decode(token: &str) -> Result<Config, CliError> {
    let compressed = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| CliError::MalformedCfgToken(format!("not valid base64: {e}")))?;

    let mut decoder = DeflateDecoder::new(&compressed[..]);
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| CliError::MalformedCfgToken(format!("not valid deflate data: {e}")))?;

    serde_json::from_slice(&json).map_err(|e| CliError::MalformedCfgToken(format!("not a valid cfg mapping: {e}")))
}
