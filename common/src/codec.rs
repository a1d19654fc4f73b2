use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, BufReader, Read, Write};
use thiserror::Error;

/// Registro clave→valor que emite `map` y que se guarda en los intermedios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("error de E/S en archivo intermedio: {0}")]
    Io(#[from] io::Error),

    #[error("línea {line} mal formada: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Escribe un objeto JSON por línea: `{"key":"..","value":".."}`.
pub fn encode<W: Write>(records: &[KeyValue], mut writer: W) -> Result<(), CodecError> {
    for kv in records {
        serde_json::to_writer(&mut writer, kv).map_err(io::Error::from)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Lee registros en el orden del archivo. Las líneas vacías se ignoran.
pub fn decode<R: Read>(reader: R) -> Result<Vec<KeyValue>, CodecError> {
    let reader = BufReader::new(reader);
    let mut out = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let kv: KeyValue = serde_json::from_str(&line).map_err(|source| CodecError::Malformed {
            line: idx + 1,
            source,
        })?;
        out.push(kv);
    }

    Ok(out)
}
