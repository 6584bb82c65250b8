//! Dataset ↔ storable blob codec.
//!
//! The dataset is serialized to JSON (the column enum's serde tag carries
//! the dtype, so the round-trip is lossless) and gzip-compressed for the
//! `csv_data` column.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use super::Dataset;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("failed to encode dataset blob: {0}")]
    Encode(String),

    #[error("failed to decode dataset blob: {0}")]
    Decode(String),
}

pub fn encode(dataset: &Dataset) -> Result<Vec<u8>, BlobError> {
    let json = serde_json::to_vec(dataset).map_err(|e| BlobError::Encode(e.to_string()))?;
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&json)
        .and_then(|_| enc.finish())
        .map_err(|e| BlobError::Encode(e.to_string()))
}

pub fn decode(blob: &[u8]) -> Result<Dataset, BlobError> {
    let mut json = Vec::new();
    GzDecoder::new(blob)
        .read_to_end(&mut json)
        .map_err(|e| BlobError::Decode(e.to_string()))?;
    serde_json::from_slice(&json).map_err(|e| BlobError::Decode(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dataset::{fixtures, Dataset};

    #[test]
    fn round_trip_preserves_everything() {
        let ds = fixtures::sales();
        let blob = encode(&ds).expect("encodes");
        let back = decode(&blob).expect("decodes");
        assert_eq!(ds, back);
        assert_eq!(back.dtypes()["sales"], "int64");
    }

    #[test]
    fn round_trip_keeps_nulls_and_float_dtype() {
        let ds = Dataset::from_csv_bytes(b"a,b,c\n1.5,,x\n,2,\n").expect("parses");
        let back = decode(&encode(&ds).expect("encodes")).expect("decodes");
        assert_eq!(ds, back);
        assert_eq!(back.dtypes()["a"], "float64");
        assert_eq!(back.dtypes()["c"], "object");
    }

    #[test]
    fn garbage_blob_fails_cleanly() {
        assert!(matches!(decode(b"not gzip"), Err(BlobError::Decode(_))));
    }
}
