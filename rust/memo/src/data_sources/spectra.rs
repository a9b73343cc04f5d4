use crate::errors::{
    MemoError,
    Result,
};
use crate::models::Spectrum;
use std::io::{
    BufRead,
    BufReader,
    Read,
};
use std::path::{
    Path,
    PathBuf,
};
use tracing::{
    debug,
    info,
};

/// Anything able to hand over processed spectra.
///
/// Peak picking, intensity filtering and loss computation happen upstream,
/// implementors return spectra ready to be tokenized. A source where every
/// spectrum was filtered out returns an empty vector, not an error.
pub trait SpectraSource {
    fn load_spectra(&self) -> Result<Vec<Spectrum>>;
}

impl SpectraSource for Vec<Spectrum> {
    fn load_spectra(&self) -> Result<Vec<Spectrum>> {
        Ok(self.clone())
    }
}

impl SpectraSource for [Spectrum] {
    fn load_spectra(&self) -> Result<Vec<Spectrum>> {
        Ok(self.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectraFormat {
    Json,
    NdJson,
    NdJsonZstd,
    MessagePack,
    MessagePackZstd,
}

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

impl SpectraFormat {
    /// Checked in order, compressed variants first.
    const SUFFIXES: [(&'static str, SpectraFormat); 5] = [
        (".msgpack.zst", SpectraFormat::MessagePackZstd),
        (".ndjson.zst", SpectraFormat::NdJsonZstd),
        (".msgpack", SpectraFormat::MessagePack),
        (".ndjson", SpectraFormat::NdJson),
        (".json", SpectraFormat::Json),
    ];

    pub fn from_suffix(path: &Path) -> Option<Self> {
        let path_str = path.to_string_lossy().to_lowercase();
        Self::SUFFIXES
            .iter()
            .find(|(suffix, _)| path_str.ends_with(suffix))
            .map(|(_, format)| *format)
    }

    pub fn detect_from_path(path: &Path) -> Result<Self> {
        match Self::from_suffix(path) {
            Some(x) => Ok(x),
            None => Self::detect_from_content(path),
        }
    }

    fn detect_from_content(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| MemoError::io(e, path))?;
        let mut reader = BufReader::new(file);
        let mut buffer = [0u8; 8];

        match reader.read(&mut buffer) {
            Ok(bytes_read) if bytes_read >= 4 => {
                if buffer[0..4] == ZSTD_MAGIC {
                    Ok(SpectraFormat::MessagePackZstd)
                } else if buffer[0] == b'{' {
                    Ok(SpectraFormat::NdJson)
                } else if buffer[0] == b'[' {
                    Ok(SpectraFormat::Json)
                } else {
                    Ok(SpectraFormat::MessagePack)
                }
            }
            _ => Ok(SpectraFormat::NdJson),
        }
    }

    /// File name without its spectra suffix, `qc_01.ndjson.zst` -> `qc_01`.
    pub fn sample_name(path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        Self::SUFFIXES.iter().find_map(|(suffix, _)| {
            let split = name.len().checked_sub(suffix.len())?;
            match name.get(split..) {
                Some(tail) if tail.eq_ignore_ascii_case(suffix) => Some(name[..split].to_string()),
                _ => None,
            }
        })
    }
}

pub struct SpectraReader<'a> {
    inner: Box<dyn Iterator<Item = Result<Spectrum>> + Send + 'a>,
}

impl<'a> SpectraReader<'a> {
    pub fn new<R: Read + Send + 'a>(reader: R, format: SpectraFormat) -> Result<Self> {
        let inner: Box<dyn Iterator<Item = Result<Spectrum>> + Send + 'a> = match format {
            SpectraFormat::Json => {
                let spectra: Vec<Spectrum> = serde_json::from_reader(BufReader::new(reader))?;
                Box::new(spectra.into_iter().map(Ok))
            }
            SpectraFormat::NdJson => Box::new(NdJsonReader::new(BufReader::new(reader))),
            SpectraFormat::NdJsonZstd => {
                let decoder = zstd::Decoder::new(reader)?;
                Box::new(NdJsonReader::new(BufReader::new(decoder)))
            }
            SpectraFormat::MessagePack => Box::new(MessagePackReader::new(reader)),
            SpectraFormat::MessagePackZstd => {
                let decoder = zstd::Decoder::new(reader)?;
                Box::new(MessagePackReader::new(decoder))
            }
        };
        Ok(SpectraReader { inner })
    }
}

impl Iterator for SpectraReader<'_> {
    type Item = Result<Spectrum>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

struct NdJsonReader<R: BufRead> {
    reader: R,
    line_no: usize,
}

impl<R: BufRead> NdJsonReader<R> {
    fn new(reader: R) -> Self {
        Self { reader, line_no: 0 }
    }
}

impl<R: BufRead> Iterator for NdJsonReader<R> {
    type Item = Result<Spectrum>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        loop {
            line.clear();
            self.line_no += 1;
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) if line.trim().is_empty() => continue,
                Ok(_) => {
                    let context = format!("NDJSON line {}", self.line_no);
                    return Some(
                        serde_json::from_str(&line)
                            .map_err(|e| MemoError::data(e).append_to_context(&context)),
                    );
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

struct MessagePackReader<R: Read> {
    deserializer: rmp_serde::Deserializer<rmp_serde::decode::ReadReader<R>>,
}

impl<R: Read> MessagePackReader<R> {
    fn new(reader: R) -> Self {
        Self {
            deserializer: rmp_serde::Deserializer::new(reader),
        }
    }
}

impl<R: Read> Iterator for MessagePackReader<R> {
    type Item = Result<Spectrum>;

    fn next(&mut self) -> Option<Self::Item> {
        use serde::Deserialize;

        match Spectrum::deserialize(&mut self.deserializer) {
            Ok(elem) => Some(Ok(elem)),
            Err(rmp_serde::decode::Error::InvalidMarkerRead(ref io_err))
                if io_err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                None
            } // EOF
            Err(rmp_serde::decode::Error::InvalidDataRead(ref io_err))
                if io_err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                None
            } // EOF
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Processed spectra stored on disk, format picked from the suffix or
/// sniffed from the first bytes.
#[derive(Debug, Clone)]
pub struct SpectraFile {
    path: PathBuf,
}

impl SpectraFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SpectraSource for SpectraFile {
    fn load_spectra(&self) -> Result<Vec<Spectrum>> {
        let st = std::time::Instant::now();
        let format = SpectraFormat::detect_from_path(&self.path)?;
        debug!("Reading {} as {:?}", self.path.display(), format);
        let file = std::fs::File::open(&self.path).map_err(|e| MemoError::io(e, &self.path))?;
        let spectra = SpectraReader::new(file, format)?
            .collect::<Result<Vec<Spectrum>>>()
            .map_err(|e| e.append_to_context(&format!("reading {}", self.path.display())))?;
        info!(
            "Loaded {} spectra from {} in {:?}",
            spectra.len(),
            self.path.display(),
            st.elapsed()
        );
        Ok(spectra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ndjson_reader() {
        let text = r#"{"scans": "1", "precursor_mz": 338.342, "peaks": [[71.0497, 0.12]], "losses": [[18.0106, 0.3]], "metadata": {"charge": "1"}}

{"scan": "2", "precursor_mz": 278.19}
"#;
        let spectra = SpectraReader::new(text.as_bytes(), SpectraFormat::NdJson)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(spectra.len(), 2);
        assert_eq!(spectra[0].peaks, vec![(71.0497, 0.12)]);
        assert_eq!(spectra[0].metadata["charge"], "1");
        assert_eq!(spectra[1].scans, "2");
        assert!(spectra[1].peaks.is_empty());
    }

    #[test]
    fn test_numeric_identifiers() {
        let text = "{\"scans\": 1, \"precursor_mz\": 100.0, \"peaks\": [[50.0, 1.0]]}\n\
                    {\"feature_id\": 12, \"precursor_mz\": 200.0}\n";
        let spectra = SpectraReader::new(text.as_bytes(), SpectraFormat::NdJson)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(spectra[0].scans, "1");
        assert_eq!(spectra[0].feature_id(), Some(1));
        assert_eq!(spectra[1].feature_id(), Some(12));

        let record = serde_json::json!({
            "scans": 7,
            "precursor_mz": 300.0,
            "losses": [[18.0106, 1.0]],
        });
        let packed = rmp_serde::to_vec(&record).unwrap();
        let spectra = SpectraReader::new(packed.as_slice(), SpectraFormat::MessagePack)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(spectra[0].feature_id(), Some(7));
        assert_eq!(spectra[0].losses, vec![(18.0106, 1.0)]);
    }

    #[test]
    fn test_ndjson_bad_line() {
        let text = "{\"scans\": \"1\", \"precursor_mz\": 1.0}\n{not json}\n";
        let res = SpectraReader::new(text.as_bytes(), SpectraFormat::NdJson)
            .unwrap()
            .collect::<Result<Vec<_>>>();
        assert!(matches!(res, Err(MemoError::Data { .. })));
    }

    #[test]
    fn test_messagepack_zstd_roundtrip() {
        let spectra = vec![Spectrum::sample(), Spectrum::new("2", 100.0, vec![], vec![])];
        let mut packed = Vec::new();
        for s in spectra.iter() {
            rmp_serde::encode::write(&mut packed, s).unwrap();
        }
        let compressed = zstd::encode_all(packed.as_slice(), 3).unwrap();
        let back = SpectraReader::new(compressed.as_slice(), SpectraFormat::MessagePackZstd)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(back, spectra);
    }

    #[test]
    fn test_format_detection_and_sample_name() {
        assert_eq!(
            SpectraFormat::from_suffix(Path::new("a/b.NDJSON.zst")),
            Some(SpectraFormat::NdJsonZstd)
        );
        assert_eq!(
            SpectraFormat::from_suffix(Path::new("b.msgpack")),
            Some(SpectraFormat::MessagePack)
        );
        assert_eq!(SpectraFormat::from_suffix(Path::new("b.mgf")), None);
        assert_eq!(
            SpectraFormat::sample_name(Path::new("dir/qc_01.ndjson.zst")),
            Some("qc_01".to_string())
        );
    }
}
