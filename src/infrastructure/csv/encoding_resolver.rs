// ============================================================
// ENCODING RESOLVER
// ============================================================
// Recover a readable table from raw bytes of unknown encoding

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, ISO_8859_15, ISO_8859_2, UTF_8, WINDOWS_1252};
use tracing::debug;

use super::CsvParser;
use crate::domain::audit_config::IngestSettings;
use crate::domain::csv::RawTable;
use crate::domain::error::{AppError, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encodings tried in order when the detector has nothing better to offer
const FALLBACK_ENCODINGS: [&Encoding; 4] = [UTF_8, WINDOWS_1252, ISO_8859_15, ISO_8859_2];

/// Best guess of the statistical detector
#[derive(Debug, Clone, Copy)]
pub struct Detection {
    pub encoding: &'static Encoding,
    /// 1.0 when the detector reports a clear winner, 0.0 otherwise
    pub confidence: f32,
}

/// A table together with the encoding that produced it
#[derive(Debug, Clone)]
pub struct ResolvedTable {
    pub table: RawTable,
    pub encoding: &'static Encoding,
    /// True when the file was read as UTF-8
    pub is_canonical: bool,
}

impl ResolvedTable {
    pub fn encoding_label(&self) -> &'static str {
        self.encoding.name()
    }
}

/// Detects the encoding of a submission and parses it
pub struct EncodingResolver {
    settings: IngestSettings,
    parser: CsvParser,
}

impl EncodingResolver {
    pub fn new(settings: IngestSettings) -> Self {
        Self {
            settings,
            parser: CsvParser::new(),
        }
    }

    /// Run statistical detection over the leading sample of `bytes`
    pub fn detect(&self, bytes: &[u8]) -> Option<Detection> {
        let sample = &bytes[..bytes.len().min(self.settings.sample_bytes)];
        if sample.is_empty() {
            return None;
        }

        let mut detector = EncodingDetector::new();
        detector.feed(sample, sample.len() == bytes.len());
        let (encoding, is_confident) = detector.guess_assess(None, true);

        Some(Detection {
            encoding,
            confidence: if is_confident { 1.0 } else { 0.0 },
        })
    }

    /// Ordered encodings to try for `bytes`
    pub fn candidates(&self, bytes: &[u8]) -> Vec<&'static Encoding> {
        let detection = self.detect(bytes);
        if let Some(detection) = &detection {
            debug!(
                encoding = detection.encoding.name(),
                confidence = detection.confidence,
                "Encoding detector guess"
            );
        }
        order_candidates(detection, self.settings.min_detection_confidence)
    }

    /// Parse `bytes` under the first candidate encoding that works.
    /// Fails only when every candidate fails.
    pub fn resolve(&self, bytes: &[u8]) -> Result<ResolvedTable> {
        for encoding in self.candidates(bytes) {
            let Some(content) = decode_strict(encoding, bytes) else {
                debug!(encoding = encoding.name(), "Content is not valid in this encoding");
                continue;
            };

            match self.parser.parse_content(&content) {
                Ok(table) => {
                    return Ok(ResolvedTable {
                        table,
                        encoding,
                        is_canonical: encoding == UTF_8,
                    });
                }
                Err(e) => {
                    debug!(encoding = encoding.name(), error = %e, "Parsing failed");
                }
            }
        }

        Err(AppError::EncodingError(
            "The file could not be read with any known encoding".to_string(),
        ))
    }
}

impl Default for EncodingResolver {
    fn default() -> Self {
        Self::new(IngestSettings::default())
    }
}

/// Decode without replacement characters; None on malformed input
fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    let bytes = if encoding == UTF_8 {
        bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
    } else {
        bytes
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|content| content.into_owned())
}

/// Fallback encodings, preceded by a confident guess outside the list
fn order_candidates(detection: Option<Detection>, min_confidence: f32) -> Vec<&'static Encoding> {
    let mut candidates = FALLBACK_ENCODINGS.to_vec();

    if let Some(detection) = detection {
        if detection.confidence > min_confidence && !candidates.contains(&detection.encoding) {
            candidates.insert(0, detection.encoding);
        }
    }

    candidates
}
