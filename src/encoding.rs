//! Encoding detection and decoding module
//!
//! Turns raw file bytes into text. A byte-order mark always wins; otherwise
//! content is expected to be UTF-8 unless detection is enabled.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

use crate::error::ReadError;

/// Bytes sampled for detection (first 64KB should be enough)
const SAMPLE_SIZE: usize = 64 * 1024;

/// Options for reading a file as text
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Sniff and transcode non-UTF-8 content instead of failing on it
    pub detect_encoding: bool,
}

/// Result of encoding detection
#[derive(Debug, Clone)]
pub struct EncodingInfo {
    /// Detected encoding name
    pub name: &'static str,
    /// Confidence level (0.0 - 1.0)
    pub confidence: f32,
    /// The encoding_rs Encoding reference
    pub encoding: &'static Encoding,
}

impl Default for EncodingInfo {
    fn default() -> Self {
        Self {
            name: "UTF-8",
            confidence: 1.0,
            encoding: encoding_rs::UTF_8,
        }
    }
}

/// Detect the encoding of a byte buffer by sampling its start
pub fn detect_encoding(content: &[u8]) -> EncodingInfo {
    let sample = &content[..content.len().min(SAMPLE_SIZE)];

    if sample.is_empty() {
        return EncodingInfo::default();
    }

    if let Some(encoding) = detect_bom(sample) {
        return EncodingInfo {
            name: encoding.name(),
            confidence: 1.0,
            encoding,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(sample, sample.len() == content.len());
    let encoding = detector.guess(None, true);

    // Rough confidence based on whether the sample is valid UTF-8
    let confidence = if encoding == encoding_rs::UTF_8 {
        if std::str::from_utf8(sample).is_ok() {
            1.0
        } else {
            0.5
        }
    } else {
        0.8
    };

    EncodingInfo {
        name: encoding.name(),
        confidence,
        encoding,
    }
}

/// Detect BOM (Byte Order Mark) at the start of content
fn detect_bom(content: &[u8]) -> Option<&'static Encoding> {
    Encoding::for_bom(content).map(|(encoding, _)| encoding)
}

/// Decode file bytes into text
pub fn decode(content: &[u8], options: ReadOptions) -> Result<String, ReadError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(content) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&content[bom_len..]);
        if had_errors && !options.detect_encoding {
            return Err(ReadError::Decode {
                encoding: encoding.name(),
            });
        }
        return Ok(text.into_owned());
    }

    match std::str::from_utf8(content) {
        Ok(text) => Ok(text.to_string()),
        Err(_) if options.detect_encoding => {
            let info = detect_encoding(content);
            log::debug!(
                "Transcoding from {} (confidence {:.0}%)",
                info.name,
                info.confidence * 100.0
            );
            let (text, _, had_errors) = info.encoding.decode(content);
            if had_errors {
                log::warn!(
                    "Encoding errors decoding as {} (confidence {:.0}%), using lossy conversion",
                    info.name,
                    info.confidence * 100.0
                );
            }
            Ok(text.into_owned())
        }
        Err(_) => Err(ReadError::Decode {
            encoding: encoding_rs::UTF_8.name(),
        }),
    }
}
