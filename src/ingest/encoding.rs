// src/ingest/encoding.rs
use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use tracing::debug;

/// Decode raw upload bytes to text.
///
/// A byte-order mark wins outright; otherwise the encoding is guessed
/// statistically over the whole buffer. Malformed sequences are replaced
/// rather than rejected, so a stray byte never sinks a whole file.
pub fn decode_text(raw: &[u8]) -> (String, &'static Encoding) {
    if let Some((encoding, _bom_len)) = Encoding::for_bom(raw) {
        let (text, _, _) = encoding.decode(raw);
        debug!(encoding = encoding.name(), "decoded via byte-order mark");
        return (text.into_owned(), encoding);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(raw, true);
    let guess = detector.guess(None, true);
    let (text, used, had_errors) = guess.decode(raw);
    if had_errors {
        debug!(
            encoding = used.name(),
            "replacement characters inserted during decode"
        );
    } else {
        debug!(encoding = used.name(), "decoded via detector guess");
    }
    (text.into_owned(), used)
}
