use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// How the charset of a response body was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharsetSource {
    Bom,
    Header,
    Detected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    pub text: String,
    pub encoding: &'static Encoding,
    pub charset: CharsetSource,
    /// Some bytes were invalid in `encoding` and became U+FFFD.
    pub lossy: bool,
}

/// Portal pages are UTF-8 in practice; a BOM or a declared charset still wins
/// over detection.
///
/// Never fails: invalid sequences are replaced, so one bad byte in an SMS body
/// cannot hold back the range it belongs to.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> DecodedBody {
    let (encoding, charset) = match Encoding::for_bom(bytes) {
        Some((encoding, _)) => (encoding, CharsetSource::Bom),
        None => match content_type
            .and_then(declared_charset)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
        {
            Some(encoding) => (encoding, CharsetSource::Header),
            None => {
                let mut detector = EncodingDetector::new();
                detector.feed(bytes, true);
                (detector.guess(None, true), CharsetSource::Detected)
            }
        },
    };

    let (text, _, had_errors) = encoding.decode(bytes);
    DecodedBody {
        text: text.into_owned(),
        encoding,
        charset,
        lossy: had_errors,
    }
}

fn declared_charset(content_type: &str) -> Option<&str> {
    content_type.split(';').find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\''].as_ref()))
    })
}
