use std::fs;
use std::path::Path;

use encoding_rs::{Encoding as RsEncoding, GBK, WINDOWS_1252};

use crate::document::DocumentError;

/// 文件支援的文字編碼，依偵測時的嘗試順序排列。 / Supported text encodings, listed in detection order.
///
/// ISO-8859-1 能解碼任何位元組序列，因此刻意排在最後作為保底。 / ISO-8859-1 decodes
/// every byte sequence, so it is deliberately placed last as the catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Gbk,
    Gb2312,
    Latin1,
}

/// 偵測時依序嘗試的候選編碼。 / Candidate encodings tried in order during detection.
pub const CANDIDATES: [Encoding; 4] = [
    Encoding::Utf8,
    Encoding::Gbk,
    Encoding::Gb2312,
    Encoding::Latin1,
];

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Gbk => "gbk",
            Encoding::Gb2312 => "gb2312",
            Encoding::Latin1 => "iso-8859-1",
        }
    }

    /// 依名稱（不分大小寫）尋找編碼。 / Looks an encoding up by name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        CANDIDATES
            .into_iter()
            .find(|candidate| candidate.name().eq_ignore_ascii_case(name.trim()))
    }

    // gb2312 與 iso-8859-1 依 WHATWG 標籤對應到 GBK 與 windows-1252 解碼器。
    // The gb2312 and iso-8859-1 labels resolve to the GBK and windows-1252
    // coders under the WHATWG mapping.
    fn to_rs(self) -> &'static RsEncoding {
        match self {
            Encoding::Utf8 => encoding_rs::UTF_8,
            Encoding::Gbk | Encoding::Gb2312 => GBK,
            Encoding::Latin1 => WINDOWS_1252,
        }
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Utf8
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 以指定編碼嚴格解碼；任何無效序列都視為失敗。 / Strictly decodes bytes with one
/// encoding; any invalid sequence fails the whole decode.
pub fn decode_with(bytes: &[u8], encoding: Encoding) -> Result<String, DocumentError> {
    match encoding {
        Encoding::Utf8 => std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DocumentError::Undecodable),
        legacy => {
            let (text, had_errors) = legacy.to_rs().decode_without_bom_handling(bytes);
            if had_errors {
                return Err(DocumentError::Undecodable);
            }
            Ok(text.into_owned())
        }
    }
}

/// 依序嘗試每個候選編碼，回傳第一個成功解碼的結果。 / Tries every candidate in order and
/// returns the first successful decode together with the winning encoding.
pub fn detect_and_decode(bytes: &[u8]) -> Result<(String, Encoding), DocumentError> {
    for candidate in CANDIDATES {
        if let Ok(text) = decode_with(bytes, candidate) {
            return Ok((text, candidate));
        }
    }
    Err(DocumentError::Undecodable)
}

/// 讀取整個檔案並偵測其編碼。 / Reads a whole file and detects its encoding.
pub fn read_text(path: impl AsRef<Path>) -> Result<(String, Encoding), DocumentError> {
    let bytes = fs::read(path.as_ref())?;
    detect_and_decode(&bytes)
}

/// 以指定編碼序列化文字。 / Serialises text with the given encoding.
pub fn encode(text: &str, encoding: Encoding) -> Result<Vec<u8>, DocumentError> {
    match encoding {
        Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
        legacy => {
            let (bytes, _, had_errors) = legacy.to_rs().encode(text);
            if had_errors {
                return Err(DocumentError::Unrepresentable(legacy.name()));
            }
            Ok(bytes.into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_detects_as_utf8() {
        let (text, encoding) = detect_and_decode(b"hello world\n").unwrap();
        assert_eq!(text, "hello world\n");
        assert_eq!(encoding, Encoding::Utf8);
    }

    #[test]
    fn utf8_chinese_wins_over_gbk() {
        // 這串 UTF-8 位元組同時也是合法的 GBK；順序保證 UTF-8 獲勝。 / These UTF-8
        // bytes also decode under GBK; ordering guarantees UTF-8 wins.
        let bytes = "中文文本".as_bytes();
        let (text, encoding) = detect_and_decode(bytes).unwrap();
        assert_eq!(text, "中文文本");
        assert_eq!(encoding, Encoding::Utf8);
    }

    #[test]
    fn gbk_bytes_fall_through_to_gbk() {
        let (bytes, _, _) = GBK.encode("中文文本");
        let (text, encoding) = detect_and_decode(&bytes).unwrap();
        assert_eq!(text, "中文文本");
        assert_eq!(encoding, Encoding::Gbk);
    }

    #[test]
    fn lone_high_byte_falls_through_to_latin1() {
        // 0xFF 不是合法的 UTF-8 也不是合法的 GBK 前導位元組。 / 0xFF is neither valid
        // UTF-8 nor a valid GBK lead byte.
        let (text, encoding) = detect_and_decode(&[0xFF]).unwrap();
        assert_eq!(encoding, Encoding::Latin1);
        assert_eq!(text, "ÿ");
    }

    #[test]
    fn strict_decode_rejects_wrong_encoding() {
        let err = decode_with(&[0xFF], Encoding::Gbk).unwrap_err();
        assert!(matches!(err, DocumentError::Undecodable));

        let err = decode_with(&[0xE4, 0xB8], Encoding::Utf8).unwrap_err();
        assert!(matches!(err, DocumentError::Undecodable));
    }

    #[test]
    fn encode_round_trips_gbk() {
        let bytes = encode("简体中文", Encoding::Gbk).unwrap();
        assert_eq!(decode_with(&bytes, Encoding::Gbk).unwrap(), "简体中文");
    }

    #[test]
    fn encode_rejects_unrepresentable_text() {
        let err = encode("漢字", Encoding::Latin1).unwrap_err();
        assert!(matches!(err, DocumentError::Unrepresentable("iso-8859-1")));
    }

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(Encoding::from_name("UTF-8"), Some(Encoding::Utf8));
        assert_eq!(Encoding::from_name("GB2312"), Some(Encoding::Gb2312));
        assert_eq!(Encoding::from_name("latin-1"), None);
    }
}
