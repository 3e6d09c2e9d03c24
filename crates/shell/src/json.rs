use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Serializer, Value};

/// 以四空格縮排重新排版 JSON 文字。 / Re-indents JSON text with four-space indentation.
///
/// 非 ASCII 字元照原樣輸出，不做跳脫。 / Non-ASCII characters are emitted literally,
/// never escaped.
pub fn format_json(input: &str) -> Result<String, serde_json::Error> {
    let value: Value = serde_json::from_str(input)?;
    let mut buffer = Vec::with_capacity(input.len());
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    // serde_json 只會輸出合法的 UTF-8。 / serde_json only ever emits valid UTF-8.
    Ok(String::from_utf8(buffer).expect("serde_json output is UTF-8"))
}
