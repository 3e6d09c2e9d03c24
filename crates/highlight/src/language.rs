use std::borrow::Cow;
use std::ops::Range;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

const NUMBER_PATTERN: &str = r"(?x)
    (?P<number>
        (?:
            0[xX][0-9A-Fa-f_]+ |
            0[bB][01_]+ |
            [0-9][0-9_]*(\.[0-9_]+)?([eE][+-]?[0-9_]+)?
        )
    )
";

/// Identifier for a registered language.
/// （註冊語言的識別子。）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguageId(Cow<'static, str>);

impl LanguageId {
    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for LanguageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for LanguageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for LanguageId {
    fn from(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HighlightKind {
    Keyword,
    Comment,
    String,
    Number,
    Operator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightToken {
    pub range: Range<usize>,
    pub kind: HighlightKind,
}

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("language '{0}' is not registered")]
    LanguageNotRegistered(String),
    #[error("regex compilation failed: {0}")]
    RegexCompilation(String),
}

/// String-literal delimiter used by a language.
#[derive(Debug, Clone, Copy)]
pub struct StringRule {
    pub delimiter: &'static str,
    pub escape: Option<char>,
}

/// Declarative description of a language, compiled into a [`LanguageDefinition`].
/// （語言的宣告式描述，編譯後成為可用的定義。）
#[derive(Debug, Clone, Copy)]
pub struct LanguageSpec {
    pub id: &'static str,
    pub display_name: &'static str,
    pub extensions: &'static [&'static str],
    pub case_sensitive: bool,
    pub keywords: &'static [&'static str],
    pub operators: &'static [&'static str],
    pub line_comment: Option<&'static str>,
    pub block_comment: Option<(&'static str, &'static str)>,
    pub strings: &'static [StringRule],
}

#[derive(Debug, Clone)]
pub struct LanguageDefinition {
    id: LanguageId,
    display_name: String,
    extensions: Vec<String>,
    keyword_regex: Option<Regex>,
    operator_regex: Option<Regex>,
    number_regex: Regex,
    line_comment: Option<String>,
    block_comment: Option<(String, String)>,
    strings: Vec<StringRule>,
}

impl LanguageDefinition {
    pub fn compile(spec: &LanguageSpec) -> Result<Self, HighlightError> {
        Ok(Self {
            id: LanguageId::from(spec.id),
            display_name: spec.display_name.to_string(),
            extensions: spec.extensions.iter().map(|ext| ext.to_string()).collect(),
            keyword_regex: build_keyword_regex(spec.keywords, spec.case_sensitive)?,
            operator_regex: build_operator_regex(spec.operators)?,
            number_regex: Regex::new(NUMBER_PATTERN)
                .map_err(|err| HighlightError::RegexCompilation(format!("number regex: {err}")))?,
            line_comment: spec.line_comment.map(str::to_string),
            block_comment: spec
                .block_comment
                .map(|(start, end)| (start.to_string(), end.to_string())),
            strings: spec.strings.to_vec(),
        })
    }

    pub fn id(&self) -> &LanguageId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn matches_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(extension))
    }

    /// Tokenises the input. Comments and strings claim their spans first so the
    /// regex passes never re-colour them.
    pub fn highlight(&self, input: &str) -> Vec<HighlightToken> {
        let mut scanner = Scanner::new(input);
        if let Some((start, end)) = &self.block_comment {
            scanner.scan_block_comments(start, end);
        }
        if let Some(marker) = &self.line_comment {
            scanner.scan_line_comments(marker);
        }
        for rule in &self.strings {
            scanner.scan_strings(rule.delimiter, rule.escape);
        }
        if let Some(regex) = &self.keyword_regex {
            scanner.scan_regex(regex, HighlightKind::Keyword);
        }
        scanner.scan_regex(&self.number_regex, HighlightKind::Number);
        if let Some(regex) = &self.operator_regex {
            scanner.scan_regex(regex, HighlightKind::Operator);
        }
        scanner.finish()
    }
}

/// Single-pass token collector over one input string. Each claimed byte range
/// is recorded so later, lower-priority passes skip it.
struct Scanner<'a> {
    input: &'a str,
    occupied: Vec<bool>,
    tokens: Vec<HighlightToken>,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            occupied: vec![false; input.len()],
            tokens: Vec::new(),
        }
    }

    // 輸出保證依起點排序且互不重疊，供上層直接切片。 / The output is guaranteed sorted
    // and non-overlapping so callers can slice the input directly.
    fn finish(mut self) -> Vec<HighlightToken> {
        self.tokens.sort_by_key(|token| token.range.start);
        let mut result = Vec::with_capacity(self.tokens.len());
        let mut end = 0;
        for token in self.tokens {
            if token.range.start >= end {
                end = token.range.end;
                result.push(token);
            }
        }
        result
    }

    fn taken(&self, index: usize) -> bool {
        self.occupied.get(index).copied().unwrap_or(false)
    }

    fn claim(&mut self, range: Range<usize>, kind: HighlightKind) {
        let start = range.start.min(self.occupied.len());
        let end = range.end.min(self.occupied.len());
        for slot in &mut self.occupied[start..end] {
            *slot = true;
        }
        self.tokens.push(HighlightToken { range, kind });
    }

    fn scan_block_comments(&mut self, start_mark: &str, end_mark: &str) {
        let mut index = 0;
        while let Some(found) = self.input[index..].find(start_mark) {
            let start = index + found;
            let body = start + start_mark.len();
            let end = match self.input[body..].find(end_mark) {
                Some(rel) => body + rel + end_mark.len(),
                None => self.input.len(),
            };
            self.claim(start..end, HighlightKind::Comment);
            index = end;
        }
    }

    fn scan_line_comments(&mut self, marker: &str) {
        let mut cursor = 0;
        for line in self.input.split_inclusive('\n') {
            if let Some(position) = line.find(marker) {
                let start = cursor + position;
                if !self.taken(start) {
                    let end = cursor + line.trim_end_matches(['\r', '\n']).len();
                    self.claim(start..end, HighlightKind::Comment);
                }
            }
            cursor += line.len();
        }
    }

    fn scan_strings(&mut self, delimiter: &str, escape: Option<char>) {
        let mut index = 0;
        while let Some(found) = self.input[index..].find(delimiter) {
            let start = index + found;
            if self.taken(start) {
                index = start + delimiter.len();
                continue;
            }

            let body = start + delimiter.len();
            let mut cursor = body;
            let mut end = self.input.len();
            while cursor < self.input.len() {
                if self.input[cursor..].starts_with(delimiter)
                    && !is_escaped(self.input, cursor, body, escape)
                {
                    end = cursor + delimiter.len();
                    break;
                }
                cursor += char_width(self.input, cursor);
            }
            self.claim(start..end, HighlightKind::String);
            index = end;
        }
    }

    fn scan_regex(&mut self, regex: &Regex, kind: HighlightKind) {
        let claims: Vec<Range<usize>> = regex
            .find_iter(self.input)
            .map(|found| found.range())
            .filter(|range| !range.clone().any(|index| self.taken(index)))
            .collect();
        for range in claims {
            self.claim(range, kind.clone());
        }
    }
}

fn char_width(input: &str, index: usize) -> usize {
    input[index..]
        .chars()
        .next()
        .map(char::len_utf8)
        .unwrap_or(1)
}

fn is_escaped(input: &str, cursor: usize, body: usize, escape: Option<char>) -> bool {
    let Some(escape) = escape else {
        return false;
    };
    cursor > body && input[..cursor].chars().next_back() == Some(escape)
}

fn build_keyword_regex(
    keywords: &[&str],
    case_sensitive: bool,
) -> Result<Option<Regex>, HighlightError> {
    if keywords.is_empty() {
        return Ok(None);
    }
    let pattern = keywords
        .iter()
        .map(|keyword| regex::escape(keyword))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"\b({pattern})\b");
    let mut builder = RegexBuilder::new(&pattern);
    builder.multi_line(true);
    if !case_sensitive {
        builder.case_insensitive(true);
    }
    builder.build().map(Some).map_err(|err| {
        HighlightError::RegexCompilation(format!("keyword regex compile error: {err}"))
    })
}

fn build_operator_regex(operators: &[&str]) -> Result<Option<Regex>, HighlightError> {
    if operators.is_empty() {
        return Ok(None);
    }
    let pattern = operators
        .iter()
        .map(|operator| regex::escape(operator))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("({pattern})"))
        .map(Some)
        .map_err(|err| HighlightError::RegexCompilation(format!("operator regex: {err}")))
}

#[derive(Default)]
pub struct LanguageRegistry {
    languages: Vec<LanguageDefinition>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in languages.
    /// （預先載入內建語言的註冊表。）
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for spec in builtin::SPECS {
            let definition = LanguageDefinition::compile(spec)
                .expect("built-in language specs must compile");
            registry.register(definition);
        }
        registry
    }

    pub fn register(&mut self, definition: LanguageDefinition) {
        self.languages.push(definition);
    }

    pub fn get(&self, id: impl AsRef<str>) -> Option<&LanguageDefinition> {
        self.languages
            .iter()
            .find(|language| language.id.as_ref() == id.as_ref())
    }

    /// Resolves the language for a file by its extension; `None` means plain text.
    pub fn language_for_path(&self, path: &Path) -> Option<&LanguageDefinition> {
        let extension = path.extension().and_then(|ext| ext.to_str())?;
        self.languages
            .iter()
            .find(|language| language.matches_extension(extension))
    }

    pub fn highlight(
        &self,
        id: impl AsRef<str>,
        input: &str,
    ) -> Result<Vec<HighlightToken>, HighlightError> {
        let language = self
            .get(id.as_ref())
            .ok_or_else(|| HighlightError::LanguageNotRegistered(id.as_ref().to_string()))?;
        Ok(language.highlight(input))
    }
}

/// Shared default registry for hosts that do not customise languages.
pub fn shared_registry() -> &'static LanguageRegistry {
    use once_cell::sync::Lazy;
    static SHARED: Lazy<LanguageRegistry> = Lazy::new(LanguageRegistry::with_defaults);
    &SHARED
}

pub mod builtin {
    use super::{LanguageSpec, StringRule};

    const DOUBLE_QUOTED: StringRule = StringRule {
        delimiter: "\"",
        escape: Some('\\'),
    };
    const SINGLE_QUOTED: StringRule = StringRule {
        delimiter: "'",
        escape: Some('\\'),
    };

    pub const PYTHON: LanguageSpec = LanguageSpec {
        id: "python",
        display_name: "Python",
        extensions: &["py"],
        case_sensitive: true,
        keywords: &[
            "def", "class", "import", "from", "return", "if", "elif", "else", "for", "while",
            "try", "except", "finally", "with", "as", "lambda", "pass", "break", "continue",
            "yield", "global", "nonlocal", "assert", "raise", "in", "is", "not", "and", "or",
            "del", "async", "await", "None", "True", "False",
        ],
        operators: &[
            "**", "//", "==", "!=", ">=", "<=", "->", "+=", "-=", "*=", "/=", "+", "-", "*", "/",
            "%", ">", "<", "=", "@",
        ],
        line_comment: Some("#"),
        block_comment: None,
        strings: &[DOUBLE_QUOTED, SINGLE_QUOTED],
    };

    pub const SQL: LanguageSpec = LanguageSpec {
        id: "sql",
        display_name: "SQL",
        extensions: &["sql"],
        case_sensitive: false,
        keywords: &[
            "select", "from", "where", "insert", "into", "values", "update", "set", "delete",
            "create", "table", "drop", "alter", "join", "left", "right", "inner", "outer", "on",
            "group", "by", "order", "having", "limit", "distinct", "union", "all", "as", "and",
            "or", "not", "null", "primary", "key", "foreign", "references", "index", "view",
        ],
        operators: &["<>", ">=", "<=", "=", ">", "<", "+", "-", "*", "/"],
        line_comment: Some("--"),
        block_comment: Some(("/*", "*/")),
        strings: &[StringRule {
            delimiter: "'",
            escape: None,
        }],
    };

    pub const MARKDOWN: LanguageSpec = LanguageSpec {
        id: "markdown",
        display_name: "Markdown",
        extensions: &["md"],
        case_sensitive: true,
        keywords: &[],
        operators: &[],
        line_comment: None,
        block_comment: None,
        strings: &[StringRule {
            delimiter: "`",
            escape: None,
        }],
    };

    pub const HTML: LanguageSpec = LanguageSpec {
        id: "html",
        display_name: "HTML",
        extensions: &["html", "htm"],
        case_sensitive: false,
        keywords: &[],
        operators: &["</", "/>", "<", ">", "="],
        line_comment: None,
        block_comment: Some(("<!--", "-->")),
        strings: &[DOUBLE_QUOTED, SINGLE_QUOTED],
    };

    pub const JSON: LanguageSpec = LanguageSpec {
        id: "json",
        display_name: "JSON",
        extensions: &["json"],
        case_sensitive: true,
        keywords: &["true", "false", "null"],
        operators: &[":", ",", "{", "}", "[", "]"],
        line_comment: None,
        block_comment: None,
        strings: &[DOUBLE_QUOTED],
    };

    pub const PLAIN_TEXT: LanguageSpec = LanguageSpec {
        id: "plain_text",
        display_name: "Plain Text",
        extensions: &[],
        case_sensitive: true,
        keywords: &[],
        operators: &[],
        line_comment: None,
        block_comment: None,
        strings: &[],
    };

    pub const SPECS: &[LanguageSpec] = &[PYTHON, SQL, MARKDOWN, HTML, JSON, PLAIN_TEXT];
}
