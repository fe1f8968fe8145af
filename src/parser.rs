use std::{
    path::{Component, Path},
    sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};

use crate::{
    document::{Document, DocumentMetadata, ROOT_SECTION},
    text_util,
};

/// Public site the documentation is served from.
pub const SITE_BASE_URL: &str = "https://karpenter.sh";

/// File extensions recognised as documentation pages.
pub const DOC_EXTENSIONS: &[&str] = &["md", "markdown"];

const FRONTMATTER_DELIMITER: &str = "---";

static SHORTCODE_ANGLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{<.*?>\}\}").expect("static regex")
});
static SHORTCODE_PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{%.*?%\}\}").expect("static regex")
});
static TEMPLATE_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{.*?\}\}").expect("static regex")
});
static HTML_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->").expect("static regex")
});
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[^>]+>").expect("static regex")
});

/// Why a single file could not be turned into a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("cannot read file: {0}")]
    Unreadable(String),

    #[error("file is not valid UTF-8")]
    NotUtf8,

    #[error("frontmatter opened with `---` is never closed")]
    UnterminatedFrontmatter,

    #[error("frontmatter is not valid YAML: {0}")]
    InvalidFrontmatter(String),

    #[error("file is not under the documentation root")]
    OutsideBase,
}

/// Result of parsing one file. Parsing never fails past this boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(Document),
    Failed(ParseFailure),
}

impl ParseOutcome {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    pub fn into_result(self) -> Result<Document, ParseFailure> {
        match self {
            Self::Parsed(doc) => Ok(doc),
            Self::Failed(reason) => Err(reason),
        }
    }
}

impl From<Result<Document, ParseFailure>> for ParseOutcome {
    fn from(result: Result<Document, ParseFailure>) -> Self {
        match result {
            Ok(doc) => Self::Parsed(doc),
            Err(reason) => Self::Failed(reason),
        }
    }
}

/// Frontmatter keys we understand. Values of the wrong type read as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Frontmatter {
    #[serde(deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    description: Option<String>,
    #[serde(deserialize_with = "lenient")]
    weight: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    order: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    license: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    Ok(serde_yaml::from_value(value).ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Turns raw markdown files into [`Document`]s.
#[derive(Debug, Clone)]
pub struct DocumentParser {
    base_url: String,
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new(SITE_BASE_URL)
    }
}

impl DocumentParser {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Parse the file at `file_path`, keyed by its location relative to
    /// `base_path`.
    pub fn parse_file(
        &self,
        file_path: &Path,
        base_path: &Path,
    ) -> ParseOutcome {
        let Some(relative) = relative_key(file_path, base_path) else {
            return ParseOutcome::Failed(ParseFailure::OutsideBase);
        };

        let bytes = match std::fs::read(file_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                return ParseOutcome::Failed(ParseFailure::Unreadable(
                    e.to_string(),
                ));
            }
        };
        let Ok(raw) = String::from_utf8(bytes) else {
            return ParseOutcome::Failed(ParseFailure::NotUtf8);
        };

        self.parse_str(&relative, &raw)
    }

    /// Parse already-loaded file contents. `relative_path` is the
    /// `/`-separated store key.
    pub fn parse_str(&self, relative_path: &str, raw: &str) -> ParseOutcome {
        self.build(relative_path, raw).into()
    }

    fn build(
        &self,
        relative_path: &str,
        raw: &str,
    ) -> Result<Document, ParseFailure> {
        let (header, body) = split_frontmatter(raw)?;
        let frontmatter = match header {
            Some(yaml) => parse_frontmatter(yaml)?,
            None => Frontmatter::default(),
        };

        let metadata = DocumentMetadata {
            title: non_blank(frontmatter.title)
                .unwrap_or_else(|| fallback_title(relative_path)),
            description: non_blank(frontmatter.description),
            weight: frontmatter.weight.or(frontmatter.order),
            license: non_blank(frontmatter.license),
        };

        Ok(Document {
            path: relative_path.to_string(),
            metadata,
            content: clean_content(body),
            section: section_for(relative_path),
            url: self.url_for(relative_path),
        })
    }

    /// Public URL of the page stored under `relative_path`.
    pub fn url_for(&self, relative_path: &str) -> String {
        let mut path = match relative_path.rsplit_once('.') {
            Some((stem, ext))
                if DOC_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known)) =>
            {
                stem
            }
            _ => relative_path,
        };

        for index in ["index", "_index"] {
            if path == index {
                path = "";
            } else if let Some(parent) = path
                .strip_suffix(index)
                .and_then(|p| p.strip_suffix('/'))
            {
                path = parent;
            }
        }

        let path = if let Some(rest) = path.strip_prefix("content/en/docs/")
        {
            format!("docs/{rest}")
        } else if let Some(rest) = path.strip_prefix("content/en/") {
            rest.to_string()
        } else {
            path.to_string()
        };

        format!("{}/{path}", self.base_url)
    }
}

/// Split `raw` into its YAML header (if any) and the body that follows.
///
/// A file that does not open with `---` has no header. A header that is
/// opened but never closed is an error.
fn split_frontmatter(
    raw: &str,
) -> Result<(Option<&str>, &str), ParseFailure> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut lines = raw.split_inclusive('\n');

    match lines.next() {
        Some(first) if first.trim_end() == FRONTMATTER_DELIMITER => {
            let header_start = first.len();
            let mut offset = header_start;
            for line in lines {
                if line.trim_end() == FRONTMATTER_DELIMITER {
                    let header = &raw[header_start..offset];
                    let body = &raw[offset + line.len()..];
                    return Ok((Some(header), body));
                }
                offset += line.len();
            }
            Err(ParseFailure::UnterminatedFrontmatter)
        }
        _ => Ok((None, raw)),
    }
}

fn parse_frontmatter(yaml: &str) -> Result<Frontmatter, ParseFailure> {
    if yaml.trim().is_empty() {
        return Ok(Frontmatter::default());
    }

    let invalid =
        |e: serde_yaml::Error| ParseFailure::InvalidFrontmatter(e.to_string());
    match serde_yaml::from_str(yaml).map_err(invalid)? {
        serde_yaml::Value::Null => Ok(Frontmatter::default()),
        value @ serde_yaml::Value::Mapping(_) => {
            serde_yaml::from_value(value).map_err(invalid)
        }
        _ => Err(ParseFailure::InvalidFrontmatter(
            "expected a mapping of keys to values".to_string(),
        )),
    }
}

/// Strip Hugo templating, HTML comments and tags, then tidy whitespace.
pub fn clean_content(content: &str) -> String {
    let content = SHORTCODE_ANGLE.replace_all(content, "");
    let content = SHORTCODE_PERCENT.replace_all(&content, "");
    let content = TEMPLATE_EXPR.replace_all(&content, "");
    let content = HTML_COMMENT.replace_all(&content, "");
    let content = HTML_TAG.replace_all(&content, "");
    text_util::collapse_whitespace(&content)
}

/// Top-level directory of `relative_path`, or `root` for top-level files.
pub fn section_for(relative_path: &str) -> String {
    match relative_path.split_once('/') {
        Some((first, _)) if !first.is_empty() => first.to_string(),
        _ => ROOT_SECTION.to_string(),
    }
}

fn fallback_title(relative_path: &str) -> String {
    let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    text_util::title_from_stem(stem)
}

/// `/`-joined path of `file_path` relative to `base_path`.
fn relative_key(file_path: &Path, base_path: &Path) -> Option<String> {
    let relative = file_path.strip_prefix(base_path).ok()?;
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}
