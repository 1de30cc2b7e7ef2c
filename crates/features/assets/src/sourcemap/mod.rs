//! Source map v3 model with mapping decode/encode and composition.

mod rewrite;
pub mod vlq;

pub use self::rewrite::SourceRewrite;

use crate::error::BuildError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A source map as stored in `.map` files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

/// Where a generated position came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub source: u32,
    pub line: u32,
    pub column: u32,
    pub name: Option<u32>,
}

/// One decoded mapping. Lines are implied by the position in [`Lines`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub generated_column: u32,
    pub origin: Option<Origin>,
}

/// Decoded mappings, one entry per generated line.
pub type Lines = Vec<Vec<Segment>>;

impl SourceMap {
    /// An empty map for `file`.
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            version: 3,
            file: Some(file.into()),
            source_root: None,
            sources: Vec::new(),
            sources_content: None,
            names: Vec::new(),
            mappings: String::new(),
        }
    }

    /// Maps every line of `content` onto itself in `source`.
    ///
    /// Positions inside a line keep their column, see [`SourceMap::lookup`].
    pub fn identity(file: impl Into<String>, source: impl Into<String>, content: &str) -> Self {
        let mut map = Self::new(file);
        map.sources.push(source.into());
        map.sources_content = Some(vec![Some(content.to_owned())]);

        let lines: Lines = (0..content.lines().count().max(1))
            .map(|line| {
                vec![Segment {
                    generated_column: 0,
                    origin: Some(Origin {
                        source: 0,
                        line: u32::try_from(line).unwrap_or(u32::MAX),
                        column: 0,
                        name: None,
                    }),
                }]
            })
            .collect();
        map.set_lines(&lines);
        map
    }

    /// Parses a map from its JSON text.
    ///
    /// # Errors
    /// Returns [`BuildError::SourceMap`] if the JSON is not a version 3 map.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, BuildError> {
        let map: Self = serde_json::from_slice(bytes)
            .map_err(|e| BuildError::source_map(format!("invalid source map JSON: {e}")))?;
        if map.version != 3 {
            return Err(BuildError::source_map(format!(
                "unsupported source map version {}",
                map.version
            )));
        }
        Ok(map)
    }

    /// Splits a trailing `sourceMappingURL` comment off compiler output.
    ///
    /// Returns the code without the comment, plus the decoded map when the URL
    /// is an inline base64 `data:application/json` URL. Any other URL is
    /// dropped, since the bundler writes its own reference.
    ///
    /// # Errors
    /// Returns [`BuildError::SourceMap`] if an inline map is not valid base64
    /// or not a version 3 map.
    pub fn split_inline(code: &str) -> Result<(String, Option<Self>), BuildError> {
        let body = code.trim_end();
        let (head, last) = body.rsplit_once('\n').unwrap_or(("", body));
        let Some(url) = comment_url(last) else {
            return Ok((code.to_owned(), None));
        };

        let map = match url.strip_prefix("data:").and_then(|d| d.split_once(";base64,")) {
            Some((mime, data)) if mime.starts_with("application/json") => {
                let bytes = STANDARD
                    .decode(data)
                    .map_err(|e| BuildError::source_map(format!("inline map is not base64: {e}")))?;
                Some(Self::from_slice(&bytes)?)
            },
            _ => None,
        };

        let mut code = head.trim_end_matches('\n').to_owned();
        if !code.is_empty() {
            code.push('\n');
        }
        Ok((code, map))
    }

    /// Serializes to compact JSON. The bytes are what gets written and hashed.
    ///
    /// # Errors
    /// Returns [`BuildError::SourceMap`] if serialization fails.
    pub fn to_vec(&self) -> Result<Vec<u8>, BuildError> {
        serde_json::to_vec(self)
            .map_err(|e| BuildError::source_map(format!("cannot serialize source map: {e}")))
    }

    /// Decodes `mappings` into absolute positions.
    ///
    /// # Errors
    /// Returns [`BuildError::SourceMap`] on malformed VLQ, a segment with an
    /// unexpected number of fields, or a position that resolves below zero.
    pub fn lines(&self) -> Result<Lines, BuildError> {
        let mut source: i64 = 0;
        let mut line: i64 = 0;
        let mut column: i64 = 0;
        let mut name: i64 = 0;

        let mut lines = Vec::new();
        for encoded_line in self.mappings.split(';') {
            let mut generated_column: i64 = 0;
            let mut segments = Vec::new();

            for encoded in encoded_line.split(',').filter(|s| !s.is_empty()) {
                let fields = vlq::decode(encoded)?;
                generated_column += fields[0];

                let origin = match fields.len() {
                    1 => None,
                    4 | 5 => {
                        source += fields[1];
                        line += fields[2];
                        column += fields[3];
                        let name = (fields.len() == 5).then(|| {
                            name += fields[4];
                            name
                        });
                        Some(Origin {
                            source: checked(source, "source index")?,
                            line: checked(line, "source line")?,
                            column: checked(column, "source column")?,
                            name: name.map(|n| checked(n, "name index")).transpose()?,
                        })
                    },
                    n => {
                        return Err(BuildError::source_map(format!(
                            "segment '{encoded}' has {n} fields"
                        )));
                    },
                };

                segments.push(Segment {
                    generated_column: checked(generated_column, "generated column")?,
                    origin,
                });
            }
            lines.push(segments);
        }
        Ok(lines)
    }

    /// Replaces `mappings` with the encoding of `lines`.
    ///
    /// Segments of each line are sorted by generated column first.
    pub fn set_lines(&mut self, lines: &[Vec<Segment>]) {
        let mut out = String::new();
        let (mut source, mut line, mut column, mut name) = (0_i64, 0_i64, 0_i64, 0_i64);

        for (index, segments) in lines.iter().enumerate() {
            if index > 0 {
                out.push(';');
            }
            let mut sorted = segments.clone();
            sorted.sort_by_key(|s| s.generated_column);

            let mut generated_column = 0_i64;
            for (i, segment) in sorted.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                vlq::encode(i64::from(segment.generated_column) - generated_column, &mut out);
                generated_column = i64::from(segment.generated_column);

                if let Some(origin) = segment.origin {
                    vlq::encode(i64::from(origin.source) - source, &mut out);
                    vlq::encode(i64::from(origin.line) - line, &mut out);
                    vlq::encode(i64::from(origin.column) - column, &mut out);
                    source = i64::from(origin.source);
                    line = i64::from(origin.line);
                    column = i64::from(origin.column);
                    if let Some(n) = origin.name {
                        vlq::encode(i64::from(n) - name, &mut out);
                        name = i64::from(n);
                    }
                }
            }
        }
        self.mappings = out;
    }

    /// Original position of a generated `(line, column)`.
    ///
    /// Picks the last segment on `line` starting at or before `column`; the
    /// distance from that segment's start is carried over to the original
    /// column. `None` if no segment covers the position.
    #[must_use]
    pub fn lookup(lines: &[Vec<Segment>], line: u32, column: u32) -> Option<Origin> {
        let segments = lines.get(usize::try_from(line).ok()?)?;
        let index = segments.partition_point(|s| s.generated_column <= column);
        let segment = segments.get(index.checked_sub(1)?)?;
        let origin = segment.origin?;
        let offset = column - segment.generated_column;
        Some(Origin { column: origin.column.saturating_add(offset), ..origin })
    }

    /// Chains `self` (generated → intermediate) through `input`
    /// (intermediate → original) into a map from generated to original.
    ///
    /// Every source of `self` is treated as the file `input` describes.
    /// Positions `input` does not cover are dropped. Names from `self` win
    /// over names from `input`.
    ///
    /// # Errors
    /// Returns [`BuildError::SourceMap`] if either map fails to decode.
    pub fn compose(&self, input: &Self) -> Result<Self, BuildError> {
        let outer = self.lines()?;
        let mut inner = input.lines()?;
        for segments in &mut inner {
            segments.sort_by_key(|s| s.generated_column);
        }

        let mut composed = Self { file: self.file.clone(), ..Self::new(String::new()) };
        let mut sources: HashMap<u32, u32> = HashMap::new();
        let mut names: HashMap<String, u32> = HashMap::new();
        let mut contents: Vec<Option<String>> = Vec::new();

        let mut lines: Lines = Vec::with_capacity(outer.len());
        for segments in &outer {
            let mut mapped = Vec::with_capacity(segments.len());
            for segment in segments {
                let Some(via) = segment.origin else { continue };
                let Some(origin) = Self::lookup(&inner, via.line, via.column) else { continue };

                let source = match sources.get(&origin.source) {
                    Some(index) => *index,
                    None => {
                        let path = input
                            .sources
                            .get(origin.source as usize)
                            .ok_or_else(|| {
                                BuildError::source_map(format!(
                                    "source index {} out of range",
                                    origin.source
                                ))
                            })?
                            .clone();
                        let index = u32::try_from(composed.sources.len())
                            .map_err(|_| BuildError::source_map("too many sources"))?;
                        composed.sources.push(path);
                        contents.push(
                            input
                                .sources_content
                                .as_ref()
                                .and_then(|c| c.get(origin.source as usize).cloned())
                                .flatten(),
                        );
                        sources.insert(origin.source, index);
                        index
                    },
                };

                let name = via
                    .name
                    .and_then(|n| self.names.get(n as usize))
                    .or_else(|| origin.name.and_then(|n| input.names.get(n as usize)))
                    .map(|name| intern(&mut composed.names, &mut names, name))
                    .transpose()?;

                mapped.push(Segment {
                    generated_column: segment.generated_column,
                    origin: Some(Origin { source, line: origin.line, column: origin.column, name }),
                });
            }
            lines.push(mapped);
        }

        if contents.iter().any(Option::is_some) {
            composed.sources_content = Some(contents);
        }
        composed.set_lines(&lines);
        Ok(composed)
    }
}

fn intern(
    names: &mut Vec<String>,
    index: &mut HashMap<String, u32>,
    name: &str,
) -> Result<u32, BuildError> {
    if let Some(i) = index.get(name) {
        return Ok(*i);
    }
    let i = u32::try_from(names.len()).map_err(|_| BuildError::source_map("too many names"))?;
    names.push(name.to_owned());
    index.insert(name.to_owned(), i);
    Ok(i)
}

fn checked(value: i64, what: &str) -> Result<u32, BuildError> {
    u32::try_from(value)
        .map_err(|_| BuildError::source_map(format!("{what} out of range: {value}")))
}

/// URL of a `sourceMappingURL` comment, if `line` is one.
pub(crate) fn comment_url(line: &str) -> Option<&str> {
    let line = line.trim();
    ["//# sourceMappingURL=", "//@ sourceMappingURL="]
        .iter()
        .find_map(|prefix| line.strip_prefix(prefix))
        .or_else(|| line.strip_prefix("/*# sourceMappingURL=").and_then(|r| r.strip_suffix("*/")))
        .map(str::trim)
}
