use crate::error::BuildError;
use crate::sourcemap::{Origin, Segment, SourceMap, comment_url};
use async_trait::async_trait;
use std::fmt::Debug;

/// Output of a whole-bundle pass.
#[derive(Debug, Clone)]
pub struct Transpiled {
    pub code: String,
    /// Map from `code` to the original sources, already chained through the
    /// input map.
    pub map: SourceMap,
}

/// Second pass over a finished bundle.
#[async_trait]
pub trait Transpiler: Send + Sync + Debug {
    /// Rewrites `code`, whose positions `input_map` describes.
    async fn transpile(&self, code: &str, input_map: &SourceMap) -> Result<Transpiled, BuildError>;
}

/// Whitespace minifier.
///
/// Drops blank lines and existing `sourceMappingURL` comments and trims every
/// remaining line. Each kept line maps to where its first non-blank character
/// was in the bundle.
#[derive(Debug, Default, Clone, Copy)]
pub struct Minifier;

#[async_trait]
impl Transpiler for Minifier {
    async fn transpile(&self, code: &str, input_map: &SourceMap) -> Result<Transpiled, BuildError> {
        let mut minified = Vec::new();
        let mut lines = Vec::new();

        for (index, line) in code.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || comment_url(trimmed).is_some() {
                continue;
            }
            // Map columns count UTF-16 units.
            let indent = line[..line.len() - line.trim_start().len()].encode_utf16().count();
            lines.push(vec![Segment {
                generated_column: 0,
                origin: Some(Origin {
                    source: 0,
                    line: to_u32(index)?,
                    column: to_u32(indent)?,
                    name: None,
                }),
            }]);
            minified.push(trimmed);
        }

        let mut own = SourceMap::new(input_map.file.clone().unwrap_or_default());
        own.sources.push(input_map.file.clone().unwrap_or_else(|| "bundle.js".to_owned()));
        own.set_lines(&lines);

        let map = own.compose(input_map)?;
        Ok(Transpiled { code: minified.join("\n"), map })
    }
}


fn to_u32(value: usize) -> Result<u32, BuildError> {
    u32::try_from(value).map_err(|_| BuildError::source_map(format!("position {value} too large")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn strips_blank_lines_and_map_comments() {
        let code = "var a = 1;\n\n    if (a) {\n      go();\n    }\n//# sourceMappingURL=application.js.map\n";
        let input = SourceMap::identity("application.js", "../../javascript/application.js", code);

        let out = Minifier.transpile(code, &input).await.unwrap();

        assert_eq!(out.code, "var a = 1;\nif (a) {\ngo();\n}");
        assert_eq!(out.map.sources, vec!["../../javascript/application.js".to_owned()]);
    }

    #[tokio::test]
    async fn maps_point_at_original_indentation() {
        let code = "a();\n\n  b();\n";
        let input = SourceMap::identity("application.js", "src.js", code);

        let out = Minifier.transpile(code, &input).await.unwrap();
        let lines = out.map.lines().unwrap();

        assert_eq!(lines.len(), 2);
        let second = lines[1][0].origin.unwrap();
        assert_eq!((second.line, second.column), (2, 2));
    }

    #[tokio::test]
    async fn indentation_is_measured_in_utf16_units() {
        let code = "a();\n\u{3000}\u{3000}b();\n";
        let input = SourceMap::identity("application.js", "src.js", code);

        let out = Minifier.transpile(code, &input).await.unwrap();
        let second = out.map.lines().unwrap()[1][0].origin.unwrap();

        assert_eq!(out.code, "a();\nb();");
        assert_eq!((second.line, second.column), (1, 2));
    }

    #[tokio::test]
    async fn chains_through_the_input_map() {
        let code = "x();\ny();";
        let mut input = SourceMap::new("application.js");
        input.sources = vec!["one.coffee".to_owned(), "two.coffee".to_owned()];
        input.set_lines(&[
            vec![Segment {
                generated_column: 0,
                origin: Some(Origin { source: 1, line: 4, column: 0, name: None }),
            }],
            vec![Segment {
                generated_column: 0,
                origin: Some(Origin { source: 0, line: 9, column: 2, name: None }),
            }],
        ]);

        let out = Minifier.transpile(code, &input).await.unwrap();

        assert_eq!(out.map.sources, vec!["two.coffee".to_owned(), "one.coffee".to_owned()]);
        let lines = out.map.lines().unwrap();
        assert_eq!(lines[0][0].origin.map(|o| (o.source, o.line)), Some((0, 4)));
        assert_eq!(lines[1][0].origin.map(|o| (o.source, o.line, o.column)), Some((1, 9, 2)));
    }
}
