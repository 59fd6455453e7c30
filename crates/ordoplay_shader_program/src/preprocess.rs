// SPDX-License-Identifier: MIT OR Apache-2.0
//! GLSL token front end used by the headless device.
//!
//! Fragments are joined the way a driver joins them and run through the
//! `pp-rs` preprocessor, the one naga's GLSL frontend is built on, which
//! handles comments, macro expansion, conditional compilation and `#error`.
//! The live tokens are then scanned for storage-qualified globals.

use pp_rs::pp::Preprocessor;
use pp_rs::token::{Punct, Token, TokenValue};

/// A diagnostic from the front end, positioned as `<fragment>:<line>`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ERROR: {fragment}:{line}: {message}")]
pub struct SourceError {
    /// Index of the submitted fragment
    pub fragment: usize,
    /// 1-based line inside the fragment
    pub line: usize,
    /// What went wrong
    pub message: String,
}

/// Fragments joined into one translation unit
#[derive(Debug, Clone, Default)]
pub struct JoinedSource {
    /// Concatenated text
    pub text: String,
    starts: Vec<usize>,
}

impl JoinedSource {
    /// Join fragments, ending each non-empty one with a line break
    pub fn new(fragments: &[&str]) -> Self {
        let mut text = String::new();
        let mut starts = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            starts.push(text.len());
            text.push_str(fragment);
            if !fragment.is_empty() && !fragment.ends_with('\n') {
                text.push('\n');
            }
        }
        Self { text, starts }
    }

    /// Fragment index and 1-based line of a byte offset into the text
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let fragment = self.starts.iter().rposition(|start| *start <= offset).unwrap_or(0);
        let start = self.starts.get(fragment).copied().unwrap_or(0);
        let line = 1 + self.text.as_bytes()[start..offset]
            .iter()
            .filter(|b| **b == b'\n')
            .count();
        (fragment, line)
    }

    /// Error at a byte offset
    pub fn error(&self, offset: usize, message: impl Into<String>) -> SourceError {
        let (fragment, line) = self.position(offset);
        SourceError {
            fragment,
            line,
            message: message.into(),
        }
    }
}

/// Preprocess the fragments as one unit and return the live tokens
pub fn preprocess(fragments: &[&str]) -> Result<Vec<Token>, SourceError> {
    let source = JoinedSource::new(fragments);
    let mut tokens = Vec::new();
    for token in Preprocessor::new(&source.text) {
        match token {
            Ok(token) => tokens.push(token),
            Err((error, location)) => {
                return Err(source.error(location.start as usize, format!("{error:?}")));
            }
        }
    }
    Ok(tokens)
}

/// Number in the first `#version` directive, if any
pub fn declared_version(source: &str) -> Option<u32> {
    source.lines().find_map(|line| {
        let directive = line.trim_start().strip_prefix('#')?.trim_start();
        let rest = directive.strip_prefix("version")?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

/// Storage class of a global declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Per-vertex input
    Attribute,
    /// Constant per draw
    Uniform,
    /// Vertex output or fragment input
    Varying,
    /// Fragment output
    Output,
}

/// A storage-qualified global
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Storage class
    pub storage: Storage,
    /// GLSL type keyword
    pub type_name: String,
    /// Variable name
    pub name: String,
    /// Array length, 1 for non-arrays
    pub size: u32,
}

const QUALIFIERS: [&str; 9] = [
    "highp",
    "mediump",
    "lowp",
    "flat",
    "smooth",
    "noperspective",
    "centroid",
    "invariant",
    "const",
];

fn ident(value: &TokenValue) -> Option<&str> {
    match value {
        TokenValue::Ident(name) => Some(name.as_str()),
        _ => None,
    }
}

/// Collect attribute, uniform and varying declarations at global scope.
///
/// `in`/`out` are read per stage: vertex `in` is an attribute, vertex `out`
/// and fragment `in` are varyings. Block members are not reported.
pub fn scan_declarations(tokens: &[Token], vertex_stage: bool) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    let mut statement: Vec<&TokenValue> = Vec::new();
    let mut depth = 0usize;

    for token in tokens {
        match &token.value {
            TokenValue::Punct(Punct::LeftBrace) => {
                depth += 1;
                statement.clear();
            }
            TokenValue::Punct(Punct::RightBrace) => {
                depth = depth.saturating_sub(1);
                statement.clear();
            }
            TokenValue::Punct(Punct::Semicolon) => {
                if depth == 0 {
                    declare(&statement, vertex_stage, &mut declarations);
                }
                statement.clear();
            }
            value if depth == 0 => statement.push(value),
            _ => {}
        }
    }

    declarations
}

fn declare(statement: &[&TokenValue], vertex_stage: bool, declarations: &mut Vec<Declaration>) {
    let mut rest = statement;
    if rest.first().and_then(|v| ident(v)) == Some("layout") {
        let close = rest
            .iter()
            .position(|v| matches!(v, TokenValue::Punct(Punct::RightParen)));
        rest = match close {
            Some(at) => &rest[at + 1..],
            None => &[],
        };
    }
    let mut rest = rest
        .iter()
        .copied()
        .filter(|v| ident(v).map_or(true, |word| !QUALIFIERS.contains(&word)));

    let storage = match (rest.next().and_then(ident), vertex_stage) {
        (Some("attribute"), _) | (Some("in"), true) => Storage::Attribute,
        (Some("uniform"), _) => Storage::Uniform,
        (Some("varying"), _) | (Some("out"), true) | (Some("in"), false) => Storage::Varying,
        (Some("out"), false) => Storage::Output,
        _ => return,
    };
    let Some(type_name) = rest.next().and_then(ident) else {
        return;
    };

    let mut name: Option<&str> = None;
    let mut size = 1;
    let mut in_brackets = false;
    let mut in_initializer = false;
    let mut parens = 0usize;
    let mut push = |name: &mut Option<&str>, size: &mut u32| {
        if let Some(name) = name.take() {
            declarations.push(Declaration {
                storage,
                type_name: type_name.to_string(),
                name: name.to_string(),
                size: *size,
            });
        }
        *size = 1;
    };

    for value in rest {
        match value {
            TokenValue::Punct(Punct::LeftParen) => parens += 1,
            TokenValue::Punct(Punct::RightParen) => parens = parens.saturating_sub(1),
            TokenValue::Punct(Punct::Comma) if parens == 0 => {
                push(&mut name, &mut size);
                in_initializer = false;
            }
            _ if in_initializer => {}
            TokenValue::Punct(Punct::Equal) => in_initializer = true,
            TokenValue::Punct(Punct::LeftBracket) => in_brackets = true,
            TokenValue::Punct(Punct::RightBracket) => in_brackets = false,
            TokenValue::Integer(integer) if in_brackets => {
                size = u32::try_from(integer.value).unwrap_or(1);
            }
            TokenValue::Ident(word) if name.is_none() && !in_brackets => name = Some(word.as_str()),
            _ => {}
        }
    }
    push(&mut name, &mut size);
}

/// Whether a `main` function is defined at global scope
pub fn has_main(tokens: &[Token]) -> bool {
    let mut depth = 0usize;
    tokens.windows(2).any(|pair| {
        match &pair[0].value {
            TokenValue::Punct(Punct::LeftBrace) => depth += 1,
            TokenValue::Punct(Punct::RightBrace) => depth = depth.saturating_sub(1),
            _ => {}
        }
        depth == 0
            && ident(&pair[0].value) == Some("main")
            && matches!(pair[1].value, TokenValue::Punct(Punct::LeftParen))
    })
}

/// Whether every `}` closes an earlier `{` and all are closed
pub fn braces_balanced(tokens: &[Token]) -> bool {
    let mut depth = 0usize;
    for token in tokens {
        match token.value {
            TokenValue::Punct(Punct::LeftBrace) => depth += 1,
            TokenValue::Punct(Punct::RightBrace) => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(fragments: &[&str]) -> Vec<String> {
        preprocess(fragments)
            .unwrap()
            .iter()
            .filter_map(|t| ident(&t.value).map(str::to_string))
            .collect()
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(words(&["a // b\nc /* d\ne */ f\n"]), vec!["a", "c", "f"]);
    }

    #[test]
    fn test_conditionals_follow_defines() {
        let live = words(&[
            "#define FOO\n",
            "#ifdef FOO\nfoo\n#else\nnotfoo\n#endif\n\
             #if defined(BAR) || !defined(FOO)\nbar\n#elif 1\nelif\n#endif\n\
             #undef FOO\n#ifndef FOO\ngone\n#endif\n",
        ]);
        assert_eq!(live, vec!["foo", "elif", "gone"]);
    }

    #[test]
    fn test_arithmetic_conditions() {
        let live = words(&[
            "#define QUALITY 2\n",
            "#if QUALITY > 1\nhigh\n#endif\n\
             #if(defined(A))\nnever\n#endif\n\
             #if (QUALITY * 2 == 4) && !defined(A)\nboth\n#endif\n",
        ]);
        assert_eq!(live, vec!["high", "both"]);
    }

    #[test]
    fn test_error_directive_only_when_live() {
        assert!(preprocess(&["#ifdef NOPE\n#error never\n#endif\n"]).is_ok());

        let err = preprocess(&["#define A\n", "x\n#ifdef A\n#error broken\n#endif\n"]).unwrap_err();
        assert_eq!(err.fragment, 1);
        assert!(err.to_string().starts_with("ERROR: 1:"));
    }

    #[test]
    fn test_unbalanced_conditionals() {
        assert!(preprocess(&["#endif\n"]).is_err());
        assert!(preprocess(&["#ifdef A\n"]).is_err());
    }

    #[test]
    fn test_positions_map_to_fragments() {
        let source = JoinedSource::new(&["#define A\n#define B", "", "x\ny\n"]);
        assert_eq!(source.text, "#define A\n#define B\nx\ny\n");
        assert_eq!(source.position(0), (0, 1));
        assert_eq!(source.position(12), (0, 2));
        assert_eq!(source.position(20), (2, 1));
        assert_eq!(source.position(22), (2, 2));
        assert_eq!(source.position(1000), (2, 3));
    }

    #[test]
    fn test_declared_version() {
        assert_eq!(declared_version("// header\n  #  version 450 core\nvoid main() {}"), Some(450));
        assert_eq!(declared_version("#version 100\n"), Some(100));
        assert_eq!(declared_version("void main() {}"), None);
    }

    #[test]
    fn test_scan_declarations() {
        let tokens = preprocess(&["#define LAYERS 4\n\
                                   precision mediump float;\n\
                                   attribute highp vec3 inPosition;\n\
                                   uniform sampler2D texture[LAYERS];\n\
                                   uniform vec4 a, b;\n\
                                   uniform vec2 offset = vec2(1.0, 2.0), scale;\n\
                                   varying vec2 varTexCoord0;\n\
                                   void main() { float local; gl_Position = vec4(inPosition, 1.0); }\n"])
        .unwrap();
        let declarations = scan_declarations(&tokens, true);
        let names: Vec<&str> = declarations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["inPosition", "texture", "a", "b", "offset", "scale", "varTexCoord0"]
        );
        assert_eq!(declarations[0].storage, Storage::Attribute);
        assert_eq!(declarations[0].type_name, "vec3");
        assert_eq!(declarations[1].size, 4);
        assert_eq!(declarations[5].size, 1);
        assert_eq!(declarations[6].storage, Storage::Varying);
    }

    #[test]
    fn test_in_out_per_stage() {
        let tokens = preprocess(&["layout(location = 0) in vec3 inNormal;\nflat out vec3 n;\n"]).unwrap();
        let vertex = scan_declarations(&tokens, true);
        assert_eq!(vertex[0].storage, Storage::Attribute);
        assert_eq!(vertex[0].name, "inNormal");
        assert_eq!(vertex[1].storage, Storage::Varying);

        let fragment = scan_declarations(&tokens, false);
        assert_eq!(fragment[0].storage, Storage::Varying);
        assert_eq!(fragment[1].storage, Storage::Output);
    }

    #[test]
    fn test_main_and_braces() {
        let check = |source: &str| {
            let tokens = preprocess(&[source]).unwrap();
            (has_main(&tokens), braces_balanced(&tokens))
        };
        assert_eq!(check("void main () {}"), (true, true));
        assert_eq!(check("void domain() {}"), (false, true));
        assert_eq!(check("float mainly;"), (false, true));
        assert_eq!(check("void f() { main(); }"), (false, true));
        assert_eq!(check("} {"), (false, false));
        assert_eq!(check("void main() {"), (true, false));
    }
}
