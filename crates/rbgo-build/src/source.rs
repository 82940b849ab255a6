//! Import extraction for package directories
//!
//! Files are parsed with tree-sitter, but only the header is consulted: the
//! package clause and the import declarations that follow it. Syntax errors
//! further down are left for the compiler to report.

use crate::error::{BuildError, BuildResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tree_sitter::{Language, Node, Parser};

/// One compilable source file as seen by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File path
    pub path: PathBuf,
    /// Declared package label
    pub package: String,
    /// Last modification time
    pub mod_time: SystemTime,
    /// Import identifiers in declaration order
    pub imports: Vec<String>,
}

/// Extracts `{package, modTime, imports}` for every compilable file in a directory.
///
/// Implementations skip entry-point (`main`) files and return an empty list for
/// directories that contain nothing compilable.
pub trait SourceScanner: Send + Sync {
    fn scan_dir(&self, dir: &Path) -> BuildResult<Vec<SourceFile>>;
}

/// Scanner for Go sources
#[derive(Debug, Clone, Copy, Default)]
pub struct GoSourceScanner;

/// Whether `path` names a Go source file that takes part in a build.
pub fn is_go_source(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    name.ends_with(".go") && !name.ends_with("_test.go")
}

impl SourceScanner for GoSourceScanner {
    fn scan_dir(&self, dir: &Path) -> BuildResult<Vec<SourceFile>> {
        let mut entries = fs::read_dir(dir)
            .map_err(|e| BuildError::io(dir, e))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_go_source(p))
            .collect::<Vec<_>>();
        entries.sort();

        let mut parser = HeaderParser::new().map_err(|msg| BuildError::parse(dir, msg))?;
        let mut sources = Vec::with_capacity(entries.len());
        for path in entries {
            let metadata = fs::metadata(&path).map_err(|e| BuildError::io(&path, e))?;
            if !metadata.is_file() {
                continue;
            }
            let text = fs::read_to_string(&path).map_err(|e| BuildError::io(&path, e))?;
            let header = parser.parse(&text).map_err(|msg| BuildError::parse(&path, msg))?;
            if header.package == "main" {
                continue;
            }
            sources.push(SourceFile {
                path,
                package: header.package,
                mod_time: metadata.modified().map_err(|e| BuildError::io(dir, e))?,
                imports: header.imports,
            });
        }
        Ok(sources)
    }
}

/// Package clause and imports of one Go file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoHeader {
    pub package: String,
    pub imports: Vec<String>,
}

/// Parse the package clause and import declarations of a Go file.
pub fn parse_header(src: &str) -> Result<GoHeader, String> {
    HeaderParser::new()?.parse(src)
}

/// Reads Go file headers with the tree-sitter Go grammar.
///
/// Only the package clause and the import declarations directly after it
/// have to be well formed; the rest of the file is not inspected.
pub struct HeaderParser {
    parser: Parser,
}

impl HeaderParser {
    pub fn new() -> Result<Self, String> {
        let language: Language = tree_sitter_go::LANGUAGE.into();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| format!("Failed to set language: {}", e))?;
        Ok(Self { parser })
    }

    pub fn parse(&mut self, src: &str) -> Result<GoHeader, String> {
        let src = src.strip_prefix(BYTE_ORDER_MARK).unwrap_or(src);
        let tree = self
            .parser
            .parse(src, None)
            .ok_or_else(|| "Failed to parse file".to_string())?;
        let root = tree.root_node();
        if root.is_error() {
            return Err(unexpected(root, "package clause"));
        }
        let text = src.as_bytes();

        let mut cursor = root.walk();
        let mut decls = root
            .named_children(&mut cursor)
            .filter(|node| node.kind() != "comment");

        let package = match decls.next() {
            Some(node) if node.kind() == "package_clause" && !node.has_error() => {
                package_name(node, text)?
            }
            Some(node) => return Err(unexpected(node, "package clause")),
            None => return Err("expected package clause, found end of file".to_string()),
        };

        let mut imports = Vec::new();
        for node in decls {
            match node.kind() {
                "import_declaration" if !node.has_error() => {
                    collect_imports(node, text, &mut imports)?
                }
                "import_declaration" | "ERROR" => {
                    return Err(unexpected(node, "import declaration"))
                }
                _ => break,
            }
        }

        Ok(GoHeader { package, imports })
    }
}

const BYTE_ORDER_MARK: char = '\u{feff}';

fn unexpected(node: Node<'_>, expected: &str) -> String {
    let at = node.start_position();
    let found = if node.is_error() || node.has_error() {
        "syntax error"
    } else {
        node.kind()
    };
    format!(
        "{}:{}: expected {}, found {}",
        at.row + 1,
        at.column + 1,
        expected,
        found
    )
}

fn node_text<'s>(node: Node<'_>, text: &'s [u8]) -> Result<&'s str, String> {
    node.utf8_text(text).map_err(|e| e.to_string())
}

fn package_name(clause: Node<'_>, text: &[u8]) -> Result<String, String> {
    let mut cursor = clause.walk();
    let name = clause
        .named_children(&mut cursor)
        .find(|node| node.kind() == "package_identifier");
    match name {
        Some(node) => Ok(node_text(node, text)?.to_string()),
        None => Err(unexpected(clause, "package name")),
    }
}

/// Append the paths of `decl`, either `import "p"` or `import ( ... )`
fn collect_imports(decl: Node<'_>, text: &[u8], imports: &mut Vec<String>) -> Result<(), String> {
    let mut cursor = decl.walk();
    for child in decl.named_children(&mut cursor) {
        match child.kind() {
            "import_spec" => imports.push(import_path_of(child, text)?),
            "import_spec_list" => {
                let mut list_cursor = child.walk();
                for spec in child.named_children(&mut list_cursor) {
                    if spec.kind() == "import_spec" {
                        imports.push(import_path_of(spec, text)?);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn import_path_of(spec: Node<'_>, text: &[u8]) -> Result<String, String> {
    let path = spec
        .child_by_field_name("path")
        .ok_or_else(|| unexpected(spec, "import path"))?;
    unquote(node_text(path, text)?)
}

/// Value of a Go string literal, raw or interpreted
fn unquote(literal: &str) -> Result<String, String> {
    if let Some(raw) = literal.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return Ok(raw.replace('\r', ""));
    }
    let body = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| format!("malformed string literal {}", literal))?;

    let mut value = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        let escape = chars
            .next()
            .ok_or_else(|| "unterminated escape sequence".to_string())?;
        let decoded = match escape {
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\u{b}',
            '\\' => '\\',
            '"' => '"',
            'x' => ascii_byte(escaped_code(&mut chars, String::new(), 2, 16)?)?,
            'u' => unicode(escaped_code(&mut chars, String::new(), 4, 16)?)?,
            'U' => unicode(escaped_code(&mut chars, String::new(), 8, 16)?)?,
            '0'..='7' => ascii_byte(escaped_code(&mut chars, escape.to_string(), 3, 8)?)?,
            other => return Err(format!("unknown escape sequence \\{}", other)),
        };
        value.push(decoded);
    }
    Ok(value)
}

fn escaped_code(
    chars: &mut std::str::Chars<'_>,
    mut digits: String,
    len: usize,
    radix: u32,
) -> Result<u32, String> {
    while digits.len() < len {
        match chars.next() {
            Some(c) => digits.push(c),
            None => return Err("escape sequence is too short".to_string()),
        }
    }
    u32::from_str_radix(&digits, radix).map_err(|_| format!("invalid escape digits '{}'", digits))
}

/// Byte escapes only make sense in an import path when they are ASCII
fn ascii_byte(code: u32) -> Result<char, String> {
    match u8::try_from(code) {
        Ok(byte) if byte.is_ascii() => Ok(char::from(byte)),
        _ => Err(format!("non-ASCII byte escape {:#x} in import path", code)),
    }
}

fn unicode(code: u32) -> Result<char, String> {
    char::from_u32(code).ok_or_else(|| format!("invalid code point {:#x}", code))
}
