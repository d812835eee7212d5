//! The NDB debug-info sidecar: a textual, line-based format recording
//! which source files contributed to a compiled script, its struct
//! layouts, its functions' entry points, its variables' scopes, and a
//! line-number map.
//!
//! Each record is one line, tag-prefixed:
//!
//! ```text
//! FILE <path>
//! STRUCT <label>
//!   FIELD <type> <name>
//! FUNCTION <label> <start> <end> <return-type>
//!   PARAM <type> <name>
//! VAR <name> <type> <start> <end>
//! LINE <address> <file-index> <line-number>
//! ```
//!
//! `STRUCT`/`FUNCTION` blocks' indented `FIELD`/`PARAM` lines belong to
//! the most recently opened block.

use std::io::BufRead;

use crate::error::{Result, VmError};
use crate::langspec::VMType;

/// The type of a struct field, function return value, or parameter.
/// Mirrors [`VMType`] plus a reference to a user-defined struct.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarType {
    Void,
    Int,
    Float,
    String,
    Object,
    Vector,
    Struct(StructRef),
}

impl ScalarType {
    fn parse(s: &str) -> Result<Self> {
        if let Some(id) = s.strip_prefix("struct#") {
            let id: usize = id
                .parse()
                .map_err(|_| VmError::FormatError(format!("bad struct reference {s:?}")))?;
            return Ok(ScalarType::Struct(StructRef { id }));
        }
        Ok(match VMType::parse(s)? {
            VMType::Void => ScalarType::Void,
            VMType::Int => ScalarType::Int,
            VMType::Float => ScalarType::Float,
            VMType::String => ScalarType::String,
            VMType::Object => ScalarType::Object,
            VMType::Vector => ScalarType::Vector,
            other => {
                return Err(VmError::FormatError(format!(
                    "{other:?} cannot appear in NDB struct/function signatures"
                )))
            }
        })
    }
}

/// A reference into [`Ndb::structs`] by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructRef {
    pub id: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Struct {
    pub label: String,
    pub fields: Vec<(ScalarType, String)>,
}

impl Struct {
    pub fn new(label: impl Into<String>, fields: Vec<(ScalarType, String)>) -> Self {
        Self {
            label: label.into(),
            fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub label: String,
    pub start: u32,
    pub end: u32,
    pub return_type: ScalarType,
    pub params: Vec<(ScalarType, String)>,
}

impl Function {
    pub fn new(
        label: impl Into<String>,
        start: u32,
        end: u32,
        return_type: ScalarType,
        params: Vec<(ScalarType, String)>,
    ) -> Self {
        Self {
            label: label.into(),
            start,
            end,
            return_type,
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: ScalarType,
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineEntry {
    pub address: u32,
    pub file_index: usize,
    pub line: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ndb {
    pub files: Vec<String>,
    pub structs: Vec<Struct>,
    pub functions: Vec<Function>,
    pub variables: Vec<Variable>,
    pub lines: Vec<LineEntry>,
}

impl Ndb {
    pub fn struct_by_id(&self, r: StructRef) -> Result<&Struct> {
        self.structs
            .get(r.id)
            .ok_or_else(|| VmError::FormatError(format!("no struct with id {}", r.id)))
    }

    pub fn function_by_name(&self, name: &str) -> Result<&Function> {
        self.functions
            .iter()
            .find(|f| f.label == name)
            .ok_or_else(|| VmError::UnknownFunction(name.to_string()))
    }
}

enum OpenBlock {
    Struct(usize),
    Function(usize),
}

fn split_fields(rest: &str) -> Vec<&str> {
    rest.split_whitespace().collect()
}

pub fn read<R: BufRead>(reader: R) -> Result<Ndb> {
    let mut ndb = Ndb::default();
    let mut open: Option<OpenBlock> = None;

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            let fields = split_fields(trimmed);
            match (&open, fields.as_slice()) {
                (Some(OpenBlock::Struct(idx)), ["FIELD", ty, name]) => {
                    ndb.structs[*idx]
                        .fields
                        .push((ScalarType::parse(ty)?, (*name).to_string()));
                }
                (Some(OpenBlock::Function(idx)), ["PARAM", ty, name]) => {
                    ndb.functions[*idx]
                        .params
                        .push((ScalarType::parse(ty)?, (*name).to_string()));
                }
                _ => {
                    return Err(VmError::FormatError(format!(
                        "unexpected indented NDB line: {trimmed:?}"
                    )))
                }
            }
            continue;
        }

        let fields = split_fields(trimmed);
        match fields.as_slice() {
            ["FILE", path] => {
                ndb.files.push((*path).to_string());
                open = None;
            }
            ["STRUCT", label] => {
                ndb.structs.push(Struct::new(*label, Vec::new()));
                open = Some(OpenBlock::Struct(ndb.structs.len() - 1));
            }
            ["FUNCTION", label, start, end, ret] => {
                let start: u32 = start
                    .parse()
                    .map_err(|_| VmError::FormatError(format!("bad address {start:?}")))?;
                let end: u32 = end
                    .parse()
                    .map_err(|_| VmError::FormatError(format!("bad address {end:?}")))?;
                ndb.functions
                    .push(Function::new(*label, start, end, ScalarType::parse(ret)?, Vec::new()));
                open = Some(OpenBlock::Function(ndb.functions.len() - 1));
            }
            ["VAR", name, ty, start, end] => {
                let start: u32 = start
                    .parse()
                    .map_err(|_| VmError::FormatError(format!("bad address {start:?}")))?;
                let end: u32 = end
                    .parse()
                    .map_err(|_| VmError::FormatError(format!("bad address {end:?}")))?;
                ndb.variables.push(Variable {
                    name: (*name).to_string(),
                    ty: ScalarType::parse(ty)?,
                    start,
                    end,
                });
                open = None;
            }
            ["LINE", address, file_index, lineno] => {
                ndb.lines.push(LineEntry {
                    address: address
                        .parse()
                        .map_err(|_| VmError::FormatError(format!("bad address {address:?}")))?,
                    file_index: file_index
                        .parse()
                        .map_err(|_| VmError::FormatError(format!("bad file index {file_index:?}")))?,
                    line: lineno
                        .parse()
                        .map_err(|_| VmError::FormatError(format!("bad line number {lineno:?}")))?,
                });
                open = None;
            }
            _ => return Err(VmError::FormatError(format!("unrecognized NDB line: {trimmed:?}"))),
        }
    }

    Ok(ndb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn struct_by_id_finds_by_index() {
        let ndb = Ndb {
            structs: vec![Struct::new("struct1", Vec::new())],
            ..Default::default()
        };
        let s = ndb.struct_by_id(StructRef { id: 0 }).unwrap();
        assert_eq!(s.label, "struct1");
    }

    #[test]
    fn function_by_name_errors_when_missing() {
        let ndb = Ndb {
            functions: vec![Function::new("func1", 0, 1, ScalarType::Int, Vec::new())],
            ..Default::default()
        };
        assert_eq!(ndb.function_by_name("func1").unwrap().label, "func1");
        assert!(matches!(
            ndb.function_by_name("nonexistent"),
            Err(VmError::UnknownFunction(_))
        ));
    }

    #[test]
    fn parses_full_record_set() {
        let src = "\
FILE main.nss\nSTRUCT point\n  FIELD int x\n  FIELD int y\nFUNCTION add 0 42 int\n  PARAM int a\n  PARAM int b\nVAR gCounter int 0 100\nLINE 0 0 3\n";
        let ndb = read(Cursor::new(src)).unwrap();
        assert_eq!(ndb.files, vec!["main.nss"]);
        assert_eq!(ndb.structs[0].fields.len(), 2);
        assert_eq!(ndb.functions[0].params.len(), 2);
        assert_eq!(ndb.variables[0].name, "gCounter");
        assert_eq!(ndb.lines[0].line, 3);
    }
}
