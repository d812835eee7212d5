//! A hand-rolled reader for the `nwscript.nss`-shaped function/constant
//! declaration list: a flat text file of `const TYPE NAME = VALUE;`
//! constant declarations and `TYPE Name(args);` function prototypes,
//! each optionally preceded by a run of `//` doc-comment lines.
//!
//! The real `nwscript.nss` shipped by the engine is a generated data
//! file, not source in this toolkit's lineage, so this reader targets
//! the declaration grammar rather than a specific build's byte content.

use std::io::BufRead;

use crate::error::{Result, VmError};
use crate::object::Object;

/// The argument/return types nwscript functions and constants are typed
/// over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VMType {
    Void,
    Int,
    Float,
    String,
    Object,
    Vector,
    Action,
    Effect,
    Event,
    Location,
    Talent,
    ItemProperty,
}

impl VMType {
    pub(crate) fn parse(s: &str) -> Result<Self> {
        Ok(match s {
            "void" => VMType::Void,
            "int" => VMType::Int,
            "float" => VMType::Float,
            "string" => VMType::String,
            "object" => VMType::Object,
            "vector" => VMType::Vector,
            "action" => VMType::Action,
            "effect" => VMType::Effect,
            "event" => VMType::Event,
            "location" => VMType::Location,
            "talent" => VMType::Talent,
            "itemproperty" => VMType::ItemProperty,
            other => return Err(VmError::FormatError(format!("unknown nwscript type {other:?}"))),
        })
    }
}

/// A parsed literal or named-constant default value.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Int(i32),
    Float(f32),
    String(String),
    Bool(bool),
    Object(Object),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub ty: VMType,
    pub name: String,
    pub value: LiteralValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionArg {
    pub ty: VMType,
    pub name: String,
    pub default: Option<LiteralValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub id: usize,
    pub return_type: VMType,
    pub name: String,
    pub args: Vec<FunctionArg>,
    pub doc: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LangSpec {
    pub constants: Vec<Constant>,
    pub functions: Vec<Function>,
}

impl LangSpec {
    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn constant_by_name(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|c| c.name == name)
    }
}

fn parse_literal(token: &str) -> Result<LiteralValue> {
    let token = token.trim();
    match token {
        "TRUE" => return Ok(LiteralValue::Bool(true)),
        "FALSE" => return Ok(LiteralValue::Bool(false)),
        "OBJECT_SELF" => return Ok(LiteralValue::Object(Object::SELF)),
        "OBJECT_INVALID" => return Ok(LiteralValue::Object(Object::INVALID)),
        _ => {}
    }
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        return Ok(LiteralValue::String(token[1..token.len() - 1].to_string()));
    }
    if let Ok(i) = token.parse::<i32>() {
        return Ok(LiteralValue::Int(i));
    }
    let stripped = token.strip_suffix(['f', 'F']).unwrap_or(token);
    if let Ok(f) = stripped.parse::<f32>() {
        return Ok(LiteralValue::Float(f));
    }
    Err(VmError::FormatError(format!(
        "cannot resolve literal/default {token:?} (only literals and TRUE/FALSE/OBJECT_SELF/OBJECT_INVALID are supported)"
    )))
}

fn parse_typed_name(segment: &str) -> Result<(VMType, String)> {
    let mut parts = segment.split_whitespace();
    let ty = parts
        .next()
        .ok_or_else(|| VmError::FormatError("expected a type".to_string()))?;
    let name = parts
        .next()
        .ok_or_else(|| VmError::FormatError(format!("expected a name after type {ty:?}")))?;
    Ok((VMType::parse(ty)?, name.to_string()))
}

fn parse_const(stmt: &str) -> Result<Constant> {
    let rest = stmt
        .strip_prefix("const ")
        .ok_or_else(|| VmError::FormatError(format!("malformed const declaration: {stmt:?}")))?;
    let (lhs, rhs) = rest
        .split_once('=')
        .ok_or_else(|| VmError::FormatError(format!("const declaration missing '=': {stmt:?}")))?;
    let (ty, name) = parse_typed_name(lhs)?;
    let value = parse_literal(rhs)?;
    Ok(Constant { ty, name, value })
}

fn parse_function(stmt: &str, doc: Vec<String>, id: usize) -> Result<Function> {
    let open = stmt
        .find('(')
        .ok_or_else(|| VmError::FormatError(format!("malformed function prototype: {stmt:?}")))?;
    let close = stmt
        .rfind(')')
        .ok_or_else(|| VmError::FormatError(format!("malformed function prototype: {stmt:?}")))?;
    let (return_type, name) = parse_typed_name(&stmt[..open])?;
    let arglist = stmt[open + 1..close].trim();

    let mut args = Vec::new();
    if !arglist.is_empty() {
        for arg in arglist.split(',') {
            let arg = arg.trim();
            if let Some((type_name, default)) = arg.split_once('=') {
                let (ty, name) = parse_typed_name(type_name)?;
                args.push(FunctionArg {
                    ty,
                    name,
                    default: Some(parse_literal(default)?),
                });
            } else {
                let (ty, name) = parse_typed_name(arg)?;
                args.push(FunctionArg { ty, name, default: None });
            }
        }
    }

    Ok(Function {
        id,
        return_type,
        name,
        args,
        doc,
    })
}

/// Reads a `nwscript.nss`-shaped declaration list.
pub fn read<R: BufRead>(reader: R) -> Result<LangSpec> {
    let mut spec = LangSpec::default();
    let mut doc: Vec<String> = Vec::new();
    let mut buffer = String::new();
    let mut in_block_comment = false;

    for line in reader.lines() {
        let mut line = line?;

        if in_block_comment {
            if let Some(end) = line.find("*/") {
                line = line[end + 2..].to_string();
                in_block_comment = false;
            } else {
                continue;
            }
        }
        if let Some(start) = line.find("/*") {
            if line[start..].find("*/").is_none() {
                in_block_comment = true;
                line.truncate(start);
            }
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            if buffer.trim().is_empty() {
                doc.clear();
            }
            continue;
        }
        if buffer.is_empty() && trimmed.starts_with("//") {
            doc.push(trimmed.trim_start_matches('/').trim().to_string());
            continue;
        }

        buffer.push(' ');
        buffer.push_str(trimmed);

        if let Some(semi) = buffer.find(';') {
            let stmt = buffer[..semi].trim().to_string();
            buffer = buffer[semi + 1..].to_string();
            let taken_doc = std::mem::take(&mut doc);

            if stmt.is_empty() {
                continue;
            }
            if stmt.starts_with("const ") {
                drop(taken_doc); // constants carry no doc comments in this grammar.
                spec.constants.push(parse_const(&stmt)?);
            } else {
                let id = spec.functions.len();
                spec.functions.push(parse_function(&stmt, taken_doc, id)?);
            }
        }
    }

    Ok(spec)
}
