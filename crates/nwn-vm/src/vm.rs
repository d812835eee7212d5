//! The script VM: registers, the fetch/decode/execute loop, and the
//! `call`/`run` entry points.

use std::collections::BTreeMap;

use tracing::debug;

use crate::command::CommandTable;
use crate::error::{Result, VmError};
use crate::langspec::{LangSpec, LiteralValue, VMType};
use crate::ncs::{read_operand, Auxcode, Opcode, Operand};
use crate::ndb::{Ndb, ScalarType, StructRef};
use crate::object::Object;
use crate::script::Script;
use crate::stack::{Slot, Stack};
use crate::value::{Effect, Value, Vector};
use nwn_primitives::CodePage;

struct Frame {
    return_ip: usize,
    saved_bp: usize,
}

/// Execution state for one loaded script. Registers: `ip` (byte offset
/// into the code section), `bp` (the current frame's base, used by the
/// `*_BP` opcodes), and `object_self` (the current actor, consulted for
/// default `object` arguments).
pub struct VM<C: CommandTable> {
    script: Script,
    spec: LangSpec,
    impl_: C,
    codepage: CodePage,
    stack: Stack,
    ip: usize,
    bp: usize,
    call_stack: Vec<Frame>,
    pub object_self: Object,
}

impl<C: CommandTable> VM<C> {
    pub fn new(script: Script, spec: LangSpec, impl_: C) -> Self {
        Self {
            script,
            spec,
            impl_,
            codepage: CodePage::default(),
            stack: Stack::new(),
            ip: 0,
            bp: 0,
            call_stack: Vec::new(),
            object_self: Object::SELF,
        }
    }

    /// Overrides the codepage used to decode `CONSTANT`/`TYPE_STRING`
    /// operands; defaults to CP1252.
    pub fn with_codepage(mut self, codepage: CodePage) -> Self {
        self.codepage = codepage;
        self
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn sp(&self) -> usize {
        self.stack.len()
    }

    /// Runs the script's `main` (or `StartingConditional`, if present
    /// and `main` is not) from the top, discarding any result.
    pub fn run(&mut self) -> Result<()> {
        let entry = self
            .script
            .ndb
            .function_by_name("main")
            .or_else(|_| self.script.ndb.function_by_name("StartingConditional"))?
            .label
            .clone();
        self.call(&entry, Vec::new())?;
        Ok(())
    }

    /// Looks up `name` in the debug info, marshals `args` onto the stack
    /// in declaration order (recursively, field-by-field, for struct-typed
    /// parameters), executes from its entry point to its matching `RETN`,
    /// and unmarshals the return value (if any) from the top of stack.
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Option<Value>> {
        let function = self.script.ndb.function_by_name(name)?.clone();
        let base_len = self.stack.len();

        if args.len() != function.params.len() {
            return Err(VmError::FormatError(format!(
                "{name} takes {} argument(s), got {}",
                function.params.len(),
                args.len()
            )));
        }
        for (value, (ty, _name)) in args.into_iter().zip(function.params.iter()) {
            push_ndb_value(&mut self.stack, value, ty, &self.script.ndb)?;
        }

        debug!(function = name, entry = function.start, "VM call");

        self.ip = function.start as usize;
        let call_depth = self.call_stack.len();

        loop {
            let depth_before = self.call_stack.len();
            if self.ip as u32 >= function.end && depth_before == call_depth {
                break;
            }
            let was_retn = self.step()?;
            // Only a RETN encountered while already at the entry call's own
            // depth is the entry function's own return: it never pushed a
            // frame for itself (call() sets `ip` directly, bypassing JSR),
            // so a nested call's RETN is always observed one level deeper
            // and must not terminate this loop.
            if was_retn && depth_before == call_depth {
                break;
            }
        }

        let result = match &function.return_type {
            ScalarType::Void => None,
            other => Some(pop_ndb_value(&mut self.stack, other, &self.script.ndb)?),
        };

        self.stack.set_stack_pointer(base_len);
        Ok(result)
    }

    /// Executes exactly one instruction. Returns `Ok(true)` if it was a
    /// `RETN` that unwound a call frame (the caller decides whether that
    /// ends its own loop).
    fn step(&mut self) -> Result<bool> {
        let instr_start = self.ip;
        let mut cursor = std::io::Cursor::new(&self.script.ncs.code[self.ip..]);
        let opcode_byte = read_u8(&mut cursor)?;
        let opcode = Opcode::from_byte(opcode_byte)?;
        let aux = Auxcode(read_u8(&mut cursor)?);
        let operand = read_operand(&mut cursor, opcode, aux, self.codepage)?;
        self.ip += cursor.position() as usize;

        match opcode {
            Opcode::Nop => {}
            Opcode::Constant => match operand {
                Operand::Int(v) => self.stack.push_int(v),
                Operand::Float(v) => self.stack.push_float(v),
                Operand::Str(v) => self.stack.push_string(v),
                Operand::UInt(v) => self.stack.push_object(Object::new(v as i64)?),
                _ => return Err(malformed(opcode, aux)),
            },
            Opcode::ReserveSpace => match aux {
                Auxcode::TYPE_INTEGER => self.stack.push_int(0),
                Auxcode::TYPE_FLOAT => self.stack.push_float(0.0),
                Auxcode::TYPE_STRING => self.stack.push_string(""),
                Auxcode::TYPE_OBJECT => self.stack.push_object(Object::SELF),
                _ => return Err(malformed(opcode, aux)),
            },
            Opcode::CpTopSp => {
                let Operand::StackOp { offset, size } = operand else {
                    return Err(malformed(opcode, aux));
                };
                self.stack.copy_up(offset as usize, size as usize)?;
            }
            Opcode::CpDownSp => {
                let Operand::StackOp { offset, size } = operand else {
                    return Err(malformed(opcode, aux));
                };
                self.stack.copy_down(offset as usize, size as usize)?;
            }
            Opcode::CpTopBp => {
                let Operand::StackOp { offset, size } = operand else {
                    return Err(malformed(opcode, aux));
                };
                let from_top = (self.stack.len() as i64 - self.bp as i64 - offset as i64 - size as i64) as usize;
                self.stack.copy_up(from_top, size as usize)?;
            }
            Opcode::CpDownBp => {
                let Operand::StackOp { offset, size } = operand else {
                    return Err(malformed(opcode, aux));
                };
                let from_top = (self.stack.len() as i64 - self.bp as i64 - offset as i64 - size as i64) as usize;
                self.stack.copy_down(from_top, size as usize)?;
            }
            Opcode::MoveStackPointer => {
                let Operand::StackIndex(delta) = operand else {
                    return Err(malformed(opcode, aux));
                };
                if delta < 0 {
                    let new_len = self.stack.len().saturating_sub((-delta) as usize);
                    self.stack.set_stack_pointer(new_len);
                }
            }
            Opcode::IncIsp => self.stack_index_op(operand, 1, opcode, aux, false)?,
            Opcode::DecIsp => self.stack_index_op(operand, -1, opcode, aux, false)?,
            Opcode::IncIbp => self.stack_index_op(operand, 1, opcode, aux, true)?,
            Opcode::DecIbp => self.stack_index_op(operand, -1, opcode, aux, true)?,
            Opcode::LogicalAnd => self.binary_bool(|a, b| a && b)?,
            Opcode::LogicalOr => self.binary_bool(|a, b| a || b)?,
            Opcode::BitwiseOr => self.binary_int(|a, b| a | b)?,
            Opcode::BitwiseExclusiveOr => self.binary_int(|a, b| a ^ b)?,
            Opcode::BooleanAnd => self.binary_int(|a, b| a & b)?,
            Opcode::ShiftLeft => self.binary_int(|a, b| a.wrapping_shl(b as u32))?,
            Opcode::ShiftRight => self.binary_int(|a, b| a.wrapping_shr(b as u32))?,
            Opcode::UnsignedShiftRight => {
                self.binary_int(|a, b| ((a as u32).wrapping_shr(b as u32)) as i32)?
            }
            Opcode::Equal => self.compare(|o| o == std::cmp::Ordering::Equal, true)?,
            Opcode::NotEqual => self.compare(|o| o != std::cmp::Ordering::Equal, true)?,
            Opcode::GreaterEqual => self.compare(|o| o != std::cmp::Ordering::Less, false)?,
            Opcode::GreaterThan => self.compare(|o| o == std::cmp::Ordering::Greater, false)?,
            Opcode::LessThan => self.compare(|o| o == std::cmp::Ordering::Less, false)?,
            Opcode::LessEqual => self.compare(|o| o != std::cmp::Ordering::Greater, false)?,
            Opcode::Add => self.arith(
                |a, b| a.checked_add(b),
                |a, b| a + b,
                |a, b| Some(format!("{a}{b}")),
            )?,
            Opcode::Subtract => self.arith(|a, b| a.checked_sub(b), |a, b| a - b, |_, _| None)?,
            Opcode::Multiply => self.arith(|a, b| a.checked_mul(b), |a, b| a * b, |_, _| None)?,
            Opcode::Divide => {
                let b = self.stack.pop_int()?;
                if b == 0 {
                    return Err(VmError::DivisionByZero);
                }
                let a = self.stack.pop_int()?;
                self.stack.push_int(a / b);
            }
            Opcode::Modulus => {
                let b = self.stack.pop_int()?;
                if b == 0 {
                    return Err(VmError::DivisionByZero);
                }
                let a = self.stack.pop_int()?;
                self.stack.push_int(a % b);
            }
            Opcode::Negate => match self.stack.pop()? {
                Slot::Int(v) => self.stack.push_int(-v),
                Slot::Float(v) => self.stack.push_float(-v),
                other => return Err(type_mismatch("int or float", &other)),
            },
            Opcode::Complement => {
                let v = self.stack.pop_int()?;
                self.stack.push_int(!v);
            }
            Opcode::Not => {
                let v = self.stack.pop_int()?;
                self.stack.push_int(i32::from(v == 0));
            }
            Opcode::ExecuteCommand => {
                let Operand::Command { cmd_id, argc } = operand else {
                    return Err(malformed(opcode, aux));
                };
                self.execute_command(cmd_id, argc)?;
            }
            Opcode::Jmp => {
                let Operand::Relative(rel) = operand else {
                    return Err(malformed(opcode, aux));
                };
                self.ip = (instr_start as i64 + rel as i64) as usize;
            }
            Opcode::Jz => {
                let Operand::Relative(rel) = operand else {
                    return Err(malformed(opcode, aux));
                };
                if self.stack.pop_int()? == 0 {
                    self.ip = (instr_start as i64 + rel as i64) as usize;
                }
            }
            Opcode::Jnz => {
                let Operand::Relative(rel) = operand else {
                    return Err(malformed(opcode, aux));
                };
                if self.stack.pop_int()? != 0 {
                    self.ip = (instr_start as i64 + rel as i64) as usize;
                }
            }
            Opcode::Jsr => {
                let Operand::Relative(rel) = operand else {
                    return Err(malformed(opcode, aux));
                };
                self.call_stack.push(Frame {
                    return_ip: self.ip,
                    saved_bp: self.bp,
                });
                self.bp = self.stack.len();
                self.ip = (instr_start as i64 + rel as i64) as usize;
            }
            Opcode::SaveBp => self.bp = self.stack.len(),
            Opcode::RestoreBp => {
                if let Some(frame) = self.call_stack.last() {
                    self.bp = frame.saved_bp;
                }
            }
            Opcode::Retn => {
                if let Some(frame) = self.call_stack.pop() {
                    self.ip = frame.return_ip;
                    self.bp = frame.saved_bp;
                    return Ok(true);
                }
                return Ok(true);
            }
            Opcode::StoreState | Opcode::StoreStateAll => {
                // Closures for AssignCommand/DelayCommand/ActionDoCommand:
                // out of scope (action-queue bodies are host-supplied).
            }
            Opcode::DeStruct => {
                let Operand::DeStruct(_struct_size, element_size, offset) = operand else {
                    return Err(malformed(opcode, aux));
                };
                // Splices the `element_size`-slot value on top of the stack
                // into the struct sitting below it, `offset` slots deep,
                // for partial struct-field reassignment (`a.field = x;`).
                // Sizes are slot counts, matching this VM's typed-slot
                // stack rather than the real engine's byte-width operands.
                let element_size = element_size as usize;
                self.stack.copy_down(offset as usize, element_size)?;
                self.stack.set_stack_pointer(self.stack.len() - element_size);
            }
        }
        Ok(false)
    }

    fn stack_index_op(
        &mut self,
        operand: Operand,
        delta: i32,
        opcode: Opcode,
        aux: Auxcode,
        relative_to_bp: bool,
    ) -> Result<()> {
        let Operand::StackIndex(offset) = operand else {
            return Err(malformed(opcode, aux));
        };
        if relative_to_bp {
            let idx = (self.bp as i64 + offset as i64) as usize;
            self.stack.with_int_at_absolute(idx, |v| v + delta)
        } else {
            self.stack.with_int_from_top(offset as usize, |v| v + delta)
        }
    }

    fn binary_int(&mut self, f: impl FnOnce(i32, i32) -> i32) -> Result<()> {
        let b = self.stack.pop_int()?;
        let a = self.stack.pop_int()?;
        self.stack.push_int(f(a, b));
        Ok(())
    }

    fn binary_bool(&mut self, f: impl FnOnce(bool, bool) -> bool) -> Result<()> {
        let b = self.stack.pop_int()? != 0;
        let a = self.stack.pop_int()? != 0;
        self.stack.push_int(i32::from(f(a, b)));
        Ok(())
    }

    fn compare(&mut self, f: impl FnOnce(std::cmp::Ordering) -> bool, allow_any: bool) -> Result<()> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        let ordering = match (&a, &b) {
            (Slot::Int(x), Slot::Int(y)) => x.cmp(y),
            (Slot::Float(x), Slot::Float(y)) => x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal),
            (Slot::String(x), Slot::String(y)) if allow_any => x.cmp(y),
            (Slot::Object(x), Slot::Object(y)) if allow_any => x.cmp(y),
            _ => return Err(type_mismatch("matching comparable kinds", &b)),
        };
        self.stack.push_int(i32::from(f(ordering)));
        Ok(())
    }

    fn arith(
        &mut self,
        int_op: impl FnOnce(i32, i32) -> Option<i32>,
        float_op: impl FnOnce(f32, f32) -> f32,
        string_op: impl FnOnce(String, String) -> Option<String>,
    ) -> Result<()> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        match (a, b) {
            (Slot::Int(x), Slot::Int(y)) => self.stack.push_int(
                int_op(x, y).ok_or_else(|| VmError::FormatError("integer overflow".to_string()))?,
            ),
            (Slot::Float(x), Slot::Float(y)) => self.stack.push_float(float_op(x, y)),
            (Slot::String(x), Slot::String(y)) => {
                let s = string_op(x, y).ok_or(VmError::TypeMismatch {
                    expected: "int or float",
                    found: "string",
                })?;
                self.stack.push_string(s);
            }
            (Slot::Vector(x), Slot::Vector(y)) => self.stack.push_vector(Vector::new(
                float_op(x.x, y.x),
                float_op(x.y, y.y),
                float_op(x.z, y.z),
            )),
            (a, _) => return Err(type_mismatch("matching numeric/string kinds", &a)),
        }
        Ok(())
    }

    fn execute_command(&mut self, cmd_id: u16, argc: u8) -> Result<()> {
        let function = self
            .spec
            .functions
            .get(cmd_id as usize)
            .ok_or_else(|| VmError::FormatError(format!("no command with id {cmd_id}")))?
            .clone();
        let argc = argc as usize;
        if argc > function.args.len() {
            return Err(VmError::FormatError(format!(
                "{} declares {} argument(s), called with argc {argc}",
                function.name,
                function.args.len()
            )));
        }

        // The stack holds the supplied arguments with the *last* declared
        // one on top, so pop `function.args[..argc]` in reverse and flip
        // the result back to declaration order before appending defaults
        // for the trailing, non-supplied parameters.
        let mut args = Vec::with_capacity(function.args.len());
        for decl in function.args[..argc].iter().rev() {
            args.push(pop_typed(&mut self.stack, decl.ty)?);
        }
        args.reverse();
        for decl in &function.args[argc..] {
            args.push(default_value(decl.default.as_ref(), decl.ty, self.object_self)?);
        }

        let result = self.impl_.invoke(&function.name, args)?;
        if let Some(value) = result {
            push_value(&mut self.stack, value);
        }
        Ok(())
    }
}

fn read_u8(cursor: &mut std::io::Cursor<&[u8]>) -> Result<u8> {
    let mut b = [0u8; 1];
    std::io::Read::read_exact(cursor, &mut b)?;
    Ok(b[0])
}

fn malformed(opcode: Opcode, aux: Auxcode) -> VmError {
    VmError::MalformedInstruction {
        opcode: opcode as u8,
        auxcode: aux.0,
    }
}

fn type_mismatch(expected: &'static str, found: &Slot) -> VmError {
    VmError::TypeMismatch {
        expected,
        found: match found {
            Slot::Int(_) => "int",
            Slot::Float(_) => "float",
            Slot::String(_) => "string",
            Slot::Object(_) => "object",
            Slot::Vector(_) => "vector",
            Slot::Effect(_) => "effect",
        },
    }
}

fn push_value(stack: &mut Stack, value: Value) {
    match value {
        Value::Int(v) => stack.push_int(v),
        Value::Float(v) => stack.push_float(v),
        Value::String(v) => stack.push_string(v),
        Value::Object(v) => stack.push_object(v),
        Value::Vector(v) => stack.push_vector(v),
        Value::Effect(v) => stack.push_effect(v),
        Value::Struct(_) => unreachable!("structs are marshalled field-by-field, never pushed whole"),
    }
}

fn pop_typed(stack: &mut Stack, ty: VMType) -> Result<Value> {
    Ok(match ty {
        VMType::Int => Value::Int(stack.pop_int()?),
        VMType::Float => Value::Float(stack.pop_float()?),
        VMType::String => Value::String(stack.pop_string()?),
        VMType::Object => Value::Object(stack.pop_object()?),
        VMType::Vector => Value::Vector(stack.pop_vector()?),
        VMType::Effect => Value::Effect(stack.pop_effect()?),
        other => {
            return Err(VmError::FormatError(format!(
                "{other:?} command arguments are not supported"
            )))
        }
    })
}

fn default_value(default: Option<&LiteralValue>, ty: VMType, object_self: Object) -> Result<Value> {
    Ok(match (default, ty) {
        (Some(LiteralValue::Int(v)), _) => Value::Int(*v),
        (Some(LiteralValue::Float(v)), _) => Value::Float(*v),
        (Some(LiteralValue::String(v)), _) => Value::String(v.clone()),
        (Some(LiteralValue::Bool(v)), _) => Value::Int(i32::from(*v)),
        (Some(LiteralValue::Object(o)), _) if *o == Object::SELF => Value::Object(object_self),
        (Some(LiteralValue::Object(o)), _) => Value::Object(*o),
        (None, VMType::Int) => Value::Int(0),
        (None, VMType::Float) => Value::Float(0.0),
        (None, VMType::String) => Value::String(String::new()),
        (None, VMType::Object) => Value::Object(Object::INVALID),
        (None, VMType::Effect) => Value::Effect(Effect::new(0)),
        (None, other) => {
            return Err(VmError::FormatError(format!(
                "no default available for {other:?} argument"
            )))
        }
    })
}

/// Marshals one `VM::call` argument onto the stack against its NDB-declared
/// type, recursing field-by-field for struct types (see §4 "Effects and
/// structures"): missing fields are a [`VmError::MissingField`], extra keys
/// on the supplied struct are silently dropped, and a field whose value
/// doesn't match its declared scalar type is a [`VmError::WrongFieldType`].
fn push_ndb_value(stack: &mut Stack, value: Value, ty: &ScalarType, ndb: &Ndb) -> Result<()> {
    match ty {
        ScalarType::Struct(r) => push_struct_fields(stack, value, *r, ndb),
        ScalarType::Void => Err(VmError::FormatError("void is not a valid argument type".to_string())),
        scalar => {
            let found = value.type_name();
            push_scalar(stack, value, scalar).map_err(|()| VmError::TypeMismatch {
                expected: scalar_type_name(scalar),
                found,
            })
        }
    }
}

fn push_struct_fields(stack: &mut Stack, value: Value, r: StructRef, ndb: &Ndb) -> Result<()> {
    let found = value.type_name();
    let Value::Struct(mut fields) = value else {
        return Err(VmError::TypeMismatch {
            expected: "struct",
            found,
        });
    };
    let def = ndb.struct_by_id(r)?.clone();
    for (field_ty, field_name) in &def.fields {
        let field_value = fields
            .remove(field_name)
            .ok_or_else(|| VmError::MissingField(field_name.clone()))?;
        push_struct_field(stack, field_value, field_ty, field_name, ndb)?;
    }
    // Extra keys in `fields` are intentionally dropped here, per spec.
    Ok(())
}

fn push_struct_field(
    stack: &mut Stack,
    value: Value,
    ty: &ScalarType,
    field_name: &str,
    ndb: &Ndb,
) -> Result<()> {
    match ty {
        ScalarType::Struct(r) => push_struct_fields(stack, value, *r, ndb),
        ScalarType::Void => Err(VmError::FormatError(format!("field {field_name:?} cannot be void"))),
        scalar => push_scalar(stack, value, scalar).map_err(|_| VmError::WrongFieldType {
            field: field_name.to_string(),
            expected: scalar_type_name(scalar),
        }),
    }
}

fn push_scalar(stack: &mut Stack, value: Value, ty: &ScalarType) -> std::result::Result<(), ()> {
    match (ty, value) {
        (ScalarType::Int, Value::Int(v)) => stack.push_int(v),
        (ScalarType::Float, Value::Float(v)) => stack.push_float(v),
        (ScalarType::String, Value::String(v)) => stack.push_string(v),
        (ScalarType::Object, Value::Object(v)) => stack.push_object(v),
        (ScalarType::Vector, Value::Vector(v)) => stack.push_vector(v),
        _ => return Err(()),
    }
    Ok(())
}

fn scalar_type_name(ty: &ScalarType) -> &'static str {
    match ty {
        ScalarType::Void => "void",
        ScalarType::Int => "int",
        ScalarType::Float => "float",
        ScalarType::String => "string",
        ScalarType::Object => "object",
        ScalarType::Vector => "vector",
        ScalarType::Struct(_) => "struct",
    }
}

/// Unmarshals a `VM::call` return value from the stack against its
/// NDB-declared type, recursing field-by-field for struct returns. Fields
/// are popped in reverse declaration order, matching the push order in
/// [`push_struct_fields`] (last-declared field is pushed last, so it's on
/// top and popped first).
fn pop_ndb_value(stack: &mut Stack, ty: &ScalarType, ndb: &Ndb) -> Result<Value> {
    Ok(match ty {
        ScalarType::Struct(r) => {
            let def = ndb.struct_by_id(*r)?.clone();
            let mut fields = BTreeMap::new();
            for (field_ty, field_name) in def.fields.iter().rev() {
                fields.insert(field_name.clone(), pop_ndb_value(stack, field_ty, ndb)?);
            }
            Value::Struct(fields)
        }
        ScalarType::Void => {
            return Err(VmError::FormatError("void is not a valid return type".to_string()))
        }
        ScalarType::Int => Value::Int(stack.pop_int()?),
        ScalarType::Float => Value::Float(stack.pop_float()?),
        ScalarType::String => Value::String(stack.pop_string()?),
        ScalarType::Object => Value::Object(stack.pop_object()?),
        ScalarType::Vector => Value::Vector(stack.pop_vector()?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::langspec::{Function as SpecFunction, FunctionArg};
    use crate::ncs::{Auxcode as Aux, Ncs, Opcode as Op};
    use crate::ndb::{Function as NdbFunction, Ndb, ScalarType};
    use crate::script::Script;
    use pretty_assertions::assert_eq;

    struct TestCallImpl;
    impl CommandTable for TestCallImpl {
        fn invoke(&mut self, function: &str, args: Vec<Value>) -> Result<Option<Value>> {
            match function {
                "TestCall" => {
                    let Some(Value::Int(i)) = args.first() else {
                        return Err(VmError::TypeMismatch {
                            expected: "int",
                            found: "other",
                        });
                    };
                    Ok(Some(Value::Int(i + 21)))
                }
                other => Err(VmError::NotImplemented(other.to_string())),
            }
        }
    }

    fn push(buf: &mut Vec<u8>, opcode: Op, aux: Aux) {
        buf.push(opcode as u8);
        buf.push(aux.0);
    }

    /// Hand-assembles `int add(int a, int b) { return TestCall(a) +
    /// TestCall(b); }`, matching the §8 S7 scenario: `vm.call("add", 5,
    /// 3)` should decode to `50` given a host `TestCall(i) = i + 21`.
    #[test]
    fn s7_vm_call_scenario() {
        let mut code = Vec::new();

        // stack on entry: [a, b] (b on top).
        push(&mut code, Op::CpTopSp, Aux::NONE); // copy 'a' (offset 1) to top
        code.extend_from_slice(&1i32.to_be_bytes());
        code.extend_from_slice(&1u16.to_be_bytes());

        push(&mut code, Op::ExecuteCommand, Aux::NONE); // TestCall(a)
        code.extend_from_slice(&0u16.to_be_bytes());
        code.push(1);

        push(&mut code, Op::CpTopSp, Aux::NONE); // copy 'b' (offset 1) to top
        code.extend_from_slice(&1i32.to_be_bytes());
        code.extend_from_slice(&1u16.to_be_bytes());

        push(&mut code, Op::ExecuteCommand, Aux::NONE); // TestCall(b)
        code.extend_from_slice(&0u16.to_be_bytes());
        code.push(1);

        push(&mut code, Op::Add, Aux::NONE);
        push(&mut code, Op::Retn, Aux::NONE);

        let script = Script {
            ncs: Ncs {
                total_length: code.len() as u32,
                code,
            },
            ndb: Ndb {
                functions: vec![NdbFunction::new(
                    "add",
                    0,
                    u32::MAX,
                    ScalarType::Int,
                    vec![(ScalarType::Int, "a".to_string()), (ScalarType::Int, "b".to_string())],
                )],
                ..Default::default()
            },
        };

        let spec = LangSpec {
            constants: Vec::new(),
            functions: vec![SpecFunction {
                id: 0,
                return_type: VMType::Int,
                name: "TestCall".to_string(),
                args: vec![FunctionArg {
                    ty: VMType::Int,
                    name: "v".to_string(),
                    default: None,
                }],
                doc: Vec::new(),
            }],
        };

        let mut vm = VM::new(script, spec, TestCallImpl);
        let result = vm.call("add", vec![Value::Int(5), Value::Int(3)]).unwrap();
        assert_eq!(result, Some(Value::Int(50)));
    }

    #[test]
    fn call_of_unknown_function_errors() {
        let script = Script {
            ncs: Ncs {
                total_length: 0,
                code: Vec::new(),
            },
            ndb: Ndb::default(),
        };
        let spec = LangSpec::default();
        let mut vm = VM::new(script, spec, TestCallImpl);
        assert!(matches!(
            vm.call("missing", Vec::new()),
            Err(VmError::UnknownFunction(_))
        ));
    }

    /// Regression test for a nested `JSR`/`RETN` (a call to another
    /// in-script function) prematurely terminating the outer `call()`
    /// loop: `main` calls a helper, then keeps running after it returns.
    /// `main() { return helper() + 35; } int helper() { return 7; }`
    #[test]
    fn call_continues_past_a_nested_jsr_return() {
        let mut code = Vec::new();

        push(&mut code, Op::Jsr, Aux::NONE);
        let jsr_operand_at = code.len();
        code.extend_from_slice(&0i32.to_be_bytes()); // patched below

        push(&mut code, Op::Constant, Aux::TYPE_INTEGER);
        code.extend_from_slice(&35i32.to_be_bytes());
        push(&mut code, Op::Add, Aux::NONE);
        push(&mut code, Op::Retn, Aux::NONE);

        let helper_start = code.len() as i32;
        push(&mut code, Op::Constant, Aux::TYPE_INTEGER);
        code.extend_from_slice(&7i32.to_be_bytes());
        push(&mut code, Op::Retn, Aux::NONE);

        code[jsr_operand_at..jsr_operand_at + 4].copy_from_slice(&helper_start.to_be_bytes());

        let script = Script {
            ncs: Ncs {
                total_length: code.len() as u32,
                code,
            },
            ndb: Ndb {
                functions: vec![NdbFunction::new("main", 0, u32::MAX, ScalarType::Int, Vec::new())],
                ..Default::default()
            },
        };

        let mut vm = VM::new(script, LangSpec::default(), TestCallImpl);
        let result = vm.call("main", Vec::new()).unwrap();
        assert_eq!(result, Some(Value::Int(42)));
    }

    struct RecordingImpl {
        last_call: Option<(String, Vec<Value>)>,
    }

    impl CommandTable for RecordingImpl {
        fn invoke(&mut self, function: &str, args: Vec<Value>) -> Result<Option<Value>> {
            self.last_call = Some((function.to_string(), args));
            Ok(None)
        }
    }

    fn push_constant_int(code: &mut Vec<u8>, v: i32) {
        push(code, Op::Constant, Aux::TYPE_INTEGER);
        code.extend_from_slice(&v.to_be_bytes());
    }

    fn push_constant_string(code: &mut Vec<u8>, s: &str) {
        push(code, Op::Constant, Aux::TYPE_STRING);
        code.extend_from_slice(&(s.len() as u16).to_be_bytes());
        code.extend_from_slice(s.as_bytes());
    }

    /// Regression test: a command with non-uniform argument types must not
    /// raise a spurious `TypeMismatch` when all arguments are supplied.
    /// `TestOrder(int a, string b)` called as `TestOrder(5, "hi")`.
    #[test]
    fn command_args_with_mixed_types_marshal_in_declaration_order() {
        let mut code = Vec::new();
        push_constant_int(&mut code, 5);
        push_constant_string(&mut code, "hi");
        push(&mut code, Op::ExecuteCommand, Aux::NONE);
        code.extend_from_slice(&0u16.to_be_bytes());
        code.push(2);
        push(&mut code, Op::Retn, Aux::NONE);

        let script = Script {
            ncs: Ncs {
                total_length: code.len() as u32,
                code,
            },
            ndb: Ndb {
                functions: vec![NdbFunction::new("main", 0, u32::MAX, ScalarType::Void, Vec::new())],
                ..Default::default()
            },
        };
        let spec = LangSpec {
            constants: Vec::new(),
            functions: vec![SpecFunction {
                id: 0,
                return_type: VMType::Void,
                name: "TestOrder".to_string(),
                args: vec![
                    FunctionArg {
                        ty: VMType::Int,
                        name: "a".to_string(),
                        default: None,
                    },
                    FunctionArg {
                        ty: VMType::String,
                        name: "b".to_string(),
                        default: None,
                    },
                ],
                doc: Vec::new(),
            }],
        };

        let mut vm = VM::new(script, spec, RecordingImpl { last_call: None });
        vm.call("main", Vec::new()).unwrap();
        assert_eq!(
            vm.impl_.last_call,
            Some(("TestOrder".to_string(), vec![Value::Int(5), Value::String("hi".to_string())]))
        );
    }

    /// Regression test: a trailing default argument must land in its
    /// declared (trailing) position, not be prepended ahead of the
    /// supplied arguments. `GetIsReactionTypeFriendly(object oTarget,
    /// object oSource=OBJECT_SELF)` called with only `oTarget` supplied.
    #[test]
    fn command_default_arg_lands_in_trailing_position() {
        let object_self = Object::new(0x1234).unwrap();
        let target = Object::new(0x5678).unwrap();

        let mut code = Vec::new();
        push(&mut code, Op::Constant, Aux::TYPE_OBJECT);
        code.extend_from_slice(&target.id().to_be_bytes());
        push(&mut code, Op::ExecuteCommand, Aux::NONE);
        code.extend_from_slice(&0u16.to_be_bytes());
        code.push(1);
        push(&mut code, Op::Retn, Aux::NONE);

        let script = Script {
            ncs: Ncs {
                total_length: code.len() as u32,
                code,
            },
            ndb: Ndb {
                functions: vec![NdbFunction::new("main", 0, u32::MAX, ScalarType::Void, Vec::new())],
                ..Default::default()
            },
        };
        let spec = LangSpec {
            constants: Vec::new(),
            functions: vec![SpecFunction {
                id: 0,
                return_type: VMType::Void,
                name: "GetIsReactionTypeFriendly".to_string(),
                args: vec![
                    FunctionArg {
                        ty: VMType::Object,
                        name: "oTarget".to_string(),
                        default: None,
                    },
                    FunctionArg {
                        ty: VMType::Object,
                        name: "oSource".to_string(),
                        default: Some(LiteralValue::Object(Object::SELF)),
                    },
                ],
                doc: Vec::new(),
            }],
        };

        let mut vm = VM::new(script, spec, RecordingImpl { last_call: None });
        vm.object_self = object_self;
        vm.call("main", Vec::new()).unwrap();
        assert_eq!(
            vm.impl_.last_call,
            Some((
                "GetIsReactionTypeFriendly".to_string(),
                vec![Value::Object(target), Value::Object(object_self)]
            ))
        );
    }

    fn struct_layout() -> Ndb {
        Ndb {
            structs: vec![crate::ndb::Struct::new(
                "struct1",
                vec![
                    (ScalarType::String, "m_str".to_string()),
                    (ScalarType::Int, "m_int".to_string()),
                    (ScalarType::Float, "m_flt".to_string()),
                ],
            )],
            functions: vec![NdbFunction::new(
                "take_and_return_struct1",
                0,
                u32::MAX,
                ScalarType::Struct(crate::ndb::StructRef { id: 0 }),
                vec![(ScalarType::Struct(crate::ndb::StructRef { id: 0 }), "in1".to_string())],
            )],
            ..Default::default()
        }
    }

    fn identity_struct_script(ndb: Ndb) -> Script {
        // The body is irrelevant to these tests: they only exercise
        // argument/return marshaling, so the stack is left untouched
        // between entry and `RETN` (the marshaled fields pass straight
        // through).
        let code = vec![Op::Retn as u8, Aux::NONE.0];
        Script {
            ncs: Ncs {
                total_length: code.len() as u32,
                code,
            },
            ndb,
        }
    }

    #[test]
    fn struct_argument_and_return_round_trip() {
        let script = identity_struct_script(struct_layout());
        let mut vm = VM::new(script, LangSpec::default(), TestCallImpl);

        let mut fields = BTreeMap::new();
        fields.insert("m_str".to_string(), Value::String("hello".to_string()));
        fields.insert("m_int".to_string(), Value::Int(42));
        fields.insert("m_flt".to_string(), Value::Float(3.14));

        let result = vm
            .call("take_and_return_struct1", vec![Value::Struct(fields.clone())])
            .unwrap();
        assert_eq!(result, Some(Value::Struct(fields)));
    }

    #[test]
    fn struct_argument_missing_key_errors() {
        let script = identity_struct_script(struct_layout());
        let mut vm = VM::new(script, LangSpec::default(), TestCallImpl);

        let mut fields = BTreeMap::new();
        fields.insert("m_str".to_string(), Value::String("hello".to_string()));
        fields.insert("m_int".to_string(), Value::Int(42));

        assert!(matches!(
            vm.call("take_and_return_struct1", vec![Value::Struct(fields)]),
            Err(VmError::MissingField(ref f)) if f == "m_flt"
        ));
    }

    #[test]
    fn struct_argument_extra_key_is_dropped() {
        let script = identity_struct_script(struct_layout());
        let mut vm = VM::new(script, LangSpec::default(), TestCallImpl);

        let mut fields = BTreeMap::new();
        fields.insert("m_str".to_string(), Value::String("hello".to_string()));
        fields.insert("m_int".to_string(), Value::Int(42));
        fields.insert("m_flt".to_string(), Value::Float(3.14));
        fields.insert("m_extra".to_string(), Value::Int(1));

        let result = vm
            .call("take_and_return_struct1", vec![Value::Struct(fields)])
            .unwrap();
        let Some(Value::Struct(out)) = result else {
            panic!("expected a struct result");
        };
        assert_eq!(out.len(), 3);
        assert!(!out.contains_key("m_extra"));
    }

    #[test]
    fn struct_argument_wrong_field_type_errors() {
        let script = identity_struct_script(struct_layout());
        let mut vm = VM::new(script, LangSpec::default(), TestCallImpl);

        let mut fields = BTreeMap::new();
        fields.insert("m_str".to_string(), Value::String("hello".to_string()));
        fields.insert("m_int".to_string(), Value::String("42".to_string()));
        fields.insert("m_flt".to_string(), Value::Float(3.14));

        assert!(matches!(
            vm.call("take_and_return_struct1", vec![Value::Struct(fields)]),
            Err(VmError::WrongFieldType { field, .. }) if field == "m_int"
        ));
    }

    /// Nested structs: a struct field that is itself another struct
    /// marshals recursively (`test_struct2`-style).
    #[test]
    fn nested_struct_argument_and_return_round_trip() {
        let self_obj = Object::new(0x1234).unwrap();
        let ndb = Ndb {
            structs: vec![
                crate::ndb::Struct::new(
                    "struct1",
                    vec![
                        (ScalarType::String, "m_str".to_string()),
                        (ScalarType::Int, "m_int".to_string()),
                        (ScalarType::Float, "m_flt".to_string()),
                    ],
                ),
                crate::ndb::Struct::new(
                    "struct2",
                    vec![
                        (ScalarType::Struct(crate::ndb::StructRef { id: 0 }), "m_t1".to_string()),
                        (ScalarType::Object, "m_obj".to_string()),
                    ],
                ),
            ],
            functions: vec![NdbFunction::new(
                "take_and_return_struct2",
                0,
                u32::MAX,
                ScalarType::Struct(crate::ndb::StructRef { id: 1 }),
                vec![(ScalarType::Struct(crate::ndb::StructRef { id: 1 }), "in2".to_string())],
            )],
            ..Default::default()
        };
        let script = identity_struct_script(ndb);
        let mut vm = VM::new(script, LangSpec::default(), TestCallImpl);
        vm.object_self = self_obj;

        let mut inner = BTreeMap::new();
        inner.insert("m_str".to_string(), Value::String("hello".to_string()));
        inner.insert("m_int".to_string(), Value::Int(42));
        inner.insert("m_flt".to_string(), Value::Float(3.14));
        let mut outer = BTreeMap::new();
        outer.insert("m_t1".to_string(), Value::Struct(inner));
        outer.insert("m_obj".to_string(), Value::Object(self_obj));

        let result = vm
            .call("take_and_return_struct2", vec![Value::Struct(outer.clone())])
            .unwrap();
        assert_eq!(result, Some(Value::Struct(outer)));
    }

    /// Pins this crate's own chosen semantics for `DE_STRUCT` (ungrounded
    /// in any available source): it splices the top-of-stack value into
    /// the struct sitting below it, at a given slot offset, for partial
    /// struct-field reassignment. Drives `step()` directly (rather than
    /// `call()`, which resets the stack pointer on return) so the result
    /// can be inspected on the stack afterward.
    #[test]
    fn destruct_splices_top_value_into_struct_below() {
        let mut code = Vec::new();
        push_constant_int(&mut code, 1); // struct field 0, untouched
        push_constant_int(&mut code, 2); // struct field 1, overwritten below
        push_constant_int(&mut code, 99); // new value for field 1
        push(&mut code, Op::DeStruct, Aux::NONE);
        code.extend_from_slice(&2u16.to_be_bytes()); // struct_size (slots)
        code.extend_from_slice(&1u16.to_be_bytes()); // element_size (slots)
        code.extend_from_slice(&1u16.to_be_bytes()); // offset (slots from top)

        let script = Script {
            ncs: Ncs {
                total_length: code.len() as u32,
                code,
            },
            ndb: Ndb::default(),
        };
        let mut vm = VM::new(script, LangSpec::default(), TestCallImpl);

        for _ in 0..4 {
            vm.step().unwrap();
        }

        assert_eq!(vm.sp(), 2);
        assert_eq!(vm.stack.pop_int().unwrap(), 99);
        assert_eq!(vm.stack.pop_int().unwrap(), 1);
    }
}
