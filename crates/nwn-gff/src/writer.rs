//! GFF binary writer (wire format V3.2).
//!
//! Fields are emitted in the insertion order of the source struct; labels
//! are de-duplicated across the whole file. The writer does not attempt to
//! deduplicate repeated struct bodies (see `DESIGN.md`), so round-tripping
//! `read(write(x))` yields an equal tree but not necessarily byte-identical
//! output to a reference implementation.

use std::collections::HashMap;
use std::io::Write;

use nwn_primitives::{CodePage, Magic};
use tracing::debug;

use crate::error::Result;
use crate::value::{GffFieldKind, GffStruct, GffValue, Label};

const HEADER_LEN: u32 = 56;
const STRUCT_ENTRY_LEN: u32 = 12;
const FIELD_ENTRY_LEN: u32 = 12;
const LABEL_ENTRY_LEN: u32 = 16;

#[derive(Default)]
struct Builder {
    structs: Vec<(u32, u32, u32)>, // (type_id, data_or_offset, field_count)
    fields: Vec<(u32, u32, u32)>,  // (kind_id, label_index, value_or_offset)
    labels: Vec<[u8; 16]>,
    label_index: HashMap<String, u32>,
    field_data: Vec<u8>,
    field_indices: Vec<u32>,
    list_indices: Vec<u32>,
}

impl Builder {
    fn intern_label(&mut self, label: &Label) -> u32 {
        if let Some(&idx) = self.label_index.get(label.as_str()) {
            return idx;
        }
        let mut raw = [0u8; 16];
        let bytes = label.as_str().as_bytes();
        raw[..bytes.len()].copy_from_slice(bytes);
        let idx = self.labels.len() as u32;
        self.labels.push(raw);
        self.label_index.insert(label.as_str().to_string(), idx);
        idx
    }

    /// Serialize a struct, returning its struct-table index.
    fn push_struct(&mut self, s: &GffStruct, codepage: CodePage) -> Result<u32> {
        let struct_idx = self.structs.len() as u32;
        // Reserve the slot so nested structs (which may themselves call
        // push_struct) get indices after this one.
        self.structs.push((s.id, 0, 0));

        let mut field_idx_list = Vec::with_capacity(s.field_count());
        for (label, value) in s.fields() {
            let label_idx = self.intern_label(label);
            let (kind, value_or_offset) = self.encode_value(value, codepage)?;
            let field_idx = self.fields.len() as u32;
            self.fields.push((kind as u32, label_idx, value_or_offset));
            field_idx_list.push(field_idx);
        }

        let field_count = field_idx_list.len() as u32;
        let data_or_offset = match field_idx_list.len() {
            0 => 0,
            1 => field_idx_list[0],
            _ => {
                let offset = self.field_indices.len() as u32 * 4;
                self.field_indices.extend(field_idx_list);
                offset
            }
        };
        self.structs[struct_idx as usize] = (s.id, data_or_offset, field_count);

        Ok(struct_idx)
    }

    fn encode_value(&mut self, value: &GffValue, codepage: CodePage) -> Result<(GffFieldKind, u32)> {
        let kind = value.kind();
        let value_or_offset = match value {
            GffValue::Byte(v) => u32::from(*v),
            GffValue::Char(v) => u32::from(*v as u8),
            GffValue::Word(v) => u32::from(*v),
            GffValue::Short(v) => u32::from(*v as u16),
            GffValue::Dword(v) => *v,
            GffValue::Int(v) => *v as u32,
            GffValue::Float(v) => v.to_bits(),
            GffValue::Dword64(v) => self.push_field_data(&v.to_le_bytes()),
            GffValue::Int64(v) => self.push_field_data(&v.to_le_bytes()),
            GffValue::Double(v) => self.push_field_data(&v.to_bits().to_le_bytes()),
            GffValue::ExoString(s) => {
                let bytes = codepage
                    .encode(s)
                    .map_err(|e| crate::error::GffError::ValueError(e.to_string()))?;
                let mut blob = (bytes.len() as u32).to_le_bytes().to_vec();
                blob.extend(bytes);
                self.push_field_data(&blob)
            }
            GffValue::ResRef(r) => {
                let bytes = r.as_str().as_bytes();
                let mut blob = vec![bytes.len() as u8];
                blob.extend_from_slice(bytes);
                self.push_field_data(&blob)
            }
            GffValue::ExoLocString(loc) => {
                let mut body = loc.strref.to_le_bytes().to_vec();
                body.extend((loc.strings.len() as u32).to_le_bytes());
                for (lang, text) in &loc.strings {
                    let encoded = codepage
                        .encode(text)
                        .map_err(|e| crate::error::GffError::ValueError(e.to_string()))?;
                    body.extend(lang.to_id().to_le_bytes());
                    body.extend((encoded.len() as u32).to_le_bytes());
                    body.extend(encoded);
                }
                let mut blob = (body.len() as u32).to_le_bytes().to_vec();
                blob.extend(body);
                self.push_field_data(&blob)
            }
            GffValue::Void(bytes) => {
                let mut blob = (bytes.len() as u32).to_le_bytes().to_vec();
                blob.extend_from_slice(bytes);
                self.push_field_data(&blob)
            }
            GffValue::Struct(inner) => self.push_struct(inner, codepage)?,
            GffValue::List(elements) => {
                let mut indices = Vec::with_capacity(elements.len());
                for element in elements {
                    indices.push(self.push_struct(element, codepage)?);
                }
                let offset = self.list_indices.len() as u32 * 4;
                self.list_indices.push(indices.len() as u32);
                self.list_indices.extend(indices);
                offset
            }
        };
        Ok((kind, value_or_offset))
    }

    /// Append raw bytes to the field-data blob, returning the byte offset
    /// they were written at.
    fn push_field_data(&mut self, bytes: &[u8]) -> u32 {
        let offset = self.field_data.len() as u32;
        self.field_data.extend_from_slice(bytes);
        offset
    }
}

/// Write a GFF tree to `stream`, tagged with `magic`.
pub fn write<W: Write>(
    stream: &mut W,
    root: &GffStruct,
    magic: &Magic,
    codepage: CodePage,
) -> Result<()> {
    let mut builder = Builder::default();
    builder.push_struct(root, codepage)?;

    let struct_count = builder.structs.len() as u32;
    let field_count = builder.fields.len() as u32;
    let label_count = builder.labels.len() as u32;
    let field_data_count = builder.field_data.len() as u32;
    let field_indices_count = builder.field_indices.len() as u32 * 4;
    let list_indices_count = builder.list_indices.len() as u32 * 4;

    let struct_offset = HEADER_LEN;
    let field_offset = struct_offset + struct_count * STRUCT_ENTRY_LEN;
    let label_offset = field_offset + field_count * FIELD_ENTRY_LEN;
    let field_data_offset = label_offset + label_count * LABEL_ENTRY_LEN;
    let field_indices_offset = field_data_offset + field_data_count;
    let list_indices_offset = field_indices_offset + field_indices_count;

    debug!(
        magic = %magic,
        struct_count,
        field_count,
        "writing GFF tree"
    );

    stream.write_all(magic.as_bytes())?;
    stream.write_all(b"V3.2")?;
    stream.write_all(&struct_offset.to_le_bytes())?;
    stream.write_all(&struct_count.to_le_bytes())?;
    stream.write_all(&field_offset.to_le_bytes())?;
    stream.write_all(&field_count.to_le_bytes())?;
    stream.write_all(&label_offset.to_le_bytes())?;
    stream.write_all(&label_count.to_le_bytes())?;
    stream.write_all(&field_data_offset.to_le_bytes())?;
    stream.write_all(&field_data_count.to_le_bytes())?;
    stream.write_all(&field_indices_offset.to_le_bytes())?;
    stream.write_all(&field_indices_count.to_le_bytes())?;
    stream.write_all(&list_indices_offset.to_le_bytes())?;
    stream.write_all(&list_indices_count.to_le_bytes())?;

    for (type_id, data_or_offset, field_count) in &builder.structs {
        stream.write_all(&type_id.to_le_bytes())?;
        stream.write_all(&data_or_offset.to_le_bytes())?;
        stream.write_all(&field_count.to_le_bytes())?;
    }

    for (kind, label_idx, value_or_offset) in &builder.fields {
        stream.write_all(&kind.to_le_bytes())?;
        stream.write_all(&label_idx.to_le_bytes())?;
        stream.write_all(&value_or_offset.to_le_bytes())?;
    }

    for label in &builder.labels {
        stream.write_all(label)?;
    }

    stream.write_all(&builder.field_data)?;

    for idx in &builder.field_indices {
        stream.write_all(&idx.to_le_bytes())?;
    }

    for idx in &builder.list_indices {
        stream.write_all(&idx.to_le_bytes())?;
    }

    Ok(())
}

/// Write a GFF tree to an in-memory buffer.
pub fn write_to_vec(root: &GffStruct, magic: &Magic, codepage: CodePage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write(&mut out, root, magic, codepage)?;
    Ok(out)
}
