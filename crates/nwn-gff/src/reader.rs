//! GFF binary reader (wire format V3.2).

use std::collections::HashSet;
use std::io::Read;

use nwn_primitives::{CodePage, GenderedLanguage, Magic};
use tracing::debug;

use crate::error::{GffError, Result};
use crate::value::{ExoLocString, GffFieldKind, GffResRef, GffStruct, GffValue, Label};

const HEADER_LEN: usize = 56;
const STRUCT_ENTRY_LEN: usize = 12;
const FIELD_ENTRY_LEN: usize = 12;
const LABEL_ENTRY_LEN: usize = 16;

struct Header {
    struct_offset: u32,
    struct_count: u32,
    field_offset: u32,
    field_count: u32,
    label_offset: u32,
    label_count: u32,
    field_data_offset: u32,
    field_data_count: u32,
    field_indices_offset: u32,
    field_indices_count: u32,
    list_indices_offset: u32,
    list_indices_count: u32,
}

struct StructEntry {
    type_id: u32,
    data_or_offset: u32,
    field_count: u32,
}

struct FieldEntry {
    kind: GffFieldKind,
    label_index: u32,
    value_or_offset: u32,
}

struct Tables {
    structs: Vec<StructEntry>,
    fields: Vec<FieldEntry>,
    labels: Vec<Label>,
    field_data: Vec<u8>,
    field_indices: Vec<u32>,
    list_indices: Vec<u32>,
}

fn u32le(buf: &[u8], off: usize) -> Result<u32> {
    let slice = buf
        .get(off..off + 4)
        .ok_or_else(|| GffError::BadOffset(format!("offset {off} out of range")))?;
    Ok(u32::from_le_bytes(slice.try_into().unwrap()))
}

/// Read a full GFF tree from `stream`, returning the root struct and the
/// file-type magic from the header.
pub fn read<R: Read>(stream: &mut R, codepage: CodePage) -> Result<(GffStruct, Magic)> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    read_from_slice(&buf, codepage)
}

/// Read a full GFF tree from an in-memory buffer.
pub fn read_from_slice(buf: &[u8], codepage: CodePage) -> Result<(GffStruct, Magic)> {
    if buf.len() < HEADER_LEN {
        return Err(GffError::BadOffset("file shorter than GFF header".into()));
    }

    let magic = Magic::new(&buf[0..4])?;
    let version = &buf[4..8];
    if version != b"V3.2" {
        return Err(GffError::UnsupportedVersion(
            String::from_utf8_lossy(version).into_owned(),
        ));
    }

    let header = Header {
        struct_offset: u32le(buf, 8)?,
        struct_count: u32le(buf, 12)?,
        field_offset: u32le(buf, 16)?,
        field_count: u32le(buf, 20)?,
        label_offset: u32le(buf, 24)?,
        label_count: u32le(buf, 28)?,
        field_data_offset: u32le(buf, 32)?,
        field_data_count: u32le(buf, 36)?,
        field_indices_offset: u32le(buf, 40)?,
        field_indices_count: u32le(buf, 44)?,
        list_indices_offset: u32le(buf, 48)?,
        list_indices_count: u32le(buf, 52)?,
    };

    debug!(
        magic = %magic,
        struct_count = header.struct_count,
        field_count = header.field_count,
        "reading GFF tree"
    );

    let tables = parse_tables(buf, &header)?;

    if tables.structs.is_empty() {
        return Err(GffError::FormatError("GFF has no structs".into()));
    }

    let mut open = HashSet::new();
    let root = read_struct(&tables, 0, &mut open, codepage)?;
    Ok((root, magic))
}

fn parse_tables(buf: &[u8], header: &Header) -> Result<Tables> {
    let mut structs = Vec::with_capacity(header.struct_count as usize);
    for i in 0..header.struct_count {
        let base = header.struct_offset as usize + i as usize * STRUCT_ENTRY_LEN;
        structs.push(StructEntry {
            type_id: u32le(buf, base)?,
            data_or_offset: u32le(buf, base + 4)?,
            field_count: u32le(buf, base + 8)?,
        });
    }

    let mut fields = Vec::with_capacity(header.field_count as usize);
    for i in 0..header.field_count {
        let base = header.field_offset as usize + i as usize * FIELD_ENTRY_LEN;
        fields.push(FieldEntry {
            kind: GffFieldKind::from_id(u32le(buf, base)?)?,
            label_index: u32le(buf, base + 4)?,
            value_or_offset: u32le(buf, base + 8)?,
        });
    }

    let mut labels = Vec::with_capacity(header.label_count as usize);
    for i in 0..header.label_count {
        let base = header.label_offset as usize + i as usize * LABEL_ENTRY_LEN;
        let raw = buf
            .get(base..base + LABEL_ENTRY_LEN)
            .ok_or_else(|| GffError::BadOffset(format!("label {i} out of range")))?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let text = std::str::from_utf8(&raw[..end])
            .map_err(|_| GffError::FormatError(format!("label {i} is not ASCII")))?;
        labels.push(Label::new(text)?);
    }

    let field_data = buf
        .get(
            header.field_data_offset as usize
                ..header.field_data_offset as usize + header.field_data_count as usize,
        )
        .ok_or_else(|| GffError::BadOffset("field-data table out of range".into()))?
        .to_vec();

    let field_indices = read_u32_table(
        buf,
        header.field_indices_offset,
        header.field_indices_count,
    )?;
    let list_indices = read_u32_table(buf, header.list_indices_offset, header.list_indices_count)?;

    Ok(Tables {
        structs,
        fields,
        labels,
        field_data,
        field_indices,
        list_indices,
    })
}

fn read_u32_table(buf: &[u8], offset: u32, byte_count: u32) -> Result<Vec<u32>> {
    let mut out = Vec::with_capacity(byte_count as usize / 4);
    for i in 0..(byte_count / 4) {
        out.push(u32le(buf, offset as usize + i as usize * 4)?);
    }
    Ok(out)
}

fn read_struct(
    tables: &Tables,
    struct_idx: u32,
    open: &mut HashSet<u32>,
    codepage: CodePage,
) -> Result<GffStruct> {
    if !open.insert(struct_idx) {
        return Err(GffError::CycleDetected(struct_idx));
    }

    let entry = tables
        .structs
        .get(struct_idx as usize)
        .ok_or_else(|| GffError::BadOffset(format!("struct index {struct_idx} out of range")))?;

    let field_indices: Vec<u32> = match entry.field_count {
        0 => Vec::new(),
        1 => vec![entry.data_or_offset],
        n => {
            let start = entry.data_or_offset as usize / 4;
            tables
                .field_indices
                .get(start..start + n as usize)
                .ok_or_else(|| GffError::BadOffset("field-indices range out of bounds".into()))?
                .to_vec()
        }
    };

    let mut out = GffStruct::new(entry.type_id);
    for field_idx in field_indices {
        let field = tables
            .fields
            .get(field_idx as usize)
            .ok_or_else(|| GffError::BadOffset(format!("field index {field_idx} out of range")))?;
        let label = tables
            .labels
            .get(field.label_index as usize)
            .ok_or_else(|| {
                GffError::BadOffset(format!("label index {} out of range", field.label_index))
            })?
            .clone();
        let value = read_field_value(tables, field, open, codepage)?;
        out.push(label, value);
    }

    open.remove(&struct_idx);
    Ok(out)
}

fn read_field_value(
    tables: &Tables,
    field: &FieldEntry,
    open: &mut HashSet<u32>,
    codepage: CodePage,
) -> Result<GffValue> {
    let v = field.value_or_offset;
    Ok(match field.kind {
        GffFieldKind::Byte => GffValue::Byte(v as u8),
        GffFieldKind::Char => GffValue::Char(v as u8 as i8),
        GffFieldKind::Word => GffValue::Word(v as u16),
        GffFieldKind::Short => GffValue::Short(v as u16 as i16),
        GffFieldKind::Dword => GffValue::Dword(v),
        GffFieldKind::Int => GffValue::Int(v as i32),
        GffFieldKind::Float => GffValue::Float(f32::from_bits(v)),
        GffFieldKind::Dword64 => GffValue::Dword64(read_u64(tables, v)?),
        GffFieldKind::Int64 => GffValue::Int64(read_u64(tables, v)? as i64),
        GffFieldKind::Double => GffValue::Double(f64::from_bits(read_u64(tables, v)?)),
        GffFieldKind::ExoString => GffValue::ExoString(read_exo_string(tables, v, codepage)?),
        GffFieldKind::ResRef => GffValue::ResRef(read_resref(tables, v)?),
        GffFieldKind::ExoLocString => {
            GffValue::ExoLocString(read_exo_loc_string(tables, v, codepage)?)
        }
        GffFieldKind::Void => GffValue::Void(read_void(tables, v)?),
        GffFieldKind::Struct => {
            GffValue::Struct(Box::new(read_struct(tables, v, open, codepage)?))
        }
        GffFieldKind::List => GffValue::List(read_list(tables, v, open, codepage)?),
    })
}

fn field_data_at(tables: &Tables, offset: u32) -> Result<&[u8]> {
    tables
        .field_data
        .get(offset as usize..)
        .ok_or_else(|| GffError::BadOffset(format!("field-data offset {offset} out of range")))
}

fn read_u64(tables: &Tables, offset: u32) -> Result<u64> {
    let data = field_data_at(tables, offset)?;
    let bytes: [u8; 8] = data
        .get(0..8)
        .ok_or_else(|| GffError::BadOffset("truncated 8-byte field-data value".into()))?
        .try_into()
        .unwrap();
    Ok(u64::from_le_bytes(bytes))
}

fn read_exo_string(tables: &Tables, offset: u32, codepage: CodePage) -> Result<String> {
    let data = field_data_at(tables, offset)?;
    let len = u32::from_le_bytes(
        data.get(0..4)
            .ok_or_else(|| GffError::BadOffset("truncated exostring length".into()))?
            .try_into()
            .unwrap(),
    ) as usize;
    let bytes = data
        .get(4..4 + len)
        .ok_or_else(|| GffError::BadOffset("truncated exostring body".into()))?;
    codepage
        .decode(bytes)
        .map_err(|e| GffError::ValueError(e.to_string()))
}

fn read_resref(tables: &Tables, offset: u32) -> Result<GffResRef> {
    let data = field_data_at(tables, offset)?;
    let len = *data
        .first()
        .ok_or_else(|| GffError::BadOffset("truncated resref length".into()))? as usize;
    let bytes = data
        .get(1..1 + len)
        .ok_or_else(|| GffError::BadOffset("truncated resref body".into()))?;
    let text = std::str::from_utf8(bytes)
        .map_err(|_| GffError::FormatError("resref is not ASCII".into()))?;
    GffResRef::new(text)
}

fn read_exo_loc_string(tables: &Tables, offset: u32, codepage: CodePage) -> Result<ExoLocString> {
    let data = field_data_at(tables, offset)?;
    // data[0..4] = total_size, informational only; we parse each sub-entry
    // by its own declared length instead of relying on it.
    let strref = i32::from_le_bytes(
        data.get(4..8)
            .ok_or_else(|| GffError::BadOffset("truncated exolocstring strref".into()))?
            .try_into()
            .unwrap(),
    );
    let count = u32::from_le_bytes(
        data.get(8..12)
            .ok_or_else(|| GffError::BadOffset("truncated exolocstring count".into()))?
            .try_into()
            .unwrap(),
    );

    let mut result = ExoLocString::new(strref);
    let mut pos = 12usize;
    for _ in 0..count {
        let lang_id = u32::from_le_bytes(
            data.get(pos..pos + 4)
                .ok_or_else(|| GffError::BadOffset("truncated exolocstring entry id".into()))?
                .try_into()
                .unwrap(),
        );
        let len = u32::from_le_bytes(
            data.get(pos + 4..pos + 8)
                .ok_or_else(|| GffError::BadOffset("truncated exolocstring entry len".into()))?
                .try_into()
                .unwrap(),
        ) as usize;
        let bytes = data
            .get(pos + 8..pos + 8 + len)
            .ok_or_else(|| GffError::BadOffset("truncated exolocstring entry body".into()))?;
        let text = codepage
            .decode(bytes)
            .map_err(|e| GffError::ValueError(e.to_string()))?;
        let gendered = GenderedLanguage::from_id(lang_id)
            .map_err(|e| GffError::ValueError(e.to_string()))?;
        result.strings.insert(gendered, text);
        pos += 8 + len;
    }

    Ok(result)
}

fn read_void(tables: &Tables, offset: u32) -> Result<Vec<u8>> {
    let data = field_data_at(tables, offset)?;
    let len = u32::from_le_bytes(
        data.get(0..4)
            .ok_or_else(|| GffError::BadOffset("truncated void length".into()))?
            .try_into()
            .unwrap(),
    ) as usize;
    Ok(data
        .get(4..4 + len)
        .ok_or_else(|| GffError::BadOffset("truncated void body".into()))?
        .to_vec())
}

fn read_list(
    tables: &Tables,
    offset: u32,
    open: &mut HashSet<u32>,
    codepage: CodePage,
) -> Result<Vec<GffStruct>> {
    let start = offset as usize / 4;
    let count = *tables
        .list_indices
        .get(start)
        .ok_or_else(|| GffError::BadOffset("list-indices length out of range".into()))?
        as usize;
    let indices = tables
        .list_indices
        .get(start + 1..start + 1 + count)
        .ok_or_else(|| GffError::BadOffset("list-indices body out of range".into()))?;
    indices
        .iter()
        .map(|&idx| read_struct(tables, idx, open, codepage))
        .collect()
}
