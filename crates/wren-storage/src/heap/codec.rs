//! Bit-exact on-disk encoding of rows, index keys, handles, and block ids.
//!
//! Everything is little-endian with no alignment padding:
//!
//! - INT: 4-byte signed integer
//! - TEXT: 2-byte length followed by the raw UTF-8 bytes (length in bytes,
//!   at most 65535)
//! - BOOLEAN: 1 byte, `0`/`1`
//! - Handle: block id (4 bytes) followed by record id (2 bytes)
//! - BlockId: 4 bytes
//!
//! Rows are encoded in schema column order, keys in key-profile order.
//! Decoding validates framing and UTF-8; violations surface as
//! [`DbError::Corruption`].

use bytes::{Buf, BufMut, BytesMut};
use wren_common::constants::MAX_TEXT_LEN;
use wren_common::error::{DbError, DbResult};
use wren_common::types::{
    BlockId, ColumnAttribute, DataType, Handle, KeyProfile, KeyValue, RecordId, Row, Value,
};

/// Encoded size of a marshaled handle.
pub const HANDLE_LEN: usize = 6;

/// Encoded size of a marshaled block id.
pub const BLOCK_ID_LEN: usize = 4;

/// Encodes a row in schema column order.
///
/// Every schema column must be present in the row with a value of the
/// declared type.
pub fn marshal_row(row: &Row, names: &[String], attrs: &[ColumnAttribute]) -> DbResult<Vec<u8>> {
    let mut buf = BytesMut::new();
    for (name, attr) in names.iter().zip(attrs) {
        let value = row
            .get(name)
            .ok_or_else(|| DbError::NoSuchColumn(name.clone()))?;
        encode_value(&mut buf, attr.data_type(), value)?;
    }
    Ok(buf.to_vec())
}

/// Decodes a row encoded by [`marshal_row`].
pub fn unmarshal_row(bytes: &[u8], names: &[String], attrs: &[ColumnAttribute]) -> DbResult<Row> {
    let mut buf = bytes;
    let mut row = Row::with_capacity(names.len());
    for (name, attr) in names.iter().zip(attrs) {
        let value = decode_value(&mut buf, attr.data_type())?;
        row.insert(name.clone(), value);
    }
    Ok(row)
}

/// Encodes a composite index key following its profile.
pub fn marshal_key(key: &KeyValue, profile: &KeyProfile) -> DbResult<Vec<u8>> {
    if key.len() != profile.len() {
        return Err(DbError::SchemaViolation(format!(
            "key has {} values but the profile has {} types",
            key.len(),
            profile.len()
        )));
    }
    let mut buf = BytesMut::new();
    for (value, data_type) in key.iter().zip(profile) {
        encode_value(&mut buf, *data_type, value)?;
    }
    Ok(buf.to_vec())
}

/// Decodes a composite index key following its profile.
pub fn unmarshal_key(bytes: &[u8], profile: &KeyProfile) -> DbResult<KeyValue> {
    let mut buf = bytes;
    profile
        .iter()
        .map(|data_type| decode_value(&mut buf, *data_type))
        .collect()
}

/// Encoded byte length of a key, without building the encoding.
#[must_use]
pub fn key_encoded_len(key: &KeyValue) -> usize {
    key.iter().map(value_encoded_len).sum()
}

/// Encoded byte length of one value.
#[must_use]
pub fn value_encoded_len(value: &Value) -> usize {
    match value {
        Value::Int(_) => 4,
        Value::Text(s) => 2 + s.len(),
        Value::Boolean(_) => 1,
    }
}

/// Encodes a handle: block id (4 LE) then record id (2 LE).
#[must_use]
pub fn marshal_handle(handle: Handle) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(HANDLE_LEN);
    buf.put_u32_le(handle.block.as_u32());
    buf.put_u16_le(handle.record.as_u16());
    buf.to_vec()
}

/// Decodes a handle encoded by [`marshal_handle`].
pub fn unmarshal_handle(bytes: &[u8]) -> DbResult<Handle> {
    let mut buf = bytes;
    if buf.remaining() < HANDLE_LEN {
        return Err(DbError::corruption("truncated handle record"));
    }
    let block = BlockId::new(buf.get_u32_le());
    let record = RecordId::new(buf.get_u16_le());
    Ok(Handle::new(block, record))
}

/// Encodes a block id as 4 LE bytes.
#[must_use]
pub fn marshal_block_id(id: BlockId) -> Vec<u8> {
    id.to_le_bytes().to_vec()
}

/// Decodes a block id encoded by [`marshal_block_id`].
pub fn unmarshal_block_id(bytes: &[u8]) -> DbResult<BlockId> {
    let mut buf = bytes;
    if buf.remaining() < BLOCK_ID_LEN {
        return Err(DbError::corruption("truncated block id record"));
    }
    Ok(BlockId::new(buf.get_u32_le()))
}

fn encode_value(buf: &mut BytesMut, data_type: DataType, value: &Value) -> DbResult<()> {
    match (data_type, value) {
        (DataType::Int, Value::Int(n)) => buf.put_i32_le(*n),
        (DataType::Text, Value::Text(s)) => {
            if s.len() > MAX_TEXT_LEN {
                return Err(DbError::SchemaViolation(format!(
                    "text value of {} bytes exceeds the {} byte limit",
                    s.len(),
                    MAX_TEXT_LEN
                )));
            }
            buf.put_u16_le(s.len() as u16);
            buf.put_slice(s.as_bytes());
        }
        (DataType::Boolean, Value::Boolean(b)) => buf.put_u8(u8::from(*b)),
        (data_type, value) => {
            return Err(DbError::UnsupportedType(format!(
                "cannot marshal {} value into {} column",
                value.data_type(),
                data_type
            )));
        }
    }
    Ok(())
}

fn decode_value(buf: &mut &[u8], data_type: DataType) -> DbResult<Value> {
    match data_type {
        DataType::Int => {
            if buf.remaining() < 4 {
                return Err(DbError::corruption("truncated INT value"));
            }
            Ok(Value::Int(buf.get_i32_le()))
        }
        DataType::Text => {
            if buf.remaining() < 2 {
                return Err(DbError::corruption("truncated TEXT length"));
            }
            let len = buf.get_u16_le() as usize;
            if buf.remaining() < len {
                return Err(DbError::corruption("truncated TEXT value"));
            }
            let raw = buf[..len].to_vec();
            buf.advance(len);
            let s = String::from_utf8(raw)
                .map_err(|_| DbError::corruption("TEXT value is not valid UTF-8"))?;
            Ok(Value::Text(s))
        }
        DataType::Boolean => {
            if buf.remaining() < 1 {
                return Err(DbError::corruption("truncated BOOLEAN value"));
            }
            Ok(Value::Boolean(buf.get_u8() != 0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> (Vec<String>, Vec<ColumnAttribute>) {
        (
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec![
                ColumnAttribute::new(DataType::Int),
                ColumnAttribute::new(DataType::Text),
                ColumnAttribute::new(DataType::Boolean),
            ],
        )
    }

    #[test]
    fn test_row_roundtrip() {
        let (names, attrs) = schema();
        let mut row = Row::new();
        row.insert("a".to_string(), Value::int(-1));
        row.insert("b".to_string(), Value::text("hello"));
        row.insert("c".to_string(), Value::boolean(true));

        let bytes = marshal_row(&row, &names, &attrs).unwrap();
        // 4 + (2 + 5) + 1
        assert_eq!(bytes.len(), 12);
        let back = unmarshal_row(&bytes, &names, &attrs).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_row_layout_is_little_endian() {
        let names = vec!["a".to_string()];
        let attrs = vec![ColumnAttribute::new(DataType::Int)];
        let mut row = Row::new();
        row.insert("a".to_string(), Value::int(1));
        let bytes = marshal_row(&row, &names, &attrs).unwrap();
        assert_eq!(bytes, vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_missing_column_rejected() {
        let (names, attrs) = schema();
        let row = Row::new();
        assert!(matches!(
            marshal_row(&row, &names, &attrs),
            Err(DbError::NoSuchColumn(_))
        ));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let names = vec!["a".to_string()];
        let attrs = vec![ColumnAttribute::new(DataType::Int)];
        let mut row = Row::new();
        row.insert("a".to_string(), Value::text("not an int"));
        assert!(matches!(
            marshal_row(&row, &names, &attrs),
            Err(DbError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_key_roundtrip() {
        let profile = vec![DataType::Text, DataType::Int];
        let key = vec![Value::text("yolk"), Value::int(3)];
        let bytes = marshal_key(&key, &profile).unwrap();
        assert_eq!(bytes.len(), key_encoded_len(&key));
        assert_eq!(unmarshal_key(&bytes, &profile).unwrap(), key);
    }

    #[test]
    fn test_key_arity_mismatch() {
        let profile = vec![DataType::Int];
        let key = vec![Value::int(1), Value::int(2)];
        assert!(matches!(
            marshal_key(&key, &profile),
            Err(DbError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_handle_roundtrip() {
        let handle = Handle::new(BlockId::new(77), RecordId::new(12));
        let bytes = marshal_handle(handle);
        assert_eq!(bytes.len(), HANDLE_LEN);
        assert_eq!(unmarshal_handle(&bytes).unwrap(), handle);
    }

    #[test]
    fn test_block_id_roundtrip() {
        let id = BlockId::new(0xDEAD);
        let bytes = marshal_block_id(id);
        assert_eq!(bytes.len(), BLOCK_ID_LEN);
        assert_eq!(unmarshal_block_id(&bytes).unwrap(), id);
    }

    #[test]
    fn test_truncated_decode_is_corruption() {
        let names = vec!["a".to_string()];
        let attrs = vec![ColumnAttribute::new(DataType::Int)];
        assert!(matches!(
            unmarshal_row(&[1, 2], &names, &attrs),
            Err(DbError::Corruption { .. })
        ));

        // TEXT length pointing past the buffer
        let attrs = vec![ColumnAttribute::new(DataType::Text)];
        assert!(matches!(
            unmarshal_row(&[10, 0, b'x'], &names, &attrs),
            Err(DbError::Corruption { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_is_corruption() {
        let names = vec!["a".to_string()];
        let attrs = vec![ColumnAttribute::new(DataType::Text)];
        assert!(matches!(
            unmarshal_row(&[2, 0, 0xFF, 0xFE], &names, &attrs),
            Err(DbError::Corruption { .. })
        ));
    }
}
