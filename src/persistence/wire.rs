//! Minimal protobuf wire codec.
//!
//! Only what the project records need: varints, little-endian fixed32/64,
//! and length-delimited payloads. The reader hands back each field together
//! with its raw bytes so callers can keep fields they don't understand.

use crate::error::{RecolorError, RecolorResult};

/// Wire type carried in the low three bits of every tag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    Len = 2,
    Fixed32 = 5,
}

impl WireType {
    fn from_bits(bits: u64) -> RecolorResult<Self> {
        match bits {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::Len),
            5 => Ok(WireType::Fixed32),
            other => Err(RecolorError::Decode(format!("unsupported wire type {other}"))),
        }
    }
}

/// Decoded payload of one field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Varint(u64),
    Fixed64(u64),
    Len(&'a [u8]),
    Fixed32(u32),
}

/// One field as read from the buffer
#[derive(Clone, Copy, Debug)]
pub struct Field<'a> {
    pub number: u32,
    pub value: FieldValue<'a>,
    /// Tag and payload exactly as encoded
    pub raw: &'a [u8],
}

impl<'a> Field<'a> {
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self.value {
            FieldValue::Len(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_string(&self) -> RecolorResult<Option<String>> {
        self.as_bytes()
            .map(|b| {
                String::from_utf8(b.to_vec())
                    .map_err(|_| RecolorError::Decode(format!("field {} is not UTF-8", self.number)))
            })
            .transpose()
    }

    pub fn as_varint(&self) -> Option<u64> {
        match self.value {
            FieldValue::Varint(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_fixed32(&self) -> Option<u32> {
        match self.value {
            FieldValue::Fixed32(v) => Some(v),
            _ => None,
        }
    }

    /// `int32` is sign-extended to 64 bits on the wire
    pub fn as_int32(&self) -> Option<i32> {
        self.as_varint().map(|v| v as i64 as i32)
    }
}

// ============================================================================
// Writer
// ============================================================================

#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn varint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.buf.push((value as u8) | 0x80);
            value >>= 7;
        }
        self.buf.push(value as u8);
    }

    pub fn tag(&mut self, number: u32, wire_type: WireType) {
        self.varint(((number as u64) << 3) | wire_type as u64);
    }

    pub fn uint64(&mut self, number: u32, value: u64) {
        self.tag(number, WireType::Varint);
        self.varint(value);
    }

    /// Negative values take the full ten bytes
    pub fn int32(&mut self, number: u32, value: i32) {
        self.tag(number, WireType::Varint);
        self.varint(value as i64 as u64);
    }

    pub fn fixed32(&mut self, number: u32, value: u32) {
        self.tag(number, WireType::Fixed32);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn bytes(&mut self, number: u32, value: &[u8]) {
        self.tag(number, WireType::Len);
        self.varint(value.len() as u64);
        self.buf.extend_from_slice(value);
    }

    pub fn string(&mut self, number: u32, value: &str) {
        self.bytes(number, value.as_bytes());
    }

    /// Append already-encoded fields
    pub fn raw(&mut self, encoded: &[u8]) {
        self.buf.extend_from_slice(encoded);
    }
}

// ============================================================================
// Reader
// ============================================================================

pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn truncated(&self) -> RecolorError {
        RecolorError::Decode(format!("truncated input at byte {}", self.pos))
    }

    fn varint(&mut self) -> RecolorResult<u64> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = *self.buf.get(self.pos).ok_or_else(|| self.truncated())?;
            self.pos += 1;
            value |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(RecolorError::Decode("varint longer than ten bytes".into()))
    }

    fn take(&mut self, len: usize) -> RecolorResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or_else(|| self.truncated())?;
        let slice = self.buf.get(self.pos..end).ok_or_else(|| self.truncated())?;
        self.pos = end;
        Ok(slice)
    }

    /// Next field, or `None` at the end of the buffer
    pub fn next_field(&mut self) -> RecolorResult<Option<Field<'a>>> {
        if self.pos >= self.buf.len() {
            return Ok(None);
        }
        let start = self.pos;
        let key = self.varint()?;
        let number = u32::try_from(key >> 3)
            .ok()
            .filter(|&n| n != 0)
            .ok_or_else(|| RecolorError::Decode(format!("invalid field number at byte {start}")))?;

        let value = match WireType::from_bits(key & 0x7)? {
            WireType::Varint => FieldValue::Varint(self.varint()?),
            WireType::Fixed64 => {
                let bytes = self.take(8)?;
                let mut le = [0u8; 8];
                le.copy_from_slice(bytes);
                FieldValue::Fixed64(u64::from_le_bytes(le))
            }
            WireType::Len => {
                let len = usize::try_from(self.varint()?)
                    .map_err(|_| RecolorError::Decode("length overflows usize".into()))?;
                FieldValue::Len(self.take(len)?)
            }
            WireType::Fixed32 => {
                let bytes = self.take(4)?;
                let mut le = [0u8; 4];
                le.copy_from_slice(bytes);
                FieldValue::Fixed32(u32::from_le_bytes(le))
            }
        };

        Ok(Some(Field {
            number,
            value,
            raw: &self.buf[start..self.pos],
        }))
    }
}
