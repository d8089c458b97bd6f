//! Project records: the full record and the lightweight listing meta.

use super::wire::{Field, Reader, Writer};
use crate::constants::RECORD_VERSION;
use crate::error::{RecolorError, RecolorResult};
use crate::types::{PaintColor, to_hex};

/// One used color as persisted. Every field is optional on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UsedColorRecord {
    pub code: Option<String>,
    /// Packed ARGB
    pub rgb: Option<u32>,
    pub name: Option<String>,
    pub catalogue_name: Option<String>,
    pub catalogue_id: Option<String>,
    unknown: Vec<u8>,
}

impl UsedColorRecord {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        if let Some(code) = &self.code {
            w.string(1, code);
        }
        if let Some(rgb) = self.rgb {
            w.fixed32(2, rgb);
        }
        if let Some(name) = &self.name {
            w.string(3, name);
        }
        if let Some(catalogue_name) = &self.catalogue_name {
            w.string(4, catalogue_name);
        }
        if let Some(catalogue_id) = &self.catalogue_id {
            w.string(5, catalogue_id);
        }
        w.raw(&self.unknown);
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> RecolorResult<Self> {
        let mut record = Self::default();
        let mut reader = Reader::new(bytes);
        while let Some(field) = reader.next_field()? {
            let known = match field.number {
                1 => set(&mut record.code, field.as_string()?),
                2 => set(&mut record.rgb, field.as_fixed32()),
                3 => set(&mut record.name, field.as_string()?),
                4 => set(&mut record.catalogue_name, field.as_string()?),
                5 => set(&mut record.catalogue_id, field.as_string()?),
                _ => false,
            };
            if !known {
                record.unknown.extend_from_slice(field.raw);
            }
        }
        Ok(record)
    }

    /// Identity used to re-resolve the color against a catalogue
    pub fn key(&self) -> String {
        format!(
            "{}:{}",
            self.catalogue_id.as_deref().unwrap_or_default(),
            self.code.as_deref().unwrap_or_default()
        )
    }

    /// Rebuild the color. The stored code wins over the packed value.
    pub fn to_color(&self) -> PaintColor {
        let code = match (&self.code, self.rgb) {
            (Some(code), _) => code.clone(),
            (None, Some(rgb)) => to_hex(rgb),
            (None, None) => String::new(),
        };
        let mut color = PaintColor::new(
            self.name.clone().unwrap_or_else(|| code.clone()),
            code,
            self.catalogue_id.clone().unwrap_or_default(),
            self.catalogue_name.clone().unwrap_or_default(),
        );
        if self.code.is_none()
            && let Some(rgb) = self.rgb
        {
            color.value = rgb;
        }
        color
    }
}

impl From<&PaintColor> for UsedColorRecord {
    fn from(color: &PaintColor) -> Self {
        Self {
            code: Some(color.code.clone()),
            rgb: Some(color.value),
            name: Some(color.name.clone()),
            catalogue_name: Some(color.catalogue_name.clone()),
            catalogue_id: Some(color.catalogue_id.clone()),
            unknown: Vec::new(),
        }
    }
}

/// Store `value` when the wire type matched; mismatches stay unknown.
fn set<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

fn decode_color(field: &Field<'_>) -> RecolorResult<Option<UsedColorRecord>> {
    field.as_bytes().map(UsedColorRecord::decode).transpose()
}

fn missing_version(message: &str) -> RecolorError {
    RecolorError::Decode(format!("{message} is missing its version"))
}

/// Full project: both images (PNG) and the colors used on them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecolorRecord {
    pub version: i32,
    pub original_image: Option<Vec<u8>>,
    pub recolored_image: Option<Vec<u8>>,
    pub used_colors: Vec<UsedColorRecord>,
    unknown: Vec<u8>,
}

impl RecolorRecord {
    pub fn new(
        original_image: Vec<u8>,
        recolored_image: Option<Vec<u8>>,
        colors: &[PaintColor],
    ) -> Self {
        Self {
            version: RECORD_VERSION,
            original_image: Some(original_image),
            recolored_image,
            used_colors: colors.iter().map(UsedColorRecord::from).collect(),
            unknown: Vec::new(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.int32(1, self.version);
        if let Some(original) = &self.original_image {
            w.bytes(2, original);
        }
        if let Some(recolored) = &self.recolored_image {
            w.bytes(3, recolored);
        }
        for color in &self.used_colors {
            w.bytes(4, &color.encode());
        }
        w.raw(&self.unknown);
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> RecolorResult<Self> {
        let mut record = Self::default();
        let mut version = None;
        let mut reader = Reader::new(bytes);
        while let Some(field) = reader.next_field()? {
            let known = match field.number {
                1 => set(&mut version, field.as_int32()),
                2 => set(&mut record.original_image, field.as_bytes().map(<[u8]>::to_vec)),
                3 => set(&mut record.recolored_image, field.as_bytes().map(<[u8]>::to_vec)),
                4 => match decode_color(&field)? {
                    Some(color) => {
                        record.used_colors.push(color);
                        true
                    }
                    None => false,
                },
                _ => false,
            };
            if !known {
                record.unknown.extend_from_slice(field.raw);
            }
        }
        record.version = version.ok_or_else(|| missing_version("RecolorRecord"))?;
        Ok(record)
    }

    pub fn colors(&self) -> Vec<PaintColor> {
        self.used_colors.iter().map(UsedColorRecord::to_color).collect()
    }
}

/// Listing entry stored next to each record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecolorMeta {
    pub version: i32,
    /// Milliseconds since the Unix epoch
    pub timestamp: Option<u64>,
    pub used_colors: Vec<UsedColorRecord>,
    /// JPEG thumbnail with a swatch footer
    pub thumbnail: Option<Vec<u8>>,
    pub label: Option<String>,
    unknown: Vec<u8>,
}

impl RecolorMeta {
    pub fn new(timestamp: u64, colors: &[PaintColor], thumbnail: Vec<u8>, label: &str) -> Self {
        Self {
            version: RECORD_VERSION,
            timestamp: Some(timestamp),
            used_colors: colors.iter().map(UsedColorRecord::from).collect(),
            thumbnail: Some(thumbnail),
            label: Some(label.to_string()),
            unknown: Vec::new(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.int32(1, self.version);
        if let Some(timestamp) = self.timestamp {
            w.uint64(2, timestamp);
        }
        for color in &self.used_colors {
            w.bytes(3, &color.encode());
        }
        if let Some(thumbnail) = &self.thumbnail {
            w.bytes(4, thumbnail);
        }
        if let Some(label) = &self.label {
            w.string(5, label);
        }
        w.raw(&self.unknown);
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> RecolorResult<Self> {
        let mut meta = Self::default();
        let mut version = None;
        let mut reader = Reader::new(bytes);
        while let Some(field) = reader.next_field()? {
            let known = match field.number {
                1 => set(&mut version, field.as_int32()),
                2 => set(&mut meta.timestamp, field.as_varint()),
                3 => match decode_color(&field)? {
                    Some(color) => {
                        meta.used_colors.push(color);
                        true
                    }
                    None => false,
                },
                4 => set(&mut meta.thumbnail, field.as_bytes().map(<[u8]>::to_vec)),
                5 => set(&mut meta.label, field.as_string()?),
                _ => false,
            };
            if !known {
                meta.unknown.extend_from_slice(field.raw);
            }
        }
        meta.version = version.ok_or_else(|| missing_version("RecolorMeta"))?;
        Ok(meta)
    }

    pub fn colors(&self) -> Vec<PaintColor> {
        self.used_colors.iter().map(UsedColorRecord::to_color).collect()
    }
}
