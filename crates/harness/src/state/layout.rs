//! Published state record schema.
//!
//! The module's `get_game_state` export returns the address of a fixed, little-endian
//! record. This module is the single description of that record: every field is named
//! with its byte offset and kind, and every window the harness reads is derived from
//! these definitions rather than written as a bare number.
//!
//! | Offset | Field             | Kind        |
//! |--------|-------------------|-------------|
//! | 0x00   | `num_stars`       | `i32`       |
//! | 0x04   | `position`        | `[f32; 3]`  |
//! | 0x10   | `velocity`        | `[f32; 3]`  |
//! | 0x1C   | `camera_position` | `[f32; 3]`  |
//! | 0x28   | `camera_yaw`      | `i32`       |
//! | 0x2C   | `in_credits`      | `i32`       |
//! | 0x30   | `course`          | `i32`       |
//! | 0x34   | `act`             | `i32`       |
//! | 0x38   | `area`            | `i32`       |

/// Version of the record layout described here.
///
/// Bump whenever an offset or kind changes.
pub const LAYOUT_VERSION: u32 = 1;

/// Primitive shape of one field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Little-endian two's complement 32-bit integer.
    I32,
    /// Three consecutive little-endian IEEE-754 32-bit floats.
    Vec3F32,
}

impl FieldKind {
    /// Encoded size in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::I32 => 4,
            Self::Vec3F32 => 12,
        }
    }
}

/// One named field of the state record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    /// Field name.
    pub name: &'static str,
    /// Byte offset from the record's base address.
    pub offset: usize,
    /// Encoded shape.
    pub kind: FieldKind,
}

impl Field {
    const fn new(name: &'static str, offset: usize, kind: FieldKind) -> Self {
        Self { name, offset, kind }
    }

    /// Offset one past the field's last byte.
    pub const fn end(&self) -> usize {
        self.offset + self.kind.size()
    }
}

/// Collected star count; the record header.
pub const NUM_STARS: Field = Field::new("num_stars", 0x00, FieldKind::I32);
/// Player position.
pub const POSITION: Field = Field::new("position", 0x04, FieldKind::Vec3F32);
/// Player velocity.
pub const VELOCITY: Field = Field::new("velocity", 0x10, FieldKind::Vec3F32);
/// Camera position.
pub const CAMERA_POSITION: Field = Field::new("camera_position", 0x1C, FieldKind::Vec3F32);
/// Camera yaw.
pub const CAMERA_YAW: Field = Field::new("camera_yaw", 0x28, FieldKind::I32);
/// Non-zero while the end credits are rolling.
pub const IN_CREDITS: Field = Field::new("in_credits", 0x2C, FieldKind::I32);
/// Current course number.
pub const COURSE: Field = Field::new("course", 0x30, FieldKind::I32);
/// Current act number.
pub const ACT: Field = Field::new("act", 0x34, FieldKind::I32);
/// Current area index.
pub const AREA: Field = Field::new("area", 0x38, FieldKind::I32);

/// Every field, in offset order.
pub const FIELDS: [Field; 9] = [
    NUM_STARS,
    POSITION,
    VELOCITY,
    CAMERA_POSITION,
    CAMERA_YAW,
    IN_CREDITS,
    COURSE,
    ACT,
    AREA,
];

/// Size of the full record.
pub const RECORD_SIZE: usize = AREA.end();

/// Offset of the per-frame snapshot window (skips the `num_stars` header).
pub const SNAPSHOT_OFFSET: usize = POSITION.offset;

/// Length of the per-frame snapshot window (position then velocity).
pub const SNAPSHOT_SIZE: usize = VELOCITY.end() - POSITION.offset;

// The snapshot window is only valid while position and velocity stay adjacent.
const _: () = assert!(POSITION.offset == NUM_STARS.end());
const _: () = assert!(VELOCITY.offset == POSITION.end());
const _: () = assert!(SNAPSHOT_SIZE == 24);

/// Looks up a field by name.
pub fn field(name: &str) -> Option<Field> {
    FIELDS.iter().copied().find(|f| f.name == name)
}

/// Little-endian reader over a copied-out slice of the record.
///
/// `base` is the record offset of `bytes[0]`, so fields are addressed by their
/// schema offsets regardless of which window was read.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FieldReader<'a> {
    bytes: &'a [u8],
    base: usize,
}

impl<'a> FieldReader<'a> {
    pub(crate) const fn new(bytes: &'a [u8], base: usize) -> Self {
        Self { bytes, base }
    }

    fn word(&self, offset: usize) -> Option<[u8; 4]> {
        let start = offset.checked_sub(self.base)?;
        self.bytes.get(start..start + 4)?.try_into().ok()
    }

    pub(crate) fn f32_at(&self, offset: usize) -> Option<f32> {
        self.word(offset).map(f32::from_le_bytes)
    }

    pub(crate) fn i32_at(&self, field: Field) -> Option<i32> {
        debug_assert_eq!(field.kind, FieldKind::I32);
        self.word(field.offset).map(i32::from_le_bytes)
    }

    pub(crate) fn vec3_at(&self, field: Field) -> Option<[f32; 3]> {
        debug_assert_eq!(field.kind, FieldKind::Vec3F32);
        Some([
            self.f32_at(field.offset)?,
            self.f32_at(field.offset + 4)?,
            self.f32_at(field.offset + 8)?,
        ])
    }
}
