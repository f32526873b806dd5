//! Array column shape and slice description (SDL) generation.

use crate::error::{Error, Result};
use crate::protocol::constants::*;

/// Inclusive bounds of one array dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayBound {
    pub lower: i32,
    pub upper: i32,
}

impl ArrayBound {
    /// Create a bound pair.
    pub fn new(lower: i32, upper: i32) -> Self {
        Self { lower, upper }
    }

    /// Number of elements along this dimension (0 when upper < lower).
    pub fn extent(&self) -> usize {
        usize::try_from(self.upper as i64 - self.lower as i64 + 1).unwrap_or(0)
    }
}

/// Shape of an array column as recorded in the system catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDesc {
    /// Element type as a BLR code.
    pub blr_type: u8,
    /// Element scale.
    pub scale: i16,
    /// Element byte length.
    pub length: u16,
    /// Per-dimension bounds, 1..=16 entries.
    pub bounds: Vec<ArrayBound>,
    /// Storage flags; `ARRAY_DESC_COLUMN_MAJOR` selects column-major order.
    pub flags: i16,
    /// Owning table.
    pub relation_name: String,
    /// Column name.
    pub field_name: String,
}

impl ArrayDesc {
    /// Number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.bounds.len()
    }

    /// Whether elements are stored column-major.
    pub fn is_column_major(&self) -> bool {
        self.flags & ARRAY_DESC_COLUMN_MAJOR != 0
    }

    /// Total number of elements.
    pub fn element_count(&self) -> usize {
        self.bounds.iter().map(ArrayBound::extent).product()
    }

    /// Byte length of the whole slice as announced in slice requests.
    ///
    /// VARYING elements carry a 2-byte length prefix each.
    pub fn slice_byte_length(&self) -> usize {
        let count = self.element_count();
        let mut length = count * self.length as usize;
        if self.blr_type == BLR_VARYING || self.blr_type == BLR_VARYING2 {
            length += 2 * count;
        }
        length
    }

    /// Check the dimension count is within 1..=16.
    pub fn validate(&self) -> Result<()> {
        let dims = self.dimensions();
        if dims == 0 || dims > ARRAY_MAX_DIMENSIONS {
            return Err(Error::InvalidDimensions {
                expected: ARRAY_MAX_DIMENSIONS,
                actual: dims,
            });
        }
        Ok(())
    }

    /// Generate the slice description sent with op_get_slice / op_put_slice.
    pub fn to_sdl(&self) -> Result<Vec<u8>> {
        self.validate()?;

        let mut sdl = Vec::with_capacity(32 + self.relation_name.len() + self.field_name.len());
        sdl.push(ISC_SDL_VERSION1);
        sdl.push(ISC_SDL_STRUCT);
        sdl.push(1);
        sdl.push(self.blr_type);

        match self.blr_type {
            BLR_SHORT | BLR_LONG | BLR_INT64 | BLR_QUAD => sdl.push(self.scale as u8),
            BLR_TEXT | BLR_CSTRING | BLR_VARYING => {
                sdl.extend_from_slice(&self.length.to_le_bytes())
            }
            _ => {}
        }

        push_name(&mut sdl, ISC_SDL_RELATION, &self.relation_name);
        push_name(&mut sdl, ISC_SDL_FIELD, &self.field_name);

        let dims = self.dimensions();
        let order: Box<dyn Iterator<Item = usize>> = if self.is_column_major() {
            Box::new((0..dims).rev())
        } else {
            Box::new(0..dims)
        };
        for n in order {
            let bound = self.bounds[n];
            if bound.lower == 1 {
                sdl.push(ISC_SDL_DO1);
                sdl.push(n as u8);
            } else {
                sdl.push(ISC_SDL_DO2);
                sdl.push(n as u8);
                push_literal(&mut sdl, bound.lower);
            }
            push_literal(&mut sdl, bound.upper);
        }

        sdl.push(ISC_SDL_ELEMENT);
        sdl.push(1);
        sdl.push(ISC_SDL_SCALAR);
        sdl.push(0);
        sdl.push(dims as u8);
        for n in 0..dims {
            sdl.push(ISC_SDL_VARIABLE);
            sdl.push(n as u8);
        }
        sdl.push(ISC_SDL_EOC);

        Ok(sdl)
    }
}

fn push_name(sdl: &mut Vec<u8>, code: u8, name: &str) {
    let bytes = &name.as_bytes()[..name.len().min(u8::MAX as usize)];
    sdl.push(code);
    sdl.push(bytes.len() as u8);
    sdl.extend_from_slice(bytes);
}

fn push_literal(sdl: &mut Vec<u8>, value: i32) {
    if let Ok(tiny) = i8::try_from(value) {
        sdl.push(ISC_SDL_TINY_INTEGER);
        sdl.push(tiny as u8);
    } else if let Ok(short) = i16::try_from(value) {
        sdl.push(ISC_SDL_SHORT_INTEGER);
        sdl.extend_from_slice(&short.to_le_bytes());
    } else {
        sdl.push(ISC_SDL_LONG_INTEGER);
        sdl.extend_from_slice(&value.to_le_bytes());
    }
}
