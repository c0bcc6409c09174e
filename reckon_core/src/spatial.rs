//! Spatial variant record codec
//!
//! Decodes the spatial attribute of a reflected entity into a
//! `SpatialSample`. The record is a variant keyed by a leading discriminant
//! octet; each alternative extends the previous one:
//!
//! | Disc. | Name        | Fields after the discriminant                         |
//! |-------|-------------|-------------------------------------------------------|
//! | 0     | Other       | position                                              |
//! | 1     | Static      | position, frozen, orientation                         |
//! | 2, 6  | FPW/FPB     | ... + velocity                                        |
//! | 3, 7  | RPW/RPB     | ... + velocity, angular velocity                      |
//! | 4, 8  | RVW/RVB     | ... + velocity, acceleration, angular velocity        |
//! | 5, 9  | FVW/FVB     | ... + velocity, acceleration                          |
//!
//! Position is three floats in the world-location encoding; every other
//! vector is three floats in the body encoding. Orientation travels as
//! (psi, theta, phi) and is exposed as (phi, theta, psi).
//!
//! # Alignment
//!
//! With `Alignment::Hla` each element starts on a multiple of its own
//! size, measured from the start of the record, and the alternative starts
//! on the boundary of its widest float. `Alignment::Packed` has no padding.

use crate::dead_reckoning::KinematicState;
use crate::error::DecodeError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// ENCODINGS
// ============================================================================

/// IEEE-754 float representations accepted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloatEncoding {
    Float32Be,
    Float32Le,
    Float64Be,
    Float64Le,
}

impl FloatEncoding {
    /// Size of one value in bytes.
    pub fn size(self) -> usize {
        match self {
            FloatEncoding::Float32Be | FloatEncoding::Float32Le => 4,
            FloatEncoding::Float64Be | FloatEncoding::Float64Le => 8,
        }
    }

    /// Reads one value; `bytes` must hold at least `size()` bytes.
    fn read(self, bytes: &[u8]) -> f64 {
        match self {
            FloatEncoding::Float32Be => f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            FloatEncoding::Float32Le => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            FloatEncoding::Float64Be => f64::from_be_bytes(eight(bytes)),
            FloatEncoding::Float64Le => f64::from_le_bytes(eight(bytes)),
        }
    }

    fn write(self, value: f64, out: &mut Vec<u8>) {
        match self {
            FloatEncoding::Float32Be => out.extend_from_slice(&(value as f32).to_be_bytes()),
            FloatEncoding::Float32Le => out.extend_from_slice(&(value as f32).to_le_bytes()),
            FloatEncoding::Float64Be => out.extend_from_slice(&value.to_be_bytes()),
            FloatEncoding::Float64Le => out.extend_from_slice(&value.to_le_bytes()),
        }
    }
}

fn eight(bytes: &[u8]) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    buf
}

impl FromStr for FloatEncoding {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "float32be" | "hlafloat32be" => Ok(FloatEncoding::Float32Be),
            "float32le" | "hlafloat32le" => Ok(FloatEncoding::Float32Le),
            "float64be" | "hlafloat64be" => Ok(FloatEncoding::Float64Be),
            "float64le" | "hlafloat64le" => Ok(FloatEncoding::Float64Le),
            _ => Err(DecodeError::UnsupportedEncoding(s.to_string())),
        }
    }
}

/// Padding rule between record elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Elements padded to their octet boundary
    Hla,
    /// No padding
    Packed,
}

/// Encodings and padding of one spatial record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireLayout {
    /// Encoding of the world-location record
    pub position_encoding: FloatEncoding,
    /// Encoding of orientation, velocity, acceleration and angular velocity
    pub body_encoding: FloatEncoding,
    pub alignment: Alignment,
}

impl Default for WireLayout {
    fn default() -> Self {
        Self {
            position_encoding: FloatEncoding::Float64Be,
            body_encoding: FloatEncoding::Float32Be,
            alignment: Alignment::Hla,
        }
    }
}

impl WireLayout {
    /// Same encoding for every float, packed.
    pub fn packed(encoding: FloatEncoding) -> Self {
        Self {
            position_encoding: encoding,
            body_encoding: encoding,
            alignment: Alignment::Packed,
        }
    }

    fn boundary(&self, field: Field) -> usize {
        if self.alignment == Alignment::Packed {
            return 1;
        }
        match field {
            Field::Position => self.position_encoding.size(),
            Field::Frozen => 1,
            _ => self.body_encoding.size(),
        }
    }

    fn alternative_boundary(&self, fields: &[Field]) -> usize {
        fields.iter().map(|f| self.boundary(*f)).max().unwrap_or(1)
    }

    fn encoding(&self, field: Field) -> FloatEncoding {
        match field {
            Field::Position => self.position_encoding,
            _ => self.body_encoding,
        }
    }
}

// ============================================================================
// RECORD SHAPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Position,
    Frozen,
    Orientation,
    Velocity,
    Acceleration,
    AngularVelocity,
}

use Field::*;

fn fields_for(discriminant: u8) -> Result<&'static [Field], DecodeError> {
    const OTHER: &[Field] = &[Position];
    const STATIC: &[Field] = &[Position, Frozen, Orientation];
    const FP: &[Field] = &[Position, Frozen, Orientation, Velocity];
    const RP: &[Field] = &[Position, Frozen, Orientation, Velocity, AngularVelocity];
    const RV: &[Field] = &[Position, Frozen, Orientation, Velocity, Acceleration, AngularVelocity];
    const FV: &[Field] = &[Position, Frozen, Orientation, Velocity, Acceleration];

    match discriminant {
        0 => Ok(OTHER),
        1 => Ok(STATIC),
        2 | 6 => Ok(FP),
        3 | 7 => Ok(RP),
        4 | 8 => Ok(RV),
        5 | 9 => Ok(FV),
        other => Err(DecodeError::UnknownDiscriminant(other)),
    }
}

/// One decoded spatial update. Absent fields are zero-filled.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpatialSample {
    pub discriminant: u8,
    /// World position
    pub position: Vector3<f64>,
    pub is_frozen: bool,
    /// Euler angles (phi, theta, psi) in radians
    pub orientation: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub acceleration: Vector3<f64>,
    /// Body-axis angular velocity
    pub angular_velocity: Vector3<f64>,
}

impl SpatialSample {
    pub fn discriminant(&self) -> u8 {
        self.discriminant
    }

    /// Sample for `discriminant` carrying only the fields its layout holds.
    pub fn from_state(discriminant: u8, state: &KinematicState, is_frozen: bool) -> Result<Self, DecodeError> {
        let fields = fields_for(discriminant)?;
        let has = |f: Field| fields.contains(&f);
        let pick = |f: Field, v: Vector3<f64>| if has(f) { v } else { Vector3::zeros() };
        Ok(Self {
            discriminant,
            position: state.position,
            is_frozen: is_frozen && has(Frozen),
            orientation: pick(Orientation, state.orientation),
            velocity: pick(Velocity, state.velocity),
            acceleration: pick(Acceleration, state.acceleration),
            angular_velocity: pick(AngularVelocity, state.angular_velocity),
        })
    }

    /// Kinematic snapshot for the extrapolation models.
    pub fn kinematic_state(&self) -> KinematicState {
        KinematicState {
            position: self.position,
            velocity: self.velocity,
            acceleration: self.acceleration,
            orientation: self.orientation,
            angular_velocity: self.angular_velocity,
        }
    }
}

// ============================================================================
// DECODER
// ============================================================================

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn align(&mut self, boundary: usize) {
        let rem = self.offset % boundary;
        if rem != 0 {
            self.offset += boundary - rem;
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.offset + len;
        if end > self.bytes.len() {
            return Err(DecodeError::Truncated {
                needed: end,
                available: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn triple(&mut self, encoding: FloatEncoding, boundary: usize) -> Result<Vector3<f64>, DecodeError> {
        self.align(boundary);
        let size = encoding.size();
        let raw = self.take(size * 3)?;
        Ok(Vector3::new(
            encoding.read(&raw[..size]),
            encoding.read(&raw[size..2 * size]),
            encoding.read(&raw[2 * size..]),
        ))
    }
}

/// Decodes spatial variant records for one wire layout.
#[derive(Debug, Clone, Default)]
pub struct SpatialDecoder {
    layout: WireLayout,
}

impl SpatialDecoder {
    pub fn new(layout: WireLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &WireLayout {
        &self.layout
    }

    /// Decodes one record. Bytes after the alternative are ignored.
    pub fn decode(&self, bytes: &[u8]) -> Result<SpatialSample, DecodeError> {
        let discriminant = *bytes.first().ok_or(DecodeError::Empty)?;
        let fields = fields_for(discriminant)?;

        let mut reader = Reader { bytes, offset: 1 };
        reader.align(self.layout.alternative_boundary(fields));

        let mut sample = SpatialSample {
            discriminant,
            ..SpatialSample::default()
        };

        for field in fields {
            let boundary = self.layout.boundary(*field);
            match field {
                Frozen => {
                    sample.is_frozen = match reader.take(1)?[0] {
                        0 => false,
                        1 => true,
                        other => return Err(DecodeError::InvalidFrozenFlag(other)),
                    };
                }
                Orientation => {
                    let wire = reader.triple(self.layout.encoding(*field), boundary)?;
                    // psi, theta, phi on the wire
                    sample.orientation = Vector3::new(wire.z, wire.y, wire.x);
                }
                Position => sample.position = reader.triple(self.layout.encoding(*field), boundary)?,
                Velocity => sample.velocity = reader.triple(self.layout.encoding(*field), boundary)?,
                Acceleration => sample.acceleration = reader.triple(self.layout.encoding(*field), boundary)?,
                AngularVelocity => {
                    sample.angular_velocity = reader.triple(self.layout.encoding(*field), boundary)?
                }
            }
        }

        Ok(sample)
    }
}

// ============================================================================
// ENCODER
// ============================================================================

/// Produces spatial variant records, the inverse of `SpatialDecoder`.
#[derive(Debug, Clone, Default)]
pub struct SpatialEncoder {
    layout: WireLayout,
}

impl SpatialEncoder {
    pub fn new(layout: WireLayout) -> Self {
        Self { layout }
    }

    /// Encodes the fields the sample's discriminant carries.
    pub fn encode(&self, sample: &SpatialSample) -> Result<Vec<u8>, DecodeError> {
        let fields = fields_for(sample.discriminant)?;
        let mut out = Vec::with_capacity(96);
        out.push(sample.discriminant);
        pad(&mut out, self.layout.alternative_boundary(fields));

        for field in fields {
            let values = match field {
                Frozen => {
                    out.push(u8::from(sample.is_frozen));
                    continue;
                }
                Position => sample.position,
                Orientation => Vector3::new(sample.orientation.z, sample.orientation.y, sample.orientation.x),
                Velocity => sample.velocity,
                Acceleration => sample.acceleration,
                AngularVelocity => sample.angular_velocity,
            };
            pad(&mut out, self.layout.boundary(*field));
            let encoding = self.layout.encoding(*field);
            for value in values.iter() {
                encoding.write(*value, &mut out);
            }
        }

        Ok(out)
    }
}

fn pad(out: &mut Vec<u8>, boundary: usize) {
    while out.len() % boundary != 0 {
        out.push(0);
    }
}
