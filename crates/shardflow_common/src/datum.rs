use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use serde_json::Value as JsonValue;

/// A single scalar value as seen by the merge layer. Backend drivers map
/// their native column values into this enum; the kernel never needs the
/// full type system of any one dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Datum {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Text(String),
    Timestamp(i64), // microseconds since Unix epoch
    Date(i32),      // days since Unix epoch (1970-01-01)
    Jsonb(JsonValue),
    /// Fixed-point decimal: mantissa × 10^(-scale).
    /// e.g. Decimal(12345, 2) = 123.45
    Decimal(i128, u8),
}

/// Column type tag derived from a `Datum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float64,
    Text,
    Timestamp,
    Date,
    Jsonb,
    Decimal,
}

impl Datum {
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Datum::Null => None,
            Datum::Boolean(_) => Some(DataType::Boolean),
            Datum::Int32(_) => Some(DataType::Int32),
            Datum::Int64(_) => Some(DataType::Int64),
            Datum::Float64(_) => Some(DataType::Float64),
            Datum::Text(_) => Some(DataType::Text),
            Datum::Timestamp(_) => Some(DataType::Timestamp),
            Datum::Date(_) => Some(DataType::Date),
            Datum::Jsonb(_) => Some(DataType::Jsonb),
            Datum::Decimal(_, _) => Some(DataType::Decimal),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Interpret this datum as a signed integer, if it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Int32(v) => Some(*v as i64),
            Datum::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Interpret this datum as a float (widening integers and
    /// decimals).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Int32(v) => Some(*v as f64),
            Datum::Int64(v) => Some(*v as f64),
            Datum::Float64(v) => Some(*v),
            Datum::Decimal(m, s) => Some(decimal_to_f64(*m, *s)),
            _ => None,
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Boolean(v) => write!(f, "{}", v),
            Datum::Int32(v) => write!(f, "{}", v),
            Datum::Int64(v) => write!(f, "{}", v),
            Datum::Float64(v) => write!(f, "{}", v),
            Datum::Text(v) => write!(f, "{}", v),
            Datum::Timestamp(v) => write!(f, "ts:{}", v),
            Datum::Date(v) => write!(f, "date:{}", v),
            Datum::Jsonb(v) => write!(f, "{}", v),
            Datum::Decimal(m, s) => write!(f, "{}", decimal_to_string(*m, *s)),
        }
    }
}

/// One materialized result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedRow {
    pub values: Vec<Datum>,
}

impl OwnedRow {
    pub fn new(values: Vec<Datum>) -> Self {
        Self { values }
    }

    pub fn get(&self, idx: usize) -> Option<&Datum> {
        self.values.get(idx)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for OwnedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}

/// Compare two optional Datum values for sorting.
pub fn compare_datums(a: Option<&Datum>, b: Option<&Datum>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(da), Some(db)) => cmp_datum(da, db),
    }
}

/// Total order over datums with NULLS FIRST and cross-width numeric
/// comparison. Mixed non-numeric types compare equal rather than panic;
/// routing guarantees homogeneous columns in practice.
pub fn cmp_datum(a: &Datum, b: &Datum) -> Ordering {
    match (a, b) {
        (Datum::Null, Datum::Null) => Ordering::Equal,
        (Datum::Null, _) => Ordering::Less,
        (_, Datum::Null) => Ordering::Greater,
        (Datum::Int32(x), Datum::Int32(y)) => x.cmp(y),
        (Datum::Int64(x), Datum::Int64(y)) => x.cmp(y),
        (Datum::Int32(x), Datum::Int64(y)) => (*x as i64).cmp(y),
        (Datum::Int64(x), Datum::Int32(y)) => x.cmp(&(*y as i64)),
        (Datum::Float64(x), Datum::Float64(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Datum::Float64(x), Datum::Int64(y)) => {
            x.partial_cmp(&(*y as f64)).unwrap_or(Ordering::Equal)
        }
        (Datum::Int64(x), Datum::Float64(y)) => {
            (*x as f64).partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (Datum::Float64(x), Datum::Int32(y)) => {
            x.partial_cmp(&(*y as f64)).unwrap_or(Ordering::Equal)
        }
        (Datum::Int32(x), Datum::Float64(y)) => {
            (*x as f64).partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (Datum::Text(x), Datum::Text(y)) => x.cmp(y),
        (Datum::Boolean(x), Datum::Boolean(y)) => x.cmp(y),
        (Datum::Timestamp(x), Datum::Timestamp(y)) => x.cmp(y),
        (Datum::Date(x), Datum::Date(y)) => x.cmp(y),
        (Datum::Decimal(mx, sx), Datum::Decimal(my, sy)) => cmp_decimal(*mx, *sx, *my, *sy),
        _ => Ordering::Equal,
    }
}

fn cmp_decimal(ma: i128, sa: u8, mb: i128, sb: u8) -> Ordering {
    let (ma, mb, _) = rescale_decimals(ma, sa, mb, sb);
    ma.cmp(&mb)
}

/// Bring two (mantissa, scale) decimals to a common scale. Saturating
/// keeps extreme values ordered correctly instead of wrapping.
fn rescale_decimals(ma: i128, sa: u8, mb: i128, sb: u8) -> (i128, i128, u8) {
    if sa == sb {
        (ma, mb, sa)
    } else if sa < sb {
        let factor = 10i128.saturating_pow((sb - sa) as u32);
        (ma.saturating_mul(factor), mb, sb)
    } else {
        let factor = 10i128.saturating_pow((sa - sb) as u32);
        (ma, mb.saturating_mul(factor), sa)
    }
}

fn decimal_to_f64(mantissa: i128, scale: u8) -> f64 {
    mantissa as f64 / 10f64.powi(scale as i32)
}

fn decimal_add_int(mantissa: i128, scale: u8, v: i64) -> Datum {
    let scaled = (v as i128).saturating_mul(10i128.saturating_pow(scale as u32));
    Datum::Decimal(mantissa.saturating_add(scaled), scale)
}

/// Add two datums (SUM/COUNT accumulation). NULL is the identity.
/// Integer sums saturate at the i64 bounds rather than wrap; decimals
/// are rescaled to the wider scale; mixing a decimal with a float
/// falls over to float arithmetic.
pub fn datum_add(a: &Datum, b: &Datum) -> Datum {
    match (a, b) {
        (Datum::Int32(x), Datum::Int32(y)) => Datum::Int64(*x as i64 + *y as i64),
        (Datum::Int64(x), Datum::Int64(y)) => Datum::Int64(x.saturating_add(*y)),
        (Datum::Int32(x), Datum::Int64(y)) => Datum::Int64((*x as i64).saturating_add(*y)),
        (Datum::Int64(x), Datum::Int32(y)) => Datum::Int64(x.saturating_add(*y as i64)),
        (Datum::Float64(x), Datum::Float64(y)) => Datum::Float64(x + y),
        (Datum::Float64(x), Datum::Int64(y)) => Datum::Float64(x + *y as f64),
        (Datum::Int64(x), Datum::Float64(y)) => Datum::Float64(*x as f64 + y),
        (Datum::Float64(x), Datum::Int32(y)) => Datum::Float64(x + *y as f64),
        (Datum::Int32(x), Datum::Float64(y)) => Datum::Float64(*x as f64 + y),
        (Datum::Decimal(ma, sa), Datum::Decimal(mb, sb)) => {
            let (ma, mb, scale) = rescale_decimals(*ma, *sa, *mb, *sb);
            Datum::Decimal(ma.saturating_add(mb), scale)
        }
        (Datum::Decimal(m, s), Datum::Int32(v)) | (Datum::Int32(v), Datum::Decimal(m, s)) => {
            decimal_add_int(*m, *s, *v as i64)
        }
        (Datum::Decimal(m, s), Datum::Int64(v)) | (Datum::Int64(v), Datum::Decimal(m, s)) => {
            decimal_add_int(*m, *s, *v)
        }
        (Datum::Decimal(m, s), Datum::Float64(f)) | (Datum::Float64(f), Datum::Decimal(m, s)) => {
            Datum::Float64(decimal_to_f64(*m, *s) + f)
        }
        (Datum::Null, other) | (other, Datum::Null) => other.clone(),
        _ => a.clone(),
    }
}

/// Append a deterministic binary encoding of one datum to `key`.
/// Each datum is prefixed with a type tag byte, followed by its value
/// bytes, so distinct values never collide the way Debug strings can.
pub fn encode_datum_key(key: &mut Vec<u8>, datum: &Datum) {
    match datum {
        Datum::Null => key.push(0),
        Datum::Boolean(b) => {
            key.push(1);
            key.push(u8::from(*b));
        }
        Datum::Int32(v) => {
            key.push(2);
            key.extend_from_slice(&v.to_be_bytes());
        }
        Datum::Int64(v) => {
            key.push(3);
            key.extend_from_slice(&v.to_be_bytes());
        }
        Datum::Float64(v) => {
            key.push(4);
            key.extend_from_slice(&v.to_be_bytes());
        }
        Datum::Text(s) => {
            key.push(5);
            key.extend_from_slice(&(s.len() as u32).to_be_bytes());
            key.extend_from_slice(s.as_bytes());
        }
        Datum::Timestamp(v) => {
            key.push(6);
            key.extend_from_slice(&v.to_be_bytes());
        }
        Datum::Date(v) => {
            key.push(7);
            key.extend_from_slice(&v.to_be_bytes());
        }
        Datum::Jsonb(v) => {
            key.push(8);
            let s = v.to_string();
            key.extend_from_slice(&(s.len() as u32).to_be_bytes());
            key.extend_from_slice(s.as_bytes());
        }
        Datum::Decimal(m, s) => {
            key.push(9);
            key.push(*s);
            key.extend_from_slice(&m.to_be_bytes());
        }
    }
}

/// Convert a (mantissa, scale) decimal to its string representation.
/// e.g. (12345, 2) → "123.45", (-1, 3) → "-0.001"
pub fn decimal_to_string(mantissa: i128, scale: u8) -> String {
    if scale == 0 {
        return mantissa.to_string();
    }
    let negative = mantissa < 0;
    let abs = mantissa.unsigned_abs().to_string();
    let scale = scale as usize;
    let (int_part, frac_part) = if abs.len() > scale {
        let split = abs.len() - scale;
        (abs[..split].to_string(), abs[split..].to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", abs, width = scale))
    };
    if negative {
        format!("-{}.{}", int_part, frac_part)
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}
