//! The snapshot file format.
//!
//! ```json
//! {"0": {"greeting": {"Type": "string", "Value": "hello", "TTL": null}}}
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value as Json;
use tempfile::NamedTempFile;

pub use self::reply::decode_reply;

use crate::constants::field;
use crate::types::{
    CodecError, CodecResult, EncodedSnapshot, KeyRecord, RecordValue, ScoredMember, SnapResult,
    Snapshot, ValueType,
};

pub mod reply;

impl Serialize for KeyRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("KeyRecord", 3)?;
        record.serialize_field(field::TYPE, &self.value_type())?;
        match &self.value {
            RecordValue::String(value) => record.serialize_field(field::VALUE, value)?,
            RecordValue::List(values) => record.serialize_field(field::VALUE, values)?,
            RecordValue::Set(members) => record.serialize_field(field::VALUE, members)?,
            RecordValue::SortedSet(members) => record.serialize_field(field::VALUE, members)?,
            RecordValue::Hash(fields) => record.serialize_field(field::VALUE, fields)?,
        }
        record.serialize_field(field::TTL, &self.ttl)?;
        record.end()
    }
}

fn decode_value<T: serde::de::DeserializeOwned>(value_type: ValueType, raw: Json) -> CodecResult<T> {
    serde_json::from_value(raw).map_err(|source| CodecError::InvalidValue { value_type, source })
}

fn decode_ttl(raw: Option<Json>) -> CodecResult<Option<u64>> {
    let raw = match raw {
        None | Some(Json::Null) => return Ok(None),
        Some(raw) => raw,
    };
    let millis = raw
        .as_i64()
        .or_else(|| raw.as_u64().map(|ms| i64::try_from(ms).unwrap_or(i64::MAX)))
        .or_else(|| raw.as_f64().filter(|ms| ms.is_finite()).map(|ms| ms as i64))
        .ok_or_else(|| CodecError::InvalidTtl(raw.to_string()))?;
    Ok(u64::try_from(millis).ok())
}

/// Decodes one record of an untrusted snapshot. Every failure is scoped to
/// this record.
pub fn decode_record(raw: Json) -> CodecResult<KeyRecord> {
    let Json::Object(mut fields) = raw else {
        return Err(CodecError::NotAnObject);
    };

    let tag = fields
        .remove(field::TYPE)
        .ok_or(CodecError::MissingField(field::TYPE))?;
    let value_type = tag
        .as_str()
        .and_then(ValueType::from_tag)
        .ok_or_else(|| CodecError::UnknownType(tag.to_string()))?;

    let raw_value = fields
        .remove(field::VALUE)
        .ok_or(CodecError::MissingField(field::VALUE))?;
    let value = match value_type {
        ValueType::String => RecordValue::String(decode_value(value_type, raw_value)?),
        ValueType::List => RecordValue::List(decode_value(value_type, raw_value)?),
        ValueType::Set => {
            RecordValue::Set(decode_value::<BTreeSet<String>>(value_type, raw_value)?)
        }
        ValueType::SortedSet => {
            RecordValue::SortedSet(decode_value::<Vec<ScoredMember>>(value_type, raw_value)?)
        }
        ValueType::Hash => {
            RecordValue::Hash(decode_value::<BTreeMap<String, String>>(value_type, raw_value)?)
        }
    };

    let ttl = decode_ttl(fields.remove(field::TTL))?;
    Ok(KeyRecord::new(value, ttl))
}

pub fn to_writer<W: Write>(out: W, snapshot: &Snapshot) -> SnapResult<()> {
    serde_json::to_writer(out, snapshot)?;
    Ok(())
}

/// Writes the snapshot next to `path` and renames it into place, so readers
/// never see a partial file.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> SnapResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(file.as_file_mut());
        to_writer(&mut out, snapshot)?;
        out.flush()?;
    }
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn read_snapshot(path: &Path) -> SnapResult<EncodedSnapshot> {
    let file = fs::File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Scores as JSON numbers; infinities, which JSON cannot express, as the
/// store's own `inf` / `-inf` spelling.
pub mod score {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;

    use crate::constants::score::{NEG_INF, POS_INF};

    pub fn serialize<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if score.is_finite() {
            serializer.serialize_f64(*score)
        } else if *score > 0.0 {
            serializer.serialize_str(POS_INF)
        } else if *score < 0.0 {
            serializer.serialize_str(NEG_INF)
        } else {
            Err(serde::ser::Error::custom("score is NaN"))
        }
    }

    struct ScoreVisitor;

    impl<'de> Visitor<'de> for ScoreVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number, \"inf\" or \"-inf\"")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            match v {
                POS_INF | "+inf" => Ok(f64::INFINITY),
                NEG_INF => Ok(f64::NEG_INFINITY),
                _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
            }
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(ScoreVisitor)
    }
}
