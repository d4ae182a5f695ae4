//! Element shapes the mapper can fill: records, sequences and string-keyed
//! maps, plus boxed versions of each.

use crate::convert::{CellCodec, decode, encode};
use crate::error::FieldError;
use crate::record::Record;
use crate::schema::Schema;
use cellmap_common::{CellValue, ResolvedTag};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;

const UNTAGGED: ResolvedTag<'static> = ResolvedTag::untagged();

/// How an element type lays out across a row.
#[derive(Clone, Debug)]
pub enum Layout {
    /// Named fields bound to header columns.
    Record(Schema),
    /// Cells by position; no header row.
    Sequence,
    /// Header cells are keys.
    Map,
}

/// Where a value goes inside an element.
#[derive(Clone, Debug)]
pub enum Slot<'a> {
    Field {
        position: usize,
        tag: &'a ResolvedTag<'a>,
    },
    Index(usize),
    Key(&'a str),
}

impl fmt::Display for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Field { position, tag } => write!(f, "field #{position} (`{}`)", tag.column),
            Slot::Index(index) => write!(f, "index {index}"),
            Slot::Key(key) => write!(f, "key `{key}`"),
        }
    }
}

fn mismatch(slot: Slot<'_>, shape: &'static str) -> FieldError {
    FieldError::SlotMismatch {
        slot: slot.to_string(),
        shape,
    }
}

/// A type one grid row maps onto.
pub trait Element: Sized + 'static {
    fn layout() -> Layout;

    /// A fresh element with every slot at its zero value.
    fn instantiate() -> Self;

    fn assign(&mut self, slot: Slot<'_>, text: &str) -> Result<(), FieldError>;

    fn extract(&self, slot: Slot<'_>) -> Result<CellValue, FieldError>;

    /// Keys present in a map element, sorted.
    fn keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Number of positions in a sequence element.
    fn width(&self) -> usize {
        0
    }
}

/// `Element::assign` for derived records.
pub fn assign_record<R: Record>(record: &mut R, slot: Slot<'_>, text: &str) -> Result<(), FieldError> {
    match slot {
        Slot::Field { position, tag } => record.decode_field(position, text, tag),
        other => Err(mismatch(other, "record")),
    }
}

/// `Element::extract` for derived records.
pub fn extract_record<R: Record>(record: &R, slot: Slot<'_>) -> Result<CellValue, FieldError> {
    match slot {
        Slot::Field { position, tag } => record.encode_field(position, tag),
        other => Err(mismatch(other, "record")),
    }
}

impl<V: CellCodec + 'static> Element for Vec<V> {
    fn layout() -> Layout {
        Layout::Sequence
    }

    fn instantiate() -> Self {
        Vec::new()
    }

    fn assign(&mut self, slot: Slot<'_>, text: &str) -> Result<(), FieldError> {
        let index = match slot {
            Slot::Index(index) => index,
            other => return Err(mismatch(other, "sequence")),
        };
        let value = decode(text, &UNTAGGED)?;
        if index >= self.len() {
            self.resize_with(index + 1, V::zero);
        }
        self[index] = value;
        Ok(())
    }

    fn extract(&self, slot: Slot<'_>) -> Result<CellValue, FieldError> {
        let index = match slot {
            Slot::Index(index) => index,
            other => return Err(mismatch(other, "sequence")),
        };
        match self.get(index) {
            Some(value) => Ok(encode(value, &UNTAGGED)?),
            None => Ok(CellValue::Empty),
        }
    }

    fn width(&self) -> usize {
        self.len()
    }
}

impl<V: CellCodec + 'static, const N: usize> Element for [V; N] {
    fn layout() -> Layout {
        Layout::Sequence
    }

    fn instantiate() -> Self {
        std::array::from_fn(|_| V::zero())
    }

    fn assign(&mut self, slot: Slot<'_>, text: &str) -> Result<(), FieldError> {
        let index = match slot {
            Slot::Index(index) => index,
            other => return Err(mismatch(other, "sequence")),
        };
        let target = self
            .get_mut(index)
            .ok_or(FieldError::IndexOutOfRange { index, len: N })?;
        *target = decode(text, &UNTAGGED)?;
        Ok(())
    }

    fn extract(&self, slot: Slot<'_>) -> Result<CellValue, FieldError> {
        let index = match slot {
            Slot::Index(index) => index,
            other => return Err(mismatch(other, "sequence")),
        };
        match self.get(index) {
            Some(value) => Ok(encode(value, &UNTAGGED)?),
            None => Err(FieldError::IndexOutOfRange { index, len: N }),
        }
    }

    fn width(&self) -> usize {
        N
    }
}

impl<V, S> Element for HashMap<String, V, S>
where
    V: CellCodec + 'static,
    S: BuildHasher + Default + 'static,
{
    fn layout() -> Layout {
        Layout::Map
    }

    fn instantiate() -> Self {
        HashMap::default()
    }

    fn assign(&mut self, slot: Slot<'_>, text: &str) -> Result<(), FieldError> {
        let key = match slot {
            Slot::Key(key) => key,
            other => return Err(mismatch(other, "map")),
        };
        self.insert(key.to_string(), decode(text, &UNTAGGED)?);
        Ok(())
    }

    fn extract(&self, slot: Slot<'_>) -> Result<CellValue, FieldError> {
        let key = match slot {
            Slot::Key(key) => key,
            other => return Err(mismatch(other, "map")),
        };
        match self.get(key) {
            Some(value) => Ok(encode(value, &UNTAGGED)?),
            None => Ok(CellValue::Empty),
        }
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = HashMap::keys(self).cloned().collect();
        keys.sort();
        keys
    }
}

impl<V: CellCodec + 'static> Element for BTreeMap<String, V> {
    fn layout() -> Layout {
        Layout::Map
    }

    fn instantiate() -> Self {
        BTreeMap::new()
    }

    fn assign(&mut self, slot: Slot<'_>, text: &str) -> Result<(), FieldError> {
        let key = match slot {
            Slot::Key(key) => key,
            other => return Err(mismatch(other, "map")),
        };
        self.insert(key.to_string(), decode(text, &UNTAGGED)?);
        Ok(())
    }

    fn extract(&self, slot: Slot<'_>) -> Result<CellValue, FieldError> {
        let key = match slot {
            Slot::Key(key) => key,
            other => return Err(mismatch(other, "map")),
        };
        match self.get(key) {
            Some(value) => Ok(encode(value, &UNTAGGED)?),
            None => Ok(CellValue::Empty),
        }
    }

    fn keys(&self) -> Vec<String> {
        BTreeMap::keys(self).cloned().collect()
    }
}

/// Pointer-declared elements: the box is allocated up front and filled in
/// place.
impl<E: Element> Element for Box<E> {
    fn layout() -> Layout {
        E::layout()
    }

    fn instantiate() -> Self {
        Box::new(E::instantiate())
    }

    fn assign(&mut self, slot: Slot<'_>, text: &str) -> Result<(), FieldError> {
        (**self).assign(slot, text)
    }

    fn extract(&self, slot: Slot<'_>) -> Result<CellValue, FieldError> {
        (**self).extract(slot)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn width(&self) -> usize {
        (**self).width()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate as cellmap;
    use crate::error::ConvertError;

    #[derive(Debug, Default, PartialEq, cellmap::Record)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn sequences_grow_to_fit() {
        let mut row = Vec::<i64>::instantiate();
        row.assign(Slot::Index(2), "5").unwrap();
        assert_eq!(row, vec![0, 0, 5]);
        assert_eq!(row.extract(Slot::Index(7)).unwrap(), CellValue::Empty);
    }

    #[test]
    fn fixed_sequences_reject_out_of_range_indexes() {
        let mut row = <[u8; 2]>::instantiate();
        row.assign(Slot::Index(1), "9").unwrap();
        assert_eq!(row, [0, 9]);
        assert!(matches!(
            row.assign(Slot::Index(2), "1"),
            Err(FieldError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn maps_report_sorted_keys() {
        let mut row = HashMap::<String, CellValue>::instantiate();
        row.assign(Slot::Key("b"), "2").unwrap();
        row.assign(Slot::Key("a"), "x").unwrap();
        assert_eq!(Element::keys(&row), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(row["b"], CellValue::Int(2));
        assert_eq!(row.extract(Slot::Key("zz")).unwrap(), CellValue::Empty);
    }

    #[test]
    fn records_only_take_field_slots() {
        let mut p = Point::instantiate();
        let tag = ResolvedTag::untagged();
        p.assign(Slot::Field { position: 1, tag: &tag }, "4").unwrap();
        assert_eq!(p, Point { x: 0, y: 4 });
        assert!(matches!(
            p.assign(Slot::Index(0), "1"),
            Err(FieldError::SlotMismatch { shape: "record", .. })
        ));
        assert!(matches!(
            p.assign(Slot::Field { position: 2, tag: &tag }, "1"),
            Err(FieldError::OutOfRange(2))
        ));
        assert!(matches!(
            p.assign(Slot::Field { position: 0, tag: &tag }, "abc"),
            Err(FieldError::Convert(ConvertError::Parse { .. }))
        ));
    }

    #[test]
    fn boxed_elements_delegate() {
        assert!(matches!(<Box<Point>>::layout(), Layout::Record(_)));
        let mut p = <Box<Point>>::instantiate();
        let tag = ResolvedTag::untagged();
        p.assign(Slot::Field { position: 0, tag: &tag }, "3").unwrap();
        assert_eq!(p.extract(Slot::Field { position: 0, tag: &tag }).unwrap(), CellValue::Int(3));
    }
}
