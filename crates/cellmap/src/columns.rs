//! Header binding: which column offset (relative to the origin) each field
//! occupies for one pass.
//!
//! Bindings are rebuilt from scratch for every call, so nothing from a
//! previous pass can leak into the next one.

use crate::error::Error;
use crate::schema::Schema;
use cellmap_common::ResolvedTag;

/// Column offset per schema position; `None` for ignored or unmatched fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bindings {
    slots: Vec<Option<usize>>,
}

impl Bindings {
    pub fn unbound(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    pub fn get(&self, position: usize) -> Option<usize> {
        self.slots.get(position).copied().flatten()
    }

    /// `(position, offset)` pairs of bound fields in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(position, slot)| slot.map(|offset| (position, offset)))
    }

    pub fn bound_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// First header cell equal to `column` that no earlier field has claimed.
fn claim(header: &[String], claimed: &mut [bool], column: &str) -> Option<usize> {
    let index = header
        .iter()
        .enumerate()
        .position(|(i, cell)| !claimed[i] && cell == column)?;
    claimed[index] = true;
    Some(index)
}

/// Bind fields to an existing header row for reading. A `required` field
/// whose column is absent fails the whole pass.
pub fn bind_read(
    schema: &Schema,
    tags: &[ResolvedTag<'_>],
    header: &[String],
) -> Result<Bindings, Error> {
    let mut bindings = Bindings::unbound(tags.len());
    let mut claimed = vec![false; header.len()];

    for (position, tag) in tags.iter().enumerate() {
        if tag.ignore {
            continue;
        }
        match claim(header, &mut claimed, tag.column) {
            Some(offset) => bindings.slots[position] = Some(offset),
            None if tag.required => {
                let field = schema
                    .fields()
                    .get(position)
                    .map(|f| f.name)
                    .unwrap_or_default();
                return Err(Error::RequiredColumnMissing {
                    field: field.to_string(),
                    column: tag.column.to_string(),
                });
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!(column = tag.column, "column not in header; field keeps its zero value");
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(bound = bindings.bound_count(), header = header.len(), "read columns bound");

    Ok(bindings)
}

/// Bind fields for writing: reuse matching header cells, then give every
/// remaining field a fresh column after the last occupied header cell.
pub fn bind_write(tags: &[ResolvedTag<'_>], header: &[String]) -> Bindings {
    let mut bindings = Bindings::unbound(tags.len());
    let mut claimed = vec![false; header.len()];

    for (position, tag) in tags.iter().enumerate() {
        if !tag.ignore {
            bindings.slots[position] = claim(header, &mut claimed, tag.column);
        }
    }

    let mut next = header.len();
    for (position, tag) in tags.iter().enumerate() {
        if !tag.ignore && bindings.slots[position].is_none() {
            bindings.slots[position] = Some(next);
            next += 1;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        bound = bindings.bound_count(),
        appended = next - header.len(),
        "write columns bound"
    );

    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate as cellmap;
    use crate::schema::TagOverrides;
    use cellmap_common::Direction;

    #[derive(Debug, Default, cellmap::Record)]
    struct Row {
        #[sheet("Id,required")]
        id: i64,
        #[sheet("Name")]
        name: String,
        #[sheet("-")]
        hidden: String,
        #[sheet("Note")]
        first_note: String,
        #[sheet("Note")]
        second_note: String,
    }

    fn header(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn read_binding_matches_by_name_and_claims_duplicates_in_order() {
        let schema = Schema::of::<Row>();
        let none = TagOverrides::default();
        let tags = schema.resolve(Direction::Read, &none);
        let b = bind_read(&schema, &tags, &header(&["Note", "Id", "x", "Note"])).unwrap();
        assert_eq!(b.get(0), Some(1));
        assert_eq!(b.get(1), None);
        assert_eq!(b.get(2), None);
        assert_eq!(b.get(3), Some(0));
        assert_eq!(b.get(4), Some(3));
    }

    #[test]
    fn missing_required_column_fails() {
        let schema = Schema::of::<Row>();
        let none = TagOverrides::default();
        let tags = schema.resolve(Direction::Read, &none);
        match bind_read(&schema, &tags, &header(&["Name"])) {
            Err(Error::RequiredColumnMissing { field, column }) => {
                assert_eq!(field, "id");
                assert_eq!(column, "Id");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn write_binding_reuses_then_appends_after_existing_header() {
        let schema = Schema::of::<Row>();
        let none = TagOverrides::default();
        let tags = schema.resolve(Direction::Write, &none);
        let b = bind_write(&tags, &header(&["Comment", "Name"]));
        assert_eq!(b.get(1), Some(1));
        assert_eq!(b.get(0), Some(2));
        assert_eq!(b.get(2), None);
        assert_eq!(b.get(3), Some(3));
        assert_eq!(b.get(4), Some(4));
        assert_eq!(b.bound_count(), 4);
    }

    #[test]
    fn write_binding_on_blank_sheet_starts_at_origin() {
        let schema = Schema::of::<Row>();
        let none = TagOverrides::default();
        let tags = schema.resolve(Direction::Write, &none);
        let b = bind_write(&tags, &[]);
        let offsets: Vec<_> = b.iter().collect();
        assert_eq!(offsets, vec![(0, 0), (1, 1), (3, 2), (4, 3)]);
    }

    #[test]
    fn rebinding_is_stable() {
        let schema = Schema::of::<Row>();
        let none = TagOverrides::default();
        let tags = schema.resolve(Direction::Write, &none);
        let first = bind_write(&tags, &[]);
        let written: Vec<String> = first
            .iter()
            .map(|(position, _)| tags[position].column.to_string())
            .collect();
        assert_eq!(bind_write(&tags, &written), first);
    }
}
