//! The per-type contract generated by `#[derive(Record)]`.

use crate::error::FieldError;
use crate::schema::DefaultTags;
use cellmap_common::{CellValue, ResolvedTag};

/// How a field's value travels between cell text and its type.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Codec {
    /// Through the type's `CellCodec` impl.
    Text,
    /// Through serde; required for `encoding:json`.
    Serde,
}

/// One mappable field as declared on the type, before tag parsing.
#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub type_name: &'static str,
    pub main: Option<&'static str>,
    pub read: Option<&'static str>,
    pub write: Option<&'static str>,
    pub codec: Codec,
}

/// A struct whose fields map onto sheet columns.
///
/// Fields are addressed by position in declaration order, with flattened
/// records spliced in at the point of embedding. Implement through
/// `#[derive(Record)]`.
pub trait Record: Default + 'static {
    fn field_defs() -> Vec<FieldDef>;

    fn field_count() -> usize;

    fn decode_field(
        &mut self,
        position: usize,
        text: &str,
        tag: &ResolvedTag<'_>,
    ) -> Result<(), FieldError>;

    fn encode_field(&self, position: usize, tag: &ResolvedTag<'_>)
    -> Result<CellValue, FieldError>;

    /// Type-level tag tables applied on top of the declared tags.
    fn default_tags() -> DefaultTags {
        DefaultTags::default()
    }
}

/// Supplies default tag tables for a record marked `#[sheet(default_tags)]`.
pub trait ProvideTags {
    fn provide_tags() -> DefaultTags;
}
