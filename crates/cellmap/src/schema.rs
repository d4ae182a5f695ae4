use crate::record::{Codec, Record};
use cellmap_common::{Direction, FieldTag, ResolvedTag};
use rustc_hash::FxHashMap;

/// Per-call tag overrides keyed by field name. They replace the field's
/// channel for the direction of the call.
pub type TagOverrides = FxHashMap<String, FieldTag>;

/// Type-level tag tables, one per channel, keyed by field name.
#[derive(Clone, Debug, Default)]
pub struct DefaultTags {
    pub main: TagOverrides,
    pub read: TagOverrides,
    pub write: TagOverrides,
}

impl DefaultTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main(mut self, field: &str, tag: FieldTag) -> Self {
        self.main.insert(field.to_string(), tag);
        self
    }

    pub fn read(mut self, field: &str, tag: FieldTag) -> Self {
        self.read.insert(field.to_string(), tag);
        self
    }

    pub fn write(mut self, field: &str, tag: FieldTag) -> Self {
        self.write.insert(field.to_string(), tag);
        self
    }
}

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub position: usize,
    pub name: &'static str,
    pub type_name: &'static str,
    pub codec: Codec,
    pub main: FieldTag,
    pub read: FieldTag,
    pub write: FieldTag,
}

impl FieldDescriptor {
    pub fn channel(&self, direction: Direction) -> &FieldTag {
        match direction {
            Direction::Read => &self.read,
            Direction::Write => &self.write,
        }
    }

    /// Effective tag for `direction`; a caller override replaces the channel.
    pub fn resolve<'a>(
        &'a self,
        direction: Direction,
        caller: Option<&'a FieldTag>,
    ) -> ResolvedTag<'a> {
        let channel = caller.unwrap_or_else(|| self.channel(direction));
        ResolvedTag::merge(self.name, &self.main, channel)
    }
}

/// Ordered field table of a record type. Immutable once built.
#[derive(Clone, Debug)]
pub struct Schema {
    element: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    pub fn of<R: Record>() -> Self {
        let defaults = R::default_tags();
        let parse = |raw: Option<&str>| raw.map(FieldTag::parse).unwrap_or_default();

        let fields: Vec<FieldDescriptor> = R::field_defs()
            .into_iter()
            .enumerate()
            .map(|(position, def)| FieldDescriptor {
                position,
                name: def.name,
                type_name: def.type_name,
                codec: def.codec,
                main: parse(def.main).frozen(defaults.main.get(def.name)),
                read: parse(def.read).frozen(defaults.read.get(def.name)),
                write: parse(def.write).frozen(defaults.write.get(def.name)),
            })
            .collect();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            element = std::any::type_name::<R>(),
            fields = fields.len(),
            "schema built"
        );

        Self {
            element: std::any::type_name::<R>(),
            fields,
        }
    }

    pub fn element(&self) -> &'static str {
        self.element
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Effective tags of every field for one direction, indexed by position.
    pub fn resolve<'a>(
        &'a self,
        direction: Direction,
        overrides: &'a TagOverrides,
    ) -> Vec<ResolvedTag<'a>> {
        self.fields
            .iter()
            .map(|f| f.resolve(direction, overrides.get(f.name)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate as cellmap;
    use cellmap_common::CellValue;

    #[derive(Debug, Default, cellmap::Record)]
    #[sheet(default_tags)]
    struct Account {
        #[sheet("Id", read = "ID", write = "id")]
        id: i64,
        #[sheet("Name,default:error", read = "default:anonymous")]
        name: String,
        #[sheet("-")]
        secret: String,
        #[sheet(skip)]
        cache: Vec<u8>,
        notes: String,
    }

    impl cellmap::ProvideTags for Account {
        fn provide_tags() -> DefaultTags {
            DefaultTags::new().write("notes", FieldTag::new().with_column("Remarks"))
        }
    }

    #[test]
    fn skipped_fields_are_not_described() {
        let schema = Schema::of::<Account>();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["id", "name", "secret", "notes"]);
        assert_eq!(schema.fields()[3].position, 3);
        assert!(schema.element().ends_with("Account"));
    }

    #[test]
    fn direction_channels_resolve_independently() {
        let schema = Schema::of::<Account>();
        let none = TagOverrides::default();
        let read = schema.resolve(Direction::Read, &none);
        let write = schema.resolve(Direction::Write, &none);

        assert_eq!(read[0].column, "ID");
        assert_eq!(write[0].column, "id");
        assert_eq!(read[1].column, "Name");
        assert_eq!(read[1].default, Some(&CellValue::Text("anonymous".into())));
        assert_eq!(write[1].default, Some(&CellValue::Text("error".into())));
        assert!(read[2].ignore && write[2].ignore);
        assert_eq!(read[3].column, "notes");
        assert_eq!(write[3].column, "Remarks");
    }

    #[test]
    fn caller_overrides_replace_the_channel_only_for_that_call() {
        let schema = Schema::of::<Account>();
        let mut overrides = TagOverrides::default();
        overrides.insert("id".into(), FieldTag::new().with_column("Key"));

        assert_eq!(schema.resolve(Direction::Read, &overrides)[0].column, "Key");
        assert_eq!(
            schema.resolve(Direction::Read, &TagOverrides::default())[0].column,
            "ID"
        );
        // Main channel still fills what the override leaves unset.
        let main_only = FieldTag::default();
        overrides.insert("name".into(), main_only);
        let read = schema.resolve(Direction::Read, &overrides);
        assert_eq!(read[1].column, "Name");
        assert_eq!(read[1].default, Some(&CellValue::Text("error".into())));
    }
}
