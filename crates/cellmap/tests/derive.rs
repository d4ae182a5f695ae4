use cellmap::{Codec, Layout, Record, Schema};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Blob {
    x: i32,
}

#[derive(Debug, Default, Record)]
struct Inner {
    #[sheet("In A")]
    a: i32,
    #[sheet(read = "encoding:json")]
    b: Blob,
}

#[derive(Debug, Default, Record)]
struct Outer {
    first: String,
    #[sheet(flatten)]
    inner: Inner,
    #[sheet(json)]
    extra: Vec<Blob>,
    #[sheet(skip)]
    _cache: Option<String>,
}

#[test]
fn field_table_follows_declaration_order() {
    let defs = Outer::field_defs();
    let names: Vec<_> = defs.iter().map(|d| d.name).collect();
    assert_eq!(names, vec!["first", "a", "b", "extra"]);
    assert_eq!(Outer::field_count(), 4);

    assert_eq!(defs[1].main, Some("In A"));
    assert_eq!(defs[2].read, Some("encoding:json"));
    assert!(defs[3].type_name.contains("Blob"));
}

#[test]
fn serde_codec_is_chosen_for_json_fields() {
    let codecs: Vec<_> = Outer::field_defs().iter().map(|d| d.codec).collect();
    assert_eq!(codecs, vec![Codec::Text, Codec::Text, Codec::Serde, Codec::Serde]);
}

#[test]
fn derived_types_lay_out_as_records() {
    match <Outer as cellmap::Element>::layout() {
        Layout::Record(schema) => {
            assert_eq!(schema.len(), 4);
            assert_eq!(schema.field("a").map(|f| f.position), Some(1));
        }
        other => panic!("unexpected layout: {other:?}"),
    }
    assert_eq!(Schema::of::<Inner>().len(), 2);
}
