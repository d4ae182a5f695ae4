use cellmap_common::{Encoding, FieldTag};
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Attribute, Data, DeriveInput, Error, Fields, Ident, LitStr, Result, Token, Type,
    parse_macro_input,
};

/// Derive `cellmap::Record` and `cellmap::Element` for a struct with named
/// fields.
///
/// Field attributes (all under `#[sheet(...)]`):
/// - `"tag"`: main channel tag, used by both directions
/// - `read = "tag"` / `write = "tag"`: direction-specific tags
/// - `flatten`: splice the fields of an embedded record in place
/// - `json`: convert through serde so `encoding:json` can be used
/// - `skip`: hide the field from the mapper (filled from `Default`)
///
/// Container attribute: `#[sheet(default_tags)]` pulls default tag tables from
/// the type's `cellmap::ProvideTags` impl.
#[proc_macro_derive(Record, attributes(sheet))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/* ────────────────────────── attribute grammar ───────────────────────── */

enum SheetArg {
    Tag(LitStr),
    Flag(Ident),
    Named(Ident, LitStr),
}

impl Parse for SheetArg {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.peek(LitStr) {
            return Ok(SheetArg::Tag(input.parse()?));
        }
        let ident: Ident = input.parse()?;
        if input.peek(Token![=]) {
            input.parse::<Token![=]>()?;
            Ok(SheetArg::Named(ident, input.parse()?))
        } else {
            Ok(SheetArg::Flag(ident))
        }
    }
}

fn sheet_args(attrs: &[Attribute]) -> Result<Vec<SheetArg>> {
    let mut out = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("sheet")) {
        let args = attr.parse_args_with(Punctuated::<SheetArg, Token![,]>::parse_terminated)?;
        out.extend(args);
    }
    Ok(out)
}

#[derive(Default)]
struct FieldAttrs {
    main: Option<LitStr>,
    read: Option<LitStr>,
    write: Option<LitStr>,
    flatten: bool,
    json: bool,
    skip: bool,
}

impl FieldAttrs {
    fn from_attrs(attrs: &[Attribute], span: Span) -> Result<Self> {
        let mut out = FieldAttrs::default();
        for arg in sheet_args(attrs)? {
            match arg {
                SheetArg::Tag(lit) => set_once(&mut out.main, lit, "main tag")?,
                SheetArg::Named(key, lit) if key == "main" => {
                    set_once(&mut out.main, lit, "main tag")?
                }
                SheetArg::Named(key, lit) if key == "read" => set_once(&mut out.read, lit, "read tag")?,
                SheetArg::Named(key, lit) if key == "write" => {
                    set_once(&mut out.write, lit, "write tag")?
                }
                SheetArg::Flag(flag) if flag == "flatten" => out.flatten = true,
                SheetArg::Flag(flag) if flag == "json" => out.json = true,
                SheetArg::Flag(flag) if flag == "skip" => out.skip = true,
                SheetArg::Flag(other) | SheetArg::Named(other, _) => {
                    return Err(Error::new(
                        other.span(),
                        format!("unknown sheet attribute `{other}`"),
                    ));
                }
            }
        }
        let tagged = out.main.is_some() || out.read.is_some() || out.write.is_some();
        if out.flatten && (tagged || out.json) {
            return Err(Error::new(
                span,
                "`flatten` fields take their tags from the embedded record",
            ));
        }
        if out.skip && (tagged || out.flatten || out.json) {
            return Err(Error::new(span, "`skip` cannot be combined with other sheet attributes"));
        }
        Ok(out)
    }

    /// Serde-backed conversion is needed when asked for or when any declared
    /// tag selects json encoding.
    fn wants_serde(&self) -> bool {
        self.json
            || [&self.main, &self.read, &self.write]
                .into_iter()
                .flatten()
                .any(|lit| FieldTag::parse(&lit.value()).encoding == Some(Encoding::Json))
    }
}

fn set_once(slot: &mut Option<LitStr>, lit: LitStr, what: &str) -> Result<()> {
    if slot.is_some() {
        return Err(Error::new(lit.span(), format!("duplicate {what}")));
    }
    *slot = Some(lit);
    Ok(())
}

fn container_wants_default_tags(attrs: &[Attribute]) -> Result<bool> {
    let mut wants = false;
    for arg in sheet_args(attrs)? {
        match arg {
            SheetArg::Flag(flag) if flag == "default_tags" => wants = true,
            SheetArg::Tag(lit) => {
                return Err(Error::new(lit.span(), "tags belong on fields, not on the type"));
            }
            SheetArg::Flag(other) | SheetArg::Named(other, _) => {
                return Err(Error::new(
                    other.span(),
                    format!("unknown container attribute `{other}`"),
                ));
            }
        }
    }
    Ok(wants)
}

/* ────────────────────────── code generation ───────────────────────── */

enum Member<'a> {
    Plain {
        ident: &'a Ident,
        ty: &'a Type,
        attrs: FieldAttrs,
    },
    Flatten {
        ident: &'a Ident,
        ty: &'a Type,
    },
}

fn expand(input: &DeriveInput) -> Result<TokenStream2> {
    /* -------- 1 · collect named fields -------- */
    let Data::Struct(data) = &input.data else {
        return Err(Error::new(input.span(), "Record can only be derived for structs"));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(Error::new(
            data.fields.span(),
            "Record requires a struct with named fields",
        ));
    };

    let mut members = Vec::new();
    for field in &named.named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = FieldAttrs::from_attrs(&field.attrs, field.span())?;
        if attrs.skip {
            continue;
        }
        if attrs.flatten {
            members.push(Member::Flatten { ident, ty: &field.ty });
        } else {
            members.push(Member::Plain { ident, ty: &field.ty, attrs });
        }
    }

    /* -------- 2 · per-member fragments -------- */
    let mut defs = Vec::new();
    let mut counts = Vec::new();
    let mut decodes = Vec::new();
    let mut encodes = Vec::new();

    for member in &members {
        match member {
            Member::Plain { ident, ty, attrs } => {
                let name = ident.to_string();
                let main = opt_lit(&attrs.main);
                let read = opt_lit(&attrs.read);
                let write = opt_lit(&attrs.write);
                let serde = attrs.wants_serde();
                let codec = if serde {
                    quote! { ::cellmap::Codec::Serde }
                } else {
                    quote! { ::cellmap::Codec::Text }
                };
                let (decode_fn, encode_fn) = if serde {
                    (quote! { decode_serde }, quote! { encode_serde })
                } else {
                    (quote! { decode }, quote! { encode })
                };

                defs.push(quote! {
                    defs.push(::cellmap::FieldDef {
                        name: #name,
                        type_name: ::core::any::type_name::<#ty>(),
                        main: #main,
                        read: #read,
                        write: #write,
                        codec: #codec,
                    });
                });
                counts.push(quote! { 1usize });
                decodes.push(quote! {
                    if position == 0 {
                        self.#ident = ::cellmap::convert::#decode_fn::<#ty>(text, tag)?;
                        return ::core::result::Result::Ok(());
                    }
                    position -= 1;
                });
                encodes.push(quote! {
                    if position == 0 {
                        return ::core::result::Result::Ok(
                            ::cellmap::convert::#encode_fn::<#ty>(&self.#ident, tag)?,
                        );
                    }
                    position -= 1;
                });
            }
            Member::Flatten { ident, ty } => {
                defs.push(quote! {
                    defs.extend(<#ty as ::cellmap::Record>::field_defs());
                });
                counts.push(quote! { <#ty as ::cellmap::Record>::field_count() });
                decodes.push(quote! {
                    let span = <#ty as ::cellmap::Record>::field_count();
                    if position < span {
                        return ::cellmap::Record::decode_field(&mut self.#ident, position, text, tag);
                    }
                    position -= span;
                });
                encodes.push(quote! {
                    let span = <#ty as ::cellmap::Record>::field_count();
                    if position < span {
                        return ::cellmap::Record::encode_field(&self.#ident, position, tag);
                    }
                    position -= span;
                });
            }
        }
    }

    let default_tags = if container_wants_default_tags(&input.attrs)? {
        quote! {
            fn default_tags() -> ::cellmap::DefaultTags {
                <Self as ::cellmap::ProvideTags>::provide_tags()
            }
        }
    } else {
        quote! {}
    };

    /* -------- 3 · assemble the impls -------- */
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::cellmap::Record for #name #ty_generics #where_clause {
            fn field_defs() -> ::std::vec::Vec<::cellmap::FieldDef> {
                #[allow(unused_mut)]
                let mut defs = ::std::vec::Vec::new();
                #(#defs)*
                defs
            }

            fn field_count() -> usize {
                0usize #(+ #counts)*
            }

            #[allow(unused_mut, unused_assignments, unused_variables)]
            fn decode_field(
                &mut self,
                position: usize,
                text: &str,
                tag: &::cellmap::ResolvedTag<'_>,
            ) -> ::core::result::Result<(), ::cellmap::FieldError> {
                let requested = position;
                let mut position = position;
                #(#decodes)*
                ::core::result::Result::Err(::cellmap::FieldError::OutOfRange(requested))
            }

            #[allow(unused_mut, unused_assignments, unused_variables)]
            fn encode_field(
                &self,
                position: usize,
                tag: &::cellmap::ResolvedTag<'_>,
            ) -> ::core::result::Result<::cellmap::CellValue, ::cellmap::FieldError> {
                let requested = position;
                let mut position = position;
                #(#encodes)*
                ::core::result::Result::Err(::cellmap::FieldError::OutOfRange(requested))
            }

            #default_tags
        }

        impl #impl_generics ::cellmap::Element for #name #ty_generics #where_clause {
            fn layout() -> ::cellmap::Layout {
                ::cellmap::Layout::Record(::cellmap::Schema::of::<Self>())
            }

            fn instantiate() -> Self {
                ::core::default::Default::default()
            }

            fn assign(
                &mut self,
                slot: ::cellmap::Slot<'_>,
                text: &str,
            ) -> ::core::result::Result<(), ::cellmap::FieldError> {
                ::cellmap::container::assign_record(self, slot, text)
            }

            fn extract(
                &self,
                slot: ::cellmap::Slot<'_>,
            ) -> ::core::result::Result<::cellmap::CellValue, ::cellmap::FieldError> {
                ::cellmap::container::extract_record(self, slot)
            }
        }
    })
}

fn opt_lit(lit: &Option<LitStr>) -> TokenStream2 {
    match lit {
        Some(lit) => quote! { ::core::option::Option::Some(#lit) },
        None => quote! { ::core::option::Option::None },
    }
}
