extern crate proc_macro;

mod parse;

use {
    parse::{parse, FieldKind},
    proc_macro::TokenStream,
    proc_macro2::Span,
    quote::quote,
    std::fmt,
    syn::{parse_macro_input, DeriveInput},
};

struct Error(Option<syn::Error>);

impl Error {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn add<T: fmt::Display>(&mut self, span: Span, message: T) {
        let error = syn::Error::new(span, message);
        match &mut self.0 {
            Some(e) => e.combine(error),
            None => self.0 = Some(error),
        }
    }

    pub fn add_err(&mut self, error: syn::Error) {
        match &mut self.0 {
            Some(e) => e.combine(error),
            None => self.0 = Some(error),
        }
    }

    pub fn error(&mut self) -> Option<syn::Error> {
        self.0.take()
    }
}

fn option_str(value: Option<&str>) -> proc_macro2::TokenStream {
    match value {
        Some(x) => quote! { ::core::option::Option::Some(#x) },
        None => quote! { ::core::option::Option::None },
    }
}

/// Implements `Schema`, `FromRow` and `IntoRow`, plus `Record` when a table is given.
///
/// ```ignore
/// #[derive(Record)]
/// #[relmap(table = "user", soft_delete = "is_deleted")]
/// struct User {
///     #[relmap(db = "id,pk")]
///     id: u64,
///     #[relmap(db = "name")]
///     name: String,
///     #[relmap(db = "score", has_one = "user_score:uid")]
///     score: i32,
///     #[relmap(has_many = "user_log:uid")]
///     logs: Vec<Log>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(relmap))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let record = match parse(&input) {
        Ok(record) => record,
        Err(err) => return err.into_compile_error().into(),
    };
    let ident = &record.ident;

    let mut field_defs = proc_macro2::TokenStream::new();
    let mut from_row = proc_macro2::TokenStream::new();
    let mut to_row = proc_macro2::TokenStream::new();
    let mut columns = 0usize;

    for field in &record.fields {
        let field_ident = &field.ident;
        let name = field_ident.to_string();
        let db = option_str(field.db.as_deref());
        let has_one = option_str(field.has_one.as_deref());
        let has_many = option_str(field.has_many.as_deref());
        let element = match &field.kind {
            FieldKind::HasMany(element) => quote! {
                ::core::option::Option::Some(<#element as relmap::schema::Schema>::fields)
            },
            _ => quote! { ::core::option::Option::None },
        };
        field_defs.extend(quote! {
            relmap::schema::FieldDef {
                ident: #name,
                db: #db,
                has_one: #has_one,
                has_many: #has_many,
                element: #element,
            },
        });

        from_row.extend(match &field.kind {
            FieldKind::Column(column) => quote! {
                #field_ident: row.take_field(#column)?,
            },
            FieldKind::HasOne(column) => quote! {
                #field_ident: row.take_or_default(#column)?,
            },
            FieldKind::HasMany(_) => quote! {
                #field_ident: relmap::model::many_from_value(
                    row.remove(#name).unwrap_or(relmap::types::Value::Null),
                )?,
            },
            FieldKind::Skip => quote! {
                #field_ident: ::core::default::Default::default(),
            },
        });

        if let FieldKind::Column(column) = &field.kind {
            columns += 1;
            to_row.extend(quote! {
                row.insert(
                    #column,
                    <relmap::types::Value as ::core::convert::TryFrom<_>>::try_from(
                        ::core::clone::Clone::clone(&self.#field_ident),
                    )
                        .map_err(::core::convert::Into::<relmap::error::SerializeError>::into)?,
                );
            });
        }
    }

    let record_impl = record.attrs.get("table").map(|table| {
        let table = &table.value;
        let conn = record.attrs.get("conn").map(|x| {
            let conn = &x.value;
            quote! { const CONNECTION: &'static str = #conn; }
        });
        let database = option_str(record.attrs.get("database").map(|x| x.value.as_str()));
        let soft_delete = option_str(record.attrs.get("soft_delete").map(|x| x.value.as_str()));
        quote! {
            impl relmap::model::Record for #ident {
                const TABLE: &'static str = #table;
                #conn
                const DATABASE: ::core::option::Option<&'static str> = #database;
                const SOFT_DELETE: ::core::option::Option<&'static str> = #soft_delete;
            }
        }
    });

    quote! {
        impl relmap::schema::Schema for #ident {
            fn fields() -> &'static [relmap::schema::FieldDef] {
                const FIELDS: &[relmap::schema::FieldDef] = &[#field_defs];
                FIELDS
            }
        }

        impl relmap::model::FromRow for #ident {
            fn from_row(
                mut row: relmap::types::Row,
            ) -> ::core::result::Result<Self, relmap::error::ParseError> {
                ::core::result::Result::Ok(Self {
                    #from_row
                })
            }
        }

        impl relmap::model::IntoRow for #ident {
            fn to_row(
                &self,
            ) -> ::core::result::Result<relmap::types::Row, relmap::error::SerializeError> {
                let mut row = relmap::types::Row::with_capacity(#columns);
                #to_row
                ::core::result::Result::Ok(row)
            }
        }

        #record_impl
    }
    .into()
}
