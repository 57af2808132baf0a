use {
    crate::Error,
    proc_macro2::Span,
    std::collections::HashMap,
    syn::{
        punctuated::Punctuated, spanned::Spanned, token, Attribute, Data, DeriveInput, Expr,
        ExprLit, GenericArgument, Ident, Lit, MetaNameValue, PathArguments, Type,
    },
};

const CONTAINER_KEYS: &[&str] = &["table", "conn", "database", "soft_delete"];
const FIELD_KEYS: &[&str] = &["db", "has_one", "has_many"];

pub struct Attr {
    pub value: String,
    pub span: Span,
}

pub enum FieldKind {
    /// `db = "column,options"` without a relation.
    Column(String),
    /// Filled by a has-one relation under `column`.
    HasOne(String),
    /// `Vec<element>` filled by a has-many relation.
    HasMany(Type),
    /// Not mapped; always `Default::default()`.
    Skip,
}

pub struct Field {
    pub ident: Ident,
    pub kind: FieldKind,
    pub db: Option<String>,
    pub has_one: Option<String>,
    pub has_many: Option<String>,
}

pub struct Record {
    pub ident: Ident,
    pub attrs: HashMap<String, Attr>,
    pub fields: Vec<Field>,
}

pub fn parse_attr(error: &mut Error, attrs: &[Attribute], allowed: &[&str]) -> HashMap<String, Attr> {
    let mut map = HashMap::new();
    for attr in attrs {
        if !attr.path().is_ident("relmap") {
            continue;
        }
        match attr.parse_args_with(Punctuated::<MetaNameValue, token::Comma>::parse_terminated) {
            Ok(values) => {
                for value in values {
                    let ident = match value.path.get_ident() {
                        Some(x) => x.to_string(),
                        None => {
                            error.add(value.path.span(), "expected ident");
                            continue;
                        }
                    };
                    if !allowed.contains(&ident.as_str()) {
                        error.add(
                            value.path.span(),
                            format!("unknown key `{ident}`, expected one of {allowed:?}"),
                        );
                        continue;
                    }
                    if let Expr::Lit(ExprLit {
                        attrs: _,
                        lit: Lit::Str(x),
                    }) = &value.value
                    {
                        map.insert(
                            ident,
                            Attr {
                                value: x.value(),
                                span: x.span(),
                            },
                        );
                    } else {
                        error.add(value.value.span(), "expected string literal");
                    }
                }
            }
            Err(err) => error.add_err(err),
        }
    }
    map
}

/// `T` of a `Vec<T>` field.
fn vec_element(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Vec" {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) if args.args.len() == 1 => match args.args.first() {
            Some(GenericArgument::Type(ty)) => Some(ty),
            _ => None,
        },
        _ => None,
    }
}

fn column(tag: &str) -> Option<String> {
    tag.split(',')
        .next()
        .map(str::trim)
        .filter(|x| !x.is_empty() && *x != "-")
        .map(str::to_owned)
}

pub fn parse(input: &DeriveInput) -> Result<Record, syn::Error> {
    let mut error = Error::empty();
    let span = input.ident.span();

    if !input.generics.params.is_empty() {
        error.add(input.generics.span(), "relmap does not support generic records");
    }
    let attrs = parse_attr(&mut error, &input.attrs, CONTAINER_KEYS);

    let mut fields = Vec::new();
    match &input.data {
        Data::Enum(_) => error.add(span, "relmap does not support derive for enums"),
        Data::Union(_) => error.add(span, "relmap does not support derive for unions"),
        Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => {
                for field in &named.named {
                    let Some(ident) = field.ident.clone() else {
                        continue;
                    };
                    let mut tags = parse_attr(&mut error, &field.attrs, FIELD_KEYS);
                    let db = tags.remove("db");
                    let has_one = tags.remove("has_one");
                    let has_many = tags.remove("has_many");

                    let kind = match (&has_one, &has_many) {
                        (Some(_), Some(x)) => {
                            error.add(x.span, "a field can't be both has_one and has_many");
                            FieldKind::Skip
                        }
                        (Some(_), None) => FieldKind::HasOne(
                            db.as_ref()
                                .and_then(|x| column(&x.value))
                                .unwrap_or_else(|| ident.to_string()),
                        ),
                        (None, Some(x)) => match vec_element(&field.ty) {
                            Some(element) => FieldKind::HasMany(element.clone()),
                            None => {
                                error.add(
                                    x.span,
                                    "has_many fields must be a `Vec` of a type deriving `Record`",
                                );
                                FieldKind::Skip
                            }
                        },
                        (None, None) => match db.as_ref().and_then(|x| column(&x.value)) {
                            Some(column) => FieldKind::Column(column),
                            None => FieldKind::Skip,
                        },
                    };

                    fields.push(Field {
                        ident,
                        kind,
                        db: db.map(|x| x.value),
                        has_one: has_one.map(|x| x.value),
                        has_many: has_many.map(|x| x.value),
                    });
                }
            }
            syn::Fields::Unnamed(_) => {
                error.add(span, "relmap does not support derive for tuple structs")
            }
            syn::Fields::Unit => error.add(span, "relmap does not support derive for unit structs"),
        },
    }

    match error.error() {
        Some(err) => Err(err),
        None => Ok(Record {
            ident: input.ident.clone(),
            attrs,
            fields,
        }),
    }
}
