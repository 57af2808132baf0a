//! Static field descriptors and the [`ModelInfo`] derived from them.

mod has;

use crate::error::SchemaError;

pub use has::{merge_relations, HasOpts, OtherKey, DEFAULT_CONNECTION, DEFAULT_KEY};

bitflags::bitflags! {
    #[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
    pub struct FieldFlags: u8 {
        /// `pk`
        const PRIMARY = 1;
        /// `ii`: left out of INSERT statements
        const INSERT_IGNORE = 1 << 1;
    }
}

impl FieldFlags {
    fn from_option(option: &str) -> Option<Self> {
        match option {
            "pk" => Some(Self::PRIMARY),
            "ii" => Some(Self::INSERT_IGNORE),
            _ => None,
        }
    }
}

/// One struct field as written by `#[derive(Record)]`.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub ident: &'static str,
    /// `db = "column,options"`
    pub db: Option<&'static str>,
    pub has_one: Option<&'static str>,
    pub has_many: Option<&'static str>,
    /// Field table of the has-many element type.
    pub element: Option<fn() -> &'static [FieldDef]>,
}

impl FieldDef {
    pub const fn new(ident: &'static str) -> Self {
        Self {
            ident,
            db: None,
            has_one: None,
            has_many: None,
            element: None,
        }
    }
}

/// Types with a static field table.
pub trait Schema {
    fn fields() -> &'static [FieldDef];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub column: String,
    pub ident: String,
    pub flags: FieldFlags,
}

/// Columns, primary key and relations of one record type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub primary_key: Option<String>,
    pub fields: Vec<FieldInfo>,
    /// Fields filled in by relations only.
    pub other_fields: Vec<FieldInfo>,
    pub has_one: Vec<HasOpts>,
    pub has_many: Vec<HasOpts>,
}

fn parse_db_tag(tag: &str) -> Option<(&str, FieldFlags)> {
    let mut tokens = tag.split(',').map(str::trim);
    let column = tokens.next().filter(|x| !x.is_empty() && *x != "-")?;
    let flags = tokens
        .filter_map(FieldFlags::from_option)
        .fold(FieldFlags::empty(), |acc, x| acc | x);
    Some((column, flags))
}

fn relation(field: &str, tag: &str) -> Result<HasOpts, SchemaError> {
    tag.parse()
        .map_err(|error| SchemaError::MalformedRelationTag {
            field: field.to_owned(),
            error,
        })
}

impl ModelInfo {
    pub fn of<T: Schema>() -> Result<Self, SchemaError> {
        let name = std::any::type_name::<T>();
        Self::derive(name.rsplit("::").next().unwrap_or(name), T::fields())
    }

    /// Walks `defs` in declaration order.
    pub fn derive(name: &str, defs: &[FieldDef]) -> Result<Self, SchemaError> {
        let mut info = ModelInfo {
            name: name.to_owned(),
            ..Default::default()
        };
        let mut has_one = Vec::new();
        let mut has_many = Vec::new();

        for def in defs {
            let db = def.db.and_then(parse_db_tag);

            if let Some(tag) = def.has_one {
                let mut opts = relation(def.ident, tag)?;
                let column = db.map(|(column, _)| column).unwrap_or(def.ident);
                if db.is_some() {
                    opts.add_other_key(OtherKey::column(column));
                }
                has_one.push(opts);
                info.other_fields.push(FieldInfo {
                    column: column.to_owned(),
                    ident: def.ident.to_owned(),
                    flags: FieldFlags::empty(),
                });
            } else if let Some(tag) = def.has_many {
                let mut opts = relation(def.ident, tag)?;
                let element = def
                    .element
                    .ok_or_else(|| SchemaError::NotAStruct(def.ident.to_owned()))?;
                let element = ModelInfo::derive(def.ident, element())?;
                for field in element.fields {
                    opts.add_other_key(OtherKey::column(field.column));
                }
                opts.field = Some(def.ident.to_owned());
                has_many.push(opts);
                info.other_fields.push(FieldInfo {
                    column: def.ident.to_owned(),
                    ident: def.ident.to_owned(),
                    flags: FieldFlags::empty(),
                });
            } else if let Some((column, flags)) = db {
                if info.column(column).is_some() {
                    return Err(SchemaError::DuplicateColumn(column.to_owned()));
                }
                if flags.contains(FieldFlags::PRIMARY) {
                    if info.primary_key.is_some() {
                        return Err(SchemaError::MultiplePrimaryKeys(column.to_owned()));
                    }
                    info.primary_key = Some(column.to_owned());
                }
                info.fields.push(FieldInfo {
                    column: column.to_owned(),
                    ident: def.ident.to_owned(),
                    flags,
                });
            }
        }

        info.has_one = merge_relations(has_one);
        info.has_many = merge_relations(has_many);
        Ok(info)
    }

    pub fn column(&self, column: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|x| x.column == column)
    }

    pub fn field_by_ident(&self, ident: &str) -> Option<&FieldInfo> {
        self.fields
            .iter()
            .chain(&self.other_fields)
            .find(|x| x.ident == ident)
    }

    /// Persisted columns in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|x| x.column.as_str())
    }

    /// `false` for the primary key, `ii` columns and columns the model doesn't know.
    pub fn is_insertable(&self, column: &str) -> bool {
        self.column(column).is_some_and(|x| {
            !x.flags
                .intersects(FieldFlags::PRIMARY | FieldFlags::INSERT_IGNORE)
        })
    }
}

#[cfg(test)]
mod test {
    use {
        super::{FieldDef, FieldFlags, HasOpts, ModelInfo, OtherKey},
        crate::error::{RelationParseError, SchemaError},
    };

    const LOG: &[FieldDef] = &[
        FieldDef {
            db: Some("id,pk"),
            ..FieldDef::new("id")
        },
        FieldDef {
            db: Some("msg"),
            ..FieldDef::new("message")
        },
    ];

    fn log_fields() -> &'static [FieldDef] {
        LOG
    }

    const USER: &[FieldDef] = &[
        FieldDef {
            db: Some("id,pk"),
            ..FieldDef::new("id")
        },
        FieldDef {
            db: Some("name"),
            ..FieldDef::new("name")
        },
        FieldDef {
            db: Some("created_at, ii"),
            ..FieldDef::new("created_at")
        },
        FieldDef {
            db: Some("score"),
            has_one: Some("user_score:uid"),
            ..FieldDef::new("score")
        },
        FieldDef {
            db: Some("rank"),
            has_one: Some("user_score:uid"),
            ..FieldDef::new("rank")
        },
        FieldDef {
            has_many: Some("user_log:uid"),
            element: Some(log_fields),
            ..FieldDef::new("logs")
        },
        FieldDef::new("scratch"),
    ];

    #[test]
    fn derive() {
        let info = ModelInfo::derive("User", USER).unwrap();
        assert_eq!(info.primary_key.as_deref(), Some("id"));
        assert_eq!(info.columns().collect::<Vec<_>>(), ["id", "name", "created_at"]);
        assert_eq!(
            info.column("created_at").unwrap().flags,
            FieldFlags::INSERT_IGNORE
        );
        assert!(info.is_insertable("name"));
        assert!(!info.is_insertable("id"));
        assert!(!info.is_insertable("created_at"));
        assert!(!info.is_insertable("score"));

        assert_eq!(
            info.has_one,
            vec![HasOpts::new("user_score")
                .foreign_key("uid")
                .other_key(OtherKey::column("score"))
                .other_key(OtherKey::column("rank"))]
        );
        assert_eq!(
            info.has_many,
            vec![HasOpts::new("user_log")
                .foreign_key("uid")
                .other_key(OtherKey::column("id"))
                .other_key(OtherKey::column("msg"))
                .field("logs")]
        );
        assert_eq!(
            info.other_fields
                .iter()
                .map(|x| x.ident.as_str())
                .collect::<Vec<_>>(),
            ["score", "rank", "logs"]
        );
        assert_eq!(info.field_by_ident("message"), None);
    }

    #[test]
    fn errors() {
        let duplicate = [
            FieldDef {
                db: Some("a"),
                ..FieldDef::new("a")
            },
            FieldDef {
                db: Some("a"),
                ..FieldDef::new("b")
            },
        ];
        assert_eq!(
            ModelInfo::derive("X", &duplicate),
            Err(SchemaError::DuplicateColumn("a".into()))
        );

        let two_keys = [
            FieldDef {
                db: Some("a,pk"),
                ..FieldDef::new("a")
            },
            FieldDef {
                db: Some("b,pk"),
                ..FieldDef::new("b")
            },
        ];
        assert_eq!(
            ModelInfo::derive("X", &two_keys),
            Err(SchemaError::MultiplePrimaryKeys("b".into()))
        );

        let no_element = [FieldDef {
            has_many: Some("log:uid"),
            ..FieldDef::new("logs")
        }];
        assert_eq!(
            ModelInfo::derive("X", &no_element),
            Err(SchemaError::NotAStruct("logs".into()))
        );

        let malformed = [FieldDef {
            has_one: Some("no colon"),
            ..FieldDef::new("x")
        }];
        assert_eq!(
            ModelInfo::derive("X", &malformed),
            Err(SchemaError::MalformedRelationTag {
                field: "x".into(),
                error: RelationParseError::InvalidHasString("no colon".into()),
            })
        );
    }
}
