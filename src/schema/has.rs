use {
    crate::error::RelationParseError,
    std::{fmt, str::FromStr},
};

pub const DEFAULT_CONNECTION: &str = "default";
pub const DEFAULT_KEY: &str = "id";

/// Column pulled from a related table, optionally renamed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OtherKey {
    pub column: String,
    pub alias: Option<String>,
}

impl OtherKey {
    pub fn column(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            alias: None,
        }
    }

    pub fn aliased(column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            alias: Some(alias.into()),
        }
    }

    /// Name the value ends up under: the alias if there is one.
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.column)
    }
}

impl fmt::Display for OtherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} as {alias}", self.column),
            None => f.write_str(&self.column),
        }
    }
}

impl FromStr for OtherKey {
    type Err = RelationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_whitespace().collect::<Vec<_>>().as_slice() {
            [column] => Ok(Self::column(*column)),
            [column, keyword, alias] if keyword.eq_ignore_ascii_case("as") => {
                Ok(Self::aliased(*column, *alias))
            }
            _ => Err(RelationParseError::InvalidOtherKeySyntax(s.trim().to_owned())),
        }
    }
}

/// Relation descriptor shared by has-one and has-many.
///
/// Has-one copies every other key into the owning row. Has-many collects the
/// matching related rows into `field`, or, without a `field`, collects one
/// list per other key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasOpts {
    pub conn: String,
    pub database: Option<String>,
    pub table: String,
    pub local_key: String,
    pub foreign_key: String,
    pub other_keys: Vec<OtherKey>,
    pub field: Option<String>,
}

impl HasOpts {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            conn: DEFAULT_CONNECTION.to_owned(),
            database: None,
            table: table.into(),
            local_key: DEFAULT_KEY.to_owned(),
            foreign_key: DEFAULT_KEY.to_owned(),
            other_keys: Vec::new(),
            field: None,
        }
    }

    pub fn connection(mut self, conn: impl Into<String>) -> Self {
        self.conn = conn.into();
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn local_key(mut self, local_key: impl Into<String>) -> Self {
        self.local_key = local_key.into();
        self
    }

    pub fn foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
        self.foreign_key = foreign_key.into();
        self
    }

    pub fn other_key(mut self, key: OtherKey) -> Self {
        self.add_other_key(key);
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub(crate) fn add_other_key(&mut self, key: OtherKey) {
        if !self.other_keys.contains(&key) {
            self.other_keys.push(key);
        }
    }

    fn same_target(&self, other: &Self) -> bool {
        self.conn == other.conn && self.database == other.database && self.table == other.table
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|x| x.is_ascii_alphanumeric() || x == '_' || x == '$')
}

impl FromStr for HasOpts {
    type Err = RelationParseError;

    /// Parses `[conn.][db.]table:[local_key->]foreign_key,other_key...`.
    /// Two dotted segments are read as `db.table`.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let invalid = || RelationParseError::InvalidHasString(tag.to_owned());

        let (target, keys) = tag.split_once(':').ok_or_else(invalid)?;
        let segments = target.split('.').map(str::trim).collect::<Vec<_>>();
        if !segments.iter().all(|x| is_identifier(x)) {
            return Err(invalid());
        }
        let mut opts = match segments.as_slice() {
            [table] => HasOpts::new(*table),
            [database, table] => HasOpts::new(*table).database(*database),
            [conn, database, table] => HasOpts::new(*table).connection(*conn).database(*database),
            _ => return Err(invalid()),
        };

        let mut entries = keys.split(',').map(str::trim);
        let join = entries.next().unwrap_or_default();
        let (local_key, foreign_key) = match join.split_once("->") {
            Some((local_key, foreign_key)) => (local_key.trim(), foreign_key.trim()),
            None => ("", join),
        };
        for (key, target) in [
            (local_key, &mut opts.local_key),
            (foreign_key, &mut opts.foreign_key),
        ] {
            if key.is_empty() {
                continue;
            }
            if !is_identifier(key) {
                return Err(invalid());
            }
            *target = key.to_owned();
        }

        for entry in entries.filter(|x| !x.is_empty()) {
            opts.add_other_key(entry.parse()?);
        }
        Ok(opts)
    }
}

/// Folds descriptors pointing at the same `(conn, database, table)`, and for
/// has-many the same destination, into the first one, unioning their other keys.
pub fn merge_relations(relations: Vec<HasOpts>) -> Vec<HasOpts> {
    let mut out: Vec<HasOpts> = Vec::with_capacity(relations.len());
    for relation in relations {
        match out
            .iter_mut()
            .find(|x| x.same_target(&relation) && x.field == relation.field)
        {
            Some(existing) => {
                for key in relation.other_keys {
                    existing.add_other_key(key);
                }
            }
            None => out.push(relation),
        }
    }
    out
}
