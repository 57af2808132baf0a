//! Composable statement options and their SQL rendering.
//!
//! ```
//! use relmap::query::{render_select, where_eq, where_group, where_or_eq, Options};
//!
//! let options = Options::build([
//!     relmap::query::table("user"),
//!     where_eq("c", 3),
//!     where_group([where_eq("a", 1), where_or_eq("b", 2)]),
//! ]);
//! let (sql, args) = render_select(&options);
//! assert_eq!(sql, "select * from `user` where `c` = ? and (`a` = ? or `b` = ?)");
//! assert_eq!(args.len(), 3);
//! ```

mod condition;
mod render;

use crate::types::Value;

pub use {
    condition::*,
    render::{
        quote_field, render_delete, render_insert, render_insert_many, render_insert_named,
        render_select, render_update, render_where,
    },
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dialect {
    #[default]
    MySql,
    Sqlite,
}

impl Dialect {
    /// Maps a driver identifier such as `mysql` or `sqlite3` to its dialect.
    pub fn from_driver(driver: &str) -> Self {
        match driver.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Self::Sqlite,
            _ => Self::MySql,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One field entry: either an identifier to quote or a raw expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Name(String),
    Raw(String),
}

/// Accumulated statement intent. Built by folding [`Opt`]s over [`Options::default`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub dialect: Dialect,
    pub table: String,
    pub database: Option<String>,
    pub fields: Vec<Field>,
    pub wheres: Vec<Condition>,
    pub order_by: Option<(String, Order)>,
    pub group_by: Option<String>,
    pub limit: u64,
    pub offset: u64,
    pub values: Vec<Value>,
}

impl Options {
    pub fn build(options: impl IntoIterator<Item = Opt>) -> Self {
        let mut this = Self::default();
        this.extend(options);
        this
    }

    pub fn apply(&mut self, option: Opt) {
        match option {
            Opt::Dialect(dialect) => self.dialect = dialect,
            Opt::Table(table) => self.table = table,
            Opt::Database(database) => self.database = Some(database),
            Opt::Fields(fields) => self.fields.extend(fields),
            Opt::Values(values) => self.values.extend(values),
            Opt::Where(condition) => self.wheres.push(condition),
            Opt::OrderBy(field, order) => self.order_by = Some((field, order)),
            Opt::GroupBy(field) => self.group_by = Some(field),
            Opt::Limit(limit) => self.limit = limit,
            Opt::Offset(offset) => self.offset = offset,
            Opt::Batch(options) => self.extend(options),
        }
    }

    pub fn extend(&mut self, options: impl IntoIterator<Item = Opt>) {
        for option in options {
            self.apply(option);
        }
    }

    /// Number of WHERE nodes that render something.
    pub fn condition_count(&self) -> usize {
        self.wheres.iter().filter(|x| !x.is_empty()).count()
    }
}

/// A single statement-building step.
#[derive(Debug, Clone, PartialEq)]
pub enum Opt {
    Dialect(Dialect),
    Table(String),
    Database(String),
    Fields(Vec<Field>),
    Values(Vec<Value>),
    Where(Condition),
    OrderBy(String, Order),
    GroupBy(String),
    Limit(u64),
    Offset(u64),
    /// Several options applied in order.
    Batch(Vec<Opt>),
}

impl Opt {
    pub(crate) fn collect_conditions(self, out: &mut Vec<Condition>) {
        match self {
            Self::Where(condition) => out.push(condition),
            Self::Batch(options) => {
                for option in options {
                    option.collect_conditions(out);
                }
            }
            _ => (),
        }
    }
}

pub fn dialect(dialect: Dialect) -> Opt {
    Opt::Dialect(dialect)
}

pub fn table(name: impl Into<String>) -> Opt {
    Opt::Table(name.into())
}

pub fn database(name: impl Into<String>) -> Opt {
    Opt::Database(name.into())
}

/// Appends quoted identifiers. `"col as alias"` renders as `` `col` as `alias` ``.
pub fn field<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Opt {
    Opt::Fields(names.into_iter().map(|x| Field::Name(x.into())).collect())
}

/// Appends an expression verbatim.
pub fn field_raw(expr: impl Into<String>) -> Opt {
    Opt::Fields(vec![Field::Raw(expr.into())])
}

pub fn aggregate_count(name: &str) -> Opt {
    field_raw(format!("count({name}) as count"))
}

pub fn aggregate_sum(name: &str) -> Opt {
    field_raw(format!("sum({name}) as aggregate"))
}

pub fn aggregate_max(name: &str) -> Opt {
    field_raw(format!("max({name}) as aggregate"))
}

/// Appends positional values, matched to the field list by position.
pub fn value<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Opt {
    Opt::Values(values.into_iter().map(Into::into).collect())
}

pub fn order_by(field: impl Into<String>, order: Order) -> Opt {
    Opt::OrderBy(field.into(), order)
}

pub fn order_by_asc(field: impl Into<String>) -> Opt {
    order_by(field, Order::Asc)
}

pub fn order_by_desc(field: impl Into<String>) -> Opt {
    order_by(field, Order::Desc)
}

pub fn group_by(field: impl Into<String>) -> Opt {
    Opt::GroupBy(field.into())
}

pub fn limit(limit: u64) -> Opt {
    Opt::Limit(limit)
}

pub fn offset(offset: u64) -> Opt {
    Opt::Offset(offset)
}

/// `page` starts at 1; page 0 is treated as the first page.
pub fn pagination(page: u64, size: u64) -> Opt {
    Opt::Batch(vec![
        limit(size),
        offset(page.saturating_sub(1).saturating_mul(size)),
    ])
}

pub fn batch(options: impl IntoIterator<Item = Opt>) -> Opt {
    Opt::Batch(options.into_iter().collect())
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::types::Value,
    };

    #[test]
    fn fold_is_associative() {
        let a = [table("t"), where_eq("a", 1), limit(5)];
        let b = [order_by_desc("id"), field(["x"]), where_or_eq("b", 2)];

        let sequential = Options::build(a.clone().into_iter().chain(b.clone()));
        let grouped = Options::build([batch(a.clone()), batch(b.clone())]);
        let nested = Options::build([batch([batch(a), batch(b)])]);
        assert_eq!(sequential, grouped);
        assert_eq!(sequential, nested);
    }

    #[test]
    fn last_single_value_wins() {
        let options = Options::build([limit(1), limit(2), order_by_asc("a"), order_by_desc("b")]);
        assert_eq!(options.limit, 2);
        assert_eq!(options.order_by, Some(("b".to_owned(), Order::Desc)));
    }

    #[test]
    fn pagination_is_one_based() {
        let options = Options::build([pagination(3, 20)]);
        assert_eq!((options.limit, options.offset), (20, 40));
        let options = Options::build([pagination(0, 20)]);
        assert_eq!(options.offset, 0);
    }

    #[test]
    fn aggregates() {
        assert_eq!(
            Options::build([aggregate_count("*")]).fields,
            vec![Field::Raw("count(*) as count".into())]
        );
        assert_eq!(
            Options::build([aggregate_max("score")]).fields,
            vec![Field::Raw("max(score) as aggregate".into())]
        );
        assert_eq!(
            Options::build([value([1, 2]), value([3])]).values,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn dialect_from_driver() {
        assert_eq!(Dialect::from_driver("sqlite3"), Dialect::Sqlite);
        assert_eq!(Dialect::from_driver("mysql"), Dialect::MySql);
    }
}
