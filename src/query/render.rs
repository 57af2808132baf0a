use {
    super::{Condition, Dialect, Field, Operand, Operator, Options},
    crate::{
        error::RuntimeError,
        types::{IdentifierEscape, Value},
    },
    std::fmt::Write,
};

fn quote_path(path: &str) -> String {
    path.split('.')
        .map(|part| match part {
            "*" => "*".to_owned(),
            part => IdentifierEscape(part).to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Quotes a field expression. `col as alias` and `col AS alias` both render as
/// `` `col` as `alias` ``; dotted names are quoted per segment.
pub fn quote_field(field: &str) -> String {
    let tokens = field.split_whitespace().collect::<Vec<_>>();
    match tokens.as_slice() {
        [column, keyword, alias] if keyword.eq_ignore_ascii_case("as") => {
            format!("{} as {}", quote_path(column), IdentifierEscape(alias))
        }
        _ => quote_path(field.trim()),
    }
}

fn render_field(field: &Field) -> String {
    match field {
        Field::Name(name) => quote_field(name),
        Field::Raw(expr) => expr.clone(),
    }
}

fn field_name(field: &Field) -> &str {
    match field {
        Field::Name(name) | Field::Raw(name) => name.trim(),
    }
}

fn table_ref(options: &Options) -> String {
    match &options.database {
        Some(database) => format!(
            "{}.{}",
            IdentifierEscape(database),
            IdentifierEscape(&options.table)
        ),
        None => IdentifierEscape(&options.table).to_string(),
    }
}

fn write_comparison(dialect: Dialect, node: &Condition, sql: &mut String, args: &mut Vec<Value>) {
    let field = quote_path(&node.field);
    let operator = node.operator.unwrap_or(Operator::Eq);
    let values = match &node.operand {
        Operand::None => vec![Value::Null],
        Operand::Value(value) => vec![value.clone()],
        Operand::List(values) => values.clone(),
    };
    match operator {
        Operator::In | Operator::NotIn => {
            if values.is_empty() {
                // `x in ()` is not valid SQL
                sql.push_str(if operator == Operator::In {
                    "1 = 0"
                } else {
                    "1 = 1"
                });
                return;
            }
            let placeholders = vec!["?"; values.len()].join(",");
            let _ = write!(sql, "{field} {operator} ({placeholders})");
            args.extend(values);
        }
        Operator::Between => {
            let mut values = values.into_iter();
            let _ = write!(sql, "{field} between ? and ?");
            args.push(values.next().unwrap_or(Value::Null));
            args.push(values.next().unwrap_or(Value::Null));
        }
        Operator::FindInSet => {
            match dialect {
                Dialect::MySql => {
                    let _ = write!(sql, "find_in_set(?, {field})");
                }
                Dialect::Sqlite => {
                    let _ = write!(sql, "instr(',' || {field} || ',', ',' || ? || ',') > 0");
                }
            }
            args.extend(values.into_iter().take(1));
        }
        operator => {
            let _ = write!(sql, "{field} {operator} ?");
            args.extend(values.into_iter().take(1));
        }
    }
}

fn write_where(dialect: Dialect, nodes: &[Condition], sql: &mut String, args: &mut Vec<Value>) {
    let mut first = true;
    for node in nodes.iter().filter(|x| !x.is_empty()) {
        if !first {
            sql.push(' ');
            sql.push_str(node.logic.as_str());
            sql.push(' ');
        }
        first = false;

        if node.is_group() {
            sql.push('(');
            write_where(dialect, &node.group, sql, args);
            sql.push(')');
        } else {
            write_comparison(dialect, node, sql, args);
        }
    }
}

/// Renders WHERE nodes without the `where` keyword. The first node's connector is dropped.
pub fn render_where(dialect: Dialect, nodes: &[Condition]) -> (String, Vec<Value>) {
    let mut sql = String::new();
    let mut args = Vec::new();
    write_where(dialect, nodes, &mut sql, &mut args);
    (sql, args)
}

fn append_where(options: &Options, sql: &mut String, args: &mut Vec<Value>) {
    if options.condition_count() != 0 {
        sql.push_str(" where ");
        write_where(options.dialect, &options.wheres, sql, args);
    }
}

pub fn render_select(options: &Options) -> (String, Vec<Value>) {
    let fields = if options.fields.is_empty() {
        "*".to_owned()
    } else {
        options
            .fields
            .iter()
            .map(render_field)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut sql = format!("select {fields} from {}", table_ref(options));
    let mut args = Vec::new();
    append_where(options, &mut sql, &mut args);
    if let Some(group_by) = &options.group_by {
        let _ = write!(sql, " group by {}", quote_path(group_by));
    }
    if let Some((field, order)) = &options.order_by {
        let _ = write!(sql, " order by {} {}", quote_path(field), order.as_str());
    }
    if options.limit != 0 {
        sql.push_str(" limit ? offset ?");
        args.push(Value::ULong(options.limit));
        args.push(Value::ULong(options.offset));
    }
    (sql, args)
}

fn column_list(options: &Options) -> String {
    options
        .fields
        .iter()
        .map(|x| quote_path(field_name(x)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(count: usize) -> String {
    format!("({})", vec!["?"; count].join(", "))
}

pub fn render_insert(options: &Options) -> Result<(String, Vec<Value>), RuntimeError> {
    if options.fields.is_empty() {
        return Err(RuntimeError::EmptyInsertFields);
    }
    Ok((
        format!(
            "insert into {} ({}) values {}",
            table_ref(options),
            column_list(options),
            placeholders(options.fields.len())
        ),
        options.values.clone(),
    ))
}

/// Multi-row positional insert. Every row must have one value per field.
pub fn render_insert_many(
    options: &Options,
    rows: &[Vec<Value>],
) -> Result<(String, Vec<Value>), RuntimeError> {
    if options.fields.is_empty() {
        return Err(RuntimeError::EmptyInsertFields);
    }
    if rows.is_empty() {
        return Err(RuntimeError::EmptyRecord);
    }
    let row = placeholders(options.fields.len());
    let mut args = Vec::with_capacity(rows.len() * options.fields.len());
    for values in rows {
        let mut values = values.iter().cloned();
        for _ in 0..options.fields.len() {
            args.push(values.next().unwrap_or(Value::Null));
        }
    }
    Ok((
        format!(
            "insert into {} ({}) values {}",
            table_ref(options),
            column_list(options),
            vec![row; rows.len()].join(", ")
        ),
        args,
    ))
}

/// Insert with `:column` placeholders, for drivers binding parameters by name.
pub fn render_insert_named(options: &Options) -> Result<String, RuntimeError> {
    if options.fields.is_empty() {
        return Err(RuntimeError::EmptyInsertFields);
    }
    let names = options
        .fields
        .iter()
        .map(|x| format!(":{}", field_name(x)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "insert into {} ({}) values ({names})",
        table_ref(options),
        column_list(options),
    ))
}

pub fn render_update(options: &Options) -> Result<(String, Vec<Value>), RuntimeError> {
    if options.fields.is_empty() {
        return Err(RuntimeError::EmptyRecord);
    }
    let set = options
        .fields
        .iter()
        .map(|x| format!("{} = ?", quote_path(field_name(x))))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("update {} set {set}", table_ref(options));
    let mut args = options.values.clone();
    append_where(options, &mut sql, &mut args);
    Ok((sql, args))
}

pub fn render_delete(options: &Options) -> (String, Vec<Value>) {
    let mut sql = format!("delete from {}", table_ref(options));
    let mut args = Vec::new();
    append_where(options, &mut sql, &mut args);
    (sql, args)
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{
            query::{
                database, dialect, field, field_raw, group_by, limit, offset, order_by_desc,
                pagination, table, value, where_between, where_eq, where_find_in_set, where_group,
                where_in, where_not_in, where_or_eq, where_or_group, where_or_like, Opt, Options,
            },
            types::Value,
        },
    };

    #[test]
    fn grouping_and_connectors() {
        let options = Options::build([
            table("t"),
            where_eq("c", 3),
            where_group([where_eq("a", 1), where_or_eq("b", 2)]),
        ]);
        let (sql, args) = render_where(options.dialect, &options.wheres);
        assert_eq!(sql, "`c` = ? and (`a` = ? or `b` = ?)");
        assert_eq!(args, vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn first_connector_is_dropped_at_every_level() {
        let options = Options::build([
            where_or_eq("a", 1),
            where_or_group([where_or_eq("b", 2), where_group([where_or_like("c", "%x%")])]),
        ]);
        let (sql, _) = render_where(Dialect::MySql, &options.wheres);
        assert_eq!(sql, "`a` = ? or (`b` = ? and (`c` like ?))");
    }

    #[test]
    fn empty_groups_render_nothing() {
        let options = Options::build([table("t"), where_group([limit(1)]), where_eq("a", 1)]);
        assert_eq!(render_select(&options).0, "select * from `t` where `a` = ?");
        let options = Options::build([table("t"), where_group(Vec::<Opt>::new())]);
        assert_eq!(render_select(&options).0, "select * from `t`");
    }

    #[test]
    fn field_quoting() {
        assert_eq!(quote_field("name as n"), "`name` as `n`");
        assert_eq!(quote_field("name AS n"), "`name` as `n`");
        assert_eq!(quote_field("id"), "`id`");
        assert_eq!(quote_field("u.id"), "`u`.`id`");
        assert_eq!(quote_field("*"), "*");
    }

    #[test]
    fn select() {
        let options = Options::build([
            table("user"),
            database("app"),
            field(["id", "name as n"]),
            field_raw("count(*) as count"),
            where_in("id", [1, 2]),
            where_between("age", 18, 30),
            group_by("name"),
            order_by_desc("id"),
            pagination(2, 10),
        ]);
        let (sql, args) = render_select(&options);
        assert_eq!(
            sql,
            "select `id`, `name` as `n`, count(*) as count from `app`.`user` \
             where `id` in (?,?) and `age` between ? and ? \
             group by `name` order by `id` DESC limit ? offset ?"
        );
        assert_eq!(
            args,
            vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(18),
                Value::Int(30),
                Value::ULong(10),
                Value::ULong(10)
            ]
        );
        assert_eq!(render_select(&options), render_select(&options.clone()));
    }

    #[test]
    fn offset_without_limit_is_ignored() {
        let (sql, args) = render_select(&Options::build([table("t"), offset(5)]));
        assert_eq!(sql, "select * from `t`");
        assert!(args.is_empty());
    }

    #[test]
    fn in_lists() {
        let options = Options::build([
            table("t"),
            where_in("a", Vec::<i32>::new()),
            where_not_in("b", Vec::<i32>::new()),
        ]);
        assert_eq!(
            render_select(&options).0,
            "select * from `t` where 1 = 0 and 1 = 1"
        );
    }

    #[test]
    fn find_in_set_per_dialect() {
        let options = Options::build([table("t"), where_find_in_set("roles", 3)]);
        assert_eq!(
            render_select(&options).0,
            "select * from `t` where find_in_set(?, `roles`)"
        );
        let options = Options::build([
            dialect(Dialect::Sqlite),
            table("t"),
            where_find_in_set("roles", 3),
        ]);
        assert_eq!(
            render_select(&options).0,
            "select * from `t` where instr(',' || `roles` || ',', ',' || ? || ',') > 0"
        );
    }

    #[test]
    fn insert() {
        let options = Options::build([table("t"), field(["a", "b"]), value([1, 2])]);
        let (sql, args) = render_insert(&options).unwrap();
        assert_eq!(sql, "insert into `t` (`a`, `b`) values (?, ?)");
        assert_eq!(args, vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(
            render_insert_named(&options).unwrap(),
            "insert into `t` (`a`, `b`) values (:a, :b)"
        );
        assert_eq!(
            render_insert(&Options::build([table("t")])),
            Err(RuntimeError::EmptyInsertFields)
        );
    }

    #[test]
    fn insert_many() {
        let options = Options::build([table("t"), field(["a", "b"])]);
        let (sql, args) = render_insert_many(
            &options,
            &[vec![Value::Int(1), Value::Int(2)], vec![Value::Int(3)]],
        )
        .unwrap();
        assert_eq!(sql, "insert into `t` (`a`, `b`) values (?, ?), (?, ?)");
        assert_eq!(
            args,
            vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Null]
        );
    }

    #[test]
    fn update_and_delete() {
        let options = Options::build([
            table("t"),
            field(["a", "b"]),
            value(["x", "y"]),
            where_eq("id", 9),
        ]);
        let (sql, args) = render_update(&options).unwrap();
        assert_eq!(sql, "update `t` set `a` = ?, `b` = ? where `id` = ?");
        assert_eq!(
            args,
            vec![Value::from("x"), Value::from("y"), Value::Int(9)]
        );
        let (sql, args) = render_delete(&options);
        assert_eq!(sql, "delete from `t` where `id` = ?");
        assert_eq!(args, vec![Value::Int(9)]);
    }
}
