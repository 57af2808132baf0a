//! Batched has-one / has-many loading.
//!
//! Each relation costs one query: the local keys of all rows are collected,
//! the related table is read with `foreign_key in (...)`, and the results are
//! merged back by comparing the textual form of the keys.

use {
    crate::{
        database::Registry,
        error::{Error, RelationError},
        log::OpLog,
        query::{self, render_select, where_in, Options},
        schema::HasOpts,
        types::{Row, Value},
    },
    indexmap::IndexMap,
    std::collections::HashSet,
};

fn join_alias(opts: &HasOpts) -> String {
    format!("__{}", opts.local_key)
}

fn key_of(row: &Row, column: &str) -> Option<String> {
    row.get(column)
        .filter(|x| !x.is_null())
        .map(Value::to_key_string)
}

/// `Ok(None)` when there is nothing to load.
fn collect_keys(rows: &[Row], opts: &HasOpts) -> Result<Option<Vec<Value>>, RelationError> {
    if rows.is_empty() {
        return Ok(None);
    }
    if !rows.iter().any(|x| x.contains(&opts.local_key)) {
        return Err(RelationError::KeyMissing {
            table: opts.table.clone(),
            local_key: opts.local_key.clone(),
        });
    }
    let mut seen = HashSet::new();
    let keys = rows
        .iter()
        .filter_map(|row| row.get(&opts.local_key).filter(|x| !x.is_null()))
        .filter(|x| seen.insert(x.to_key_string()))
        .cloned()
        .collect::<Vec<_>>();
    Ok((!keys.is_empty()).then_some(keys))
}

async fn fetch(registry: &Registry, opts: &HasOpts, keys: Vec<Value>) -> Result<Vec<Row>, Error> {
    let connection = registry.connection(&opts.conn)?;
    let mut fields = opts
        .other_keys
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    fields.push(format!("{} as {}", opts.foreign_key, join_alias(opts)));

    let mut options = Options::build([
        query::dialect(connection.dialect()),
        query::table(&opts.table),
        query::field(fields),
        where_in(&opts.foreign_key, keys),
    ]);
    options.database = opts.database.clone();
    let (sql, args) = render_select(&options);

    let log = OpLog::start("relation", &opts.table, &sql, &args);
    let result = connection.reader().query(&sql, &args).await;
    log.finish(&result);
    result.map_err(|error| {
        RelationError::Fetch {
            table: opts.table.clone(),
            source: Box::new(error.into()),
        }
        .into()
    })
}

/// Copies the other keys of the first matching related row into each row.
/// Rows without a match get `NULL`.
pub(crate) async fn resolve_has_one(
    registry: &Registry,
    rows: &mut [Row],
    opts: &HasOpts,
) -> Result<(), Error> {
    let related = match collect_keys(rows, opts)? {
        Some(keys) => fetch(registry, opts, keys).await?,
        None => {
            tracing::debug!(table = %opts.table, "has-one: no keys to load");
            Vec::new()
        }
    };
    let alias = join_alias(opts);

    for row in rows.iter_mut() {
        let found = key_of(row, &opts.local_key).and_then(|key| {
            related
                .iter()
                .find(|x| key_of(x, &alias).as_deref() == Some(key.as_str()))
        });
        for other in &opts.other_keys {
            match found {
                Some(x) => {
                    let value = x.get(other.name()).cloned().unwrap_or(Value::Null);
                    row.insert(other.name(), value);
                }
                // unmatched rows keep what they already carry
                None if !row.contains(other.name()) => {
                    row.insert(other.name(), Value::Null);
                }
                None => (),
            }
        }
    }
    Ok(())
}

/// Collects the matching related rows, in the order they were read, into
/// `field` as a JSON list of objects. Without a `field`, every other key gets
/// its own list of values.
pub(crate) async fn resolve_has_many(
    registry: &Registry,
    rows: &mut [Row],
    opts: &HasOpts,
) -> Result<(), Error> {
    let related = match collect_keys(rows, opts)? {
        Some(keys) => fetch(registry, opts, keys).await?,
        None => {
            tracing::debug!(table = %opts.table, "has-many: no keys to load");
            Vec::new()
        }
    };
    let alias = join_alias(opts);

    let mut groups: IndexMap<String, Vec<Row>> = IndexMap::new();
    for mut row in related {
        let key = row.remove(&alias).filter(|x| !x.is_null());
        if let Some(key) = key {
            groups.entry(key.to_key_string()).or_default().push(row);
        }
    }

    for row in rows.iter_mut() {
        let group = key_of(row, &opts.local_key)
            .and_then(|key| groups.get(&key))
            .map(Vec::as_slice)
            .unwrap_or_default();
        match &opts.field {
            Some(field) => {
                let items = group.iter().map(Row::to_json).collect();
                row.insert(field.as_str(), Value::Json(serde_json::Value::Array(items)));
            }
            None => {
                for other in &opts.other_keys {
                    let items = group
                        .iter()
                        .map(|x| x.get(other.name()).map_or(serde_json::Value::Null, Value::to_json))
                        .collect();
                    row.insert(other.name(), Value::Json(serde_json::Value::Array(items)));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use {
        super::{resolve_has_many, resolve_has_one},
        crate::{
            database::{mock::MockDatabase, Registry},
            error::{Error, RelationError},
            row,
            schema::{HasOpts, OtherKey},
            types::{Row, Value},
        },
        serde_json::json,
        std::sync::Arc,
    };

    fn logs() -> Vec<Row> {
        vec![
            row!("msg" => "a", "__id" => 1),
            row!("msg" => "b", "__id" => 1u64),
            row!("msg" => "c", "__id" => "2"),
        ]
    }

    #[tokio::test]
    async fn has_many_groups_in_order() {
        let db = Arc::new(MockDatabase::with_rows(|_, _| logs()));
        let registry = Registry::new();
        registry.register("default", db.clone());

        let mut rows = vec![row!("id" => 1), row!("id" => 2), row!("id" => 3)];
        let opts = HasOpts::new("user_log")
            .foreign_key("uid")
            .other_key(OtherKey::column("msg"))
            .field("logs");
        resolve_has_many(&registry, &mut rows, &opts).await.unwrap();

        assert_eq!(
            db.queries(),
            [(
                "select `msg`, `uid` as `__id` from `user_log` where `uid` in (?,?,?)".to_owned(),
                vec![Value::Int(1), Value::Int(2), Value::Int(3)]
            )]
        );
        assert_eq!(
            rows[0].get("logs"),
            Some(&Value::Json(json!([{"msg": "a"}, {"msg": "b"}])))
        );
        assert_eq!(rows[1].get("logs"), Some(&Value::Json(json!([{"msg": "c"}]))));
        assert_eq!(rows[2].get("logs"), Some(&Value::Json(json!([]))));
    }

    #[tokio::test]
    async fn has_many_lists_per_key() {
        let registry = Registry::new();
        registry.register("default", Arc::new(MockDatabase::with_rows(|_, _| logs())));

        let mut rows = vec![row!("id" => 1), row!("id" => 1)];
        let opts = HasOpts::new("user_log")
            .foreign_key("uid")
            .other_key(OtherKey::aliased("msg", "messages"));
        resolve_has_many(&registry, &mut rows, &opts).await.unwrap();
        assert_eq!(rows[1].get("messages"), Some(&Value::Json(json!(["a", "b"]))));
    }

    #[tokio::test]
    async fn has_one_takes_first_match() {
        let db = Arc::new(MockDatabase::with_rows(|_, _| {
            vec![
                row!("score" => 10, "__uid" => 2),
                row!("score" => 20, "__uid" => 2),
            ]
        }));
        let registry = Registry::new();
        registry.register("stats", db.clone());

        let mut rows = vec![row!("uid" => 2, "name" => "x"), row!("uid" => 5, "name" => "y")];
        let opts: HasOpts = "stats.game.user_score:uid->user_id,score".parse().unwrap();
        resolve_has_one(&registry, &mut rows, &opts).await.unwrap();

        assert_eq!(
            db.queries()[0].0,
            "select `score`, `user_id` as `__uid` from `game`.`user_score` where `user_id` in (?,?)"
        );
        assert_eq!(rows[0], row!("uid" => 2, "name" => "x", "score" => 10));
        assert_eq!(rows[1].get("score"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn has_one_keeps_unmatched_columns() {
        let registry = Registry::new();
        registry.register(
            "default",
            Arc::new(MockDatabase::with_rows(|_, _| vec![row!("score" => 10, "__id" => 1)])),
        );

        let mut rows = vec![row!("id" => 1, "score" => 3), row!("id" => 2, "score" => 9)];
        let opts: HasOpts = "user_score:uid,score".parse().unwrap();
        resolve_has_one(&registry, &mut rows, &opts).await.unwrap();
        assert_eq!(rows[0].get("score"), Some(&Value::Int(10)));
        assert_eq!(rows[1].get("score"), Some(&Value::Int(9)));
    }

    #[tokio::test]
    async fn nothing_to_load() {
        let db = Arc::new(MockDatabase::new());
        let registry = Registry::new();
        registry.register("default", db.clone());
        let opts = HasOpts::new("log").other_key(OtherKey::column("msg"));

        resolve_has_one(&registry, &mut [], &opts).await.unwrap();
        let mut rows = vec![row!("id" => Value::Null)];
        resolve_has_many(&registry, &mut rows, &opts).await.unwrap();
        assert_eq!(rows[0].get("msg"), Some(&Value::Json(json!([]))));
        assert_eq!(db.call_count(), 0);

        let mut rows = vec![row!("name" => "x")];
        assert!(matches!(
            resolve_has_one(&registry, &mut rows, &opts).await,
            Err(Error::Relation(RelationError::KeyMissing { local_key, .. })) if local_key == "id"
        ));
    }

    #[tokio::test]
    async fn fetch_errors() {
        let registry = Registry::new();
        let mut rows = vec![row!("id" => 1)];
        let opts = HasOpts::new("log").other_key(OtherKey::column("msg"));
        assert!(matches!(
            resolve_has_one(&registry, &mut rows, &opts).await,
            Err(Error::ConnectionNotFound(_))
        ));

        registry.register("default", Arc::new(MockDatabase::failing()));
        assert!(matches!(
            resolve_has_many(&registry, &mut rows, &opts).await,
            Err(Error::Relation(RelationError::Fetch { table, .. })) if table == "log"
        ));
    }
}
