//! The [`Model`] façade: CRUD over one table with hooks, validators,
//! relations, soft delete and an optional read-through cache.

mod hook;
mod record;
mod relation;
mod validator;


use {
    crate::{
        cache::Cache,
        database::{self, Connection, Database, ExecResult, Registry},
        error::{Error, ParseError, RuntimeError},
        log::OpLog,
        query::{
            self, aggregate_count, render_insert, render_insert_many, render_select,
            render_update, Condition, Dialect, Logic, Operand, Operator, Opt, Options,
        },
        schema::{merge_relations, HasOpts, ModelInfo, DEFAULT_CONNECTION, DEFAULT_KEY},
        types::{Row, Value},
    },
    indexmap::{IndexMap, IndexSet},
    std::{fmt, marker::PhantomData, sync::Arc},
};

pub use {
    hook::{
        strip_json_comments, ArrayHook, ColumnHook, CommaIntHook, CommaStringHook, JsonHook,
        ObjectHook, TimestampHook,
    },
    record::{many_from_value, FromRow, IntoRow, Record},
    validator::{
        required, required_if, rule, unique, ModelRef, Required, RequiredIf, Rule, Unique,
        ValidationContext, Validator,
    },
};

/// Prepends `first` to the WHERE nodes, parenthesizing the existing ones
/// when there is more than one so their connectors stay scoped.
fn scope(options: &mut Options, first: Condition) {
    let mut rest = std::mem::take(&mut options.wheres)
        .into_iter()
        .filter(|x| !x.is_empty())
        .collect::<Vec<_>>();
    options.wheres.push(first);
    match rest.len() {
        0 => (),
        1 => {
            let mut node = rest.remove(0);
            node.logic = Logic::And;
            options.wheres.push(node);
        }
        _ => options.wheres.push(Condition::group(rest, Logic::And)),
    }
}

fn equals(field: &str, value: Value) -> Condition {
    Condition::new(field, Operator::Eq, Operand::Value(value), Logic::And)
}

/// CRUD access to one table.
///
/// `Model<Row>` works on plain rows and is configured with the builder
/// methods; `Model<R>` for a [`Record`] takes table, keys and relations from
/// the record's declaration.
pub struct Model<R = Row> {
    registry: Registry,
    connection: String,
    database: Option<String>,
    table: String,
    info: Arc<ModelInfo>,
    primary_key: Option<String>,
    soft_delete: Option<String>,
    hooks: IndexMap<String, Arc<dyn ColumnHook>>,
    validators: Vec<(String, Arc<dyn Validator>)>,
    has_one: Vec<HasOpts>,
    has_many: Vec<HasOpts>,
    cache: Option<Arc<dyn Cache>>,
    save_zero: bool,
    typed: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R> fmt::Debug for Model<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("connection", &self.connection)
            .field("database", &self.database)
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("soft_delete", &self.soft_delete)
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .field("has_one", &self.has_one)
            .field("has_many", &self.has_many)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl Model<Row> {
    /// Row model on the `default` connection with primary key `id`.
    pub fn new(registry: &Registry, table: impl Into<String>) -> Self {
        Self {
            registry: registry.clone(),
            connection: DEFAULT_CONNECTION.to_owned(),
            database: None,
            table: table.into(),
            info: Arc::default(),
            primary_key: Some(DEFAULT_KEY.to_owned()),
            soft_delete: None,
            hooks: IndexMap::new(),
            validators: Vec::new(),
            has_one: Vec::new(),
            has_many: Vec::new(),
            cache: None,
            save_zero: false,
            typed: false,
            _record: PhantomData,
        }
    }
}

impl<R: Record> Model<R> {
    pub fn of(registry: &Registry) -> Result<Self, Error> {
        let info = registry.model_info::<R>()?;
        Ok(Self {
            registry: registry.clone(),
            connection: R::CONNECTION.to_owned(),
            database: R::DATABASE.map(str::to_owned),
            table: R::TABLE.to_owned(),
            primary_key: info.primary_key.clone(),
            soft_delete: R::SOFT_DELETE.map(str::to_owned),
            hooks: IndexMap::new(),
            validators: Vec::new(),
            has_one: info.has_one.clone(),
            has_many: info.has_many.clone(),
            cache: None,
            save_zero: false,
            typed: true,
            info,
            _record: PhantomData,
        })
    }
}

impl<R> Model<R> {
    pub fn connection(mut self, name: impl Into<String>) -> Self {
        self.connection = name.into();
        self
    }

    pub fn database(mut self, name: impl Into<String>) -> Self {
        self.database = Some(name.into());
        self
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    /// Deletes set `column` to 1; selects and counts skip rows where it isn't 0.
    pub fn soft_delete(mut self, column: impl Into<String>) -> Self {
        self.soft_delete = Some(column.into());
        self
    }

    /// One hook per column; a later hook replaces an earlier one.
    pub fn hook(mut self, column: impl Into<String>, hook: impl ColumnHook + 'static) -> Self {
        self.hooks.insert(column.into(), Arc::new(hook));
        self
    }

    pub fn validate(mut self, field: impl Into<String>, validator: impl Validator + 'static) -> Self {
        self.validators.push((field.into(), Arc::new(validator)));
        self
    }

    pub fn has_one(mut self, opts: HasOpts) -> Self {
        self.has_one.push(opts);
        self.has_one = merge_relations(std::mem::take(&mut self.has_one));
        self
    }

    pub fn has_many(mut self, opts: HasOpts) -> Self {
        self.has_many.push(opts);
        self.has_many = merge_relations(std::mem::take(&mut self.has_many));
        self
    }

    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Write zero values on update. Only affects record models; row models always write them.
    pub fn save_zero(mut self, save_zero: bool) -> Self {
        self.save_zero = save_zero;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn conn(&self) -> Result<Connection, Error> {
        self.registry.connection(&self.connection)
    }

    fn primary(&self) -> Result<&str, Error> {
        self.primary_key
            .as_deref()
            .ok_or(Error::Runtime(RuntimeError::PrimaryKeyNotDefined))
    }

    fn cache_key(&self, id: &Value) -> String {
        format!("{}-{}-{}", self.connection, self.table, id.to_key_string())
    }

    /// Caller options bound to this model's table, with the soft-delete filter in front.
    fn options(
        &self,
        dialect: Dialect,
        options: impl IntoIterator<Item = Opt>,
        visible_only: bool,
    ) -> Result<Options, Error> {
        if self.table.is_empty() {
            return Err(RuntimeError::MissingTable.into());
        }
        let mut options = Options::build(options);
        options.dialect = dialect;
        options.table = self.table.clone();
        options.database = self.database.clone();
        if let (true, Some(column)) = (visible_only, &self.soft_delete) {
            scope(&mut options, equals(column, Value::Int(0)));
        }
        Ok(options)
    }

    fn is_insertable(&self, column: &str) -> bool {
        match self.typed {
            true => self.info.is_insertable(column),
            false => self.primary_key.as_deref() != Some(column),
        }
    }

    fn apply_input_hooks(&self, row: &mut Row) -> Result<(), Error> {
        if self.hooks.is_empty() {
            return Ok(());
        }
        let snapshot = row.clone();
        for (column, hook) in &self.hooks {
            if let Some(value) = row.get_mut(column) {
                *value = hook.input(&snapshot, value.take())?;
            }
        }
        Ok(())
    }

    fn apply_output_hooks(&self, rows: &mut [Row]) -> Result<(), Error> {
        if self.hooks.is_empty() {
            return Ok(());
        }
        for row in rows {
            let snapshot = row.clone();
            for (column, hook) in &self.hooks {
                if let Some(value) = row.get_mut(column) {
                    *value = hook.output(&snapshot, value.take())?;
                }
            }
        }
        Ok(())
    }

    async fn resolve_relations(&self, rows: &mut [Row]) -> Result<(), Error> {
        for opts in &self.has_one {
            relation::resolve_has_one(&self.registry, rows, opts).await?;
        }
        for opts in &self.has_many {
            relation::resolve_has_many(&self.registry, rows, opts).await?;
        }
        Ok(())
    }

    async fn query(
        &self,
        db: &dyn Database,
        op: &'static str,
        sql: &str,
        args: &[Value],
    ) -> Result<Vec<Row>, Error> {
        let log = OpLog::start(op, &self.table, sql, args);
        let result = db.query(sql, args).await;
        log.finish(&result);
        Ok(result?)
    }

    async fn exec(
        &self,
        db: &dyn Database,
        op: &'static str,
        sql: &str,
        args: &[Value],
    ) -> Result<ExecResult, Error> {
        let log = OpLog::start(op, &self.table, sql, args);
        let result = database::exec(db, sql, args).await;
        log.finish(&result);
        Ok(result?)
    }

    async fn select_rows(&self, options: impl IntoIterator<Item = Opt>) -> Result<Vec<Row>, Error> {
        let conn = self.conn()?;
        let options = self.options(conn.dialect(), options, true)?;
        let (sql, args) = render_select(&options);
        let mut rows = self.query(conn.reader(), "select", &sql, &args).await?;
        self.apply_output_hooks(&mut rows)?;
        self.resolve_relations(&mut rows).await?;
        Ok(rows)
    }

    async fn select_one_row(&self, options: impl IntoIterator<Item = Opt>) -> Result<Row, Error> {
        self.select_rows(options.into_iter().chain([query::limit(1)]))
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NotFound)
    }

    /// Number of visible rows matching the conditions in `options`.
    pub async fn count(&self, options: impl IntoIterator<Item = Opt>) -> Result<u64, Error> {
        let conn = self.conn()?;
        let mut options = self.options(conn.dialect(), options, true)?;
        options.fields.clear();
        options.order_by = None;
        options.limit = 0;
        options.offset = 0;
        options.apply(aggregate_count("*"));
        let (sql, args) = render_select(&options);
        let rows = self.query(conn.reader(), "count", &sql, &args).await?;
        match rows.first() {
            Some(row) => Ok(row.try_get::<u64>("count")?),
            None => Ok(0),
        }
    }

    /// Runs a statement on the write connection and returns its rows.
    pub async fn query_raw(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, Error> {
        let conn = self.conn()?;
        self.query(conn.writer(), "query_raw", sql, args).await
    }

    /// Runs a statement in its own transaction.
    pub async fn exec_raw(&self, sql: &str, args: &[Value]) -> Result<ExecResult, Error> {
        let conn = self.conn()?;
        self.exec(conn.writer(), "exec_raw", sql, args).await
    }

    /// Requires at least one condition. With soft delete the rows are only flagged.
    pub async fn delete(&self, options: impl IntoIterator<Item = Opt>) -> Result<bool, Error> {
        let mut options = self.options(Dialect::default(), options, false)?;
        if options.condition_count() == 0 {
            return Err(RuntimeError::EmptyDeleteCondition.into());
        }
        let conn = self.conn()?;
        options.dialect = conn.dialect();

        let result = match &self.soft_delete {
            Some(column) => {
                options.fields = vec![query::Field::Name(column.clone())];
                options.values = vec![Value::Int(1)];
                let (sql, args) = render_update(&options)?;
                self.exec(conn.writer(), "delete", &sql, &args).await?
            }
            None => {
                let (sql, args) = query::render_delete(&options);
                self.exec(conn.writer(), "delete", &sql, &args).await?
            }
        };
        Ok(result.rows_affected > 0)
    }
}

impl<R> Model<R>
where
    R: FromRow + IntoRow + Send + Sync + 'static,
{
    async fn validate_row(&self, row: &Row, primary: Option<&Value>) -> Result<(), Error> {
        for (field, validator) in &self.validators {
            let ctx = ValidationContext {
                field,
                row,
                primary,
                model: self,
            };
            validator.validate(&ctx).await?;
        }
        Ok(())
    }

    /// Record to insertable row: hooks applied, validators passed.
    async fn insert_row(&self, record: &R) -> Result<Row, Error> {
        let mut row = record.to_row()?;
        if row.is_empty() {
            return Err(RuntimeError::EmptyRecord.into());
        }
        row.retain(|column, _| self.is_insertable(column));
        self.apply_input_hooks(&mut row)?;
        self.validate_row(&row, None).await?;
        Ok(row)
    }

    pub async fn select(&self, options: impl IntoIterator<Item = Opt>) -> Result<Vec<R>, Error> {
        self.select_rows(options)
            .await?
            .into_iter()
            .map(|row| R::from_row(row).map_err(Error::from))
            .collect()
    }

    /// First match, or [`Error::NotFound`].
    pub async fn select_one(&self, options: impl IntoIterator<Item = Opt>) -> Result<R, Error> {
        Ok(R::from_row(self.select_one_row(options).await?)?)
    }

    /// Returns the id assigned by the database.
    pub async fn insert(&self, record: &R) -> Result<u64, Error> {
        let row = self.insert_row(record).await?;
        let conn = self.conn()?;
        let mut options = self.options(conn.dialect(), [], false)?;
        let (fields, values): (Vec<_>, Vec<_>) = row.into_iter().unzip();
        options.extend([query::field(fields), Opt::Values(values)]);
        let (sql, args) = render_insert(&options)?;
        Ok(self.exec(conn.writer(), "insert", &sql, &args).await?.last_insert_id)
    }

    /// One statement for all records. The column list is the union of every
    /// record's columns in first-seen order; missing cells are written as `NULL`.
    pub async fn insert_many(&self, records: &[R]) -> Result<ExecResult, Error> {
        if records.is_empty() {
            return Err(RuntimeError::EmptyRecord.into());
        }
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            rows.push(self.insert_row(record).await?);
        }
        let columns = rows
            .iter()
            .flat_map(Row::columns)
            .map(str::to_owned)
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let values = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|x| row.get(x).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect::<Vec<Vec<Value>>>();

        let conn = self.conn()?;
        let mut options = self.options(conn.dialect(), [], false)?;
        options.apply(query::field(columns));
        let (sql, args) = render_insert_many(&options, &values)?;
        self.exec(conn.writer(), "insert_many", &sql, &args).await
    }

    /// Updates the rows matched by the record's primary key and the conditions
    /// in `options`. Returns the number of affected rows.
    pub async fn update(
        &self,
        record: &R,
        options: impl IntoIterator<Item = Opt>,
    ) -> Result<u64, Error> {
        let mut row = record.to_row()?;
        if row.is_empty() {
            return Err(RuntimeError::EmptyRecord.into());
        }
        let mut options = self.options(Dialect::default(), options, false)?;
        let primary = self
            .primary_key
            .as_deref()
            .and_then(|pk| row.remove(pk))
            .filter(|x| !x.is_zero());
        if primary.is_none() && options.condition_count() == 0 {
            return Err(RuntimeError::MissingUpdateCondition.into());
        }
        if self.typed && !self.save_zero {
            row.retain(|_, value| !value.is_zero());
        }
        if row.is_empty() {
            return Err(RuntimeError::EmptyRecord.into());
        }

        self.apply_input_hooks(&mut row)?;
        self.validate_row(&row, primary.as_ref()).await?;

        if let (Some(pk), Some(primary)) = (self.primary_key.as_deref(), primary) {
            scope(&mut options, equals(pk, primary));
        }
        let conn = self.conn()?;
        options.dialect = conn.dialect();
        let (fields, values): (Vec<_>, Vec<_>) = row.into_iter().unzip();
        options.extend([query::field(fields), Opt::Values(values)]);
        let (sql, args) = render_update(&options)?;
        Ok(self.exec(conn.writer(), "update", &sql, &args).await?.rows_affected)
    }

    /// Select by primary key through the cache, if one is configured.
    /// Cache read failures fall back to the database.
    pub async fn find_by(&self, id: impl Into<Value>) -> Result<R, Error> {
        let pk = self.primary()?;
        let id = id.into();
        let key = self.cache_key(&id);

        if let Some(cache) = &self.cache {
            match cache.get(&key).await {
                Ok(Some(text)) if !text.is_empty() => {
                    let json = serde_json::from_str(&text).map_err(ParseError::from)?;
                    return Ok(R::from_row(Row::from_json(json)?)?);
                }
                Ok(_) => (),
                Err(error) => {
                    tracing::warn!(%key, %error, "cache read failed, using the database")
                }
            }
        }

        let row = self.select_one_row([query::where_eq(pk, id)]).await?;
        if let Some(cache) = &self.cache {
            cache.set(&key, row.to_json().to_string()).await?;
        }
        Ok(R::from_row(row)?)
    }

    /// Update by primary key; the cached entry for `id` is dropped afterwards.
    pub async fn update_by(&self, id: impl Into<Value>, record: &R) -> Result<u64, Error> {
        let pk = self.primary()?;
        let id = id.into();
        let key = self.cache_key(&id);
        let affected = self.update(record, [query::where_eq(pk, id)]).await?;
        if let Some(cache) = &self.cache {
            cache.delete(&key).await?;
        }
        Ok(affected)
    }
}

impl<R> ModelRef for Model<R>
where
    R: Send + Sync + 'static,
{
    fn table(&self) -> &str {
        &self.table
    }

    fn primary_key(&self) -> &str {
        self.primary_key.as_deref().unwrap_or(DEFAULT_KEY)
    }

    fn count(&self, options: Vec<Opt>) -> database::BoxFuture<'_, Result<u64, Error>> {
        Box::pin(Model::count(self, options))
    }
}
