use {
    super::{BoxFuture, Database},
    crate::{
        error::{DatabaseError, Error, SchemaError},
        query::Dialect,
        schema::{ModelInfo, Schema},
    },
    crossbeam::sync::ShardedLock,
    serde::Deserialize,
    std::{
        any::TypeId,
        collections::HashMap,
        sync::{Arc, PoisonError},
    },
};

/// Settings of one named connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dsn: String,
    /// Read replica used for selects, counts and relation loading.
    pub read_dsn: Option<String>,
    pub driver: String,
    pub max_open_conn: u32,
    pub max_idle_conn: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dsn: String::new(),
            read_dsn: None,
            driver: String::from("mysql"),
            max_open_conn: 100,
            max_idle_conn: 20,
        }
    }
}

impl Config {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            ..Default::default()
        }
    }
}

/// Opens databases from a [`Config`]; implemented by driver integrations.
pub trait Connector: Send + Sync {
    fn connect<'a>(
        &'a self,
        dsn: &'a str,
        config: &'a Config,
    ) -> BoxFuture<'a, Result<Arc<dyn Database>, DatabaseError>>;
}

#[derive(Debug, Clone)]
pub struct Connection {
    name: String,
    writer: Arc<dyn Database>,
    reader: Option<Arc<dyn Database>>,
    dialect: Dialect,
}

impl Connection {
    pub fn new(name: impl Into<String>, writer: Arc<dyn Database>) -> Self {
        Self {
            name: name.into(),
            writer,
            reader: None,
            dialect: Dialect::default(),
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn Database>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn writer(&self) -> &dyn Database {
        self.writer.as_ref()
    }

    /// The read replica, or the writer if there is none.
    pub fn reader(&self) -> &dyn Database {
        self.reader.as_deref().unwrap_or(self.writer.as_ref())
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    connections: ShardedLock<HashMap<String, Connection>>,
    schemas: ShardedLock<HashMap<TypeId, Arc<ModelInfo>>>,
}

/// Named connections plus the per-type schema cache. Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens every configured connection. Connections opened before a failure stay registered.
    pub async fn init<N: Into<String>>(
        &self,
        connector: &dyn Connector,
        configs: impl IntoIterator<Item = (N, Config)>,
    ) -> Result<(), Error> {
        for (name, config) in configs {
            let name = name.into();
            let writer = connector.connect(&config.dsn, &config).await?;
            let mut connection = Connection::new(name.clone(), writer)
                .with_dialect(Dialect::from_driver(&config.driver));
            if let Some(read_dsn) = config.read_dsn.as_deref().filter(|x| !x.is_empty()) {
                connection = connection.with_reader(connector.connect(read_dsn, &config).await?);
            }
            tracing::info!(
                connection = %name,
                driver = %config.driver,
                replica = connection.reader.is_some(),
                "connection registered"
            );
            self.register_connection(connection);
        }
        Ok(())
    }

    pub fn register(&self, name: impl Into<String>, db: Arc<dyn Database>) {
        self.register_connection(Connection::new(name, db));
    }

    pub fn register_with_reader(
        &self,
        name: impl Into<String>,
        writer: Arc<dyn Database>,
        reader: Arc<dyn Database>,
    ) {
        self.register_connection(Connection::new(name, writer).with_reader(reader));
    }

    pub fn register_connection(&self, connection: Connection) {
        self.inner
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(connection.name.clone(), connection);
    }

    pub fn connection(&self, name: &str) -> Result<Connection, Error> {
        self.inner
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ConnectionNotFound(name.to_owned()))
    }

    /// Drops every connection handle.
    pub fn close(&self) {
        self.inner
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn model_info<T: Schema + 'static>(&self) -> Result<Arc<ModelInfo>, SchemaError> {
        let id = TypeId::of::<T>();
        if let Some(info) = self
            .inner
            .schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Ok(info.clone());
        }
        let info = Arc::new(ModelInfo::of::<T>()?);
        Ok(self
            .inner
            .schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id)
            .or_insert(info)
            .clone())
    }
}

#[cfg(test)]
mod test {
    use {
        super::{Config, Connector, Registry},
        crate::{
            database::{mock::MockDatabase, BoxFuture, Database},
            error::{DatabaseError, Error},
            query::Dialect,
            schema::{FieldDef, Schema},
        },
        std::sync::{Arc, Mutex},
    };

    #[derive(Default)]
    struct RecordingConnector {
        opened: Mutex<Vec<String>>,
    }

    impl Connector for RecordingConnector {
        fn connect<'a>(
            &'a self,
            dsn: &'a str,
            _config: &'a Config,
        ) -> BoxFuture<'a, Result<Arc<dyn Database>, DatabaseError>> {
            Box::pin(async move {
                if dsn.is_empty() {
                    return Err(DatabaseError::msg("empty dsn"));
                }
                self.opened.lock().unwrap().push(dsn.to_owned());
                Ok(Arc::new(MockDatabase::new()) as Arc<dyn Database>)
            })
        }
    }

    #[test]
    fn config_defaults() {
        let config: Config = serde_json::from_str(r#"{"dsn": "root@/app"}"#).unwrap();
        assert_eq!(config, Config::new("root@/app"));
        assert_eq!(config.driver, "mysql");
        assert_eq!((config.max_open_conn, config.max_idle_conn), (100, 20));
    }

    #[tokio::test]
    async fn init_and_lookup() {
        let registry = Registry::new();
        assert!(matches!(
            registry.connection("default"),
            Err(Error::ConnectionNotFound(name)) if name == "default"
        ));

        let connector = RecordingConnector::default();
        registry
            .init(
                &connector,
                [
                    ("default", Config::new("w")),
                    (
                        "lite",
                        Config {
                            read_dsn: Some("r".into()),
                            driver: "sqlite3".into(),
                            ..Config::new("w2")
                        },
                    ),
                ],
            )
            .await
            .unwrap();
        assert_eq!(*connector.opened.lock().unwrap(), ["w", "w2", "r"]);

        let lite = registry.connection("lite").unwrap();
        assert_eq!(lite.dialect(), Dialect::Sqlite);
        assert_eq!(registry.connection("default").unwrap().dialect(), Dialect::MySql);

        assert!(matches!(
            registry.init(&connector, [("bad", Config::default())]).await,
            Err(Error::Database(_))
        ));

        registry.close();
        assert!(registry.connection("lite").is_err());
    }

    struct Thing;

    impl Schema for Thing {
        fn fields() -> &'static [FieldDef] {
            const FIELDS: &[FieldDef] = &[FieldDef {
                db: Some("id,pk"),
                ..FieldDef::new("id")
            }];
            FIELDS
        }
    }

    #[test]
    fn schema_cache() {
        let registry = Registry::new();
        let a = registry.model_info::<Thing>().unwrap();
        let b = registry.clone().model_info::<Thing>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name, "Thing");
        assert_eq!(a.primary_key.as_deref(), Some("id"));
    }
}
