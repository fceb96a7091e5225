use serde::Deserialize;
use snafu::{Location, ResultExt as _, Snafu};
use surrealdb::{
    engine::any::Any,
    opt::{auth, IntoQuery, QueryResult},
    Surreal,
};
use url::Url;

pub type Result<T, E = DatabaseError> = std::result::Result<T, E>;

const SETUP: &str = include_str!("../schema.surrealql");

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DatabaseError {
    #[snafu(display("failed to query the database at {location}: {source}"))]
    DatabaseQuery {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to deserialize the database response at {location}: {source}"))]
    DatabaseDeserialize {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("cannot connect to the database `{url}` at {location}: {source}"))]
    DatabaseConnection {
        url: Url,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("`{text}` is not a valid database url: {source}"))]
    InvalidUrl {
        text: String,
        source: url::ParseError,
    },
    #[snafu(display("failed to apply the database schema at {location}: {source}"))]
    Schema {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(rename = "surreal_url")]
    pub url: Url,
    #[serde(rename = "surreal_namespace")]
    pub namespace: String,
    #[serde(rename = "surreal_database")]
    pub database: String,
    #[serde(flatten)]
    pub credentials: Option<DatabaseCredentials>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseCredentials {
    #[serde(rename = "surreal_username")]
    pub username: String,
    #[serde(rename = "surreal_password")]
    pub password: String,
}

impl DatabaseConfig {
    fn auth(&self) -> Option<impl auth::Credentials<auth::Signin, auth::Jwt> + '_> {
        self.credentials.as_ref().map(|credentials| auth::Database {
            namespace: &self.namespace,
            database: &self.database,
            username: &credentials.username,
            password: &credentials.password,
        })
    }
}

/// Thin wrapper around a SurrealDB connection with the schema already applied.
///
/// Cloning is cheap, every clone shares the same underlying connection.
#[derive(Debug, Clone)]
pub struct Database {
    database: Surreal<Any>,
}

impl Database {
    /// Connects to the configured endpoint, signs in if credentials are present and applies `schema.surrealql`.
    ///
    /// Any endpoint supported by [surrealdb::engine::any] works, including `mem://` for a throwaway in-process store.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = &config.url;
        let database = surrealdb::engine::any::connect(url.as_str())
            .await
            .context(DatabaseConnectionSnafu { url: url.clone() })?;

        if let Some(credentials) = config.auth() {
            database
                .signin(credentials)
                .await
                .context(DatabaseConnectionSnafu { url: url.clone() })?;
        }

        database
            .use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await
            .context(DatabaseConnectionSnafu { url: url.clone() })?;

        let database = Database { database };
        database.setup().await?;

        tracing::info!(%url, namespace = %config.namespace, database = %config.database, "connected to the database");
        Ok(database)
    }

    /// An empty in-memory database, mostly useful for tests.
    pub async fn in_memory() -> Result<Self> {
        let config = DatabaseConfig {
            url: Url::parse("mem://").context(InvalidUrlSnafu { text: "mem://" })?,
            namespace: "tv".into(),
            database: "backend".into(),
            credentials: None,
        };

        Self::connect(&config).await
    }

    async fn setup(&self) -> Result<()> {
        self.database
            .query(SETUP)
            .await
            .context(SchemaSnafu)?
            .check()
            .context(SchemaSnafu)?;

        Ok(())
    }

    /// Create a builder to execute arbitrary SQL code on the database.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let position: Option<PlaybackTimestamp> = db
    ///     .sql("SELECT VALUE timestamp FROM type::thing('watch_positions', [$user, $content])")
    ///     .bind(("user", user_id))
    ///     .bind(("content", content_id))
    ///     .fetch_first()
    ///     .await?;
    /// ```
    ///
    /// `fetch_first` can deserialize the result into either a single value (`Option<T>`) or a collection of values (`Vec<T>`).
    pub fn sql(&self, query: impl IntoQuery) -> Query<'_> {
        let query = self.database.query(query);
        Query { query }
    }
}

impl std::ops::Deref for Database {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.database
    }
}

#[derive(Debug)]
pub struct Query<'a> {
    query: surrealdb::method::Query<'a, Any>,
}

impl Query<'_> {
    pub fn bind(mut self, params: impl serde::Serialize) -> Self {
        let query = self.query;
        self.query = query.bind(params);
        self
    }

    /// Execute the statements, failing if any of them produced an error.
    pub async fn execute(self) -> Result<surrealdb::Response> {
        let response = self
            .query
            .await
            .context(DatabaseQuerySnafu)?
            .check()
            .context(DatabaseQuerySnafu)?;

        tracing::trace!(?response, "executed query");
        Ok(response)
    }

    /// Execute the query and deserialize the result of the first statement.
    pub async fn fetch_first<T: serde::de::DeserializeOwned>(self) -> Result<T>
    where
        usize: QueryResult<T>,
    {
        let mut statements = self.execute().await?;
        let result = statements.take::<T>(0).context(DatabaseDeserializeSnafu)?;
        Ok(result)
    }
}
