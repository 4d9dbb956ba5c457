//! End-to-end tests against a real PostgreSQL server
//!
//! Requires Docker. Run with:
//!
//! ```bash
//! cargo test -p rawload --test postgres_e2e_tests -- --ignored
//! ```

use anyhow::{Context, Result};
use rawload::config::DatabaseConfig;
use rawload::connection::PgConnector;
use rawload::report::NoopReporter;
use rawload::{BatchOrchestrator, LoaderConfig, MappingRegistry};
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection, PgConnection};
use std::path::Path;
use tempfile::TempDir;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

const FIXTURES: &[&str] = &[
    "title.basics.tsv",
    "title.ratings.tsv",
    "title.akas.tsv",
    "title.principals.tsv",
    "name.basics.tsv",
];

fn fixture_dir() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// PostgreSQL container with the staging schema applied
struct TestDatabase {
    _container: ContainerAsync<Postgres>,
    config: DatabaseConfig,
}

impl TestDatabase {
    async fn start() -> Result<Self> {
        // HEADER true for text format needs PostgreSQL 15+
        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container.get_host().await.context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let config = DatabaseConfig {
            host: host.to_string(),
            port,
            database: "postgres".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            ..Default::default()
        };

        let db = Self {
            _container: container,
            config,
        };
        let schema = std::fs::read_to_string(fixture_dir().join("schema.sql"))?;
        let mut conn = db.connect().await?;
        sqlx::raw_sql(&schema)
            .execute(&mut conn)
            .await
            .context("Failed to apply schema")?;
        conn.close().await?;

        Ok(db)
    }

    async fn connect(&self) -> Result<PgConnection> {
        let conn = PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .database(&self.config.database)
            .username(&self.config.user)
            .password(&self.config.password)
            .connect()
            .await
            .context("Failed to connect to PostgreSQL")?;
        Ok(conn)
    }

    async fn count(&self, table: &str) -> Result<i64> {
        let mut conn = self.connect().await?;
        let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&mut conn)
            .await?;
        conn.close().await?;
        Ok(count)
    }

    fn loader_config(&self, source_root: &Path) -> LoaderConfig {
        let mut config = LoaderConfig::new(source_root, MappingRegistry::imdb().unwrap());
        config.database = self.config.clone();
        config
    }
}

fn staged_fixtures() -> TempDir {
    let dir = TempDir::new().unwrap();
    for file in FIXTURES {
        std::fs::copy(fixture_dir().join(file), dir.path().join(file)).unwrap();
    }
    dir
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_client_copy_loads_every_table() {
    let db = TestDatabase::start().await.unwrap();
    let dir = staged_fixtures();
    let config = db.loader_config(dir.path());
    let connector = PgConnector::new(&config.database);

    let summary = BatchOrchestrator::new(config, connector, NoopReporter).run().await.unwrap();

    assert!(summary.is_success(), "{:?}", summary.outcomes);
    let rows: Vec<u64> = summary.outcomes.iter().map(|o| o.rows_loaded).collect();
    assert_eq!(rows, vec![4, 3, 3, 3, 2]);
    assert_eq!(db.count("raw.title_basics").await.unwrap(), 4);

    // `\N` became NULL and the header was not loaded
    let mut conn = db.connect().await.unwrap();
    let nulls: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM raw.title_basics WHERE end_year IS NULL")
        .fetch_one(&mut conn)
        .await
        .unwrap();
    assert_eq!(nulls, 4);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_reload_replaces_rows() {
    let db = TestDatabase::start().await.unwrap();
    let dir = staged_fixtures();

    for _ in 0..2 {
        let config = db.loader_config(dir.path());
        let connector = PgConnector::new(&config.database);
        let summary = BatchOrchestrator::new(config, connector, NoopReporter).run().await.unwrap();
        assert!(summary.is_success());
    }

    assert_eq!(db.count("raw.title_ratings").await.unwrap(), 3);
    assert_eq!(db.count("raw.name_basics").await.unwrap(), 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_malformed_file_leaves_table_empty() {
    let db = TestDatabase::start().await.unwrap();
    let dir = staged_fixtures();

    // First load populates every table
    let config = db.loader_config(dir.path());
    let connector = PgConnector::new(&config.database);
    BatchOrchestrator::new(config, connector, NoopReporter).run().await.unwrap();
    assert_eq!(db.count("raw.title_ratings").await.unwrap(), 3);

    let path = dir.path().join("title.ratings.tsv");
    let mut contents = std::fs::read_to_string(&path).unwrap();
    contents.push_str("tt0000009\t5.0\t12\textra\n");
    std::fs::write(&path, contents).unwrap();

    let config = db.loader_config(dir.path());
    let connector = PgConnector::new(&config.database);
    let summary = BatchOrchestrator::new(config, connector, NoopReporter).run().await.unwrap();

    assert_eq!(summary.succeeded_count, 4);
    let ratings = &summary.outcomes[1];
    assert!(!ratings.succeeded);
    assert!(ratings.error.as_deref().unwrap().contains("extra data after last expected column"));
    assert_eq!(db.count("raw.title_ratings").await.unwrap(), 0);
}
