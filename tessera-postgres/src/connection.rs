use crate::{
    PostgresDriver, ValueHolder,
    util::{map_postgres_error, postgres_rows_to_labeled},
};
use openssl::ssl::{SslConnector, SslFiletype, SslMethod, SslVerifyMode};
use postgres_openssl::MakeTlsConnector;
use postgres_types::ToSql;
use std::{env, path::Path};
use tessera_core::{
    Connection, Driver, Error, ErrorContext, Executor, Query, Result, RowLabeled, RowsAffected,
    truncate_long,
};
use tokio::spawn;
use tokio_postgres::NoTls;
use url::Url;
use urlencoding::decode;

pub struct PostgresConnection {
    pub(crate) client: tokio_postgres::Client,
}

impl PostgresConnection {
    /// Connects to a `postgres://` (or `postgresql://`) url and applies the statement timeout
    /// in milliseconds, zero disables it.
    ///
    /// `sslmode`, `sslrootcert`, `sslcert` and `sslkey` are read from the url query, or else
    /// from the `PGSSLMODE`, `PGSSLROOTCERT`, `PGSSLCERT` and `PGSSLKEY` environment variables.
    pub async fn connect(url: &str, statement_timeout: u64) -> Result<PostgresConnection> {
        let context = || format!("While trying to connect to `{}`", url);
        let decoded = decode(url).with_context(context)?;
        if !["postgres://", "postgresql://"]
            .iter()
            .any(|v| decoded.starts_with(v))
        {
            let error = Error::msg(format!(
                "{} connection url must start with `postgres://`",
                PostgresDriver::NAME
            ))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let mut url = Url::parse(&decoded).with_context(context)?;
        let mut take_url_param = |key: &str, env_var: &str| {
            let mut value = None;
            let mut pairs: Vec<(String, String)> = url
                .query_pairs()
                .map(|(k, v)| (k.into(), v.into()))
                .collect();
            if let Some(pos) = pairs.iter().position(|(k, _)| k == key) {
                let (_, v) = pairs.remove(pos);
                value = Some(v);
            }
            url.query_pairs_mut()
                .clear()
                .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            value.or_else(|| env::var(env_var).ok())
        };
        let sslmode = take_url_param("sslmode", "PGSSLMODE").unwrap_or("disable".into());
        let client = if sslmode == "disable" {
            let (client, connection) = tokio_postgres::connect(url.as_str(), NoTls)
                .await
                .with_context(context)?;
            spawn(async move {
                if let Err(e) = connection.await
                    && !e.is_closed()
                {
                    log::error!("Postgres connection error: {:#}", e);
                }
            });
            client
        } else {
            let mut builder = SslConnector::builder(SslMethod::tls())?;
            if let Some(path) = take_url_param("sslrootcert", "PGSSLROOTCERT")
                .as_deref()
                .map(Path::new)
                && path.exists()
            {
                builder.set_ca_file(path)?;
            }
            if let Some(path) = take_url_param("sslcert", "PGSSLCERT")
                .as_deref()
                .map(Path::new)
                && path.exists()
            {
                builder.set_certificate_chain_file(path)?;
            }
            if let Some(path) = take_url_param("sslkey", "PGSSLKEY")
                .as_deref()
                .map(Path::new)
                && path.exists()
            {
                builder.set_private_key_file(path, SslFiletype::PEM)?;
            }
            builder.set_verify(match &*sslmode {
                "require" | "prefer" | "allow" => SslVerifyMode::NONE,
                _ => SslVerifyMode::PEER,
            });
            // Only `prefer` and `allow` may fall back to plain text.
            url.query_pairs_mut().append_pair(
                "sslmode",
                match &*sslmode {
                    "prefer" | "allow" => "prefer",
                    _ => "require",
                },
            );
            let connector = MakeTlsConnector::new(builder.build());
            let (client, connection) = tokio_postgres::connect(url.as_str(), connector)
                .await
                .with_context(context)?;
            spawn(async move {
                if let Err(e) = connection.await
                    && !e.is_closed()
                {
                    log::error!("Postgres connection error: {:#}", e);
                }
            });
            client
        };
        let mut connection = Self { client };
        connection
            .batch(&format!("SET statement_timeout TO {}", statement_timeout))
            .await?;
        Ok(connection)
    }
}

impl Executor for PostgresConnection {
    async fn fetch(&mut self, query: &Query) -> Result<Vec<RowLabeled>> {
        log::debug!("{}", query);
        let params = query
            .params
            .iter()
            .cloned()
            .map(ValueHolder)
            .collect::<Vec<_>>();
        let params = params
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect::<Vec<_>>();
        let rows = self
            .client
            .query(query.sql.as_str(), &params)
            .await
            .map_err(|e| map_postgres_error(e, &query.sql))?;
        postgres_rows_to_labeled(rows)
    }

    async fn execute(&mut self, query: &Query) -> Result<RowsAffected> {
        log::debug!("{}", query);
        let params = query
            .params
            .iter()
            .cloned()
            .map(ValueHolder)
            .collect::<Vec<_>>();
        let params = params
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect::<Vec<_>>();
        let rows_affected = self
            .client
            .execute(query.sql.as_str(), &params)
            .await
            .map_err(|e| map_postgres_error(e, &query.sql))?;
        Ok(RowsAffected { rows_affected })
    }

    async fn batch(&mut self, sql: &str) -> Result<()> {
        log::debug!("{}", truncate_long!(sql));
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| map_postgres_error(e, sql))
    }
}

impl Connection for PostgresConnection {
    fn is_closed(&self) -> bool {
        self.client.is_closed()
    }
}
