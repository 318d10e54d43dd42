mod init;

#[cfg(test)]
mod tests {
    use super::init::init;
    use std::sync::Mutex;
    use tessera_core::{Database, ErrorExt, Executor};
    use tessera_postgres::{PostgresConnection, PostgresDriver};
    use tessera_tests::{config, execute_tests, init_logs, setup, silent_logs};

    static MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn postgres() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();

        let (url, container) = init().await;
        execute_tests(PostgresDriver::new(), &url).await;
        drop(container);
    }

    #[tokio::test]
    async fn missing_schema() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();

        let (url, container) = init().await;
        setup(&PostgresDriver::new(), &url).await;
        silent_logs! {
            let error = Database::connect(
                PostgresDriver::new(),
                config(&url).with_schema("nowhere"),
            )
            .await
            .err()
            .expect("The schema does not exist");
            assert!(error.is_schema_not_found());
        }
        let database = Database::connect(PostgresDriver::new(), config(&url).with_schema("public"))
            .await
            .expect("Could not connect to the public schema");
        assert_eq!(database.schema(), "public");
        assert!(database.model("Account").is_some());
        database.close();
        drop(container);
    }

    #[tokio::test]
    async fn ssl_modes() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();

        let (url, container) = init().await;
        let separator = if url.contains('?') { '&' } else { '?' };
        let mut connection = PostgresConnection::connect(
            &format!("{url}{separator}sslmode=prefer&sslrootcert=/nowhere/root.crt"),
            0,
        )
        .await
        .expect("Prefer falls back to plain text");
        connection
            .batch("SELECT 1")
            .await
            .expect("Could not run a statement");
        if container.is_some() {
            // The container serves plain text only
            silent_logs! {
                assert!(
                    PostgresConnection::connect(&format!("{url}{separator}sslmode=require"), 0)
                        .await
                        .is_err()
                );
            }
        }
        drop(container);
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(PostgresConnection::connect("mysql://some_url", 0).await.is_err());
        }
    }
}
