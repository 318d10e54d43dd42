use indoc::indoc;
use tessera::{DatabaseConfig, ModelOptions};

/// Account schema shared by every suite, dropped and created again on each run.
///
/// Ids are deterministic: states `active`=1 `suspended`=2 `closed`=3, permissions
/// `view_tickets`=1 `edit_tickets`=2 `manage_accounts`=3, groups 1, 2 and 100, accounts
/// steve=1 tony=2 peter=3 wanda=4, agencies shield=1 sword=2 hydra=3.
pub const FIXTURE: &str = indoc! {r#"
    DROP VIEW IF EXISTS active_account;
    DROP TABLE IF EXISTS
        account_x_agency,
        agency,
        account_x_account_permission,
        account_event,
        account,
        account_permission,
        account_group,
        account_state
    CASCADE;

    CREATE OR REPLACE FUNCTION tessera_touch() RETURNS trigger AS $$
    BEGIN
        NEW.updated_at = now();
        NEW.version = OLD.version + 1;
        RETURN NEW;
    END;
    $$ LANGUAGE plpgsql;

    CREATE TABLE account_state (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE account_permission (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE account_group (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        version INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE account (
        id SERIAL PRIMARY KEY,
        account_group_id INTEGER REFERENCES account_group (id),
        account_state_id INTEGER REFERENCES account_state (id),
        email TEXT NOT NULL UNIQUE,
        first_name TEXT,
        last_name TEXT,
        encrypted_password TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        version INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE account_event (
        id SERIAL PRIMARY KEY,
        account_id INTEGER NOT NULL REFERENCES account (id) ON DELETE CASCADE,
        event TEXT NOT NULL,
        payload JSONB,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    );

    CREATE TABLE account_x_account_permission (
        id SERIAL PRIMARY KEY,
        account_id INTEGER REFERENCES account (id) ON DELETE CASCADE,
        account_permission_id INTEGER REFERENCES account_permission (id),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        version INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE agency (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        version INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE account_x_agency (
        id SERIAL PRIMARY KEY,
        account_id INTEGER REFERENCES account (id) ON DELETE CASCADE,
        agency_id INTEGER REFERENCES agency (id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        version INTEGER NOT NULL DEFAULT 1
    );

    CREATE VIEW active_account AS
        SELECT a.id, a.email, a.account_group_id
        FROM account a
        JOIN account_state s ON s.id = a.account_state_id
        WHERE s.name = 'active';

    CREATE TRIGGER account_group_touch BEFORE UPDATE ON account_group
        FOR EACH ROW EXECUTE FUNCTION tessera_touch();
    CREATE TRIGGER account_touch BEFORE UPDATE ON account
        FOR EACH ROW EXECUTE FUNCTION tessera_touch();
    CREATE TRIGGER account_x_account_permission_touch BEFORE UPDATE ON account_x_account_permission
        FOR EACH ROW EXECUTE FUNCTION tessera_touch();
    CREATE TRIGGER agency_touch BEFORE UPDATE ON agency
        FOR EACH ROW EXECUTE FUNCTION tessera_touch();
    CREATE TRIGGER account_x_agency_touch BEFORE UPDATE ON account_x_agency
        FOR EACH ROW EXECUTE FUNCTION tessera_touch();

    INSERT INTO account_state (name) VALUES ('active'), ('suspended'), ('closed');
    INSERT INTO account_permission (name) VALUES ('view_tickets'), ('edit_tickets'), ('manage_accounts');
    INSERT INTO account_group (id, name) VALUES (1, 'avengers'), (2, 'guardians'), (100, 'contractors');
    SELECT setval(pg_get_serial_sequence('account_group', 'id'), 100);
    INSERT INTO account (account_group_id, account_state_id, email, first_name, last_name, encrypted_password) VALUES
        (1, 1, 'steve@rogers.com', 'Steve', 'Rogers', 'shield'),
        (1, 1, 'tony@stark.com', 'Tony', 'Stark', 'jarvis'),
        (100, 2, 'peter@parker.com', 'Peter', 'Parker', 'spidey'),
        (100, 1, 'wanda@maximoff.com', 'Wanda', 'Maximoff', 'chaos');
    INSERT INTO account_event (account_id, event, payload) VALUES
        (1, 'login', '{"ip": "10.0.0.1"}'),
        (1, 'logout', NULL),
        (2, 'login', '{"ip": "10.0.0.2"}');
    INSERT INTO account_x_account_permission (account_id, account_permission_id) VALUES (1, 1);
    INSERT INTO agency (name) VALUES ('shield'), ('sword'), ('hydra');
    INSERT INTO account_x_agency (account_id, agency_id) VALUES (1, 1), (2, 1);
"#};

/// Configuration of the fixture database reachable at `url`.
pub fn config(url: &str) -> DatabaseConfig {
    DatabaseConfig::default()
        .with_connection(url)
        .with_enumeration_table("account_permission")
        .with_model_options(
            "Account",
            ModelOptions {
                omit: vec!["encrypted_password".into()],
                ..Default::default()
            },
        )
}
