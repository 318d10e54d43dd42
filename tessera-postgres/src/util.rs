use crate::ValueHolder;
use tessera_core::{Error, ErrorKind, Result, Row, RowLabeled, RowNames, truncate_long};
use tokio_postgres::error::SqlState;

pub(crate) fn postgres_row_to_row(row: &tokio_postgres::Row) -> Result<Row> {
    (0..row.len())
        .map(|i| match row.try_get::<_, ValueHolder>(i) {
            Ok(v) => Ok(v.0),
            Err(e) => {
                let col = &row.columns()[i];
                Err(Error::msg(format!(
                    "Could not deserialize column {} `{}`: {} ({})",
                    i,
                    col.name(),
                    col.type_(),
                    e
                )))
            }
        })
        .collect::<Result<Row>>()
}

pub(crate) fn postgres_rows_to_labeled(rows: Vec<tokio_postgres::Row>) -> Result<Vec<RowLabeled>> {
    let mut labels: Option<RowNames> = None;
    rows.iter()
        .map(|row| {
            let labels = labels
                .get_or_insert_with(|| {
                    row.columns().iter().map(|c| c.name().to_string()).collect()
                })
                .clone();
            Ok(RowLabeled::new(labels, postgres_row_to_row(row)?))
        })
        .collect()
}

/// Classifies a server error, the failures callers branch on become an [`ErrorKind`].
pub(crate) fn error_kind(error: &tokio_postgres::Error) -> Option<ErrorKind> {
    let db = error.as_db_error()?;
    let message = db.message().to_string();
    let code = db.code();
    if *code == SqlState::LOCK_NOT_AVAILABLE {
        Some(ErrorKind::LockUnavailable { message })
    } else if *code == SqlState::QUERY_CANCELED {
        Some(ErrorKind::QueryTimeout { message })
    } else if code.code().starts_with("23") {
        Some(ErrorKind::ConstraintViolation {
            code: code.code().to_string(),
            constraint: db.constraint().map(ToString::to_string),
            message,
        })
    } else {
        None
    }
}

pub(crate) fn map_postgres_error(error: tokio_postgres::Error, sql: &str) -> Error {
    let context = format!("While running the query:\n{}", truncate_long!(sql));
    let error = match error_kind(&error) {
        Some(kind) => kind.into_error().context(context),
        None => Error::new(error).context(context),
    };
    match error.downcast_ref::<ErrorKind>() {
        Some(ErrorKind::LockUnavailable { .. }) => log::debug!("{:#}", error),
        _ => log::error!("{:#}", error),
    }
    error
}
