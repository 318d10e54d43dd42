use crate::{BOOKKEEPING_COLUMNS, ErrorKind, Naming, Result, TableDescription};
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    /// The source row holds the foreign key.
    One,
    /// The target rows hold a foreign key to the source.
    Many,
    /// A join table holds both keys.
    Through,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDescription {
    pub kind: AssociationKind,
    pub name: String,
    pub source_table: String,
    pub target_table: String,
    /// Foreign key column: on the source for `One`, on the target for `Many`, on the join
    /// table (pointing at the target) for `Through`.
    pub column: String,
    pub through_table: Option<String>,
    /// `<join>.<column>` pointing at the source.
    pub from_column: Option<String>,
    /// `<join>.<column>` pointing at the target.
    pub to_column: Option<String>,
}

pub type Associations = IndexMap<String, AssociationDescription>;

/// Join table shape: the two foreign key columns and the tables they point to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTable {
    pub table: String,
    pub left_column: String,
    pub left_table: String,
    pub right_column: String,
    pub right_table: String,
}

fn is_target(tables: &IndexMap<String, TableDescription>, table: &str) -> bool {
    tables.get(table).is_some_and(|v| !v.is_view())
}

/// Detects a pure join table: exactly two non bookkeeping columns, both foreign keys to
/// existing tables.
pub fn join_table(
    table: &TableDescription,
    tables: &IndexMap<String, TableDescription>,
    naming: &Naming,
) -> Option<JoinTable> {
    if table.is_view() {
        return None;
    }
    let columns = table
        .column_names()
        .filter(|v| !BOOKKEEPING_COLUMNS.contains(v))
        .collect::<Vec<_>>();
    let [left, right] = columns.as_slice() else {
        return None;
    };
    let left_table = naming.referenced_table(left)?;
    let right_table = naming.referenced_table(right)?;
    if !is_target(tables, &left_table) || !is_target(tables, &right_table) {
        return None;
    }
    Some(JoinTable {
        table: table.name.clone(),
        left_column: left.to_string(),
        left_table,
        right_column: right.to_string(),
        right_table,
    })
}

fn insert(
    associations: &mut IndexMap<String, Associations>,
    description: AssociationDescription,
) -> Result<()> {
    let entry = associations
        .entry(description.source_table.clone())
        .or_default();
    if let Some(existing) = entry.get(&description.name) {
        let error = ErrorKind::AssociationCollision {
            table: existing.source_table.clone(),
            association: existing.name.clone(),
        }
        .into_error();
        log::error!("{:#}", error);
        return Err(error);
    }
    entry.insert(description.name.clone(), description);
    Ok(())
}

/// Infers the associations of every table from the naming conventions.
///
/// The result has an entry (possibly empty) for every described table. Two associations
/// deriving the same name on one table fail with [`ErrorKind::AssociationCollision`].
pub fn infer_associations(
    tables: &IndexMap<String, TableDescription>,
    naming: &Naming,
) -> Result<IndexMap<String, Associations>> {
    let mut result = tables
        .keys()
        .map(|k| (k.clone(), Associations::new()))
        .collect::<IndexMap<_, _>>();
    for table in tables.values().filter(|v| !v.is_view()) {
        if let Some(join) = join_table(table, tables, naming) {
            for (own_column, own_table, other_column, other_table) in [
                (
                    &join.left_column,
                    &join.left_table,
                    &join.right_column,
                    &join.right_table,
                ),
                (
                    &join.right_column,
                    &join.right_table,
                    &join.left_column,
                    &join.left_table,
                ),
            ] {
                insert(
                    &mut result,
                    AssociationDescription {
                        kind: AssociationKind::Through,
                        name: naming.many_name(other_table),
                        source_table: own_table.clone(),
                        target_table: other_table.clone(),
                        column: other_column.clone(),
                        through_table: Some(join.table.clone()),
                        from_column: Some(format!("{}.{}", join.table, own_column)),
                        to_column: Some(format!("{}.{}", join.table, other_column)),
                    },
                )?;
            }
            continue;
        }
        for column in table.column_names() {
            let Some(target) = naming.referenced_table(column) else {
                continue;
            };
            if !is_target(tables, &target) {
                continue;
            }
            insert(
                &mut result,
                AssociationDescription {
                    kind: AssociationKind::One,
                    name: naming.one_name(&target),
                    source_table: table.name.clone(),
                    target_table: target.clone(),
                    column: column.to_string(),
                    through_table: None,
                    from_column: None,
                    to_column: None,
                },
            )?;
            insert(
                &mut result,
                AssociationDescription {
                    kind: AssociationKind::Many,
                    name: naming.many_name(&table.name),
                    source_table: target.clone(),
                    target_table: table.name.clone(),
                    column: column.to_string(),
                    through_table: None,
                    from_column: None,
                    to_column: None,
                },
            )?;
        }
    }
    log::debug!(
        "Inferred {} associations over {} tables",
        result.values().map(IndexMap::len).sum::<usize>(),
        result.len()
    );
    Ok(result)
}
