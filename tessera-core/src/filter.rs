use crate::{Error, Value};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Condition applied to a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Equality, `IS NULL` when the value is null.
    Eq(Value),
    /// Inequality, `IS NOT NULL` when the value is null.
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    /// Membership, an empty list matches nothing.
    In(Vec<Value>),
    /// Non membership, an empty list matches everything.
    NotIn(Vec<Value>),
    Like(String),
}

/// Conjunction of column conditions, the `where` of every model operation.
///
/// Columns may be qualified (`account_x_agency.account_id`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Condition)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and_eq(column, value)
    }
    pub fn is_in<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new().with(
            column,
            Condition::In(values.into_iter().map(Into::into).collect()),
        )
    }
    pub fn and_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(column, Condition::Eq(value.into()))
    }
    pub fn with(mut self, column: impl Into<String>, condition: Condition) -> Self {
        self.conditions.push((column.into(), condition));
        self
    }
    pub fn and(mut self, other: Filter) -> Self {
        self.conditions.extend(other.conditions);
        self
    }
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
    pub fn len(&self) -> usize {
        self.conditions.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.conditions.iter().map(|(k, v)| (k.as_str(), v))
    }
    /// First condition on `column`.
    pub fn get(&self, column: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v)
    }
    /// Value the filter pins `column` to, when it has an equality on it.
    pub fn pinned(&self, column: &str) -> Option<&Value> {
        match self.get(column) {
            Some(Condition::Eq(v)) => Some(v),
            _ => None,
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Filter {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Filter::new(), |filter, (k, v)| filter.and_eq(k, v))
    }
}

/// Target of an operation: every row, the row with a given primary key, or a filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Where {
    #[default]
    All,
    Key(Value),
    Filter(Filter),
}

impl Where {
    pub fn key(value: impl Into<Value>) -> Self {
        Where::Key(value.into())
    }
}

impl From<Filter> for Where {
    fn from(value: Filter) -> Self {
        if value.is_empty() {
            Where::All
        } else {
            Where::Filter(value)
        }
    }
}

impl From<()> for Where {
    fn from(_: ()) -> Self {
        Where::All
    }
}

macro_rules! impl_where_key {
    ($($ty:ty),+) => {
        $(impl From<$ty> for Where {
            fn from(value: $ty) -> Self {
                Where::Key(value.into())
            }
        })+
    };
}
impl_where_key!(i16, i32, i64, Value, String, &str, uuid::Uuid);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Ordering term, parsed from strings like `"created_at desc"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }
}

impl TryFrom<String> for OrderBy {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        let mut parts = value.split_whitespace();
        let column = parts
            .next()
            .ok_or_else(|| Error::msg("Empty order term"))?
            .to_string();
        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => Direction::Asc,
            Some("desc") => Direction::Desc,
            Some(other) => {
                return Err(Error::msg(format!(
                    "Unexpected order direction `{}` in `{}`",
                    other, value
                )));
            }
        };
        if parts.next().is_some() {
            return Err(Error::msg(format!("Unexpected order term `{}`", value)));
        }
        Ok(Self { column, direction })
    }
}

impl From<OrderBy> for String {
    fn from(value: OrderBy) -> Self {
        value.to_string()
    }
}

impl Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Asc => write!(f, "{} asc", self.column),
            Direction::Desc => write!(f, "{} desc", self.column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, Filter, OrderBy, Where};
    use crate::Value;

    #[test]
    fn order_terms() {
        let order = OrderBy::try_from("created_at DESC".to_string()).unwrap();
        assert_eq!(order.column, "created_at");
        assert_eq!(order.direction, Direction::Desc);
        assert_eq!(
            OrderBy::try_from("id".to_string()).unwrap(),
            OrderBy::asc("id")
        );
        assert!(OrderBy::try_from("id sideways".to_string()).is_err());
    }

    #[test]
    fn where_forms() {
        assert_eq!(Where::from(7), Where::Key(Value::Int32(Some(7))));
        assert_eq!(Where::from(Filter::new()), Where::All);
        let filter: Filter = [("email", "tony@stark.com")].into_iter().collect();
        assert_eq!(
            filter.pinned("email"),
            Some(&Value::Varchar(Some("tony@stark.com".into())))
        );
    }
}
