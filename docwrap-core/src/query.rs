//! Query composition for named sources.
//!
//! A [`QueryPlan`] is built fresh for every read and always follows the grammar
//! `FROM source [WHERE predicate] [ORDER BY ordering...]`. The typestate builder
//! makes any other order unrepresentable:
//!
//! ```ignore
//! use docwrap::query::{DataSource, Field, Ordering, QueryPlan};
//!
//! let plan = QueryPlan::from(DataSource::collection("shop", "vehicles"))
//!     .filter(Field::attribute("quantity").gt(20))
//!     .order_by([Ordering::attribute_desc("quantity")])
//!     .build();
//! ```
//!
//! # Filter Expression API
//!
//! Predicates are plain data ([`Expr`]). The composer only threads them into
//! the plan; engines evaluate or translate them through [`QueryVisitor`].
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - String: `starts_with`, `ends_with`, `contains`, `not_contains`
//! - Existence: `exists`, `not_exists`
//! - Array: `any_of`, `none_of`
//! - Logical: `and`, `or`, `not`
//!
//! # Attribute paths
//!
//! Payload fields live under `attributes.` inside every record. [`Field::attribute`]
//! and [`attribute_path`] add that prefix so callers can write `"price"` instead of
//! `"attributes.price"`.

use bson::Bson;
use std::fmt;

use crate::{codec::ATTRIBUTES_KEY, error::DocumentStoreError};

/// Qualifies a bare attribute name with the `attributes.` segment.
///
/// Paths that are already qualified are returned unchanged.
///
/// ```ignore
/// assert_eq!(attribute_path("price"), "attributes.price");
/// assert_eq!(attribute_path("attributes.price"), "attributes.price");
/// ```
pub fn attribute_path(path: &str) -> String {
    let qualified = path == ATTRIBUTES_KEY
        || path
            .strip_prefix(ATTRIBUTES_KEY)
            .is_some_and(|rest| rest.starts_with('.'));

    if qualified {
        path.to_string()
    } else {
        format!("{ATTRIBUTES_KEY}.{path}")
    }
}

/// Separates the database name from the collection name in engine source keys.
pub const SOURCE_SEPARATOR: char = '/';

/// The named source a plan reads from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// The default source of a database, named after the database.
    Database(String),
    /// A named collection inside a database.
    Collection { database: String, name: String },
}

impl DataSource {
    pub fn database(name: impl Into<String>) -> Self {
        DataSource::Database(name.into())
    }

    pub fn collection(database: impl Into<String>, name: impl Into<String>) -> Self {
        DataSource::Collection {
            database: database.into(),
            name: name.into(),
        }
    }

    /// Returns the source name, which is also the projection key of result rows.
    pub fn name(&self) -> &str {
        match self {
            DataSource::Database(name) | DataSource::Collection { name, .. } => name,
        }
    }

    /// Returns the name of the database the source belongs to.
    pub fn database_name(&self) -> &str {
        match self {
            DataSource::Database(database) | DataSource::Collection { database, .. } => database,
        }
    }

    /// The engine source holding the records: `<database>` or `<database>/<collection>`.
    pub fn key(&self) -> String {
        match self {
            DataSource::Database(database) => database.clone(),
            DataSource::Collection { database, name } => format!("{database}{SOURCE_SEPARATOR}{name}"),
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Database(name) => write!(f, "database({name})"),
            DataSource::Collection { .. } => write!(f, "collection({})", self.key()),
        }
    }
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// One `ORDER BY` entry: a path and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    /// The path to sort by, relative to the record (e.g. `attributes.quantity`).
    pub path: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Ordering {
    pub fn new(path: impl Into<String>, direction: SortDirection) -> Self {
        Self { path: path.into(), direction }
    }

    pub fn asc(path: impl Into<String>) -> Self {
        Self::new(path, SortDirection::Asc)
    }

    pub fn desc(path: impl Into<String>) -> Self {
        Self::new(path, SortDirection::Desc)
    }

    /// Ascending ordering on a payload field, qualified with [`attribute_path`].
    pub fn attribute_asc(name: &str) -> Self {
        Self::asc(attribute_path(name))
    }

    /// Descending ordering on a payload field, qualified with [`attribute_path`].
    pub fn attribute_desc(name: &str) -> Self {
        Self::desc(attribute_path(name))
    }
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to (exact match).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// String or array contains value.
    Contains,
    /// String or array does not contain value.
    NotContains,
    /// String starts with value.
    StartsWith,
    /// String ends with value.
    EndsWith,
    /// Array contains any of the values.
    AnyOf,
    /// Array contains none of the values.
    NoneOf,
}

impl FieldOp {
    fn symbol(&self) -> &'static str {
        match self {
            FieldOp::Eq => "=",
            FieldOp::Ne => "!=",
            FieldOp::Gt => ">",
            FieldOp::Gte => ">=",
            FieldOp::Lt => "<",
            FieldOp::Lte => "<=",
            FieldOp::Contains => "CONTAINS",
            FieldOp::NotContains => "NOT CONTAINS",
            FieldOp::StartsWith => "STARTS WITH",
            FieldOp::EndsWith => "ENDS WITH",
            FieldOp::AnyOf => "ANY OF",
            FieldOp::NoneOf => "NONE OF",
        }
    }
}

/// A boolean predicate over record paths.
///
/// Expressions can be combined using logical operators (`And`, `Or`, `Not`).
///
/// # Example
///
/// ```ignore
/// use docwrap::query::{Field, Filter};
///
/// let expr = Filter::and([
///     Field::attribute("status").eq("active"),
///     Field::attribute("age").gt(18),
/// ]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression (inverts the result).
    Not(Box<Expr>),
    /// Checks if a path exists or doesn't exist.
    Exists(String, bool),
    /// Path comparison expression.
    Field {
        /// The path to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, exprs: &[Expr], sep: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, expr) in exprs.iter().enumerate() {
                if i > 0 {
                    write!(f, " {sep} ")?;
                }
                write!(f, "{expr}")?;
            }
            write!(f, ")")
        }

        match self {
            Expr::And(exprs) => join(f, exprs, "AND"),
            Expr::Or(exprs) => join(f, exprs, "OR"),
            Expr::Not(expr) => write!(f, "NOT {expr}"),
            Expr::Exists(field, true) => write!(f, "{field} IS VALUED"),
            Expr::Exists(field, false) => write!(f, "{field} IS MISSING"),
            Expr::Field { field, op, value } => write!(f, "{field} {} {value}", op.symbol()),
        }
    }
}

/// Helper struct for constructing filter expressions over explicit paths.
///
/// All methods accept paths and values as `Into<String>` and `Into<Bson>` for ergonomics.
pub struct Filter;

impl Filter {
    /// Matches records where the path equals the value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Matches records where the path does not equal the value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    /// Matches records where the path is greater than the value.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    /// Matches records where the path is greater than or equal to the value.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    /// Matches records where the path is less than the value.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    /// Matches records where the path is less than or equal to the value.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::StartsWith, value.into())
    }

    pub fn ends_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::EndsWith, value.into())
    }

    /// Matches records where the string or array at the path contains the value.
    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Contains, value.into())
    }

    pub fn not_contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NotContains, value.into())
    }

    /// Matches records where the path is present and not null.
    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    /// Combines multiple expressions such that all must match.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Combines multiple expressions such that any can match.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    pub fn any_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::AnyOf, value.into())
    }

    pub fn none_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NoneOf, value.into())
    }
}

/// A path-expression builder.
///
/// `Field::attribute("id").eq("2")` is the same predicate as
/// `Field::new("attributes.id").eq("2")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    path: String,
}

impl Field {
    /// A field at an explicit record path.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// A payload field; the `attributes.` prefix is added unless already present.
    pub fn attribute(name: &str) -> Self {
        Self { path: attribute_path(name) }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn eq(self, value: impl Into<Bson>) -> Expr {
        Filter::eq(self.path, value)
    }

    pub fn ne(self, value: impl Into<Bson>) -> Expr {
        Filter::ne(self.path, value)
    }

    pub fn gt(self, value: impl Into<Bson>) -> Expr {
        Filter::gt(self.path, value)
    }

    pub fn gte(self, value: impl Into<Bson>) -> Expr {
        Filter::gte(self.path, value)
    }

    pub fn lt(self, value: impl Into<Bson>) -> Expr {
        Filter::lt(self.path, value)
    }

    pub fn lte(self, value: impl Into<Bson>) -> Expr {
        Filter::lte(self.path, value)
    }

    pub fn starts_with(self, value: impl Into<Bson>) -> Expr {
        Filter::starts_with(self.path, value)
    }

    pub fn ends_with(self, value: impl Into<Bson>) -> Expr {
        Filter::ends_with(self.path, value)
    }

    pub fn contains(self, value: impl Into<Bson>) -> Expr {
        Filter::contains(self.path, value)
    }

    pub fn not_contains(self, value: impl Into<Bson>) -> Expr {
        Filter::not_contains(self.path, value)
    }

    pub fn any_of(self, value: impl Into<Bson>) -> Expr {
        Filter::any_of(self.path, value)
    }

    pub fn none_of(self, value: impl Into<Bson>) -> Expr {
        Filter::none_of(self.path, value)
    }

    pub fn exists(self) -> Expr {
        Filter::exists(self.path)
    }

    pub fn not_exists(self) -> Expr {
        Filter::not_exists(self.path)
    }

    pub fn asc(self) -> Ordering {
        Ordering::asc(self.path)
    }

    pub fn desc(self) -> Ordering {
        Ordering::desc(self.path)
    }
}

/// A composed, immutable read over one named source.
///
/// Plans are never cached; build a new one per call with [`QueryPlan::from`] or [`compose`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    source: DataSource,
    predicate: Option<Expr>,
    ordering: Vec<Ordering>,
}

impl QueryPlan {
    /// Starts a plan at the `FROM` stage.
    pub fn from(source: DataSource) -> FromStage {
        FromStage { source }
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub fn predicate(&self) -> Option<&Expr> {
        self.predicate.as_ref()
    }

    /// Ordering entries, primary sort key first.
    pub fn ordering(&self) -> &[Ordering] {
        &self.ordering
    }

    /// Returns `true` when the plan neither filters nor orders.
    pub fn is_full_scan(&self) -> bool {
        self.predicate.is_none() && self.ordering.is_empty()
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FROM {}", self.source)?;
        if let Some(predicate) = &self.predicate {
            write!(f, " WHERE {predicate}")?;
        }
        if !self.ordering.is_empty() {
            write!(f, " ORDER BY ")?;
            for (i, ordering) in self.ordering.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                let direction = match ordering.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                write!(f, "{} {direction}", ordering.path)?;
            }
        }
        Ok(())
    }
}

/// `FROM source`; may be followed by `WHERE` or `ORDER BY`.
#[derive(Debug, Clone)]
pub struct FromStage {
    source: DataSource,
}

impl FromStage {
    pub fn filter(self, predicate: Expr) -> WhereStage {
        WhereStage { source: self.source, predicate }
    }

    pub fn order_by(self, ordering: impl IntoIterator<Item = Ordering>) -> OrderByStage {
        OrderByStage {
            source: self.source,
            predicate: None,
            ordering: ordering.into_iter().collect(),
        }
    }

    pub fn build(self) -> QueryPlan {
        QueryPlan { source: self.source, predicate: None, ordering: Vec::new() }
    }
}

/// `FROM source WHERE predicate`; may be followed by `ORDER BY`.
#[derive(Debug, Clone)]
pub struct WhereStage {
    source: DataSource,
    predicate: Expr,
}

impl WhereStage {
    pub fn order_by(self, ordering: impl IntoIterator<Item = Ordering>) -> OrderByStage {
        OrderByStage {
            source: self.source,
            predicate: Some(self.predicate),
            ordering: ordering.into_iter().collect(),
        }
    }

    pub fn build(self) -> QueryPlan {
        QueryPlan { source: self.source, predicate: Some(self.predicate), ordering: Vec::new() }
    }
}

/// The final stage; only [`OrderByStage::build`] remains.
#[derive(Debug, Clone)]
pub struct OrderByStage {
    source: DataSource,
    predicate: Option<Expr>,
    ordering: Vec<Ordering>,
}

impl OrderByStage {
    pub fn build(self) -> QueryPlan {
        QueryPlan { source: self.source, predicate: self.predicate, ordering: self.ordering }
    }
}

/// Composes a plan from optional parts, always in `FROM`/`WHERE`/`ORDER BY` order.
///
/// An empty ordering list is treated the same as no ordering.
pub fn compose(
    source: DataSource,
    predicate: Option<Expr>,
    ordering: Option<Vec<Ordering>>,
) -> QueryPlan {
    let from = QueryPlan::from(source);
    let ordering = ordering.filter(|ordering| !ordering.is_empty());

    match (predicate, ordering) {
        (Some(predicate), Some(ordering)) => from.filter(predicate).order_by(ordering).build(),
        (Some(predicate), None) => from.filter(predicate).build(),
        (None, Some(ordering)) => from.order_by(ordering).build(),
        (None, None) => from.build(),
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}
