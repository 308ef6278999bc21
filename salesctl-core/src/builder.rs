//! Structured query builder
//!
//! A `QueryTemplate` is a SQL body with `{region}` substitution points.
//! Triggered filters are collected as `(region, connective, fragment)`
//! clauses and only serialized to text in `build`/`build_page`. User values
//! never touch the text: fragments reference them as `@name` and the values
//! travel as bind parameters.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{QueryError, Result};
use crate::filter::{Connective, Filter};
use crate::pagination::PageRequest;
use crate::params::{BindValue, Param};

/// Bind parameter carrying the page size
pub const PAGE_LIMIT_PARAM: &str = "page_limit";

/// Bind parameter carrying the row offset
pub const PAGE_OFFSET_PARAM: &str = "page_offset";

/// Column every paginated row carries with the size of the filtered set
pub const TOTAL_RECORDS_COLUMN: &str = "total_records";

/// CTE name wrapping the filtered body of a paginated query
pub const FILTERED_SET: &str = "filtered_set";

static REGION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_][a-z0-9_]*)\}").expect("region regex"));

/// How a region renders its clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionStyle {
    /// `WHERE a AND b`, or nothing
    Where,
    /// `HAVING a AND b`, or nothing
    Having,
    /// `AND a AND b`, for bodies that already have a predicate
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Region {
    name: &'static str,
    style: RegionStyle,
}

/// Base query with named substitution points
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    body: &'static str,
    regions: Vec<Region>,
    order_by: Option<&'static str>,
}

impl QueryTemplate {
    pub fn new(body: &'static str) -> Self {
        Self {
            body,
            regions: Vec::new(),
            order_by: None,
        }
    }

    /// Declare a `WHERE` region.
    pub fn where_region(self, name: &'static str) -> Self {
        self.region(name, RegionStyle::Where)
    }

    /// Declare a `HAVING` region.
    pub fn having_region(self, name: &'static str) -> Self {
        self.region(name, RegionStyle::Having)
    }

    /// Declare a region appended to an existing predicate.
    pub fn continue_region(self, name: &'static str) -> Self {
        self.region(name, RegionStyle::Continue)
    }

    pub fn region(mut self, name: &'static str, style: RegionStyle) -> Self {
        self.regions.push(Region { name, style });
        self
    }

    /// ORDER BY applied to the final result (column list without the keyword)
    pub fn order_by(mut self, clause: &'static str) -> Self {
        self.order_by = Some(clause);
        self
    }

    pub fn body(&self) -> &'static str {
        self.body
    }

    fn region_style(&self, name: &str) -> Option<RegionStyle> {
        self.regions.iter().find(|r| r.name == name).map(|r| r.style)
    }

    /// Check that body references and declared regions agree.
    pub fn validate(&self) -> Result<()> {
        let referenced: BTreeSet<&str> = REGION_RE
            .captures_iter(self.body)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect();

        for name in &referenced {
            if self.region_style(name).is_none() {
                return Err(QueryError::template(format!(
                    "body references undeclared region '{}'",
                    name
                )));
            }
        }

        for region in &self.regions {
            if !referenced.contains(region.name) {
                return Err(QueryError::template(format!(
                    "region '{}' is declared but never referenced",
                    region.name
                )));
            }
        }

        Ok(())
    }
}

/// One rendered condition, as assembled before serialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub filter: &'static str,
    pub region: &'static str,
    pub connective: Connective,
    pub fragment: &'static str,
}

/// Collects triggered filters for a template
#[derive(Debug, Clone)]
pub struct QueryBuilder<'t> {
    template: &'t QueryTemplate,
    clauses: Vec<Clause>,
    params: Vec<Param>,
}

impl<'t> QueryBuilder<'t> {
    pub fn new(template: &'t QueryTemplate) -> Self {
        Self {
            template,
            clauses: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Append a triggered filter.
    ///
    /// Clauses keep call order within their region.
    pub fn filter(&mut self, filter: Filter) -> Result<&mut Self> {
        if self.template.region_style(filter.region).is_none() {
            return Err(QueryError::template(format!(
                "filter '{}' targets undeclared region '{}'",
                filter.name, filter.region
            )));
        }

        for param in filter.params {
            self.push_param(param)?;
        }

        self.clauses.push(Clause {
            filter: filter.name,
            region: filter.region,
            connective: filter.connective,
            fragment: filter.fragment,
        });
        Ok(self)
    }

    /// Bind a parameter the body references unconditionally.
    pub fn bind(&mut self, param: Param) -> Result<&mut Self> {
        self.push_param(param)?;
        Ok(self)
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Render without pagination.
    pub fn build(self) -> Result<BuiltQuery> {
        let mut sql = self.render_body()?;
        if let Some(order_by) = self.template.order_by {
            sql.push_str("\nORDER BY ");
            sql.push_str(order_by);
        }

        BuiltQuery::checked(sql, self.params, None)
    }

    /// Render as a page of the filtered set with a window count.
    ///
    /// The body becomes the `filtered_set` CTE; every returned row carries
    /// `total_records`, the size of the whole filtered set. LIMIT and
    /// OFFSET are bound and always come last.
    pub fn build_page(self, page: PageRequest) -> Result<BuiltQuery> {
        let body = self.render_body()?;

        let mut sql = format!(
            "WITH {set} AS (\n{body}\n)\nSELECT {set}.*, (SELECT COUNT(*) FROM {set}) AS {total}\nFROM {set}\n",
            set = FILTERED_SET,
            body = body.trim_end(),
            total = TOTAL_RECORDS_COLUMN,
        );
        if let Some(order_by) = self.template.order_by {
            sql.push_str("ORDER BY ");
            sql.push_str(order_by);
            sql.push('\n');
        }
        sql.push_str(&format!("LIMIT @{} OFFSET @{}", PAGE_LIMIT_PARAM, PAGE_OFFSET_PARAM));

        let mut params = self.params;
        params.push(Param::int(PAGE_LIMIT_PARAM, page.limit()));
        params.push(Param::int(PAGE_OFFSET_PARAM, page.offset()));

        BuiltQuery::checked(sql, params, Some(page))
    }

    fn push_param(&mut self, param: Param) -> Result<()> {
        if param.name == PAGE_LIMIT_PARAM || param.name == PAGE_OFFSET_PARAM {
            return Err(QueryError::template(format!(
                "parameter name '{}' is reserved for pagination",
                param.name
            )));
        }

        match self.params.iter().find(|p| p.name == param.name) {
            Some(existing) if existing.value == param.value => Ok(()),
            Some(_) => Err(QueryError::template(format!(
                "parameter '{}' bound twice with different values",
                param.name
            ))),
            None => {
                self.params.push(param);
                Ok(())
            }
        }
    }

    fn render_body(&self) -> Result<String> {
        self.template.validate()?;

        let rendered = REGION_RE.replace_all(self.template.body, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            // validate() guarantees every referenced region is declared
            let style = self.template.region_style(name).unwrap_or(RegionStyle::Continue);
            render_region(style, self.clauses.iter().filter(|c| c.region == name))
        });

        Ok(rendered.into_owned())
    }
}

fn render_region<'a>(style: RegionStyle, clauses: impl Iterator<Item = &'a Clause>) -> String {
    let mut out = String::new();

    for (i, clause) in clauses.enumerate() {
        let fragment = clause.fragment.trim();
        match (style, i) {
            (RegionStyle::Where, 0) => out.push_str(&format!("WHERE {}", fragment)),
            (RegionStyle::Having, 0) => out.push_str(&format!("HAVING {}", fragment)),
            (RegionStyle::Continue, 0) => {
                out.push_str(&format!("{} {}", clause.connective, fragment))
            }
            _ => out.push_str(&format!("\n  {} {}", clause.connective, fragment)),
        }
    }

    out
}

/// Final query text plus the parameters it references
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    sql: String,
    params: Vec<Param>,
    page: Option<PageRequest>,
}

impl BuiltQuery {
    fn checked(sql: String, params: Vec<Param>, page: Option<PageRequest>) -> Result<Self> {
        let referenced: BTreeSet<&str> = placeholders(&sql).into_iter().map(|p| p.name).collect();

        for name in &referenced {
            if !params.iter().any(|p| p.name == *name) {
                return Err(QueryError::template(format!(
                    "placeholder '@{}' has no bound parameter",
                    name
                )));
            }
        }

        for param in &params {
            if !referenced.contains(param.name) {
                return Err(QueryError::template(format!(
                    "parameter '{}' is never referenced",
                    param.name
                )));
            }
        }

        Ok(Self { sql, params, page })
    }

    /// Query text with `@name` placeholders
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Page this query was built for, if paginated
    pub fn page(&self) -> Option<PageRequest> {
        self.page
    }

    pub fn param(&self, name: &str) -> Option<&BindValue> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Rewrite `@name` placeholders as `$n`, where `n` is the 1-based
    /// position of the parameter in `params()`.
    pub fn to_positional(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut last = 0;

        for placeholder in placeholders(&self.sql) {
            out.push_str(&self.sql[last..placeholder.start]);
            // checked() guarantees every placeholder has a parameter
            let index = self
                .params
                .iter()
                .position(|p| p.name == placeholder.name)
                .map(|i| i + 1)
                .unwrap_or(0);
            out.push_str(&format!("${}", index));
            last = placeholder.end;
        }

        out.push_str(&self.sql[last..]);
        out
    }
}

/// A `@name` occurrence in query text (byte range includes the `@`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder<'a> {
    pub name: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Find `@name` placeholders outside quoted literals, identifiers and
/// comments.
pub fn placeholders(sql: &str) -> Vec<Placeholder<'_>> {
    let bytes = sql.as_bytes();
    let mut found = Vec::new();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match b {
            b'\'' | b'"' | b'`' => {
                quote = Some(b);
                i += 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = sql[i..].find('\n').map_or(bytes.len(), |n| i + n + 1);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = sql[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2);
            }
            b'@' => {
                let prev_is_word = i > 0 && is_ident_byte(bytes[i - 1]);
                let starts_ident = bytes
                    .get(i + 1)
                    .is_some_and(|c| c.is_ascii_alphabetic() || *c == b'_');

                if prev_is_word || !starts_ident {
                    i += 1;
                    continue;
                }

                let start = i;
                let mut end = i + 1;
                while end < bytes.len() && is_ident_byte(bytes[end]) {
                    end += 1;
                }
                found.push(Placeholder {
                    name: &sql[start + 1..end],
                    start,
                    end,
                });
                i = end;
            }
            _ => i += 1,
        }
    }

    found
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'@'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales_template() -> QueryTemplate {
        QueryTemplate::new(
            "SELECT product_id, SUM(qty) AS qty FROM sales {filters} GROUP BY product_id {having}",
        )
        .where_region("filters")
        .having_region("having")
        .order_by("qty DESC")
    }

    #[test]
    fn untriggered_template_has_no_where() {
        let template = sales_template();
        let query = QueryBuilder::new(&template).build().unwrap();

        assert_eq!(
            query.sql(),
            "SELECT product_id, SUM(qty) AS qty FROM sales  GROUP BY product_id \nORDER BY qty DESC"
        );
        assert!(query.params().is_empty());
    }

    #[test]
    fn where_region_drops_first_connective() {
        let template = sales_template();
        let mut builder = QueryBuilder::new(&template);
        builder
            .filter(Filter::and("start", "filters", "day >= @start_date").bind(Param::string("start_date", "a")))
            .unwrap()
            .filter(Filter::and("end", "filters", "day <= @end_date").bind(Param::string("end_date", "b")))
            .unwrap();

        let query = builder.build().unwrap();
        assert!(query
            .sql()
            .contains("FROM sales WHERE day >= @start_date\n  AND day <= @end_date GROUP BY"));
        assert_eq!(query.params().len(), 2);
    }

    #[test]
    fn having_and_continue_regions() {
        let template = QueryTemplate::new("SELECT 1 FROM t WHERE t.kind = 1 {extra} GROUP BY t.id {having}")
            .continue_region("extra")
            .having_region("having");

        let mut builder = QueryBuilder::new(&template);
        builder
            .filter(Filter::and("site", "extra", "t.site = @site").bind(Param::int("site", 3)))
            .unwrap()
            .filter(Filter::and("min", "having", "COUNT(*) > @min").bind(Param::int("min", 2)))
            .unwrap();

        let query = builder.build().unwrap();
        assert_eq!(
            query.sql(),
            "SELECT 1 FROM t WHERE t.kind = 1 AND t.site = @site GROUP BY t.id HAVING COUNT(*) > @min"
        );
    }

    #[test]
    fn paginated_wraps_with_window_count() {
        let template = sales_template();
        let query = QueryBuilder::new(&template)
            .build_page(PageRequest::new(3, 10).unwrap())
            .unwrap();

        assert!(query.sql().starts_with("WITH filtered_set AS (\n"));
        assert!(query
            .sql()
            .contains("SELECT filtered_set.*, (SELECT COUNT(*) FROM filtered_set) AS total_records"));
        assert!(query
            .sql()
            .ends_with("ORDER BY qty DESC\nLIMIT @page_limit OFFSET @page_offset"));
        assert_eq!(query.param(PAGE_LIMIT_PARAM), Some(&BindValue::Int(10)));
        assert_eq!(query.param(PAGE_OFFSET_PARAM), Some(&BindValue::Int(20)));
        assert_eq!(query.page().map(|p| p.page()), Some(3));
    }

    #[test]
    fn unknown_region_is_template_error() {
        let template = sales_template();
        let err = QueryBuilder::new(&template)
            .filter(Filter::and("x", "nowhere", "1 = 1"))
            .unwrap_err();
        assert!(matches!(err, QueryError::Template { .. }));
    }

    #[test]
    fn undeclared_body_region_is_template_error() {
        let template = QueryTemplate::new("SELECT 1 {filters}");
        let err = QueryBuilder::new(&template).build().unwrap_err();
        assert!(err.to_string().contains("undeclared region 'filters'"));
    }

    #[test]
    fn unbound_placeholder_is_template_error() {
        let template = QueryTemplate::new("SELECT 1 FROM t WHERE day = @day");
        let err = QueryBuilder::new(&template).build().unwrap_err();
        assert!(err.to_string().contains("'@day'"));
    }

    #[test]
    fn unreferenced_param_is_template_error() {
        let template = QueryTemplate::new("SELECT 1");
        let mut builder = QueryBuilder::new(&template);
        builder.bind(Param::int("unused", 1)).unwrap();
        assert!(builder.build().is_err());
    }

    #[test]
    fn shared_param_is_bound_once() {
        let template = QueryTemplate::new("SELECT 1 FROM a {one} UNION ALL SELECT 1 FROM b {two}")
            .where_region("one")
            .where_region("two");

        let mut builder = QueryBuilder::new(&template);
        builder
            .filter(Filter::and("a", "one", "a.site = ANY(@sites)").bind(Param::int_array("sites", vec![1])))
            .unwrap()
            .filter(Filter::and("b", "two", "b.site = ANY(@sites)").bind(Param::int_array("sites", vec![1])))
            .unwrap();

        let query = builder.build().unwrap();
        assert_eq!(query.params().len(), 1);
        assert_eq!(query.to_positional().matches("$1").count(), 2);
    }

    #[test]
    fn conflicting_param_values_rejected() {
        let template = QueryTemplate::new("SELECT @a");
        let mut builder = QueryBuilder::new(&template);
        builder.bind(Param::int("a", 1)).unwrap();
        assert!(builder.bind(Param::int("a", 2)).is_err());
    }

    #[test]
    fn reserved_names_rejected() {
        let template = sales_template();
        let mut builder = QueryBuilder::new(&template);
        assert!(builder.bind(Param::int(PAGE_LIMIT_PARAM, 1)).is_err());
    }

    #[test]
    fn placeholders_skip_quoted_text() {
        let sql = "SELECT '@not', \"@col\", x FROM t WHERE a = @a AND b @> @b AND c = @@c";
        let names: Vec<_> = placeholders(sql).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn placeholders_skip_comments() {
        let sql = "SELECT 1 -- don't @x\nFROM t /* it's @y */ WHERE a = @a -- trailing";
        let names: Vec<_> = placeholders(sql).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["a"]);

        let template = QueryTemplate::new("SELECT 1 -- don't\nFROM t WHERE a = @a");
        let mut builder = QueryBuilder::new(&template);
        builder.bind(Param::int("a", 1)).unwrap();
        let query = builder.build().unwrap();
        assert_eq!(query.to_positional(), "SELECT 1 -- don't\nFROM t WHERE a = $1");
    }

    #[test]
    fn positional_rewrite_follows_param_order() {
        let template = QueryTemplate::new("SELECT * FROM t WHERE b = @b AND a = @a AND c = '@a'");
        let mut builder = QueryBuilder::new(&template);
        builder.bind(Param::int("a", 1)).unwrap();
        builder.bind(Param::int("b", 2)).unwrap();

        let query = builder.build().unwrap();
        assert_eq!(
            query.to_positional(),
            "SELECT * FROM t WHERE b = $2 AND a = $1 AND c = '@a'"
        );
    }
}
