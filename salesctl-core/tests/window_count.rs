//! Paginated execution against the in-memory warehouse

use async_trait::async_trait;
use salesctl_core::{
    fetch_page, fetch_rows, BuiltQuery, Filter, MemoryWarehouse, PageRequest, Param, QueryBuilder, QueryError,
    QueryTemplate, Record, Warehouse,
};
use serde_json::json;

fn template() -> QueryTemplate {
    QueryTemplate::new("SELECT product_id, qty FROM daily_sales {filters}")
        .where_region("filters")
        .order_by("qty DESC")
}

fn five_rows() -> Vec<Record> {
    (1..=5)
        .map(|i| {
            json!({ "product_id": format!("p{}", i), "qty": 100 - i })
                .as_object()
                .cloned()
                .unwrap()
        })
        .collect()
}

#[tokio::test]
async fn first_page_of_five_rows() {
    let warehouse = MemoryWarehouse::with_rows(five_rows());
    let template = template();

    let result = fetch_page(
        &warehouse,
        QueryBuilder::new(&template),
        PageRequest::new(1, 2).unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(result.total_records, 5);
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0]["product_id"], "p1");
    assert_eq!(result.rows[1]["product_id"], "p2");
    assert_eq!(warehouse.calls(), 1);
}

/// Sends every row regardless of LIMIT.
struct IgnoresLimit(Vec<Record>);

#[async_trait]
impl Warehouse for IgnoresLimit {
    async fn execute(&self, _query: &BuiltQuery) -> salesctl_core::Result<Vec<Record>> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn oversized_answer_is_cut_to_the_page() {
    let rows = five_rows()
        .into_iter()
        .map(|mut row| {
            row.insert("total_records".into(), json!(9));
            row
        })
        .collect();
    let warehouse = IgnoresLimit(rows);
    let template = template();

    let result = fetch_page(&warehouse, QueryBuilder::new(&template), PageRequest::new(1, 2).unwrap())
        .await
        .unwrap();

    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.total_records, 9);
    assert_eq!(result.rows[1]["product_id"], "p2");
}

#[tokio::test]
async fn total_is_independent_of_page() {
    let warehouse = MemoryWarehouse::with_rows(five_rows());
    let template = template();

    let first = fetch_page(&warehouse, QueryBuilder::new(&template), PageRequest::new(1, 2).unwrap())
        .await
        .unwrap();
    let third = fetch_page(&warehouse, QueryBuilder::new(&template), PageRequest::new(3, 2).unwrap())
        .await
        .unwrap();

    assert_eq!(first.total_records, third.total_records);
    assert_eq!(third.rows.len(), 1);
    assert_eq!(third.rows[0]["product_id"], "p5");
}

#[tokio::test]
async fn empty_set_is_not_an_error() {
    let warehouse = MemoryWarehouse::new();
    let template = template();

    let result = fetch_page(&warehouse, QueryBuilder::new(&template), PageRequest::default())
        .await
        .unwrap();

    assert_eq!(result.total_records, 0);
    assert!(result.rows.is_empty());
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({ "total_records": 0, "rows": [] })
    );
}

#[tokio::test]
async fn page_past_the_end_reports_zero() {
    let warehouse = MemoryWarehouse::with_rows(five_rows());
    let template = template();

    let result = fetch_page(&warehouse, QueryBuilder::new(&template), PageRequest::new(9, 2).unwrap())
        .await
        .unwrap();

    // the count travels on the rows; no rows, no count
    assert_eq!(result.total_records, 0);
    assert!(result.rows.is_empty());
}

#[tokio::test]
async fn execution_failure_propagates_message() {
    let warehouse = MemoryWarehouse::with_rows(five_rows());
    warehouse.fail_with("Syntax error: Unexpected keyword LIMIT");
    let template = template();

    let err = fetch_page(&warehouse, QueryBuilder::new(&template), PageRequest::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        QueryError::execution("Syntax error: Unexpected keyword LIMIT")
    );
}

#[tokio::test]
async fn template_error_sends_nothing() {
    let warehouse = MemoryWarehouse::with_rows(five_rows());
    let template = QueryTemplate::new("SELECT * FROM t WHERE day = @day");

    let err = fetch_rows(&warehouse, QueryBuilder::new(&template)).await.unwrap_err();

    assert!(matches!(err, QueryError::Template { .. }));
    assert_eq!(warehouse.calls(), 0);
}

#[tokio::test]
async fn filters_reach_the_warehouse_as_bound_values() {
    let warehouse = MemoryWarehouse::with_rows(five_rows());
    let template = template();

    let mut builder = QueryBuilder::new(&template);
    builder
        .filter(
            Filter::and("site_ids", "filters", "site_id = ANY(@site_ids)")
                .bind(Param::int_array("site_ids", vec![5, 12, 7])),
        )
        .unwrap();

    fetch_page(&warehouse, builder, PageRequest::default()).await.unwrap();

    let query = warehouse.last_query().unwrap();
    assert!(query.sql().contains("WHERE site_id = ANY(@site_ids)"));
    assert!(!query.sql().contains("12"));
    assert_eq!(
        query.param("site_ids"),
        Some(&salesctl_core::BindValue::IntArray(vec![5, 12, 7]))
    );
}
