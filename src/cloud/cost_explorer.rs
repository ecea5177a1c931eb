//! AWS Cost Explorer operations.
//!
//! Filters use the service's recursive `Expression` shape:
//!
//! ```json
//! {"And": [
//!   {"Dimensions": {"Key": "SERVICE", "Values": ["Amazon Relational Database Service"]}},
//!   {"Not": {"Tags": {"Key": "env", "Values": ["dev"]}}}
//! ]}
//! ```

use super::{CloudClient, api_error, decode_params, unknown_operation};
use crate::error::{ToolError, ToolResult};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_costexplorer::operation::get_cost_and_usage::GetCostAndUsageOutput;
use aws_sdk_costexplorer::operation::get_dimension_values::GetDimensionValuesOutput;
use aws_sdk_costexplorer::types::{
    Context, CostCategoryValues, DateInterval, Dimension, DimensionValues,
    DimensionValuesWithAttributes, Expression, Granularity, GroupDefinition, GroupDefinitionType,
    MatchOption, MetricValue, ResultByTime, SortDefinition, SortOrder, TagValues,
};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::Arc;

pub const SERVICE_NAME: &str = "CostExplorer";

pub const OPERATIONS: &[&str] = &["getCostAndUsage", "getDimensionValues"];

pub fn client(config: &SdkConfig) -> Arc<dyn CloudClient> {
    Arc::new(CostExplorerService {
        client: aws_sdk_costexplorer::Client::new(config),
    })
}

// =============================================================================
// Parameter shapes
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct TimePeriodParam {
    start: String,
    end: String,
}

impl TimePeriodParam {
    fn into_interval(self) -> ToolResult<DateInterval> {
        DateInterval::builder()
            .start(self.start)
            .end(self.end)
            .build()
            .map_err(|e| ToolError::invalid_argument(format!("Invalid TimePeriod: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct GroupByParam {
    r#type: String,
    key: String,
}

impl GroupByParam {
    fn into_definition(self) -> GroupDefinition {
        GroupDefinition::builder()
            .r#type(GroupDefinitionType::from(self.r#type.as_str()))
            .key(self.key)
            .build()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct SortByParam {
    key: String,
    #[serde(default)]
    sort_order: Option<String>,
}

impl SortByParam {
    fn into_definition(self) -> ToolResult<SortDefinition> {
        SortDefinition::builder()
            .key(self.key)
            .set_sort_order(self.sort_order.as_deref().map(SortOrder::from))
            .build()
            .map_err(|e| ToolError::invalid_argument(format!("Invalid SortBy: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct ValuesParam {
    key: String,
    #[serde(default)]
    values: Option<Vec<String>>,
    #[serde(default)]
    match_options: Option<Vec<String>>,
}

impl ValuesParam {
    fn match_options(&self) -> Option<Vec<MatchOption>> {
        self.match_options
            .as_ref()
            .map(|opts| opts.iter().map(|o| MatchOption::from(o.as_str())).collect())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct ExpressionParam {
    #[serde(default)]
    or: Option<Vec<ExpressionParam>>,
    #[serde(default)]
    and: Option<Vec<ExpressionParam>>,
    #[serde(default)]
    not: Option<Box<ExpressionParam>>,
    #[serde(default)]
    dimensions: Option<ValuesParam>,
    #[serde(default)]
    tags: Option<ValuesParam>,
    #[serde(default)]
    cost_categories: Option<ValuesParam>,
}

impl ExpressionParam {
    fn into_expression(self) -> Expression {
        let convert = |list: Option<Vec<ExpressionParam>>| {
            list.map(|exprs| exprs.into_iter().map(Self::into_expression).collect())
        };

        let dimensions = self.dimensions.map(|d| {
            let match_options = d.match_options();
            DimensionValues::builder()
                .key(Dimension::from(d.key.as_str()))
                .set_values(d.values)
                .set_match_options(match_options)
                .build()
        });
        let tags = self.tags.map(|t| {
            let match_options = t.match_options();
            TagValues::builder()
                .key(t.key)
                .set_values(t.values)
                .set_match_options(match_options)
                .build()
        });
        let cost_categories = self.cost_categories.map(|c| {
            let match_options = c.match_options();
            CostCategoryValues::builder()
                .key(c.key)
                .set_values(c.values)
                .set_match_options(match_options)
                .build()
        });

        let mut builder = Expression::builder()
            .set_or(convert(self.or))
            .set_and(convert(self.and))
            .set_dimensions(dimensions)
            .set_tags(tags)
            .set_cost_categories(cost_categories);
        if let Some(not) = self.not {
            builder = builder.not(not.into_expression());
        }
        builder.build()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct GetCostAndUsageParams {
    time_period: TimePeriodParam,
    granularity: String,
    metrics: Vec<String>,
    #[serde(default)]
    group_by: Option<Vec<GroupByParam>>,
    #[serde(default)]
    filter: Option<ExpressionParam>,
    #[serde(default)]
    billing_view_arn: Option<String>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct GetDimensionValuesParams {
    time_period: TimePeriodParam,
    dimension: String,
    #[serde(default)]
    search_string: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    filter: Option<ExpressionParam>,
    #[serde(default)]
    sort_by: Option<Vec<SortByParam>>,
    #[serde(default)]
    billing_view_arn: Option<String>,
    #[serde(default)]
    max_results: Option<i32>,
    #[serde(default)]
    next_page_token: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

struct CostExplorerService {
    client: aws_sdk_costexplorer::Client,
}

impl CostExplorerService {
    async fn get_cost_and_usage(&self, params: JsonValue) -> ToolResult<JsonValue> {
        let p: GetCostAndUsageParams = decode_params("getCostAndUsage", params)?;
        let group_by = p.group_by.map(|groups| {
            groups
                .into_iter()
                .map(GroupByParam::into_definition)
                .collect::<Vec<_>>()
        });

        let output = self
            .client
            .get_cost_and_usage()
            .time_period(p.time_period.into_interval()?)
            .granularity(Granularity::from(p.granularity.as_str()))
            .set_metrics(Some(p.metrics))
            .set_group_by(group_by)
            .set_filter(p.filter.map(ExpressionParam::into_expression))
            .set_billing_view_arn(p.billing_view_arn)
            .set_next_page_token(p.next_page_token)
            .send()
            .await
            .map_err(|e| api_error(SERVICE_NAME, "getCostAndUsage", e))?;
        Ok(cost_and_usage_json(&output))
    }

    async fn get_dimension_values(&self, params: JsonValue) -> ToolResult<JsonValue> {
        let p: GetDimensionValuesParams = decode_params("getDimensionValues", params)?;
        let sort_by = p
            .sort_by
            .map(|sorts| {
                sorts
                    .into_iter()
                    .map(SortByParam::into_definition)
                    .collect::<ToolResult<Vec<_>>>()
            })
            .transpose()?;

        let output = self
            .client
            .get_dimension_values()
            .time_period(p.time_period.into_interval()?)
            .dimension(Dimension::from(p.dimension.as_str()))
            .set_search_string(p.search_string)
            .set_context(p.context.as_deref().map(Context::from))
            .set_filter(p.filter.map(ExpressionParam::into_expression))
            .set_sort_by(sort_by)
            .set_billing_view_arn(p.billing_view_arn)
            .set_max_results(p.max_results)
            .set_next_page_token(p.next_page_token)
            .send()
            .await
            .map_err(|e| api_error(SERVICE_NAME, "getDimensionValues", e))?;
        Ok(dimension_values_json(&output))
    }
}

#[async_trait]
impl CloudClient for CostExplorerService {
    async fn call(&self, operation: &str, params: JsonValue) -> ToolResult<JsonValue> {
        match operation {
            "getCostAndUsage" => self.get_cost_and_usage(params).await,
            "getDimensionValues" => self.get_dimension_values(params).await,
            other => Err(unknown_operation(SERVICE_NAME, other)),
        }
    }
}

// =============================================================================
// Response shapes
// =============================================================================

fn interval_json(interval: &DateInterval) -> JsonValue {
    json!({ "Start": interval.start(), "End": interval.end() })
}

fn metrics_json(metrics: Option<&HashMap<String, MetricValue>>) -> JsonValue {
    let Some(metrics) = metrics else {
        return JsonValue::Null;
    };
    let map: Map<String, JsonValue> = metrics
        .iter()
        .map(|(name, value)| {
            (
                name.clone(),
                json!({ "Amount": value.amount(), "Unit": value.unit() }),
            )
        })
        .collect();
    JsonValue::Object(map)
}

fn group_definition_json(definition: &GroupDefinition) -> JsonValue {
    json!({
        "Type": definition.r#type().map(|t| t.as_str()),
        "Key": definition.key(),
    })
}

fn result_by_time_json(result: &ResultByTime) -> JsonValue {
    let groups: Vec<JsonValue> = result
        .groups()
        .iter()
        .map(|g| json!({ "Keys": g.keys(), "Metrics": metrics_json(g.metrics()) }))
        .collect();
    json!({
        "TimePeriod": result.time_period().map(interval_json),
        "Total": metrics_json(result.total()),
        "Groups": groups,
        "Estimated": result.estimated(),
    })
}

fn dimension_value_json(value: &DimensionValuesWithAttributes) -> JsonValue {
    json!({ "Value": value.value(), "Attributes": value.attributes() })
}

fn cost_and_usage_json(output: &GetCostAndUsageOutput) -> JsonValue {
    let group_definitions: Vec<JsonValue> = output
        .group_definitions()
        .iter()
        .map(group_definition_json)
        .collect();
    let results: Vec<JsonValue> = output
        .results_by_time()
        .iter()
        .map(result_by_time_json)
        .collect();
    let attributes: Vec<JsonValue> = output
        .dimension_value_attributes()
        .iter()
        .map(dimension_value_json)
        .collect();
    json!({
        "NextPageToken": output.next_page_token(),
        "GroupDefinitions": group_definitions,
        "ResultsByTime": results,
        "DimensionValueAttributes": attributes,
    })
}

fn dimension_values_json(output: &GetDimensionValuesOutput) -> JsonValue {
    let values: Vec<JsonValue> = output
        .dimension_values()
        .iter()
        .map(dimension_value_json)
        .collect();
    json!({
        "DimensionValues": values,
        "ReturnSize": output.return_size(),
        "TotalSize": output.total_size(),
        "NextPageToken": output.next_page_token(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_and_usage_params() {
        let p: GetCostAndUsageParams = decode_params(
            "getCostAndUsage",
            json!({
                "TimePeriod": {"Start": "2024-01-01", "End": "2024-02-01"},
                "Granularity": "MONTHLY",
                "Metrics": ["UnblendedCost"],
                "GroupBy": [{"Type": "DIMENSION", "Key": "SERVICE"}]
            }),
        )
        .unwrap();
        assert_eq!(p.granularity, "MONTHLY");
        assert_eq!(p.metrics, vec!["UnblendedCost"]);
        let interval = p.time_period.into_interval().unwrap();
        assert_eq!(interval.start(), "2024-01-01");
        assert_eq!(interval.end(), "2024-02-01");
    }

    #[test]
    fn test_cost_and_usage_accepts_every_input_field() {
        let p: GetCostAndUsageParams = decode_params(
            "getCostAndUsage",
            json!({
                "TimePeriod": {"Start": "2024-01-01", "End": "2024-02-01"},
                "Granularity": "DAILY",
                "Filter": {"Dimensions": {"Key": "REGION", "Values": ["ap-southeast-1"]}},
                "Metrics": ["UnblendedCost", "UsageQuantity"],
                "GroupBy": [{"Type": "TAG", "Key": "team"}],
                "BillingViewArn": "arn:aws:billing::123456789012:billingview/primary",
                "NextPageToken": "page-2"
            }),
        )
        .unwrap();
        assert!(p.filter.is_some());
        assert_eq!(
            p.billing_view_arn.as_deref(),
            Some("arn:aws:billing::123456789012:billingview/primary")
        );
        assert_eq!(p.next_page_token.as_deref(), Some("page-2"));
        let group = p.group_by.unwrap().remove(0).into_definition();
        assert_eq!(group.r#type(), Some(&GroupDefinitionType::Tag));
        assert_eq!(group.key(), Some("team"));
    }

    #[test]
    fn test_dimension_values_accepts_every_input_field() {
        let p: GetDimensionValuesParams = decode_params(
            "getDimensionValues",
            json!({
                "SearchString": "Amazon",
                "TimePeriod": {"Start": "2024-01-01", "End": "2024-02-01"},
                "Dimension": "SERVICE",
                "Context": "COST_AND_USAGE",
                "Filter": {"Tags": {"Key": "env", "Values": ["prod"]}},
                "SortBy": [{"Key": "UnblendedCost", "SortOrder": "DESCENDING"}],
                "BillingViewArn": "arn:aws:billing::123456789012:billingview/primary",
                "MaxResults": 50,
                "NextPageToken": "page-2"
            }),
        )
        .unwrap();
        assert_eq!(p.search_string.as_deref(), Some("Amazon"));
        assert_eq!(p.context.as_deref(), Some("COST_AND_USAGE"));
        assert!(p.filter.is_some());
        assert!(p.billing_view_arn.is_some());
        assert_eq!(p.max_results, Some(50));
        assert_eq!(p.next_page_token.as_deref(), Some("page-2"));

        let sort = p.sort_by.unwrap().remove(0).into_definition().unwrap();
        assert_eq!(sort.key(), "UnblendedCost");
        assert_eq!(sort.sort_order(), Some(&SortOrder::Descending));
    }

    #[test]
    fn test_missing_time_period_is_invalid_argument() {
        let err = decode_params::<GetCostAndUsageParams>(
            "getCostAndUsage",
            json!({"Granularity": "DAILY", "Metrics": ["BlendedCost"]}),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
        assert!(err.to_string().contains("TimePeriod"));
    }

    #[test]
    fn test_nested_filter_expression() {
        let p: ExpressionParam = serde_json::from_value(json!({
            "And": [
                {"Dimensions": {"Key": "SERVICE", "Values": ["Amazon Simple Storage Service"]}},
                {"Not": {"Tags": {"Key": "env", "Values": ["dev"], "MatchOptions": ["EQUALS"]}}}
            ]
        }))
        .unwrap();
        let expr = p.into_expression();

        let and = expr.and();
        assert_eq!(and.len(), 2);
        let dims = and[0].dimensions().unwrap();
        assert_eq!(dims.key(), Some(&Dimension::Service));
        assert_eq!(dims.values(), ["Amazon Simple Storage Service".to_string()]);
        let tags = and[1].not().unwrap().tags().unwrap();
        assert_eq!(tags.key(), Some("env"));
        assert_eq!(tags.match_options(), [MatchOption::Equals]);
    }

    #[test]
    fn test_result_by_time_renders_every_field() {
        let result = ResultByTime::builder()
            .time_period(
                DateInterval::builder()
                    .start("2024-01-01")
                    .end("2024-01-02")
                    .build()
                    .unwrap(),
            )
            .total(
                "UnblendedCost",
                MetricValue::builder().amount("3.5").unit("USD").build(),
            )
            .groups(
                aws_sdk_costexplorer::types::Group::builder()
                    .keys("Amazon Simple Storage Service")
                    .metrics(
                        "UnblendedCost",
                        MetricValue::builder().amount("1.5").unit("USD").build(),
                    )
                    .build(),
            )
            .estimated(true)
            .build();

        assert_eq!(
            result_by_time_json(&result),
            json!({
                "TimePeriod": {"Start": "2024-01-01", "End": "2024-01-02"},
                "Total": {"UnblendedCost": {"Amount": "3.5", "Unit": "USD"}},
                "Groups": [{
                    "Keys": ["Amazon Simple Storage Service"],
                    "Metrics": {"UnblendedCost": {"Amount": "1.5", "Unit": "USD"}}
                }],
                "Estimated": true
            })
        );
    }

    #[test]
    fn test_group_definition_and_dimension_attributes_render() {
        let definition = GroupDefinition::builder()
            .r#type(GroupDefinitionType::Dimension)
            .key("SERVICE")
            .build();
        assert_eq!(
            group_definition_json(&definition),
            json!({"Type": "DIMENSION", "Key": "SERVICE"})
        );

        let value = DimensionValuesWithAttributes::builder()
            .value("123456789012")
            .attributes("description", "Production")
            .build();
        assert_eq!(
            dimension_value_json(&value),
            json!({"Value": "123456789012", "Attributes": {"description": "Production"}})
        );
    }

    #[test]
    fn test_cost_and_usage_keeps_dimension_value_attributes() {
        let output = GetCostAndUsageOutput::builder()
            .next_page_token("page-2")
            .dimension_value_attributes(
                DimensionValuesWithAttributes::builder()
                    .value("123456789012")
                    .attributes("description", "Production")
                    .build(),
            )
            .build();
        let rendered = cost_and_usage_json(&output);
        assert_eq!(rendered["NextPageToken"], "page-2");
        assert_eq!(rendered["GroupDefinitions"], json!([]));
        assert_eq!(rendered["ResultsByTime"], json!([]));
        assert_eq!(
            rendered["DimensionValueAttributes"],
            json!([{"Value": "123456789012", "Attributes": {"description": "Production"}}])
        );
    }

    #[test]
    fn test_metrics_json() {
        let mut metrics = HashMap::new();
        metrics.insert(
            "UnblendedCost".to_string(),
            MetricValue::builder().amount("12.5").unit("USD").build(),
        );
        assert_eq!(
            metrics_json(Some(&metrics)),
            json!({"UnblendedCost": {"Amount": "12.5", "Unit": "USD"}})
        );
        assert_eq!(metrics_json(None), JsonValue::Null);
    }
}
