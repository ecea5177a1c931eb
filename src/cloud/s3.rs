//! Amazon S3 operations.

use super::{CloudClient, api_error, decode_params, timestamp, unknown_operation};
use crate::error::ToolResult;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::operation::get_bucket_location::GetBucketLocationOutput;
use aws_sdk_s3::operation::list_buckets::ListBucketsOutput;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::types::{
    Bucket, EncodingType, Object, OptionalObjectAttributes, Owner, RequestPayer,
};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

pub const SERVICE_NAME: &str = "S3";

pub const OPERATIONS: &[&str] = &["listBuckets", "listObjectsV2", "getBucketLocation"];

pub fn client(config: &SdkConfig) -> Arc<dyn CloudClient> {
    Arc::new(S3Service {
        client: aws_sdk_s3::Client::new(config),
    })
}

// =============================================================================
// Parameter shapes
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct ListBucketsParams {
    #[serde(default)]
    max_buckets: Option<i32>,
    #[serde(default)]
    continuation_token: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    bucket_region: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct ListObjectsV2Params {
    bucket: String,
    #[serde(default)]
    delimiter: Option<String>,
    #[serde(default)]
    encoding_type: Option<String>,
    #[serde(default)]
    max_keys: Option<i32>,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    continuation_token: Option<String>,
    #[serde(default)]
    fetch_owner: Option<bool>,
    #[serde(default)]
    start_after: Option<String>,
    #[serde(default)]
    request_payer: Option<String>,
    #[serde(default)]
    expected_bucket_owner: Option<String>,
    #[serde(default)]
    optional_object_attributes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct GetBucketLocationParams {
    bucket: String,
    #[serde(default)]
    expected_bucket_owner: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

struct S3Service {
    client: aws_sdk_s3::Client,
}

impl S3Service {
    async fn list_buckets(&self, params: JsonValue) -> ToolResult<JsonValue> {
        let p: ListBucketsParams = decode_params("listBuckets", params)?;
        let output = self
            .client
            .list_buckets()
            .set_max_buckets(p.max_buckets)
            .set_continuation_token(p.continuation_token)
            .set_prefix(p.prefix)
            .set_bucket_region(p.bucket_region)
            .send()
            .await
            .map_err(|e| api_error(SERVICE_NAME, "listBuckets", e))?;
        Ok(list_buckets_json(&output))
    }

    async fn list_objects_v2(&self, params: JsonValue) -> ToolResult<JsonValue> {
        let p: ListObjectsV2Params = decode_params("listObjectsV2", params)?;
        let optional_attributes = p.optional_object_attributes.map(|attrs| {
            attrs
                .iter()
                .map(|a| OptionalObjectAttributes::from(a.as_str()))
                .collect::<Vec<_>>()
        });
        let output = self
            .client
            .list_objects_v2()
            .bucket(p.bucket)
            .set_delimiter(p.delimiter)
            .set_encoding_type(p.encoding_type.as_deref().map(EncodingType::from))
            .set_max_keys(p.max_keys)
            .set_prefix(p.prefix)
            .set_continuation_token(p.continuation_token)
            .set_fetch_owner(p.fetch_owner)
            .set_start_after(p.start_after)
            .set_request_payer(p.request_payer.as_deref().map(RequestPayer::from))
            .set_expected_bucket_owner(p.expected_bucket_owner)
            .set_optional_object_attributes(optional_attributes)
            .send()
            .await
            .map_err(|e| api_error(SERVICE_NAME, "listObjectsV2", e))?;
        Ok(list_objects_v2_json(&output))
    }

    async fn get_bucket_location(&self, params: JsonValue) -> ToolResult<JsonValue> {
        let p: GetBucketLocationParams = decode_params("getBucketLocation", params)?;
        let output = self
            .client
            .get_bucket_location()
            .bucket(p.bucket)
            .set_expected_bucket_owner(p.expected_bucket_owner)
            .send()
            .await
            .map_err(|e| api_error(SERVICE_NAME, "getBucketLocation", e))?;
        Ok(bucket_location_json(&output))
    }
}

#[async_trait]
impl CloudClient for S3Service {
    async fn call(&self, operation: &str, params: JsonValue) -> ToolResult<JsonValue> {
        match operation {
            "listBuckets" => self.list_buckets(params).await,
            "listObjectsV2" => self.list_objects_v2(params).await,
            "getBucketLocation" => self.get_bucket_location(params).await,
            other => Err(unknown_operation(SERVICE_NAME, other)),
        }
    }
}

// =============================================================================
// Response shapes
// =============================================================================

fn owner_json(owner: &Owner) -> JsonValue {
    json!({ "DisplayName": owner.display_name(), "ID": owner.id() })
}

fn bucket_json(bucket: &Bucket) -> JsonValue {
    json!({
        "Name": bucket.name(),
        "CreationDate": timestamp(bucket.creation_date()),
        "BucketRegion": bucket.bucket_region(),
    })
}

fn list_buckets_json(output: &ListBucketsOutput) -> JsonValue {
    let buckets: Vec<JsonValue> = output.buckets().iter().map(bucket_json).collect();
    json!({
        "Buckets": buckets,
        "Owner": output.owner().map(owner_json),
        "ContinuationToken": output.continuation_token(),
        "Prefix": output.prefix(),
    })
}

fn object_json(object: &Object) -> JsonValue {
    let checksum_algorithms: Vec<&str> = object
        .checksum_algorithm()
        .iter()
        .map(|a| a.as_str())
        .collect();
    let restore_status = object.restore_status().map(|s| {
        json!({
            "IsRestoreInProgress": s.is_restore_in_progress(),
            "RestoreExpiryDate": timestamp(s.restore_expiry_date()),
        })
    });
    json!({
        "Key": object.key(),
        "LastModified": timestamp(object.last_modified()),
        "ETag": object.e_tag(),
        "ChecksumAlgorithm": checksum_algorithms,
        "ChecksumType": object.checksum_type().map(|t| t.as_str()),
        "Size": object.size(),
        "StorageClass": object.storage_class().map(|c| c.as_str()),
        "Owner": object.owner().map(owner_json),
        "RestoreStatus": restore_status,
    })
}

fn list_objects_v2_json(output: &ListObjectsV2Output) -> JsonValue {
    let contents: Vec<JsonValue> = output.contents().iter().map(object_json).collect();
    let common_prefixes: Vec<JsonValue> = output
        .common_prefixes()
        .iter()
        .map(|p| json!({ "Prefix": p.prefix() }))
        .collect();
    json!({
        "IsTruncated": output.is_truncated(),
        "Contents": contents,
        "Name": output.name(),
        "Prefix": output.prefix(),
        "Delimiter": output.delimiter(),
        "MaxKeys": output.max_keys(),
        "CommonPrefixes": common_prefixes,
        "EncodingType": output.encoding_type().map(|e| e.as_str()),
        "KeyCount": output.key_count(),
        "ContinuationToken": output.continuation_token(),
        "NextContinuationToken": output.next_continuation_token(),
        "StartAfter": output.start_after(),
        "RequestCharged": output.request_charged().map(|r| r.as_str()),
    })
}

fn bucket_location_json(output: &GetBucketLocationOutput) -> JsonValue {
    // us-east-1 buckets report an empty constraint
    let location = output
        .location_constraint()
        .map(|c| c.as_str())
        .unwrap_or_default();
    json!({ "LocationConstraint": location })
}
