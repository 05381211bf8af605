//! DynamoDB-backed item store.

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use serde_json::{Number, Value};
use std::collections::HashMap;

use super::{Document, Filter, ItemStore, Key, Page};
use crate::{Error, Result};

/// Item store talking to DynamoDB through the AWS SDK.
#[derive(Clone)]
pub struct DynamoStore {
    client: DynamoClient,
}

impl DynamoStore {
    pub fn new(client: DynamoClient) -> Self {
        Self { client }
    }
}

fn store_error<E: std::error::Error>(action: &str, err: E) -> Error {
    Error::Store(format!("{} failed: {}", action, DisplayErrorContext(err)))
}

fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => AttributeValue::L(values.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(to_attributes(map)),
    }
}

fn to_attributes(doc: &Document) -> HashMap<String, AttributeValue> {
    doc.iter()
        .map(|(name, value)| (name.clone(), to_attribute(value)))
        .collect()
}

fn parse_number(n: &str) -> Value {
    if let Ok(i) = n.parse::<i64>() {
        return Value::from(i);
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(n.to_string()))
}

fn from_attribute(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => parse_number(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::L(values) => Value::Array(values.iter().map(from_attribute).collect()),
        AttributeValue::M(map) => Value::Object(from_attributes(map)),
        AttributeValue::Ss(values) => Value::Array(values.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(values) => Value::Array(values.iter().map(|n| parse_number(n)).collect()),
        // Binary attributes are never written by the calendar handlers.
        _ => Value::Null,
    }
}

fn from_attributes(item: &HashMap<String, AttributeValue>) -> Document {
    item.iter()
        .map(|(name, value)| (name.clone(), from_attribute(value)))
        .collect()
}

fn to_page(
    items: &[HashMap<String, AttributeValue>],
    last_key: Option<&HashMap<String, AttributeValue>>,
) -> Page {
    Page {
        items: items.iter().map(from_attributes).collect(),
        cursor: last_key.map(from_attributes),
    }
}

#[async_trait]
impl ItemStore for DynamoStore {
    async fn get_item(&self, table: &str, key: &Key) -> Result<Option<Document>> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .key(&key.attribute, AttributeValue::S(key.value.clone()))
            .send()
            .await
            .map_err(|e| store_error("GetItem", e))?;

        Ok(output.item().map(from_attributes))
    }

    async fn put_item(&self, table: &str, item: Document) -> Result<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(to_attributes(&item)))
            .send()
            .await
            .map_err(|e| store_error("PutItem", e))?;
        Ok(())
    }

    async fn update_item(&self, table: &str, key: &Key, fields: Document) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }

        // Placeholders for every attribute: `name`, `type` and `Date` are reserved words.
        let mut assignments = Vec::with_capacity(fields.len());
        let mut request = self
            .client
            .update_item()
            .table_name(table)
            .key(&key.attribute, AttributeValue::S(key.value.clone()));

        for (i, (name, value)) in fields.iter().enumerate() {
            assignments.push(format!("#f{i} = :v{i}"));
            request = request
                .expression_attribute_names(format!("#f{i}"), name)
                .expression_attribute_values(format!(":v{i}"), to_attribute(value));
        }

        request
            .update_expression(format!("SET {}", assignments.join(", ")))
            .send()
            .await
            .map_err(|e| store_error("UpdateItem", e))?;
        Ok(())
    }

    async fn delete_item(&self, table: &str, key: &Key) -> Result<()> {
        self.client
            .delete_item()
            .table_name(table)
            .key(&key.attribute, AttributeValue::S(key.value.clone()))
            .send()
            .await
            .map_err(|e| store_error("DeleteItem", e))?;
        Ok(())
    }

    async fn query_index(
        &self,
        table: &str,
        index: &str,
        attribute: &str,
        value: &str,
    ) -> Result<Page> {
        let output = self
            .client
            .query()
            .table_name(table)
            .index_name(index)
            .key_condition_expression("#k = :v")
            .expression_attribute_names("#k", attribute)
            .expression_attribute_values(":v", AttributeValue::S(value.to_string()))
            .send()
            .await
            .map_err(|e| store_error("Query", e))?;

        Ok(to_page(output.items(), output.last_evaluated_key()))
    }

    async fn scan(
        &self,
        table: &str,
        filter: Option<&Filter>,
        start: Option<Document>,
    ) -> Result<Page> {
        let mut request = self
            .client
            .scan()
            .table_name(table)
            .set_exclusive_start_key(start.as_ref().map(to_attributes));

        match filter {
            Some(Filter::Equals { attribute, value }) => {
                request = request
                    .filter_expression("#a = :v")
                    .expression_attribute_names("#a", attribute)
                    .expression_attribute_values(":v", to_attribute(value));
            }
            Some(Filter::Between {
                attribute,
                low,
                high,
            }) => {
                request = request
                    .filter_expression("#a BETWEEN :lo AND :hi")
                    .expression_attribute_names("#a", attribute)
                    .expression_attribute_values(":lo", AttributeValue::S(low.clone()))
                    .expression_attribute_values(":hi", AttributeValue::S(high.clone()));
            }
            None => {}
        }

        let output = request.send().await.map_err(|e| store_error("Scan", e))?;

        Ok(to_page(output.items(), output.last_evaluated_key()))
    }
}
