use serde::{Deserialize, Serialize};

/// Subscribe to change notifications for a resource type (e.g. `product`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSubscription {
    pub resource_type_id: String,
}

/// Subscribe to messages of a resource type, optionally narrowed to message types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSubscription {
    pub resource_type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtensionAction {
    Create,
    Update,
}

/// When an API extension gets called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionTrigger {
    pub resource_type_id: String,
    pub actions: Vec<ExtensionAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Subscription destination delivering into an SQS queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsDestination {
    pub queue_url: String,
    pub access_key: String,
    pub access_secret: String,
    pub region: String,
}

/// Extension destination calling a Lambda function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsLambdaDestination {
    pub arn: String,
    pub access_key: String,
    pub access_secret: String,
}

/// Where commercetools delivers messages or calls out to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Destination {
    #[serde(rename = "SQS")]
    Sqs(SqsDestination),
    #[serde(rename = "AWSLambda")]
    AwsLambda(AwsLambdaDestination),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDraft {
    pub key: String,
    pub destination: Destination,
    pub changes: Vec<ChangeSubscription>,
    pub messages: Vec<MessageSubscription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionDraft {
    pub key: String,
    pub destination: Destination,
    pub triggers: Vec<ExtensionTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_in_ms: Option<u32>,
}

/// Subscription as returned by the API. Only the fields the reconcilers read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub version: u64,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub changes: Vec<ChangeSubscription>,
    #[serde(default)]
    pub messages: Vec<MessageSubscription>,
}

/// API extension as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub id: String,
    pub version: u64,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub triggers: Vec<ExtensionTrigger>,
    #[serde(default)]
    pub timeout_in_ms: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum SubscriptionUpdateAction {
    SetChanges { changes: Vec<ChangeSubscription> },
    SetMessages { messages: Vec<MessageSubscription> },
    ChangeDestination { destination: Destination },
    SetKey { key: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ExtensionUpdateAction {
    ChangeTriggers {
        triggers: Vec<ExtensionTrigger>,
    },
    ChangeDestination {
        destination: Destination,
    },
    SetKey {
        key: String,
    },
    SetTimeoutInMs {
        #[serde(
            rename = "timeoutInMs",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        timeout_in_ms: Option<u32>,
    },
}

/// Update request body: the version last observed plus the actions to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update<A> {
    pub version: u64,
    pub actions: Vec<A>,
}

pub type SubscriptionUpdate = Update<SubscriptionUpdateAction>;
pub type ExtensionUpdate = Update<ExtensionUpdateAction>;
