//! Inbound CloudFormation request, declared resources and the physical
//! resource id that carries their identities between deployments.

use std::collections::HashSet;
use std::fmt;

use ctcfn_commercetools::{
    ChangeSubscription, ClientCredentials, ExtensionTrigger, MessageSubscription,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// Upper bound commercetools accepts for `timeoutInMs` on AWS Lambda destinations.
pub const MAX_EXTENSION_TIMEOUT_MS: u32 = 2000;

/// Remote key shared by every subscription and extension of one function.
pub fn resource_key(fn_name: &str) -> String {
    format!("ServerlessLambda_{fn_name}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// Fields needed to address an acknowledgement.
///
/// Decoded before anything else so that a request with broken properties
/// still gets its `FAILED` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Correlation {
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub stack_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub request_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub logical_resource_id: String,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub physical_resource_id: Option<String>,
}

/// Correlation fields are echoed back as strings whatever their JSON type;
/// only `ResponseURL` decides whether an event can be acknowledged.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_string(deserializer)?.unwrap_or_default())
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl Correlation {
    pub fn from_event(event: &Value) -> EngineResult<Self> {
        let correlation = Self::deserialize(event)
            .map_err(|e| EngineError::Undeliverable(format!("cannot read request envelope: {e}")))?;
        url::Url::parse(&correlation.response_url).map_err(|e| {
            EngineError::Undeliverable(format!("invalid ResponseURL: {e}"))
        })?;
        Ok(correlation)
    }

    /// Prior physical id as sent by CloudFormation, if any.
    pub fn prior_token(&self) -> Option<&str> {
        self.physical_resource_id
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawRequest {
    request_type: RequestType,
    #[serde(default)]
    resource_type: Option<String>,
    #[serde(default)]
    physical_resource_id: Option<String>,
    resource_properties: DesiredProperties,
}

/// What to do, with the prior identity already decoded for Update and Delete.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleOperation {
    Create,
    Update { prior: PhysicalResourceId },
    Delete { prior: PhysicalResourceId },
}

impl LifecycleOperation {
    pub fn request_type(&self) -> RequestType {
        match self {
            Self::Create => RequestType::Create,
            Self::Update { .. } => RequestType::Update,
            Self::Delete { .. } => RequestType::Delete,
        }
    }
}

/// A fully decoded lifecycle request.
#[derive(Debug, Clone)]
pub struct LifecycleRequest {
    pub resource_type: Option<String>,
    pub operation: LifecycleOperation,
    pub properties: DesiredProperties,
}

impl LifecycleRequest {
    pub fn decode(event: &Value) -> EngineResult<Self> {
        let raw = RawRequest::deserialize(event)
            .map_err(|e| EngineError::invalid_request(e.to_string()))?;
        raw.resource_properties.validate()?;

        let operation = match raw.request_type {
            RequestType::Create => LifecycleOperation::Create,
            RequestType::Update => LifecycleOperation::Update {
                prior: PhysicalResourceId::parse_required(raw.physical_resource_id.as_deref())?,
            },
            RequestType::Delete => LifecycleOperation::Delete {
                prior: PhysicalResourceId::parse_required(raw.physical_resource_id.as_deref())?,
            },
        };

        Ok(Self {
            resource_type: raw.resource_type,
            operation,
            properties: raw.resource_properties,
        })
    }
}

/// A credential that must not end up in logs.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Sensitive(String);

impl Sensitive {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Sensitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"***\"")
    }
}

/// `ResourceProperties` of the custom resource: the declared state of one function.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredProperties {
    pub fn_name: String,
    pub auth_host: String,
    pub api_host: String,
    pub project_key: String,
    pub client_id: String,
    pub client_secret: Sensitive,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionSpec>,
    #[serde(default)]
    pub extensions: Vec<ExtensionSpec>,
}

impl DesiredProperties {
    pub fn validate(&self) -> EngineResult<()> {
        if self.fn_name.is_empty() {
            return Err(EngineError::invalid_request("fnName must not be empty"));
        }
        for (index, ext) in self.extensions.iter().enumerate() {
            ext.validate()
                .map_err(|msg| EngineError::invalid_request(format!("extensions[{index}]: {msg}")))?;
        }
        Ok(())
    }

    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials {
            auth_host: self.auth_host.clone(),
            project_key: self.project_key.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.expose().to_string(),
        }
    }

    /// Declared resources in slot order: subscriptions first, then extensions.
    pub fn declared(&self) -> impl Iterator<Item = (usize, DeclaredResource<'_>)> {
        let subs = self
            .subscriptions
            .iter()
            .enumerate()
            .map(|(i, spec)| (i, DeclaredResource::Subscription(spec)));
        let exts = self
            .extensions
            .iter()
            .enumerate()
            .map(|(i, spec)| (i, DeclaredResource::Extension(spec)));
        subs.chain(exts)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    pub queue_url: String,
    pub queue_arn: String,
    pub access_key: String,
    pub secret_key: Sensitive,
    pub region: String,
    #[serde(default)]
    pub changes: Vec<ChangeSubscription>,
    #[serde(default)]
    pub messages: Vec<MessageSubscription>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSpec {
    pub lambda_arn: String,
    pub access_key: String,
    pub secret_key: Sensitive,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub timeout_in_ms: Option<u32>,
    pub triggers: Vec<ExtensionTrigger>,
}

impl ExtensionSpec {
    fn validate(&self) -> Result<(), String> {
        if let Some(timeout) = self.timeout_in_ms
            && !(1..=MAX_EXTENSION_TIMEOUT_MS).contains(&timeout)
        {
            return Err(format!(
                "timeoutInMs must be between 1 and {MAX_EXTENSION_TIMEOUT_MS}, got {timeout}"
            ));
        }
        for (index, trigger) in self.triggers.iter().enumerate() {
            let unique: HashSet<_> = trigger.actions.iter().collect();
            if trigger.actions.is_empty() || trigger.actions.len() > 2 {
                return Err(format!("triggers[{index}] must list one or two actions"));
            }
            if unique.len() != trigger.actions.len() {
                return Err(format!("triggers[{index}] lists an action twice"));
            }
        }
        Ok(())
    }
}

/// CloudFormation passes every scalar property as a string.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        Text(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => u32::try_from(n).map(Some).map_err(D::Error::custom),
        Some(NumberOrString::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid number '{s}': {e}"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Subscription,
    Extension,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscription => f.write_str("subscription"),
            Self::Extension => f.write_str("extension"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOperation {
    Create,
    Update,
}

impl fmt::Display for ReconcileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
        }
    }
}

/// One declared resource, discriminated once at the boundary.
#[derive(Debug, Clone, Copy)]
pub enum DeclaredResource<'a> {
    Subscription(&'a SubscriptionSpec),
    Extension(&'a ExtensionSpec),
}

impl DeclaredResource<'_> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Subscription(_) => ResourceKind::Subscription,
            Self::Extension(_) => ResourceKind::Extension,
        }
    }
}

/// Identity of one remote resource as last observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSlot {
    pub id: String,
    pub version: u64,
}

/// The only state the engine keeps, round-tripped through CloudFormation.
///
/// `subscriptions[i]` belongs to the i-th declared subscription, same for
/// extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalResourceId {
    #[serde(default)]
    pub subscriptions: Vec<ResourceSlot>,
    #[serde(default)]
    pub extensions: Vec<ResourceSlot>,
}

impl PhysicalResourceId {
    pub fn parse(token: &str) -> EngineResult<Self> {
        serde_json::from_str(token).map_err(|e| EngineError::MalformedPhysicalId(e.to_string()))
    }

    fn parse_required(token: Option<&str>) -> EngineResult<Self> {
        match token {
            Some(token) if !token.is_empty() => Self::parse(token),
            _ => Err(EngineError::MalformedPhysicalId(
                "PhysicalResourceId is required for Update and Delete".into(),
            )),
        }
    }

    pub fn slots(&self, kind: ResourceKind) -> &[ResourceSlot] {
        match kind {
            ResourceKind::Subscription => &self.subscriptions,
            ResourceKind::Extension => &self.extensions,
        }
    }

    pub fn slot(&self, kind: ResourceKind, index: usize) -> Option<&ResourceSlot> {
        self.slots(kind).get(index)
    }

    pub fn to_token(&self) -> String {
        serde_json::to_string(self).expect("physical resource id is plain data")
    }
}
