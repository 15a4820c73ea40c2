use serde::{Deserialize, Serialize};
use strum::Display;

/// An organization account that is part of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
}

/// Lifecycle status reported by AWS Organizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Suspended,
    PendingClosure,
    #[serde(other)]
    Unknown,
}

/// A raw account record as listed by the organization, before filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationAccount {
    pub id: String,
    pub name: String,
    pub status: AccountStatus,
}

/// An IAM Identity Center instance and the identity store backing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoInstance {
    pub instance_arn: String,
    pub identity_store_id: String,
}

/// Fields returned when describing an instance. All of them are optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceDescription {
    pub name: Option<String>,
    pub identity_store_id: Option<String>,
    pub owner_account_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PrincipalType {
    User,
    Group,
}

/// A principal bound to an (account, permission set) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAssignment {
    pub principal_type: PrincipalType,
    pub principal_id: String,
}

/// One line of the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentRow {
    pub account_id: String,
    pub account_name: String,
    pub permission_set_name: String,
    pub principal_type: PrincipalType,
    pub principal_name: String,
}
