//! Entity catalog for the ingestion pipeline
//!
//! Canonical field names per entity, the file-level natural keys used for
//! in-file duplicate detection, and the table names behind each entity.
//! Field mappings in the configuration are validated against this catalog.

use serde::{Deserialize, Serialize};

/// The seven importable entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Users,
    Properties,
    Tenants,
    Leases,
    Maintenance,
    Transactions,
    Balances,
}

impl EntityKind {
    /// All kinds, in the order they appear in reports and snapshots
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Users,
            EntityKind::Properties,
            EntityKind::Tenants,
            EntityKind::Leases,
            EntityKind::Maintenance,
            EntityKind::Transactions,
            EntityKind::Balances,
        ]
    }

    /// Report / config string form
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Users => "users",
            EntityKind::Properties => "properties",
            EntityKind::Tenants => "tenants",
            EntityKind::Leases => "leases",
            EntityKind::Maintenance => "maintenance_requests",
            EntityKind::Transactions => "financial_transactions",
            EntityKind::Balances => "outstanding_balances",
        }
    }

    /// Backing table name (identical to `as_str` by construction)
    pub fn table_name(&self) -> &'static str {
        self.as_str()
    }

    /// Canonical field names the cleaned row may carry for this entity
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Users => &["email", "name", "role", "phone", "address"],
            EntityKind::Properties => &[
                "title",
                "address_line1",
                "city",
                "state",
                "postal_code",
                "building_type",
                "status",
                "rent",
                "owner_email",
            ],
            EntityKind::Tenants => &[
                "name",
                "email",
                "phone",
                "property_title",
                "property_address",
                "lease_start",
                "lease_end",
            ],
            EntityKind::Leases => &[
                "tenant_email",
                "property_title",
                "property_address",
                "start_date",
                "end_date",
                "rent",
                "lease_type",
                "status",
            ],
            EntityKind::Maintenance => &[
                "property_title",
                "property_address",
                "tenant_email",
                "vendor_email",
                "title",
                "description",
                "status",
                "priority",
                "estimated_cost",
                "actual_cost",
                "completion_date",
            ],
            EntityKind::Transactions => &[
                "property_title",
                "property_address",
                "transaction_date",
                "transaction_type",
                "amount",
                "category",
                "description",
            ],
            EntityKind::Balances => &[
                "tenant_email",
                "property_title",
                "property_address",
                "amount_due",
                "due_date",
                "resolved",
            ],
        }
    }

    /// File-level natural key columns, used for in-file duplicate
    /// detection before foreign keys are resolved. Empty for insert-only
    /// entities.
    pub fn file_natural_key(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Users => &["email"],
            EntityKind::Properties => &["title", "address_line1"],
            EntityKind::Tenants => &["email"],
            EntityKind::Leases => &["tenant_email", "property_title", "start_date"],
            EntityKind::Maintenance => &[],
            EntityKind::Transactions => &[
                "property_title",
                "transaction_date",
                "transaction_type",
                "amount",
            ],
            EntityKind::Balances => &["tenant_email", "property_title", "due_date"],
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_keys_are_declared_fields() {
        for kind in EntityKind::all() {
            for key in kind.file_natural_key() {
                assert!(
                    kind.fields().contains(key),
                    "{kind}: natural key column {key} missing from field catalog"
                );
            }
        }
    }
}
