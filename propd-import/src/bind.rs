//! Binding resolved rows to typed records
//!
//! The last purely in-memory step: cleaned values plus resolved ids
//! become the model structs the store layer persists. Validation has
//! already run, so a missing required value here means validation was
//! disabled for the run; binding guards those holes itself.

use crate::entity::EntityKind;
use crate::types::{CleanedRow, ResolvedRow, RowError};
use propd_common::models::{
    FinancialTransaction, Lease, LeaseType, MaintenanceRequest, MaintenanceStatus,
    OutstandingBalance, Property, PropertyStatus, Tenant, User, UserRole,
};
use uuid::Uuid;

/// A bound record ready for the store
#[derive(Debug, Clone)]
pub enum TypedRecord {
    User(User),
    Property(Property),
    Tenant(Tenant),
    Lease(Lease),
    Maintenance(MaintenanceRequest),
    Transaction(FinancialTransaction),
    Balance(OutstandingBalance),
}

/// Bind one resolved row to its entity's record type
pub fn bind_record(entity: EntityKind, resolved: &ResolvedRow) -> Result<TypedRecord, RowError> {
    let row = &resolved.row;
    match entity {
        EntityKind::Users => bind_user(row),
        EntityKind::Properties => bind_property(resolved),
        EntityKind::Tenants => bind_tenant(resolved),
        EntityKind::Leases => bind_lease(resolved),
        EntityKind::Maintenance => bind_maintenance(resolved),
        EntityKind::Transactions => bind_transaction(resolved),
        EntityKind::Balances => bind_balance(resolved),
    }
}

fn bind_user(row: &CleanedRow) -> Result<TypedRecord, RowError> {
    let email = required_text(row, "email")?;
    let name = required_text(row, "name")?;
    let role = match row.get("role").as_text() {
        Some(token) => UserRole::parse(token)
            .ok_or_else(|| bind_error(row, "role", &format!("unknown role '{token}'")))?,
        None => UserRole::Owner,
    };

    let mut user = User::new(email, role, name);
    user.phone = opt_text(row, "phone");
    user.address = opt_text(row, "address");
    Ok(TypedRecord::User(user))
}

fn bind_property(resolved: &ResolvedRow) -> Result<TypedRecord, RowError> {
    let row = &resolved.row;
    let title = required_text(row, "title")?;
    let address_line1 = required_text(row, "address_line1")?;
    let owner_id = required_id(resolved, "owner_id")?;

    let mut property = Property::new(title, address_line1, owner_id);
    property.city = opt_text(row, "city");
    property.state = opt_text(row, "state");
    property.postal_code = opt_text(row, "postal_code");
    property.building_type = opt_text(row, "building_type");
    if let Some(token) = row.get("status").as_text() {
        property.status = PropertyStatus::parse(token)
            .ok_or_else(|| bind_error(row, "status", &format!("unknown status '{token}'")))?;
    }
    if let Some(rent) = row.get("rent").as_number() {
        property.rent = rent;
    }
    Ok(TypedRecord::Property(property))
}

fn bind_tenant(resolved: &ResolvedRow) -> Result<TypedRecord, RowError> {
    let row = &resolved.row;
    let name = required_text(row, "name")?;

    let mut tenant = Tenant::new(name);
    tenant.email = opt_text(row, "email");
    tenant.phone = opt_text(row, "phone");
    tenant.property_id = resolved.resolved.get("property_id").copied();
    tenant.lease_start = row.get("lease_start").as_date();
    tenant.lease_end = row.get("lease_end").as_date();
    Ok(TypedRecord::Tenant(tenant))
}

fn bind_lease(resolved: &ResolvedRow) -> Result<TypedRecord, RowError> {
    let row = &resolved.row;
    let tenant_id = required_id(resolved, "tenant_id")?;
    let property_id = required_id(resolved, "property_id")?;
    let start_date = row
        .get("start_date")
        .as_date()
        .ok_or_else(|| bind_error(row, "start_date", "start date is required"))?;
    let end_date = row
        .get("end_date")
        .as_date()
        .ok_or_else(|| bind_error(row, "end_date", "end date is required"))?;
    let rent = row.get("rent").as_number().unwrap_or(0.0);
    let lease_type = match row.get("lease_type").as_text() {
        Some(token) => LeaseType::parse(token)
            .ok_or_else(|| bind_error(row, "lease_type", &format!("unknown lease type '{token}'")))?,
        None => LeaseType::FixedTerm,
    };

    let mut lease = Lease::new(tenant_id, property_id, start_date, end_date, rent, lease_type);
    if let Some(status) = opt_text(row, "status") {
        lease.status = status;
    }
    Ok(TypedRecord::Lease(lease))
}

fn bind_maintenance(resolved: &ResolvedRow) -> Result<TypedRecord, RowError> {
    let row = &resolved.row;
    let property_id = required_id(resolved, "property_id")?;
    let title = required_text(row, "title")?;

    let mut request = MaintenanceRequest::new(property_id, title);
    request.tenant_id = resolved.resolved.get("tenant_id").copied();
    request.vendor_id = resolved.resolved.get("vendor_id").copied();
    request.description = opt_text(row, "description");
    if let Some(token) = row.get("status").as_text() {
        request.status = MaintenanceStatus::parse(token)
            .ok_or_else(|| bind_error(row, "status", &format!("unknown status '{token}'")))?;
    }
    request.priority = opt_text(row, "priority");
    request.estimated_cost = row.get("estimated_cost").as_number();
    request.actual_cost = row.get("actual_cost").as_number();
    request.completion_date = row.get("completion_date").as_date();
    Ok(TypedRecord::Maintenance(request))
}

fn bind_transaction(resolved: &ResolvedRow) -> Result<TypedRecord, RowError> {
    let row = &resolved.row;
    let property_id = required_id(resolved, "property_id")?;
    let date = row
        .get("transaction_date")
        .as_date()
        .ok_or_else(|| bind_error(row, "transaction_date", "transaction date is required"))?;
    let kind = required_text(row, "transaction_type")?;
    let amount = row
        .get("amount")
        .as_number()
        .ok_or_else(|| bind_error(row, "amount", "amount is required"))?;

    let mut tx = FinancialTransaction::new(property_id, date, kind, amount);
    tx.category = opt_text(row, "category");
    tx.description = opt_text(row, "description");
    Ok(TypedRecord::Transaction(tx))
}

fn bind_balance(resolved: &ResolvedRow) -> Result<TypedRecord, RowError> {
    let row = &resolved.row;
    let tenant_id = required_id(resolved, "tenant_id")?;
    let property_id = required_id(resolved, "property_id")?;
    let amount_due = row
        .get("amount_due")
        .as_number()
        .ok_or_else(|| bind_error(row, "amount_due", "amount due is required"))?;
    let due_date = row
        .get("due_date")
        .as_date()
        .ok_or_else(|| bind_error(row, "due_date", "due date is required"))?;

    let mut balance = OutstandingBalance::new(tenant_id, property_id, amount_due, due_date);
    if let Some(flag) = row.get("resolved").as_bool() {
        balance.resolved = flag;
    }
    Ok(TypedRecord::Balance(balance))
}

fn required_text(row: &CleanedRow, field: &str) -> Result<String, RowError> {
    row.get(field)
        .as_text()
        .map(str::to_string)
        .ok_or_else(|| bind_error(row, field, &format!("{field} is required")))
}

fn opt_text(row: &CleanedRow, field: &str) -> Option<String> {
    row.get(field).as_text().map(str::to_string)
}

fn required_id(resolved: &ResolvedRow, fk: &str) -> Result<Uuid, RowError> {
    resolved
        .resolved
        .get(fk)
        .copied()
        .ok_or_else(|| bind_error(&resolved.row, fk, &format!("{fk} did not resolve")))
}

fn bind_error(row: &CleanedRow, field: &str, message: &str) -> RowError {
    RowError {
        line: row.line,
        field: field.to_string(),
        rule: "bind".to_string(),
        message: message.to_string(),
        raw_value: row.raw_value(field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CleanedValue;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn resolved_row(
        fields: &[(&str, CleanedValue)],
        ids: &[(&str, Uuid)],
    ) -> ResolvedRow {
        let mut map = BTreeMap::new();
        let mut raw = BTreeMap::new();
        for (field, value) in fields {
            raw.insert(field.to_string(), value.display());
            map.insert(field.to_string(), value.clone());
        }
        ResolvedRow {
            row: CleanedRow {
                line: 1,
                fields: map,
                raw,
            },
            resolved: ids.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            expected_update: false,
        }
    }

    fn text(s: &str) -> CleanedValue {
        CleanedValue::Text(s.to_string())
    }

    #[test]
    fn test_bind_property() {
        let owner = Uuid::new_v4();
        let resolved = resolved_row(
            &[
                ("title", text("Maple House")),
                ("address_line1", text("12 Maple St")),
                ("state", text("TX")),
                ("rent", CleanedValue::Money(1800.0)),
                ("status", text("occupied")),
            ],
            &[("owner_id", owner)],
        );
        let TypedRecord::Property(p) = bind_record(EntityKind::Properties, &resolved).unwrap()
        else {
            panic!("wrong record type");
        };
        assert_eq!(p.title, "Maple House");
        assert_eq!(p.state.as_deref(), Some("TX"));
        assert_eq!(p.rent, 1800.0);
        assert_eq!(p.status, PropertyStatus::Occupied);
        assert_eq!(p.owner_id, owner);
    }

    #[test]
    fn test_bind_lease_defaults() {
        let tenant = Uuid::new_v4();
        let property = Uuid::new_v4();
        let resolved = resolved_row(
            &[
                (
                    "start_date",
                    CleanedValue::DateOnly(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
                ),
                (
                    "end_date",
                    CleanedValue::DateOnly(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()),
                ),
            ],
            &[("tenant_id", tenant), ("property_id", property)],
        );
        let TypedRecord::Lease(lease) = bind_record(EntityKind::Leases, &resolved).unwrap() else {
            panic!("wrong record type");
        };
        assert_eq!(lease.lease_type, LeaseType::FixedTerm);
        assert_eq!(lease.status, "active");
        assert_eq!(lease.rent, 0.0);
    }

    #[test]
    fn test_bind_reports_unresolved_fk() {
        let resolved = resolved_row(
            &[
                ("property_title", text("Unknown")),
                ("transaction_date", text("not cleaned")),
            ],
            &[],
        );
        let err = bind_record(EntityKind::Transactions, &resolved).unwrap_err();
        assert_eq!(err.field, "property_id");
        assert_eq!(err.rule, "bind");
    }

    #[test]
    fn test_bind_balance_resolved_flag() {
        let resolved = resolved_row(
            &[
                ("amount_due", CleanedValue::Money(450.0)),
                (
                    "due_date",
                    CleanedValue::DateOnly(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()),
                ),
                ("resolved", CleanedValue::Bool(true)),
            ],
            &[("tenant_id", Uuid::new_v4()), ("property_id", Uuid::new_v4())],
        );
        let TypedRecord::Balance(b) = bind_record(EntityKind::Balances, &resolved).unwrap() else {
            panic!("wrong record type");
        };
        assert!(b.resolved);
    }
}
