//! Ingestion configuration bundle
//!
//! Compiled defaults cover the seven entities; a TOML file can override
//! run settings, per-entity parent policies, and header aliases. The
//! bundle is validated up front: a mapping that references a field the
//! entity catalog does not declare is a fatal `ConfigurationInvalid`.

use crate::clean::CleanerKind;
use crate::entity::EntityKind;
use crate::error::{ImportError, ImportResult};
use crate::validate::{FieldRule, RuleKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What to do when a foreign key has no matching parent row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentPolicy {
    /// Create the parent with defaults and continue
    AutoCreate,
    /// Record a resolution error for the row
    FailRow,
}

/// Retry policy for transient store errors
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub growth: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(100),
            growth: 2,
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before the given retry (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.growth.saturating_pow(retry);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Per-entity field mapping and processing rules
#[derive(Debug, Clone)]
pub struct EntityMapping {
    pub entity: EntityKind,
    /// Lowercase filename substrings that hint at this entity
    pub filename_tokens: Vec<String>,
    /// Canonical columns that must all be present for a match
    pub required_columns: Vec<String>,
    /// Canonical field -> accepted header spellings (normalized lowercase)
    pub aliases: BTreeMap<String, Vec<String>>,
    /// Canonical field -> cleaning function
    pub cleaners: BTreeMap<String, CleanerKind>,
    pub rules: Vec<FieldRule>,
    pub parent_policy: ParentPolicy,
}

impl EntityMapping {
    /// Map a normalized header to its canonical field, if declared
    pub fn canonical_field(&self, header: &str) -> Option<&str> {
        for (field, spellings) in &self.aliases {
            if field == header || spellings.iter().any(|s| s == header) {
                return Some(field);
            }
        }
        None
    }
}

/// The full configuration bundle for one migration run
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub batch_size: usize,
    /// Commit every K batches (transaction spans K batches)
    pub commit_every: usize,
    pub max_errors_per_file: usize,
    /// Run-wide error threshold; crossing it aborts the run
    pub max_errors: usize,
    pub dry_run: bool,
    pub cleaning: bool,
    pub validation: bool,
    pub snapshot: bool,
    pub snapshot_dir: PathBuf,
    /// Keep the newest N snapshot runs
    pub snapshot_retain: usize,
    /// Record unclassifiable files instead of failing the run
    pub skip_unmatched: bool,
    pub retry: RetryPolicy,
    pub mappings: Vec<EntityMapping>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            commit_every: 1,
            max_errors_per_file: 50,
            max_errors: 200,
            dry_run: false,
            cleaning: true,
            validation: true,
            snapshot: true,
            snapshot_dir: propd_common::config::default_data_dir().join("backups"),
            snapshot_retain: 5,
            skip_unmatched: false,
            retry: RetryPolicy::default(),
            mappings: default_mappings(),
        }
    }
}

impl ImportConfig {
    /// Validate internal consistency against the entity catalog
    pub fn validate(&self) -> ImportResult<()> {
        if self.batch_size == 0 {
            return Err(ImportError::ConfigurationInvalid(
                "batch_size must be > 0".to_string(),
            ));
        }
        if self.commit_every == 0 {
            return Err(ImportError::ConfigurationInvalid(
                "commit_every must be > 0".to_string(),
            ));
        }

        for mapping in &self.mappings {
            let known = mapping.entity.fields();
            let check = |field: &str, what: &str| -> ImportResult<()> {
                if !known.contains(&field) {
                    return Err(ImportError::ConfigurationInvalid(format!(
                        "{}: {what} references unknown field '{field}'",
                        mapping.entity
                    )));
                }
                Ok(())
            };

            for field in &mapping.required_columns {
                check(field, "required column")?;
            }
            for field in mapping.aliases.keys() {
                check(field, "alias")?;
            }
            for field in mapping.cleaners.keys() {
                check(field, "cleaner")?;
            }
            for rule in &mapping.rules {
                check(&rule.field, "validation rule")?;
            }
        }

        Ok(())
    }

    /// Look up the mapping for an entity
    pub fn mapping_for(&self, entity: EntityKind) -> Option<&EntityMapping> {
        self.mappings.iter().find(|m| m.entity == entity)
    }

    /// Apply overrides from a TOML file onto this bundle
    pub fn apply_overrides(&mut self, path: &Path) -> ImportResult<()> {
        let contents = std::fs::read_to_string(path)?;
        let file: OverrideFile = toml::from_str(&contents)
            .map_err(|e| ImportError::ConfigurationInvalid(format!("{}: {e}", path.display())))?;

        if let Some(v) = file.batch_size {
            self.batch_size = v;
        }
        if let Some(v) = file.commit_every {
            self.commit_every = v;
        }
        if let Some(v) = file.max_errors_per_file {
            self.max_errors_per_file = v;
        }
        if let Some(v) = file.max_errors {
            self.max_errors = v;
        }
        if let Some(v) = file.snapshot_retain {
            self.snapshot_retain = v;
        }
        if let Some(v) = file.skip_unmatched {
            self.skip_unmatched = v;
        }

        for (name, overrides) in file.entities {
            let entity = match name.as_str() {
                "users" => EntityKind::Users,
                "properties" => EntityKind::Properties,
                "tenants" => EntityKind::Tenants,
                "leases" => EntityKind::Leases,
                "maintenance_requests" => EntityKind::Maintenance,
                "financial_transactions" => EntityKind::Transactions,
                "outstanding_balances" => EntityKind::Balances,
                other => {
                    return Err(ImportError::ConfigurationInvalid(format!(
                        "unknown entity '{other}' in {}",
                        path.display()
                    )))
                }
            };
            let Some(mapping) = self.mappings.iter_mut().find(|m| m.entity == entity) else {
                return Err(ImportError::ConfigurationInvalid(format!(
                    "no compiled mapping for {entity}"
                )));
            };

            if let Some(policy) = overrides.parent_policy {
                mapping.parent_policy = policy;
            }
            for (field, mut spellings) in overrides.aliases {
                mapping
                    .aliases
                    .entry(field)
                    .or_default()
                    .append(&mut spellings);
            }
            if let Some(tokens) = overrides.filename_tokens {
                mapping.filename_tokens = tokens;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct OverrideFile {
    batch_size: Option<usize>,
    commit_every: Option<usize>,
    max_errors_per_file: Option<usize>,
    max_errors: Option<usize>,
    snapshot_retain: Option<usize>,
    skip_unmatched: Option<bool>,
    #[serde(default)]
    entities: BTreeMap<String, EntityOverride>,
}

#[derive(Debug, Deserialize)]
struct EntityOverride {
    parent_policy: Option<ParentPolicy>,
    #[serde(default)]
    aliases: BTreeMap<String, Vec<String>>,
    filename_tokens: Option<Vec<String>>,
}

fn aliases(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(field, spellings)| {
            (
                field.to_string(),
                spellings.iter().map(|s| s.to_string()).collect(),
            )
        })
        .collect()
}

fn cleaners(entries: &[(&str, CleanerKind)]) -> BTreeMap<String, CleanerKind> {
    entries
        .iter()
        .map(|(field, kind)| (field.to_string(), kind.clone()))
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Compiled default mappings for the seven entities
pub fn default_mappings() -> Vec<EntityMapping> {
    vec![
        EntityMapping {
            entity: EntityKind::Users,
            filename_tokens: strings(&["owner", "user", "vendor", "admin"]),
            required_columns: strings(&["email", "name"]),
            aliases: aliases(&[
                ("email", &["email", "e-mail", "email address"]),
                ("name", &["name", "full name", "owner name", "contact name"]),
                ("role", &["role", "user role", "account type"]),
                ("phone", &["phone", "phone number", "telephone"]),
                ("address", &["address", "mailing address"]),
            ]),
            cleaners: cleaners(&[
                ("email", CleanerKind::Email),
                ("name", CleanerKind::Text),
                ("role", CleanerKind::Token),
                ("phone", CleanerKind::Phone),
                ("address", CleanerKind::Address),
            ]),
            rules: vec![
                FieldRule::new("email", RuleKind::Required),
                FieldRule::new("email", RuleKind::email_regex()),
                FieldRule::new("name", RuleKind::Required),
                FieldRule::new(
                    "role",
                    RuleKind::OneOf(strings(&["owner", "tenant", "vendor", "admin"])),
                ),
            ],
            parent_policy: ParentPolicy::FailRow,
        },
        EntityMapping {
            entity: EntityKind::Properties,
            filename_tokens: strings(&["propert", "listing", "unit"]),
            required_columns: strings(&["title", "address_line1"]),
            aliases: aliases(&[
                ("title", &["property name", "title", "name"]),
                (
                    "address_line1",
                    &["address 1", "address line 1", "address", "street address"],
                ),
                ("city", &["city/locality", "city", "locality"]),
                ("state", &["state/province", "state", "province"]),
                (
                    "postal_code",
                    &["postal code", "zip", "zip code", "postcode"],
                ),
                ("rent", &["rent", "monthly rent", "rent amount"]),
                ("status", &["status"]),
                ("building_type", &["building type", "property type"]),
                ("owner_email", &["owner email", "owner"]),
            ]),
            cleaners: cleaners(&[
                ("title", CleanerKind::Text),
                ("address_line1", CleanerKind::Address),
                ("city", CleanerKind::City),
                ("state", CleanerKind::State),
                ("postal_code", CleanerKind::Postal),
                ("rent", CleanerKind::Money),
                ("status", CleanerKind::Token),
                ("building_type", CleanerKind::BuildingType),
                ("owner_email", CleanerKind::Email),
            ]),
            rules: vec![
                FieldRule::new("title", RuleKind::Required),
                FieldRule::new("address_line1", RuleKind::Required),
                FieldRule::new(
                    "rent",
                    RuleKind::Decimal {
                        precision: 10,
                        scale: 2,
                    },
                ),
                FieldRule::new(
                    "rent",
                    RuleKind::Range {
                        min: Some(0.0),
                        max: None,
                    },
                ),
                FieldRule::new(
                    "status",
                    RuleKind::OneOf(strings(&["available", "occupied", "maintenance"])),
                ),
                FieldRule::new("owner_email", RuleKind::email_regex()),
            ],
            // Missing owner rows are created with defaults; the acting
            // principal is used when no owner column exists at all
            parent_policy: ParentPolicy::AutoCreate,
        },
        EntityMapping {
            entity: EntityKind::Tenants,
            filename_tokens: strings(&["tenant", "resident"]),
            required_columns: strings(&["name"]),
            aliases: aliases(&[
                ("name", &["name", "full name", "tenant name"]),
                ("email", &["email", "e-mail", "email address"]),
                ("phone", &["phone", "phone number", "telephone"]),
                ("property_title", &["property name", "property"]),
                ("property_address", &["property address", "address 1"]),
                (
                    "lease_start",
                    &["lease start", "lease start date", "start date"],
                ),
                ("lease_end", &["lease end", "lease end date", "end date"]),
            ]),
            cleaners: cleaners(&[
                ("name", CleanerKind::Text),
                ("email", CleanerKind::Email),
                ("phone", CleanerKind::Phone),
                ("property_title", CleanerKind::Text),
                ("property_address", CleanerKind::Address),
                ("lease_start", CleanerKind::Date),
                ("lease_end", CleanerKind::Date),
            ]),
            rules: vec![
                FieldRule::new("name", RuleKind::Required),
                FieldRule::new("email", RuleKind::email_regex()),
                FieldRule::new("lease_start", RuleKind::DateFormat),
                FieldRule::new("lease_end", RuleKind::DateFormat),
            ],
            parent_policy: ParentPolicy::FailRow,
        },
        EntityMapping {
            entity: EntityKind::Leases,
            filename_tokens: strings(&["lease", "agreement"]),
            required_columns: strings(&[
                "tenant_email",
                "property_title",
                "start_date",
                "end_date",
            ]),
            aliases: aliases(&[
                ("tenant_email", &["tenant email", "tenant"]),
                ("property_title", &["property name", "property"]),
                ("property_address", &["property address", "address 1"]),
                ("start_date", &["start date", "lease start", "start"]),
                ("end_date", &["end date", "lease end", "end"]),
                ("rent", &["rent", "monthly rent", "rent amount"]),
                ("lease_type", &["lease type", "type", "term type"]),
                ("status", &["status"]),
            ]),
            cleaners: cleaners(&[
                ("tenant_email", CleanerKind::Email),
                ("property_title", CleanerKind::Text),
                ("property_address", CleanerKind::Address),
                ("start_date", CleanerKind::Date),
                ("end_date", CleanerKind::Date),
                ("rent", CleanerKind::Money),
                ("lease_type", CleanerKind::LeaseType),
                ("status", CleanerKind::Token),
            ]),
            rules: vec![
                FieldRule::new("tenant_email", RuleKind::Required),
                FieldRule::new("property_title", RuleKind::Required),
                FieldRule::new("start_date", RuleKind::Required),
                FieldRule::new("start_date", RuleKind::DateFormat),
                FieldRule::new("end_date", RuleKind::Required),
                FieldRule::new("end_date", RuleKind::DateFormat),
                FieldRule::new(
                    "rent",
                    RuleKind::Range {
                        min: Some(0.0),
                        max: None,
                    },
                ),
                FieldRule::new(
                    "lease_type",
                    RuleKind::OneOf(strings(&[
                        "month_to_month",
                        "fixed_term",
                        "fixed_with_rollover",
                    ])),
                ),
            ],
            parent_policy: ParentPolicy::FailRow,
        },
        EntityMapping {
            entity: EntityKind::Maintenance,
            filename_tokens: strings(&["maintenance", "repair", "request", "work order", "workorder"]),
            required_columns: strings(&["property_title", "title"]),
            aliases: aliases(&[
                ("property_title", &["property name", "property"]),
                ("property_address", &["property address", "address 1"]),
                ("tenant_email", &["tenant email", "tenant"]),
                ("vendor_email", &["vendor email", "vendor"]),
                ("title", &["title", "summary", "issue"]),
                ("description", &["description", "details"]),
                ("status", &["status"]),
                ("priority", &["priority", "urgency"]),
                ("estimated_cost", &["estimated cost", "estimate"]),
                ("actual_cost", &["actual cost", "cost"]),
                ("completion_date", &["completion date", "completed on"]),
            ]),
            cleaners: cleaners(&[
                ("property_title", CleanerKind::Text),
                ("property_address", CleanerKind::Address),
                ("tenant_email", CleanerKind::Email),
                ("vendor_email", CleanerKind::Email),
                ("title", CleanerKind::Text),
                ("description", CleanerKind::Text),
                ("status", CleanerKind::Token),
                ("priority", CleanerKind::Token),
                ("estimated_cost", CleanerKind::Money),
                ("actual_cost", CleanerKind::Money),
                ("completion_date", CleanerKind::Date),
            ]),
            rules: vec![
                FieldRule::new("property_title", RuleKind::Required),
                FieldRule::new("title", RuleKind::Required),
                FieldRule::new(
                    "status",
                    RuleKind::OneOf(strings(&[
                        "pending",
                        "in_progress",
                        "completed",
                        "cancelled",
                    ])),
                ),
                FieldRule::new(
                    "estimated_cost",
                    RuleKind::Range {
                        min: Some(0.0),
                        max: None,
                    },
                ),
                FieldRule::new(
                    "actual_cost",
                    RuleKind::Range {
                        min: Some(0.0),
                        max: None,
                    },
                ),
                FieldRule::new("completion_date", RuleKind::DateFormat),
            ],
            parent_policy: ParentPolicy::FailRow,
        },
        EntityMapping {
            entity: EntityKind::Transactions,
            filename_tokens: strings(&["transaction", "financial", "ledger", "payment"]),
            required_columns: strings(&[
                "property_title",
                "transaction_date",
                "transaction_type",
                "amount",
            ]),
            aliases: aliases(&[
                ("property_title", &["property name", "property"]),
                ("property_address", &["property address", "address 1"]),
                ("transaction_date", &["date", "transaction date"]),
                ("transaction_type", &["type", "transaction type"]),
                ("amount", &["amount"]),
                ("category", &["category"]),
                ("description", &["description", "memo", "notes"]),
            ]),
            cleaners: cleaners(&[
                ("property_title", CleanerKind::Text),
                ("property_address", CleanerKind::Address),
                ("transaction_date", CleanerKind::Date),
                ("transaction_type", CleanerKind::Token),
                ("amount", CleanerKind::Money),
                ("category", CleanerKind::Token),
                ("description", CleanerKind::Text),
            ]),
            rules: vec![
                FieldRule::new("property_title", RuleKind::Required),
                FieldRule::new("transaction_date", RuleKind::Required),
                FieldRule::new("transaction_date", RuleKind::DateFormat),
                FieldRule::new("transaction_date", RuleKind::NotFuture),
                FieldRule::new("transaction_type", RuleKind::Required),
                FieldRule::new("amount", RuleKind::Required),
                FieldRule::new("amount", RuleKind::NonZero),
                FieldRule::new(
                    "amount",
                    RuleKind::Decimal {
                        precision: 12,
                        scale: 2,
                    },
                ),
            ],
            parent_policy: ParentPolicy::FailRow,
        },
        EntityMapping {
            entity: EntityKind::Balances,
            filename_tokens: strings(&["balance", "outstanding", "arrears"]),
            required_columns: strings(&["tenant_email", "property_title", "amount_due", "due_date"]),
            aliases: aliases(&[
                ("tenant_email", &["tenant email", "tenant"]),
                ("property_title", &["property name", "property"]),
                ("property_address", &["property address", "address 1"]),
                ("amount_due", &["amount due", "balance", "amount"]),
                ("due_date", &["due date", "due"]),
                ("resolved", &["resolved", "paid"]),
            ]),
            cleaners: cleaners(&[
                ("tenant_email", CleanerKind::Email),
                ("property_title", CleanerKind::Text),
                ("property_address", CleanerKind::Address),
                ("amount_due", CleanerKind::Money),
                ("due_date", CleanerKind::Date),
                ("resolved", CleanerKind::Flag),
            ]),
            rules: vec![
                FieldRule::new("tenant_email", RuleKind::Required),
                FieldRule::new("property_title", RuleKind::Required),
                FieldRule::new("amount_due", RuleKind::Required),
                FieldRule::new(
                    "amount_due",
                    RuleKind::Range {
                        min: Some(0.0),
                        max: None,
                    },
                ),
                FieldRule::new("due_date", RuleKind::Required),
                FieldRule::new("due_date", RuleKind::DateFormat),
            ],
            parent_policy: ParentPolicy::FailRow,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        ImportConfig::default().validate().unwrap();
    }

    #[test]
    fn test_unknown_field_in_rule_is_rejected() {
        let mut config = ImportConfig::default();
        config.mappings[0]
            .rules
            .push(FieldRule::new("no_such_field", RuleKind::Required));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ImportError::ConfigurationInvalid(_)));
    }

    #[test]
    fn test_backoff_schedule() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.delay_for(0), Duration::from_millis(100));
        assert_eq!(retry.delay_for(1), Duration::from_millis(200));
        assert_eq!(retry.delay_for(2), Duration::from_millis(400));
        // Capped at 2 s
        assert_eq!(retry.delay_for(10), Duration::from_secs(2));
    }
}
