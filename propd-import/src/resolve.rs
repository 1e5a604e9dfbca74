//! Foreign-key resolution
//!
//! Rows arrive with parent references in file terms (owner email,
//! property title) and leave with surrogate ids. A reference that is
//! present but matches nothing either fails the row or is auto-created
//! with defaults, per the mapping's parent policy. Optional references
//! that are absent stay unset; unresolvable tenant and vendor emails on
//! maintenance rows degrade to a warning. Every store call goes through
//! the transient-retry path, so a busy database here ends the run the
//! same way it would during commit.

use crate::config::{EntityMapping, ParentPolicy, RetryPolicy};
use crate::entity::EntityKind;
use crate::error::ImportResult;
use crate::retry::with_retry;
use crate::types::{CleanedRow, ResolvedRow, RowError, RowWarning};
use propd_common::db;
use propd_common::models::{Property, User, UserRole};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

/// Outcome of resolving one file's validated rows
#[derive(Debug, Default)]
pub struct ResolvedFile {
    pub rows: Vec<ResolvedRow>,
    pub errors: Vec<RowError>,
    pub warnings: Vec<RowWarning>,
}

/// Resolver with a per-file lookup cache
pub struct Resolver<'a> {
    pool: &'a SqlitePool,
    /// Acting user, used as the default owner for auto-created parents
    principal: Uuid,
    dry_run: bool,
    retry: RetryPolicy,
    user_cache: BTreeMap<String, Uuid>,
    tenant_cache: BTreeMap<String, Uuid>,
    property_cache: BTreeMap<String, Uuid>,
}

impl<'a> Resolver<'a> {
    pub fn new(pool: &'a SqlitePool, principal: Uuid, dry_run: bool, retry: RetryPolicy) -> Self {
        Self {
            pool,
            principal,
            dry_run,
            retry,
            user_cache: BTreeMap::new(),
            tenant_cache: BTreeMap::new(),
            property_cache: BTreeMap::new(),
        }
    }

    /// Resolve every row; rows flagged as in-file duplicates keep their
    /// expected-update marker
    pub async fn resolve_file(
        &mut self,
        mapping: &EntityMapping,
        rows: Vec<(CleanedRow, bool)>,
    ) -> ImportResult<ResolvedFile> {
        let mut out = ResolvedFile::default();

        for (row, expected_update) in rows {
            match self.resolve_row(mapping, &row, &mut out.warnings).await? {
                Ok(resolved) => out.rows.push(ResolvedRow {
                    row,
                    resolved,
                    expected_update,
                }),
                Err(mut errors) => out.errors.append(&mut errors),
            }
        }

        Ok(out)
    }

    /// Per-row resolution: Ok(map of FK column -> id) or the row's errors
    async fn resolve_row(
        &mut self,
        mapping: &EntityMapping,
        row: &CleanedRow,
        warnings: &mut Vec<RowWarning>,
    ) -> ImportResult<Result<BTreeMap<String, Uuid>, Vec<RowError>>> {
        let mut resolved = BTreeMap::new();
        let mut errors = Vec::new();

        match mapping.entity {
            EntityKind::Users => {}
            EntityKind::Properties => {
                // Absent owner column: the acting principal owns the row
                match row.get("owner_email").as_text() {
                    None => {
                        resolved.insert("owner_id".to_string(), self.principal);
                    }
                    Some(email) => {
                        let email = email.to_string();
                        match self.lookup_user(&email).await? {
                            Some(id) => {
                                resolved.insert("owner_id".to_string(), id);
                            }
                            None => match mapping.parent_policy {
                                ParentPolicy::AutoCreate => {
                                    let id = self
                                        .create_owner(&email, row.line, warnings)
                                        .await?;
                                    resolved.insert("owner_id".to_string(), id);
                                }
                                ParentPolicy::FailRow => errors.push(missing_parent(
                                    row,
                                    "owner_id",
                                    "owner_email",
                                    &format!("no User matches '{email}'"),
                                )),
                            },
                        }
                    }
                }
            }
            EntityKind::Tenants => {
                self.resolve_property(mapping, row, false, &mut resolved, &mut errors, warnings)
                    .await?;
            }
            EntityKind::Leases | EntityKind::Balances => {
                self.resolve_property(mapping, row, true, &mut resolved, &mut errors, warnings)
                    .await?;
                self.resolve_tenant(row, true, &mut resolved, &mut errors, warnings)
                    .await?;
            }
            EntityKind::Maintenance => {
                self.resolve_property(mapping, row, true, &mut resolved, &mut errors, warnings)
                    .await?;
                self.resolve_tenant(row, false, &mut resolved, &mut errors, warnings)
                    .await?;
                if let Some(email) = row.get("vendor_email").as_text() {
                    let email = email.to_string();
                    match self.lookup_user(&email).await? {
                        Some(id) => {
                            resolved.insert("vendor_id".to_string(), id);
                        }
                        None => warnings.push(RowWarning {
                            line: row.line,
                            field: "vendor_email".to_string(),
                            message: format!("no User matches '{email}', vendor left unset"),
                        }),
                    }
                }
            }
            EntityKind::Transactions => {
                self.resolve_property(mapping, row, true, &mut resolved, &mut errors, warnings)
                    .await?;
            }
        }

        if errors.is_empty() {
            Ok(Ok(resolved))
        } else {
            Ok(Err(errors))
        }
    }

    /// Resolve property_title/property_address to property_id.
    ///
    /// Address-qualified lookup when both columns are present; title-only
    /// lookup (unambiguous matches only) when the address is missing.
    async fn resolve_property(
        &mut self,
        mapping: &EntityMapping,
        row: &CleanedRow,
        required: bool,
        resolved: &mut BTreeMap<String, Uuid>,
        errors: &mut Vec<RowError>,
        warnings: &mut Vec<RowWarning>,
    ) -> ImportResult<()> {
        let title = match row.get("property_title").as_text() {
            Some(t) => t.to_string(),
            None => {
                if required {
                    errors.push(missing_parent(
                        row,
                        "property_id",
                        "property_title",
                        "property reference is missing",
                    ));
                }
                return Ok(());
            }
        };
        let address = row.get("property_address").as_text().map(str::to_string);

        let cache_key = format!("{title}\u{1f}{}", address.as_deref().unwrap_or(""));
        let found = match self.property_cache.get(&cache_key) {
            Some(id) => Some(*id),
            None => {
                let pool = self.pool;
                let found = match &address {
                    Some(addr) => {
                        with_retry(&self.retry, || {
                            db::properties::find_property_id(pool, &title, addr)
                        })
                        .await?
                    }
                    None => {
                        with_retry(&self.retry, || {
                            db::properties::find_property_id_by_title(pool, &title)
                        })
                        .await?
                    }
                };
                if let Some(id) = found {
                    self.property_cache.insert(cache_key, id);
                }
                found
            }
        };

        match found {
            Some(id) => {
                resolved.insert("property_id".to_string(), id);
            }
            // A reference that is present but matches nothing is governed
            // by the parent policy, whether or not the column is required
            None => match mapping.parent_policy {
                ParentPolicy::AutoCreate => {
                    let id = self
                        .create_property(&title, address.as_deref(), row.line, warnings)
                        .await?;
                    resolved.insert("property_id".to_string(), id);
                }
                ParentPolicy::FailRow => errors.push(missing_parent(
                    row,
                    "property_id",
                    "property_title",
                    &format!("no Property matches '{title}'"),
                )),
            },
        }

        Ok(())
    }

    async fn resolve_tenant(
        &mut self,
        row: &CleanedRow,
        required: bool,
        resolved: &mut BTreeMap<String, Uuid>,
        errors: &mut Vec<RowError>,
        warnings: &mut Vec<RowWarning>,
    ) -> ImportResult<()> {
        let email = match row.get("tenant_email").as_text() {
            Some(e) => e.to_string(),
            None => {
                if required {
                    errors.push(missing_parent(
                        row,
                        "tenant_id",
                        "tenant_email",
                        "tenant reference is missing",
                    ));
                }
                return Ok(());
            }
        };

        let found = match self.tenant_cache.get(&email) {
            Some(id) => Some(*id),
            None => {
                let pool = self.pool;
                let found =
                    with_retry(&self.retry, || {
                        db::tenants::find_tenant_id_by_email(pool, &email)
                    })
                    .await?;
                if let Some(id) = found {
                    self.tenant_cache.insert(email.clone(), id);
                }
                found
            }
        };

        match found {
            Some(id) => {
                resolved.insert("tenant_id".to_string(), id);
            }
            None if required => errors.push(missing_parent(
                row,
                "tenant_id",
                "tenant_email",
                &format!("no Tenant matches '{email}'"),
            )),
            None => warnings.push(RowWarning {
                line: row.line,
                field: "tenant_email".to_string(),
                message: format!("no Tenant matches '{email}', reference left unset"),
            }),
        }

        Ok(())
    }

    async fn lookup_user(&mut self, email: &str) -> ImportResult<Option<Uuid>> {
        if let Some(id) = self.user_cache.get(email) {
            return Ok(Some(*id));
        }
        let pool = self.pool;
        let found = with_retry(&self.retry, || db::users::find_user_id_by_email(pool, email)).await?;
        if let Some(id) = found {
            self.user_cache.insert(email.to_string(), id);
        }
        Ok(found)
    }

    /// Auto-create a minimal owner account. Under dry-run nothing is
    /// written; a placeholder id stands in so dependent rows still
    /// resolve within the run.
    async fn create_owner(
        &mut self,
        email: &str,
        line: usize,
        warnings: &mut Vec<RowWarning>,
    ) -> ImportResult<Uuid> {
        let name = email.split('@').next().unwrap_or(email).to_string();
        let user = User::new(email.to_string(), UserRole::Owner, name);

        let id = if self.dry_run {
            user.id
        } else {
            let pool = self.pool;
            with_retry(&self.retry, || async {
                let mut conn = pool.acquire().await?;
                db::users::insert_user(&mut conn, &user).await
            })
            .await?;
            info!(email, id = %user.id, "auto-created owner account");
            user.id
        };

        warnings.push(RowWarning {
            line,
            field: "owner_email".to_string(),
            message: format!("created owner account for '{email}' with defaults"),
        });
        self.user_cache.insert(email.to_string(), id);
        Ok(id)
    }

    /// Auto-create a minimal property owned by the principal
    async fn create_property(
        &mut self,
        title: &str,
        address: Option<&str>,
        line: usize,
        warnings: &mut Vec<RowWarning>,
    ) -> ImportResult<Uuid> {
        let address_line1 = address.unwrap_or("").to_string();
        let property = Property::new(title.to_string(), address_line1.clone(), self.principal);

        let id = if self.dry_run {
            property.id
        } else {
            let pool = self.pool;
            with_retry(&self.retry, || async {
                let mut conn = pool.acquire().await?;
                db::properties::insert_property(&mut conn, &property).await
            })
            .await?;
            info!(title, id = %property.id, "auto-created property");
            property.id
        };

        warnings.push(RowWarning {
            line,
            field: "property_title".to_string(),
            message: format!("created property '{title}' with defaults"),
        });
        self.property_cache
            .insert(format!("{title}\u{1f}{address_line1}"), id);
        Ok(id)
    }
}

fn missing_parent(row: &CleanedRow, fk_field: &str, source_field: &str, message: &str) -> RowError {
    RowError {
        line: row.line,
        field: fk_field.to_string(),
        rule: "resolution".to_string(),
        message: message.to_string(),
        raw_value: row.raw_value(source_field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportConfig;
    use crate::types::CleanedValue;
    use propd_common::db::init::init_memory_database;

    fn mapping(config: &ImportConfig, entity: EntityKind) -> EntityMapping {
        config.mapping_for(entity).unwrap().clone()
    }

    fn row(line: usize, fields: &[(&str, &str)]) -> (CleanedRow, bool) {
        let mut map = BTreeMap::new();
        let mut raw = BTreeMap::new();
        for (field, value) in fields {
            map.insert(field.to_string(), CleanedValue::Text(value.to_string()));
            raw.insert(field.to_string(), value.to_string());
        }
        (
            CleanedRow {
                line,
                fields: map,
                raw,
            },
            false,
        )
    }

    async fn seed_principal(pool: &SqlitePool) -> Uuid {
        let mut conn = pool.acquire().await.unwrap();
        let admin = User::new("admin@x.y".to_string(), UserRole::Admin, "Admin".to_string());
        db::users::insert_user(&mut conn, &admin).await.unwrap();
        admin.id
    }

    #[tokio::test]
    async fn test_unknown_property_fails_row() {
        let pool = init_memory_database().await.unwrap();
        let principal = seed_principal(&pool).await;
        let config = ImportConfig::default();
        let m = mapping(&config, EntityKind::Maintenance);

        let mut resolver = Resolver::new(&pool, principal, false, RetryPolicy::default());
        let out = resolver
            .resolve_file(
                &m,
                vec![row(1, &[("property_title", "Unknown"), ("title", "Broken gate")])],
            )
            .await
            .unwrap();

        assert!(out.rows.is_empty());
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].field, "property_id");
        assert_eq!(out.errors[0].rule, "resolution");
        assert_eq!(out.errors[0].message, "no Property matches 'Unknown'");
    }

    #[tokio::test]
    async fn test_missing_owner_auto_created() {
        let pool = init_memory_database().await.unwrap();
        let principal = seed_principal(&pool).await;
        let config = ImportConfig::default();
        let m = mapping(&config, EntityKind::Properties);

        let mut resolver = Resolver::new(&pool, principal, false, RetryPolicy::default());
        let out = resolver
            .resolve_file(
                &m,
                vec![row(
                    1,
                    &[
                        ("title", "Maple House"),
                        ("address_line1", "12 Maple St"),
                        ("owner_email", "new.owner@example.com"),
                    ],
                )],
            )
            .await
            .unwrap();

        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.warnings.len(), 1);
        let created = db::users::find_user_id_by_email(&pool, "new.owner@example.com")
            .await
            .unwrap();
        assert_eq!(created, out.rows[0].resolved.get("owner_id").copied());
    }

    #[tokio::test]
    async fn test_dry_run_does_not_create_parents() {
        let pool = init_memory_database().await.unwrap();
        let principal = seed_principal(&pool).await;
        let config = ImportConfig::default();
        let m = mapping(&config, EntityKind::Properties);

        let mut resolver = Resolver::new(&pool, principal, true, RetryPolicy::default());
        let out = resolver
            .resolve_file(
                &m,
                vec![row(
                    1,
                    &[
                        ("title", "Maple House"),
                        ("address_line1", "12 Maple St"),
                        ("owner_email", "ghost@example.com"),
                    ],
                )],
            )
            .await
            .unwrap();

        assert_eq!(out.rows.len(), 1, "row still resolves under dry-run");
        let created = db::users::find_user_id_by_email(&pool, "ghost@example.com")
            .await
            .unwrap();
        assert!(created.is_none(), "dry-run must not write");
    }

    #[tokio::test]
    async fn test_principal_owns_rows_without_owner_column() {
        let pool = init_memory_database().await.unwrap();
        let principal = seed_principal(&pool).await;
        let config = ImportConfig::default();
        let m = mapping(&config, EntityKind::Properties);

        let mut resolver = Resolver::new(&pool, principal, false, RetryPolicy::default());
        let out = resolver
            .resolve_file(
                &m,
                vec![row(
                    1,
                    &[("title", "Maple House"), ("address_line1", "12 Maple St")],
                )],
            )
            .await
            .unwrap();

        assert_eq!(out.rows[0].resolved.get("owner_id"), Some(&principal));
    }

    #[tokio::test]
    async fn test_title_only_lookup_when_address_missing() {
        let pool = init_memory_database().await.unwrap();
        let principal = seed_principal(&pool).await;
        {
            let mut conn = pool.acquire().await.unwrap();
            let p = Property::new("Maple House".to_string(), "12 Maple St".to_string(), principal);
            db::properties::insert_property(&mut conn, &p).await.unwrap();
        }
        let config = ImportConfig::default();
        let m = mapping(&config, EntityKind::Transactions);

        let mut resolver = Resolver::new(&pool, principal, false, RetryPolicy::default());
        let out = resolver
            .resolve_file(&m, vec![row(1, &[("property_title", "Maple House")])])
            .await
            .unwrap();

        assert_eq!(out.rows.len(), 1);
        assert!(out.rows[0].resolved.contains_key("property_id"));
    }
}
