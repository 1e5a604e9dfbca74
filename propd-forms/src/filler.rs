//! AcroForm field filling
//!
//! The template is loaded into an owned `lopdf::Document` and mutated in
//! place: for each leaf field whose partial name (`/T`) matches a mapping
//! key, `/V` and `/DV` are set to the supplied text and any cached
//! appearance (`/AP`) is dropped. `/NeedAppearances` is raised on the
//! AcroForm dictionary so readers rebuild the visible text from the new
//! values. Everything else in the object tree is carried over untouched.

use crate::error::{FormError, FormResult};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Logical field name -> value to display
pub type FieldValues = BTreeMap<String, String>;

/// Fill a fillable template, returning the filled document bytes.
///
/// Non-strict mode ignores mapping keys that name no field and leaves
/// unmapped fields blank; strict mode fails on the first unmatched key.
pub fn fill(template: &[u8], values: &FieldValues, strict: bool) -> FormResult<Vec<u8>> {
    let mut doc =
        Document::load_mem(template).map_err(|e| FormError::Malformed(e.to_string()))?;

    let acroform_id = locate_acroform(&mut doc)?;
    let leaves = collect_leaf_fields(&doc, acroform_id)?;
    if leaves.is_empty() {
        return Err(FormError::TemplateNotFillable);
    }

    if strict {
        for key in values.keys() {
            if !leaves.contains_key(key) {
                return Err(FormError::FieldNotInTemplate(key.clone()));
            }
        }
    }

    let mut filled = 0usize;
    for (name, value) in values {
        let Some(field_id) = leaves.get(name) else {
            continue;
        };
        let field = doc
            .get_object_mut(*field_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| FormError::Malformed(e.to_string()))?;

        field.set("V", Object::string_literal(value.as_str()));
        field.set("DV", Object::string_literal(value.as_str()));
        // Cached appearance would keep showing the old text
        field.remove(b"AP");
        filled += 1;
    }
    debug!(filled, fields = leaves.len(), "filled template fields");

    let acroform = doc
        .get_object_mut(acroform_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| FormError::Malformed(e.to_string()))?;
    acroform.set("NeedAppearances", Object::Boolean(true));

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| FormError::WriteFailed(e.to_string()))?;
    Ok(out)
}

/// Find the AcroForm dictionary behind the catalog.
///
/// An inline (non-referenced) AcroForm is promoted to its own object so
/// the rest of the filler can address it by id.
fn locate_acroform(doc: &mut Document) -> FormResult<ObjectId> {
    let root_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|e| FormError::Malformed(e.to_string()))?;

    let inline = {
        let catalog = doc
            .get_object(root_id)
            .and_then(Object::as_dict)
            .map_err(|e| FormError::Malformed(e.to_string()))?;
        match catalog.get(b"AcroForm") {
            Err(_) => return Err(FormError::TemplateNotFillable),
            Ok(Object::Reference(id)) => return Ok(*id),
            Ok(Object::Dictionary(dict)) => dict.clone(),
            Ok(_) => {
                return Err(FormError::Malformed(
                    "catalog AcroForm entry is neither reference nor dictionary".to_string(),
                ))
            }
        }
    };

    let id = doc.add_object(Object::Dictionary(inline));
    let catalog = doc
        .get_object_mut(root_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| FormError::Malformed(e.to_string()))?;
    catalog.set("AcroForm", Object::Reference(id));
    Ok(id)
}

/// Depth-first walk of the field tree, collecting leaf fields by partial
/// name. The first leaf found under a name wins; later duplicates are
/// ignored.
fn collect_leaf_fields(
    doc: &Document,
    acroform_id: ObjectId,
) -> FormResult<BTreeMap<String, ObjectId>> {
    let acroform = doc
        .get_object(acroform_id)
        .and_then(Object::as_dict)
        .map_err(|e| FormError::Malformed(e.to_string()))?;
    let fields = acroform
        .get(b"Fields")
        .and_then(Object::as_array)
        .map_err(|_| FormError::TemplateNotFillable)?;

    let mut leaves = BTreeMap::new();
    let mut visited = BTreeSet::new();
    for entry in fields {
        if let Ok(id) = entry.as_reference() {
            walk_field(doc, id, &mut leaves, &mut visited)?;
        }
    }
    Ok(leaves)
}

fn walk_field(
    doc: &Document,
    id: ObjectId,
    leaves: &mut BTreeMap<String, ObjectId>,
    visited: &mut BTreeSet<ObjectId>,
) -> FormResult<()> {
    // Malformed field trees can contain cycles
    if !visited.insert(id) {
        return Ok(());
    }

    let field = doc
        .get_object(id)
        .and_then(Object::as_dict)
        .map_err(|e| FormError::Malformed(e.to_string()))?;

    // Children that are themselves named fields make this an interior
    // node; children without /T are widget annotations of a single field
    let field_kids = named_kids(doc, field);
    if field_kids.is_empty() {
        if let Some(name) = partial_name(field) {
            leaves.entry(name).or_insert(id);
        }
        return Ok(());
    }
    for kid in field_kids {
        walk_field(doc, kid, leaves, visited)?;
    }
    Ok(())
}

/// Kids of a field dictionary that carry a /T of their own
fn named_kids(doc: &Document, field: &Dictionary) -> Vec<ObjectId> {
    let Ok(kids) = field.get(b"Kids").and_then(Object::as_array) else {
        return Vec::new();
    };
    kids.iter()
        .filter_map(|kid| kid.as_reference().ok())
        .filter(|id| {
            doc.get_object(*id)
                .and_then(Object::as_dict)
                .map(|d| d.has(b"T"))
                .unwrap_or(false)
        })
        .collect()
}

fn partial_name(field: &Dictionary) -> Option<String> {
    let name = field.get(b"T").and_then(Object::as_str).ok()?;
    Some(String::from_utf8_lossy(name).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    /// Build a minimal fillable PDF: one page, an AcroForm with the given
    /// text fields, a stale /AP on each so removal can be asserted.
    fn template_with_fields(names: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");

        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );

        let mut field_refs = Vec::new();
        for name in names {
            let ap_id = doc.add_object(dictionary! {});
            let field_id = doc.add_object(dictionary! {
                "FT" => "Tx",
                "T" => Object::string_literal(*name),
                "V" => Object::string_literal(""),
                "AP" => Object::Reference(ap_id),
            });
            field_refs.push(Object::Reference(field_id));
        }
        let acroform_id = doc.add_object(dictionary! {
            "Fields" => field_refs,
        });

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
            "AcroForm" => Object::Reference(acroform_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn values(entries: &[(&str, &str)]) -> FieldValues {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn field_dict<'a>(doc: &'a Document, name: &str) -> &'a Dictionary {
        for (_, object) in doc.objects.iter() {
            if let Ok(dict) = object.as_dict() {
                if let Ok(t) = dict.get(b"T").and_then(Object::as_str) {
                    if t == name.as_bytes() {
                        return dict;
                    }
                }
            }
        }
        panic!("field {name} not found");
    }

    #[test]
    fn test_fill_sets_value_and_default_and_drops_appearance() {
        let template = template_with_fields(&["tenant_name", "rent"]);
        let out = fill(
            &template,
            &values(&[("tenant_name", "Ann Example"), ("rent", "1800.00")]),
            false,
        )
        .unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let field = field_dict(&doc, "tenant_name");
        assert_eq!(
            field.get(b"V").and_then(Object::as_str).unwrap(),
            b"Ann Example"
        );
        assert_eq!(
            field.get(b"DV").and_then(Object::as_str).unwrap(),
            b"Ann Example"
        );
        assert!(!field.has(b"AP"), "stale appearance must be removed");
    }

    #[test]
    fn test_need_appearances_raised() {
        let template = template_with_fields(&["tenant_name"]);
        let out = fill(&template, &values(&[("tenant_name", "Ann")]), false).unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let catalog = doc.catalog().unwrap();
        let acroform_id = catalog.get(b"AcroForm").unwrap().as_reference().unwrap();
        let acroform = doc.get_object(acroform_id).unwrap().as_dict().unwrap();
        assert_eq!(
            acroform.get(b"NeedAppearances").unwrap(),
            &Object::Boolean(true)
        );
    }

    #[test]
    fn test_unmapped_field_left_blank() {
        let template = template_with_fields(&["tenant_name", "rent"]);
        let out = fill(&template, &values(&[("tenant_name", "Ann")]), false).unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let rent = field_dict(&doc, "rent");
        assert_eq!(rent.get(b"V").and_then(Object::as_str).unwrap(), b"");
        assert!(rent.has(b"AP"), "untouched field keeps its appearance");
    }

    #[test]
    fn test_strict_rejects_unknown_key() {
        let template = template_with_fields(&["tenant_name"]);
        let err = fill(&template, &values(&[("no_such_field", "x")]), true).unwrap_err();
        assert!(matches!(err, FormError::FieldNotInTemplate(key) if key == "no_such_field"));
    }

    #[test]
    fn test_non_strict_ignores_unknown_key() {
        let template = template_with_fields(&["tenant_name"]);
        let out = fill(
            &template,
            &values(&[("tenant_name", "Ann"), ("no_such_field", "x")]),
            false,
        )
        .unwrap();
        assert!(!out.is_empty());
    }

    #[test]
    fn test_not_fillable_without_acroform() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let err = fill(&bytes, &FieldValues::new(), false).unwrap_err();
        assert!(matches!(err, FormError::TemplateNotFillable));
    }

    #[test]
    fn test_field_set_preserved() {
        let template = template_with_fields(&["a", "b", "c"]);
        let out = fill(&template, &values(&[("b", "x")]), false).unwrap();

        let doc = Document::load_mem(&out).unwrap();
        for name in ["a", "b", "c"] {
            field_dict(&doc, name);
        }
    }

    #[test]
    fn test_garbage_bytes_are_malformed() {
        let err = fill(b"not a pdf", &FieldValues::new(), false).unwrap_err();
        assert!(matches!(err, FormError::Malformed(_)));
    }
}
