//! Project reference resolution for task reads.
//!
//! # Invariants
//! - A lookup by project id matches the string form, plus the native form
//!   when the id is a valid identifier, under every consulted field name.
//! - The legacy field name is consulted only when configured.
//! - Pure: builds predicates and expressions, performs no I/O.

use crate::model::document::object_id_value;
use crate::model::object_id::ObjectId;
use crate::model::project_ref::{CANONICAL_PROJECT_FIELD, LEGACY_PROJECT_FIELD};
use crate::repo::filter::Filter;
use crate::repo::pipeline::Expr;

/// Builds union-of-representation predicates for project references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProjectRefResolver {
    include_legacy_field: bool,
}

impl ProjectRefResolver {
    /// `include_legacy_field` mirrors `CoreConfig::include_legacy_project_field`.
    pub fn new(include_legacy_field: bool) -> Self {
        Self { include_legacy_field }
    }

    pub fn includes_legacy_field(&self) -> bool {
        self.include_legacy_field
    }

    /// Field names consulted on reads, canonical first.
    pub fn fields(&self) -> &'static [&'static str] {
        if self.include_legacy_field {
            &[CANONICAL_PROJECT_FIELD, LEGACY_PROJECT_FIELD]
        } else {
            &[CANONICAL_PROJECT_FIELD]
        }
    }

    /// Predicate matching tasks owned by `project_id` in any stored shape.
    ///
    /// When `project_id` is an identifier, string references match in any
    /// letter case. Combine with further clauses through [`Filter::and`].
    pub fn filter_for(&self, project_id: &str) -> Filter {
        let native = ObjectId::parse_str(project_id).ok();
        let mut clauses = Vec::with_capacity(self.fields().len() * 2);
        for field in self.fields() {
            match native {
                Some(id) => {
                    clauses.push(Filter::equals_ci(*field, &id.to_hex()));
                    clauses.push(Filter::eq(*field, object_id_value(&id)));
                }
                None => clauses.push(Filter::eq(*field, project_id)),
            }
        }
        Filter::any_of(clauses)
    }

    /// Predicate matching tasks that carry any project reference at all.
    pub fn has_reference(&self) -> Filter {
        Filter::any_of(self.fields().iter().map(|field| Filter::present(*field)))
    }

    /// Pipeline expression yielding the referenced project id as text.
    ///
    /// Anything that parses as an identifier, native or text in any letter
    /// case, becomes lowercase hex, so every shape of one reference produces
    /// the same key. Other text is kept as written.
    pub fn group_key(&self) -> Expr {
        let operands = self
            .fields()
            .iter()
            .map(|field| Expr::field(*field))
            .collect();
        let raw = Expr::Coalesce(operands);
        Expr::ToText(Box::new(Expr::Coalesce(vec![
            Expr::ToObjectId(Box::new(raw.clone())),
            raw,
        ])))
    }
}

#[cfg(test)]
mod tests {
    use super::ProjectRefResolver;
    use crate::model::document::Document;
    use crate::repo::filter::Filter;
    use serde_json::json;

    const HEX: &str = "507f1f77bcf86cd799439011";

    #[test]
    fn valid_identifier_yields_string_and_native_clauses() {
        let filter = ProjectRefResolver::new(false).filter_for(HEX);
        assert_eq!(
            filter,
            Filter::Or(vec![
                Filter::equals_ci("projetId", HEX),
                Filter::eq("projetId", json!({"$oid": HEX})),
            ])
        );
    }

    #[test]
    fn legacy_field_adds_both_shapes_for_the_old_field() {
        let Filter::Or(clauses) = ProjectRefResolver::new(true).filter_for(HEX) else {
            panic!("expected disjunction");
        };
        assert_eq!(clauses.len(), 4);
        assert!(clauses.contains(&Filter::eq("projectId", json!({"$oid": HEX}))));
    }

    #[test]
    fn non_identifier_text_yields_single_clause() {
        assert_eq!(
            ProjectRefResolver::new(false).filter_for("projet-7"),
            Filter::eq("projetId", "projet-7")
        );
    }

    #[test]
    fn group_key_normalizes_identifier_case_and_keeps_other_text() {
        let key = ProjectRefResolver::new(true).group_key();
        let doc = |value| -> Document { serde_json::from_value(value).unwrap() };

        let upper = doc(json!({"projetId": "507F1F77BCF86CD799439011"}));
        let native = doc(json!({"projectId": {"$oid": HEX}}));
        let plain = doc(json!({"projetId": "projet-7"}));
        let unset = doc(json!({"titre": "sans projet"}));

        assert_eq!(key.eval(&upper), Some(json!(HEX)));
        assert_eq!(key.eval(&native), Some(json!(HEX)));
        assert_eq!(key.eval(&plain), Some(json!("projet-7")));
        assert_eq!(key.eval(&unset), Some(json!(null)));
    }
}
