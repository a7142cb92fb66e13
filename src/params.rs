//! Request parameters and the precedence rules used to combine them.
//!
//! Parameters come from three places: derived device/lifecycle context, the parameters attached to
//! a single mbox ("local"), and the parameters attached to the whole call ("global"). For the
//! string maps, later layers overwrite earlier ones key by key:
//!
//! context < local < global
//!
//! `order` and `product` are not merged field-wise. A global value replaces the local value
//! entirely.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Parameters attached to an mbox, a notification, or a whole call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetParameters {
    /// Mbox parameters.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, String>,
    /// Profile parameters.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub profile_parameters: HashMap<String, String>,
    /// Order details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<TargetOrder>,
    /// Product details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<TargetProduct>,
}

impl TargetParameters {
    /// Create empty parameters.
    pub fn new() -> TargetParameters {
        TargetParameters::default()
    }

    /// Add an mbox parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Add a profile parameter.
    pub fn with_profile_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.profile_parameters.insert(key.into(), value.into());
        self
    }

    /// Set order details.
    pub fn with_order(mut self, order: TargetOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// Set product details.
    pub fn with_product(mut self, product: TargetProduct) -> Self {
        self.product = Some(product);
        self
    }
}

/// Order details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOrder {
    /// Order id.
    pub id: String,
    /// Order total.
    pub total: f64,
    /// Ids of purchased products.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub purchased_product_ids: Vec<String>,
}

/// Product details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetProduct {
    /// Product id.
    pub id: String,
    /// Category id.
    pub category_id: String,
}

/// Union of `base` and `overlay`. `overlay` wins on key collision; absent maps are empty.
pub fn merge_maps(
    base: Option<&HashMap<String, String>>,
    overlay: Option<&HashMap<String, String>>,
) -> HashMap<String, String> {
    let mut merged = base.cloned().unwrap_or_default();
    if let Some(overlay) = overlay {
        merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

/// `global` when present, `local` otherwise.
pub fn merge_order(
    global: Option<&TargetOrder>,
    local: Option<&TargetOrder>,
) -> Option<TargetOrder> {
    global.or(local).cloned()
}

/// `global` when present, `local` otherwise.
pub fn merge_product(
    global: Option<&TargetProduct>,
    local: Option<&TargetProduct>,
) -> Option<TargetProduct> {
    global.or(local).cloned()
}

/// Merge all parameter sources for a single mbox or notification.
pub fn merge_parameters(
    context: Option<&HashMap<String, String>>,
    local: Option<&TargetParameters>,
    global: Option<&TargetParameters>,
) -> TargetParameters {
    let with_local = merge_maps(context, local.map(|p| &p.parameters));
    TargetParameters {
        parameters: merge_maps(Some(&with_local), global.map(|p| &p.parameters)),
        profile_parameters: merge_maps(
            local.map(|p| &p.profile_parameters),
            global.map(|p| &p.profile_parameters),
        ),
        order: merge_order(
            global.and_then(|p| p.order.as_ref()),
            local.and_then(|p| p.order.as_ref()),
        ),
        product: merge_product(
            global.and_then(|p| p.product.as_ref()),
            local.and_then(|p| p.product.as_ref()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn map(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn global_overrides_local_overrides_context() {
        let global = TargetParameters {
            parameters: map(&[("a", "1")]),
            ..Default::default()
        };
        let local = TargetParameters {
            parameters: map(&[("a", "2"), ("b", "3")]),
            ..Default::default()
        };
        let context = map(&[("c", "4")]);

        let merged = merge_parameters(Some(&context), Some(&local), Some(&global));

        assert_eq!(merged.parameters, map(&[("a", "1"), ("b", "3"), ("c", "4")]));
    }

    #[test]
    fn absent_maps_are_empty() {
        assert!(merge_maps(None, None).is_empty());
        assert_eq!(merge_maps(None, Some(&map(&[("a", "1")]))), map(&[("a", "1")]));
        assert_eq!(merge_maps(Some(&map(&[("a", "1")])), None), map(&[("a", "1")]));
    }

    #[test]
    fn context_cannot_override_caller_values() {
        let local = TargetParameters::new().with_parameter("a.locale", "fr-FR");
        let context = map(&[("a.locale", "en-US")]);

        let merged = merge_parameters(Some(&context), Some(&local), None);

        assert_eq!(merged.parameters["a.locale"], "fr-FR");
    }

    #[test]
    fn global_order_replaces_local_order() {
        let local = TargetParameters::new().with_order(TargetOrder {
            id: "local".to_owned(),
            total: 10.0,
            purchased_product_ids: vec!["p1".to_owned(), "p2".to_owned()],
        });
        let global = TargetParameters::new().with_order(TargetOrder {
            id: "global".to_owned(),
            total: 20.0,
            purchased_product_ids: vec![],
        });

        let merged = merge_parameters(None, Some(&local), Some(&global));
        let order = merged.order.unwrap();
        assert_eq!(order.id, "global");
        // No field-level merge.
        assert!(order.purchased_product_ids.is_empty());

        let merged = merge_parameters(None, Some(&local), None);
        assert_eq!(merged.order.unwrap().id, "local");
    }

    #[test]
    fn global_product_replaces_local_product() {
        let local = TargetParameters::new().with_product(TargetProduct {
            id: "local".to_owned(),
            category_id: "c1".to_owned(),
        });
        let global = TargetParameters::new().with_product(TargetProduct {
            id: "global".to_owned(),
            category_id: "c2".to_owned(),
        });

        assert_eq!(
            merge_product(global.product.as_ref(), local.product.as_ref())
                .unwrap()
                .id,
            "global"
        );
        assert_eq!(
            merge_product(None, local.product.as_ref()).unwrap().id,
            "local"
        );
        assert_eq!(merge_product(None, None), None);
    }

    #[test]
    fn profile_parameters_merge_field_wise() {
        let local = TargetParameters::new()
            .with_profile_parameter("mbox-parameter-key1", "mbox-parameter-value1");
        let global = TargetParameters::new().with_profile_parameter("name", "Smith");

        let merged = merge_parameters(None, Some(&local), Some(&global));

        assert_eq!(
            merged.profile_parameters,
            map(&[
                ("mbox-parameter-key1", "mbox-parameter-value1"),
                ("name", "Smith")
            ])
        );
    }
}
