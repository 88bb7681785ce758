use std::collections::HashMap;

use serde_json::Value;

use crate::error::{LayoutError, LinkEnd};
use crate::ir::{Endpoint, IdAccessor, LinkKeys, RawLink, Record};

use super::Node;

/// Which ids survive when the dataset and the explicit node array disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Every id from either array becomes a node.
    #[default]
    Union,
    /// Ids without an explicit node record are dropped.
    ExplicitOnly,
}

#[derive(Debug, Clone)]
pub struct ResolveOptions<'a> {
    pub id: &'a IdAccessor,
    pub policy: MergePolicy,
    /// Sort explicit node records by id before merging.
    pub sort_by_id: bool,
}

impl<'a> ResolveOptions<'a> {
    pub fn new(id: &'a IdAccessor) -> Self {
        Self {
            id,
            policy: MergePolicy::Union,
            sort_by_id: false,
        }
    }

    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sort_by_id(mut self, sort: bool) -> Self {
        self.sort_by_id = sort;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    pub nodes: Vec<Node>,
    pub lookup: HashMap<String, usize>,
    /// Explicit node records in caller order (derived from links when the
    /// caller gave none). Numeric link endpoints index into this array.
    pub explicit: Vec<Record>,
}

/// Reads links out of generic records using the configured field names.
pub fn parse_links(links: &[Record], keys: &LinkKeys) -> Result<Vec<RawLink>, LayoutError> {
    links
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let source = read_endpoint(record, &keys.source, idx, LinkEnd::Source)?;
            let target = read_endpoint(record, &keys.target, idx, LinkEnd::Target)?;
            let value = record
                .get(&keys.value)
                .and_then(crate::ir::value_to_f32);
            Ok(RawLink::new(source, target, value))
        })
        .collect()
}

fn read_endpoint(
    record: &Record,
    field: &str,
    link: usize,
    end: LinkEnd,
) -> Result<Endpoint, LayoutError> {
    record
        .get(field)
        .and_then(Endpoint::from_value)
        .ok_or_else(|| LayoutError::MalformedLink {
            link,
            end,
            field: field.to_string(),
        })
}

/// Builds the canonical node set for one pass.
///
/// Canonical order is dataset ids in first-appearance order followed by
/// ids that only exist in the explicit node array. Within one array a
/// repeated id keeps its last record.
pub fn resolve_nodes(
    data: &[Record],
    explicit: &[Record],
    links: &[RawLink],
    options: &ResolveOptions<'_>,
) -> NodeSet {
    let explicit: Vec<Record> = if explicit.is_empty() && !links.is_empty() {
        derive_from_links(links, options.id)
    } else {
        explicit.to_vec()
    };

    let mut order: Vec<String> = Vec::new();
    let mut data_by_id: HashMap<String, &Record> = HashMap::new();
    for (idx, record) in data.iter().enumerate() {
        let Some(id) = options.id.id_of(record, idx) else {
            tracing::warn!(row = idx, "dataset row has no id, skipping");
            continue;
        };
        if data_by_id.insert(id.clone(), record).is_none() {
            order.push(id);
        }
    }

    let mut keyed: Vec<(String, &Record)> = Vec::with_capacity(explicit.len());
    for (idx, record) in explicit.iter().enumerate() {
        match options.id.id_of(record, idx) {
            Some(id) => keyed.push((id, record)),
            None => tracing::warn!(node = idx, "node record has no id, skipping"),
        }
    }
    if options.sort_by_id {
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
    }
    let mut node_by_id: HashMap<String, &Record> = HashMap::new();
    for (id, record) in keyed {
        if node_by_id.insert(id.clone(), record).is_none() && !data_by_id.contains_key(&id) {
            order.push(id);
        }
    }

    let mut nodes = Vec::with_capacity(order.len());
    let mut lookup = HashMap::with_capacity(order.len());
    for id in order {
        let data = data_by_id.get(&id).map(|r| (*r).clone());
        let node = node_by_id.get(&id).map(|r| (*r).clone());
        if options.policy == MergePolicy::ExplicitOnly && node.is_none() {
            tracing::trace!(%id, "dropping id without an explicit node record");
            continue;
        }
        lookup.insert(id.clone(), nodes.len());
        nodes.push(Node {
            index: nodes.len(),
            id,
            data,
            node,
        });
    }

    NodeSet {
        nodes,
        lookup,
        explicit,
    }
}

fn derive_from_links(links: &[RawLink], id: &IdAccessor) -> Vec<Record> {
    let mut seen: Vec<String> = Vec::new();
    let mut records = Vec::new();
    for link in links {
        for endpoint in [&link.source, &link.target] {
            let record = match endpoint {
                Endpoint::Id(value) => {
                    let mut record = Record::new();
                    record.insert(id.field_name().to_string(), Value::String(value.clone()));
                    record
                }
                Endpoint::Node(record) => record.clone(),
                Endpoint::Index(_) => continue,
            };
            let Some(key) = id.id_of(&record, records.len()) else {
                continue;
            };
            if !seen.contains(&key) {
                seen.push(key);
                records.push(record);
            }
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn dataset_ids_come_first_and_merge_with_nodes() {
        let id = IdAccessor::default();
        let data = vec![rec(json!({"id": "b", "v": 1})), rec(json!({"id": "c"}))];
        let explicit = vec![rec(json!({"id": "a"})), rec(json!({"id": "b", "x": 3}))];
        let set = resolve_nodes(&data, &explicit, &[], &ResolveOptions::new(&id));
        let ids: Vec<&str> = set.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        let b = &set.nodes[set.lookup["b"]];
        assert!(b.data.is_some() && b.node.is_some());
        assert_eq!(b.index, 0);
    }

    #[test]
    fn explicit_only_drops_dataset_only_ids() {
        let id = IdAccessor::default();
        let data = vec![rec(json!({"id": "ghost"}))];
        let explicit = vec![rec(json!({"id": "a"}))];
        let options = ResolveOptions::new(&id).with_policy(MergePolicy::ExplicitOnly);
        let set = resolve_nodes(&data, &explicit, &[], &options);
        assert_eq!(set.nodes.len(), 1);
        assert!(!set.lookup.contains_key("ghost"));
    }

    #[test]
    fn nodes_are_derived_from_links_when_absent() {
        let id = IdAccessor::field("name");
        let links = vec![
            RawLink::new(Endpoint::Id("x".into()), Endpoint::Id("y".into()), None),
            RawLink::new(
                Endpoint::Node(rec(json!({"name": "z"}))),
                Endpoint::Id("x".into()),
                None,
            ),
        ];
        let set = resolve_nodes(&[], &[], &links, &ResolveOptions::new(&id));
        let ids: Vec<&str> = set.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
        assert_eq!(set.explicit.len(), 3);
    }

    #[test]
    fn sort_by_id_reorders_explicit_nodes() {
        let id = IdAccessor::default();
        let explicit = vec![rec(json!({"id": "m"})), rec(json!({"id": "b"}))];
        let options = ResolveOptions::new(&id).with_sort_by_id(true);
        let set = resolve_nodes(&[], &explicit, &[], &options);
        assert_eq!(set.nodes[0].id, "b");
        // positional references still use caller order
        assert_eq!(set.explicit[0].get("id"), Some(&json!("m")));
    }

    #[test]
    fn parse_links_reports_missing_fields() {
        let keys = LinkKeys::default();
        let err = parse_links(&[rec(json!({"source": "a"}))], &keys).unwrap_err();
        assert_eq!(
            err,
            LayoutError::MalformedLink {
                link: 0,
                end: LinkEnd::Target,
                field: "target".to_string(),
            }
        );
    }
}
