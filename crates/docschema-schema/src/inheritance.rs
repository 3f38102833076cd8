//! `extends` expansion over the record inheritance graph

use crate::loader::LoadIssue;
use crate::model::{Field, SchemaEntry};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Directed `child -> parents` edges between records
#[derive(Debug, Clone, Default)]
pub struct InheritanceGraph {
    edges: IndexMap<String, Vec<String>>,
}

impl InheritanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the pending `extends` lists of every record
    pub fn from_types(types: &IndexMap<String, SchemaEntry>) -> Self {
        let mut graph = Self::new();
        for entry in types.values() {
            if let SchemaEntry::Record(record) = entry {
                for parent in &record.extends {
                    graph.add_edge(&record.name, parent);
                }
            }
        }
        graph
    }

    pub fn add_edge(&mut self, child: impl Into<String>, parent: impl Into<String>) {
        self.edges.entry(child.into()).or_default().push(parent.into());
    }

    /// Direct parents of `name`, in declaration order
    pub fn parents(&self, name: &str) -> &[String] {
        self.edges.get(name).map_or(&[], Vec::as_slice)
    }

    /// A cycle through `name`, as the list of names walked, if one exists
    pub fn find_cycle(&self, name: &str) -> Option<Vec<String>> {
        let mut stack = vec![name.to_string()];
        let mut visited = HashSet::new();
        self.cycle_from(name, name, &mut stack, &mut visited)
    }

    fn cycle_from(
        &self,
        start: &str,
        current: &str,
        stack: &mut Vec<String>,
        visited: &mut HashSet<String>,
    ) -> Option<Vec<String>> {
        for parent in self.parents(current) {
            if parent == start {
                let mut cycle = stack.clone();
                cycle.push(parent.clone());
                return Some(cycle);
            }
            if visited.insert(parent.clone()) {
                stack.push(parent.clone());
                if let Some(cycle) = self.cycle_from(start, parent, stack, visited) {
                    return Some(cycle);
                }
                stack.pop();
            }
        }
        None
    }

    /// Every ancestor of `name`, depth-first in declaration order, each once.
    /// Terminates on cyclic input; `name` itself is never included.
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(name.to_string());
        self.collect_ancestors(name, &mut visited, &mut out);
        out
    }

    fn collect_ancestors(&self, name: &str, visited: &mut HashSet<String>, out: &mut Vec<String>) {
        for parent in self.parents(name) {
            if visited.insert(parent.clone()) {
                out.push(parent.clone());
                self.collect_ancestors(parent, visited, out);
            }
        }
    }
}

/// Merge ancestor fields into every record with a pending `extends` list.
///
/// A record's final field list is its own fields followed by each ancestor's
/// fields not already present by name; subclass fields win on collisions.
/// `extends` is cleared afterwards, so running the expansion again is a no-op.
pub fn expand_extends(types: &mut IndexMap<String, SchemaEntry>) -> Vec<LoadIssue> {
    let graph = InheritanceGraph::from_types(types);
    let mut issues = Vec::new();

    // Ancestors contribute the fields they declare themselves.
    let declared: HashMap<String, Vec<Field>> = types
        .values()
        .filter_map(|entry| match entry {
            SchemaEntry::Record(record) => Some((record.name.clone(), record.fields.clone())),
            SchemaEntry::Enum(_) => None,
        })
        .collect();

    for entry in types.values_mut() {
        let SchemaEntry::Record(record) = entry else {
            continue;
        };
        if record.extends.is_empty() {
            continue;
        }

        if let Some(cycle) = graph.find_cycle(&record.name) {
            warn!("Circular extends: {}", cycle.join(" -> "));
            issues.push(LoadIssue::CircularExtends { chain: cycle });
        }

        let mut seen: HashSet<String> = record.fields.iter().map(|f| f.name.clone()).collect();
        let mut ancestors = Vec::new();

        for ancestor in graph.ancestors(&record.name) {
            let Some(fields) = declared.get(&ancestor) else {
                debug!("Record {} extends unknown type {}", record.name, ancestor);
                issues.push(LoadIssue::UnresolvedExtends {
                    record: record.name.clone(),
                    parent: ancestor,
                });
                continue;
            };

            for field in fields {
                if seen.insert(field.name.clone()) {
                    record.fields.push(field.clone());
                }
            }
            ancestors.push(ancestor);
        }

        debug!(
            "Expanded {} with ancestors {:?} ({} fields)",
            record.name,
            ancestors,
            record.fields.len()
        );
        for ancestor in ancestors {
            if !record.ancestors.contains(&ancestor) {
                record.ancestors.push(ancestor);
            }
        }
        record.extends.clear();
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PrimitiveType, Record, TypeShape};

    fn field(name: &str) -> Field {
        Field::new(name, vec![TypeShape::Primitive(PrimitiveType::String)])
    }

    fn create_types(records: Vec<Record>) -> IndexMap<String, SchemaEntry> {
        records
            .into_iter()
            .map(|r| (r.name.clone(), SchemaEntry::Record(r)))
            .collect()
    }

    fn field_names(types: &IndexMap<String, SchemaEntry>, name: &str) -> Vec<String> {
        match types.get(name) {
            Some(SchemaEntry::Record(record)) => record.fields.iter().map(|f| f.name.clone()).collect(),
            _ => panic!("expected record {name}"),
        }
    }

    #[test]
    fn test_transitive_expansion_with_precedence() {
        let mut overridden = field("label");
        overridden.doc = Some("child label".into());

        let mut types = create_types(vec![
            Record::new("A", vec![overridden, field("a")]).extending(vec!["B".into()]),
            Record::new("B", vec![field("label"), field("b")]).extending(vec!["C".into()]),
            Record::new("C", vec![field("c")]),
        ]);

        let issues = expand_extends(&mut types);
        assert!(issues.is_empty());
        assert_eq!(field_names(&types, "A"), vec!["label", "a", "b", "c"]);
        assert_eq!(field_names(&types, "B"), vec!["label", "b", "c"]);

        let SchemaEntry::Record(a) = &types["A"] else { panic!("A is a record") };
        assert_eq!(a.fields[0].doc.as_deref(), Some("child label"));
        assert_eq!(a.ancestors, vec!["B", "C"]);
        assert!(a.extends.is_empty());
    }

    #[test]
    fn test_expansion_is_idempotent() {
        let mut types = create_types(vec![
            Record::new("A", vec![field("a")]).extending(vec!["B".into()]),
            Record::new("B", vec![field("b")]),
        ]);

        expand_extends(&mut types);
        let first = types.clone();
        let issues = expand_extends(&mut types);

        assert!(issues.is_empty());
        assert_eq!(first, types);
        assert_eq!(field_names(&types, "A"), vec!["a", "b"]);
    }

    #[test]
    fn test_circular_extends_terminates_and_reports() {
        let mut types = create_types(vec![
            Record::new("A", vec![field("a")]).extending(vec!["B".into()]),
            Record::new("B", vec![field("b")]).extending(vec!["A".into()]),
        ]);

        let issues = expand_extends(&mut types);
        assert!(issues
            .iter()
            .any(|i| matches!(i, LoadIssue::CircularExtends { .. })));
        assert_eq!(field_names(&types, "A"), vec!["a", "b"]);
        assert_eq!(field_names(&types, "B"), vec!["b", "a"]);
    }

    #[test]
    fn test_unresolved_parent_contributes_nothing() {
        let mut types = create_types(vec![
            Record::new("A", vec![field("a")]).extending(vec!["Missing".into()]),
        ]);

        let issues = expand_extends(&mut types);
        assert_eq!(field_names(&types, "A"), vec!["a"]);
        assert!(matches!(
            issues.as_slice(),
            [LoadIssue::UnresolvedExtends { parent, .. }] if parent == "Missing"
        ));
    }

    #[test]
    fn test_diamond_inherits_once() {
        let mut types = create_types(vec![
            Record::new("D", vec![]).extending(vec!["B".into(), "C".into()]),
            Record::new("B", vec![field("b")]).extending(vec!["A".into()]),
            Record::new("C", vec![field("c")]).extending(vec!["A".into()]),
            Record::new("A", vec![field("a")]),
        ]);

        expand_extends(&mut types);
        assert_eq!(field_names(&types, "D"), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_find_cycle_reports_chain() {
        let mut graph = InheritanceGraph::new();
        graph.add_edge("A", "B");
        graph.add_edge("B", "C");
        graph.add_edge("C", "A");
        graph.add_edge("D", "A");

        assert_eq!(graph.find_cycle("A"), Some(vec!["A".into(), "B".into(), "C".into(), "A".into()]));
        assert!(graph.find_cycle("D").is_none());
        assert_eq!(graph.ancestors("D"), vec!["A", "B", "C"]);
    }
}
