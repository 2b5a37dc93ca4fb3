// src/core/merge.rs

//! # Merge Engine
//!
//! Folds the process defaults, the ancestor chain (root first) and the template's
//! own directives into one `EffectiveConfiguration`. Singleton directives follow
//! last-wins; namespace imports are a first-seen-order union. Everything here is
//! pure: no I/O, no mutation of inputs.

use crate::models::{
    Chunk, ChunkSet, ChunkTree, DirectiveChunk, EffectiveConfiguration, HostDefaults,
};
use std::collections::HashSet;
use std::iter;
use std::sync::Arc;

/// The effective configuration of a template that inherits nothing.
pub fn from_defaults(defaults: &HostDefaults) -> EffectiveConfiguration {
    merge(&[], &ChunkSet::empty(""), defaults)
}

/// Merges `chain` (root first) and then `own` on top of `defaults`.
pub fn merge(
    chain: &[Arc<ChunkSet>],
    own: &ChunkSet,
    defaults: &HostDefaults,
) -> EffectiveConfiguration {
    let mut base_type: Option<&str> = None;
    let mut model_type: Option<&str> = None;
    let mut namespaces = NamespaceSet::default();

    namespaces.extend(&defaults.namespaces);

    let layers = chain.iter().map(|set| &**set).chain(iter::once(own));
    for set in layers {
        base_type = set.base_type().or(base_type);
        model_type = set.model_type().or(model_type);
        namespaces.extend(set.namespaces());
    }

    let template = match base_type {
        Some(template) => defaults.base_type.with_template(template),
        None => defaults.base_type.clone(),
    };
    let model_type = model_type.unwrap_or(defaults.model_type.as_str());

    EffectiveConfiguration {
        base_class: template.substitute(model_type),
        base_type_template: template.template,
        model_type: model_type.to_string(),
        namespaces: namespaces.into_vec(),
    }
}

/// Builds the tree handed to the code generator: the effective imports, base class
/// and model type as directives, followed by the template body in its original order.
pub fn apply_to_tree(config: &EffectiveConfiguration, tree: &ChunkTree) -> ChunkTree {
    let directives = config
        .namespaces
        .iter()
        .cloned()
        .map(DirectiveChunk::NamespaceImport)
        .chain([
            DirectiveChunk::BaseType(config.base_class.clone()),
            DirectiveChunk::ModelType(config.model_type.clone()),
        ])
        .map(Chunk::Directive);

    ChunkTree::new(directives.chain(tree.body().cloned()).collect())
}

/// Ordered, duplicate-free list of namespaces.
#[derive(Debug, Default)]
struct NamespaceSet {
    ordered: Vec<String>,
    seen: HashSet<String>,
}

impl NamespaceSet {
    fn extend<'a>(&mut self, names: impl IntoIterator<Item = &'a String>) {
        for name in names {
            if self.seen.insert(name.clone()) {
                self.ordered.push(name.clone());
            }
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(path: &str, chunks: Vec<DirectiveChunk>) -> Arc<ChunkSet> {
        Arc::new(ChunkSet::from_chunks(path, String::new(), chunks))
    }

    fn using(name: &str) -> DirectiveChunk {
        DirectiveChunk::NamespaceImport(name.to_string())
    }

    fn model(name: &str) -> DirectiveChunk {
        DirectiveChunk::ModelType(name.to_string())
    }

    fn default_namespaces() -> Vec<String> {
        HostDefaults::default().namespaces
    }

    #[test]
    fn test_no_ancestors_equals_defaults() {
        let defaults = HostDefaults::default();
        let config = merge(&[], &ChunkSet::empty("page.tmpl"), &defaults);
        assert_eq!(config.model_type, "dynamic");
        assert_eq!(config.base_type_template, "TemplatePage<TModel>");
        assert_eq!(config.base_class, "TemplatePage<dynamic>");
        assert_eq!(config.namespaces, defaults.namespaces);
        assert_eq!(config, from_defaults(&defaults));
    }

    #[test]
    fn test_each_level_adds_its_namespace_once_in_order() {
        let chain: Vec<_> = (0..4)
            .map(|level| {
                set(
                    &format!("L{level}/_imports.tmpl"),
                    vec![using(&format!("Level{level}"))],
                )
            })
            .collect();
        let own = ChunkSet::from_chunks(
            "page.tmpl",
            String::new(),
            vec![using("Own"), using("Level1")],
        );
        let config = merge(&chain, &own, &HostDefaults::default());

        let mut expected = default_namespaces();
        expected.extend(["Level0", "Level1", "Level2", "Level3", "Own"].map(String::from));
        assert_eq!(config.namespaces, expected);
    }

    #[test]
    fn test_nearer_ancestor_model_wins_and_own_wins_over_all() {
        let chain = vec![
            set("_imports.tmpl", vec![model("Foo")]),
            set("A/_imports.tmpl", vec![model("Bar")]),
        ];
        let defaults = HostDefaults::default();

        let config = merge(&chain, &ChunkSet::empty("A/page.tmpl"), &defaults);
        assert_eq!(config.model_type, "Bar");

        let own = ChunkSet::from_chunks("A/page.tmpl", String::new(), vec![model("Baz")]);
        let config = merge(&chain, &own, &defaults);
        assert_eq!(config.model_type, "Baz");
        assert_eq!(config.base_class, "TemplatePage<Baz>");
    }

    #[test]
    fn test_base_type_override_keeps_default_model() {
        let chain = vec![
            set("_imports.tmpl", vec![using("Shared.Utils")]),
            set(
                "A/_imports.tmpl",
                vec![
                    DirectiveChunk::BaseType("CustomBase<TModel>".to_string()),
                    using("A.Helpers"),
                ],
            ),
        ];
        let config = merge(&chain, &ChunkSet::empty("A/page.tmpl"), &HostDefaults::default());

        assert_eq!(config.base_class, "CustomBase<dynamic>");
        let mut expected = default_namespaces();
        expected.extend(["Shared.Utils", "A.Helpers"].map(String::from));
        assert_eq!(config.namespaces, expected);
    }

    #[test]
    fn test_farther_base_type_survives_when_nearer_is_silent() {
        let chain = vec![
            set(
                "_imports.tmpl",
                vec![DirectiveChunk::BaseType("RootBase<TModel>".to_string())],
            ),
            set("A/_imports.tmpl", vec![model("Item")]),
        ];
        let config = merge(&chain, &ChunkSet::empty("A/page.tmpl"), &HostDefaults::default());
        assert_eq!(config.base_class, "RootBase<Item>");
    }

    #[test]
    fn test_ancestor_repeating_a_default_namespace_is_collapsed() {
        let chain = vec![set("_imports.tmpl", vec![using("System"), using("Extra")])];
        let config = merge(&chain, &ChunkSet::empty("page.tmpl"), &HostDefaults::default());
        assert_eq!(config.namespaces.iter().filter(|n| *n == "System").count(), 1);
        assert_eq!(config.namespaces.last().map(String::as_str), Some("Extra"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let chain = vec![set("_imports.tmpl", vec![using("A"), model("M")])];
        let own = ChunkSet::from_chunks("page.tmpl", String::new(), vec![using("B")]);
        let defaults = HostDefaults::default();
        assert_eq!(merge(&chain, &own, &defaults), merge(&chain, &own, &defaults));
    }

    #[test]
    fn test_apply_to_tree_puts_directives_before_body() {
        let config = EffectiveConfiguration {
            base_type_template: "Page<TModel>".to_string(),
            model_type: "Foo".to_string(),
            base_class: "Page<Foo>".to_string(),
            namespaces: vec!["A".to_string()],
        };
        let tree = ChunkTree::new(vec![
            Chunk::Literal("hi ".to_string()),
            Chunk::Directive(model("Ignored")),
            Chunk::Expression("Model".to_string()),
        ]);
        let merged = apply_to_tree(&config, &tree);
        assert_eq!(
            merged.chunks,
            vec![
                Chunk::Directive(using("A")),
                Chunk::Directive(DirectiveChunk::BaseType("Page<Foo>".to_string())),
                Chunk::Directive(model("Foo")),
                Chunk::Literal("hi ".to_string()),
                Chunk::Expression("Model".to_string()),
            ]
        );
    }
}
