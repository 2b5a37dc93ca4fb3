// src/core/generator.rs

use crate::core::engine::CodeGenerator;
use crate::models::{
    Chunk, ChunkTree, Diagnostic, DirectiveChunk, EffectiveConfiguration, GeneratedCode,
    GeneratedMethodNames, Severity,
};

const INDENT: &str = "    ";

/// The default back-end: emits a class deriving from the resolved base class, with a
/// `Model` accessor typed by the resolved model type and one execute method that
/// writes the template body.
#[derive(Debug, Clone)]
pub struct ModelCodeGenerator {
    config: EffectiveConfiguration,
    methods: GeneratedMethodNames,
}

impl ModelCodeGenerator {
    pub fn new(config: EffectiveConfiguration, methods: GeneratedMethodNames) -> Self {
        Self { config, methods }
    }
}

impl CodeGenerator for ModelCodeGenerator {
    fn generate(&self, class_name: &str, tree: &ChunkTree) -> GeneratedCode {
        let mut diagnostics = Vec::new();
        let mut source = String::new();

        // The merged tree carries the final declarations; fall back to the bound config.
        let mut base_class = self.config.base_class.as_str();
        for directive in tree.directives() {
            match directive {
                DirectiveChunk::NamespaceImport(name) => {
                    source.push_str(&format!("using {};\n", name));
                }
                DirectiveChunk::BaseType(name) => base_class = name.as_str(),
                DirectiveChunk::ModelType(_) => {}
            }
        }
        if !source.is_empty() {
            source.push('\n');
        }

        if base_class.trim().is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                message: format!("'{}' has no base class to derive from.", class_name),
            });
            source.push_str(&format!("public class {}\n{{\n", class_name));
        } else {
            source.push_str(&format!("public class {} : {}\n{{\n", class_name, base_class));
        }

        let model = &self.config.model_type;
        source.push_str(&format!("{INDENT}public {} Model {{ get; set; }}\n\n", model));
        source.push_str(&format!(
            "{INDENT}public override async Task {}()\n{INDENT}{{\n",
            self.methods.execute
        ));

        let mut body_chunks = 0usize;
        for chunk in tree.body() {
            body_chunks += 1;
            match chunk {
                Chunk::Literal(text) => source.push_str(&format!(
                    "{INDENT}{INDENT}{}(\"{}\");\n",
                    self.methods.write_literal,
                    escape_literal(text)
                )),
                Chunk::Expression(expression) => source.push_str(&format!(
                    "{INDENT}{INDENT}{}({});\n",
                    self.methods.write, expression
                )),
                Chunk::Directive(_) => {}
            }
        }
        if body_chunks == 0 {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                message: format!("'{}' has an empty body.", class_name),
            });
        }

        source.push_str(&format!("{INDENT}}}\n}}\n"));

        GeneratedCode {
            class_name: class_name.to_string(),
            source,
            diagnostics,
        }
    }
}

fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped
}
