//! Template coordinator: `tryLoad(name)` checks a
//! configured file-system root first, then falls back to a small set of
//! embedded templates; `render` is a trivial handlebars substitution over
//! a nested model. Per-field code (ordinal reads, nested records) is
//! composed in Rust and handed to the template as a pre-rendered `body`
//! string -- the template itself only owns file-level scaffolding
//! (namespace, usings, class wrapper), matching "trivial substitution",
//! not a full templating DSL for per-column logic.

use std::collections::HashMap;
use std::path::PathBuf;

use handlebars::Handlebars;
use serde::Serialize;

use xtraq_common::error::{Error, Result};

const EMBEDDED_FILE_TEMPLATE: &str = "\
// <auto-generated/>
#nullable enable
{{#each usings}}
using {{this}};
{{/each}}

namespace {{namespace}}
{
{{body}}
}
";

pub struct TemplateCoordinator {
    fs_root: Option<PathBuf>,
    embedded: HashMap<&'static str, &'static str>,
    handlebars: Handlebars<'static>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileModel {
    pub namespace: String,
    pub usings: Vec<String>,
    pub body: String,
}

impl TemplateCoordinator {
    pub fn new(fs_root: Option<PathBuf>) -> Self {
        let mut embedded = HashMap::new();
        embedded.insert("file", EMBEDDED_FILE_TEMPLATE);

        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);

        TemplateCoordinator { fs_root, embedded, handlebars }
    }

    /// Lookup order: configured file-system root first, then embedded
    /// resources.
    pub fn try_load(&self, name: &str) -> Option<String> {
        if let Some(root) = &self.fs_root {
            let path = root.join(format!("{name}.hbs"));
            if let Ok(content) = std::fs::read_to_string(&path) {
                return Some(content);
            }
        }
        self.embedded.get(name).map(|s| s.to_string())
    }

    pub fn render(&self, template: &str, model: &FileModel) -> Result<String> {
        self.handlebars
            .render_template(template, model)
            .map_err(|e| Error::Contract(format!("template render failed: {e}")))
    }

    /// Renders the named template, or a hard-coded fallback if it's
    /// missing entirely.
    pub fn render_file(&self, name: &str, model: &FileModel) -> Result<String> {
        match self.try_load(name) {
            Some(template) => self.render(&template, model),
            None => Ok(fallback_file(model)),
        }
    }
}

fn fallback_file(model: &FileModel) -> String {
    let mut out = String::new();
    out.push_str("// <auto-generated/>\n#nullable enable\n");
    for using in &model.usings {
        out.push_str(&format!("using {using};\n"));
    }
    out.push('\n');
    out.push_str(&format!("namespace {}\n{{\n{}\n}}\n", model.namespace, model.body));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_file_template_renders_namespace_and_usings() {
        let coordinator = TemplateCoordinator::new(None);
        let model = FileModel {
            namespace: "Xtraq.Dbo".to_string(),
            usings: vec!["System".to_string()],
            body: "    public partial class Foo {}".to_string(),
        };
        let rendered = coordinator.render_file("file", &model).unwrap();
        assert!(rendered.contains("namespace Xtraq.Dbo"));
        assert!(rendered.contains("using System;"));
        assert!(rendered.contains("public partial class Foo"));
    }

    #[test]
    fn missing_template_falls_back_to_hard_coded_string() {
        let coordinator = TemplateCoordinator::new(None);
        let model = FileModel {
            namespace: "Xtraq.Dbo".to_string(),
            usings: Vec::new(),
            body: "body".to_string(),
        };
        let rendered = coordinator.render_file("nonexistent", &model).unwrap();
        assert!(rendered.contains("namespace Xtraq.Dbo"));
        assert!(rendered.contains("body"));
    }

    #[test]
    fn file_system_root_takes_precedence_over_embedded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("file.hbs"), "CUSTOM {{namespace}}").unwrap();
        let coordinator = TemplateCoordinator::new(Some(dir.path().to_path_buf()));
        let model = FileModel { namespace: "X".to_string(), usings: Vec::new(), body: String::new() };
        let rendered = coordinator.render_file("file", &model).unwrap();
        assert_eq!(rendered, "CUSTOM X");
    }
}
