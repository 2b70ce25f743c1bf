//! Jinja-style templates with `minijinja`.
//!
//! Every call builds a fresh environment and reads the template from disk, so
//! there is nothing to invalidate when a layout or partial changes.
//!
//! `{% include %}` and `{% extends %}` names are looked up in the template's
//! own directory first, then in each search root. HTML templates are
//! auto-escaped: rendered post bodies must be emitted as
//! `{{ post_content | safe }}`.

use super::TemplateCompiler;
use anyhow::{Context, Result};
use minijinja::{Environment, Error, ErrorKind};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Default)]
pub struct JinjaTemplates {
    roots: Vec<PathBuf>,
}

impl JinjaTemplates {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    fn environment(&self, template: &Path) -> Environment<'static> {
        let mut roots = Vec::with_capacity(self.roots.len() + 1);
        if let Some(dir) = template.parent() {
            roots.push(dir.to_path_buf());
        }
        roots.extend(self.roots.iter().cloned());

        let mut env = Environment::new();
        env.set_loader(move |name: &str| load_from(&roots, name));
        env
    }
}

fn load_from(roots: &[PathBuf], name: &str) -> Result<Option<String>, Error> {
    let Some(path) = roots.iter().map(|root| root.join(name)).find(|p| p.is_file()) else {
        return Ok(None);
    };
    fs::read_to_string(&path).map(Some).map_err(|err| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("could not read template {}", path.display()),
        )
        .with_source(err)
    })
}

impl TemplateCompiler for JinjaTemplates {
    fn compile(&self, template: &Path, context: &serde_json::Value) -> Result<String> {
        let source = fs::read_to_string(template)
            .with_context(|| format!("could not read template {}", template.display()))?;
        let name = template.display().to_string();

        let mut env = self.environment(template);
        env.add_template_owned(name.clone(), source)
            .with_context(|| format!("could not parse template {name}"))?;

        env.get_template(&name)
            .and_then(|tmpl| tmpl.render(context))
            .with_context(|| format!("could not render template {name}"))
    }
}
