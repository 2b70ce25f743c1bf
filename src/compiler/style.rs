//! SCSS to compressed CSS with `grass`.

use super::StyleCompiler;
use crate::data::File;
use anyhow::{Result, anyhow};
use grass::{Options, OutputStyle};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default)]
pub struct ScssCompiler;

impl StyleCompiler for ScssCompiler {
    fn compile(&self, content: &str, include_paths: &[PathBuf], filepath: &Path) -> Result<File> {
        let options = include_paths
            .iter()
            .fold(Options::default().style(OutputStyle::Compressed), |options, path| {
                options.load_path(path)
            });

        let css = grass::from_string(content.to_owned(), &options)
            .map_err(|err| anyhow!("stylesheet compilation failed: {err}"))?;

        Ok(File::new(filepath, css.trim_end()))
    }
}
