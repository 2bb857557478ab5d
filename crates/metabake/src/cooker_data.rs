use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use metabake_datasmart::DataSmart;

use crate::evaluate::AnonymousFunction;
use crate::parse::{MetadataParser, RecipeMetadata};
use crate::MetaResult;

/// The store every recipe of a run is parsed on top of.
#[derive(Debug)]
pub struct BaseConfig {
    data: DataSmart,
    /// Anonymous functions from inherited classes, run again by every recipe.
    anon_queue: Vec<AnonymousFunction>,
}

impl BaseConfig {
    pub fn default_files() -> Vec<PathBuf> {
        vec![PathBuf::from("conf").join("bitbake.conf")]
    }

    /// Handle each configuration file in order into a fresh store, then inherit every class named
    /// in `INHERIT`.
    pub fn parse<P: AsRef<Path>>(parser: &MetadataParser, files: &[P]) -> MetaResult<Self> {
        Self::parse_into(parser, files, DataSmart::new())
    }

    pub fn parse_into<P: AsRef<Path>>(
        parser: &MetadataParser,
        files: &[P],
        data: DataSmart,
    ) -> MetaResult<Self> {
        let mut anon_queue = Vec::new();
        for file in files {
            let file = file.as_ref();
            debug!(file = %file.display(), "parsing configuration");
            parser
                .handle_with_queue(file, &data, &mut anon_queue)
                .with_context(|| format!("unable to parse {}", file.display()))?;
        }

        let inherits = match data.get_var("INHERIT") {
            Some(raw) => data.expand(&raw)?,
            None => String::new(),
        };
        for bbclass in inherits.split_whitespace() {
            let class = PathBuf::from("classes").join(format!("{}.bbclass", bbclass));
            parser
                .handle_with_queue(&class, &data, &mut anon_queue)
                .with_context(|| format!("unable to inherit {}", bbclass))?;
        }

        Ok(Self { data, anon_queue })
    }

    pub fn data(&self) -> &DataSmart {
        &self.data
    }

    pub fn anon_queue(&self) -> &[AnonymousFunction] {
        &self.anon_queue
    }

    /// Parse one recipe in its own layer over the base configuration.
    pub fn parse_recipe<P: AsRef<Path>>(
        &self,
        parser: &MetadataParser,
        recipe: P,
    ) -> MetaResult<(DataSmart, Option<RecipeMetadata>)> {
        let d = self.data.create_copy();
        let mut pending = self.anon_queue.clone();
        let metadata = parser.handle_with_queue(recipe, &d, &mut pending)?;
        Ok((d, metadata))
    }
}
