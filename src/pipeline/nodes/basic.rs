use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{Pipeline, Stage};
use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::rc::Rc;
use std::sync::LazyLock;
use tracing::debug;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.-]*)\s*\}\}").expect("valid placeholder regex")
});

fn text_of(stage: &str, relative_path: &str, data: &[u8]) -> PipelineResult<String> {
    String::from_utf8(data.to_vec()).map_err(|_| {
        PipelineError::stage(stage, format!("`{relative_path}` is not valid UTF-8"))
    })
}

/// Rewrite the text of every live artifact with `extension`.
///
/// All artifacts are converted before any is assigned, so a failure leaves the
/// pipeline untouched.
fn rewrite_text<F>(
    pipeline: &Pipeline,
    stage: &str,
    extension: &str,
    rewrite: F,
) -> PipelineResult<()>
where
    F: Fn(&str) -> String,
{
    let mut rewritten = Vec::new();
    for artifact in pipeline.artifacts() {
        let inner = artifact.borrow();
        if inner.extension() != extension {
            continue;
        }
        let text = text_of(stage, inner.relative_path(), inner.data())?;
        rewritten.push((Rc::clone(artifact), rewrite(text.as_str()).into_bytes()));
    }

    for (artifact, data) in rewritten {
        let mut artifact = artifact.borrow_mut();
        debug!("{} applied to {}", stage, artifact.relative_path());
        artifact.set_data(data);
    }
    Ok(())
}

/// Regex find/replace over artifacts with a given extension
pub struct ReplaceStage {
    extension: String,
    regex: Regex,
    replacement: String,
}

impl ReplaceStage {
    pub fn new(
        extension: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> PipelineResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            PipelineError::stage("Replace", format!("invalid expression `{pattern}`: {e}"))
        })?;
        Ok(Self {
            extension: extension.into().trim_start_matches('.').to_string(),
            regex,
            replacement: replacement.into(),
        })
    }
}

impl Stage for ReplaceStage {
    fn name(&self) -> String {
        "Replace".to_string()
    }

    fn process(&self, pipeline: &mut Pipeline) -> PipelineResult<()> {
        rewrite_text(pipeline, &self.name(), &self.extension, |text| {
            self.regex
                .replace_all(text, self.replacement.as_str())
                .into_owned()
        })
    }
}

/// Renders `{{ name }}` placeholders from a variable map.
///
/// Unknown names are left as they are.
pub struct TemplateStage {
    extension: String,
    vars: IndexMap<String, String>,
}

impl TemplateStage {
    pub fn new(extension: impl Into<String>, vars: IndexMap<String, String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_string(),
            vars,
        }
    }

    pub fn render(&self, source: &str) -> String {
        PLACEHOLDER
            .replace_all(source, |caps: &Captures| match self.vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

impl Stage for TemplateStage {
    fn name(&self) -> String {
        "Template".to_string()
    }

    fn process(&self, pipeline: &mut Pipeline) -> PipelineResult<()> {
        rewrite_text(pipeline, &self.name(), &self.extension, |text| {
            self.render(text)
        })
    }
}
