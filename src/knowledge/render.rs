use dedent::dedent;
use minijinja::{Environment, context};
use serde::Serialize;

use crate::{error::Result, value::META_CHUNK_INDEX, vector_store::ScoredChunk};

fn default_template() -> String {
    dedent!(r#"
    {%- if results %}
        {%- for item in results %}
            {%- if not loop.first %}{{ "\n\n" }}{% endif -%}
            [{{ loop.index }}] source: {{ item.source }} (chunk {{ item.chunk_index }}, score {{ item.score }}){{ "\n" }}
            {{- item.text }}
        {%- endfor %}
    {%- else -%}
        No results found in the knowledge base for "{{ query }}".
    {%- endif %}
    "#)
    .to_string()
}

#[derive(Serialize)]
struct RenderedHit<'a> {
    source: &'a str,
    chunk_index: &'a str,
    score: String,
    text: &'a str,
}

/// Formats search hits into the single text blob handed back to the model.
#[derive(Debug, Clone)]
pub struct ResultRenderer {
    template: String,
    mj_env: Environment<'static>,
}

impl ResultRenderer {
    pub fn new() -> Self {
        Self {
            template: default_template(),
            mj_env: Environment::new(),
        }
    }

    /// Replaces the template. It receives `query` and `results`, a list of
    /// `{source, chunk_index, score, text}`.
    pub fn with_template(self, template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        Environment::new().template_from_str(&template)?;
        Ok(Self { template, ..self })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn render(&self, query: &str, hits: &[ScoredChunk]) -> Result<String> {
        let results: Vec<RenderedHit<'_>> = hits
            .iter()
            .map(|hit| RenderedHit {
                source: hit.chunk.source().unwrap_or(&hit.chunk.id),
                chunk_index: hit
                    .chunk
                    .metadata
                    .get(META_CHUNK_INDEX)
                    .map(String::as_str)
                    .unwrap_or("?"),
                score: format!("{:.3}", hit.score),
                text: hit.chunk.text.trim(),
            })
            .collect();
        let rendered = self
            .mj_env
            .render_str(&self.template, context!(query => query, results => results))?;
        Ok(rendered.trim().to_owned())
    }
}

impl Default for ResultRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ChunkMetadata, DocumentChunk, META_SOURCE};

    fn hit(source: &str, index: usize, text: &str, score: f32) -> ScoredChunk {
        let mut metadata = ChunkMetadata::new();
        metadata.insert(META_SOURCE.into(), source.into());
        metadata.insert(META_CHUNK_INDEX.into(), index.to_string());
        ScoredChunk {
            chunk: DocumentChunk::new("id", text, metadata, vec![1.0].into()),
            score,
        }
    }

    #[test]
    fn results_carry_source_labels() {
        let out = ResultRenderer::new()
            .render(
                "error 429",
                &[
                    hit("faq/errors.md", 0, "Error 429 means rate limiting.\n", 0.91234),
                    hit("faq/billing.md", 2, "Invoices are monthly.", 0.5),
                ],
            )
            .unwrap();
        assert_eq!(
            out,
            "[1] source: faq/errors.md (chunk 0, score 0.912)\nError 429 means rate limiting.\n\n\
             [2] source: faq/billing.md (chunk 2, score 0.500)\nInvoices are monthly."
        );
    }

    #[test]
    fn empty_results_are_explicit() {
        let out = ResultRenderer::new().render("sso", &[]).unwrap();
        assert_eq!(out, r#"No results found in the knowledge base for "sso"."#);
    }

    #[test]
    fn custom_template() {
        let renderer = ResultRenderer::new()
            .with_template("{{ results | length }} hits for {{ query }}")
            .unwrap();
        assert_eq!(renderer.render("q", &[hit("a", 0, "t", 1.0)]).unwrap(), "1 hits for q");
        assert!(ResultRenderer::new().with_template("{% if %}").is_err());
    }
}
