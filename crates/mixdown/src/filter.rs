//! Filter graph primitives.
//!
//! An ffmpeg `-filter_complex` program is a `;`-separated list of stages,
//! each consuming zero or more bracketed tags and producing one or more.
//! We model stages as plain data so builders can be tested without ever
//! spawning ffmpeg.

use std::fmt;

/// One stage of a filter program.
///
/// Tags are stored without brackets; rendering adds them. Source pads use
/// the ffmpeg stream-specifier form (`0:a`, `2:v`) and are rendered the
/// same way as derived tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStage {
    pub inputs: Vec<String>,
    pub filter: String,
    pub outputs: Vec<String>,
}

impl FilterStage {
    pub fn new(
        inputs: impl IntoIterator<Item = String>,
        filter: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            filter: filter.into(),
            outputs: vec![output.into()],
        }
    }

    /// A stage with no input pads, such as a `color` source.
    pub fn source(filter: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(Vec::new(), filter, output)
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tag in &self.inputs {
            write!(f, "[{tag}]")?;
        }
        write!(f, "{}", self.filter)?;
        for tag in &self.outputs {
            write!(f, "[{tag}]")?;
        }
        Ok(())
    }
}

/// Renders a complete `-filter_complex` argument.
pub fn render_program(stages: &[FilterStage]) -> String {
    stages
        .iter()
        .map(|stage| stage.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

/// Hands out unique pad tags.
///
/// A fresh pool per graph keeps tag numbering deterministic regardless of
/// how many graphs the process has built before.
#[derive(Debug, Default)]
pub struct TagPool {
    next: u32,
}

impl TagPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(&mut self, prefix: &str) -> String {
        let tag = format!("{prefix}{}", self.next);
        self.next += 1;
        tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stage_renders_bracketed_tags() {
        let stage = FilterStage::new(
            vec!["0:a".to_string(), "aud1".to_string()],
            "amix=inputs=2:duration=longest",
            "mix0",
        );
        assert_eq!(stage.to_string(), "[0:a][aud1]amix=inputs=2:duration=longest[mix0]");
    }

    #[test]
    fn source_stage_has_no_input_pads() {
        let stage = FilterStage::source("color=c=black:size=1280x720:rate=30", "bg0");
        assert_eq!(stage.to_string(), "color=c=black:size=1280x720:rate=30[bg0]");
    }

    #[test]
    fn program_joins_with_semicolons() {
        let stages = vec![
            FilterStage::source("color=c=black", "bg0"),
            FilterStage::new(vec!["bg0".to_string(), "0:v".to_string()], "overlay=0:0", "ovl0"),
        ];
        assert_eq!(render_program(&stages), "color=c=black[bg0];[bg0][0:v]overlay=0:0[ovl0]");
    }

    #[test]
    fn tag_pool_counts_across_prefixes() {
        let mut pool = TagPool::new();
        assert_eq!(pool.tag("aud"), "aud0");
        assert_eq!(pool.tag("mix"), "mix1");
        assert_eq!(pool.tag("aud"), "aud2");
    }
}
